//! Example selector over the columns written by `make-example-tree`.

use crate::columns::Column;
use crate::error::{AnalysisError, Result};
use crate::histogram::HistId;
use crate::stage::{Selector, StageContext, Status};

#[derive(Clone, Copy)]
struct Columns {
    my_int: Column<i32>,
    my_float: Column<f32>,
    my_vector_float: Column<Vec<f32>>,
    new_float: Column<f32>,
    new_vector_float: Column<Vec<f32>>,
}

/// Computes two derived columns and cuts on `my_vector_float`.
///
/// Parameters:
/// - `<name>::my_float_min` (float): threshold for entries of `my_vector_float`
/// - `<name>::my_int_min` (int): records with fewer entries below the
///   threshold are skipped
pub struct ExampleSelector {
    name: String,
    my_float_min: f32,
    my_int_min: i32,
    hist: Option<HistId>,

    my_int: Option<Column<i32>>,
    my_float: Option<Column<f32>>,
    my_vector_float: Option<Column<Vec<f32>>>,
    new_float: Option<Column<f32>>,
    new_vector_float: Option<Column<Vec<f32>>>,
}

impl ExampleSelector {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            my_float_min: 0.0,
            my_int_min: 0,
            hist: None,
            my_int: None,
            my_float: None,
            my_vector_float: None,
            new_float: None,
            new_vector_float: None,
        }
    }

    fn columns(&self) -> Result<Columns> {
        let unbound = |column: &str| {
            AnalysisError::stage(&self.name, format!("column '{}' is not bound", column))
        };
        Ok(Columns {
            my_int: self.my_int.ok_or_else(|| unbound("my_int"))?,
            my_float: self.my_float.ok_or_else(|| unbound("my_float"))?,
            my_vector_float: self
                .my_vector_float
                .ok_or_else(|| unbound("my_vector_float"))?,
            new_float: self.new_float.ok_or_else(|| unbound("new_float"))?,
            new_vector_float: self
                .new_vector_float
                .ok_or_else(|| unbound("new_vector_float"))?,
        })
    }
}

impl Selector for ExampleSelector {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialise(&mut self, ctx: &mut StageContext) -> Result<()> {
        self.my_float_min = ctx.param("my_float_min")?;
        self.my_int_min = ctx.param("my_int_min")?;
        ctx.log.debug(format!(
            "Cut: at least {} entries of my_vector_float below {}",
            self.my_int_min, self.my_float_min
        ));

        self.hist = Some(ctx.histograms.book("my_hist", "my_hist", 100, 0.0, 100.0));
        Ok(())
    }

    fn begin_input_file(&mut self, ctx: &mut StageContext) -> Result<()> {
        ctx.bind("my_int", &mut self.my_int)?;
        ctx.bind("my_float", &mut self.my_float)?;
        ctx.bind("my_vector_float", &mut self.my_vector_float)?;
        ctx.bind("new_float", &mut self.new_float)?;
        ctx.bind("new_vector_float", &mut self.new_vector_float)?;
        Ok(())
    }

    fn execute_event(&mut self, ctx: &mut StageContext) -> Result<Status> {
        let columns = self.columns()?;

        let my_int = *ctx.value(&columns.my_int)?;
        let my_float = *ctx.value(&columns.my_float)?;
        let new_float = my_float + my_int as f32;

        *ctx.value_mut(&columns.new_float)? = new_float;
        let derived = ctx.value_mut(&columns.new_vector_float)?;
        derived.clear();
        derived.push(new_float / 2.0);
        derived.push(new_float * 2.0 - my_float);

        let below = ctx
            .value(&columns.my_vector_float)?
            .iter()
            .filter(|&&v| v < self.my_float_min)
            .count();
        if (below as i64) < self.my_int_min as i64 {
            return Ok(Status::Skip);
        }

        if let Some(hist) = self.hist {
            ctx.histograms.fill(hist, new_float as f64);
        }
        Ok(Status::Success)
    }

    fn finalise(&mut self, ctx: &mut StageContext) -> Result<()> {
        if let Some(hist) = self.hist.and_then(|id| ctx.histograms.get(id)) {
            ctx.log.info(format!(
                "{} entries in '{}', mean {:.3}",
                hist.entries(),
                hist.name,
                hist.mean()
            ));
        }
        Ok(())
    }
}
