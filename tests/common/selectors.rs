//! Selectors used to observe the driver from integration tests

use eventsel::columns::Column;
use eventsel::error::{AnalysisError, Result};
use eventsel::{BindMode, Selector, SelectorRegistry, StageContext, Status};
use std::cell::RefCell;
use std::rc::Rc;

/// (stage name, `my_int` value) for every executed record
pub type Trace = Rc<RefCell<Vec<(String, i32)>>>;

pub fn new_trace() -> Trace {
    Rc::new(RefCell::new(Vec::new()))
}

/// Records of `trace` executed by stage `name`
pub fn executed_by(trace: &Trace, name: &str) -> Vec<i32> {
    trace
        .borrow()
        .iter()
        .filter(|(stage, _)| stage == name)
        .map(|(_, id)| *id)
        .collect()
}

/// Reads `my_int`, logs it to a trace, and skips or fails on chosen values
pub struct TracingSelector {
    name: String,
    trace: Trace,
    skip_on: Option<i32>,
    fail_on: Option<i32>,
    my_int: Option<Column<i32>>,
}

impl TracingSelector {
    pub fn new(name: &str, trace: Trace) -> Self {
        Self {
            name: name.to_string(),
            trace,
            skip_on: None,
            fail_on: None,
            my_int: None,
        }
    }

    pub fn skip_on(mut self, value: i32) -> Self {
        self.skip_on = Some(value);
        self
    }

    pub fn fail_on(mut self, value: i32) -> Self {
        self.fail_on = Some(value);
        self
    }
}

impl Selector for TracingSelector {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialise(&mut self, _ctx: &mut StageContext) -> Result<()> {
        Ok(())
    }

    fn begin_input_file(&mut self, ctx: &mut StageContext) -> Result<()> {
        ctx.bind_input("my_int", &mut self.my_int)?;
        Ok(())
    }

    fn execute_event(&mut self, ctx: &mut StageContext) -> Result<Status> {
        let column = self
            .my_int
            .ok_or_else(|| AnalysisError::stage(&self.name, "my_int not bound"))?;
        let id = *ctx.value(&column)?;
        self.trace.borrow_mut().push((self.name.clone(), id));

        if self.fail_on == Some(id) {
            return Err(AnalysisError::stage(&self.name, format!("cannot handle {}", id)));
        }
        if self.skip_on == Some(id) {
            return Ok(Status::Skip);
        }
        Ok(Status::Success)
    }
}

/// Binds one column of a runtime-chosen type in every input file
pub struct DynamicSelector {
    pub column: String,
    pub descriptor: String,
}

impl Selector for DynamicSelector {
    fn name(&self) -> &str {
        "Dynamic"
    }

    fn initialise(&mut self, _ctx: &mut StageContext) -> Result<()> {
        Ok(())
    }

    fn begin_input_file(&mut self, ctx: &mut StageContext) -> Result<()> {
        ctx.bind_dynamic(&self.column, &self.descriptor, BindMode::Auto)?;
        Ok(())
    }

    fn execute_event(&mut self, _ctx: &mut StageContext) -> Result<Status> {
        Ok(Status::Success)
    }
}

/// Built-in registry plus one `TracingSelector` per `(name, skip_on, fail_on)`
pub fn tracing_registry(
    trace: &Trace,
    stages: &[(&str, Option<i32>, Option<i32>)],
) -> SelectorRegistry {
    let mut registry = SelectorRegistry::with_builtin();
    for (name, skip_on, fail_on) in stages {
        let (trace, skip_on, fail_on) = (trace.clone(), *skip_on, *fail_on);
        registry.register(*name, move |name| {
            let mut selector = TracingSelector::new(name, trace.clone());
            selector.skip_on = skip_on;
            selector.fail_on = fail_on;
            Box::new(selector)
        });
    }
    registry
}

/// Writes `new_float = my_int + 0.5` for every record
pub struct ProducerSelector {
    my_int: Option<Column<i32>>,
    new_float: Option<Column<f32>>,
}

impl ProducerSelector {
    pub fn new() -> Self {
        Self {
            my_int: None,
            new_float: None,
        }
    }
}

impl Selector for ProducerSelector {
    fn name(&self) -> &str {
        "Producer"
    }

    fn initialise(&mut self, _ctx: &mut StageContext) -> Result<()> {
        Ok(())
    }

    fn begin_input_file(&mut self, ctx: &mut StageContext) -> Result<()> {
        ctx.bind_input("my_int", &mut self.my_int)?;
        ctx.bind_output("new_float", &mut self.new_float)?;
        Ok(())
    }

    fn execute_event(&mut self, ctx: &mut StageContext) -> Result<Status> {
        let (my_int, new_float) = self
            .my_int
            .zip(self.new_float)
            .ok_or_else(|| AnalysisError::stage("Producer", "columns not bound"))?;
        let id = *ctx.value(&my_int)?;
        *ctx.value_mut(&new_float)? = id as f32 + 0.5;
        Ok(Status::Success)
    }
}

/// Records the `new_float` it sees, then doubles it
pub struct ConsumerSelector {
    seen: Rc<RefCell<Vec<f32>>>,
    new_float: Option<Column<f32>>,
}

impl ConsumerSelector {
    pub fn new(seen: Rc<RefCell<Vec<f32>>>) -> Self {
        Self {
            seen,
            new_float: None,
        }
    }
}

impl Selector for ConsumerSelector {
    fn name(&self) -> &str {
        "Consumer"
    }

    fn initialise(&mut self, _ctx: &mut StageContext) -> Result<()> {
        Ok(())
    }

    fn begin_input_file(&mut self, ctx: &mut StageContext) -> Result<()> {
        ctx.bind("new_float", &mut self.new_float)?;
        Ok(())
    }

    fn execute_event(&mut self, ctx: &mut StageContext) -> Result<Status> {
        let column = self
            .new_float
            .ok_or_else(|| AnalysisError::stage("Consumer", "new_float not bound"))?;
        let value = ctx.value_mut(&column)?;
        self.seen.borrow_mut().push(*value);
        *value *= 2.0;
        Ok(Status::Success)
    }
}
