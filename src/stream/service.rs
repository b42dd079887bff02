//! Record stream service.
//!
//! The service owns the input and output trees of a run. Input files are
//! opened in configured order and drained one after the other; the output
//! tree is created once and written at the end of the run. The service also
//! holds the column buffers bound by the stages, one per column name, and a
//! per-record object store that lets stages pass transient values to later
//! stages.

use crate::columns::ColumnTable;
use crate::config::Store;
use crate::error::{AnalysisError, Result};
use crate::histogram::HistogramFile;
use crate::log::Log;
use crate::stream::backend::RecordBackend;
use crate::stream::file::RecordFile;
use crate::stream::tree::Tree;

/// An input file and the number of entries in its tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSource {
    pub name: String,
    pub entries: usize,
}

/// The currently loaded input file.
#[derive(Debug)]
struct ActiveInput {
    index: usize,
    tree: Tree,
}

pub struct Service {
    tree_name: String,
    backend: Box<dyn RecordBackend>,
    inputs: Vec<InputSource>,
    next_input: usize,
    current: Option<ActiveInput>,
    output: Option<Tree>,
    n_events: u64,
    columns: ColumnTable,
    objects: Store,
    log: Log,
}

impl Service {
    pub fn new(tree_name: impl Into<String>, backend: Box<dyn RecordBackend>, log: Log) -> Self {
        let objects = Store::with_log(log.child("objects"));
        Self {
            tree_name: tree_name.into(),
            backend,
            inputs: Vec::new(),
            next_input: 0,
            current: None,
            output: None,
            n_events: 0,
            columns: ColumnTable::new(),
            objects,
            log,
        }
    }

    fn open_tree(&self, name: &str) -> Result<Tree> {
        let mut file = self.backend.open(name).map_err(|e| {
            self.log
                .error(format!("Could not open input file '{}': {}", name, e));
            AnalysisError::StreamConfiguration(format!("cannot open '{}': {}", name, e))
        })?;
        let tree = file.take_tree(&self.tree_name).ok_or_else(|| {
            self.log.error(format!(
                "Input file '{}' has no tree '{}'",
                name, self.tree_name
            ));
            AnalysisError::StreamConfiguration(format!(
                "no tree '{}' in '{}'",
                self.tree_name, name
            ))
        })?;
        tree.validate()?;
        Ok(tree)
    }

    /// Check every input file and count the entries available to the run.
    pub fn configure_input(&mut self, files: &[String]) -> Result<()> {
        if files.is_empty() {
            return Err(AnalysisError::StreamConfiguration(
                "no input files configured".to_string(),
            ));
        }

        let mut inputs = Vec::with_capacity(files.len());
        for name in files {
            let tree = self.open_tree(name)?;
            self.log.debug(format!(
                "Input file '{}' holds {} entries",
                name,
                tree.entries()
            ));
            inputs.push(InputSource {
                name: name.clone(),
                entries: tree.entries(),
            });
        }

        self.inputs = inputs;
        self.next_input = 0;
        self.current = None;
        self.n_events = self.inputs.iter().map(|i| i.entries as u64).sum();
        self.log.info(format!(
            "Configured {} input file(s) with {} entries in total",
            self.inputs.len(),
            self.n_events
        ));
        Ok(())
    }

    /// Create the output tree. May only be called once per run.
    pub fn create_output_stream(&mut self) -> Result<()> {
        if self.output.is_some() {
            self.log.error("Output stream already initialised");
            return Err(AnalysisError::StreamConfiguration(
                "already initialised".to_string(),
            ));
        }
        self.output = Some(Tree::new(self.tree_name.clone()).with_title("eventsel ntuple"));
        Ok(())
    }

    pub fn has_next_input(&self) -> bool {
        self.next_input < self.inputs.len()
    }

    /// Load the next input file with every column disabled.
    pub fn advance_to_next_input(&mut self) -> Result<&str> {
        let index = self.next_input;
        if index >= self.inputs.len() {
            self.log.error(format!(
                "Input index {} out of range ({} files)",
                index,
                self.inputs.len()
            ));
            return Err(AnalysisError::StreamConfiguration(format!(
                "input index {} out of range",
                index
            )));
        }

        if !self.columns.is_empty() {
            self.log.warning(format!(
                "{} column(s) still bound while switching input files",
                self.columns.len()
            ));
        }

        let name = self.inputs[index].name.clone();
        let mut tree = self.open_tree(&name)?;
        tree.set_enabled("*", false);
        tree.reset_cursor();
        self.log.info(format!(
            "Opened input file '{}' ({} of {})",
            name,
            index + 1,
            self.inputs.len()
        ));

        self.current = Some(ActiveInput { index, tree });
        self.next_input += 1;
        Ok(self.inputs[index].name.as_str())
    }

    /// Position the input cursor on `entry`, load the bound input columns
    /// and clear the object store.
    pub fn begin_record(&mut self, entry: usize) -> Result<()> {
        self.objects.flush();
        let input = self.current.as_mut().ok_or_else(|| {
            AnalysisError::StreamConfiguration("no input file loaded".to_string())
        })?;
        input.tree.set_cursor(entry)?;
        self.columns.load(&input.tree)
    }

    /// Append one output row from the bound columns. Returns the output
    /// entry count.
    pub fn fill_output(&mut self) -> Result<usize> {
        let output = self.output.as_mut().ok_or_else(|| {
            AnalysisError::StreamConfiguration("output stream not initialised".to_string())
        })?;
        self.columns.stage_outputs(output)?;
        Ok(output.fill())
    }

    /// Write the output tree to `path`. Returns the number of entries written.
    pub fn write_output(&mut self, path: &str) -> Result<usize> {
        let output = self.output.take().ok_or_else(|| {
            AnalysisError::StreamConfiguration("output stream not initialised".to_string())
        })?;
        let entries = output.entries();
        self.backend.write(path, &RecordFile::with_tree(output))?;
        self.log
            .info(format!("Wrote {} entries to '{}'", entries, path));
        Ok(entries)
    }

    pub fn write_histograms(&self, path: &str, histograms: &HistogramFile) -> Result<()> {
        self.backend.write_histograms(path, histograms)?;
        self.log.info(format!(
            "Wrote {} histogram director{} to '{}'",
            histograms.directories.len(),
            if histograms.directories.len() == 1 { "y" } else { "ies" },
            path
        ));
        Ok(())
    }

    /// Total entries over all configured inputs.
    pub fn n_events(&self) -> u64 {
        self.n_events
    }

    pub fn tree_name(&self) -> &str {
        &self.tree_name
    }

    pub fn input_tree(&self) -> Option<&Tree> {
        self.current.as_ref().map(|input| &input.tree)
    }

    pub fn input_tree_mut(&mut self) -> Option<&mut Tree> {
        self.current.as_mut().map(|input| &mut input.tree)
    }

    pub fn output_tree(&self) -> Option<&Tree> {
        self.output.as_ref()
    }

    pub fn output_tree_mut(&mut self) -> Option<&mut Tree> {
        self.output.as_mut()
    }

    /// Column buffers bound by the stages.
    pub fn columns(&self) -> &ColumnTable {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut ColumnTable {
        &mut self.columns
    }

    pub fn objects(&self) -> &Store {
        &self.objects
    }

    pub fn objects_mut(&mut self) -> &mut Store {
        &mut self.objects
    }

    /// Name of the loaded input file.
    pub fn current_input(&self) -> Option<&str> {
        self.current
            .as_ref()
            .map(|input| self.inputs[input.index].name.as_str())
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn inputs(&self) -> &[InputSource] {
        &self.inputs
    }
}
