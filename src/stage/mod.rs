//! Selector stages.
//!
//! Two layers:
//! - **`Selector` trait**: the user-written analysis step. It reads its
//!   parameters, binds columns, and decides per record whether the record
//!   passes.
//! - **`StageSlot`**: owns one selector together with its column registry,
//!   configuration view, log handle and histograms, and enforces the
//!   lifecycle order.
//!
//! Selectors are created by name through a [`SelectorRegistry`].

pub mod registry;
pub mod selectors;
pub mod slot;

pub use registry::{BuiltinSelector, SelectorFactory, SelectorRegistry};
pub use slot::{StageSlot, StageState, StageStats};

use crate::columns::{BindMode, Column, ColumnBuffer, ColumnRegistry, ColumnValue, DynamicColumn};
use crate::config::{ConfigView, FieldValue, Store};
use crate::error::Result;
use crate::histogram::HistogramDir;
use crate::log::Log;
use crate::stream::Service;
use std::fmt;

/// Per-record outcome of a selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The record passes; later stages run.
    Success,
    /// The record is rejected; later stages do not run for it.
    Skip,
    /// The record could not be processed; later stages do not run for it.
    Error,
}

impl Status {
    pub fn is_success(&self) -> bool {
        matches!(self, Status::Success)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Success => write!(f, "SUCCESS"),
            Status::Skip => write!(f, "SKIP"),
            Status::Error => write!(f, "ERROR"),
        }
    }
}

/// Everything a selector may touch from its lifecycle hooks.
pub struct StageContext<'a> {
    /// Name of the stage, used to scope parameters.
    pub name: &'a str,
    /// Read-only steering configuration.
    pub config: &'a ConfigView,
    /// The stage's column slots.
    pub columns: &'a mut ColumnRegistry,
    /// The record stream service.
    pub service: &'a mut Service,
    /// The stage's histograms.
    pub histograms: &'a mut HistogramDir,
    /// The stage's log handle.
    pub log: &'a Log,
}

impl<'a> StageContext<'a> {
    /// Parameter `"<stage>::<name>"`.
    pub fn param<T: FieldValue>(&self, name: &str) -> Result<T> {
        self.config.get(&ConfigView::param(self.name, name))
    }

    pub fn param_or<T: FieldValue>(&self, name: &str, default: T) -> Result<T> {
        self.config.get_or(&ConfigView::param(self.name, name), default)
    }

    /// Bind `name` as input if the input tree has it, else as a new output column.
    pub fn bind<T: ColumnValue>(
        &mut self,
        name: &str,
        handle: &mut Option<Column<T>>,
    ) -> Result<Column<T>> {
        self.columns.bind(self.service, name, handle, BindMode::Auto)
    }

    pub fn bind_input<T: ColumnValue>(
        &mut self,
        name: &str,
        handle: &mut Option<Column<T>>,
    ) -> Result<Column<T>> {
        self.columns.bind(self.service, name, handle, BindMode::Input)
    }

    pub fn bind_output<T: ColumnValue>(
        &mut self,
        name: &str,
        handle: &mut Option<Column<T>>,
    ) -> Result<Column<T>> {
        self.columns.bind(self.service, name, handle, BindMode::Output)
    }

    /// Bind `name` with a type given as a descriptor such as `vector<float>`.
    pub fn bind_dynamic(
        &mut self,
        name: &str,
        descriptor: &str,
        mode: BindMode,
    ) -> Result<DynamicColumn> {
        self.columns.bind_dynamic(self.service, name, descriptor, mode)
    }

    /// Current value of a bound column. Stages binding the same name share it.
    pub fn value<T: ColumnValue>(&self, column: &Column<T>) -> Result<&T> {
        self.columns.get(&*self.service, column)
    }

    pub fn value_mut<T: ColumnValue>(&mut self, column: &Column<T>) -> Result<&mut T> {
        self.columns.get_mut(&mut *self.service, column)
    }

    pub fn buffer(&self, column: &DynamicColumn) -> Result<&ColumnBuffer> {
        self.columns.buffer(&*self.service, column)
    }

    pub fn buffer_mut(&mut self, column: &DynamicColumn) -> Result<&mut ColumnBuffer> {
        self.columns.buffer_mut(&mut *self.service, column)
    }

    /// Per-record object store shared by all stages.
    pub fn objects(&self) -> &Store {
        self.service.objects()
    }

    pub fn objects_mut(&mut self) -> &mut Store {
        self.service.objects_mut()
    }
}

/// An analysis step run for every record.
///
/// `initialise` runs once before any input is opened, `begin_input_file`
/// once per input file, `execute_event` once per record and `finalise` once
/// at the end of the run. Column bindings made in `begin_input_file` are
/// released automatically when the file ends.
pub trait Selector {
    /// Name of this selector.
    fn name(&self) -> &str;

    /// Read parameters and book histograms. No stream access.
    fn initialise(&mut self, ctx: &mut StageContext) -> Result<()>;

    /// Bind columns against the newly opened input file.
    fn begin_input_file(&mut self, ctx: &mut StageContext) -> Result<()>;

    /// Process the current record. An `Err` counts as [`Status::Error`].
    fn execute_event(&mut self, ctx: &mut StageContext) -> Result<Status>;

    /// Called once at the end of the run.
    fn finalise(&mut self, _ctx: &mut StageContext) -> Result<()> {
        Ok(())
    }
}
