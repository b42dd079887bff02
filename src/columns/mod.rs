//! Typed columns, the run-wide column table and the per-stage binding registry.
//!
//! Column types form a closed set: ten scalar kinds at three depths (value,
//! sequence, sequence of sequences). Every buffer and every stored column is
//! one variant of a generated enum, so allocation and release always agree on
//! the concrete type.

pub mod buffer;
pub mod kind;
pub mod registry;
pub mod table;

pub use buffer::{ColumnBuffer, ColumnData, ColumnValue};
pub use kind::{ColumnType, Depth, ScalarKind};
pub use registry::{BindMode, Column, ColumnRegistry, ColumnSlot, DynamicColumn, SlotId};
pub use table::{ColumnTable, Direction, SharedColumn};
