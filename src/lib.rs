//! # eventsel: record-at-a-time event selection
//!
//! A pipeline of selector stages reads typed columns from input record
//! streams, computes derived columns and histograms, and filters records into
//! an output ntuple.
//!
//! ## Architecture
//!
//! - **Config**: typed key/value steering store parsed from a flat text file
//! - **Columns**: closed set of column types, the run-wide column table and
//!   the per-stage binding registry
//! - **Stream**: trees, record files, storage backends and the stream service
//! - **Stage**: the `Selector` trait, its lifecycle slot and the factory registry
//! - **Manager**: the driver looping over files and records
//!
//! ## Steering file
//!
//! ```text
//! sequence<string> inputFileNames = ExampleTree.json
//! string           inputTreeName  = tree
//! int              nEventsMax     = -1
//! sequence<string> selectors      = ExampleSelector
//! float            ExampleSelector::my_float_min = 30.
//! int              ExampleSelector::my_int_min   = 2
//! ```
//!
//! ## Example
//!
//! ```
//! use eventsel::{
//!     config::Store,
//!     example_tree,
//!     manager::AnalysisManager,
//!     stage::SelectorRegistry,
//!     stream::{MemoryBackend, RecordFile},
//! };
//!
//! let backend = MemoryBackend::new();
//! backend.insert("in.json", RecordFile::with_tree(example_tree::generate("tree", 100, 1).unwrap()));
//!
//! let store = Store::parse(
//!     "sequence<string> inputFileNames = in.json\n\
//!      sequence<string> selectors = ExampleSelector\n\
//!      float ExampleSelector::my_float_min = 30.\n\
//!      int ExampleSelector::my_int_min = 2\n",
//! )
//! .unwrap();
//!
//! let manager =
//!     AnalysisManager::new(store, Box::new(backend.clone()), &SelectorRegistry::with_builtin())
//!         .unwrap();
//! let summary = manager.run().unwrap();
//! assert_eq!(summary.processed, 100);
//! assert!(backend.contains("ntuple.json"));
//! ```

pub mod columns;
pub mod config;
pub mod error;
pub mod example_tree;
pub mod histogram;
pub mod log;
pub mod manager;
pub mod stage;
pub mod stream;

// Re-export commonly used types
pub use columns::{BindMode, Column, ColumnRegistry, ColumnType};
pub use config::{ConfigView, Store};
pub use error::{AnalysisError, Result};
pub use log::{Log, LogLevel};
pub use manager::{AnalysisManager, RunConfig, RunSummary};
pub use stage::{Selector, SelectorRegistry, StageContext, Status};
pub use stream::{JsonBackend, MemoryBackend, RecordBackend, Service};
