//! Record streams: trees, record files, storage backends and the service
//! that drives them through a run.

pub mod backend;
pub mod file;
pub mod service;
pub mod tree;

pub use backend::{JsonBackend, MemoryBackend, RecordBackend};
pub use file::{FileHeader, RecordFile};
pub use service::{InputSource, Service};
pub use tree::{Tree, TreeColumn};
