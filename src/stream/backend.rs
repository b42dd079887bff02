//! Storage backends for record and histogram files.
//!
//! The service never touches the filesystem directly; it goes through a
//! [`RecordBackend`]. [`JsonBackend`] stores files as JSON documents on disk,
//! [`MemoryBackend`] keeps them in a shared map for tests and benchmarks.

use crate::error::{AnalysisError, Result};
use crate::histogram::HistogramFile;
use crate::stream::file::RecordFile;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Opens and writes record files by name.
#[cfg_attr(test, mockall::automock)]
pub trait RecordBackend {
    /// Open the file called `path`.
    fn open(&self, path: &str) -> Result<RecordFile>;

    /// Write `file` to `path`, replacing any existing file.
    fn write(&self, path: &str, file: &RecordFile) -> Result<()>;

    /// Write the run's histograms to `path`.
    fn write_histograms(&self, path: &str, histograms: &HistogramFile) -> Result<()>;
}

/// JSON files on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBackend;

impl JsonBackend {
    fn create(path: &str) -> Result<BufWriter<File>> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(BufWriter::new(File::create(path)?))
    }

    /// Serialize `value` and flush, so a failed final write is reported.
    fn write_json<W: Write, V: serde::Serialize>(
        mut writer: W,
        value: &V,
        pretty: bool,
    ) -> Result<()> {
        if pretty {
            serde_json::to_writer_pretty(&mut writer, value)?;
        } else {
            serde_json::to_writer(&mut writer, value)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl RecordBackend for JsonBackend {
    fn open(&self, path: &str) -> Result<RecordFile> {
        let file = File::open(path)?;
        let record_file = serde_json::from_reader(BufReader::new(file))?;
        Ok(record_file)
    }

    fn write(&self, path: &str, file: &RecordFile) -> Result<()> {
        Self::write_json(Self::create(path)?, file, false)
    }

    fn write_histograms(&self, path: &str, histograms: &HistogramFile) -> Result<()> {
        Self::write_json(Self::create(path)?, histograms, true)
    }
}

#[derive(Debug, Default)]
struct MemoryFiles {
    records: HashMap<String, RecordFile>,
    histograms: HashMap<String, HistogramFile>,
}

/// In-memory files. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    files: Arc<Mutex<MemoryFiles>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn files(&self) -> MutexGuard<'_, MemoryFiles> {
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store `file` under `path`.
    pub fn insert(&self, path: impl Into<String>, file: RecordFile) {
        self.files().records.insert(path.into(), file);
    }

    /// A copy of the record file stored under `path`.
    pub fn get(&self, path: &str) -> Option<RecordFile> {
        self.files().records.get(path).cloned()
    }

    /// A copy of the histogram file stored under `path`.
    pub fn histograms(&self, path: &str) -> Option<HistogramFile> {
        self.files().histograms.get(path).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files().records.contains_key(path)
    }
}

impl RecordBackend for MemoryBackend {
    fn open(&self, path: &str) -> Result<RecordFile> {
        self.get(path).ok_or_else(|| {
            AnalysisError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such file '{}'", path),
            ))
        })
    }

    fn write(&self, path: &str, file: &RecordFile) -> Result<()> {
        self.insert(path, file.clone());
        Ok(())
    }

    fn write_histograms(&self, path: &str, histograms: &HistogramFile) -> Result<()> {
        self.files()
            .histograms
            .insert(path.to_string(), histograms.clone());
        Ok(())
    }
}
