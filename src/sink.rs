//! Record sinks — where observers route their side effects
//!
//! A `Sink` accepts structured records (alerts, audit entries) and decides
//! how to render or store them. Observers own an `Arc<dyn Sink<T>>` and never
//! format output themselves.
//!
//! - `TracingSink` forwards records to `tracing` (see the observer modules
//!   for the per-record impls)
//! - `MemorySink` keeps a bounded in-memory buffer for querying and tests
//! - `FileSink` appends JSON lines to a file and flushes on drop

use crate::error::{AccessError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

/// Destination for records of type `T`
pub trait Sink<T>: Send + Sync {
    /// Accept a single record
    fn write(&self, record: &T) -> Result<()>;

    /// Sink name used in logs and error reports
    fn name(&self) -> &str;
}

/// Sink that emits records as structured `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

/// Bounded in-memory sink
///
/// Oldest records are evicted once `capacity` is reached. A capacity of
/// zero keeps every record.
#[derive(Debug)]
pub struct MemorySink<T> {
    inner: RwLock<MemoryInner<T>>,
    capacity: usize,
}

#[derive(Debug)]
struct MemoryInner<T> {
    records: VecDeque<T>,
    total_written: u64,
}

impl<T> MemorySink<T> {
    /// Create a sink retaining at most `capacity` records
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(MemoryInner {
                records: VecDeque::new(),
                total_written: 0,
            }),
            capacity,
        }
    }

    /// Number of records currently retained
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .records
            .len()
    }

    /// True when no records are retained
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total records written, including evicted ones
    pub fn total_written(&self) -> u64 {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .total_written
    }

    /// Drop all retained records (the total counter is kept)
    pub fn clear(&self) {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .records
            .clear();
    }
}

impl<T: Clone> MemorySink<T> {
    /// Most recent records, newest first
    pub fn recent(&self, limit: usize) -> Vec<T> {
        let inner = self
            .inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.records.iter().rev().take(limit).cloned().collect()
    }

    /// All retained records in write order
    pub fn records(&self) -> Vec<T> {
        let inner = self
            .inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.records.iter().cloned().collect()
    }
}

impl<T> Default for MemorySink<T> {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl<T: Clone + Send + Sync> Sink<T> for MemorySink<T> {
    fn write(&self, record: &T) -> Result<()> {
        let mut inner = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if self.capacity > 0 && inner.records.len() >= self.capacity {
            inner.records.pop_front();
        }
        inner.records.push_back(record.clone());
        inner.total_written += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Configuration for a JSON-lines file sink
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FileSinkConfig {
    /// Path of the JSONL file (appended to, created if missing)
    pub path: PathBuf,

    /// Flush the writer after every record
    pub flush_each: bool,
}

impl Default for FileSinkConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("audit/access.jsonl"),
            flush_each: true,
        }
    }
}

/// Append-only JSON-lines sink
///
/// The file handle is held for the sink's lifetime and flushed on drop.
pub struct FileSink<T> {
    path: PathBuf,
    flush_each: bool,
    writer: Mutex<BufWriter<File>>,
    _record: PhantomData<fn(&T)>,
}

impl<T> FileSink<T> {
    /// Open (or create) the file described by `config`
    pub fn open(config: FileSinkConfig) -> Result<Self> {
        if config.path.as_os_str().is_empty() {
            return Err(AccessError::Config(
                "File sink path must not be empty".to_string(),
            ));
        }

        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AccessError::Config(format!(
                        "Failed to create sink directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)
            .map_err(|e| {
                AccessError::Config(format!(
                    "Failed to open sink file {}: {}",
                    config.path.display(),
                    e
                ))
            })?;

        tracing::debug!(path = %config.path.display(), "File sink opened");

        Ok(Self {
            path: config.path,
            flush_each: config.flush_each,
            writer: Mutex::new(BufWriter::new(file)),
            _record: PhantomData,
        })
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush buffered records to disk
    pub fn flush(&self) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        writer.flush()?;
        Ok(())
    }
}

impl<T: DeserializeOwned> FileSink<T> {
    /// Flush and read back every record in the file
    pub fn load(&self) -> Result<Vec<T>> {
        self.flush()?;
        let reader = BufReader::new(File::open(&self.path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }
}

impl<T: Serialize> Sink<T> for FileSink<T> {
    fn write(&self, record: &T) -> Result<()> {
        let line = serde_json::to_string(record)?;
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let written = match writeln!(writer, "{}", line) {
            Ok(()) if self.flush_each => writer.flush(),
            other => other,
        };
        written.map_err(|e| AccessError::Sink {
            sink: "file".to_string(),
            reason: format!("Failed to append to {}: {}", self.path.display(), e),
        })?;
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}

impl<T> Drop for FileSink<T> {
    fn drop(&mut self) {
        let writer = self
            .writer
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = writer.flush() {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to flush file sink on drop"
            );
        }
    }
}
