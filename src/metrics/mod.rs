//! Scalar metrics sinks
//!
//! Training and evaluation report `(tag, value, step)` scalars through
//! [`MetricsSink`]. Tags follow the `Loss/Train/Total` style so runs line up
//! with existing dashboards.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const LOSS_TOTAL: &str = "Loss/Train/Total";
pub const LOSS_ACTION: &str = "Loss/Train/Action";
pub const LOSS_ADVERB: &str = "Loss/Train/Adverb";
pub const ACC_ADVERB: &str = "Acc/Test/Video-to-Adverb Antonym";
pub const LR_ACTION_MODIFIERS: &str = "LR/ActionModifiers";
pub const LR_EMBEDDING: &str = "LR/Embedding";

/// One scalar observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarRecord {
    pub tag: String,
    pub value: f64,
    pub step: usize,
}

pub trait MetricsSink {
    fn add_scalar(&mut self, tag: &str, value: f64, step: usize) -> Result<()>;

    /// Flush pending writes
    fn flush(&mut self) -> Result<()>;
}

/// Keeps every record in memory
#[derive(Debug, Default)]
pub struct InMemorySink {
    records: Vec<ScalarRecord>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[ScalarRecord] {
        &self.records
    }

    /// Records for one tag, in insertion order
    pub fn query(&self, tag: &str) -> Vec<&ScalarRecord> {
        self.records.iter().filter(|r| r.tag == tag).collect()
    }

    /// Most recent value written under `tag`
    pub fn last(&self, tag: &str) -> Option<f64> {
        self.records.iter().rev().find(|r| r.tag == tag).map(|r| r.value)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl MetricsSink for InMemorySink {
    fn add_scalar(&mut self, tag: &str, value: f64, step: usize) -> Result<()> {
        self.records.push(ScalarRecord {
            tag: tag.to_string(),
            value,
            step,
        });
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Appends one JSON object per line
pub struct JsonlSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonlSink {
    /// Open `path` for appending, creating parent directories as needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every record of a JSONL file
    pub fn read_all<P: AsRef<Path>>(path: P) -> Result<Vec<ScalarRecord>> {
        let content = std::fs::read_to_string(path)?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|e| Error::Serialization(e.to_string()))
            })
            .collect()
    }
}

impl MetricsSink for JsonlSink {
    fn add_scalar(&mut self, tag: &str, value: f64, step: usize) -> Result<()> {
        let record = ScalarRecord {
            tag: tag.to_string(),
            value,
            step,
        };
        let line =
            serde_json::to_string(&record).map_err(|e| Error::Serialization(e.to_string()))?;
        writeln!(self.writer, "{line}")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl Drop for JsonlSink {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}
