//! Where finished snapshots go.
//!
//! The pipeline hands a sink fully formed JSON values; naming and
//! timestamping of the written artifacts is the sink's business.

use chrono::Utc;
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("I/O error writing snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait SnapshotSink: Send + Sync {
    /// Persists `data` for `category` and returns a locator for it.
    fn write_snapshot(&self, data: &Value, category: &str) -> Result<String, SinkError>;

    /// Persists the run-wide project overview. Sinks that name artifacts
    /// after their category must keep it apart from a category that is
    /// itself called "projects".
    fn write_overview(&self, data: &Value) -> Result<String, SinkError> {
        self.write_snapshot(data, "projects")
    }

    /// Persists a PNG image labelled `label` and returns a locator for it.
    fn write_image(&self, bytes: &[u8], label: &str) -> Result<String, SinkError>;
}

/// File stem of the overview artifact. Slugs never contain `_`, so no
/// category can produce it.
const OVERVIEW_STEM: &str = "projects_overview";

/// Writes each artifact as a file inside one directory, stamped with the
/// time the sink was created.
///
/// Files are never overwritten: a name already taken gets a `-1`, `-2`, ...
/// suffix.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
    stamp: String,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            stamp: Utc::now().format("%Y-%m-%dT%H-%M-%S%.3fZ").to_string(),
        }
    }

    fn create(&self, stem: &str, extension: &str, bytes: &[u8]) -> Result<PathBuf, SinkError> {
        fs::create_dir_all(&self.dir)?;
        let mut attempt = 0;
        loop {
            let name = match attempt {
                0 => format!("{}_{}.{}", stem, self.stamp, extension),
                n => format!("{}_{}-{}.{}", stem, self.stamp, n, extension),
            };
            let path = self.dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(bytes)?;
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn write_json(&self, stem: &str, data: &Value) -> Result<String, SinkError> {
        let path = self.create(stem, "json", &serde_json::to_vec_pretty(data)?)?;
        debug!(path = %path.display(), "Snapshot written");
        Ok(path.display().to_string())
    }
}

impl SnapshotSink for JsonFileSink {
    fn write_snapshot(&self, data: &Value, category: &str) -> Result<String, SinkError> {
        self.write_json(&slug(category), data)
    }

    fn write_overview(&self, data: &Value) -> Result<String, SinkError> {
        self.write_json(OVERVIEW_STEM, data)
    }

    fn write_image(&self, bytes: &[u8], label: &str) -> Result<String, SinkError> {
        let path = self.create(&slug(label), "png", bytes)?;
        debug!(path = %path.display(), "Image written");
        Ok(path.display().to_string())
    }
}

/// Keeps artifacts in memory; handy for embedding and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    snapshots: Mutex<Vec<(String, Value)>>,
    images: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(category, data)` pairs in write order.
    pub fn snapshots(&self) -> Vec<(String, Value)> {
        self.snapshots
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    pub fn image_labels(&self) -> Vec<String> {
        self.images
            .lock()
            .map(|images| images.iter().map(|(label, _)| label.clone()).collect())
            .unwrap_or_default()
    }
}

impl SnapshotSink for MemorySink {
    fn write_snapshot(&self, data: &Value, category: &str) -> Result<String, SinkError> {
        let mut snapshots = self
            .snapshots
            .lock()
            .map_err(|_| std::io::Error::other("memory sink poisoned"))?;
        snapshots.push((category.to_string(), data.clone()));
        Ok(format!("memory://{}/{}", slug(category), snapshots.len()))
    }

    fn write_image(&self, bytes: &[u8], label: &str) -> Result<String, SinkError> {
        let mut images = self
            .images
            .lock()
            .map_err(|_| std::io::Error::other("memory sink poisoned"))?;
        images.push((label.to_string(), bytes.to_vec()));
        Ok(format!("memory://images/{}", images.len()))
    }
}

/// Lowercase file-name-safe form of a label.
pub fn slug(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    for c in label.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "snapshot".to_string()
    } else {
        slug.to_string()
    }
}
