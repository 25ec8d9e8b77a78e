//! Local transcript input and work-item persistence.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clarity_coordination::WorkItemCollection;
use tracing::{error, info};

use crate::config::StorageConfig;

/// Filesystem collaborator of the pipeline.
///
/// Neither operation fails across this boundary: reading yields `""` when the
/// transcript is unavailable, saving is best-effort and only logs.
#[cfg_attr(test, mockall::automock)]
pub trait WorkItemStore: Send + Sync {
    /// Full transcript text, or `""` if it cannot be read.
    fn read_transcript(&self, filename: &str) -> String;

    /// Persist the collection. Returns where it was written, if anywhere.
    fn save_work_items(&self, items: &WorkItemCollection) -> Option<PathBuf>;
}

/// Directory-backed store: transcripts in one directory, timestamped JSON
/// results in another.
pub struct FsStorage {
    transcript_dir: PathBuf,
    work_dir: PathBuf,
}

impl FsStorage {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            transcript_dir: config.transcript_path(),
            work_dir: config.work_path(),
        }
    }

    fn write_items(&self, items: &WorkItemCollection) -> Result<PathBuf> {
        let filename = format!("{}_work_items.json", chrono::Utc::now().timestamp());
        let outpath = self.work_dir.join(filename);

        fs::create_dir_all(&self.work_dir)
            .with_context(|| format!("creating {}", self.work_dir.display()))?;
        let json = serde_json::to_string_pretty(items.items())
            .context("serializing work items")?;
        fs::write(&outpath, json).with_context(|| format!("writing {}", outpath.display()))?;

        Ok(outpath)
    }
}

impl WorkItemStore for FsStorage {
    fn read_transcript(&self, filename: &str) -> String {
        let inpath = self.transcript_dir.join(filename);

        match fs::read_to_string(&inpath) {
            Ok(content) => {
                info!(path = %inpath.display(), "Read transcript file");
                content
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                error!(path = %inpath.display(), "Transcript file not found");
                String::new()
            }
            Err(e) => {
                error!(path = %inpath.display(), "Failed to read transcript file: {e}");
                String::new()
            }
        }
    }

    fn save_work_items(&self, items: &WorkItemCollection) -> Option<PathBuf> {
        match self.write_items(items) {
            Ok(path) => {
                info!(count = items.len(), path = %path.display(), "Saved work items");
                Some(path)
            }
            Err(e) => {
                error!(dir = %self.work_dir.display(), "Failed to save work items: {e:#}");
                None
            }
        }
    }
}
