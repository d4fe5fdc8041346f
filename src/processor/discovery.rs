//! Input discovery for per-year observation tables
//!
//! Finds the files in the data directory whose names match the configured
//! glob pattern. Only the top level of the directory is searched.

use crate::error::{ProcessorError, Result};
use glob::Pattern;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

/// File discovery component for a data directory
#[derive(Debug)]
pub struct FileDiscovery {
    data_dir: PathBuf,
    pattern: String,
}

impl FileDiscovery {
    /// Create a new file discovery instance
    pub fn new(data_dir: PathBuf, pattern: impl Into<String>) -> Self {
        Self {
            data_dir,
            pattern: pattern.into(),
        }
    }

    /// Discover matching files, sorted by path
    ///
    /// ```text
    /// data_dir/
    ///   kerala_env_2019.csv   <- matched
    ///   kerala_env_2020.csv   <- matched
    ///   notes.txt
    ///   archive/
    ///     kerala_env_2018.csv <- not searched
    /// ```
    pub async fn discover_files(&self) -> Result<Vec<PathBuf>> {
        if !self.data_dir.is_dir() {
            return Err(ProcessorError::InputNotFound {
                path: self.data_dir.clone(),
            });
        }

        let pattern = Pattern::new(&self.pattern)?;
        debug!(
            "Searching for '{}' in: {}",
            self.pattern,
            self.data_dir.display()
        );

        let mut files = Vec::new();
        let mut dir = fs::read_dir(&self.data_dir).await?;

        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let path = entry.path();
            let matches = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| pattern.matches(name));
            if matches {
                files.push(path);
            }
        }

        files.sort();
        debug!("Found {} input files", files.len());

        Ok(files)
    }
}
