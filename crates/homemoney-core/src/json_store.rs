//! File-backed JSON document store
//!
//! Each document lives in `<dir>/<name>.json`. Names are sanitized so a
//! caller can never escape the store directory.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::error::{Error, Result};

const EXTENSION: &str = ".json";

/// Metadata about a stored document
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonFileInfo {
    pub filename: String,
    pub size: u64,
    pub modified_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// JSON documents stored as individual files in one directory
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

/// Replace path separators and parent references
pub fn sanitize_filename(name: &str) -> String {
    name.replace("..", "_").replace(['/', '\\'], "_")
}

impl JsonFileStore {
    /// Create a store rooted at `dir`, creating the directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
            info!("Created JSON file directory: {}", dir.display());
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        let name = sanitize_filename(name.trim());
        let name = name.strip_suffix(EXTENSION).unwrap_or(&name);
        if name.is_empty() {
            return Err(Error::InvalidData("filename is required".into()));
        }
        Ok(self.dir.join(format!("{}{}", name, EXTENSION)))
    }

    /// Read a document; a missing file reads as an empty object
    pub fn read(&self, name: &str) -> Result<Value> {
        let path = self.path_for(name)?;
        if !path.exists() {
            return Ok(Value::Object(Default::default()));
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write a document atomically and return its path
    pub fn write(&self, name: &str, document: &Value) -> Result<PathBuf> {
        let path = self.path_for(name)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut tmp, document)?;
        tmp.flush()?;
        tmp.persist(&path).map_err(|e| Error::Io(e.error))?;
        Ok(path)
    }

    /// Stored document names without the `.json` suffix, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        if !self.dir.exists() {
            return Ok(names);
        }
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            if let Some(name) = file_name.to_str().and_then(|n| n.strip_suffix(EXTENSION)) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Delete a document; fails with `NotFound` when missing
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.path_for(name)?;
        if !path.exists() {
            return Err(Error::NotFound(format!("json file {}", name)));
        }
        fs::remove_file(&path)?;
        info!("Deleted JSON file: {}", path.display());
        Ok(())
    }

    /// Size and timestamps of a stored document
    pub fn info(&self, name: &str) -> Result<JsonFileInfo> {
        let path = self.path_for(name)?;
        let metadata = match fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(format!("json file {}", name)))
            }
            Err(e) => return Err(e.into()),
        };
        let modified: DateTime<Utc> = metadata.modified()?.into();
        // Not every filesystem records creation time
        let created: DateTime<Utc> = metadata.created().map(Into::into).unwrap_or(modified);

        Ok(JsonFileInfo {
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            size: metadata.len(),
            modified_at: modified,
            created_at: created,
        })
    }
}
