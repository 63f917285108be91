//! Generated files and how they reach disk.
//!
//! A file is written to a temporary sibling in the output directory and then
//! renamed over its destination, so a reader sees either the previous
//! contents or the new contents and never a truncated file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Serialize;

use crate::error::{MaterializationError, Result};

/// One rendered output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    /// File name inside the output directory.
    pub name: String,
    pub contents: String,
}

impl Artifact {
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }

    /// Atomically replace `<dir>/<name>` with this artifact.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(&self.name);
        let tmp = dir.join(format!(".{}.tmp", self.name));
        let io_err = |source| MaterializationError::Write {
            path: path.clone(),
            source,
        };

        let mut file = fs::File::create(&tmp).map_err(io_err)?;
        file.write_all(self.contents.as_bytes()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(io_err(e));
        }
        debug!("wrote {} ({} bytes)", path.display(), self.contents.len());
        Ok(path)
    }
}

/// Create `dir` if needed and write every artifact into it.
pub fn write_all(dir: &Path, artifacts: &[Artifact]) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|source| MaterializationError::Write {
        path: dir.to_path_buf(),
        source,
    })?;
    artifacts.iter().map(|a| a.write_to(dir)).collect()
}
