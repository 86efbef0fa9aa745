//! Scope-bound temporary files.
//!
//! A [`ScratchFile`] is created empty on disk, handed out by path so other
//! processes can reopen and overwrite it, and removed when the owner releases
//! it. Releasing explicitly reports deletion failures; dropping the handle
//! (early return, `?`, cancelled future, panic unwind) still removes the file
//! and only logs a failure, so an error already propagating is never masked.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::Builder;

use crate::error::{Error, ResourceAction, Result};

const SCRATCH_PREFIX: &str = "qarun-";

/// A temporary file owned by a single scope.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    released: bool,
}

impl ScratchFile {
    /// Creates an empty file in the system temporary directory.
    ///
    /// # Errors
    /// Returns `Error::Resource` if the file cannot be created.
    pub fn acquire(suffix: Option<&str>) -> Result<Self> {
        Self::acquire_in(&env::temp_dir(), suffix)
    }

    /// Creates an empty file in `dir`, with an optional filename suffix.
    ///
    /// The file handle is closed before returning; only the path is kept.
    ///
    /// # Errors
    /// Returns `Error::Resource` if the file cannot be created.
    pub fn acquire_in(dir: &Path, suffix: Option<&str>) -> Result<Self> {
        let mut builder = Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        if let Some(suffix) = suffix {
            builder.suffix(suffix);
        }

        let file = builder
            .tempfile_in(dir)
            .map_err(|source| Error::Resource {
                action: ResourceAction::Create,
                path: dir.to_path_buf(),
                source,
            })?;

        let path = file
            .into_temp_path()
            .keep()
            .map_err(|error| Error::Resource {
                action: ResourceAction::Create,
                path: error.path.to_path_buf(),
                source: error.error,
            })?;

        tracing::debug!("Acquired scratch file {}", path.display());
        Ok(Self {
            path,
            released: false,
        })
    }

    /// Path of the scratch file, valid until release.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes the file.
    ///
    /// # Errors
    /// Returns `Error::Resource` if deletion fails, including when the file
    /// was already removed by someone else.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        fs::remove_file(&self.path).map_err(|source| Error::Resource {
            action: ResourceAction::Delete,
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!("Released scratch file {}", self.path.display());
        Ok(())
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(error) = fs::remove_file(&self.path) {
            tracing::warn!(
                "failed to delete scratch file {}: {error}",
                self.path.display()
            );
        }
    }
}
