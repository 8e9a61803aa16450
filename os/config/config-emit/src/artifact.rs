//! Generated files and how they reach the build directory.

use crate::error::EmitError;
use std::fs;
use std::io;
use std::path::Path;

/// One generated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// File name relative to the build directory.
    pub name: String,
    pub contents: String,
}

impl Artifact {
    #[must_use]
    pub fn new(name: impl Into<String>, contents: String) -> Self {
        Self {
            name: name.into(),
            contents,
        }
    }

    /// Writes the file into `dir` unless it already holds exactly these
    /// contents, so that unchanged headers keep their timestamps.
    ///
    /// Returns whether the file was written.
    ///
    /// # Errors
    /// [`EmitError::Io`] when the file cannot be written.
    pub fn write_if_changed(&self, dir: &Path) -> Result<bool, EmitError> {
        let path = dir.join(&self.name);
        let io_error = |source| EmitError::Io {
            path: path.clone(),
            source,
        };
        match fs::read(&path) {
            Ok(current) if current == self.contents.as_bytes() => {
                log::debug!("{} unchanged", self.name);
                return Ok(false);
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_error(e)),
        }
        fs::write(&path, &self.contents).map_err(io_error)?;
        log::debug!("wrote {}", path.display());
        Ok(true)
    }
}

/// Writes every artifact into `dir`, creating the directory if needed.
/// Returns how many files changed.
///
/// # Errors
/// [`EmitError::Io`] for the first file that cannot be written.
pub fn write_all(dir: &Path, artifacts: &[Artifact]) -> Result<usize, EmitError> {
    fs::create_dir_all(dir).map_err(|source| EmitError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut changed = 0;
    for artifact in artifacts {
        if artifact.write_if_changed(dir)? {
            changed += 1;
        }
    }
    log::info!("{changed} of {} files updated in {}", artifacts.len(), dir.display());
    Ok(changed)
}
