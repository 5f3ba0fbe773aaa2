//! Checks run before a job is created.
//!
//! Both helpers fail with [`PipelineError::Validation`], which maps to a
//! non-zero exit without a pipeline ever being built.

use std::fs::{self, File};
use std::io;
use std::path::Path;

use crate::error::{PipelineError, Result};

/// Ensures `path` is an existing regular file that can be opened for reading.
pub fn assert_file_readable(path: &Path) -> Result<()> {
    let metadata = fs::metadata(path).map_err(|err| describe(path, &err))?;
    if !metadata.is_file() {
        return Err(PipelineError::validation(path, "not a regular file"));
    }
    File::open(path).map_err(|err| describe(path, &err))?;
    Ok(())
}

/// Ensures `dir` is an existing directory that accepts new files.
///
/// Writability is probed by creating (and immediately dropping) an anonymous
/// scratch file inside it.
pub fn assert_directory_writable(dir: &Path) -> Result<()> {
    let metadata = fs::metadata(dir).map_err(|err| describe(dir, &err))?;
    if !metadata.is_dir() {
        return Err(PipelineError::validation(dir, "not a directory"));
    }
    tempfile::tempfile_in(dir).map_err(|err| describe(dir, &err))?;
    Ok(())
}

fn describe(path: &Path, err: &io::Error) -> PipelineError {
    let reason = match err.kind() {
        io::ErrorKind::NotFound => "no such file or directory".to_owned(),
        io::ErrorKind::PermissionDenied => "permission denied".to_owned(),
        _ => err.to_string(),
    };
    PipelineError::validation(path, reason)
}
