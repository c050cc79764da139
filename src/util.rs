//! Utility functions shared by the classifier and git inspection.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{Result, WorkspaceError};

/// Maximum size of a marker file read into memory (1 MB).
///
/// Unit-config files and `.git` pointer files are a few hundred bytes. A
/// file over this limit is not a marker we understand.
pub const MAX_MARKER_FILE_SIZE: u64 = 1024 * 1024;

/// Read a marker file into a string with size limit protection.
///
/// # Errors
///
/// Returns an error if:
/// * The file cannot be read (doesn't exist, permission denied, etc.)
/// * The file exceeds `MAX_MARKER_FILE_SIZE`
pub fn read_marker_file(path: &Path) -> Result<String> {
    read_to_string_with_limit(path, MAX_MARKER_FILE_SIZE)
}

/// Read a file into a string with a custom size limit.
///
/// # Errors
///
/// Returns an error if the file exceeds `max_size` or cannot be read.
pub fn read_to_string_with_limit(path: &Path, max_size: u64) -> Result<String> {
    let metadata = fs::metadata(path).map_err(|e| WorkspaceError::io(path, e))?;

    let size = metadata.len();
    if size > max_size {
        return Err(WorkspaceError::io(
            path,
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("file is too large ({} bytes, max {} bytes)", size, max_size),
            ),
        ));
    }

    fs::read_to_string(path).map_err(|e| WorkspaceError::io(path, e))
}
