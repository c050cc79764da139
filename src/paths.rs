//! Canonical path handling.
//!
//! Every equality and containment check in the crate goes through
//! [`PathNormalizer::normalize`]: the path is made absolute, symlinks are
//! resolved, and on case-insensitive filesystems the result is lower-cased.
//! Comparing raw caller strings is never correct here.

use std::env;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use crate::error::{Result, WorkspaceError};

/// Whether path comparisons on this filesystem ignore case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseSensitivity {
    /// Paths differing only in case are different paths.
    Sensitive,
    /// Paths differing only in case name the same file.
    Insensitive,
}

impl CaseSensitivity {
    /// The default for the platform this crate was built for.
    ///
    /// macOS (APFS/HFS+ default) and Windows (NTFS) are treated as
    /// case-insensitive; everything else as case-sensitive.
    pub fn platform_default() -> Self {
        if cfg!(any(target_os = "macos", target_os = "windows")) {
            Self::Insensitive
        } else {
            Self::Sensitive
        }
    }
}

impl Default for CaseSensitivity {
    fn default() -> Self {
        Self::platform_default()
    }
}

/// Produces canonical paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PathNormalizer {
    case: CaseSensitivity,
}

impl PathNormalizer {
    /// Create a normalizer with explicit case handling.
    pub fn new(case: CaseSensitivity) -> Self {
        Self { case }
    }

    /// Create a normalizer using the platform's case handling.
    pub fn platform() -> Self {
        Self::new(CaseSensitivity::platform_default())
    }

    /// The case handling this normalizer applies.
    pub fn case_sensitivity(&self) -> CaseSensitivity {
        self.case
    }

    /// Canonicalize a path: absolute, symlink-resolved, case-folded.
    ///
    /// # Errors
    ///
    /// Fails only when a relative path is given and the current directory
    /// cannot be determined.
    pub fn normalize(&self, path: &Path) -> Result<PathBuf> {
        Ok(self.fold(self.resolve(path)?))
    }

    /// Absolute, symlink-resolved form of `path`, with its original case.
    ///
    /// Used where a display name must come from the real directory name.
    /// When `path` does not exist, the nearest existing ancestor is resolved
    /// and the remaining components are appended lexically.
    pub fn resolve(&self, path: &Path) -> Result<PathBuf> {
        let absolute = absolutize(path)?;

        if let Ok(canonical) = absolute.canonicalize() {
            return Ok(canonical);
        }

        let mut remainder: Vec<OsString> = Vec::new();
        let mut cursor = absolute.as_path();
        loop {
            match cursor.parent() {
                Some(parent) => {
                    if let Some(name) = cursor.file_name() {
                        remainder.push(name.to_os_string());
                    }
                    if let Ok(mut canonical) = parent.canonicalize() {
                        for name in remainder.iter().rev() {
                            canonical.push(name);
                        }
                        return Ok(canonical);
                    }
                    cursor = parent;
                }
                None => return Ok(absolute),
            }
        }
    }

    /// Apply case folding to an already-resolved path.
    pub fn fold(&self, path: PathBuf) -> PathBuf {
        match self.case {
            CaseSensitivity::Sensitive => path,
            CaseSensitivity::Insensitive => match path.to_str() {
                Some(s) => PathBuf::from(s.to_lowercase()),
                None => path,
            },
        }
    }
}

/// Canonicalize with the platform's case handling.
pub fn normalize(path: &Path) -> Result<PathBuf> {
    PathNormalizer::platform().normalize(path)
}

/// Whether `path` equals `ancestor` or lies beneath it.
///
/// Both arguments must already be canonical. Matching is per component,
/// so `/w/eco2` is not inside `/w/eco`.
pub fn is_within(path: &Path, ancestor: &Path) -> bool {
    path.starts_with(ancestor)
}

/// Make `path` absolute and remove `.` and `..` components lexically.
fn absolutize(path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        let cwd = env::current_dir().map_err(|e| {
            WorkspaceError::path_resolution(path, format!("current directory unavailable: {e}"))
        })?;
        cwd.join(path)
    };
    Ok(lexical_clean(&joined))
}

/// Resolve `.` and `..` without touching the filesystem.
pub(crate) fn lexical_clean(path: &Path) -> PathBuf {
    let mut components: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::Prefix(_) => components.push(component),
            Component::RootDir => {
                components.retain(|c| matches!(c, Component::Prefix(_)));
                components.push(component);
            }
            Component::CurDir => {}
            Component::ParentDir => match components.last() {
                Some(Component::Normal(_)) => {
                    components.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => components.push(component),
            },
            Component::Normal(_) => components.push(component),
        }
    }

    if components.is_empty() {
        PathBuf::from(".")
    } else {
        components.iter().collect()
    }
}
