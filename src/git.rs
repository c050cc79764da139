//! Read-only inspection of `.git` markers.
//!
//! Linked worktrees and submodules both use a `.git` *file* holding a
//! `gitdir:` pointer. The pointer's registry segment tells them apart:
//! `<repo>/.git/worktrees/<name>` is a linked worktree, and
//! `<repo>/.git/modules/<name>` is a submodule. When the registry entry
//! exists on disk, its `commondir` file settles the question: only linked
//! worktrees have one. No git process is spawned.

use std::path::{Component, Path, PathBuf};

use crate::paths::lexical_clean;
use crate::util::read_marker_file;

/// Name of the git marker entry inside a checkout.
pub const GIT_MARKER: &str = ".git";

const WORKTREES_SEGMENT: &str = "worktrees";
const MODULES_SEGMENT: &str = "modules";
const COMMONDIR_FILE: &str = "commondir";

/// What a directory's `.git` entry says about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitMarker {
    /// No `.git` entry.
    Absent,
    /// `.git` is a directory: a primary checkout.
    Directory,
    /// `.git` file pointing into a worktrees registry.
    Worktree {
        /// The resolved `gitdir:` target.
        gitdir: PathBuf,
        /// The repository that owns the worktree registry.
        owner: PathBuf,
    },
    /// `.git` file pointing into a modules registry.
    Submodule {
        /// The resolved `gitdir:` target.
        gitdir: PathBuf,
    },
    /// `.git` file that could not be read or has no recognized registry.
    Unrecognized,
}

impl GitMarker {
    /// Whether any `.git` entry exists.
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Absent)
    }

    /// Whether this marker denotes a linked worktree.
    pub fn is_worktree(&self) -> bool {
        matches!(self, Self::Worktree { .. })
    }

    /// The repository owning this worktree, if it is one.
    pub fn worktree_owner(&self) -> Option<&Path> {
        match self {
            Self::Worktree { owner, .. } => Some(owner),
            _ => None,
        }
    }
}

/// Inspect the `.git` entry of `dir`.
pub fn inspect(dir: &Path) -> GitMarker {
    let marker = dir.join(GIT_MARKER);
    let Ok(metadata) = marker.symlink_metadata() else {
        return GitMarker::Absent;
    };

    if metadata.is_dir() || (metadata.file_type().is_symlink() && marker.is_dir()) {
        return GitMarker::Directory;
    }

    let contents = match read_marker_file(&marker) {
        Ok(contents) => contents,
        Err(err) => {
            tracing::debug!(path = %marker.display(), error = %err, "unreadable .git file");
            return GitMarker::Unrecognized;
        }
    };

    let Some(target) = parse_gitdir(&contents) else {
        return GitMarker::Unrecognized;
    };

    let target = Path::new(target);
    let gitdir = if target.is_absolute() {
        lexical_clean(target)
    } else {
        lexical_clean(&dir.join(target))
    };

    classify_gitdir(gitdir)
}

/// Whether `dir` is a linked git worktree.
pub fn is_worktree(dir: &Path) -> bool {
    inspect(dir).is_worktree()
}

/// Extract the `gitdir:` value from a `.git` pointer file.
fn parse_gitdir(contents: &str) -> Option<&str> {
    contents
        .lines()
        .filter_map(|line| line.trim().strip_prefix("gitdir:"))
        .map(str::trim)
        .find(|target| !target.is_empty())
}

/// Decide worktree vs submodule for a resolved `gitdir:` target.
fn classify_gitdir(gitdir: PathBuf) -> GitMarker {
    if !gitdir.is_dir() {
        return classify_by_segment(gitdir);
    }

    let commondir = gitdir.join(COMMONDIR_FILE);
    if commondir.is_file() {
        return match read_marker_file(&commondir) {
            Ok(contents) if !contents.trim().is_empty() => {
                let target = Path::new(contents.trim());
                let common = if target.is_absolute() {
                    lexical_clean(target)
                } else {
                    lexical_clean(&gitdir.join(target))
                };
                let owner = owner_of_git_dir(&common);
                GitMarker::Worktree { gitdir, owner }
            }
            Ok(_) => classify_by_segment(gitdir),
            Err(err) => {
                tracing::debug!(
                    path = %commondir.display(),
                    error = %err,
                    "unreadable commondir"
                );
                classify_by_segment(gitdir)
            }
        };
    }

    // No commondir: a `worktrees` segment inside a modules registry is part
    // of a submodule's name.
    let in_modules = gitdir
        .components()
        .any(|c| c.as_os_str().to_str() == Some(MODULES_SEGMENT));
    match classify_by_segment(gitdir) {
        GitMarker::Worktree { gitdir, .. } if in_modules => GitMarker::Submodule { gitdir },
        marker => marker,
    }
}

/// Decide from the innermost registry segment alone.
///
/// A worktree of a submodule points at `.git/modules/<m>/worktrees/<w>`;
/// the last registry segment wins, so that is a worktree.
fn classify_by_segment(gitdir: PathBuf) -> GitMarker {
    let components: Vec<Component<'_>> = gitdir.components().collect();

    // The registry segment must be followed by an entry name.
    let registry = components
        .iter()
        .enumerate()
        .take(components.len().saturating_sub(1))
        .rev()
        .find_map(|(i, c)| match c.as_os_str().to_str() {
            Some(WORKTREES_SEGMENT) => Some((i, true)),
            Some(MODULES_SEGMENT) => Some((i, false)),
            _ => None,
        });

    match registry {
        Some((i, true)) => {
            let git_dir: PathBuf = components[..i].iter().collect();
            let owner = owner_of_git_dir(&git_dir);
            GitMarker::Worktree { gitdir, owner }
        }
        Some((_, false)) => GitMarker::Submodule { gitdir },
        None => GitMarker::Unrecognized,
    }
}

/// Map a repository's git directory to the repository path.
///
/// `<repo>/.git` maps to `<repo>`. Bare repositories (`<repo>.git`) and
/// submodule git dirs have no separate checkout path and map to themselves.
fn owner_of_git_dir(git_dir: &Path) -> PathBuf {
    if git_dir.file_name().and_then(|n| n.to_str()) == Some(GIT_MARKER) {
        if let Some(parent) = git_dir.parent() {
            return parent.to_path_buf();
        }
    }
    git_dir.to_path_buf()
}
