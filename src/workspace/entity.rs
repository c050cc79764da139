use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::discovery::{Origin, CLONED_REPOS_GROUP};
use crate::workspace::Kind;

/// One classified workspace.
///
/// Entities are value objects produced fresh by every discovery run or
/// resolver call. `path` is canonical and is the identity: two entities with
/// the same path are the same entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceEntity {
    /// Display label, from the unit config or the directory name.
    pub name: String,
    /// Canonical absolute path.
    pub path: PathBuf,
    pub kind: Kind,
    pub origin: Origin,
    /// The repository owning this worktree. Set only for worktree kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_project_path: Option<PathBuf>,
    /// Nearest enclosing ecosystem or ecosystem worktree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_ecosystem_path: Option<PathBuf>,
    /// Outermost ecosystem root of the chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_ecosystem_path: Option<PathBuf>,
}

impl WorkspaceEntity {
    /// Nesting depth, derived from the kind.
    pub fn depth(&self) -> usize {
        self.kind.depth()
    }

    pub fn is_worktree(&self) -> bool {
        self.kind.is_worktree()
    }

    /// The logical repository this entity belongs to: its owner for
    /// worktrees, itself otherwise.
    pub fn source_project_path(&self) -> &Path {
        match (&self.parent_project_path, self.is_worktree()) {
            (Some(owner), true) => owner,
            _ => &self.path,
        }
    }

    /// Parent in the presentation forest.
    ///
    /// Worktrees hang under their owner, sub-projects under their nearest
    /// ecosystem; roots, standalone projects and bare repositories have none.
    pub fn hierarchical_parent(&self) -> Option<&Path> {
        if self.is_worktree() {
            self.parent_project_path.as_deref()
        } else {
            self.parent_ecosystem_path.as_deref()
        }
    }

    /// Catch-all group for entities outside the ecosystem hierarchy.
    ///
    /// Cloned repositories never get a `parent_ecosystem_path`, even when
    /// their checkout sits inside an ecosystem directory. They are presented
    /// under the [`CLONED_REPOS_GROUP`] label instead, which takes the place
    /// of an ecosystem path for them.
    pub fn group(&self) -> Option<&'static str> {
        match self.origin {
            Origin::ClonedRepo => Some(CLONED_REPOS_GROUP),
            Origin::Discovered | Origin::Explicit => None,
        }
    }
}
