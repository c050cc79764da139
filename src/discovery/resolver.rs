//! Upward resolution of a single path.
//!
//! Instead of walking whole roots, the resolver replays the walker's rules
//! along the target's ancestor chain, from the filesystem root down. When a
//! boundary seals the chain (a project's interior, a bare repository, a
//! container past the nesting limit), a fresh context starts below it. The
//! innermost context that recorded anything is the target's neighborhood.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::DiscoverySettings;
use crate::discovery::lineage::{Frame, Lineage, Rules, Step, Visit};
use crate::discovery::result::{DiscoveryResult, Record};
use crate::error::{Result, WorkspaceError};
use crate::paths::{is_within, PathNormalizer};
use crate::workspace::{transform, WorkspaceEntity};

/// Resolves a path to its containing workspace entity.
#[derive(Debug, Clone)]
pub struct Resolver {
    rules: Rules,
}

impl Resolver {
    pub fn new(settings: &DiscoverySettings, normalizer: PathNormalizer) -> Self {
        Self::from_rules(Rules::new(settings, normalizer))
    }

    pub(crate) fn from_rules(rules: Rules) -> Self {
        Self { rules }
    }

    /// The entity containing `target`.
    ///
    /// Returns `Ok(None)` when the path exists but no ancestor is a
    /// recognized unit.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::PathResolution`] when `target` does not
    /// exist or cannot be resolved (for example a symlink loop).
    pub fn resolve(&self, target: &Path) -> Result<Option<WorkspaceEntity>> {
        let (result, canonical_target) = self.local_result(target)?;
        let entity = transform(&result)
            .into_iter()
            .filter(|entity| is_within(&canonical_target, &entity.path))
            .max_by_key(|entity| entity.path.components().count());
        Ok(entity)
    }

    /// The entities the walker would produce around `target`.
    ///
    /// This is the innermost context on the target's chain: its units along
    /// the chain, the worktrees of those units, and the worktrees listed in
    /// their ecosystems' containers.
    pub fn neighborhood(&self, target: &Path) -> Result<Vec<WorkspaceEntity>> {
        let (result, _) = self.local_result(target)?;
        Ok(transform(&result))
    }

    fn local_result(&self, target: &Path) -> Result<(DiscoveryResult, PathBuf)> {
        let resolved = self.rules.normalizer().resolve(target)?;
        let metadata = fs::metadata(&resolved)
            .map_err(|e| WorkspaceError::path_resolution(target, e.to_string()))?;
        let dir = if metadata.is_dir() {
            resolved.clone()
        } else {
            resolved.parent().map(Path::to_path_buf).unwrap_or_else(|| resolved.clone())
        };

        let visits = self.replay(&dir);
        let mut result = DiscoveryResult::new();
        self.add_ecosystem_worktrees(&visits, &mut result);
        for visit in visits {
            result.add(visit.record);
        }
        result.finalize();

        tracing::debug!(
            target = %target.display(),
            entities = result.projects.len() + result.ecosystems.len() + result.non_grove_directories.len(),
            "resolved neighborhood"
        );
        Ok((result, self.rules.normalizer().fold(resolved)))
    }

    /// Apply the rules top-down along `dir`'s ancestors.
    fn replay(&self, dir: &Path) -> Vec<Visit> {
        let mut lineage = Lineage::above(&self.rules, dir);
        lineage.enter(&self.rules, dir, false);
        lineage.into_innermost()
    }

    /// Ecosystem worktrees listed in the containers of recorded ecosystems.
    fn add_ecosystem_worktrees(&self, visits: &[Visit], result: &mut DiscoveryResult) {
        for visit in visits {
            if !matches!(visit.record, Record::Ecosystem(_)) {
                continue;
            }
            let container = visit
                .dir
                .join(self.rules.classifier().worktree_container());
            if !container.is_dir() {
                continue;
            }
            let Some(container_step) = self.rules.step(&visit.children, &container, false) else {
                continue;
            };
            if !matches!(container_step.children, Frame::EcosystemContainer { .. }) {
                continue;
            }

            let mut children: Vec<PathBuf> = match fs::read_dir(&container) {
                Ok(entries) => entries
                    .filter_map(|entry| entry.ok())
                    .map(|entry| entry.path())
                    .filter(|path| path.is_dir())
                    .collect(),
                Err(err) => {
                    tracing::warn!(
                        path = %container.display(),
                        error = %err,
                        "cannot list worktree container"
                    );
                    continue;
                }
            };
            children.sort();

            for child in children {
                if let Some(Step {
                    record: Some(record),
                    ..
                }) = self.rules.step(&container_step.children, &child, false)
                {
                    result.add(record);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::CaseSensitivity;
    use crate::workspace::Kind;
    use tempfile::TempDir;

    fn resolver() -> Resolver {
        Resolver::new(
            &DiscoverySettings::default(),
            PathNormalizer::new(CaseSensitivity::Sensitive),
        )
    }

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_missing_target_is_an_error() {
        let temp = TempDir::new().unwrap();
        let err = resolver().resolve(&temp.path().join("missing")).unwrap_err();
        assert!(matches!(err, WorkspaceError::PathResolution { .. }));
    }

    #[test]
    fn test_unrecognized_target_is_not_found() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("scratch/notes");
        fs::create_dir_all(&dir).unwrap();

        assert_eq!(resolver().resolve(&dir).unwrap(), None);
        assert!(resolver().neighborhood(&dir).unwrap().is_empty());
    }

    #[test]
    fn test_file_target_uses_parent_directory() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        write(&root.join("p/grove.yml"), "name: p\n");
        write(&root.join("p/src/main.rs"), "fn main() {}\n");

        let entity = resolver().resolve(&root.join("p/src/main.rs")).unwrap().unwrap();
        assert_eq!(entity.path, root.join("p"));
        assert_eq!(entity.kind, Kind::StandaloneProject);
    }

    #[test]
    fn test_project_worktree_target() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        write(&root.join("p/grove.yml"), "name: p\n");
        let wt = root.join("p/.grove-worktrees/feat");
        write(
            &wt.join(".git"),
            &format!("gitdir: {}/p/.git/worktrees/feat\n", root.display()),
        );
        write(&wt.join("src/lib.rs"), "");

        let entity = resolver().resolve(&wt.join("src")).unwrap().unwrap();
        assert_eq!(entity.path, wt);
        assert_eq!(entity.kind, Kind::StandaloneProjectWorktree);
        assert_eq!(entity.parent_project_path, Some(root.join("p")));
    }

    #[test]
    fn test_nested_config_inside_project_starts_fresh_context() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        write(&root.join("eco/grove.yml"), "workspaces: ['*']\n");
        write(&root.join("eco/proj/grove.yml"), "name: proj\n");
        write(&root.join("eco/proj/vendor/lib/grove.yml"), "name: lib\n");

        let entity = resolver()
            .resolve(&root.join("eco/proj/vendor/lib"))
            .unwrap()
            .unwrap();
        assert_eq!(entity.kind, Kind::StandaloneProject);
        assert_eq!(entity.parent_ecosystem_path, None);
    }

    #[test]
    fn test_neighborhood_lists_sibling_ecosystem_worktrees() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        write(&root.join("eco/grove.yml"), "workspaces: ['*']\n");
        write(&root.join("eco/proj/grove.yml"), "name: proj\n");
        for name in ["a", "b"] {
            let wt = root.join("eco/.grove-worktrees").join(name);
            write(&wt.join("grove.yml"), "workspaces: ['*']\n");
            write(
                &wt.join(".git"),
                &format!("gitdir: {}/eco/.git/worktrees/{name}\n", root.display()),
            );
        }

        let entities = resolver().neighborhood(&root.join("eco/proj")).unwrap();
        let worktrees = entities
            .iter()
            .filter(|e| e.kind == Kind::EcosystemWorktree)
            .count();
        assert_eq!(worktrees, 2);
    }
}
