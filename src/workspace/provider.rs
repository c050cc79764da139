//! Read-only index over one discovery snapshot.
//!
//! A [`Provider`] never touches the filesystem after construction, except to
//! canonicalize lookup arguments. Callers that need fresher data run
//! discovery again and build a new provider.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::discovery::DiscoveryResult;
use crate::paths::{is_within, PathNormalizer};
use crate::workspace::tree::{build_forest, TreeNode};
use crate::workspace::{transform, WorkspaceEntity};

/// Two or more source projects sharing one name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameCollision {
    pub name: String,
    /// Distinct source-project paths, sorted.
    pub sources: Vec<PathBuf>,
}

/// Immutable entity index.
#[derive(Debug, Clone)]
pub struct Provider {
    entities: Vec<WorkspaceEntity>,
    by_path: HashMap<PathBuf, usize>,
    normalizer: PathNormalizer,
    discovered_at: DateTime<Utc>,
}

impl Provider {
    /// Index a discovery result using the platform's case handling.
    pub fn new(result: &DiscoveryResult) -> Self {
        Self::with_normalizer(result, PathNormalizer::platform())
    }

    /// Index a discovery result, canonicalizing lookups with `normalizer`.
    pub fn with_normalizer(result: &DiscoveryResult, normalizer: PathNormalizer) -> Self {
        let mut provider = Self::from_entities(transform(result), normalizer);
        provider.discovered_at = result.discovered_at;
        provider
    }

    /// Index an already transformed entity list. The first entity wins when
    /// paths repeat.
    pub fn from_entities(entities: Vec<WorkspaceEntity>, normalizer: PathNormalizer) -> Self {
        let mut kept: Vec<WorkspaceEntity> = Vec::with_capacity(entities.len());
        let mut by_path = HashMap::with_capacity(entities.len());
        for entity in entities {
            if by_path.contains_key(&entity.path) {
                continue;
            }
            by_path.insert(entity.path.clone(), kept.len());
            kept.push(entity);
        }
        Self {
            entities: kept,
            by_path,
            normalizer,
            discovered_at: Utc::now(),
        }
    }

    pub fn entities(&self) -> &[WorkspaceEntity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// When the underlying discovery ran.
    pub fn snapshot_time(&self) -> DateTime<Utc> {
        self.discovered_at
    }

    /// Exact lookup. `path` is canonicalized first.
    pub fn get(&self, path: &Path) -> Option<&WorkspaceEntity> {
        let canonical = self.normalizer.normalize(path).ok()?;
        self.get_canonical(&canonical)
    }

    /// Exact lookup of an already canonical path.
    pub fn get_canonical(&self, path: &Path) -> Option<&WorkspaceEntity> {
        self.by_path.get(path).map(|&i| &self.entities[i])
    }

    /// The innermost entity containing `path`.
    pub fn find_containing(&self, path: &Path) -> Option<&WorkspaceEntity> {
        let canonical = self.normalizer.normalize(path).ok()?;
        self.entities
            .iter()
            .filter(|e| is_within(&canonical, &e.path))
            .max_by_key(|e| e.path.components().count())
    }

    /// The first entity, by path order, with the given name.
    pub fn find_by_name(&self, name: &str) -> Option<&WorkspaceEntity> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Entities with no parent in this snapshot.
    pub fn roots(&self) -> Vec<&WorkspaceEntity> {
        self.entities
            .iter()
            .filter(|e| {
                e.hierarchical_parent()
                    .is_none_or(|parent| !self.by_path.contains_key(parent))
            })
            .collect()
    }

    /// Direct hierarchical children of `path` (canonical).
    pub fn children_of(&self, path: &Path) -> Vec<&WorkspaceEntity> {
        self.entities
            .iter()
            .filter(|e| e.path != path && e.hierarchical_parent() == Some(path))
            .collect()
    }

    /// The snapshot as a forest.
    pub fn forest(&self) -> Vec<TreeNode> {
        build_forest(&self.entities)
    }

    /// Names shared by more than one source project.
    ///
    /// A project and its worktrees share a source, so they never collide.
    pub fn collisions(&self) -> Vec<NameCollision> {
        let mut by_name: BTreeMap<&str, BTreeSet<&Path>> = BTreeMap::new();
        for entity in &self.entities {
            by_name
                .entry(entity.name.as_str())
                .or_default()
                .insert(entity.source_project_path());
        }

        by_name
            .into_iter()
            .filter(|(_, sources)| sources.len() > 1)
            .map(|(name, sources)| NameCollision {
                name: name.to_string(),
                sources: sources.into_iter().map(Path::to_path_buf).collect(),
            })
            .collect()
    }

    /// Warn once per collision. Returns how many were found.
    pub fn log_collisions(&self) -> usize {
        let collisions = self.collisions();
        for collision in &collisions {
            let sources: Vec<String> = collision
                .sources
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            tracing::warn!(
                name = %collision.name,
                sources = %sources.join(", "),
                "workspace name is shared by unrelated projects"
            );
        }
        collisions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{Ecosystem, Origin, Project, Worktree};
    use crate::paths::CaseSensitivity;
    use crate::workspace::Kind;
    use std::fs;
    use tempfile::TempDir;

    fn sensitive() -> PathNormalizer {
        PathNormalizer::new(CaseSensitivity::Sensitive)
    }

    fn entity(name: &str, path: &str, kind: Kind, owner: Option<&str>) -> WorkspaceEntity {
        WorkspaceEntity {
            name: name.into(),
            path: PathBuf::from(path),
            kind,
            origin: Origin::Discovered,
            parent_project_path: owner.map(PathBuf::from),
            parent_ecosystem_path: None,
            root_ecosystem_path: None,
        }
    }

    #[test]
    fn test_worktree_family_is_not_a_collision() {
        let provider = Provider::from_entities(
            vec![
                entity("app", "/w/app", Kind::StandaloneProject, None),
                entity(
                    "app",
                    "/w/app/.grove-worktrees/fix",
                    Kind::StandaloneProjectWorktree,
                    Some("/w/app"),
                ),
            ],
            sensitive(),
        );
        assert!(provider.collisions().is_empty());
        assert_eq!(provider.log_collisions(), 0);
    }

    #[test]
    fn test_unrelated_same_name_collides() {
        let provider = Provider::from_entities(
            vec![
                entity("app", "/w/one/app", Kind::StandaloneProject, None),
                entity("app", "/w/two/app", Kind::StandaloneProject, None),
            ],
            sensitive(),
        );
        let collisions = provider.collisions();
        assert_eq!(collisions.len(), 1);
        assert_eq!(
            collisions[0].sources,
            vec![PathBuf::from("/w/one/app"), PathBuf::from("/w/two/app")]
        );
        assert_eq!(provider.log_collisions(), 1);
    }

    #[test]
    fn test_lookups() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("eco/a/src")).unwrap();

        let mut result = DiscoveryResult::new();
        result.ecosystems.push(Ecosystem::new("eco", root.join("eco")));
        result.projects.push(Project {
            parent_ecosystem_path: Some(root.join("eco")),
            worktrees: vec![Worktree {
                name: "a".into(),
                path: root.join("eco/a/.grove-worktrees/x"),
            }],
            ..Project::new("a", root.join("eco/a"))
        });
        let provider = Provider::with_normalizer(&result, sensitive());

        assert_eq!(provider.len(), 3);
        assert_eq!(provider.snapshot_time(), result.discovered_at);
        assert_eq!(provider.get(&root.join("eco/a/./")).unwrap().name, "a");
        assert!(provider.get(&root.join("eco/a/src")).is_none());
        assert_eq!(
            provider.find_containing(&root.join("eco/a/src")).unwrap().path,
            root.join("eco/a")
        );
        assert_eq!(provider.find_by_name("eco").unwrap().kind, Kind::EcosystemRoot);
        assert!(provider.find_by_name("missing").is_none());

        let roots: Vec<_> = provider.roots().iter().map(|e| e.path.clone()).collect();
        assert_eq!(roots, vec![root.join("eco")]);
        assert_eq!(provider.children_of(&root.join("eco")).len(), 1);
        assert_eq!(provider.children_of(&root.join("eco/a")).len(), 1);
        assert_eq!(provider.forest().len(), 1);
    }

    #[test]
    fn test_duplicate_paths_keep_first() {
        let provider = Provider::from_entities(
            vec![
                entity("first", "/w/p", Kind::StandaloneProject, None),
                entity("second", "/w/p", Kind::StandaloneProject, None),
            ],
            sensitive(),
        );
        assert_eq!(provider.len(), 1);
        assert_eq!(provider.get_canonical(Path::new("/w/p")).unwrap().name, "first");
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let provider = Provider::from_entities(
            vec![entity("eco", "/w/eco", Kind::EcosystemRoot, None)],
            PathNormalizer::new(CaseSensitivity::Insensitive),
        );
        // The path does not exist, so the folded lexical form is used.
        assert!(provider.get(Path::new("/W/Eco")).is_some());
        assert!(provider.find_containing(Path::new("/W/ECO/src")).is_some());
    }
}
