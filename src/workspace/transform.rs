//! Raw discovery records to typed entities.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::discovery::{DiscoveryResult, Ecosystem, Origin, Project};
use crate::workspace::{Context, Kind, Unit, WorkspaceEntity};

/// Convert a discovery result into entities, sorted by path.
///
/// Each record's kind comes from [`Kind::decide`]; the context axis is read
/// off the chain of `parent_ecosystem_path` links. Worktrees listed by a
/// project inherit the project's context and ecosystem pointers.
pub fn transform(result: &DiscoveryResult) -> Vec<WorkspaceEntity> {
    let chains = Chains::new(&result.ecosystems);
    let mut entities = Vec::new();

    for ecosystem in &result.ecosystems {
        entities.push(chains.ecosystem_entity(ecosystem));
    }
    for project in &result.projects {
        chains.push_project(project, &mut entities);
    }
    for path in &result.non_grove_directories {
        entities.push(WorkspaceEntity {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            path: path.clone(),
            kind: Kind::NonGroveRepo,
            origin: Origin::Discovered,
            parent_project_path: None,
            parent_ecosystem_path: None,
            root_ecosystem_path: None,
        });
    }

    entities.sort_by(|a, b| a.path.cmp(&b.path));
    entities
}

/// Ecosystem records by path, for walking parent chains.
struct Chains<'a> {
    ecosystems: HashMap<&'a Path, &'a Ecosystem>,
}

impl<'a> Chains<'a> {
    fn new(ecosystems: &'a [Ecosystem]) -> Self {
        Self {
            ecosystems: ecosystems.iter().map(|e| (e.path.as_path(), e)).collect(),
        }
    }

    /// The next ecosystem up from `ecosystem`.
    fn up(ecosystem: &Ecosystem) -> Option<&Path> {
        ecosystem
            .parent_ecosystem_path
            .as_deref()
            .or(ecosystem.worktree_of.as_deref())
    }

    /// Context of something whose nearest ecosystem is `parent`.
    fn context(&self, parent: Option<&Path>) -> Context {
        let Some(mut current) = parent else {
            return Context::Standalone;
        };
        let mut seen = HashSet::new();
        while seen.insert(current) {
            let Some(ecosystem) = self.ecosystems.get(current) else {
                break;
            };
            if ecosystem.is_worktree() {
                return Context::EcosystemWorktree;
            }
            match Self::up(ecosystem) {
                Some(next) => current = next,
                None => break,
            }
        }
        Context::Ecosystem
    }

    /// The outermost ecosystem reachable from `start`.
    fn root(&self, start: &Path) -> PathBuf {
        let mut current = start;
        let mut seen = HashSet::new();
        while seen.insert(current) {
            match self.ecosystems.get(current).and_then(|e| Self::up(e)) {
                Some(next) => current = next,
                None => break,
            }
        }
        current.to_path_buf()
    }

    fn ecosystem_entity(&self, ecosystem: &Ecosystem) -> WorkspaceEntity {
        let (kind, parent_project, parent_ecosystem, root) = match &ecosystem.worktree_of {
            Some(owner) => {
                let parent = ecosystem
                    .parent_ecosystem_path
                    .clone()
                    .or_else(|| Some(owner.clone()));
                (
                    Kind::EcosystemWorktree,
                    Some(owner.clone()),
                    parent,
                    self.root(&ecosystem.path),
                )
            }
            None => match &ecosystem.parent_ecosystem_path {
                Some(parent) => (
                    Kind::decide(Unit::Ecosystem, false, self.context(Some(parent))),
                    None,
                    Some(parent.clone()),
                    self.root(parent),
                ),
                None => (Kind::EcosystemRoot, None, None, ecosystem.path.clone()),
            },
        };

        WorkspaceEntity {
            name: ecosystem.name.clone(),
            path: ecosystem.path.clone(),
            kind,
            origin: Origin::Discovered,
            parent_project_path: parent_project,
            parent_ecosystem_path: parent_ecosystem,
            root_ecosystem_path: Some(root),
        }
    }

    fn push_project(&self, project: &Project, entities: &mut Vec<WorkspaceEntity>) {
        let parent = project.parent_ecosystem_path.as_deref();
        let context = self.context(parent);
        let root = parent.map(|p| self.root(p));
        let kind = Kind::decide(Unit::Project, project.worktree_of.is_some(), context);

        entities.push(WorkspaceEntity {
            name: project.name.clone(),
            path: project.path.clone(),
            kind,
            origin: project.origin,
            parent_project_path: project.worktree_of.clone(),
            parent_ecosystem_path: project.parent_ecosystem_path.clone(),
            root_ecosystem_path: root.clone(),
        });

        let worktree_kind = Kind::decide(Unit::Project, true, context);
        for worktree in &project.worktrees {
            entities.push(WorkspaceEntity {
                name: worktree.name.clone(),
                path: worktree.path.clone(),
                kind: worktree_kind,
                origin: project.origin,
                parent_project_path: Some(project.path.clone()),
                parent_ecosystem_path: project.parent_ecosystem_path.clone(),
                root_ecosystem_path: root.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::Worktree;

    fn eco(path: &str, parent: Option<&str>, worktree_of: Option<&str>) -> Ecosystem {
        Ecosystem {
            name: Path::new(path).file_name().unwrap().to_string_lossy().into_owned(),
            path: PathBuf::from(path),
            parent_ecosystem_path: parent.map(PathBuf::from),
            worktree_of: worktree_of.map(PathBuf::from),
        }
    }

    fn proj(path: &str, parent: Option<&str>) -> Project {
        Project {
            parent_ecosystem_path: parent.map(PathBuf::from),
            ..Project::new(
                Path::new(path).file_name().unwrap().to_string_lossy(),
                path,
            )
        }
    }

    fn find<'a>(entities: &'a [WorkspaceEntity], path: &str) -> &'a WorkspaceEntity {
        entities
            .iter()
            .find(|e| e.path == Path::new(path))
            .unwrap_or_else(|| panic!("no entity at {path}"))
    }

    #[test]
    fn test_ecosystem_root_and_sub_project() {
        let mut result = DiscoveryResult::new();
        result.ecosystems.push(eco("/w/eco", None, None));
        result.projects.push(proj("/w/eco/a", Some("/w/eco")));

        let entities = transform(&result);
        let root = find(&entities, "/w/eco");
        assert_eq!(root.kind, Kind::EcosystemRoot);
        assert_eq!(root.root_ecosystem_path, Some(PathBuf::from("/w/eco")));

        let sub = find(&entities, "/w/eco/a");
        assert_eq!(sub.kind, Kind::EcosystemSubProject);
        assert_eq!(sub.parent_ecosystem_path, Some(PathBuf::from("/w/eco")));
        assert_eq!(sub.root_ecosystem_path, Some(PathBuf::from("/w/eco")));
        assert_eq!(sub.parent_project_path, None);
    }

    #[test]
    fn test_nested_worktree_chain_points_to_outermost_root() {
        let mut result = DiscoveryResult::new();
        result.ecosystems.push(eco("/w/eco", None, None));
        result.ecosystems.push(eco(
            "/w/eco/.grove-worktrees/a",
            Some("/w/eco"),
            Some("/w/eco"),
        ));
        result.ecosystems.push(eco(
            "/w/eco/.grove-worktrees/a/.grove-worktrees/b",
            Some("/w/eco/.grove-worktrees/a"),
            Some("/w/eco/.grove-worktrees/a"),
        ));
        result.projects.push(proj(
            "/w/eco/.grove-worktrees/a/.grove-worktrees/b/p",
            Some("/w/eco/.grove-worktrees/a/.grove-worktrees/b"),
        ));

        let entities = transform(&result);
        for entity in &entities {
            assert_eq!(entity.root_ecosystem_path, Some(PathBuf::from("/w/eco")));
        }
        let b = find(&entities, "/w/eco/.grove-worktrees/a/.grove-worktrees/b");
        assert_eq!(b.kind, Kind::EcosystemWorktree);
        assert_eq!(
            b.parent_project_path,
            Some(PathBuf::from("/w/eco/.grove-worktrees/a"))
        );
        let p = find(&entities, "/w/eco/.grove-worktrees/a/.grove-worktrees/b/p");
        assert_eq!(p.kind, Kind::EcosystemWorktreeSubProject);
        assert_eq!(p.depth(), 2);
    }

    #[test]
    fn test_project_worktrees_inherit_context() {
        let mut result = DiscoveryResult::new();
        result.ecosystems.push(eco("/w/eco", None, None));
        let mut project = proj("/w/eco/a", Some("/w/eco"));
        project.worktrees.push(Worktree {
            name: "a".into(),
            path: PathBuf::from("/w/eco/a/.grove-worktrees/fix"),
        });
        result.projects.push(project);

        let entities = transform(&result);
        let wt = find(&entities, "/w/eco/a/.grove-worktrees/fix");
        assert_eq!(wt.kind, Kind::EcosystemSubProjectWorktree);
        assert_eq!(wt.parent_project_path, Some(PathBuf::from("/w/eco/a")));
        assert_eq!(wt.parent_ecosystem_path, Some(PathBuf::from("/w/eco")));
        assert_eq!(wt.root_ecosystem_path, Some(PathBuf::from("/w/eco")));
    }

    #[test]
    fn test_nested_ecosystem_is_sub_project() {
        let mut result = DiscoveryResult::new();
        result.ecosystems.push(eco("/w/eco", None, None));
        result.ecosystems.push(eco("/w/eco/inner", Some("/w/eco"), None));
        result.projects.push(proj("/w/eco/inner/p", Some("/w/eco/inner")));

        let entities = transform(&result);
        assert_eq!(find(&entities, "/w/eco/inner").kind, Kind::EcosystemSubProject);
        let p = find(&entities, "/w/eco/inner/p");
        assert_eq!(p.parent_ecosystem_path, Some(PathBuf::from("/w/eco/inner")));
        assert_eq!(p.root_ecosystem_path, Some(PathBuf::from("/w/eco")));
    }

    #[test]
    fn test_standalone_worktree_and_non_grove() {
        let mut result = DiscoveryResult::new();
        let mut checkout = proj("/w/checkout", None);
        checkout.worktree_of = Some(PathBuf::from("/w/main"));
        result.projects.push(checkout);
        result.non_grove_directories.push(PathBuf::from("/w/plain"));

        let entities = transform(&result);
        let wt = find(&entities, "/w/checkout");
        assert_eq!(wt.kind, Kind::StandaloneProjectWorktree);
        assert_eq!(wt.parent_project_path, Some(PathBuf::from("/w/main")));
        assert_eq!(wt.root_ecosystem_path, None);

        let plain = find(&entities, "/w/plain");
        assert_eq!(plain.kind, Kind::NonGroveRepo);
        assert_eq!(plain.name, "plain");
        assert!(plain.hierarchical_parent().is_none());
    }

    #[test]
    fn test_parent_project_iff_worktree() {
        let mut result = DiscoveryResult::new();
        result.ecosystems.push(eco("/w/eco", None, None));
        result
            .ecosystems
            .push(eco("/w/eco/.grove-worktrees/a", Some("/w/eco"), Some("/w/eco")));
        let mut project = proj("/w/eco/.grove-worktrees/a/p", Some("/w/eco/.grove-worktrees/a"));
        project.worktrees.push(Worktree {
            name: "p".into(),
            path: PathBuf::from("/w/eco/.grove-worktrees/a/p/.grove-worktrees/x"),
        });
        result.projects.push(project);
        result.projects.push(proj("/w/solo", None));

        for entity in transform(&result) {
            assert_eq!(
                entity.parent_project_path.is_some(),
                entity.kind.is_worktree(),
                "{}",
                entity.path.display()
            );
        }
    }

    #[test]
    fn test_cycle_in_parent_links_terminates() {
        let mut result = DiscoveryResult::new();
        result.ecosystems.push(eco("/a", Some("/b"), None));
        result.ecosystems.push(eco("/b", Some("/a"), None));
        assert_eq!(transform(&result).len(), 2);
    }
}
