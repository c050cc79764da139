//! Raw discovery output.
//!
//! A [`DiscoveryResult`] is what the walker (or the resolver, for one path)
//! hands to the transformer: ecosystems, projects with their worktrees, and
//! bare repositories, keyed by canonical path. Hierarchy is expressed only
//! through `parent_ecosystem_path`, assigned by [`DiscoveryResult::link_ecosystems`].

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::paths::is_within;

/// Where a project record came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Found by walking a search path.
    #[default]
    Discovered,
    /// Registered by path in the configuration.
    Explicit,
    /// Listed by the cloned-repository collaborator.
    ClonedRepo,
}

impl Origin {
    /// Precedence when the same path arrives from several sources.
    fn rank(self) -> u8 {
        match self {
            Self::Discovered => 0,
            Self::ClonedRepo => 1,
            Self::Explicit => 2,
        }
    }
}

/// A linked worktree found in a project's worktree container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worktree {
    pub name: String,
    pub path: PathBuf,
}

/// A directory whose unit config declares no workspaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub path: PathBuf,
    /// Nearest enclosing ecosystem or ecosystem worktree.
    pub parent_ecosystem_path: Option<PathBuf>,
    /// Owning repository when this checkout is itself a linked worktree
    /// found outside any worktree container.
    pub worktree_of: Option<PathBuf>,
    /// Worktrees found in this project's worktree container.
    pub worktrees: Vec<Worktree>,
    pub origin: Origin,
}

impl Project {
    /// A discovered project with no worktrees and no linkage yet.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            parent_ecosystem_path: None,
            worktree_of: None,
            worktrees: Vec::new(),
            origin: Origin::Discovered,
        }
    }

    /// Union `other`'s worktrees into this project by worktree path.
    fn absorb_worktrees(&mut self, other: Vec<Worktree>) {
        for worktree in other {
            if !self.worktrees.iter().any(|w| w.path == worktree.path) {
                self.worktrees.push(worktree);
            }
        }
    }
}

/// A directory whose unit config declares workspaces, or a worktree of one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ecosystem {
    pub name: String,
    pub path: PathBuf,
    /// Nearest enclosing ecosystem or ecosystem worktree.
    pub parent_ecosystem_path: Option<PathBuf>,
    /// For ecosystem worktrees: the ecosystem whose container holds it.
    pub worktree_of: Option<PathBuf>,
}

impl Ecosystem {
    /// An ecosystem root record.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            parent_ecosystem_path: None,
            worktree_of: None,
        }
    }

    /// Whether this record is an ecosystem worktree.
    pub fn is_worktree(&self) -> bool {
        self.worktree_of.is_some()
    }
}

/// One unit produced while visiting a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Record {
    Ecosystem(Ecosystem),
    Project(Project),
    NonGrove(PathBuf),
}

/// The walker's raw output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryResult {
    pub projects: Vec<Project>,
    pub ecosystems: Vec<Ecosystem>,
    pub non_grove_directories: Vec<PathBuf>,
    /// When this snapshot was taken.
    pub discovered_at: DateTime<Utc>,
}

impl Default for DiscoveryResult {
    fn default() -> Self {
        Self::new()
    }
}

impl DiscoveryResult {
    /// An empty result stamped with the current time.
    pub fn new() -> Self {
        Self {
            projects: Vec::new(),
            ecosystems: Vec::new(),
            non_grove_directories: Vec::new(),
            discovered_at: Utc::now(),
        }
    }

    /// Whether nothing was found.
    pub fn is_empty(&self) -> bool {
        self.projects.is_empty() && self.ecosystems.is_empty() && self.non_grove_directories.is_empty()
    }

    /// Look up an ecosystem record by canonical path.
    pub fn ecosystem(&self, path: &Path) -> Option<&Ecosystem> {
        self.ecosystems.iter().find(|e| e.path == path)
    }

    /// Look up a project record by canonical path.
    pub fn project(&self, path: &Path) -> Option<&Project> {
        self.projects.iter().find(|p| p.path == path)
    }

    /// Add one record, deduplicating by path.
    pub(crate) fn add(&mut self, record: Record) {
        match record {
            Record::Ecosystem(ecosystem) => self.add_ecosystem(ecosystem),
            Record::Project(project) => self.add_project(project),
            Record::NonGrove(path) => {
                if !self.non_grove_directories.contains(&path) {
                    self.non_grove_directories.push(path);
                }
            }
        }
    }

    fn add_ecosystem(&mut self, ecosystem: Ecosystem) {
        match self.ecosystems.iter_mut().find(|e| e.path == ecosystem.path) {
            // Reached both through a container and directly (overlapping
            // roots): the container view carries more structure.
            Some(existing) => {
                if existing.worktree_of.is_none() && ecosystem.worktree_of.is_some() {
                    *existing = ecosystem;
                }
            }
            None => self.ecosystems.push(ecosystem),
        }
    }

    fn add_project(&mut self, project: Project) {
        match self.projects.iter_mut().find(|p| p.path == project.path) {
            Some(existing) => {
                if project.origin.rank() < existing.origin.rank() {
                    let worktrees = std::mem::take(&mut existing.worktrees);
                    *existing = project;
                    existing.absorb_worktrees(worktrees);
                } else {
                    existing.absorb_worktrees(project.worktrees);
                }
            }
            None => self.projects.push(project),
        }
    }

    /// Merge another result into this one.
    ///
    /// Projects discovered from overlapping roots are merged, their worktree
    /// lists unioned by worktree path. The earlier snapshot time is kept.
    pub fn merge(&mut self, other: DiscoveryResult) {
        for ecosystem in other.ecosystems {
            self.add_ecosystem(ecosystem);
        }
        for project in other.projects {
            self.add_project(project);
        }
        for path in other.non_grove_directories {
            self.add(Record::NonGrove(path));
        }
        if other.discovered_at < self.discovered_at {
            self.discovered_at = other.discovered_at;
        }
    }

    /// Drop cross-category duplicates, link ecosystems, and sort by path.
    pub(crate) fn finalize(&mut self) {
        let ecosystem_paths: HashSet<PathBuf> =
            self.ecosystems.iter().map(|e| e.path.clone()).collect();
        let worktree_paths: HashSet<PathBuf> = self
            .projects
            .iter()
            .flat_map(|p| p.worktrees.iter().map(|w| w.path.clone()))
            .collect();

        // A path is one entity: ecosystems beat projects, worktrees listed by
        // their owner beat standalone records, and any unit beats a bare repo.
        self.projects.retain(|p| {
            !ecosystem_paths.contains(&p.path) && !worktree_paths.contains(&p.path)
        });
        let unit_paths: HashSet<&PathBuf> = self
            .projects
            .iter()
            .map(|p| &p.path)
            .chain(ecosystem_paths.iter())
            .chain(worktree_paths.iter())
            .collect();
        let non_grove: Vec<PathBuf> = self
            .non_grove_directories
            .iter()
            .filter(|p| !unit_paths.contains(p))
            .cloned()
            .collect();
        self.non_grove_directories = non_grove;

        self.link_ecosystems();

        self.ecosystems.sort_by(|a, b| a.path.cmp(&b.path));
        self.projects.sort_by(|a, b| a.path.cmp(&b.path));
        for project in &mut self.projects {
            project.worktrees.sort_by(|a, b| a.path.cmp(&b.path));
        }
        self.non_grove_directories.sort();
    }

    /// Assign `parent_ecosystem_path` by longest-prefix match.
    ///
    /// Candidates are every ecosystem and ecosystem worktree. A candidate is
    /// rejected when a project or bare repository lies strictly between it
    /// and the record: units beneath a project boundary belong to their own
    /// classification context. Explicit and cloned projects are never linked.
    pub fn link_ecosystems(&mut self) {
        let candidates: Vec<PathBuf> = self.ecosystems.iter().map(|e| e.path.clone()).collect();
        let boundaries: Vec<PathBuf> = self
            .projects
            .iter()
            .filter(|p| p.origin == Origin::Discovered)
            .map(|p| p.path.clone())
            .chain(self.non_grove_directories.iter().cloned())
            .collect();

        let parents: HashMap<PathBuf, Option<PathBuf>> = self
            .ecosystems
            .iter()
            .map(|e| (e.path.clone(), nearest_ecosystem(&e.path, &candidates, &boundaries)))
            .collect();
        for ecosystem in &mut self.ecosystems {
            ecosystem.parent_ecosystem_path = parents.get(&ecosystem.path).cloned().flatten();
        }

        for project in &mut self.projects {
            project.parent_ecosystem_path = match project.origin {
                Origin::Discovered => nearest_ecosystem(&project.path, &candidates, &boundaries),
                Origin::Explicit | Origin::ClonedRepo => None,
            };
        }
    }
}

/// Longest candidate strictly containing `path` with no boundary in between.
fn nearest_ecosystem(path: &Path, candidates: &[PathBuf], boundaries: &[PathBuf]) -> Option<PathBuf> {
    candidates
        .iter()
        .filter(|c| c.as_path() != path && is_within(path, c))
        .filter(|c| {
            !boundaries.iter().any(|b| {
                b.as_path() != c.as_path()
                    && b.as_path() != path
                    && is_within(b, c)
                    && is_within(path, b)
            })
        })
        .max_by_key(|c| c.components().count())
        .cloned()
}
