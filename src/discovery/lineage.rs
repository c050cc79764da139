//! Traversal rules shared by the walker and the upward resolver.
//!
//! Both drivers move top-down through directories carrying a [`Frame`] that
//! summarizes what the enclosing directories were. [`Rules::step`] looks at
//! one directory under a frame and says what to record, whether a full walk
//! descends, and which frame the children inherit. The walker applies it in
//! pre-order; the resolver replays it along a target's ancestor chain. Any
//! rule that lives outside `step` is a divergence between the two.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::DiscoverySettings;
use crate::discovery::classify::{Category, Classifier};
use crate::discovery::result::{Ecosystem, Project, Record, Worktree};
use crate::error::FailOpen;
use crate::git;
use crate::paths::PathNormalizer;

/// What the enclosing directories say about the next one down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Frame {
    /// Ordinary territory: classify normally. `nesting` counts ecosystem
    /// worktree containers already passed on this chain.
    Open { nesting: usize },
    /// Directly inside a project. Only its worktree container is known.
    InsideProject,
    /// Inside a project's worktree container; already listed by the project.
    ProjectContainer,
    /// Inside an ecosystem's worktree container.
    EcosystemContainer { owner: PathBuf, nesting: usize },
    /// Beyond a boundary; no rule applies here.
    Sealed,
}

impl Frame {
    /// The frame of a walk root or a fresh resolver context.
    pub(crate) fn root() -> Self {
        Self::Open { nesting: 0 }
    }
}

/// The decision for one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Step {
    pub record: Option<Record>,
    /// Whether a full walk visits the children.
    pub descend: bool,
    /// The frame the children inherit.
    pub children: Frame,
}

impl Step {
    pub(crate) fn pass(descend: bool, children: Frame) -> Self {
        Self {
            record: None,
            descend,
            children,
        }
    }

    fn record(record: Record, descend: bool, children: Frame) -> Self {
        Self {
            record: Some(record),
            descend,
            children,
        }
    }
}

/// One recorded directory on a replayed chain.
#[derive(Debug, Clone)]
pub(crate) struct Visit {
    pub dir: PathBuf,
    pub record: Record,
    pub children: Frame,
}

/// Frames and records accumulated while applying the rules top-down along
/// one chain of directories.
///
/// A sealed frame starts a fresh context at the next directory, so the
/// visits are kept per context.
#[derive(Debug)]
pub(crate) struct Lineage {
    contexts: Vec<Vec<Visit>>,
    frame: Frame,
}

impl Lineage {
    pub(crate) fn new() -> Self {
        Self {
            contexts: vec![Vec::new()],
            frame: Frame::root(),
        }
    }

    /// Replay the real ancestors of `dir`, outermost first. `dir` itself is
    /// not entered.
    pub(crate) fn above(rules: &Rules, dir: &Path) -> Self {
        let mut lineage = Self::new();
        if let Some(parent) = dir.parent() {
            let chain: Vec<&Path> = parent.ancestors().collect();
            for ancestor in chain.into_iter().rev() {
                lineage.enter(rules, ancestor, false);
            }
        }
        lineage
    }

    /// Apply the rules to `dir` under the current frame, restarting the
    /// context when the frame is sealed.
    pub(crate) fn enter(&mut self, rules: &Rules, dir: &Path, walk_root: bool) -> Option<Step> {
        let step = match rules.step(&self.frame, dir, walk_root) {
            Some(step) => step,
            None => {
                self.restart();
                rules.step(&self.frame, dir, walk_root)?
            }
        };
        if let (Some(record), Some(context)) = (&step.record, self.contexts.last_mut()) {
            context.push(Visit {
                dir: dir.to_path_buf(),
                record: record.clone(),
                children: step.children.clone(),
            });
        }
        self.frame = step.children.clone();
        Some(step)
    }

    /// Start a fresh context at the next directory.
    pub(crate) fn restart(&mut self) {
        self.contexts.push(Vec::new());
        self.frame = Frame::root();
    }

    /// Visits of the context the chain currently sits in.
    pub(crate) fn into_current(mut self) -> Vec<Visit> {
        self.contexts.pop().unwrap_or_default()
    }

    /// Visits of the innermost context that recorded anything.
    pub(crate) fn into_innermost(self) -> Vec<Visit> {
        self.contexts
            .into_iter()
            .rev()
            .find(|context| !context.is_empty())
            .unwrap_or_default()
    }
}

/// The classification rule set.
#[derive(Debug, Clone)]
pub(crate) struct Rules {
    classifier: Classifier,
    normalizer: PathNormalizer,
    settings: DiscoverySettings,
}

impl Rules {
    pub(crate) fn new(settings: &DiscoverySettings, normalizer: PathNormalizer) -> Self {
        Self {
            classifier: Classifier::new(settings.worktree_container.clone()),
            normalizer,
            settings: settings.clone(),
        }
    }

    pub(crate) fn normalizer(&self) -> &PathNormalizer {
        &self.normalizer
    }

    pub(crate) fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Whether a directory name is excluded from traversal.
    pub(crate) fn is_skipped_name(&self, name: &str) -> bool {
        self.settings.is_skipped(name)
    }

    /// Resolved (original case) and canonical (folded) forms of `dir`.
    pub(crate) fn canonical(&self, dir: &Path) -> (PathBuf, PathBuf) {
        let resolved = self
            .normalizer
            .resolve(dir)
            .fail_open_with("resolving directory", dir.to_path_buf());
        let canonical = self.normalizer.fold(resolved.clone());
        (resolved, canonical)
    }

    /// Decide what `dir` is under `frame`.
    ///
    /// Returns `None` when `frame` is sealed: `dir` lies beyond a boundary
    /// and must be judged in a fresh context, if at all.
    pub(crate) fn step(&self, frame: &Frame, dir: &Path, walk_root: bool) -> Option<Step> {
        match frame {
            Frame::Sealed => None,
            Frame::InsideProject => {
                let children = if self.classifier.is_container_name(dir) {
                    Frame::ProjectContainer
                } else {
                    Frame::Sealed
                };
                Some(Step::pass(false, children))
            }
            Frame::ProjectContainer => Some(Step::pass(false, Frame::Sealed)),
            Frame::EcosystemContainer { owner, nesting } => {
                Some(self.container_child(dir, owner, *nesting))
            }
            Frame::Open { nesting } => Some(self.open(dir, *nesting, walk_root)),
        }
    }

    fn open(&self, dir: &Path, nesting: usize, walk_root: bool) -> Step {
        let skipped = dir
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| self.is_skipped_name(n));
        if skipped && !walk_root {
            return Step::pass(false, Frame::Sealed);
        }

        let (resolved, path) = self.canonical(dir);
        let classification = self.classifier.classify(&resolved);
        let name = classification
            .configured_name()
            .map(str::to_string)
            .unwrap_or_else(|| basename(&resolved));

        match classification.category {
            Category::Ecosystem => {
                tracing::debug!(path = %path.display(), "ecosystem");
                let ecosystem = Ecosystem::new(name, path);
                Step::record(Record::Ecosystem(ecosystem), true, Frame::Open { nesting })
            }
            Category::Project => {
                tracing::debug!(path = %path.display(), "project");
                let mut project = Project::new(name, path);
                project.worktree_of = classification.git.worktree_owner().map(|owner| {
                    self.normalizer
                        .normalize(owner)
                        .fail_open_with("normalizing worktree owner", owner.to_path_buf())
                });
                project.worktrees = self.project_worktrees(&resolved);
                Step::record(Record::Project(project), false, Frame::InsideProject)
            }
            Category::NonGroveRepo => {
                tracing::debug!(path = %path.display(), "non-grove repository");
                Step::record(Record::NonGrove(path), false, Frame::Sealed)
            }
            Category::EcosystemWorktreeContainer => {
                let next = nesting + 1;
                if next > self.settings.max_ecosystem_worktree_nesting {
                    tracing::debug!(
                        path = %path.display(),
                        limit = self.settings.max_ecosystem_worktree_nesting,
                        "ecosystem worktree nesting limit reached"
                    );
                    return Step::pass(false, Frame::Sealed);
                }
                let owner = path.parent().map(Path::to_path_buf).unwrap_or_default();
                Step::pass(
                    true,
                    Frame::EcosystemContainer {
                        owner,
                        nesting: next,
                    },
                )
            }
            Category::Unknown => Step::pass(walk_root, Frame::Open { nesting }),
        }
    }

    /// A direct child of an ecosystem's worktree container.
    fn container_child(&self, dir: &Path, owner: &Path, nesting: usize) -> Step {
        let (resolved, path) = self.canonical(dir);
        let classification = self.classifier.classify(&resolved);
        if !classification.git.is_worktree() {
            tracing::debug!(path = %path.display(), "not a linked worktree, skipping");
            return Step::pass(false, Frame::Sealed);
        }

        let name = classification
            .configured_name()
            .map(str::to_string)
            .unwrap_or_else(|| basename(&resolved));
        let ecosystem = Ecosystem {
            worktree_of: Some(owner.to_path_buf()),
            ..Ecosystem::new(name, path)
        };
        Step::record(Record::Ecosystem(ecosystem), true, Frame::Open { nesting })
    }

    /// Linked worktrees in a project's worktree container.
    pub(crate) fn project_worktrees(&self, project_dir: &Path) -> Vec<Worktree> {
        let container = project_dir.join(self.classifier.worktree_container());
        let entries = match fs::read_dir(&container) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                tracing::warn!(
                    path = %container.display(),
                    error = %err,
                    "cannot list worktree container"
                );
                return Vec::new();
            }
        };

        let mut worktrees: Vec<Worktree> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.is_dir() && git::is_worktree(p))
            .map(|p| {
                let (resolved, path) = self.canonical(&p);
                let name = self
                    .classifier
                    .classify(&resolved)
                    .configured_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| basename(&resolved));
                Worktree { name, path }
            })
            .collect();
        worktrees.sort_by(|a, b| a.path.cmp(&b.path));
        worktrees
    }
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
