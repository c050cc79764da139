//! Full discovery across the configured root paths.
//!
//! Each root is walked on its own named thread, and the cloned-repository
//! listing runs on one more. Tasks share nothing but a bounded result
//! queue; the calling thread drains it until every sender is gone, which is
//! the only synchronization point.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crossbeam_channel::Sender;
use walkdir::WalkDir;

use crate::config::{ResolvedConfig, RootPath};
use crate::discovery::cloned::ClonedRepoSource;
use crate::discovery::lineage::{Frame, Lineage, Rules, Step};
use crate::discovery::resolver::Resolver;
use crate::discovery::result::{DiscoveryResult, Origin, Project, Record};
use crate::error::{Result, WorkspaceError};
use crate::paths::{is_within, PathNormalizer};

/// Default capacity of the result queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// A cooperative cancellation flag shared with a running discovery.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Root tasks that have not started yet give up.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Per-run options.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Checked at the start of each root task.
    pub cancel: Option<CancelToken>,
    /// Root tasks starting after this instant give up.
    pub deadline: Option<Instant>,
    /// Bound of the result queue.
    pub queue_capacity: usize,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            cancel: None,
            deadline: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl DiscoveryOptions {
    fn should_stop(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Payload of one finished task.
struct TaskOutcome {
    label: String,
    result: Result<DiscoveryResult>,
}

/// Walks the configured roots and aggregates one [`DiscoveryResult`].
#[derive(Clone)]
pub struct DiscoveryService {
    config: ResolvedConfig,
    rules: Rules,
    cloned: Option<Arc<dyn ClonedRepoSource>>,
    options: DiscoveryOptions,
}

impl std::fmt::Debug for DiscoveryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryService")
            .field("config", &self.config)
            .field("cloned", &self.cloned.is_some())
            .field("options", &self.options)
            .finish()
    }
}

impl DiscoveryService {
    /// Create a service over a resolved configuration, using the platform's
    /// case handling.
    pub fn new(config: ResolvedConfig) -> Self {
        Self::with_normalizer(config, PathNormalizer::platform())
    }

    /// Create a service with explicit path normalization.
    pub fn with_normalizer(config: ResolvedConfig, normalizer: PathNormalizer) -> Self {
        let rules = Rules::new(&config.settings, normalizer);
        Self {
            config,
            rules,
            cloned: None,
            options: DiscoveryOptions::default(),
        }
    }

    /// Merge cloned repositories from `source` into every run.
    pub fn with_cloned_repos(mut self, source: Arc<dyn ClonedRepoSource>) -> Self {
        self.cloned = Some(source);
        self
    }

    /// Set cancellation, deadline and queue options.
    pub fn with_options(mut self, options: DiscoveryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &PathNormalizer {
        self.rules.normalizer()
    }

    /// An upward resolver sharing this service's rules.
    pub fn resolver(&self) -> Resolver {
        Resolver::from_rules(self.rules.clone())
    }

    /// Discover everything reachable from the configured roots.
    ///
    /// Failed or cancelled root tasks are logged and contribute nothing.
    pub fn discover_all(&self) -> DiscoveryResult {
        let (result, failures) = self.discover_all_with_failures();
        for err in &failures {
            tracing::warn!(error = %err, "root path task failed");
        }
        result
    }

    /// Discover everything, also returning the errors of failed tasks.
    pub fn discover_all_with_failures(&self) -> (DiscoveryResult, Vec<WorkspaceError>) {
        let started = Instant::now();
        let (tx, rx) = crossbeam_channel::bounded::<TaskOutcome>(self.options.queue_capacity.max(1));
        let mut result = DiscoveryResult::new();
        let mut failures = Vec::new();

        thread::scope(|scope| {
            for root in &self.config.roots {
                let tx = tx.clone();
                let spawned = thread::Builder::new()
                    .name(format!("grove-walk-{}", root.name))
                    .spawn_scoped(scope, move || {
                        let outcome = TaskOutcome {
                            label: root.name.clone(),
                            result: self.run_root_task(root),
                        };
                        send(&tx, outcome);
                    });
                if let Err(err) = spawned {
                    failures.push(WorkspaceError::discovery(format!(
                        "cannot spawn task for {}: {err}",
                        root.name
                    )));
                }
            }

            if let Some(source) = &self.cloned {
                let tx = tx.clone();
                let spawned = thread::Builder::new()
                    .name("grove-cloned-repos".to_string())
                    .spawn_scoped(scope, move || {
                        let outcome = TaskOutcome {
                            label: "cloned-repos".to_string(),
                            result: self.run_cloned_task(source.as_ref()),
                        };
                        send(&tx, outcome);
                    });
                if let Err(err) = spawned {
                    failures.push(WorkspaceError::discovery(format!(
                        "cannot spawn cloned repository task: {err}"
                    )));
                }
            }

            drop(tx);
            for outcome in rx.iter() {
                match outcome.result {
                    Ok(partial) => {
                        tracing::debug!(
                            task = %outcome.label,
                            projects = partial.projects.len(),
                            ecosystems = partial.ecosystems.len(),
                            "task finished"
                        );
                        result.merge(partial);
                    }
                    Err(err) => failures.push(err),
                }
            }
        });

        self.add_explicit_projects(&mut result);
        result.finalize();

        tracing::info!(
            roots = self.config.roots.len(),
            projects = result.projects.len(),
            ecosystems = result.ecosystems.len(),
            non_grove = result.non_grove_directories.len(),
            failed = failures.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "discovery finished"
        );
        (result, failures)
    }

    /// Walk a single root path on the calling thread.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::PathResolution`] when the root does not
    /// exist or is not a directory.
    pub fn discover_root(&self, root: &Path) -> Result<DiscoveryResult> {
        let mut result = walk_root(&self.rules, root)?;
        result.finalize();
        Ok(result)
    }

    fn run_root_task(&self, root: &RootPath) -> Result<DiscoveryResult> {
        if self.options.should_stop() {
            tracing::warn!(root = %root.path.display(), "discovery cancelled before walking root");
            return Err(WorkspaceError::cancelled(&root.path));
        }
        walk_root(&self.rules, &root.path)
    }

    fn run_cloned_task(&self, source: &dyn ClonedRepoSource) -> Result<DiscoveryResult> {
        if self.options.should_stop() {
            tracing::warn!("discovery cancelled before listing cloned repositories");
            return Err(WorkspaceError::cancelled("cloned repositories"));
        }

        let mut result = DiscoveryResult::new();
        for repo in source.list()? {
            if !repo.path.is_dir() {
                tracing::debug!(path = %repo.path.display(), "cloned repository missing on disk");
                continue;
            }
            let (_, path) = self.rules.canonical(&repo.path);
            let project = Project {
                origin: Origin::ClonedRepo,
                ..Project::new(repo.name, path)
            };
            result.add(Record::Project(project));
        }
        Ok(result)
    }

    fn add_explicit_projects(&self, result: &mut DiscoveryResult) {
        for explicit in &self.config.explicit_projects {
            if !explicit.path.is_dir() {
                tracing::warn!(
                    name = %explicit.name,
                    path = %explicit.path.display(),
                    "explicit project does not exist"
                );
                continue;
            }
            let (resolved, path) = self.rules.canonical(&explicit.path);
            let project = Project {
                origin: Origin::Explicit,
                worktrees: self.rules.project_worktrees(&resolved),
                ..Project::new(explicit.name.clone(), path)
            };
            result.add(Record::Project(project));
        }
    }
}

fn send(tx: &Sender<TaskOutcome>, outcome: TaskOutcome) {
    if let Err(err) = tx.send(outcome) {
        tracing::warn!(task = %err.0.label, "result queue closed before task finished");
    }
}

/// Pre-order walk of one root, pruning wherever the rules say to stop.
///
/// The root, and any link leaving the tree being walked, is anchored at its
/// real location: its ancestors are replayed first, so it is classified
/// exactly as a lookup of that location would classify it. Links back into
/// the tree are not followed; the real directory is walked in place.
fn walk_root(rules: &Rules, root: &Path) -> Result<DiscoveryResult> {
    let resolved_root = rules.normalizer().resolve(root)?;
    if !resolved_root.is_dir() {
        return Err(WorkspaceError::path_resolution(root, "not an existing directory"));
    }
    let (_, root_key) = rules.canonical(&resolved_root);

    let mut result = DiscoveryResult::new();
    let mut frames: HashMap<PathBuf, Frame> = HashMap::new();
    let mut visited: HashSet<PathBuf> = HashSet::new();

    let mut entries = WalkDir::new(&resolved_root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || (entry.file_type().is_dir()
                    && !entry
                        .file_name()
                        .to_str()
                        .is_some_and(|name| rules.is_skipped_name(name)))
        });

    while let Some(entry) = entries.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(root = %root.display(), error = %err, "skipping unreadable entry");
                continue;
            }
        };

        let dir = entry.path();
        let is_root = entry.depth() == 0;
        let linked = !is_root && entry.path_is_symlink();
        let (real, canonical) = rules.canonical(dir);

        if linked && is_within(&canonical, &root_key) {
            tracing::debug!(path = %dir.display(), "link into the walked tree, not followed");
            entries.skip_current_dir();
            continue;
        }
        if !visited.insert(canonical) {
            tracing::debug!(path = %dir.display(), "already visited through another link");
            entries.skip_current_dir();
            continue;
        }

        let step = if is_root || linked {
            anchor(rules, &real, is_root, &mut result)
        } else {
            let frame = dir
                .parent()
                .and_then(|parent| frames.get(parent))
                .cloned()
                .unwrap_or(Frame::Sealed);
            rules.step(&frame, dir, false)
        };

        match step {
            Some(step) => {
                if let Some(record) = step.record {
                    result.add(record);
                }
                if step.descend {
                    frames.insert(dir.to_path_buf(), step.children);
                } else {
                    entries.skip_current_dir();
                }
            }
            None => entries.skip_current_dir(),
        }
    }

    Ok(result)
}

/// Classify `real` from its real ancestors down.
///
/// Records of the enclosing context go straight into `result`; the returned
/// step carries no record. A root lying past a boundary (inside a project,
/// below a bare repository) is walked as a fresh context: each child is
/// judged on its own, as a lookup would judge it.
fn anchor(
    rules: &Rules,
    real: &Path,
    is_root: bool,
    result: &mut DiscoveryResult,
) -> Option<Step> {
    let mut lineage = Lineage::above(rules, real);
    let step = lineage.enter(rules, real, is_root)?;

    if is_root && step.record.is_none() && !step.descend && step.children == Frame::Sealed {
        tracing::debug!(
            path = %real.display(),
            "root lies past a boundary, walking a fresh context"
        );
        return Some(Step::pass(true, Frame::root()));
    }

    for visit in lineage.into_current() {
        result.add(visit.record);
    }
    Some(Step {
        record: None,
        ..step
    })
}
