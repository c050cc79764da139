//! Workspace discovery.
//!
//! This module finds the version-controlled units under the configured root
//! paths:
//! - Ecosystems (a unit config declaring `workspaces`) and their worktrees
//! - Projects (a unit config without `workspaces`) and their worktrees
//! - Bare repositories with no unit config
//!
//! [`DiscoveryService`] walks whole roots; [`Resolver`] answers for a single
//! path. Both drive the same rule set, so they agree on every directory a
//! full walk reaches.

pub mod classify;
pub mod cloned;
pub(crate) mod lineage;
pub mod resolver;
pub mod result;
pub mod walker;

pub use classify::{
    find_unit_config, load_unit_config, Category, Classification, Classifier, UnitConfig,
    UNIT_CONFIG_FILES,
};
pub use cloned::{ClonedRepo, ClonedRepoSource, StaticClonedRepos, CLONED_REPOS_GROUP};
pub use resolver::Resolver;
pub use result::{DiscoveryResult, Ecosystem, Origin, Project, Worktree};
pub use walker::{CancelToken, DiscoveryOptions, DiscoveryService, DEFAULT_QUEUE_CAPACITY};
