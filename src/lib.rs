//! Grove Workspace - workspace discovery and classification
//!
//! Maps a directory tree into a typed hierarchy of version-controlled units:
//! standalone projects, multi-repository ecosystems, their git worktrees, and
//! bare repositories. Tooling asks "what workspace am I in, and what is its
//! lineage?" through a [`Provider`] built from a full discovery run, or
//! through a [`Resolver`] for a single path.
//!
//! ```no_run
//! use grove_workspace::{Config, DiscoveryService, Environment, Provider};
//!
//! let env = Environment::from_process();
//! let config = Config::load(&env).resolve(&env);
//! let provider = Provider::new(&DiscoveryService::new(config).discover_all());
//! provider.log_collisions();
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod git;
pub mod paths;
pub mod util;
pub mod workspace;

pub use config::{Config, DiscoverySettings, Environment, ResolvedConfig};
pub use discovery::{
    CancelToken, Category, Classifier, ClonedRepo, ClonedRepoSource, DiscoveryOptions,
    DiscoveryResult, DiscoveryService, Origin, Resolver, StaticClonedRepos, CLONED_REPOS_GROUP,
};
pub use error::{FailOpen, Result, WorkspaceError};
pub use git::GitMarker;
pub use paths::{normalize, CaseSensitivity, PathNormalizer};
pub use workspace::{
    build_forest, flatten_depth_first, transform, Kind, NameCollision, Provider, TreeNode,
    WorkspaceEntity,
};
