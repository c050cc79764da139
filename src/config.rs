//! Discovery configuration.
//!
//! The configuration names the root search paths to walk, explicit project
//! entries that bypass discovery, and a few traversal settings. It is
//! resolved once into a [`ResolvedConfig`] (home directory and environment
//! variables expanded, disabled entries dropped) before any discovery call,
//! so nothing deeper in the crate reads process state.
//!
//! All configuration is optional. A missing or unreadable file yields an
//! empty root set and therefore an empty, valid discovery result.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{FailOpen, Result, WorkspaceError};

/// Default name of the reserved worktree container directory.
pub const DEFAULT_WORKTREE_CONTAINER: &str = ".grove-worktrees";

/// Default limit on nested ecosystem-worktree chains.
pub const DEFAULT_MAX_ECOSYSTEM_WORKTREE_NESTING: usize = 2;

/// Smallest accepted nesting limit (plain ecosystem worktrees must work).
pub const MIN_ECOSYSTEM_WORKTREE_NESTING: usize = 1;

/// Largest accepted nesting limit.
pub const MAX_ECOSYSTEM_WORKTREE_NESTING: usize = 8;

/// Environment variable naming an alternate config file.
pub const CONFIG_PATH_VAR: &str = "GROVE_WS_CONFIG";

/// Environment variable overriding the ecosystem-worktree nesting limit.
pub const NESTING_VAR: &str = "GROVE_WS_MAX_WORKTREE_NESTING";

/// Environment variable adding search paths (platform path-list syntax).
pub const EXTRA_SEARCH_PATHS_VAR: &str = "GROVE_WS_EXTRA_SEARCH_PATHS";

/// Main configuration struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Named root search paths.
    pub search_paths: BTreeMap<String, SearchPath>,
    /// Projects registered by path, bypassing discovery.
    pub explicit_projects: Vec<ExplicitProject>,
    /// Traversal settings.
    pub discovery: DiscoverySettings,
}

/// One root search path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchPath {
    /// Filesystem path; may start with `~` and contain `$VAR` references.
    pub path: String,
    /// Disabled paths are ignored.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Free-form label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A project registered explicitly by path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExplicitProject {
    /// Display name.
    pub name: String,
    /// Filesystem path; same expansion rules as [`SearchPath::path`].
    pub path: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Traversal settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiscoverySettings {
    /// Name of the reserved directory holding linked worktrees.
    pub worktree_container: String,
    /// How many ecosystem worktrees may appear on one chain.
    pub max_ecosystem_worktree_nesting: usize,
    /// Directory names never visited.
    pub skip_dir_names: Vec<String>,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            worktree_container: DEFAULT_WORKTREE_CONTAINER.to_string(),
            max_ecosystem_worktree_nesting: DEFAULT_MAX_ECOSYSTEM_WORKTREE_NESTING,
            skip_dir_names: vec![".git".to_string(), "node_modules".to_string()],
        }
    }
}

impl DiscoverySettings {
    /// Check if a nesting limit is within the accepted range.
    pub fn is_valid_nesting(value: usize) -> bool {
        (MIN_ECOSYSTEM_WORKTREE_NESTING..=MAX_ECOSYSTEM_WORKTREE_NESTING).contains(&value)
    }

    /// Whether a directory name is excluded from traversal.
    pub fn is_skipped(&self, name: &str) -> bool {
        self.skip_dir_names.iter().any(|s| s == name)
    }
}

/// A snapshot of the process environment used for path expansion.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
    home: Option<PathBuf>,
}

impl Environment {
    /// Capture the current process environment and home directory.
    pub fn from_process() -> Self {
        Self {
            vars: env::vars().collect(),
            home: dirs::home_dir(),
        }
    }

    /// An empty environment with the given home directory.
    pub fn new(home: Option<PathBuf>) -> Self {
        Self {
            vars: HashMap::new(),
            home,
        }
    }

    /// Add or replace a variable.
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Look up a variable.
    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// The home directory, if known.
    pub fn home(&self) -> Option<&Path> {
        self.home.as_deref()
    }
}

/// One configured root path after expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootPath {
    /// The search path's key in the config.
    pub name: String,
    /// Expanded, absolute-or-lexical path.
    pub path: PathBuf,
}

/// An explicit project after expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedExplicitProject {
    pub name: String,
    pub path: PathBuf,
}

/// Configuration with every path expanded; the input to discovery.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedConfig {
    /// Enabled root search paths, deduplicated, in config order.
    pub roots: Vec<RootPath>,
    /// Enabled explicit projects.
    pub explicit_projects: Vec<ResolvedExplicitProject>,
    /// Traversal settings.
    pub settings: DiscoverySettings,
}

impl ResolvedConfig {
    /// A configuration walking exactly the given roots with default settings.
    pub fn with_roots<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let roots = roots
            .into_iter()
            .enumerate()
            .map(|(i, p)| RootPath {
                name: format!("root-{i}"),
                path: p.into(),
            })
            .collect();
        Self {
            roots,
            ..Self::default()
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| WorkspaceError::io(path, e))?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration, returning defaults when it is absent or broken.
    ///
    /// A missing file is silent; an unreadable or invalid one is logged.
    pub fn load_fail_open(path: &Path) -> Config {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no discovery config, using defaults");
            return Config::default();
        }
        Self::load_from_file(path).fail_open_default("loading discovery config")
    }

    /// Load from the default location with environment overrides applied.
    pub fn load(env: &Environment) -> Config {
        let mut config = match config_path(env) {
            Some(path) => Self::load_fail_open(&path),
            None => Config::default(),
        };
        config.apply_env_overrides(env);
        config
    }

    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self, env: &Environment) {
        if let Some(val) = env.var(NESTING_VAR) {
            match val.parse::<usize>() {
                Ok(n) if DiscoverySettings::is_valid_nesting(n) => {
                    self.discovery.max_ecosystem_worktree_nesting = n;
                }
                Ok(n) => tracing::warn!(
                    "Invalid {} value '{}'. Must be in {}..={}. Using '{}'.",
                    NESTING_VAR,
                    n,
                    MIN_ECOSYSTEM_WORKTREE_NESTING,
                    MAX_ECOSYSTEM_WORKTREE_NESTING,
                    self.discovery.max_ecosystem_worktree_nesting
                ),
                Err(_) => tracing::warn!(
                    "Invalid {} value '{}'. Expected a positive integer. Using '{}'.",
                    NESTING_VAR,
                    val,
                    self.discovery.max_ecosystem_worktree_nesting
                ),
            }
        }

        if let Some(val) = env.var(EXTRA_SEARCH_PATHS_VAR) {
            for (i, path) in env::split_paths(val).enumerate() {
                if path.as_os_str().is_empty() {
                    continue;
                }
                self.search_paths.insert(
                    format!("env-{i}"),
                    SearchPath {
                        path: path.to_string_lossy().into_owned(),
                        enabled: true,
                        description: Some(format!("from {EXTRA_SEARCH_PATHS_VAR}")),
                    },
                );
            }
        }
    }

    /// Expand every enabled path into a [`ResolvedConfig`].
    ///
    /// A path that cannot be expanded (unset variable, no home directory)
    /// is logged and skipped; it never fails the whole resolution.
    pub fn resolve(&self, env: &Environment) -> ResolvedConfig {
        let mut roots: Vec<RootPath> = Vec::new();
        for (name, search_path) in &self.search_paths {
            if !search_path.enabled {
                tracing::debug!(name = %name, "search path disabled");
                continue;
            }
            let Some(path) = expand_path(&search_path.path, env)
                .map(Some)
                .fail_open_with(&format!("expanding search path '{name}'"), None)
            else {
                continue;
            };
            if roots.iter().any(|r| r.path == path) {
                continue;
            }
            roots.push(RootPath {
                name: name.clone(),
                path,
            });
        }

        let explicit_projects = self
            .explicit_projects
            .iter()
            .filter(|p| p.enabled)
            .filter_map(|p| {
                expand_path(&p.path, env)
                    .map(|path| ResolvedExplicitProject {
                        name: p.name.clone(),
                        path,
                    })
                    .map(Some)
                    .fail_open_with(&format!("expanding explicit project '{}'", p.name), None)
            })
            .collect();

        ResolvedConfig {
            roots,
            explicit_projects,
            settings: self.discovery.clone(),
        }
    }
}

/// Default config file location.
///
/// `GROVE_WS_CONFIG` wins when set and non-empty; otherwise
/// `~/.config/grove/workspaces.toml`.
pub fn config_path(env: &Environment) -> Option<PathBuf> {
    if let Some(path) = env.var(CONFIG_PATH_VAR) {
        if path.is_empty() {
            tracing::warn!("{} is empty, using default", CONFIG_PATH_VAR);
        } else {
            return Some(PathBuf::from(path));
        }
    }
    env.home()
        .map(|home| home.join(".config").join("grove").join("workspaces.toml"))
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}|\$([A-Za-z_][A-Za-z0-9_]*)")
            .expect("env var pattern is valid")
    })
}

/// Expand `~`, `$VAR`, `${VAR}` and `${VAR:-default}` in a configured path.
pub fn expand_path(raw: &str, env: &Environment) -> Result<PathBuf> {
    let mut missing: Option<String> = None;
    let substituted = env_var_pattern().replace_all(raw, |caps: &regex::Captures<'_>| {
        let name = caps
            .get(1)
            .or_else(|| caps.get(3))
            .map(|m| m.as_str())
            .unwrap_or_default();
        match (env.var(name), caps.get(2)) {
            (Some(value), _) => value.to_string(),
            (None, Some(default)) => default.as_str().to_string(),
            (None, None) => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    if let Some(var) = missing {
        return Err(WorkspaceError::config(format!(
            "environment variable not set: {var} (in '{raw}')"
        )));
    }

    let expanded = substituted.as_ref();
    if expanded == "~" || expanded.starts_with("~/") {
        let home = env
            .home()
            .ok_or_else(|| WorkspaceError::config(format!("no home directory for '{raw}'")))?;
        let rest = expanded.trim_start_matches('~').trim_start_matches('/');
        return Ok(if rest.is_empty() {
            home.to_path_buf()
        } else {
            home.join(rest)
        });
    }

    if expanded.is_empty() {
        return Err(WorkspaceError::config(format!("empty path in '{raw}'")));
    }

    Ok(PathBuf::from(expanded))
}
