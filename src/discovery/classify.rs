//! Per-directory classification.
//!
//! A directory is classified from its markers alone:
//! - a unit-config file declaring `workspaces` → **ecosystem**
//! - a unit-config file without `workspaces` → **project**
//! - no unit-config but a `.git` entry → **non-grove repository**
//! - the worktree container of an ecosystem → **ecosystem worktree container**
//! - anything else → **unknown**
//!
//! Unit-config parse failures are logged and classification falls through
//! to the `.git` test.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkspaceError};
use crate::git::{self, GitMarker};
use crate::util::read_marker_file;

/// Accepted unit-config file names, in lookup order.
pub const UNIT_CONFIG_FILES: &[&str] = &["grove.yml", "grove.yaml", "grove.toml"];

/// The fields of a unit-config file that classification reads.
///
/// Every other field belongs to downstream tooling and is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitConfig {
    /// Display name override.
    pub name: Option<String>,
    /// Workspace globs; non-empty marks an ecosystem.
    pub workspaces: Vec<String>,
}

impl UnitConfig {
    /// Whether this config declares an ecosystem.
    pub fn is_ecosystem(&self) -> bool {
        !self.workspaces.is_empty()
    }

    /// The configured name, ignoring blank values.
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }
}

/// The outcome category of classifying one directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Ecosystem,
    Project,
    EcosystemWorktreeContainer,
    NonGroveRepo,
    Unknown,
}

impl Category {
    /// Get the category name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ecosystem => "ecosystem",
            Self::Project => "project",
            Self::EcosystemWorktreeContainer => "ecosystem_worktree_container",
            Self::NonGroveRepo => "non_grove_repo",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of classifying a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    /// The loaded unit config, for ecosystems and projects.
    pub unit_config: Option<UnitConfig>,
    /// What the directory's `.git` entry says.
    pub git: GitMarker,
}

impl Classification {
    /// The configured display name, if any.
    pub fn configured_name(&self) -> Option<&str> {
        self.unit_config.as_ref().and_then(UnitConfig::display_name)
    }
}

/// Classifies directories.
///
/// Both the walker and the upward resolver hold one of these; no other code
/// inspects unit-config files or decides a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classifier {
    worktree_container: String,
}

impl Classifier {
    /// Create a classifier recognizing the given worktree container name.
    pub fn new(worktree_container: impl Into<String>) -> Self {
        Self {
            worktree_container: worktree_container.into(),
        }
    }

    /// The reserved worktree container directory name.
    pub fn worktree_container(&self) -> &str {
        &self.worktree_container
    }

    /// Whether `dir` is named like a worktree container.
    pub fn is_container_name(&self, dir: &Path) -> bool {
        dir.file_name().and_then(|n| n.to_str()) == Some(self.worktree_container.as_str())
    }

    /// Classify one directory.
    pub fn classify(&self, dir: &Path) -> Classification {
        if self.is_container_name(dir) {
            let parent_is_ecosystem = dir
                .parent()
                .and_then(load_unit_config_fail_open)
                .is_some_and(|config| config.is_ecosystem());
            if parent_is_ecosystem {
                return Classification {
                    category: Category::EcosystemWorktreeContainer,
                    unit_config: None,
                    git: GitMarker::Absent,
                };
            }
        }

        let git = git::inspect(dir);

        if let Some(config) = load_unit_config_fail_open(dir) {
            let category = if config.is_ecosystem() {
                Category::Ecosystem
            } else {
                Category::Project
            };
            return Classification {
                category,
                unit_config: Some(config),
                git,
            };
        }

        let category = if git.is_present() {
            Category::NonGroveRepo
        } else {
            Category::Unknown
        };
        Classification {
            category,
            unit_config: None,
            git,
        }
    }
}

/// Find the unit-config file of `dir`, if any.
pub fn find_unit_config(dir: &Path) -> Option<PathBuf> {
    UNIT_CONFIG_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Load and parse the unit config of `dir`.
///
/// Returns `Ok(None)` when the directory has no unit-config file.
pub fn load_unit_config(dir: &Path) -> Result<Option<UnitConfig>> {
    let Some(path) = find_unit_config(dir) else {
        return Ok(None);
    };
    let content = read_marker_file(&path)?;
    parse_unit_config(&path, &content).map(Some)
}

fn load_unit_config_fail_open(dir: &Path) -> Option<UnitConfig> {
    match load_unit_config(dir) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                dir = %dir.display(),
                error = %err,
                "ignoring unreadable unit config"
            );
            None
        }
    }
}

/// Parse unit-config content according to the file's extension.
fn parse_unit_config(path: &Path, content: &str) -> Result<UnitConfig> {
    let is_toml = path.extension().and_then(|e| e.to_str()) == Some("toml");
    if is_toml {
        return toml::from_str(content)
            .map_err(|e| WorkspaceError::unit_config(path, e.to_string()));
    }

    // An empty YAML document deserializes as unit; treat it as an empty config.
    if content.trim().is_empty() {
        return Ok(UnitConfig::default());
    }
    serde_yaml::from_str(content).map_err(|e| WorkspaceError::unit_config(path, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn classifier() -> Classifier {
        Classifier::new(".grove-worktrees")
    }

    #[test]
    fn test_ecosystem_from_workspaces() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("grove.yml"), "workspaces: [\"*\"]\n").unwrap();

        let c = classifier().classify(temp.path());
        assert_eq!(c.category, Category::Ecosystem);
        assert!(c.unit_config.unwrap().is_ecosystem());
    }

    #[test]
    fn test_project_without_workspaces() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("grove.yml"), "name: proj-a\n").unwrap();

        let c = classifier().classify(temp.path());
        assert_eq!(c.category, Category::Project);
        assert_eq!(c.configured_name(), Some("proj-a"));
    }

    #[test]
    fn test_empty_workspaces_is_project() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("grove.yml"), "workspaces: []\n").unwrap();
        assert_eq!(classifier().classify(temp.path()).category, Category::Project);
    }

    #[test]
    fn test_empty_config_file_is_project() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("grove.yml"), "").unwrap();
        assert_eq!(classifier().classify(temp.path()).category, Category::Project);
    }

    #[test]
    fn test_alternate_file_names() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("grove.yaml"), "workspaces: [a]\n").unwrap();
        assert_eq!(classifier().classify(temp.path()).category, Category::Ecosystem);

        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("grove.toml"),
            "name = \"tomlish\"\nworkspaces = [\"*\"]\n",
        )
        .unwrap();
        let c = classifier().classify(temp.path());
        assert_eq!(c.category, Category::Ecosystem);
        assert_eq!(c.configured_name(), Some("tomlish"));
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("grove.yml"),
            "name: x\nnotebooks:\n  root: ~/notes\nworkspaces: ['*']\n",
        )
        .unwrap();
        assert_eq!(classifier().classify(temp.path()).category, Category::Ecosystem);
    }

    #[test]
    fn test_non_grove_repo() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();

        let c = classifier().classify(temp.path());
        assert_eq!(c.category, Category::NonGroveRepo);
        assert!(c.unit_config.is_none());
    }

    #[test]
    fn test_unknown() {
        let temp = TempDir::new().unwrap();
        assert_eq!(classifier().classify(temp.path()).category, Category::Unknown);
    }

    #[test]
    fn test_broken_config_falls_through_to_git() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("grove.yml"), "workspaces: [unclosed\n").unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        assert_eq!(
            classifier().classify(temp.path()).category,
            Category::NonGroveRepo
        );

        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("grove.yml"), "workspaces: {bad: [\n").unwrap();
        assert_eq!(classifier().classify(temp.path()).category, Category::Unknown);
    }

    #[test]
    fn test_load_unit_config_error_keeps_path() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("grove.yml"), "workspaces: 12: x").unwrap();
        let err = load_unit_config(temp.path()).unwrap_err();
        assert!(matches!(err, WorkspaceError::UnitConfig { .. }));
        assert!(err.to_string().contains("grove.yml"));
    }

    #[test]
    fn test_ecosystem_worktree_container() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("grove.yml"), "workspaces: ['*']\n").unwrap();
        let container = temp.path().join(".grove-worktrees");
        fs::create_dir(&container).unwrap();

        assert_eq!(
            classifier().classify(&container).category,
            Category::EcosystemWorktreeContainer
        );
    }

    #[test]
    fn test_project_container_is_not_ecosystem_container() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("grove.yml"), "name: p\n").unwrap();
        let container = temp.path().join(".grove-worktrees");
        fs::create_dir(&container).unwrap();

        assert_eq!(classifier().classify(&container).category, Category::Unknown);
    }

    #[test]
    fn test_classification_carries_git_marker() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("grove.yml"), "name: p\n").unwrap();
        fs::write(
            temp.path().join(".git"),
            "gitdir: /w/p/.git/worktrees/feat\n",
        )
        .unwrap();

        let c = classifier().classify(temp.path());
        assert_eq!(c.category, Category::Project);
        assert!(c.git.is_worktree());
    }

    #[test]
    fn test_blank_name_is_ignored() {
        let config = UnitConfig {
            name: Some("  ".into()),
            workspaces: vec![],
        };
        assert_eq!(config.display_name(), None);
    }

    #[test]
    fn test_category_display() {
        assert_eq!(Category::NonGroveRepo.to_string(), "non_grove_repo");
        let json = serde_json::to_string(&Category::EcosystemWorktreeContainer).unwrap();
        assert_eq!(json, "\"ecosystem_worktree_container\"");
    }
}
