//! The cloned-repository collaborator.
//!
//! A separate cache manager keeps shallow clones keyed by source URL. This
//! crate never reads its manifest; it only asks for the list of checkouts
//! and merges them as projects tagged [`Origin::ClonedRepo`].
//!
//! [`Origin::ClonedRepo`]: crate::discovery::Origin::ClonedRepo

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Result;

/// Catch-all group every cloned repository is presented under.
///
/// This is a label, not a directory: cloned checkouts keep their own paths
/// and carry no ecosystem linkage.
pub const CLONED_REPOS_GROUP: &str = "cx-repos";

/// One checkout in the clone cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClonedRepo {
    /// Display name.
    pub name: String,
    /// Local checkout directory.
    pub path: PathBuf,
    /// Source URL the cache is keyed by.
    pub url: Option<String>,
}

impl ClonedRepo {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            url: None,
        }
    }

    /// Attach the source URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Lists cloned repositories.
///
/// Called once per discovery run from its own task.
pub trait ClonedRepoSource: Send + Sync {
    /// List the current checkouts.
    fn list(&self) -> Result<Vec<ClonedRepo>>;
}

/// Blanket implementation for Arc-wrapped sources.
impl<T: ClonedRepoSource + ?Sized> ClonedRepoSource for Arc<T> {
    fn list(&self) -> Result<Vec<ClonedRepo>> {
        (**self).list()
    }
}

/// A fixed list of cloned repositories.
#[derive(Debug, Clone, Default)]
pub struct StaticClonedRepos {
    repos: Vec<ClonedRepo>,
}

impl StaticClonedRepos {
    pub fn new(repos: Vec<ClonedRepo>) -> Self {
        Self { repos }
    }

    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }
}

impl ClonedRepoSource for StaticClonedRepos {
    fn list(&self) -> Result<Vec<ClonedRepo>> {
        Ok(self.repos.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_source_lists_repos() {
        let source = StaticClonedRepos::new(vec![
            ClonedRepo::new("serde", "/cache/serde").with_url("https://github.com/serde-rs/serde"),
        ]);
        let listed = source.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].url.as_deref(), Some("https://github.com/serde-rs/serde"));
    }

    #[test]
    fn test_arc_source_delegates() {
        let source: Arc<dyn ClonedRepoSource> = Arc::new(StaticClonedRepos::default());
        assert!(Arc::clone(&source).list().unwrap().is_empty());
    }
}
