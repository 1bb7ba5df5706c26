//! Mock implementation of [`RepositoryQueries`].
//!
//! Lets gate and scope logic be tested deterministically without creating
//! real repositories.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::{RatchetError, Result};
use crate::git::RepositoryQueries;

/// Mock repository with canned answers.
///
/// Unknown refs fail the way the real inspector fails, so a test that
/// forgets to stub a query sees a repository error rather than a silent
/// default.
///
/// # Example
///
/// ```rust,ignore
/// let repo = MockRepository::new()
///     .with_branch("feature/ABC-1")
///     .with_describe("1.2.3-4-gabcdef0");
///
/// assert!(repo.is_development_branch()?);
/// ```
#[derive(Debug)]
pub struct MockRepository {
    branch: Option<String>,
    describe: Option<String>,
    remote_refs: BTreeMap<String, String>,
    ancestors: BTreeMap<(String, String), String>,
    commit_counts: BTreeMap<(String, String), u64>,
    modified: BTreeMap<(String, String), BTreeSet<PathBuf>>,
    queries: AtomicU32,
}

impl Default for MockRepository {
    fn default() -> Self {
        Self {
            branch: Some("master".to_string()),
            describe: None,
            remote_refs: BTreeMap::new(),
            ancestors: BTreeMap::new(),
            commit_counts: BTreeMap::new(),
            modified: BTreeMap::new(),
            queries: AtomicU32::new(0),
        }
    }
}

impl Clone for MockRepository {
    fn clone(&self) -> Self {
        Self {
            branch: self.branch.clone(),
            describe: self.describe.clone(),
            remote_refs: self.remote_refs.clone(),
            ancestors: self.ancestors.clone(),
            commit_counts: self.commit_counts.clone(),
            modified: self.modified.clone(),
            queries: AtomicU32::new(self.queries.load(Ordering::SeqCst)),
        }
    }
}

impl MockRepository {
    /// Create a mock checked out on `master` with no tags or remotes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the current branch name.
    #[must_use]
    pub fn with_branch(mut self, branch: &str) -> Self {
        self.branch = Some(branch.to_string());
        self
    }

    /// Detach HEAD; branch queries fail.
    #[must_use]
    pub fn detached(mut self) -> Self {
        self.branch = None;
        self
    }

    /// Set the `git describe --tags` output.
    #[must_use]
    pub fn with_describe(mut self, describe: &str) -> Self {
        self.describe = Some(describe.to_string());
        self
    }

    /// Register a remote-tracking ref under its short name.
    #[must_use]
    pub fn with_remote_ref(mut self, short: &str, full: &str) -> Self {
        self.remote_refs.insert(short.to_string(), full.to_string());
        self
    }

    /// Register the merge base of two refs (in either order).
    #[must_use]
    pub fn with_common_ancestor(mut self, left: &str, right: &str, commit: &str) -> Self {
        self.ancestors
            .insert((left.to_string(), right.to_string()), commit.to_string());
        self.ancestors
            .insert((right.to_string(), left.to_string()), commit.to_string());
        self
    }

    /// Register the commit count for `tail..head`.
    #[must_use]
    pub fn with_commit_count(mut self, head: &str, tail: &str, count: u64) -> Self {
        self.commit_counts
            .insert((head.to_string(), tail.to_string()), count);
        self
    }

    /// Register the files changed between `tail` and `head`.
    #[must_use]
    pub fn with_modified_files(mut self, head: &str, tail: &str, files: &[&str]) -> Self {
        self.modified.insert(
            (head.to_string(), tail.to_string()),
            files.iter().map(PathBuf::from).collect(),
        );
        self
    }

    /// Number of queries answered so far.
    pub fn query_count(&self) -> u32 {
        self.queries.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.queries.fetch_add(1, Ordering::SeqCst);
    }

    fn unresolved(operation: &str, left: &str, right: &str) -> RatchetError {
        RatchetError::git(operation, format!("cannot resolve '{}' / '{}'", left, right))
    }
}

impl RepositoryQueries for MockRepository {
    fn current_branch_name(&self) -> Result<String> {
        self.record();
        self.branch
            .clone()
            .ok_or_else(|| RatchetError::git("symbolic-ref", "HEAD is detached; a branch name is required"))
    }

    fn describe_tags(&self) -> Option<String> {
        self.record();
        self.describe.clone()
    }

    fn find_remote_ref(&self, name: &str) -> Result<Option<String>> {
        self.record();
        Ok(self.remote_refs.get(name).cloned())
    }

    fn common_ancestor(&self, left: &str, right: &str) -> Result<String> {
        self.record();
        self.ancestors
            .get(&(left.to_string(), right.to_string()))
            .cloned()
            .ok_or_else(|| Self::unresolved("merge-base", left, right))
    }

    fn commit_count(&self, head: &str, tail: &str) -> Result<u64> {
        self.record();
        if head == tail {
            return Ok(0);
        }
        self.commit_counts
            .get(&(head.to_string(), tail.to_string()))
            .copied()
            .ok_or_else(|| Self::unresolved("rev-list", head, tail))
    }

    fn modified_files(&self, head: &str, tail: &str) -> Result<BTreeSet<PathBuf>> {
        self.record();
        self.modified
            .get(&(head.to_string(), tail.to_string()))
            .cloned()
            .ok_or_else(|| Self::unresolved("diff", head, tail))
    }
}
