//! Scoping analysis to files changed since the nearest stable branch.
//!
//! A feature branch is compared against the remote-tracking copy of each
//! configured stable branch. The merge base with the fewest commits between
//! it and the current branch is the closest stable ancestor; every file
//! changed since then (and still present) is in scope.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::RepositoryQueries;
use crate::config::IncrementalConfig;
use crate::error::{RatchetError, Result};

/// The stable branch a feature branch was cut from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StableAncestor {
    /// Configured stable branch name, e.g. `dev`.
    pub branch: String,
    /// Full remote-tracking ref the ancestor was computed against.
    pub remote_ref: String,
    /// Merge-base commit id.
    pub commit: String,
    /// Commits on the current branch since `commit`.
    pub distance: u64,
}

/// Files to analyse on the current branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncrementalScope {
    pub branch: String,
    pub ancestor: StableAncestor,
    /// Repository-relative paths, sorted.
    pub files: Vec<PathBuf>,
}

/// Finds the closest stable ancestor of `current` among `stable_branches`.
///
/// Stable branches without a remote-tracking ref are skipped. Ties keep the
/// first branch in configuration order.
///
/// # Errors
///
/// Propagates repository errors from the ancestry queries.
pub fn closest_stable_ancestor<R: RepositoryQueries + ?Sized>(
    repo: &R,
    current: &str,
    stable_branches: &[String],
) -> Result<Option<StableAncestor>> {
    let mut closest: Option<StableAncestor> = None;

    for branch in stable_branches {
        let Some(remote_ref) = repo.find_remote_ref(branch)? else {
            debug!("No remote ref for stable branch {}", branch);
            continue;
        };

        let commit = repo.common_ancestor(&remote_ref, current)?;
        let distance = repo.commit_count(current, &commit)?;
        debug!("{} -> {}: ancestor={}, distance={}", current, remote_ref, commit, distance);

        if closest.as_ref().map_or(true, |c| distance < c.distance) {
            closest = Some(StableAncestor {
                branch: branch.clone(),
                remote_ref,
                commit,
                distance,
            });
        }
    }

    Ok(closest)
}

/// Resolves the [`IncrementalScope`] for a working tree.
#[derive(Debug, Clone)]
pub struct IncrementalScopeResolver {
    enabled: bool,
    stable_branches: Vec<String>,
    include: Option<GlobSet>,
}

impl IncrementalScopeResolver {
    /// An enabled resolver with no include filter.
    #[must_use]
    pub fn new(stable_branches: Vec<String>) -> Self {
        Self {
            enabled: true,
            stable_branches,
            include: None,
        }
    }

    /// Builds a resolver from the `[incremental]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns [`RatchetError::InvalidConfig`] for a malformed glob.
    pub fn from_config(config: &IncrementalConfig) -> Result<Self> {
        let resolver = Self::new(config.stable_branches.clone()).with_include_patterns(&config.include)?;
        Ok(Self {
            enabled: config.enabled,
            ..resolver
        })
    }

    /// Restricts the scope to paths matching any of `patterns`. An empty
    /// list keeps every path.
    ///
    /// # Errors
    ///
    /// Returns [`RatchetError::InvalidConfig`] for a malformed glob.
    pub fn with_include_patterns<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self> {
        self.include = build_glob_set(patterns)?;
        Ok(self)
    }

    /// Whether incremental analysis applies at all.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled && !self.stable_branches.is_empty()
    }

    /// Computes the scope, or `None` when analysis should not be narrowed:
    /// disabled, on a stable branch, or no stable ancestor found.
    ///
    /// # Errors
    ///
    /// Propagates repository errors.
    pub fn resolve<R: RepositoryQueries + ?Sized>(
        &self,
        repo: &R,
        work_tree: &Path,
    ) -> Result<Option<IncrementalScope>> {
        if !self.is_enabled() {
            debug!("Incremental analysis disabled");
            return Ok(None);
        }

        let branch = repo.current_branch_name()?;
        if self.stable_branches.iter().any(|b| *b == branch) {
            info!("On stable branch {}, analysing all files", branch);
            return Ok(None);
        }

        let Some(ancestor) = closest_stable_ancestor(repo, &branch, &self.stable_branches)? else {
            warn!(
                "No stable ancestor found for {} among [{}], analysing all files",
                branch,
                self.stable_branches.join(", ")
            );
            return Ok(None);
        };

        let files = repo
            .modified_files(&branch, &ancestor.commit)?
            .into_iter()
            .filter(|path| self.is_included(path))
            .filter(|path| work_tree.join(path).is_file())
            .collect::<Vec<_>>();

        info!(
            "Incremental scope: {} file(s) changed since {} ({})",
            files.len(),
            ancestor.branch,
            ancestor.commit
        );

        Ok(Some(IncrementalScope {
            branch,
            ancestor,
            files,
        }))
    }

    fn is_included(&self, path: &Path) -> bool {
        self.include.as_ref().map_or(true, |set| set.is_match(path))
    }
}

fn build_glob_set<S: AsRef<str>>(patterns: &[S]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern.as_ref()).map_err(|e| RatchetError::InvalidConfig {
            field: "incremental.include".to_string(),
            reason: e.to_string(),
        })?;
        builder.add(glob);
    }

    builder.build().map(Some).map_err(|e| RatchetError::InvalidConfig {
        field: "incremental.include".to_string(),
        reason: e.to_string(),
    })
}
