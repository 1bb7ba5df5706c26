//! Repository inspection and branch classification.
//!
//! Gates behave differently depending on where the build runs: stable
//! branches (`master`, `dev`, `release/*`, `hotfix/*`, or a commit tagged
//! `X.Y.Z`) versus development branches (everything else). This module
//! answers that question and the ancestry queries incremental analysis
//! needs.
//!
//! All queries go through the `git` CLI and are read-only. No process or
//! handle outlives the call that spawned it.
//!
//! # Example
//!
//! ```rust,ignore
//! use ratchet::git::{RepositoryInspector, RepositoryQueries};
//!
//! let repo = RepositoryInspector::new(".");
//! let classification = repo.classify()?;
//! if classification.is_development() {
//!     println!("suffix: {}", classification.sanitized_suffix());
//! }
//! ```

pub mod incremental;
pub mod version;

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RatchetError, Result};

pub use incremental::{closest_stable_ancestor, IncrementalScope, IncrementalScopeResolver};
pub use version::derive_version;

// ============================================================================
// Branch Classification
// ============================================================================

/// Why a branch is considered stable, or that it is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchKind {
    Master,
    Dev,
    Release,
    Hotfix,
    /// HEAD is exactly at a tag shaped like `X.Y.Z`.
    ReleaseTag,
    /// Any other branch; lenient rules apply.
    Feature,
}

impl BranchKind {
    /// Stable kinds get strict gate behaviour.
    #[must_use]
    pub fn is_stable(&self) -> bool {
        !matches!(self, Self::Feature)
    }
}

impl fmt::Display for BranchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Master => write!(f, "master"),
            Self::Dev => write!(f, "dev"),
            Self::Release => write!(f, "release"),
            Self::Hotfix => write!(f, "hotfix"),
            Self::ReleaseTag => write!(f, "release-tag"),
            Self::Feature => write!(f, "feature"),
        }
    }
}

/// The classification of the current checkout, computed once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchClassification {
    pub branch: String,
    pub kind: BranchKind,
    /// Nearest tag description, if any tag is reachable.
    pub tag: Option<String>,
}

impl BranchClassification {
    #[must_use]
    pub fn is_stable(&self) -> bool {
        self.kind.is_stable()
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        !self.is_stable()
    }

    /// Version-string safe rendering of the branch name.
    #[must_use]
    pub fn sanitized_suffix(&self) -> String {
        sanitize_branch_name(&self.branch)
    }
}

/// Classifies a branch from its name and the `git describe --tags` output.
///
/// Branch-name rules win over the tag rule, so a release branch that also
/// sits on a tag reports [`BranchKind::Release`].
#[must_use]
pub fn classify_branch(branch: &str, describe: Option<&str>) -> BranchClassification {
    let kind = if branch.eq_ignore_ascii_case("master") {
        BranchKind::Master
    } else if branch.eq_ignore_ascii_case("dev") {
        BranchKind::Dev
    } else if branch.starts_with("release/") {
        BranchKind::Release
    } else if branch.starts_with("hotfix/") {
        BranchKind::Hotfix
    } else if describe.is_some_and(is_release_version) {
        BranchKind::ReleaseTag
    } else {
        BranchKind::Feature
    };

    BranchClassification {
        branch: branch.to_string(),
        kind,
        tag: describe.map(str::to_string),
    }
}

static RELEASE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+\.[0-9]+\.[0-9]+$").expect("valid release tag pattern"));

/// Whether a tag description is a plain `X.Y.Z` release version.
#[must_use]
pub fn is_release_version(description: &str) -> bool {
    RELEASE_TAG.is_match(description)
}

/// Collapses every run of characters outside `[A-Za-z0-9.-]` into one `-`.
#[must_use]
pub fn sanitize_branch_name(branch: &str) -> String {
    let mut out = String::with_capacity(branch.len());
    let mut in_run = false;
    for c in branch.chars() {
        if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('-');
            in_run = true;
        }
    }
    out
}

// ============================================================================
// RepositoryQueries Trait
// ============================================================================

/// Read-only questions asked of a version-controlled checkout.
///
/// [`RepositoryInspector`] answers them with the `git` CLI; tests use
/// [`MockRepository`](crate::testing::MockRepository).
pub trait RepositoryQueries {
    /// Name of the checked-out branch.
    ///
    /// # Errors
    ///
    /// Fails when there is no repository or HEAD is detached.
    fn current_branch_name(&self) -> Result<String>;

    /// Nearest tag description (`git describe --tags`), `None` when no tag
    /// is reachable.
    fn describe_tags(&self) -> Option<String>;

    /// Full name of the remote-tracking ref whose short name is `name`.
    ///
    /// # Errors
    ///
    /// Fails only when the repository cannot be queried; an absent ref is
    /// `Ok(None)`.
    fn find_remote_ref(&self, name: &str) -> Result<Option<String>>;

    /// Merge base of two refs.
    ///
    /// # Errors
    ///
    /// Fails if either ref is unresolvable or the histories are unrelated.
    fn common_ancestor(&self, left: &str, right: &str) -> Result<String>;

    /// Commits reachable from `head` but not from `tail`.
    ///
    /// # Errors
    ///
    /// Fails if either ref is unresolvable.
    fn commit_count(&self, head: &str, tail: &str) -> Result<u64>;

    /// Paths added, modified, copied or renamed (new path) between the
    /// trees of `tail` and `head`, relative to the repository root.
    /// Deleted paths are excluded.
    ///
    /// # Errors
    ///
    /// Fails if either ref is unresolvable.
    fn modified_files(&self, head: &str, tail: &str) -> Result<BTreeSet<PathBuf>>;

    /// Classifies the current checkout.
    ///
    /// # Errors
    ///
    /// Propagates [`current_branch_name`](Self::current_branch_name) errors.
    fn classify(&self) -> Result<BranchClassification> {
        let branch = self.current_branch_name()?;
        let describe = self.describe_tags();
        Ok(classify_branch(&branch, describe.as_deref()))
    }

    /// See [`BranchClassification::is_stable`].
    ///
    /// # Errors
    ///
    /// Propagates [`classify`](Self::classify) errors.
    fn is_stable_branch(&self) -> Result<bool> {
        Ok(self.classify()?.is_stable())
    }

    /// Logical negation of [`is_stable_branch`](Self::is_stable_branch).
    ///
    /// # Errors
    ///
    /// Propagates [`classify`](Self::classify) errors.
    fn is_development_branch(&self) -> Result<bool> {
        Ok(!self.is_stable_branch()?)
    }

    /// See [`sanitize_branch_name`].
    ///
    /// # Errors
    ///
    /// Propagates [`current_branch_name`](Self::current_branch_name) errors.
    fn sanitized_branch_suffix(&self) -> Result<String> {
        Ok(sanitize_branch_name(&self.current_branch_name()?))
    }
}

// ============================================================================
// RepositoryInspector
// ============================================================================

/// Answers [`RepositoryQueries`] by running `git` inside a working tree.
#[derive(Debug, Clone)]
pub struct RepositoryInspector {
    /// Any path inside the working tree
    repo_path: PathBuf,
}

impl RepositoryInspector {
    /// Create an inspector rooted at `repo_path`. Nothing is executed until
    /// the first query.
    #[must_use]
    pub fn new<P: AsRef<Path>>(repo_path: P) -> Self {
        Self {
            repo_path: repo_path.as_ref().to_path_buf(),
        }
    }

    /// The path queries run in.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.repo_path
    }

    /// Absolute path of the working tree root.
    ///
    /// # Errors
    ///
    /// Fails outside a repository.
    pub fn toplevel(&self) -> Result<PathBuf> {
        let out = self.run("rev-parse", &["rev-parse", "--show-toplevel"])?;
        Ok(PathBuf::from(out.trim()))
    }

    /// Runs a git command and returns stdout, mapping a non-zero exit to
    /// [`RatchetError::Git`].
    fn run(&self, operation: &str, args: &[&str]) -> Result<String> {
        debug!("git {}", args.join(" "));
        let output = Command::new("git")
            .args(["-c", "core.quotepath=off"])
            .args(args)
            .current_dir(&self.repo_path)
            .output()
            .map_err(|e| RatchetError::git(operation, e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = if stderr.trim().is_empty() {
                format!("git {} exited with {}", operation, output.status)
            } else {
                stderr.trim().to_string()
            };
            return Err(RatchetError::git(operation, message));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Resolves a ref to a commit id, failing loudly on unknown refs.
    fn resolve_commit(&self, reference: &str) -> Result<String> {
        let spec = format!("{}^{{commit}}", reference);
        let out = self.run("rev-parse", &["rev-parse", "--verify", "--quiet", &spec])
            .map_err(|_| RatchetError::git("rev-parse", format!("cannot resolve '{}'", reference)))?;
        Ok(out.trim().to_string())
    }

    fn remotes(&self) -> Result<Vec<String>> {
        let out = self.run("remote", &["remote"])?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }
}

impl RepositoryQueries for RepositoryInspector {
    fn current_branch_name(&self) -> Result<String> {
        let out = self
            .run("symbolic-ref", &["symbolic-ref", "--quiet", "--short", "HEAD"])
            .map_err(|e| match e {
                RatchetError::Git { message, .. } if message.contains("exited with") => {
                    RatchetError::git("symbolic-ref", "HEAD is detached; a branch name is required")
                }
                other => other,
            })?;
        let branch = out.trim();
        if branch.is_empty() {
            return Err(RatchetError::git("symbolic-ref", "no current branch"));
        }
        Ok(branch.to_string())
    }

    fn describe_tags(&self) -> Option<String> {
        match self.run("describe", &["describe", "--tags"]) {
            Ok(out) => {
                let tag = out.trim();
                (!tag.is_empty()).then(|| tag.to_string())
            }
            Err(e) => {
                debug!("No tag description: {}", e);
                None
            }
        }
    }

    fn find_remote_ref(&self, name: &str) -> Result<Option<String>> {
        let remotes = self.remotes()?;
        let refs = self.run(
            "for-each-ref",
            &["for-each-ref", "--format=%(refname)", "refs/remotes"],
        )?;

        Ok(refs
            .lines()
            .map(str::trim)
            .find(|full| {
                remotes.iter().any(|remote| {
                    full.strip_prefix("refs/remotes/")
                        .and_then(|rest| rest.strip_prefix(remote.as_str()))
                        .and_then(|rest| rest.strip_prefix('/'))
                        == Some(name)
                })
            })
            .map(str::to_string))
    }

    fn common_ancestor(&self, left: &str, right: &str) -> Result<String> {
        let left = self.resolve_commit(left)?;
        let right = self.resolve_commit(right)?;
        let out = self
            .run("merge-base", &["merge-base", &left, &right])
            .map_err(|_| {
                RatchetError::git("merge-base", format!("no common ancestor of {} and {}", left, right))
            })?;
        Ok(out.trim().to_string())
    }

    fn commit_count(&self, head: &str, tail: &str) -> Result<u64> {
        let head = self.resolve_commit(head)?;
        let tail = self.resolve_commit(tail)?;
        let range = format!("{}..{}", tail, head);
        let out = self.run("rev-list", &["rev-list", "--count", &range])?;
        out.trim()
            .parse::<u64>()
            .map_err(|e| RatchetError::git("rev-list", format!("unexpected count output: {}", e)))
    }

    fn modified_files(&self, head: &str, tail: &str) -> Result<BTreeSet<PathBuf>> {
        let head = self.resolve_commit(head)?;
        let tail = self.resolve_commit(tail)?;
        let out = self.run(
            "diff",
            &[
                "diff",
                "-z",
                "--name-status",
                "--no-renames",
                "--diff-filter=ACMRT",
                &tail,
                &head,
            ],
        )?;
        Ok(parse_name_status_output(&out))
    }
}

/// Parse `git diff -z --name-status` output into the set of new paths.
///
/// Fields are NUL-terminated: a status, then one path, or two paths for
/// renames and copies (the new path is taken). Paths arrive unquoted.
fn parse_name_status_output(output: &str) -> BTreeSet<PathBuf> {
    let mut files = BTreeSet::new();
    let mut fields = output.split('\0').filter(|f| !f.is_empty());

    while let Some(status) = fields.next() {
        let path = match status.chars().next() {
            Some('R' | 'C') => fields.nth(1),
            Some('D') => {
                fields.next();
                None
            }
            _ => fields.next(),
        };

        if let Some(path) = path {
            files.insert(PathBuf::from(path));
        }
    }

    files
}
