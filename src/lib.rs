//! Ratchet - static-analysis budget gates
//!
//! Keeps per-analyzer violation budgets and coverage floors in checked-in
//! properties files, compares them with freshly generated analyzer reports,
//! tightens them automatically on a developer machine and fails CI when a
//! budget is stale or exceeded.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`checks`] - The gate operations (threshold → branch → report → decision)
//! - [`config`] - `ratchet.toml` loading and validation
//! - [`error`] - Custom error types and exit codes
//! - [`gate`] - Gate decision arithmetic and evaluators
//! - [`git`] - Branch classification, ancestry queries, incremental scope
//! - [`report`] - Analyzer report parsers
//! - [`thresholds`] - The properties-file budget ledger
//! - [`testing`] - Testing infrastructure (mock repository, fixtures)
//!
//! # Example
//!
//! ```rust,ignore
//! use ratchet::checks::{check_coverage, Project};
//! use ratchet::gate::GateContext;
//! use ratchet::git::RepositoryInspector;
//!
//! let project = Project::load(".")?;
//! let repo = RepositoryInspector::new(project.dir());
//! let report = check_coverage(&project, &repo, GateContext::ci(), None)?;
//! println!("{}", report.summary);
//! report.ensure_passed()?;
//! ```

pub mod checks;
pub mod config;
pub mod error;
pub mod gate;
pub mod git;
pub mod report;
pub mod testing;
pub mod thresholds;

// Re-export commonly used types
pub use error::{RatchetError, Result};

pub use checks::{
    check_bug_finder_report, check_compiler_warnings, check_coverage, check_detekt_report,
    check_style_violations, CheckOutcome, Checker, Project,
};
pub use config::ProjectConfig;
pub use gate::{Analyzer, GateContext, GateDecision, GateReport};
pub use git::{BranchClassification, BranchKind, RepositoryInspector, RepositoryQueries};
pub use thresholds::ThresholdStore;

// Re-export testing types for convenience
pub use testing::MockRepository;
