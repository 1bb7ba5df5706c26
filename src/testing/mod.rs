//! Testing infrastructure for Ratchet.
//!
//! This module provides a mock repository, fixtures and assertions for
//! testing gates and branch logic without real repositories.
//!
//! # Architecture
//!
//! - **Mocks**: [`MockRepository`] implements
//!   [`RepositoryQueries`](crate::git::RepositoryQueries) with canned answers
//! - **Fixtures**: temporary projects backed by real git repositories
//!   (test-only)
//! - **Assertions**: expressive checks on [`GateReport`](crate::gate::GateReport)s
//!
//! # Example
//!
//! ```rust,ignore
//! use ratchet::testing::{assert_gate_passed, MockRepository};
//!
//! let repo = MockRepository::new().with_branch("feature/ABC-1");
//! let report = check_coverage(&project, &repo, GateContext::ci(), None)?;
//! assert_gate_passed(&report);
//! ```

pub mod assertions;
#[cfg(test)]
pub mod fixtures;
pub mod mocks;

// Re-export commonly used types
pub use assertions::*;
#[cfg(test)]
pub use fixtures::*;
pub use mocks::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{GateDecision, GateReport};
    use crate::git::{BranchKind, RepositoryQueries};

    // =========================================================================
    // Mock Repository Tests
    // =========================================================================

    #[test]
    fn test_mock_repository_default_is_master() {
        let repo = MockRepository::default();
        assert_eq!(repo.current_branch_name().unwrap(), "master");
        assert!(repo.is_stable_branch().unwrap());
    }

    #[test]
    fn test_mock_repository_with_describe() {
        let repo = MockRepository::new()
            .with_branch("feature/x")
            .with_describe("2.0.1");
        assert_eq!(repo.classify().unwrap().kind, BranchKind::ReleaseTag);
    }

    #[test]
    fn test_mock_repository_detached() {
        let repo = MockRepository::new().detached();
        assert!(repo.current_branch_name().is_err());
        assert!(repo.sanitized_branch_suffix().is_err());
    }

    #[test]
    fn test_mock_repository_unknown_refs_fail() {
        let repo = MockRepository::new();
        assert!(repo.common_ancestor("a", "b").is_err());
        assert!(repo.commit_count("a", "b").is_err());
        assert_eq!(repo.commit_count("a", "a").unwrap(), 0);
        assert!(repo.find_remote_ref("dev").unwrap().is_none());
    }

    #[test]
    fn test_mock_repository_counts_queries() {
        let repo = MockRepository::new();
        assert_eq!(repo.query_count(), 0);
        let _ = repo.classify();
        assert_eq!(repo.query_count(), 2);
    }

    // =========================================================================
    // Assertion Tests
    // =========================================================================

    #[test]
    fn test_assertions_on_skipped_report() {
        let report = GateReport::skipped("detekt", "no report");
        assert_decision(&report, GateDecision::Skip);
        assert_gate_passed(&report);
    }

    #[test]
    #[should_panic(expected = "Expected gate 'detekt' to fail")]
    fn test_assert_gate_failed_panics_on_pass() {
        assert_gate_failed(&GateReport::skipped("detekt", "no report"));
    }
}
