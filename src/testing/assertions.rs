//! Custom assertions for gate outcomes.

use crate::gate::{GateDecision, GateReport};

/// Assert that a gate reached a specific decision.
///
/// # Panics
///
/// Panics with the report summary and failures if the decision differs.
///
/// # Example
///
/// ```rust,ignore
/// let report = check_style_violations(&project, &repo, ctx, None)?;
/// assert_decision(&report, GateDecision::Pass);
/// ```
pub fn assert_decision(report: &GateReport, expected: GateDecision) {
    assert_eq!(
        report.decision, expected,
        "Expected gate '{}' to be {:?}, but it was {:?}.\nSummary: {}\nFailures: {:?}",
        report.gate, expected, report.decision, report.summary, report.failures
    );
}

/// Assert that a gate did not fail the build.
///
/// # Panics
///
/// Panics if the gate failed.
pub fn assert_gate_passed(report: &GateReport) {
    assert!(
        !report.is_failure(),
        "Expected gate '{}' to pass, but it failed.\nFailures: {:?}",
        report.gate,
        report.failures
    );
}

/// Assert that a gate failed the build.
///
/// # Panics
///
/// Panics if the gate passed.
pub fn assert_gate_failed(report: &GateReport) {
    assert!(
        report.is_failure(),
        "Expected gate '{}' to fail, but it was {:?}: {}",
        report.gate,
        report.decision,
        report.summary
    );
}

/// Assert that failures contain a specific substring.
///
/// # Panics
///
/// Panics if no failure contains the expected substring.
///
/// # Example
///
/// ```rust,ignore
/// assert_failure_contains(&report, "type=branch");
/// ```
pub fn assert_failure_contains(report: &GateReport, substring: &str) {
    let found = report.failures.iter().any(|f| f.contains(substring));
    assert!(
        found,
        "Expected a failure containing '{}', but none found.\nFailures: {:?}",
        substring,
        report.failures
    );
}
