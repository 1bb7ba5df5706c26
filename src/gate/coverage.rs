//! Gate for JaCoCo coverage percentages.
//!
//! Unlike the count gates, every type present in the report must have a
//! floor in the coverage file; a missing floor is a configuration error.
//! All types are evaluated before the gate fails so the developer sees
//! every offending type at once.

use std::collections::BTreeMap;

use tracing::{info, warn};

use super::{decide, Directionality, GateContext, GateDecision, GateReport, MetricResult};
use crate::error::{RatchetError, Result};
use crate::report::CoverageCounter;
use crate::thresholds::ThresholdStore;

/// Gate name for coverage.
pub const COVERAGE_GATE: &str = "coverage";

/// Evaluates each coverage type against its floor in `store`.
///
/// In local mode raised floors are persisted before anything else is
/// reported, so a later failure never loses them. Types present in the
/// store but absent from the report are ignored.
///
/// # Errors
///
/// Returns [`RatchetError::MissingCoverageThreshold`] naming every reported
/// type without a floor, or an IO error if raised floors cannot be
/// persisted.
pub fn evaluate_coverage(
    counters: &BTreeMap<String, CoverageCounter>,
    store: &mut ThresholdStore,
    ctx: GateContext,
) -> Result<GateReport> {
    if counters.is_empty() {
        let summary = "Coverage report has no counters, skipping check".to_string();
        warn!("{}", summary);
        return Ok(GateReport::skipped(COVERAGE_GATE, summary));
    }

    let file = store.file_name();
    let mut metrics = Vec::with_capacity(counters.len());
    let mut failures = Vec::new();
    let mut missing = Vec::new();
    let mut raised = false;
    let mut overall = GateDecision::Pass;

    for (kind, counter) in counters {
        let actual = counter.percent();
        let Some(limit) = store.get(kind) else {
            missing.push(kind.clone());
            continue;
        };

        let decision = decide(Directionality::HigherIsBetter, actual, Some(limit), ctx.ci);
        match decision {
            GateDecision::ImprovedLocal => {
                info!("Coverage increased for type={}, setting limit to {}", kind, actual);
                store.set(kind.clone(), actual);
                raised = true;
            }
            GateDecision::ImprovedCi => failures.push(format!(
                "Great! Coverage gone up, increase it to {} in {} and you're good to go: type={}, actual={}, limit={}",
                actual, file, kind, actual, limit
            )),
            GateDecision::Regressed => failures.push(format!(
                "Need more tests! Not enough coverage for: type={}, actual={}, limit={}",
                kind, actual, limit
            )),
            GateDecision::Pass | GateDecision::Skip => {}
        }

        overall = overall.worst(decision);
        metrics.push(MetricResult {
            key: kind.clone(),
            actual,
            limit: Some(limit),
            decision,
        });
    }

    if raised {
        store.persist()?;
    }

    if !missing.is_empty() {
        return Err(RatchetError::MissingCoverageThreshold { file, types: missing });
    }

    let actuals = metrics
        .iter()
        .map(|m| format!("type={}, actual={}", m.key, m.actual))
        .collect::<Vec<_>>()
        .join("; ");

    let summary = if failures.is_empty() {
        info!("Actual coverage: {}", actuals);
        "Coverage check successfully passed".to_string()
    } else {
        format!("Coverage limit failure: {}", failures.join("; "))
    };

    Ok(GateReport {
        gate: COVERAGE_GATE.to_string(),
        decision: overall,
        metrics,
        summary,
        failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thresholds::COVERAGE_FILE;
    use std::fs;
    use tempfile::TempDir;

    fn store_with(dir: &TempDir, content: &str) -> ThresholdStore {
        let path = dir.path().join(COVERAGE_FILE);
        fs::write(&path, content).unwrap();
        ThresholdStore::load(&path).unwrap().unwrap()
    }

    fn counters(entries: &[(&str, u64, u64)]) -> BTreeMap<String, CoverageCounter> {
        entries
            .iter()
            .map(|(k, c, m)| (k.to_string(), CoverageCounter::new(*c, *m)))
            .collect()
    }

    #[test]
    fn test_upper_slack_boundary_passes() {
        let temp = TempDir::new().unwrap();
        let mut store = store_with(&temp, "instruction=54\n");

        let report = evaluate_coverage(
            &counters(&[("instruction", 57, 43)]),
            &mut store,
            GateContext::local(),
        )
        .unwrap();

        assert_eq!(report.decision, GateDecision::Pass);
        assert_eq!(store.get("instruction"), Some(54));
        assert_eq!(report.summary, "Coverage check successfully passed");
    }

    #[test]
    fn test_improvement_above_slack_raises_floor_locally() {
        let temp = TempDir::new().unwrap();
        let mut store = store_with(&temp, "instruction=54\n");

        let report = evaluate_coverage(
            &counters(&[("instruction", 58, 42)]),
            &mut store,
            GateContext::local(),
        )
        .unwrap();

        assert_eq!(report.decision, GateDecision::ImprovedLocal);
        assert_eq!(
            fs::read_to_string(temp.path().join(COVERAGE_FILE)).unwrap(),
            "instruction=58\n"
        );
    }

    #[test]
    fn test_improvement_in_ci_fails_and_keeps_floor() {
        let temp = TempDir::new().unwrap();
        let mut store = store_with(&temp, "instruction=54\n");

        let report = evaluate_coverage(
            &counters(&[("instruction", 58, 42)]),
            &mut store,
            GateContext::ci(),
        )
        .unwrap();

        assert_eq!(report.decision, GateDecision::ImprovedCi);
        assert!(report.failures[0].starts_with("Great! Coverage gone up, increase it to 58"));
        assert_eq!(store.get("instruction"), Some(54));
    }

    #[test]
    fn test_all_types_evaluated_before_failing() {
        let temp = TempDir::new().unwrap();
        let mut store = store_with(&temp, "branch=80\nclass=100\ninstruction=40\nmethod=90\n");

        let report = evaluate_coverage(
            &counters(&[
                ("branch", 50, 50),
                ("class", 1, 0),
                ("instruction", 90, 10),
                ("method", 1, 1),
            ]),
            &mut store,
            GateContext::local(),
        )
        .unwrap();

        assert_eq!(report.decision, GateDecision::Regressed);
        assert_eq!(report.failures.len(), 2);
        assert!(report.failures[0].contains("type=branch, actual=50, limit=80"));
        assert!(report.failures[1].contains("type=method, actual=50, limit=90"));
        assert!(report.summary.starts_with("Coverage limit failure: "));
        // the improved type is still persisted
        assert_eq!(
            fs::read_to_string(temp.path().join(COVERAGE_FILE)).unwrap(),
            "branch=80\nclass=100\ninstruction=90\nmethod=90\n"
        );
    }

    #[test]
    fn test_missing_floor_is_a_configuration_error() {
        let temp = TempDir::new().unwrap();
        let mut store = store_with(&temp, "instruction=10\n");

        let err = evaluate_coverage(
            &counters(&[("branch", 1, 1), ("class", 1, 1), ("instruction", 1, 1)]),
            &mut store,
            GateContext::local(),
        )
        .unwrap_err();

        assert!(err.is_configuration_error());
        assert_eq!(
            err.to_string(),
            "Not found settings in coverage.properties for: type=branch, type=class"
        );
    }

    #[test]
    fn test_floor_without_reported_type_is_ignored() {
        let temp = TempDir::new().unwrap();
        let mut store = store_with(&temp, "branch=99\ninstruction=50\n");

        let report = evaluate_coverage(
            &counters(&[("instruction", 50, 50)]),
            &mut store,
            GateContext::ci(),
        )
        .unwrap();

        assert_eq!(report.decision, GateDecision::Pass);
        assert_eq!(report.metrics.len(), 1);
    }

    #[test]
    fn test_empty_counter_reads_as_zero_percent() {
        let temp = TempDir::new().unwrap();
        let mut store = store_with(&temp, "branch=0\n");

        let report = evaluate_coverage(&counters(&[("branch", 0, 0)]), &mut store, GateContext::ci()).unwrap();

        assert_eq!(report.decision, GateDecision::Pass);
        assert_eq!(report.metrics[0].actual, 0);
    }

    #[test]
    fn test_no_counters_skips() {
        let temp = TempDir::new().unwrap();
        let mut store = store_with(&temp, "branch=10\n");
        let report = evaluate_coverage(&BTreeMap::new(), &mut store, GateContext::ci()).unwrap();
        assert_eq!(report.decision, GateDecision::Skip);
    }

    #[test]
    fn test_second_local_run_lands_on_pass() {
        let temp = TempDir::new().unwrap();
        let mut store = store_with(&temp, "instruction=10\n");
        let input = counters(&[("instruction", 70, 30)]);

        let first = evaluate_coverage(&input, &mut store, GateContext::local()).unwrap();
        let mut reloaded = ThresholdStore::load(store.path()).unwrap().unwrap();
        let second = evaluate_coverage(&input, &mut reloaded, GateContext::local()).unwrap();

        assert_eq!(first.decision, GateDecision::ImprovedLocal);
        assert_eq!(second.decision, GateDecision::Pass);
    }
}
