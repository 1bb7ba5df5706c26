//! Gate for violation counts (compiler warnings, checkstyle, spotbugs, detekt).

use tracing::{info, warn};

use super::{decide, Analyzer, Directionality, GateContext, GateDecision, GateReport, MetricResult};
use crate::error::Result;
use crate::thresholds::ThresholdStore;

/// Evaluates a violation count against the analyzer's budget in `store`.
///
/// A missing key is a Skip. On a local improvement the budget is lowered to
/// `actual` and the store is persisted before returning.
///
/// # Errors
///
/// Returns an IO error if the improved budget cannot be persisted. Gate
/// failures are reported through the returned [`GateReport`], not as errors.
pub fn evaluate_count(
    analyzer: Analyzer,
    actual: u64,
    store: &mut ThresholdStore,
    ctx: GateContext,
) -> Result<GateReport> {
    let key = analyzer.key();
    let budget = store.get(key);
    let decision = decide(Directionality::LowerIsBetter, actual, budget, ctx.ci);

    let metrics = vec![MetricResult {
        key: key.to_string(),
        actual,
        limit: budget,
        decision,
    }];

    let Some(limit) = budget else {
        let summary = format!(
            "No '{}' limit in {}, skipping check ({} {})",
            key,
            store.file_name(),
            actual,
            analyzer.violation_label()
        );
        warn!("{}", summary);
        return Ok(GateReport {
            gate: analyzer.gate_name().to_string(),
            decision,
            metrics,
            summary,
            failures: Vec::new(),
        });
    };

    let mut failures = Vec::new();
    let summary = match decision {
        GateDecision::Regressed => {
            let message = format!("Too much {}: actual={}, limit={}", analyzer.violation_label(), actual, limit);
            failures.push(message.clone());
            message
        }
        GateDecision::ImprovedCi => {
            let message = format!(
                "{} limit is too high, must be {}. Decrease it in file {}.",
                key,
                actual,
                store.file_name()
            );
            failures.push(message.clone());
            message
        }
        GateDecision::ImprovedLocal => {
            store.set(key, actual);
            store.persist()?;
            let message = format!(
                "{} limit decreased from {} to {} in {}",
                key,
                limit,
                actual,
                store.file_name()
            );
            info!("{}", message);
            message
        }
        GateDecision::Pass | GateDecision::Skip => {
            let message = format!("{}: actual={}, limit={}", analyzer.violation_label(), actual, limit);
            info!("{}", message);
            message
        }
    };

    Ok(GateReport {
        gate: analyzer.gate_name().to_string(),
        decision,
        metrics,
        summary,
        failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thresholds::STATIC_ANALYSIS_FILE;
    use proptest::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    fn store_with(dir: &TempDir, content: &str) -> ThresholdStore {
        let path = dir.path().join(STATIC_ANALYSIS_FILE);
        fs::write(&path, content).unwrap();
        ThresholdStore::load(&path).unwrap().unwrap()
    }

    fn on_disk(dir: &TempDir) -> String {
        fs::read_to_string(dir.path().join(STATIC_ANALYSIS_FILE)).unwrap()
    }

    #[test]
    fn test_missing_key_skips_without_touching_file() {
        let temp = TempDir::new().unwrap();
        let mut store = store_with(&temp, "compiler=10\n");

        let report = evaluate_count(Analyzer::Detekt, 500, &mut store, GateContext::ci()).unwrap();

        assert_eq!(report.decision, GateDecision::Skip);
        assert!(!report.is_failure());
        assert_eq!(on_disk(&temp), "compiler=10\n");
    }

    #[test]
    fn test_regression_fails_with_actual_and_limit() {
        let temp = TempDir::new().unwrap();
        let mut store = store_with(&temp, "checkstyle=40\n");

        let report = evaluate_count(Analyzer::Checkstyle, 41, &mut store, GateContext::local()).unwrap();

        assert_eq!(report.decision, GateDecision::Regressed);
        assert_eq!(
            report.failures,
            vec!["Too much checkstyle errors: actual=41, limit=40".to_string()]
        );
        assert_eq!(store.get("checkstyle"), Some(40));
    }

    #[test]
    fn test_dead_band_passes_and_leaves_file_unchanged() {
        let temp = TempDir::new().unwrap();
        let mut store = store_with(&temp, "# budgets\nfindbugs=100\n");

        let report = evaluate_count(Analyzer::SpotBugs, 95, &mut store, GateContext::local()).unwrap();

        assert_eq!(report.decision, GateDecision::Pass);
        assert_eq!(on_disk(&temp), "# budgets\nfindbugs=100\n");
    }

    #[test]
    fn test_local_improvement_rewrites_budget() {
        let temp = TempDir::new().unwrap();
        let mut store = store_with(&temp, "compiler=100\nfindbugs=3\n");

        let report = evaluate_count(Analyzer::Compiler, 60, &mut store, GateContext::local()).unwrap();

        assert_eq!(report.decision, GateDecision::ImprovedLocal);
        assert!(!report.is_failure());
        assert_eq!(store.get("compiler"), Some(60));
        assert_eq!(on_disk(&temp), "compiler=60\nfindbugs=3\n");
    }

    #[test]
    fn test_ci_improvement_fails_and_keeps_budget() {
        let temp = TempDir::new().unwrap();
        let mut store = store_with(&temp, "compiler=100\n");

        let report = evaluate_count(Analyzer::Compiler, 60, &mut store, GateContext::ci()).unwrap();

        assert_eq!(report.decision, GateDecision::ImprovedCi);
        assert!(report.is_failure());
        assert_eq!(
            report.failures[0],
            "compiler limit is too high, must be 60. Decrease it in file static-analysis.properties."
        );
        assert_eq!(store.get("compiler"), Some(100));
        assert_eq!(on_disk(&temp), "compiler=100\n");
    }

    #[test]
    fn test_second_local_run_lands_on_pass() {
        let temp = TempDir::new().unwrap();
        let mut store = store_with(&temp, "detekt=50\n");

        let first = evaluate_count(Analyzer::Detekt, 10, &mut store, GateContext::local()).unwrap();
        let mut reloaded = ThresholdStore::load(store.path()).unwrap().unwrap();
        let second = evaluate_count(Analyzer::Detekt, 10, &mut reloaded, GateContext::local()).unwrap();

        assert_eq!(first.decision, GateDecision::ImprovedLocal);
        assert_eq!(second.decision, GateDecision::Pass);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_ci_never_mutates_store(budget in 0u64..10_000, actual in 0u64..20_000) {
            let temp = TempDir::new().unwrap();
            let mut store = store_with(&temp, &format!("checkstyle={}\n", budget));

            let report = evaluate_count(Analyzer::Checkstyle, actual, &mut store, GateContext::ci()).unwrap();

            prop_assert_eq!(store.get("checkstyle"), Some(budget));
            prop_assert_eq!(on_disk(&temp), format!("checkstyle={}\n", budget));
            prop_assert_eq!(report.is_failure(), report.decision != GateDecision::Pass);
        }

        #[test]
        fn prop_local_evaluation_is_idempotent(budget in 0u64..10_000, actual in 0u64..10_000) {
            let temp = TempDir::new().unwrap();
            let mut store = store_with(&temp, &format!("compiler={}\n", budget));

            let first = evaluate_count(Analyzer::Compiler, actual, &mut store, GateContext::local()).unwrap();
            let second = evaluate_count(Analyzer::Compiler, actual, &mut store, GateContext::local()).unwrap();

            if first.decision == GateDecision::ImprovedLocal {
                prop_assert_eq!(store.get("compiler"), Some(actual));
                prop_assert_eq!(second.decision, GateDecision::Pass);
            } else {
                prop_assert_eq!(first.decision, second.decision);
            }
        }
    }
}
