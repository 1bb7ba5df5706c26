//! Budget gates.
//!
//! A gate compares one freshly measured metric against its checked-in
//! budget and returns a [`GateDecision`]. The arithmetic lives in the pure
//! [`decide`] function; the evaluators in [`count`] and [`coverage`] add the
//! side effects (rewriting the threshold file in local mode) and the
//! human-readable messages.
//!
//! # Decision bands
//!
//! | Direction | Regressed | Pass | Improved |
//! |-----------|-----------|------|----------|
//! | lower is better (counts) | `actual > budget` | `floor(0.95 * budget) <= actual <= budget` | `actual < floor(0.95 * budget)` |
//! | higher is better (coverage) | `actual < budget` | `budget <= actual <= budget + 3` | `actual > budget + 3` |
//!
//! An improvement passes locally after the budget is rewritten, and fails in
//! CI so the tightened number is committed by a person.

pub mod count;
pub mod coverage;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{RatchetError, Result};

pub use count::evaluate_count;
pub use coverage::evaluate_coverage;

/// Percentage of the budget below which a count counts as improved.
pub const COUNT_LOWER_BAND_PERCENT: u64 = 95;

/// Points above the floor a coverage percentage may rise before the floor
/// must be raised.
pub const COVERAGE_UPPER_SLACK: u64 = 3;

// ============================================================================
// Decisions
// ============================================================================

/// Outcome of evaluating one gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateDecision {
    /// No budget configured, no report, or disabled for this branch.
    Skip,
    /// Within the dead band.
    Pass,
    /// Meaningfully better than budget; budget rewritten.
    ImprovedLocal,
    /// Meaningfully better than budget in CI; the budget must be committed.
    ImprovedCi,
    /// Worse than budget.
    Regressed,
}

impl GateDecision {
    /// Whether this decision fails the build.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::ImprovedCi | Self::Regressed)
    }

    /// Severity order used to fold several decisions into one.
    fn rank(self) -> u8 {
        match self {
            Self::Skip => 0,
            Self::Pass => 1,
            Self::ImprovedLocal => 2,
            Self::ImprovedCi => 3,
            Self::Regressed => 4,
        }
    }

    /// The more severe of two decisions.
    #[must_use]
    pub fn worst(self, other: Self) -> Self {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for GateDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => write!(f, "SKIP"),
            Self::Pass => write!(f, "PASS"),
            Self::ImprovedLocal => write!(f, "IMPROVED"),
            Self::ImprovedCi => write!(f, "STALE"),
            Self::Regressed => write!(f, "REGRESSED"),
        }
    }
}

/// Which way a metric improves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Directionality {
    /// Violation counts.
    LowerIsBetter,
    /// Coverage percentages.
    HigherIsBetter,
}

/// Floor of `budget * 95 / 100` without overflow.
#[must_use]
pub fn count_lower_bound(budget: u64) -> u64 {
    budget / 100 * COUNT_LOWER_BAND_PERCENT + budget % 100 * COUNT_LOWER_BAND_PERCENT / 100
}

/// Decides a gate from the measured value and the configured budget.
///
/// Pure: the caller applies any threshold rewrite implied by
/// [`GateDecision::ImprovedLocal`].
#[must_use]
pub fn decide(direction: Directionality, actual: u64, budget: Option<u64>, ci: bool) -> GateDecision {
    let Some(budget) = budget else {
        return GateDecision::Skip;
    };

    let (regressed, improved) = match direction {
        Directionality::LowerIsBetter => (actual > budget, actual < count_lower_bound(budget)),
        Directionality::HigherIsBetter => (
            actual < budget,
            actual > budget.saturating_add(COVERAGE_UPPER_SLACK),
        ),
    };

    if regressed {
        GateDecision::Regressed
    } else if improved && ci {
        GateDecision::ImprovedCi
    } else if improved {
        GateDecision::ImprovedLocal
    } else {
        GateDecision::Pass
    }
}

// ============================================================================
// Analyzers
// ============================================================================

/// The count-based analyzers a budget can be kept for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Analyzer {
    /// javac/kotlinc warnings
    Compiler,
    Checkstyle,
    /// SpotBugs, budgeted under the historical FindBugs key
    SpotBugs,
    Detekt,
}

impl Analyzer {
    /// All count analyzers in evaluation order.
    pub const ALL: [Analyzer; 4] = [
        Analyzer::Compiler,
        Analyzer::Checkstyle,
        Analyzer::SpotBugs,
        Analyzer::Detekt,
    ];

    /// Key in `static-analysis.properties`.
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Self::Compiler => "compiler",
            Self::Checkstyle => "checkstyle",
            Self::SpotBugs => "findbugs",
            Self::Detekt => "detekt",
        }
    }

    /// Gate name used in output.
    #[must_use]
    pub fn gate_name(&self) -> &'static str {
        match self {
            Self::Compiler => "compiler-warnings",
            Self::Checkstyle => "checkstyle",
            Self::SpotBugs => "spotbugs",
            Self::Detekt => "detekt",
        }
    }

    /// What is being counted, for messages.
    #[must_use]
    pub fn violation_label(&self) -> &'static str {
        match self {
            Self::Compiler => "compiler warnings",
            Self::Checkstyle => "checkstyle errors",
            Self::SpotBugs => "findbugs errors",
            Self::Detekt => "detekt errors",
        }
    }
}

impl fmt::Display for Analyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.gate_name())
    }
}

// ============================================================================
// Context and Results
// ============================================================================

/// Inputs every gate evaluation shares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateContext {
    /// Strict mode: improvements fail instead of rewriting budgets.
    pub ci: bool,
}

impl GateContext {
    #[must_use]
    pub fn local() -> Self {
        Self { ci: false }
    }

    #[must_use]
    pub fn ci() -> Self {
        Self { ci: true }
    }
}

/// One measured value and what was decided for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricResult {
    /// Threshold key (`checkstyle`, `instruction`, ...).
    pub key: String,
    pub actual: u64,
    /// Budget before evaluation.
    pub limit: Option<u64>,
    pub decision: GateDecision,
}

/// Result of evaluating one gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateReport {
    /// Gate name, e.g. `checkstyle` or `coverage`.
    pub gate: String,
    /// Overall decision.
    pub decision: GateDecision,
    /// Per-key results; empty when skipped before measuring.
    pub metrics: Vec<MetricResult>,
    /// One-line human-readable summary.
    pub summary: String,
    /// Corrective messages, one per failing key.
    pub failures: Vec<String>,
}

impl GateReport {
    /// A gate that did not run.
    pub fn skipped(gate: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            gate: gate.into(),
            decision: GateDecision::Skip,
            metrics: Vec::new(),
            summary: reason.into(),
            failures: Vec::new(),
        }
    }

    /// Whether this report fails the build.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.decision.is_failure()
    }

    /// Converts a failing report into [`RatchetError::GateFailed`].
    ///
    /// # Errors
    ///
    /// Returns the gate failure when the decision is Regressed or
    /// Improved-CI.
    pub fn ensure_passed(self) -> Result<Self> {
        if !self.is_failure() {
            return Ok(self);
        }
        let message = if self.failures.is_empty() {
            self.summary
        } else {
            self.failures.join("\n")
        };
        Err(RatchetError::gate_failed(self.gate, message))
    }
}
