//! The gate operations exposed to the build.
//!
//! Each check runs the same pipeline:
//!
//! 1. analyzer switch and budget lookup (no budget → Skip)
//! 2. branch gating (count gates only)
//! 3. report lookup (no report → Skip)
//! 4. report parsing
//! 5. gate evaluation, rewriting the budget file in local mode
//!
//! The repository is consulted only at step 2, so a project without
//! budgets never needs one. The branch is classified at most once per
//! [`Checker`].
//!
//! # Example
//!
//! ```rust,ignore
//! use ratchet::checks::{Checker, Project};
//! use ratchet::gate::GateContext;
//! use ratchet::git::RepositoryInspector;
//!
//! let project = Project::load(".")?;
//! let repo = RepositoryInspector::new(project.dir());
//! let checker = Checker::new(&project, &repo, GateContext::ci());
//! for outcome in checker.check_all() {
//!     println!("{}: {:?}", outcome.gate, outcome.result.map(|r| r.decision));
//! }
//! ```

use std::cell::OnceCell;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::config::ProjectConfig;
use crate::error::Result;
use crate::gate::coverage::COVERAGE_GATE;
use crate::gate::{evaluate_count, evaluate_coverage, Analyzer, GateContext, GateReport};
use crate::git::{BranchClassification, RepositoryQueries};
use crate::report;
use crate::thresholds::ThresholdStore;

/// A project directory with its effective configuration.
#[derive(Debug, Clone)]
pub struct Project {
    dir: PathBuf,
    config: ProjectConfig,
}

impl Project {
    /// Loads `ratchet.toml` (or defaults) from `dir`.
    ///
    /// # Errors
    ///
    /// Propagates [`ProjectConfig::load`] errors.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let config = ProjectConfig::load(&dir)?;
        Ok(Self { dir, config })
    }

    #[must_use]
    pub fn new(dir: impl AsRef<Path>, config: ProjectConfig) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            config,
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Resolves a user-supplied path against the project directory.
    fn resolve(&self, path: &Path) -> PathBuf {
        self.dir.join(path)
    }
}

/// Result of one gate inside [`Checker::check_all`].
#[derive(Debug)]
pub struct CheckOutcome {
    pub gate: String,
    pub result: Result<GateReport>,
}

impl CheckOutcome {
    /// Whether this outcome fails the build.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.result.as_ref().map_or(true, GateReport::is_failure)
    }
}

/// Runs gates for one project against one repository.
pub struct Checker<'a, R: RepositoryQueries + ?Sized> {
    project: &'a Project,
    repo: &'a R,
    ctx: GateContext,
    classification: OnceCell<BranchClassification>,
}

impl<'a, R: RepositoryQueries + ?Sized> Checker<'a, R> {
    #[must_use]
    pub fn new(project: &'a Project, repo: &'a R, ctx: GateContext) -> Self {
        Self {
            project,
            repo,
            ctx,
            classification: OnceCell::new(),
        }
    }

    /// Branch classification, computed on first use.
    ///
    /// # Errors
    ///
    /// Propagates repository errors; they are not cached.
    pub fn classification(&self) -> Result<&BranchClassification> {
        if let Some(c) = self.classification.get() {
            return Ok(c);
        }
        let computed = self.repo.classify()?;
        Ok(self.classification.get_or_init(|| computed))
    }

    /// Evaluates a count gate. `report` overrides the configured location.
    ///
    /// # Errors
    ///
    /// Returns malformed-threshold, repository and report-parse errors, and
    /// IO errors from persisting an improved budget. Regressions are
    /// reported in the returned [`GateReport`].
    pub fn check_count(&self, analyzer: Analyzer, report: Option<&Path>) -> Result<GateReport> {
        let config = self.project.config();
        let gate = analyzer.gate_name();

        if !config.analyzers.is_enabled(analyzer) {
            return Ok(skip(gate, format!("{} is disabled", gate)));
        }

        let thresholds = config.static_analysis_path(self.project.dir());
        let Some(mut store) = ThresholdStore::load(&thresholds)? else {
            return Ok(skip(
                gate,
                format!("Have not found {}, skipping check", display(&thresholds)),
            ));
        };
        if store.get(analyzer.key()).is_none() {
            return Ok(skip(
                gate,
                format!("No '{}' limit in {}, skipping check", analyzer.key(), store.file_name()),
            ));
        }

        if config.analyzers.analyse_development_branches_only {
            let classification = self.classification()?;
            if classification.is_stable() {
                return Ok(skip(
                    gate,
                    format!(
                        "{} skipped on stable branch {} ({})",
                        gate, classification.branch, classification.kind
                    ),
                ));
            }
        }

        let report_path = match report {
            Some(path) => self.project.resolve(path),
            None => config.report_path(self.project.dir(), analyzer),
        };
        let Some(found) = report::locate(&report_path) else {
            return Ok(skip(
                gate,
                format!("Report not found: {}, skipping check", report_path.display()),
            ));
        };

        let actual = match analyzer {
            Analyzer::Compiler => report::count_compiler_warnings(found)?,
            Analyzer::SpotBugs => report::count_bug_instances(found)?,
            Analyzer::Checkstyle | Analyzer::Detekt => report::count_style_errors(found)?,
        };

        evaluate_count(analyzer, actual, &mut store, self.ctx)
    }

    /// Evaluates the coverage gate. Never branch-gated.
    ///
    /// # Errors
    ///
    /// Returns [`RatchetError::MissingCoverageThreshold`](crate::error::RatchetError::MissingCoverageThreshold)
    /// for reported types without a floor, plus threshold, report and IO
    /// errors.
    pub fn check_coverage(&self, report: Option<&Path>) -> Result<GateReport> {
        let config = self.project.config();

        let thresholds = config.coverage_path(self.project.dir());
        let Some(mut store) = ThresholdStore::load(&thresholds)? else {
            return Ok(skip(
                COVERAGE_GATE,
                format!("Have not found {}, skipping check.", display(&thresholds)),
            ));
        };

        let report_path = match report {
            Some(path) => self.project.resolve(path),
            None => config.coverage_report_path(self.project.dir()),
        };
        let Some(found) = report::locate(&report_path) else {
            return Ok(skip(
                COVERAGE_GATE,
                format!("Report not found: {}, skipping check", report_path.display()),
            ));
        };

        let counters = report::extract_coverage_counters(found)?;
        evaluate_coverage(&counters, &mut store, self.ctx)
    }

    /// Runs every gate with configured report locations, in a fixed order,
    /// without stopping at the first failure.
    pub fn check_all(&self) -> Vec<CheckOutcome> {
        let mut outcomes: Vec<CheckOutcome> = Analyzer::ALL
            .iter()
            .map(|&analyzer| CheckOutcome {
                gate: analyzer.gate_name().to_string(),
                result: self.check_count(analyzer, None),
            })
            .collect();

        outcomes.push(CheckOutcome {
            gate: COVERAGE_GATE.to_string(),
            result: self.check_coverage(None),
        });

        outcomes
    }
}

/// Compiler-warnings gate (`compiler` key, `" warning: "` lines).
///
/// # Errors
///
/// See [`Checker::check_count`].
pub fn check_compiler_warnings<R: RepositoryQueries + ?Sized>(
    project: &Project,
    repo: &R,
    ctx: GateContext,
    log: Option<&Path>,
) -> Result<GateReport> {
    Checker::new(project, repo, ctx).check_count(Analyzer::Compiler, log)
}

/// Style gate (`checkstyle` key, `error` elements).
///
/// # Errors
///
/// See [`Checker::check_count`].
pub fn check_style_violations<R: RepositoryQueries + ?Sized>(
    project: &Project,
    repo: &R,
    ctx: GateContext,
    report: Option<&Path>,
) -> Result<GateReport> {
    Checker::new(project, repo, ctx).check_count(Analyzer::Checkstyle, report)
}

/// Bug-finder gate (`findbugs` key, `BugInstance` elements).
///
/// # Errors
///
/// See [`Checker::check_count`].
pub fn check_bug_finder_report<R: RepositoryQueries + ?Sized>(
    project: &Project,
    repo: &R,
    ctx: GateContext,
    report: Option<&Path>,
) -> Result<GateReport> {
    Checker::new(project, repo, ctx).check_count(Analyzer::SpotBugs, report)
}

/// Kotlin analyzer gate (`detekt` key, `error` elements).
///
/// # Errors
///
/// See [`Checker::check_count`].
pub fn check_detekt_report<R: RepositoryQueries + ?Sized>(
    project: &Project,
    repo: &R,
    ctx: GateContext,
    report: Option<&Path>,
) -> Result<GateReport> {
    Checker::new(project, repo, ctx).check_count(Analyzer::Detekt, report)
}

/// Coverage gate.
///
/// # Errors
///
/// See [`Checker::check_coverage`].
pub fn check_coverage<R: RepositoryQueries + ?Sized>(
    project: &Project,
    repo: &R,
    ctx: GateContext,
    report: Option<&Path>,
) -> Result<GateReport> {
    Checker::new(project, repo, ctx).check_coverage(report)
}

fn skip(gate: &str, reason: String) -> GateReport {
    warn!("{}", reason);
    GateReport::skipped(gate, reason)
}

fn display(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
