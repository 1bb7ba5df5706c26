//! Project configuration for Ratchet.
//!
//! Settings live in an optional `ratchet.toml` at the project root. Every
//! field has a default matching the conventional Gradle build layout, so
//! most projects need no file at all.
//!
//! ```toml
//! [thresholds]
//! static_analysis = "config/static-analysis.properties"
//!
//! [analyzers]
//! detekt_enabled = false
//!
//! [incremental]
//! enabled = true
//! include = ["**/*.java", "**/*.kt"]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RatchetError, Result};
use crate::gate::Analyzer;
use crate::thresholds::{COVERAGE_FILE, STATIC_ANALYSIS_FILE};

/// Name of the configuration file looked up in the project directory.
pub const CONFIG_FILE: &str = "ratchet.toml";

/// Test-runner parallel modes accepted by `[test]` and `[component_test]`.
pub const PARALLEL_MODES: &[&str] = &["none", "methods", "tests", "classes", "instances"];

fn default_true() -> bool {
    true
}

// ============================================================================
// Sections
// ============================================================================

/// Where the budget files live, relative to the project directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    pub static_analysis: PathBuf,
    pub coverage: PathBuf,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            static_analysis: PathBuf::from(STATIC_ANALYSIS_FILE),
            coverage: PathBuf::from(COVERAGE_FILE),
        }
    }
}

/// Default report locations, relative to the project directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportsConfig {
    /// Captured javac/kotlinc output
    pub compiler_log: PathBuf,
    pub checkstyle: PathBuf,
    pub spotbugs: PathBuf,
    pub detekt: PathBuf,
    /// Aggregated JaCoCo XML report
    pub coverage: PathBuf,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            compiler_log: PathBuf::from("build/compiler-output.log"),
            checkstyle: PathBuf::from("build/checkstyleReports/main.xml"),
            spotbugs: PathBuf::from("build/spotbugsReports/main.xml"),
            detekt: PathBuf::from("build/reports/detekt/detekt.xml"),
            coverage: PathBuf::from("build/reports/jacoco/jacocoAggReport/jacocoAggReport.xml"),
        }
    }
}

impl ReportsConfig {
    /// Configured report path for a count analyzer.
    #[must_use]
    pub fn for_analyzer(&self, analyzer: Analyzer) -> &Path {
        match analyzer {
            Analyzer::Compiler => &self.compiler_log,
            Analyzer::Checkstyle => &self.checkstyle,
            Analyzer::SpotBugs => &self.spotbugs,
            Analyzer::Detekt => &self.detekt,
        }
    }
}

/// Analyzer on/off switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzersConfig {
    #[serde(default = "default_true")]
    pub compiler_warnings_enabled: bool,

    #[serde(default = "default_true")]
    pub checkstyle_enabled: bool,

    #[serde(default = "default_true")]
    pub spotbugs_enabled: bool,

    #[serde(default = "default_true")]
    pub detekt_enabled: bool,

    /// Skip count gates on stable branches; they were already enforced on
    /// the feature branch that merged in.
    #[serde(default = "default_true")]
    pub analyse_development_branches_only: bool,
}

impl Default for AnalyzersConfig {
    fn default() -> Self {
        Self {
            compiler_warnings_enabled: true,
            checkstyle_enabled: true,
            spotbugs_enabled: true,
            detekt_enabled: true,
            analyse_development_branches_only: true,
        }
    }
}

impl AnalyzersConfig {
    /// Whether the switch for `analyzer` is on.
    #[must_use]
    pub fn is_enabled(&self, analyzer: Analyzer) -> bool {
        match analyzer {
            Analyzer::Compiler => self.compiler_warnings_enabled,
            Analyzer::Checkstyle => self.checkstyle_enabled,
            Analyzer::SpotBugs => self.spotbugs_enabled,
            Analyzer::Detekt => self.detekt_enabled,
        }
    }
}

/// Incremental-analysis settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncrementalConfig {
    pub enabled: bool,
    /// Branches whose remote-tracking refs are candidate ancestors
    pub stable_branches: Vec<String>,
    /// Glob filter on changed paths; empty keeps everything
    pub include: Vec<String>,
}

impl Default for IncrementalConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            stable_branches: vec!["master".to_string(), "dev".to_string()],
            include: Vec::new(),
        }
    }
}

/// Test-runner settings handed through to the build unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestRunnerConfig {
    pub thread_count: u32,
    /// One of [`PARALLEL_MODES`]
    pub parallel: String,
    /// Fully-qualified listener class names
    pub listeners: Vec<String>,
}

impl Default for TestRunnerConfig {
    fn default() -> Self {
        Self {
            thread_count: 8,
            parallel: "classes".to_string(),
            listeners: Vec::new(),
        }
    }
}

impl TestRunnerConfig {
    fn validate(&self, section: &str) -> Result<()> {
        if self.thread_count == 0 {
            return Err(RatchetError::InvalidConfig {
                field: format!("{}.thread_count", section),
                reason: "must be at least 1".to_string(),
            });
        }
        if !PARALLEL_MODES.contains(&self.parallel.as_str()) {
            return Err(RatchetError::InvalidConfig {
                field: format!("{}.parallel", section),
                reason: format!(
                    "unknown mode '{}'. Valid options: {}",
                    self.parallel,
                    PARALLEL_MODES.join(", ")
                ),
            });
        }
        Ok(())
    }
}

// ============================================================================
// ProjectConfig
// ============================================================================

/// Project configuration loaded from `ratchet.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub thresholds: ThresholdsConfig,

    #[serde(default)]
    pub reports: ReportsConfig,

    #[serde(default)]
    pub analyzers: AnalyzersConfig,

    #[serde(default)]
    pub incremental: IncrementalConfig,

    #[serde(default)]
    pub test: TestRunnerConfig,

    #[serde(default)]
    pub component_test: TestRunnerConfig,
}

impl ProjectConfig {
    /// Load configuration from a project directory. A missing file yields
    /// the defaults.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be read, is not
    /// valid TOML, or fails [`validate`](Self::validate).
    pub fn load(project_dir: &Path) -> Result<Self> {
        let path = Self::config_path(project_dir);
        if !path.is_file() {
            debug!("No {} in {}, using defaults", CONFIG_FILE, project_dir.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| RatchetError::config_with_path(e.to_string(), path.clone()))?;
        let config: ProjectConfig = toml::from_str(&content)
            .map_err(|e| RatchetError::config_with_path(e.to_string(), path.clone()))?;
        config.validate()?;
        Ok(config)
    }

    /// Get the `ratchet.toml` path for a project
    #[must_use]
    pub fn config_path(project_dir: &Path) -> PathBuf {
        project_dir.join(CONFIG_FILE)
    }

    /// Checks values serde cannot.
    ///
    /// # Errors
    ///
    /// Returns [`RatchetError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        self.test.validate("test")?;
        self.component_test.validate("component_test")?;

        for pattern in &self.incremental.include {
            globset::Glob::new(pattern).map_err(|e| RatchetError::InvalidConfig {
                field: "incremental.include".to_string(),
                reason: e.to_string(),
            })?;
        }

        Ok(())
    }

    /// Absolute `static-analysis.properties` path.
    #[must_use]
    pub fn static_analysis_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.thresholds.static_analysis)
    }

    /// Absolute `coverage.properties` path.
    #[must_use]
    pub fn coverage_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.thresholds.coverage)
    }

    /// Absolute default report path for a count analyzer.
    #[must_use]
    pub fn report_path(&self, project_dir: &Path, analyzer: Analyzer) -> PathBuf {
        project_dir.join(self.reports.for_analyzer(analyzer))
    }

    /// Absolute default coverage report path.
    #[must_use]
    pub fn coverage_report_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.reports.coverage)
    }

    /// Renders the effective configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| RatchetError::config(e.to_string()))
    }
}
