//! Extraction of metrics from analyzer reports.
//!
//! Every function here only reads the report file. A missing report is a
//! normal condition (the module had no sources, the analyzer was switched
//! off) and must be detected by the caller with [`locate`] before parsing;
//! the parsers themselves treat a missing or malformed file as an error so
//! a broken analyzer never reads as "zero violations".
//!
//! | Report | Function | Metric |
//! |--------|----------|--------|
//! | SpotBugs / FindBugs XML | [`count_bug_instances`] | `BugInstance` elements |
//! | Checkstyle / detekt XML | [`count_style_errors`] | `error` elements |
//! | Compiler log | [`count_compiler_warnings`] | lines containing `" warning: "` |
//! | JaCoCo XML | [`extract_coverage_counters`] | root `counter` elements |

pub mod coverage;
mod xml;

use std::fs;
use std::path::Path;

use crate::error::{RatchetError, Result};

pub use coverage::{extract_coverage_counters, CoverageCounter, EXCLUDED_COVERAGE_TYPES};

/// Marker identifying a warning line in javac/kotlinc output.
pub const COMPILER_WARNING_MARKER: &str = " warning: ";

/// Element counted in bug-finder reports.
pub const BUG_INSTANCE_ELEMENT: &str = "BugInstance";

/// Element counted in checkstyle-format reports.
pub const STYLE_ERROR_ELEMENT: &str = "error";

/// Returns the report path if it exists as a regular file.
#[must_use]
pub fn locate(path: &Path) -> Option<&Path> {
    path.is_file().then_some(path)
}

/// Counts `BugInstance` records in a SpotBugs/FindBugs XML report.
///
/// # Errors
///
/// Returns [`RatchetError::Report`] if the file is missing or malformed.
pub fn count_bug_instances(report: &Path) -> Result<u64> {
    xml::count_elements(report, BUG_INSTANCE_ELEMENT)
}

/// Counts `error` records in a checkstyle-format XML report.
///
/// # Errors
///
/// Returns [`RatchetError::Report`] if the file is missing or malformed.
pub fn count_style_errors(report: &Path) -> Result<u64> {
    xml::count_elements(report, STYLE_ERROR_ELEMENT)
}

/// Counts warning lines in a captured compiler log.
///
/// # Errors
///
/// Returns [`RatchetError::Report`] if the file cannot be read.
pub fn count_compiler_warnings(log: &Path) -> Result<u64> {
    let bytes = fs::read(log).map_err(|e| RatchetError::report(log, e.to_string()))?;
    Ok(count_warning_lines(&String::from_utf8_lossy(&bytes)))
}

/// Counts lines containing [`COMPILER_WARNING_MARKER`].
#[must_use]
pub fn count_warning_lines(output: &str) -> u64 {
    output
        .lines()
        .filter(|line| line.contains(COMPILER_WARNING_MARKER))
        .count() as u64
}
