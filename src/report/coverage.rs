//! JaCoCo coverage report counters.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::xml::{attribute_value, visit_elements};
use crate::error::{RatchetError, Result};

/// Counter types present in the report that are never gated.
pub const EXCLUDED_COVERAGE_TYPES: &[&str] = &["line", "complexity"];

/// Covered/missed totals for one coverage type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageCounter {
    pub covered: u64,
    pub missed: u64,
}

impl CoverageCounter {
    #[must_use]
    pub fn new(covered: u64, missed: u64) -> Self {
        Self { covered, missed }
    }

    /// Coverage percentage truncated toward zero.
    ///
    /// A counter with nothing to cover yields 0.
    #[must_use]
    pub fn percent(&self) -> u64 {
        let covered = u128::from(self.covered);
        let total = covered + u128::from(self.missed);
        if total == 0 {
            return 0;
        }
        // covered <= total, so the quotient never exceeds 100
        (100 * covered / total) as u64
    }
}

/// Reads the report-level `counter` elements of a JaCoCo XML report.
///
/// Only counters that are direct children of the root `report` element are
/// read; the per-package and per-class counters nested below are ignored.
/// Types are lowercased and `line`/`complexity` are dropped.
///
/// # Errors
///
/// Returns [`RatchetError::Report`] if the file is missing, malformed, or a
/// counter lacks a numeric `covered`/`missed` attribute.
pub fn extract_coverage_counters(report: &Path) -> Result<BTreeMap<String, CoverageCounter>> {
    let mut counters: BTreeMap<String, CoverageCounter> = BTreeMap::new();

    visit_elements(report, |tag, depth| {
        if depth != 1 || tag.name().as_ref() != b"counter" {
            return Ok(());
        }

        let kind = attribute_value(tag, b"type")
            .ok_or_else(|| RatchetError::report(report, "counter without type attribute"))?
            .to_lowercase();
        if EXCLUDED_COVERAGE_TYPES.contains(&kind.as_str()) {
            return Ok(());
        }

        let covered = numeric_attribute(report, tag, b"covered", &kind)?;
        let missed = numeric_attribute(report, tag, b"missed", &kind)?;

        let entry = counters.entry(kind.clone()).or_default();
        match (entry.covered.checked_add(covered), entry.missed.checked_add(missed)) {
            (Some(c), Some(m)) => {
                entry.covered = c;
                entry.missed = m;
                Ok(())
            }
            _ => Err(RatchetError::report(
                report,
                format!("counter type={} overflows when merged", kind),
            )),
        }
    })?;

    Ok(counters)
}

fn numeric_attribute(
    report: &Path,
    tag: &quick_xml::events::BytesStart<'_>,
    name: &[u8],
    kind: &str,
) -> Result<u64> {
    let attr = String::from_utf8_lossy(name).into_owned();
    attribute_value(tag, name)
        .ok_or_else(|| RatchetError::report(report, format!("counter type={} has no {}", kind, attr)))?
        .trim()
        .parse::<u64>()
        .map_err(|e| {
            RatchetError::report(
                report,
                format!("counter type={} has invalid {}: {}", kind, attr, e),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const JACOCO_REPORT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<!DOCTYPE report PUBLIC "-//JACOCO//DTD Report 1.1//EN" "report.dtd">
<report name="sample">
  <sessioninfo id="host-1" start="1" dump="2"/>
  <package name="sample">
    <class name="sample/HelloWorld" sourcefilename="HelloWorld.java">
      <method name="main" desc="([Ljava/lang/String;)V" line="5">
        <counter type="INSTRUCTION" missed="0" covered="4"/>
      </method>
      <counter type="INSTRUCTION" missed="3" covered="4"/>
    </class>
    <counter type="INSTRUCTION" missed="3" covered="4"/>
  </package>
  <counter type="INSTRUCTION" missed="43" covered="57"/>
  <counter type="BRANCH" missed="2" covered="2"/>
  <counter type="LINE" missed="1" covered="2"/>
  <counter type="COMPLEXITY" missed="2" covered="1"/>
  <counter type="METHOD" missed="1" covered="1"/>
  <counter type="CLASS" missed="0" covered="1"/>
</report>"#;

    fn write(dir: &TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("jacocoAggReport.xml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_percent_truncates() {
        assert_eq!(CoverageCounter::new(57, 43).percent(), 57);
        assert_eq!(CoverageCounter::new(2, 1).percent(), 66);
        assert_eq!(CoverageCounter::new(1, 0).percent(), 100);
        assert_eq!(CoverageCounter::new(0, 0).percent(), 0);
    }

    #[test]
    fn test_percent_of_huge_counters() {
        assert_eq!(CoverageCounter::new(200_000_000_000_000_000, 1).percent(), 99);
        assert_eq!(CoverageCounter::new(u64::MAX, u64::MAX).percent(), 50);
        assert_eq!(CoverageCounter::new(u64::MAX, 0).percent(), 100);
    }

    #[test]
    fn test_huge_counter_in_report() {
        let temp = TempDir::new().unwrap();
        let report = write(
            &temp,
            r#"<report name="x"><counter type="CLASS" missed="1" covered="200000000000000000"/></report>"#,
        );
        let counters = extract_coverage_counters(&report).unwrap();
        assert_eq!(counters["class"].percent(), 99);
    }

    #[test]
    fn test_duplicate_counters_overflowing_is_an_error() {
        let temp = TempDir::new().unwrap();
        let report = write(
            &temp,
            &format!(
                r#"<report name="x"><counter type="CLASS" missed="0" covered="{max}"/><counter type="CLASS" missed="0" covered="1"/></report>"#,
                max = u64::MAX
            ),
        );
        let err = extract_coverage_counters(&report).unwrap_err();
        assert!(err.to_string().contains("overflows"));
    }

    #[test]
    fn test_extracts_root_counters_only() {
        let temp = TempDir::new().unwrap();
        let counters = extract_coverage_counters(&write(&temp, JACOCO_REPORT)).unwrap();

        assert_eq!(counters.len(), 4);
        assert_eq!(counters["instruction"], CoverageCounter::new(57, 43));
        assert_eq!(counters["branch"], CoverageCounter::new(2, 2));
        assert_eq!(counters["method"], CoverageCounter::new(1, 1));
        assert_eq!(counters["class"], CoverageCounter::new(1, 0));
    }

    #[test]
    fn test_excludes_line_and_complexity() {
        let temp = TempDir::new().unwrap();
        let counters = extract_coverage_counters(&write(&temp, JACOCO_REPORT)).unwrap();
        assert!(!counters.contains_key("line"));
        assert!(!counters.contains_key("complexity"));
    }

    #[test]
    fn test_counter_with_invalid_number_is_an_error() {
        let temp = TempDir::new().unwrap();
        let report = write(
            &temp,
            r#"<report name="x"><counter type="CLASS" missed="zero" covered="1"/></report>"#,
        );
        let err = extract_coverage_counters(&report).unwrap_err();
        assert!(err.to_string().contains("type=class"));
    }

    #[test]
    fn test_unclosed_report_is_an_error() {
        let temp = TempDir::new().unwrap();
        let report = write(&temp, r#"<report name="x"><counter type="CLASS" missed="0" covered="1"/>"#);
        assert!(extract_coverage_counters(&report).is_err());
    }
}
