//! Branch-aware artifact versions.

use super::BranchClassification;

/// Maven-style marker for unreleased builds.
pub const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";

/// Derives the artifact version for the current checkout.
///
/// Stable branches publish `base` unchanged. Development branches get a
/// branch-unique snapshot so parallel feature builds never overwrite each
/// other: `1.4.0-SNAPSHOT` on `feature/ABC-1` becomes
/// `1.4.0-feature-ABC-1-SNAPSHOT`.
#[must_use]
pub fn derive_version(base: &str, classification: &BranchClassification) -> String {
    if classification.is_stable() {
        return base.to_string();
    }
    let release = base.strip_suffix(SNAPSHOT_SUFFIX).unwrap_or(base);
    format!(
        "{}-{}{}",
        release,
        classification.sanitized_suffix(),
        SNAPSHOT_SUFFIX
    )
}
