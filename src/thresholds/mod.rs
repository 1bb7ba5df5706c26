//! Persistent static-analysis budgets.
//!
//! Budgets live in flat `key=value` properties files checked into the
//! project (`static-analysis.properties`, `coverage.properties`). The file
//! is the single source of truth: a missing file or key means "no gate",
//! a malformed line is a hard error.
//!
//! # Example
//!
//! ```rust,ignore
//! use ratchet::thresholds::ThresholdStore;
//!
//! if let Some(mut store) = ThresholdStore::load("static-analysis.properties")? {
//!     if let Some(limit) = store.get("checkstyle") {
//!         store.set("checkstyle", limit - 1);
//!         store.persist()?;
//!     }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{RatchetError, Result};

/// Default file holding count budgets.
pub const STATIC_ANALYSIS_FILE: &str = "static-analysis.properties";

/// Default file holding coverage floors.
pub const COVERAGE_FILE: &str = "coverage.properties";

/// Temporary file suffix for atomic writes.
const TMP_SUFFIX: &str = ".tmp";

/// A ledger of per-analyzer budgets backed by one properties file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdStore {
    path: PathBuf,
    values: BTreeMap<String, u64>,
}

impl ThresholdStore {
    /// Creates an empty store that will persist to `path`.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            values: BTreeMap::new(),
        }
    }

    /// Loads the store from disk.
    ///
    /// Returns `Ok(None)` and logs a warning when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`RatchetError::InvalidThresholds`] for any malformed line and
    /// an IO error if the file exists but cannot be read.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.is_file() {
            warn!("File not found: name={}", display_name(path));
            return Ok(None);
        }

        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("File not found: name={}", display_name(path));
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        Self::parse(path, &content).map(Some)
    }

    /// Parses properties content without touching the file system.
    ///
    /// # Errors
    ///
    /// Returns [`RatchetError::InvalidThresholds`] naming the first bad line.
    pub fn parse(path: impl AsRef<Path>, content: &str) -> Result<Self> {
        let mut store = Self::new(path);

        for (index, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(store.malformed(index, "expected key=value"));
            };
            let key = key.trim();
            if key.is_empty() {
                return Err(store.malformed(index, "empty key"));
            }

            let value = parse_budget(value.trim())
                .ok_or_else(|| store.malformed(index, format!("invalid value for '{}'", key)))?;

            if store.values.insert(key.to_string(), value).is_some() {
                return Err(store.malformed(index, format!("duplicate key '{}'", key)));
            }
        }

        Ok(store)
    }

    /// Returns the budget for `key`, if configured.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<u64> {
        self.values.get(key).copied()
    }

    /// Sets the budget for `key` in memory. Call [`persist`](Self::persist)
    /// to make it durable.
    pub fn set(&mut self, key: impl Into<String>, value: u64) {
        self.values.insert(key.into(), value);
    }

    /// Iterates over all budgets in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of configured budgets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no budget is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Short file name used in log and error messages.
    #[must_use]
    pub fn file_name(&self) -> String {
        display_name(&self.path)
    }

    /// Returns the path to the temporary file used while persisting.
    #[must_use]
    pub fn tmp_file_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(TMP_SUFFIX);
        PathBuf::from(name)
    }

    /// Renders the store in properties format, one `key=value` per line.
    #[must_use]
    pub fn render(&self) -> String {
        self.values
            .iter()
            .map(|(k, v)| format!("{}={}\n", k, v))
            .collect()
    }

    /// Rewrites the whole file atomically.
    ///
    /// Content goes to a sibling temporary file which is synced and then
    /// renamed over the target, so a reader sees either the old or the new
    /// file, never a partial one.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the temporary file cannot be written or renamed.
    pub fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.tmp_file_path();
        if let Err(e) = self.write_and_rename(&tmp_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        sync_parent_dir(&self.path)?;
        debug!("Persisted {} budgets to {}", self.len(), self.path.display());

        Ok(())
    }

    fn write_and_rename(&self, tmp_path: &Path) -> std::io::Result<()> {
        let mut tmp_file = File::create(tmp_path)?;
        tmp_file.write_all(self.render().as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);
        fs::rename(tmp_path, &self.path)
    }

    fn malformed(&self, index: usize, reason: impl Into<String>) -> RatchetError {
        RatchetError::InvalidThresholds {
            path: self.path.clone(),
            line: index + 1,
            reason: reason.into(),
        }
    }
}

/// Parses a non-negative budget. Decimal values are truncated toward zero;
/// anything above `u64::MAX` is rejected.
fn parse_budget(value: &str) -> Option<u64> {
    let (whole, fraction) = value.split_once('.').unwrap_or((value, ""));
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !digits(whole) || !digits(fraction) || (whole.is_empty() && fraction.is_empty()) {
        return None;
    }
    if whole.is_empty() {
        return Some(0);
    }
    whole.parse::<u64>().ok()
}

/// Flushes the rename itself by syncing the containing directory.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> std::io::Result<()> {
    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent,
        None => Path::new("."),
    };
    File::open(parent)?.sync_all()
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
