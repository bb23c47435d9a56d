//! The process-wide usage ledger.

use crate::LedgerError;
use crate::model::{LedgerRecord, LedgerSnapshot, TokenUsage};
use quotarelay_core::Clock;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Lifetime and per-UTC-day token counters, persisted after every change.
///
/// The rollover check, the increment, and the write-through all happen under
/// one lock, so concurrent writers never lose updates or reset twice.
pub struct UsageLedger {
    record: Mutex<LedgerRecord>,
    path: Option<PathBuf>,
    clock: Arc<dyn Clock>,
}

impl UsageLedger {
    /// Open a file-backed ledger.
    ///
    /// A missing, unreadable, or corrupt file yields an empty record; the
    /// next successful write replaces it.
    pub fn open(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        let path = path.into();
        let record = match load_record(&path) {
            Ok(Some(record)) => {
                debug!(path = %path.display(), "Loaded usage ledger");
                record
            }
            Ok(None) => {
                info!(path = %path.display(), "No usage ledger yet, starting empty");
                LedgerRecord::default()
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Unreadable usage ledger, starting empty"
                );
                LedgerRecord::default()
            }
        };

        Self {
            record: Mutex::new(record),
            path: Some(path),
            clock,
        }
    }

    /// A ledger that never touches disk.
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self {
            record: Mutex::new(LedgerRecord::default()),
            path: None,
            clock,
        }
    }

    /// Add one request's usage and return the updated snapshot.
    pub fn record_usage(&self, usage: TokenUsage) -> LedgerSnapshot {
        let today = self.clock.today();
        let mut record = self.record.lock().unwrap_or_else(|e| e.into_inner());
        if record.roll_over(today) {
            info!(date = %today, "Daily token counters reset");
        }
        record.add(usage);
        self.persist(&record);
        record.snapshot(today)
    }

    /// Current counters, after applying any pending daily rollover.
    pub fn current_stats(&self) -> LedgerSnapshot {
        let today = self.clock.today();
        let mut record = self.record.lock().unwrap_or_else(|e| e.into_inner());
        if record.roll_over(today) {
            info!(date = %today, "Daily token counters reset");
            self.persist(&record);
        }
        record.snapshot(today)
    }

    fn persist(&self, record: &LedgerRecord) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(e) = write_atomic(path, record) {
            warn!(path = %path.display(), error = %e, "Failed to persist usage ledger");
        }
    }
}

fn load_record(path: &Path) -> Result<Option<LedgerRecord>, LedgerError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&content)?;
    Ok(Some(LedgerRecord::from_value(&value)))
}

/// Write to a sibling temp file, then rename over the target.
fn write_atomic(path: &Path, record: &LedgerRecord) -> Result<(), LedgerError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(record)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
