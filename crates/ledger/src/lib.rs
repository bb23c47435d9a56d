//! Token usage accounting and quota policy for QuotaRelay.
//!
//! The ledger keeps lifetime and per-UTC-day token counters persisted to a
//! JSON file. The policy turns the day's usage into a model choice, a
//! warning, or a refusal.

pub mod ledger;
pub mod model;
pub mod policy;

pub use ledger::UsageLedger;
pub use model::{LedgerRecord, LedgerSnapshot, TokenCounts, TokenUsage};
pub use policy::{ModelTier, PolicyDecision, QUOTA_EXCEEDED_MESSAGE, QuotaPolicy};

/// Errors from ledger persistence.
///
/// These never reach callers of `UsageLedger`; they are logged and the
/// ledger keeps serving from memory.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
