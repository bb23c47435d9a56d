//! Ledger data types: reported usage, the persisted record, and snapshots.

use chrono::NaiveDate;
use quotarelay_core::Usage;
use serde::{Deserialize, Serialize};

/// Token counts for a single completed request, normalized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt: u64,
    pub completion: u64,
    pub total: u64,
}

impl TokenUsage {
    pub fn new(prompt: u64, completion: u64, total: u64) -> Self {
        Self {
            prompt,
            completion,
            total,
        }
    }

    /// Normalize provider-reported counts.
    ///
    /// Negative values clamp to zero, missing sub-counts become zero, and a
    /// missing total becomes `prompt + completion`.
    pub fn from_reported(
        prompt: Option<i64>,
        completion: Option<i64>,
        total: Option<i64>,
    ) -> Self {
        let clamp = |v: Option<i64>| v.map_or(0, |n| n.max(0) as u64);
        let prompt_n = clamp(prompt);
        let completion_n = clamp(completion);
        let total_n = match total {
            Some(t) => t.max(0) as u64,
            None => prompt_n.saturating_add(completion_n),
        };
        Self::new(prompt_n, completion_n, total_n)
    }
}

impl From<&Usage> for TokenUsage {
    fn from(usage: &Usage) -> Self {
        Self::from_reported(
            usage.prompt_tokens,
            usage.completion_tokens,
            usage.total_tokens,
        )
    }
}

impl From<Option<&Usage>> for TokenUsage {
    fn from(usage: Option<&Usage>) -> Self {
        usage.map(TokenUsage::from).unwrap_or_default()
    }
}

/// A prompt/completion/total triple.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCounts {
    pub prompt: u64,
    pub completion: u64,
    pub total: u64,
}

/// The on-disk ledger layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub total_prompt: u64,
    pub total_completion: u64,
    pub total_tokens: u64,
    pub daily_prompt: u64,
    pub daily_completion: u64,
    pub daily_tokens: u64,
    /// `YYYY-MM-DD`, empty before first use.
    pub last_reset_date: String,
}

impl LedgerRecord {
    /// Build a record from arbitrary JSON, field by field.
    ///
    /// Missing or mistyped fields become zero/empty; negatives clamp to zero.
    pub fn from_value(value: &serde_json::Value) -> Self {
        let count = |key: &str| -> u64 {
            match value.get(key) {
                None | Some(serde_json::Value::Null) => 0,
                Some(v) => match v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)) {
                    Some(n) => n.max(0) as u64,
                    None => {
                        tracing::warn!(field = key, value = %v, "Malformed ledger field, using 0");
                        0
                    }
                },
            }
        };

        Self {
            total_prompt: count("total_prompt"),
            total_completion: count("total_completion"),
            total_tokens: count("total_tokens"),
            daily_prompt: count("daily_prompt"),
            daily_completion: count("daily_completion"),
            daily_tokens: count("daily_tokens"),
            last_reset_date: value
                .get("last_reset_date")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
        }
    }

    /// Zero the daily counters if `today` differs from the stored date.
    ///
    /// Returns whether a reset happened.
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        let today = today.format("%Y-%m-%d").to_string();
        if self.last_reset_date == today {
            return false;
        }
        self.daily_prompt = 0;
        self.daily_completion = 0;
        self.daily_tokens = 0;
        self.last_reset_date = today;
        true
    }

    /// Add one request's usage to both lifetime and daily counters.
    pub fn add(&mut self, usage: TokenUsage) {
        self.total_prompt = self.total_prompt.saturating_add(usage.prompt);
        self.total_completion = self.total_completion.saturating_add(usage.completion);
        self.total_tokens = self.total_tokens.saturating_add(usage.total);
        self.daily_prompt = self.daily_prompt.saturating_add(usage.prompt);
        self.daily_completion = self.daily_completion.saturating_add(usage.completion);
        self.daily_tokens = self.daily_tokens.saturating_add(usage.total);
    }

    pub fn snapshot(&self, epoch_date: NaiveDate) -> LedgerSnapshot {
        LedgerSnapshot {
            epoch: TokenCounts {
                prompt: self.daily_prompt,
                completion: self.daily_completion,
                total: self.daily_tokens,
            },
            lifetime: TokenCounts {
                prompt: self.total_prompt,
                completion: self.total_completion,
                total: self.total_tokens,
            },
            epoch_date,
        }
    }
}

/// A point-in-time view of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Counters for the current UTC day.
    pub epoch: TokenCounts,
    /// Counters since the ledger was created.
    pub lifetime: TokenCounts,
    /// The UTC day `epoch` refers to.
    pub epoch_date: NaiveDate,
}

impl LedgerSnapshot {
    pub fn epoch_tokens(&self) -> u64 {
        self.epoch.total
    }

    pub fn lifetime_tokens(&self) -> u64 {
        self.lifetime.total
    }
}
