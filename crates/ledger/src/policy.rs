//! Quota policy: map the day's usage to a model tier, a warning, or a refusal.

use crate::model::LedgerSnapshot;
use quotarelay_config::QuotaConfig;
use serde::{Deserialize, Serialize};

/// Shown to users once the daily budget is spent.
pub const QUOTA_EXCEEDED_MESSAGE: &str =
    "Daily token quota exceeded. Please try again after 00:00 UTC reset.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    Primary,
    Fallback,
}

/// What to do with the next request.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyDecision {
    Proceed {
        tier: ModelTier,
        model: String,
        warning: Option<String>,
    },
    QuotaExhausted,
}

/// Budget thresholds and the model pair they choose between.
#[derive(Debug, Clone)]
pub struct QuotaPolicy {
    daily_token_limit: i64,
    primary_model: String,
    fallback_model: String,
    fallback_above: f64,
    exhausted_above: f64,
}

impl QuotaPolicy {
    /// A policy with the default 0.80 / 0.95 thresholds.
    pub fn new(
        daily_token_limit: i64,
        primary_model: impl Into<String>,
        fallback_model: impl Into<String>,
    ) -> Self {
        Self {
            daily_token_limit,
            primary_model: primary_model.into(),
            fallback_model: fallback_model.into(),
            fallback_above: 0.80,
            exhausted_above: 0.95,
        }
    }

    pub fn from_config(config: &QuotaConfig) -> Self {
        Self::new(
            config.daily_token_limit,
            &config.primary_model,
            &config.fallback_model,
        )
        .with_thresholds(config.fallback_above, config.exhausted_above)
    }

    pub fn with_thresholds(mut self, fallback_above: f64, exhausted_above: f64) -> Self {
        self.fallback_above = fallback_above;
        self.exhausted_above = exhausted_above;
        self
    }

    pub fn daily_token_limit(&self) -> i64 {
        self.daily_token_limit
    }

    /// Fraction of the daily budget used; 0 when the budget is disabled.
    pub fn usage_ratio(&self, epoch_tokens: u64) -> f64 {
        if self.daily_token_limit <= 0 {
            return 0.0;
        }
        epoch_tokens as f64 / self.daily_token_limit as f64
    }

    pub fn decide(&self, snapshot: &LedgerSnapshot) -> PolicyDecision {
        self.decide_for(snapshot.epoch_tokens())
    }

    /// Thresholds are exclusive: a ratio exactly at a threshold stays in the lower band.
    pub fn decide_for(&self, epoch_tokens: u64) -> PolicyDecision {
        let ratio = self.usage_ratio(epoch_tokens);

        if ratio > self.exhausted_above {
            return PolicyDecision::QuotaExhausted;
        }

        if ratio > self.fallback_above {
            return PolicyDecision::Proceed {
                tier: ModelTier::Fallback,
                model: self.fallback_model.clone(),
                warning: Some(format!(
                    "Usage is above {:.0}% ({}/{}). Fallback model is active to conserve quota.",
                    self.fallback_above * 100.0,
                    epoch_tokens,
                    self.daily_token_limit
                )),
            };
        }

        PolicyDecision::Proceed {
            tier: ModelTier::Primary,
            model: self.primary_model.clone(),
            warning: None,
        }
    }
}
