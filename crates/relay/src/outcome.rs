//! Results of a relayed turn.

use quotarelay_core::ProviderError;
use quotarelay_ledger::{LedgerSnapshot, ModelTier, QUOTA_EXCEEDED_MESSAGE, TokenUsage};
use serde::Serialize;

/// A successful turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnReply {
    pub reply: String,
    /// The model that was requested for this turn.
    pub model: String,
    pub tier: ModelTier,
    /// Tokens consumed by this turn alone.
    pub usage: TokenUsage,
    /// Ledger state after this turn was recorded.
    pub snapshot: LedgerSnapshot,
    pub warning: Option<String>,
    pub usage_summary: String,
}

impl TurnReply {
    /// The usage summary on one line, for status footers.
    pub fn compact_usage(&self) -> String {
        format!(
            "This Message tokens: prompt={}, completion={}, total={} | Daily total: {} | Lifetime total: {}",
            self.usage.prompt,
            self.usage.completion,
            self.usage.total,
            self.snapshot.epoch_tokens(),
            self.snapshot.lifetime_tokens()
        )
    }
}

/// Render the multi-line usage block appended to replies.
pub fn usage_summary(usage: &TokenUsage, snapshot: &LedgerSnapshot) -> String {
    format!(
        "\n\n**Token Usage**\n\
         - This Message tokens: prompt={}, completion={}, total={}\n\
         - Daily total: {}\n\
         - Lifetime total: {}",
        usage.prompt,
        usage.completion,
        usage.total,
        snapshot.epoch_tokens(),
        snapshot.lifetime_tokens()
    )
}

/// Policy-driven outcomes the user can act on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Refusal {
    #[error("daily token quota exceeded")]
    QuotaExceeded,

    #[error("model returned an empty response")]
    EmptyModelResponse,
}

/// Provider or transport failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Failure {
    #[error("missing provider credential: {0}")]
    MissingCredential(String),

    #[error("provider rate limit reached")]
    RateLimited { retry_after_secs: u64 },

    #[error("provider error: {0}")]
    Provider(ProviderError),

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl From<ProviderError> for Failure {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::MissingCredential(msg) => Self::MissingCredential(msg),
            ProviderError::RateLimited { retry_after_secs } => {
                Self::RateLimited { retry_after_secs }
            }
            other => Self::Provider(other),
        }
    }
}

/// Why a turn produced no reply.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TurnError {
    #[error("refused: {0}")]
    Refusal(#[from] Refusal),

    #[error("failed: {0}")]
    Failure(#[from] Failure),
}

impl From<ProviderError> for TurnError {
    fn from(err: ProviderError) -> Self {
        Self::Failure(err.into())
    }
}

impl TurnError {
    /// Text suitable for showing to the person who sent the prompt.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Refusal(Refusal::QuotaExceeded) => QUOTA_EXCEEDED_MESSAGE,
            Self::Refusal(Refusal::EmptyModelResponse) => {
                "I received an empty response from the model. Please retry."
            }
            Self::Failure(Failure::MissingCredential(_)) => {
                "Missing GROQ_API_KEY environment variable."
            }
            Self::Failure(Failure::RateLimited { .. }) => {
                "Provider rate limit reached. Please try again shortly."
            }
            Self::Failure(Failure::Provider(_)) => {
                "Provider API error encountered. Please try again in a moment."
            }
            Self::Failure(Failure::Unexpected(_)) => {
                "Unexpected error while generating a response."
            }
        }
    }

    /// Stable machine-readable reason.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Refusal(Refusal::QuotaExceeded) => "quota_exceeded",
            Self::Refusal(Refusal::EmptyModelResponse) => "empty_model_response",
            Self::Failure(Failure::MissingCredential(_)) => "missing_credential",
            Self::Failure(Failure::RateLimited { .. }) => "rate_limited",
            Self::Failure(Failure::Provider(_)) => "provider_error",
            Self::Failure(Failure::Unexpected(_)) => "unexpected",
        }
    }
}
