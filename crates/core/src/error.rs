//! Error types for the QuotaRelay domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Other bounded contexts
//! (ledger, config, repository, relay) define their own enums.

use thiserror::Error;

/// Failures reported by a completion provider.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = ProviderError::ApiError {
            status_code: 500,
            message: "upstream exploded".into(),
        };
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("upstream exploded"));
    }

    #[test]
    fn missing_credential_names_the_variable() {
        let err = ProviderError::MissingCredential("GROQ_API_KEY is not set".into());
        assert!(err.to_string().contains("GROQ_API_KEY"));
    }

    #[test]
    fn rate_limit_shows_retry_delay() {
        let err = ProviderError::RateLimited { retry_after_secs: 5 };
        assert!(err.to_string().contains("5s"));
    }
}
