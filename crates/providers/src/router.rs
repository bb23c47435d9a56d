//! Provider construction from configuration.

use crate::openai_compat::OpenAiCompatProvider;
use quotarelay_config::AppConfig;
use quotarelay_core::provider::Provider;
use std::sync::Arc;
use std::time::Duration;

/// Build the configured provider.
///
/// The key may be absent; the provider then fails each request with
/// `MissingCredential` so the caller can report it per turn.
pub fn build_from_config(config: &AppConfig) -> Arc<dyn Provider> {
    let api_key = config.api_key.clone().unwrap_or_default();
    let base_url = config
        .api_url
        .clone()
        .unwrap_or_else(|| default_base_url(&config.provider));

    if api_key.is_empty() {
        tracing::warn!(provider = %config.provider, "No API key configured");
    }

    Arc::new(OpenAiCompatProvider::with_timeout(
        &config.provider,
        base_url,
        api_key,
        Duration::from_secs(config.request_timeout_secs),
    ))
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "groq" => "https://api.groq.com/openai/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
