//! Configuration loading, validation, and management for QuotaRelay.
//!
//! Loads configuration from `~/.quotarelay/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.quotarelay/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Provider API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Provider name (selects the default base URL)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Override the provider base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per reply (provider default when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Upper bound on a single provider call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// User ids allowed to see per-message usage details
    #[serde(default)]
    pub admins: Vec<String>,

    /// Daily token budget and model tiers
    #[serde(default)]
    pub quota: QuotaConfig,

    /// Per-user conversation window
    #[serde(default)]
    pub session: SessionConfig,

    /// Where the ledger is persisted
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Long-term memory repository
    #[serde(default)]
    pub repository: RepositoryConfig,

    /// Status dashboard / webhook server
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// System prompt settings
    #[serde(default)]
    pub identity: IdentityConfig,
}

fn default_provider() -> String {
    "groq".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_request_timeout() -> u64 {
    60
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field(
                "api_key",
                &match self.api_key {
                    Some(_) => "[REDACTED]",
                    None => "None",
                },
            )
            .field("provider", &self.provider)
            .field("api_url", &self.api_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("admins", &self.admins)
            .field("quota", &self.quota)
            .field("session", &self.session)
            .field("ledger", &self.ledger)
            .field("repository", &self.repository)
            .field("gateway", &self.gateway)
            .field("identity", &self.identity)
            .finish()
    }
}

/// Shared daily budget and the two model tiers it switches between.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Tokens per UTC day; `<= 0` disables the budget
    #[serde(default = "default_daily_token_limit")]
    pub daily_token_limit: i64,

    #[serde(default = "default_primary_model")]
    pub primary_model: String,

    #[serde(default = "default_fallback_model")]
    pub fallback_model: String,

    /// Usage ratio above which the fallback model is used
    #[serde(default = "default_fallback_above")]
    pub fallback_above: f64,

    /// Usage ratio above which requests are refused
    #[serde(default = "default_exhausted_above")]
    pub exhausted_above: f64,
}

fn default_daily_token_limit() -> i64 {
    200_000
}
fn default_primary_model() -> String {
    "llama-3.3-70b-versatile".into()
}
fn default_fallback_model() -> String {
    "llama-3.1-8b-instant".into()
}
fn default_fallback_above() -> f64 {
    0.80
}
fn default_exhausted_above() -> f64 {
    0.95
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            daily_token_limit: default_daily_token_limit(),
            primary_model: default_primary_model(),
            fallback_model: default_fallback_model(),
            fallback_above: default_fallback_above(),
            exhausted_above: default_exhausted_above(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_expiry_minutes")]
    pub expiry_minutes: u64,

    /// One exchange = one user turn + one assistant turn
    #[serde(default = "default_max_exchanges")]
    pub max_exchanges: usize,
}

fn default_expiry_minutes() -> u64 {
    30
}
fn default_max_exchanges() -> usize {
    6
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            expiry_minutes: default_expiry_minutes(),
            max_exchanges: default_max_exchanges(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Defaults to `~/.quotarelay/token_stats.json`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl LedgerConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| AppConfig::config_dir().join("token_stats.json"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Defaults to `~/.quotarelay/repository.json`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// How many recent entries are injected into each request
    #[serde(default = "default_context_limit")]
    pub context_limit: usize,
}

fn default_context_limit() -> usize {
    3
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            path: None,
            context_limit: default_context_limit(),
        }
    }
}

impl RepositoryConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| AppConfig::config_dir().join("repository.json"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    8080
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Replace the built-in system prompt entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.quotarelay/config.toml).
    ///
    /// Environment variables take priority over the file:
    /// - `QUOTARELAY_API_KEY`, then `GROQ_API_KEY`
    /// - `GROQ_MODEL` / `GROQ_FALLBACK_MODEL`
    /// - `DAILY_TOKEN_LIMIT`
    /// - `PORT`
    /// - `ADMIN_IDS` (comma separated)
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("QUOTARELAY_API_KEY").or_else(|| non_empty("GROQ_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(model) = non_empty("GROQ_MODEL") {
            self.quota.primary_model = model;
        }
        if let Some(model) = non_empty("GROQ_FALLBACK_MODEL") {
            self.quota.fallback_model = model;
        }
        if let Some(limit) = non_empty("DAILY_TOKEN_LIMIT") {
            match limit.trim().parse() {
                Ok(limit) => self.quota.daily_token_limit = limit,
                Err(_) => tracing::warn!(value = %limit, "Ignoring non-numeric DAILY_TOKEN_LIMIT"),
            }
        }
        if let Some(port) = non_empty("PORT") {
            match port.trim().parse() {
                Ok(port) => self.gateway.port = port,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid PORT"),
            }
        }
        if let Some(admins) = non_empty("ADMIN_IDS") {
            self.admins = admins
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(String::from)
                .collect();
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".quotarelay")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.temperature < 0.0 || self.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        let q = &self.quota;
        if !(0.0..=1.0).contains(&q.fallback_above) || !(0.0..=1.0).contains(&q.exhausted_above) {
            return Err(ConfigError::ValidationError(
                "quota thresholds must be between 0.0 and 1.0".into(),
            ));
        }
        if q.fallback_above > q.exhausted_above {
            return Err(ConfigError::ValidationError(
                "quota.fallback_above must not exceed quota.exhausted_above".into(),
            ));
        }

        if self.session.max_exchanges == 0 {
            return Err(ConfigError::ValidationError(
                "session.max_exchanges must be at least 1".into(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "request_timeout_secs must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Whether `user_id` is listed in `admins`.
    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admins.iter().any(|a| a == user_id)
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: default_provider(),
            api_url: None,
            temperature: default_temperature(),
            max_tokens: None,
            request_timeout_secs: default_request_timeout(),
            admins: vec![],
            quota: QuotaConfig::default(),
            session: SessionConfig::default(),
            ledger: LedgerConfig::default(),
            repository: RepositoryConfig::default(),
            gateway: GatewayConfig::default(),
            identity: IdentityConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
