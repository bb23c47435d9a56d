//! The request orchestrator.

use crate::outcome::{Failure, Refusal, TurnError, TurnReply, usage_summary};
use crate::prompt::{DEFAULT_SYSTEM_PROMPT, build_messages};
use quotarelay_config::AppConfig;
use quotarelay_core::{Provider, ProviderError, ProviderRequest, Role, UserId};
use quotarelay_ledger::{LedgerSnapshot, PolicyDecision, QuotaPolicy, TokenUsage, UsageLedger};
use quotarelay_memory::{ContextEntry, SessionStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tracing target for the per-turn prompt log.
pub const PROMPT_LOG_TARGET: &str = "quotarelay::prompts";

/// Brokers one user turn at a time against the shared budget.
pub struct Relay {
    provider: Arc<dyn Provider>,
    ledger: Arc<UsageLedger>,
    sessions: Arc<SessionStore>,
    policy: QuotaPolicy,
    system_prompt: String,
    temperature: f32,
    max_tokens: Option<u32>,
    timeout: Duration,
}

impl Relay {
    pub fn new(
        provider: Arc<dyn Provider>,
        ledger: Arc<UsageLedger>,
        sessions: Arc<SessionStore>,
        policy: QuotaPolicy,
    ) -> Self {
        Self {
            provider,
            ledger,
            sessions,
            policy,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: 0.7,
            max_tokens: None,
            timeout: Duration::from_secs(60),
        }
    }

    /// Wire a relay using the quota, identity, and request settings in `config`.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        ledger: Arc<UsageLedger>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        let policy = QuotaPolicy::from_config(&config.quota);
        let mut relay = Self::new(provider, ledger, sessions, policy)
            .with_temperature(config.temperature)
            .with_timeout(Duration::from_secs(config.request_timeout_secs));
        if let Some(prompt) = &config.identity.system_prompt_override {
            relay = relay.with_system_prompt(prompt.clone());
        }
        if let Some(max) = config.max_tokens {
            relay = relay.with_max_tokens(max);
        }
        relay
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Upper bound on a single provider call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn policy(&self) -> &QuotaPolicy {
        &self.policy
    }

    pub fn current_usage_snapshot(&self) -> LedgerSnapshot {
        self.ledger.current_stats()
    }

    /// Run one turn for `user`.
    ///
    /// `context` is the caller's long-term memory snapshot, most recent first.
    /// Nothing is written to the session or the ledger unless a non-blank
    /// reply comes back. The reply is stored and returned as received.
    pub async fn handle_turn(
        &self,
        user: &UserId,
        prompt: &str,
        context: &[ContextEntry],
    ) -> Result<TurnReply, TurnError> {
        let snapshot = self.ledger.current_stats();
        let (tier, model, warning) = match self.policy.decide(&snapshot) {
            PolicyDecision::QuotaExhausted => {
                warn!(
                    user = %user,
                    daily_tokens = snapshot.epoch_tokens(),
                    limit = self.policy.daily_token_limit(),
                    "Daily quota exhausted, refusing turn"
                );
                return Err(Refusal::QuotaExceeded.into());
            }
            PolicyDecision::Proceed {
                tier,
                model,
                warning,
            } => (tier, model, warning),
        };

        let history = self.sessions.read_turns(user);
        let request = ProviderRequest {
            model: model.clone(),
            messages: build_messages(&self.system_prompt, context, &history, prompt),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!(
            user = %user,
            model = %model,
            history = history.len(),
            context = context.len(),
            "Dispatching turn"
        );

        let provider = Arc::clone(&self.provider);
        let mut task = tokio::spawn(async move { provider.complete(request).await });
        let response = match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(Ok(Ok(response))) => response,
            Ok(Ok(Err(e))) => {
                warn!(user = %user, model = %model, error = %e, "Provider call failed");
                return Err(e.into());
            }
            Ok(Err(join_err)) => {
                warn!(user = %user, error = %join_err, "Provider task did not complete");
                return Err(Failure::Unexpected(join_err.to_string()).into());
            }
            Err(_) => {
                task.abort();
                warn!(
                    user = %user,
                    model = %model,
                    timeout_secs = self.timeout.as_secs(),
                    "Provider call timed out"
                );
                return Err(Failure::Provider(ProviderError::Timeout(format!(
                    "no response within {}s",
                    self.timeout.as_secs()
                )))
                .into());
            }
        };

        let reply = response.message.content;
        if reply.trim().is_empty() {
            warn!(user = %user, model = %model, "Provider returned an empty reply");
            return Err(Refusal::EmptyModelResponse.into());
        }

        self.sessions.append_turn(user, Role::User, prompt);
        self.sessions.append_turn(user, Role::Assistant, reply.clone());
        let swept = self.sessions.sweep_expired();
        if swept > 0 {
            debug!(swept, "Removed expired sessions");
        }

        let usage = TokenUsage::from(response.usage.as_ref());
        let snapshot = self.ledger.record_usage(usage);

        info!(
            target: PROMPT_LOG_TARGET,
            user = %user,
            model = %model,
            prompt = %prompt,
            prompt_tokens = usage.prompt,
            completion_tokens = usage.completion,
            total_tokens = usage.total,
            "Prompt served"
        );

        Ok(TurnReply {
            usage_summary: usage_summary(&usage, &snapshot),
            reply,
            model,
            tier,
            usage,
            snapshot,
            warning,
        })
    }
}
