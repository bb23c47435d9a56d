//! End-to-end integration tests for the QuotaRelay pipeline.
//!
//! These exercise the relay from a user prompt through policy, context
//! assembly, the (scripted) provider, and accounting, with the ledger and
//! repository persisted in a temp directory.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{Duration, TimeZone, Utc};
use quotarelay_config::{AppConfig, SessionConfig};
use quotarelay_core::error::ProviderError;
use quotarelay_core::message::Message;
use quotarelay_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use quotarelay_core::{ManualClock, Role, UserId};
use quotarelay_ledger::{ModelTier, QuotaPolicy, TokenUsage, UsageLedger};
use quotarelay_memory::{Repository, SessionStore};
use quotarelay_relay::{Refusal, Relay, TurnError};

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that returns scripted responses in sequence.
struct ScriptedProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, index: usize) -> ProviderRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let index = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len() - 1
        };
        let responses = self.responses.lock().unwrap();
        if index >= responses.len() {
            panic!(
                "ScriptedProvider exhausted: call #{}, have {}",
                index,
                responses.len()
            );
        }
        Ok(responses[index].clone())
    }
}

fn text_response(text: &str, prompt: i64, completion: i64) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage::new(prompt, completion, prompt + completion)),
        model: "mock-model".into(),
    }
}

// ── Harness ──────────────────────────────────────────────────────────────

struct Stack {
    relay: Relay,
    provider: Arc<ScriptedProvider>,
    ledger: Arc<UsageLedger>,
    sessions: Arc<SessionStore>,
    clock: Arc<ManualClock>,
}

fn stack(dir: &Path, limit: i64, responses: Vec<ProviderResponse>) -> Stack {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 9, 14, 10, 0, 0).unwrap(),
    ));
    let provider = Arc::new(ScriptedProvider::new(responses));
    let ledger = Arc::new(UsageLedger::open(
        dir.join("token_stats.json"),
        clock.clone(),
    ));
    let sessions = Arc::new(SessionStore::new(
        &SessionConfig {
            expiry_minutes: 30,
            max_exchanges: 2,
        },
        clock.clone(),
    ));
    let relay = Relay::new(
        provider.clone(),
        ledger.clone(),
        sessions.clone(),
        QuotaPolicy::new(limit, "llama-3.3-70b-versatile", "llama-3.1-8b-instant"),
    );
    Stack {
        relay,
        provider,
        ledger,
        sessions,
        clock,
    }
}

// ── Scenarios ────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_budget_degrades_to_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let s = stack(
        dir.path(),
        1000,
        vec![
            text_response("Plenty of budget left.", 600, 300),
            text_response("Running on the small model.", 10, 5),
        ],
    );
    let user = UserId::from(1001u64);

    let first = s.relay.handle_turn(&user, "hello", &[]).await.unwrap();
    assert_eq!(first.tier, ModelTier::Primary);
    assert!(first.warning.is_none());
    assert_eq!(s.provider.request(0).model, "llama-3.3-70b-versatile");
    assert_eq!(first.snapshot.epoch_tokens(), 900);

    let second = s.relay.handle_turn(&user, "and now?", &[]).await.unwrap();
    assert_eq!(second.tier, ModelTier::Fallback);
    assert_eq!(s.provider.request(1).model, "llama-3.1-8b-instant");
    let warning = second.warning.unwrap();
    assert!(warning.contains("900/1000"), "warning was: {warning}");
}

#[tokio::test]
async fn e2e_exhausted_budget_refuses() {
    let dir = tempfile::tempdir().unwrap();
    let s = stack(dir.path(), 1000, vec![]);
    s.ledger.record_usage(TokenUsage::new(500, 460, 960));
    let before = s.ledger.current_stats();

    let err = s
        .relay
        .handle_turn(&UserId::from(7u64), "anything", &[])
        .await
        .unwrap_err();

    assert!(matches!(err, TurnError::Refusal(Refusal::QuotaExceeded)));
    assert_eq!(
        err.user_message(),
        "Daily token quota exceeded. Please try again after 00:00 UTC reset."
    );
    assert_eq!(s.provider.calls(), 0);
    assert_eq!(s.ledger.current_stats(), before);
    assert!(s.sessions.read_turns(&UserId::from(7u64)).is_empty());
}

#[tokio::test]
async fn e2e_empty_reply_leaves_state_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let s = stack(
        dir.path(),
        1000,
        vec![
            text_response("First answer.", 10, 10),
            text_response("", 5, 0),
            text_response("Third answer.", 10, 10),
        ],
    );
    let user = UserId::from("carol");

    s.relay.handle_turn(&user, "one", &[]).await.unwrap();
    let turns_before = s.sessions.read_turns(&user);
    let ledger_before = s.ledger.current_stats();

    let err = s.relay.handle_turn(&user, "two", &[]).await.unwrap_err();
    assert!(matches!(err, TurnError::Refusal(Refusal::EmptyModelResponse)));
    assert_eq!(s.sessions.read_turns(&user), turns_before);
    assert_eq!(s.ledger.current_stats(), ledger_before);

    s.relay.handle_turn(&user, "three", &[]).await.unwrap();
    let history: Vec<String> = s
        .provider
        .request(2)
        .messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| m.content.clone())
        .collect();
    assert_eq!(history, vec!["one", "First answer.", "three"]);
}

#[tokio::test]
async fn e2e_session_window_truncates_oldest() {
    let dir = tempfile::tempdir().unwrap();
    let responses = (0..4)
        .map(|i| text_response(&format!("a{i}"), 1, 1))
        .collect();
    let s = stack(dir.path(), 0, responses);
    let user = UserId::from(5u64);

    for i in 0..4 {
        s.relay
            .handle_turn(&user, &format!("q{i}"), &[])
            .await
            .unwrap();
    }

    let texts: Vec<String> = s
        .sessions
        .read_turns(&user)
        .into_iter()
        .map(|t| t.text)
        .collect();
    assert_eq!(texts, vec!["q2", "a2", "q3", "a3"]);
}

#[tokio::test]
async fn e2e_idle_session_expires() {
    let dir = tempfile::tempdir().unwrap();
    let s = stack(
        dir.path(),
        1000,
        vec![text_response("hi", 1, 1), text_response("who?", 1, 1)],
    );
    let user = UserId::from(9u64);

    s.relay.handle_turn(&user, "remember 42", &[]).await.unwrap();
    s.clock.advance(Duration::minutes(31));
    s.relay.handle_turn(&user, "what number?", &[]).await.unwrap();

    let sent = s.provider.request(1);
    assert_eq!(sent.messages.len(), 2);
    assert_eq!(sent.messages[1].content, "what number?");
}

#[tokio::test]
async fn e2e_ledger_survives_restart_and_rolls_over() {
    let dir = tempfile::tempdir().unwrap();
    {
        let s = stack(dir.path(), 1000, vec![text_response("ok", 70, 30)]);
        s.relay
            .handle_turn(&UserId::from(1u64), "hi", &[])
            .await
            .unwrap();
    }

    let s = stack(dir.path(), 1000, vec![]);
    let snap = s.relay.current_usage_snapshot();
    assert_eq!(snap.epoch_tokens(), 100);
    assert_eq!(snap.lifetime.prompt, 70);
    assert_eq!(snap.epoch_date.to_string(), "2026-09-14");

    s.clock.advance(Duration::days(1));
    let snap = s.relay.current_usage_snapshot();
    assert_eq!(snap.epoch_tokens(), 0);
    assert_eq!(snap.lifetime_tokens(), 100);
    assert_eq!(snap.epoch_date.to_string(), "2026-09-15");
}

#[tokio::test]
async fn e2e_repository_context_is_injected() {
    let dir = tempfile::tempdir().unwrap();
    let s = stack(dir.path(), 1000, vec![text_response("Noted.", 1, 1)]);
    let repository = Repository::open(dir.path().join("repository.json"), s.clock.clone());
    repository.add_entry("Standup is at 09:30").await.unwrap();
    s.clock.advance(Duration::minutes(5));
    repository.add_entry("Release freeze next week").await.unwrap();

    let context = repository.latest_entries(3).await;
    s.relay
        .handle_turn(&UserId::from(3u64), "what's new?", &context)
        .await
        .unwrap();

    let sent = s.provider.request(0);
    assert_eq!(sent.messages[1].role, Role::System);
    let ctx = &sent.messages[1].content;
    assert!(ctx.starts_with("Latest repository memory (most recent first):"));
    let newest = ctx.find("Release freeze").unwrap();
    let oldest = ctx.find("Standup").unwrap();
    assert!(newest < oldest);
}

#[test]
fn e2e_default_config_matches_relay_defaults() {
    let config = AppConfig::default();
    assert_eq!(config.quota.daily_token_limit, 200_000);
    assert_eq!(config.quota.primary_model, "llama-3.3-70b-versatile");
    assert_eq!(config.quota.fallback_model, "llama-3.1-8b-instant");
    assert_eq!(config.session.expiry_minutes, 30);
    assert_eq!(config.session.max_exchanges, 6);
    assert_eq!(config.request_timeout_secs, 60);
    let json = serde_json::to_value(TokenUsage::new(1, 2, 3)).unwrap();
    assert_eq!(json["total"], 3);
}
