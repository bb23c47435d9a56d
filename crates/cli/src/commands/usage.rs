//! `quotarelay usage`: Token usage against the daily budget.

use crate::services::{load_config, open_ledger};
use quotarelay_ledger::{ModelTier, PolicyDecision, QuotaPolicy};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let ledger = open_ledger(&config);
    let policy = QuotaPolicy::from_config(&config.quota);

    let snapshot = ledger.current_stats();
    let ratio = policy.usage_ratio(snapshot.epoch_tokens());

    println!("Token Usage ({})", snapshot.epoch_date);
    println!("─────────────────────────────────────");
    if policy.daily_token_limit() > 0 {
        println!(
            "  Daily:       {} / {} ({:.1}%)",
            snapshot.epoch_tokens(),
            policy.daily_token_limit(),
            ratio * 100.0
        );
    } else {
        println!("  Daily:       {} (no limit)", snapshot.epoch_tokens());
    }
    println!(
        "    prompt={} completion={}",
        snapshot.epoch.prompt, snapshot.epoch.completion
    );
    println!("  Lifetime:    {}", snapshot.lifetime_tokens());
    println!(
        "    prompt={} completion={}",
        snapshot.lifetime.prompt, snapshot.lifetime.completion
    );
    println!("  Resets at:   00:00 UTC");

    let status = match policy.decide(&snapshot) {
        PolicyDecision::QuotaExhausted => "EXHAUSTED (requests refused)".to_string(),
        PolicyDecision::Proceed {
            tier: ModelTier::Fallback,
            model,
            ..
        } => format!("fallback model active ({model})"),
        PolicyDecision::Proceed { model, .. } => format!("primary model ({model})"),
    };
    println!("  Status:      {status}");

    Ok(())
}
