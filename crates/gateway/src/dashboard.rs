//! Usage view shared by the HTML dashboard and the JSON endpoint.

use chrono::NaiveDate;
use quotarelay_ledger::{LedgerSnapshot, QuotaPolicy, TokenCounts};
use serde::Serialize;

/// Daily counters reset at this wall-clock time.
pub const RESET_TIME_UTC: &str = "00:00 UTC";

#[derive(Debug, Clone, Serialize)]
pub struct UsageView {
    pub status: &'static str,
    pub epoch_date: NaiveDate,
    pub daily: TokenCounts,
    pub lifetime: TokenCounts,
    pub daily_limit: i64,
    pub usage_ratio: f64,
    pub active_sessions: usize,
    pub reset_time: &'static str,
}

impl UsageView {
    pub fn new(snapshot: &LedgerSnapshot, policy: &QuotaPolicy, active_sessions: usize) -> Self {
        Self {
            status: "Online",
            epoch_date: snapshot.epoch_date,
            daily: snapshot.epoch,
            lifetime: snapshot.lifetime,
            daily_limit: policy.daily_token_limit(),
            usage_ratio: policy.usage_ratio(snapshot.epoch_tokens()),
            active_sessions,
            reset_time: RESET_TIME_UTC,
        }
    }
}

/// Render the status page.
pub fn render(view: &UsageView) -> String {
    let limit = if view.daily_limit > 0 {
        view.daily_limit.to_string()
    } else {
        "unlimited".to_string()
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<meta http-equiv="refresh" content="30">
<title>QuotaRelay Status</title>
<style>
body {{ font-family: system-ui, sans-serif; background: #0f1115; color: #e6e6e6; margin: 0; }}
main {{ max-width: 640px; margin: 48px auto; padding: 0 16px; }}
.card {{ background: #181b22; border-radius: 10px; padding: 16px 20px; margin-bottom: 12px; }}
.label {{ color: #8a93a6; font-size: 0.85rem; }}
.value {{ font-size: 1.4rem; margin-top: 4px; }}
.online {{ color: #4ade80; }}
</style>
</head>
<body>
<main>
<h1>QuotaRelay</h1>
<div class="card"><div class="label">Status</div><div class="value online">{status}</div></div>
<div class="card"><div class="label">Daily tokens</div><div class="value">{daily} / {limit} ({pct:.1}%)</div></div>
<div class="card"><div class="label">Lifetime tokens</div><div class="value">{lifetime}</div></div>
<div class="card"><div class="label">Active sessions</div><div class="value">{sessions}</div></div>
<div class="card"><div class="label">Daily reset</div><div class="value">{reset}</div></div>
<div class="card"><div class="label">Last reset date</div><div class="value">{date}</div></div>
</main>
</body>
</html>
"#,
        status = view.status,
        daily = view.daily.total,
        limit = limit,
        pct = view.usage_ratio * 100.0,
        lifetime = view.lifetime.total,
        sessions = view.active_sessions,
        reset = view.reset_time,
        date = view.epoch_date.format("%Y-%m-%d"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(limit: i64) -> UsageView {
        let snapshot = LedgerSnapshot {
            epoch: TokenCounts {
                prompt: 300,
                completion: 200,
                total: 500,
            },
            lifetime: TokenCounts {
                prompt: 3000,
                completion: 2000,
                total: 5000,
            },
            epoch_date: NaiveDate::from_ymd_opt(2026, 7, 4).unwrap(),
        };
        UsageView::new(&snapshot, &QuotaPolicy::new(limit, "a", "b"), 3)
    }

    #[test]
    fn view_computes_ratio() {
        let v = view(1000);
        assert_eq!(v.usage_ratio, 0.5);
        assert_eq!(v.daily.total, 500);
        assert_eq!(v.reset_time, "00:00 UTC");
    }

    #[test]
    fn page_shows_counters() {
        let html = render(&view(1000));
        assert!(html.contains("Online"));
        assert!(html.contains("500 / 1000 (50.0%)"));
        assert!(html.contains("5000"));
        assert!(html.contains("00:00 UTC"));
        assert!(html.contains("2026-07-04"));
    }

    #[test]
    fn disabled_limit_reads_unlimited() {
        let html = render(&view(0));
        assert!(html.contains("500 / unlimited"));
    }
}
