//! `quotarelay chat`: Interactive or single-message chat.

use crate::services::{Services, load_config};
use quotarelay_config::AppConfig;
use quotarelay_core::UserId;
use quotarelay_relay::{TurnError, TurnReply};
use std::io::Write;
use tokio::io::{self, AsyncBufReadExt, BufReader};

pub async fn run(
    user: String,
    message: Option<String>,
    show_usage: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;

    // Check for API key early
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    GROQ_API_KEY        = 'gsk_...'");
        eprintln!("    QUOTARELAY_API_KEY  = '...'      (generic)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let show_usage = show_usage || config.is_admin(&user);
    let services = Services::from_config(config);
    let user = UserId::from(user);

    if let Some(msg) = message {
        eprint!("  Thinking...");
        let outcome = turn(&services, &user, &msg).await;
        eprint!("\r              \r");
        match outcome {
            Ok(reply) => print_reply(&reply, show_usage, ""),
            Err(e) => {
                eprintln!("{}", e.user_message());
                return Err(e.into());
            }
        }
        return Ok(());
    }

    println!();
    println!("  QuotaRelay — Interactive Mode");
    println!();
    println!("  Provider:  {}", services.config.provider);
    println!(
        "  Models:    {} (fallback {})",
        services.config.quota.primary_model, services.config.quota.fallback_model
    );
    println!("  User:      {user}");
    println!();
    println!("  Commands: /usage, /reset, exit");
    println!();

    let mut lines = BufReader::new(io::stdin()).lines();
    prompt()?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            prompt()?;
            continue;
        }
        if matches!(line, "exit" | "quit" | "/exit" | "/quit" | ":q") {
            break;
        }

        match line {
            "/reset" => {
                services.relay.sessions().clear(&user);
                println!("  Session cleared.\n");
            }
            "/usage" => {
                let snap = services.relay.current_usage_snapshot();
                println!(
                    "  Daily: {} / {}   Lifetime: {}\n",
                    snap.epoch_tokens(),
                    services.config.quota.daily_token_limit,
                    snap.lifetime_tokens()
                );
            }
            _ => {
                eprint!("  ...");
                let outcome = turn(&services, &user, line).await;
                eprint!("\r     \r");
                match outcome {
                    Ok(reply) => print_reply(&reply, show_usage, "  Assistant > "),
                    Err(e) => {
                        eprintln!("  [{}] {}", e.reason(), e.user_message());
                        println!();
                    }
                }
            }
        }

        prompt()?;
    }

    println!();
    println!("  Goodbye!");
    println!();

    Ok(())
}

async fn turn(services: &Services, user: &UserId, text: &str) -> Result<TurnReply, TurnError> {
    let context = services
        .repository
        .latest_entries(services.config.repository.context_limit)
        .await;
    services.relay.handle_turn(user, text, &context).await
}

fn print_reply(reply: &TurnReply, show_usage: bool, prefix: &str) {
    if let Some(warning) = &reply.warning {
        println!("{prefix}[!] {warning}");
    }
    for line in reply.reply.lines() {
        println!("{prefix}{line}");
    }
    if show_usage {
        println!("{}", reply.usage_summary);
    }
    println!();
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}
