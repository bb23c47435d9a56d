//! `quotarelay serve`: Start the dashboard and webhook server.

use crate::services::{Services, load_config};

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config()?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("QuotaRelay Gateway");
    println!("   Listening:   {}:{}", config.gateway.host, config.gateway.port);
    println!("   Daily limit: {}", config.quota.daily_token_limit);
    println!(
        "   Models:      {} (fallback {})",
        config.quota.primary_model, config.quota.fallback_model
    );
    if !config.has_api_key() {
        println!("   WARNING: no API key configured; chat requests will fail");
    }

    let services = Services::from_config(config);
    quotarelay_gateway::start(services.into_gateway_state()).await?;

    Ok(())
}
