//! Wiring of the relay's shared services from configuration.

use quotarelay_config::AppConfig;
use quotarelay_core::{Clock, SystemClock};
use quotarelay_ledger::UsageLedger;
use quotarelay_memory::{Repository, SessionStore};
use quotarelay_relay::Relay;
use std::sync::Arc;

pub struct Services {
    pub config: AppConfig,
    pub relay: Arc<Relay>,
    pub repository: Arc<Repository>,
}

impl Services {
    pub fn from_config(config: AppConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let provider = quotarelay_providers::build_from_config(&config);
        let ledger_path = config.ledger.resolved_path();
        let repository_path = config.repository.resolved_path();
        tracing::debug!(
            provider = %config.provider,
            ledger = %ledger_path.display(),
            repository = %repository_path.display(),
            "Wiring services"
        );

        let ledger = Arc::new(UsageLedger::open(ledger_path, clock.clone()));
        let sessions = Arc::new(SessionStore::new(&config.session, clock.clone()));
        let repository = Arc::new(Repository::open(repository_path, clock));
        let relay = Arc::new(Relay::from_config(&config, provider, ledger, sessions));

        Self {
            config,
            relay,
            repository,
        }
    }

    pub fn into_gateway_state(self) -> quotarelay_gateway::GatewayState {
        quotarelay_gateway::GatewayState {
            config: self.config,
            relay: self.relay,
            repository: self.repository,
        }
    }
}

/// Load config with a readable error.
pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// Open only the repository, for the `memory` commands.
pub fn open_repository(config: &AppConfig) -> Repository {
    Repository::open(config.repository.resolved_path(), Arc::new(SystemClock))
}

/// Open only the ledger, for the `usage` command.
pub fn open_ledger(config: &AppConfig) -> UsageLedger {
    UsageLedger::open(config.ledger.resolved_path(), Arc::new(SystemClock))
}
