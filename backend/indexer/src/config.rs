//! Application configuration loaded from environment variables.

use dao_engine::{Amount, GovernanceConfig, VoteWeighting};

use crate::errors::{IndexerError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// How often (in seconds) to poll the engine's event log
    pub poll_interval_secs: u64,
    /// Maximum number of events to copy per poll
    pub events_per_page: usize,
    /// Governance parameters handed to the engine at startup
    pub governance: GovernanceConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = GovernanceConfig::default();

        let stakeholder_threshold: Amount = match env_var("DAO_STAKEHOLDER_THRESHOLD") {
            Ok(v) => v.parse().map_err(|_| {
                IndexerError::Config("Invalid DAO_STAKEHOLDER_THRESHOLD".to_string())
            })?,
            Err(_) => defaults.stakeholder_threshold,
        };
        let vote_weighting: VoteWeighting = match env_var("DAO_VOTE_WEIGHTING") {
            Ok(v) => v.parse()?,
            Err(_) => defaults.vote_weighting,
        };
        let quorum: Amount = match env_var("DAO_QUORUM") {
            Ok(v) => v
                .parse()
                .map_err(|_| IndexerError::Config("Invalid DAO_QUORUM".to_string()))?,
            Err(_) => defaults.quorum,
        };

        let governance = GovernanceConfig {
            stakeholder_threshold,
            vote_weighting,
            quorum,
        };
        governance.validate()?;

        Ok(Config {
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./dao_events.db".to_string()),
            api_port: env_var("API_PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .map_err(|_| IndexerError::Config("Invalid API_PORT".to_string()))?,
            poll_interval_secs: env_var("POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| IndexerError::Config("Invalid POLL_INTERVAL_SECS".to_string()))?,
            events_per_page: env_var("EVENTS_PER_PAGE")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .map_err(|_| IndexerError::Config("Invalid EVENTS_PER_PAGE".to_string()))?,
            governance,
        })
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| IndexerError::Config(format!("Missing env var: {key}")))
}
