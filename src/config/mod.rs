use std::env;
use std::time::Duration;

use crate::services::WagerServiceConfig;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,

    // Purchase engine
    pub buy_max_attempts: u32,
    pub buy_timeout_ms: Option<u64>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,

            buy_max_attempts: env::var("BUY_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "3".into())
                .parse()
                .unwrap_or(3)
                .max(1),
            buy_timeout_ms: env::var("BUY_TIMEOUT_MS").ok().and_then(|v| v.parse().ok()),
        })
    }

    /// Engine tunables derived from the environment.
    pub fn wager_service_config(&self) -> WagerServiceConfig {
        WagerServiceConfig {
            max_buy_attempts: self.buy_max_attempts,
            buy_timeout: self.buy_timeout_ms.map(Duration::from_millis),
        }
    }
}
