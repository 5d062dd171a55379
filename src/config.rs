use std::net::IpAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let host: IpAddr = env_or("MOSAIC_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid MOSAIC_HOST: {e}"))?;

        let port: u16 = env_or("PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid PORT: {e}"))?;

        let log_level = env_or("MOSAIC_LOG_LEVEL", "info");

        Ok(Config {
            host,
            port,
            log_level,
        })
    }
}

/// Settings for the kiosk process: where selfies are stored and who gets told about them.
#[derive(Debug, Clone)]
pub struct KioskConfig {
    pub database_url: String,
    pub storage: StorageConfig,
    pub hub_url: Option<String>,
    pub reset_delay: Duration,
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub url: String,
    pub key: String,
    pub bucket: String,
}

impl KioskConfig {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;

        let storage = StorageConfig {
            url: env_required("SUPABASE_URL")?
                .trim_end_matches('/')
                .to_string(),
            key: env_required("SUPABASE_KEY")?,
            bucket: env_or("MOSAIC_BUCKET", "mosaic"),
        };

        let hub_url = std::env::var("MOSAIC_HUB_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let reset_delay_secs: u64 = env_or("MOSAIC_RESET_DELAY_SECS", "10")
            .parse()
            .map_err(|e| format!("Invalid MOSAIC_RESET_DELAY_SECS: {e}"))?;

        let log_level = env_or("MOSAIC_LOG_LEVEL", "info");

        Ok(KioskConfig {
            database_url,
            storage,
            hub_url,
            reset_delay: Duration::from_secs(reset_delay_secs),
            log_level,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
