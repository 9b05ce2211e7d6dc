use std::env;

use crate::services::eligibility::SELECTION_CUTOFF_HOUR;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub jwt_expiry_seconds: u64,
    pub host: String,
    pub port: u16,
    pub app_base_url: String,
    // Slack broadcast
    pub slack_bot_token: String,
    pub slack_base_url: String,
    pub slack_channel: String,
    pub slack_timeout_seconds: u64,
    /// Domain used to build menu deep links in the daily summary.
    pub site_domain: String,
    pub selection_cutoff_hour: u32,
    pub menu_broadcast_hour: u32,
    pub menu_broadcast_enabled: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into()),
            jwt_secret: required("JWT_SECRET")?,
            jwt_expiry_seconds: env::var("JWT_EXPIRY_SECONDS")
                .unwrap_or_else(|_| "86400".into())
                .parse()?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,
            app_base_url: env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost".into()),
            slack_bot_token: env::var("SLACK_BOT_TOKEN").unwrap_or_else(|_| "No token".into()),
            slack_base_url: env::var("SLACK_BASE_URL")
                .unwrap_or_else(|_| "https://slack.com/api/".into()),
            slack_channel: env::var("SLACK_CHANNEL")
                .unwrap_or_else(|_| "cornershop-backend-test".into())
                .to_lowercase(),
            slack_timeout_seconds: env::var("SLACK_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "10".into())
                .parse()?,
            site_domain: env::var("SITE_DOMAIN").unwrap_or_else(|_| "localhost:8080".into()),
            selection_cutoff_hour: hour("SELECTION_CUTOFF_HOUR", SELECTION_CUTOFF_HOUR)?,
            menu_broadcast_hour: hour("MENU_BROADCAST_HOUR", 9)?,
            menu_broadcast_enabled: env::var("MENU_BROADCAST_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
        })
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("Missing required env var: {}", key))
}

/// Reads an hour of day (0..=23), falling back to `default` when unset.
fn hour(key: &str, default: u32) -> anyhow::Result<u32> {
    let value = match env::var(key) {
        Ok(v) => v.parse::<u32>()?,
        Err(_) => return Ok(default),
    };
    if value > 23 {
        anyhow::bail!("{key} must be an hour between 0 and 23, got {value}");
    }
    Ok(value)
}
