use chrono::{Local, Timelike};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::services::daily_summary::{self, Delivered, DeliveryError};
use crate::services::date_window::local_now;
use crate::services::metrics::BROADCASTS_COUNTER;
use crate::services::slack::SlackClient;

/// Spawn a background task that wakes up daily at `menu_broadcast_hour`
/// (server local time) and broadcasts today's menus.
pub fn start(pool: PgPool, config: Arc<Config>) {
    tokio::spawn(async move {
        loop {
            let now = Local::now();
            let secs_today = now.hour() * 3600 + now.minute() * 60 + now.second();
            let sleep_secs = seconds_until(secs_today, config.menu_broadcast_hour);
            tokio::time::sleep(tokio::time::Duration::from_secs(sleep_secs)).await;

            run_once(&pool, &config).await;
        }
    });
}

/// Seconds from `secs_today` (seconds past local midnight) until the next
/// `target_hour`:00:00. Lands on tomorrow when the hour already started.
fn seconds_until(secs_today: u32, target_hour: u32) -> u64 {
    let target_secs = target_hour * 3600;
    if secs_today < target_secs {
        (target_secs - secs_today) as u64
    } else {
        (86400 - secs_today + target_secs) as u64
    }
}

/// Runs one broadcast with a client of its own. Failures are logged, never returned.
pub async fn run_once(pool: &PgPool, config: &Config) {
    let outcome = broadcast(pool, config).await;
    log_outcome(&config.slack_channel, &outcome);
}

/// One broadcast attempt, for callers that need the outcome.
pub async fn broadcast(pool: &PgPool, config: &Config) -> Result<Delivered, DeliveryError> {
    let mut client =
        SlackClient::from_config(config).map_err(|e| DeliveryError::Setup(e.to_string()))?;
    daily_summary::send_todays_menu(
        pool,
        &mut client,
        &config.slack_channel,
        &config.site_domain,
        local_now(),
    )
    .await
}

pub fn log_outcome(channel: &str, outcome: &Result<Delivered, DeliveryError>) {
    match outcome {
        Ok(delivered) => {
            BROADCASTS_COUNTER.with_label_values(&["sent"]).inc();
            info!(
                "Menu broadcast: {} menu(s) sent to #{} ({})",
                delivered.menu_count, channel, delivered.channel_id
            );
        }
        Err(DeliveryError::ChannelNotFound(name)) => {
            BROADCASTS_COUNTER.with_label_values(&["failed"]).inc();
            warn!("Menu broadcast skipped: channel #{} not found", name);
        }
        Err(e) => {
            BROADCASTS_COUNTER.with_label_values(&["failed"]).inc();
            error!("Menu broadcast to #{} failed: {}", channel, e);
        }
    }
}
