use lazy_static::lazy_static;
use prometheus::{register_counter_vec, register_gauge, CounterVec, Gauge};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::services::date_window::{local_now, utc_day_bounds};

lazy_static! {
    // ── Event counters ──────────────────────────────────────────────────────
    pub static ref LOGINS_COUNTER: CounterVec = register_counter_vec!(
        "api_logins_total",
        "Login attempts by status",
        &["status"]
    ).unwrap();

    pub static ref SELECTIONS_COUNTER: CounterVec = register_counter_vec!(
        "api_menu_selections_total",
        "Menu selection attempts by outcome",
        &["status"]
    ).unwrap();

    pub static ref BROADCASTS_COUNTER: CounterVec = register_counter_vec!(
        "menu_broadcasts_total",
        "Daily menu broadcasts by outcome",
        &["status"]
    ).unwrap();

    pub static ref SLACK_ERRORS_COUNTER: CounterVec = register_counter_vec!(
        "slack_request_errors_total",
        "Slack API calls that returned ok=false, by endpoint",
        &["endpoint"]
    ).unwrap();

    // ── Business metrics ────────────────────────────────────────────────────
    pub static ref MENUS_TODAY_GAUGE: Gauge = register_gauge!(
        "menus_today_total",
        "Menus scheduled for the current local day"
    ).unwrap();

    pub static ref SELECTIONS_TODAY_GAUGE: Gauge = register_gauge!(
        "menu_selections_today_total",
        "Menu selections made during the current local day"
    ).unwrap();

    pub static ref USERS_GAUGE: Gauge = register_gauge!(
        "users_active_total",
        "Active user accounts"
    ).unwrap();
}

/// Spawn the background metrics collector (refreshes every 5 minutes).
pub fn start(pool: PgPool) {
    tokio::spawn(async move {
        if let Err(e) = collect(&pool).await {
            warn!("Metrics: initial collection failed: {}", e);
        }
        loop {
            tokio::time::sleep(tokio::time::Duration::from_secs(300)).await;
            if let Err(e) = collect(&pool).await {
                warn!("Metrics: collection failed: {}", e);
            }
        }
    });
}

async fn collect(pool: &PgPool) -> anyhow::Result<()> {
    let (start, end) = utc_day_bounds(local_now().date())?;

    let menus: i64 = sqlx::query_scalar(
        "SELECT COUNT(*)::BIGINT FROM menus WHERE preparation_date BETWEEN $1 AND $2",
    )
    .bind(start)
    .bind(end)
    .fetch_one(pool)
    .await?;
    MENUS_TODAY_GAUGE.set(menus as f64);

    let selections: i64 = sqlx::query_scalar(
        "SELECT COUNT(*)::BIGINT FROM menu_selections WHERE selected_at BETWEEN $1 AND $2",
    )
    .bind(start)
    .bind(end)
    .fetch_one(pool)
    .await?;
    SELECTIONS_TODAY_GAUGE.set(selections as f64);

    let users: i64 =
        sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM users WHERE is_active = TRUE")
            .fetch_one(pool)
            .await?;
    USERS_GAUGE.set(users as f64);

    info!("Metrics: {} menu(s), {} selection(s) today", menus, selections);
    Ok(())
}
