use axum::{http::StatusCode, Json};
use serde_json::json;

/// Login attempts allowed per username inside one window.
pub const LOGIN_MAX_ATTEMPTS: u64 = 5;
/// Length of the login rate-limit window, in seconds.
pub const LOGIN_WINDOW_SECS: u64 = 900;

/// Redis key for the login counter of `username`.
pub fn login_key(username: &str) -> String {
    format!("rate:login:{}", username.trim().to_lowercase())
}

/// Checks a counter-based rate limit stored in Redis.
///
/// Uses the INCR + EXPIRE strategy:
/// - Increments a counter for `key`
/// - On first increment, sets TTL to `window_secs`
/// - Returns 429 if counter exceeds `max_attempts`
pub async fn check_rate_limit(
    redis: &mut redis::aio::MultiplexedConnection,
    key: &str,
    max_attempts: u64,
    window_secs: u64,
) -> Result<(), (StatusCode, Json<serde_json::Value>)> {
    let count: u64 = redis::cmd("INCR")
        .arg(key)
        .query_async(redis)
        .await
        .unwrap_or(0);

    if count == 1 {
        // Set TTL only on first increment to avoid resetting the window on each attempt
        let _: Result<(), _> = redis::cmd("EXPIRE")
            .arg(key)
            .arg(window_secs)
            .query_async(redis)
            .await;
    }

    if count > max_attempts {
        tracing::warn!("Rate limit exceeded for {}", key);
        return Err((
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "Too many attempts. Try again in a few minutes." })),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_key_is_case_insensitive() {
        assert_eq!(login_key(" Ana "), "rate:login:ana");
        assert_eq!(login_key("ANA"), login_key("ana"));
    }
}
