use crate::error::ApiError;

/// Checks a rate limit counter stored in Redis.
///
/// Uses the INCR + EXPIRE strategy:
/// - Increments a counter for `key`
/// - On first increment, sets TTL to `window_secs`
/// - Returns 429 if counter exceeds `max_attempts`
///
/// With no Redis configured the check always passes.
pub async fn check_rate_limit(
    redis: Option<&redis::aio::MultiplexedConnection>,
    key: &str,
    max_attempts: u64,
    window_secs: u64,
) -> Result<(), ApiError> {
    let Some(conn) = redis else {
        return Ok(());
    };
    let mut conn = conn.clone();

    let count: u64 = match redis::cmd("INCR").arg(key).query_async(&mut conn).await {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("rate limit counter unavailable for {key}: {e}");
            return Ok(());
        }
    };

    if count == 1 {
        // Set TTL only on first increment to avoid resetting the window on each attempt
        let _: Result<(), _> = redis::cmd("EXPIRE")
            .arg(key)
            .arg(window_secs)
            .query_async(&mut conn)
            .await;
    }

    if count > max_attempts {
        return Err(ApiError::TooManyRequests);
    }

    Ok(())
}
