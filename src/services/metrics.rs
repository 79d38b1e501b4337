use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_gauge_vec, Counter, CounterVec,
    Gauge, GaugeVec,
};
use sqlx::PgPool;
use tracing::{info, warn};

lazy_static! {
    // ── Event counters ──────────────────────────────────────────────────────
    pub static ref COMPARISONS_COUNTER: CounterVec = register_counter_vec!(
        "api_comparisons_total",
        "Comparisons requested by type",
        &["type"]
    ).unwrap();

    pub static ref NEARBY_SEARCHES_COUNTER: Counter = register_counter!(
        "api_nearby_searches_total",
        "Nearby searches served"
    ).unwrap();

    pub static ref REVIEWS_SUBMITTED_COUNTER: Counter = register_counter!(
        "api_reviews_submitted_total",
        "Parent reviews submitted for moderation"
    ).unwrap();

    pub static ref LOGINS_COUNTER: CounterVec = register_counter_vec!(
        "api_admin_logins_total",
        "Admin login attempts by status",
        &["status"]
    ).unwrap();

    pub static ref PLACES_IMPORTED_COUNTER: CounterVec = register_counter_vec!(
        "api_places_imported_total",
        "Places import candidates by outcome",
        &["outcome"]
    ).unwrap();

    // ── Catalog gauges ──────────────────────────────────────────────────────
    pub static ref LISTINGS_GAUGE: GaugeVec = register_gauge_vec!(
        "preschool_listings_total",
        "Listings by verification status",
        &["verified"]
    ).unwrap();

    pub static ref PENDING_REVIEWS_GAUGE: Gauge = register_gauge!(
        "preschool_reviews_pending_total",
        "Reviews awaiting moderation"
    ).unwrap();
}

/// Spawn the background gauge collector (refreshes every 5 minutes).
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
    let listings: Vec<(bool, i64)> = sqlx::query_as(
        "SELECT verified_status, COUNT(*)::BIGINT FROM preschools GROUP BY verified_status",
    )
    .fetch_all(pool)
    .await?;

    LISTINGS_GAUGE.with_label_values(&["true"]).set(0.0);
    LISTINGS_GAUGE.with_label_values(&["false"]).set(0.0);
    for (verified, count) in &listings {
        let label = if *verified { "true" } else { "false" };
        LISTINGS_GAUGE.with_label_values(&[label]).set(*count as f64);
    }

    let pending: i64 = sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM reviews WHERE NOT verified")
        .fetch_one(pool)
        .await?;
    PENDING_REVIEWS_GAUGE.set(pending as f64);

    info!("Metrics: collected ({} listing groups, {} pending reviews)", listings.len(), pending);
    Ok(())
}
