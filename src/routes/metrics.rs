use prometheus::{Encoder, TextEncoder};

use crate::error::ApiResult;

/// GET /metrics: Prometheus text exposition.
pub async fn metrics_handler() -> ApiResult<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(anyhow::Error::from)?;
    Ok(String::from_utf8(buffer).map_err(anyhow::Error::from)?)
}
