use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{
    error::ApiResult,
    extract::ApiJson,
    middleware::client_ip::ClientIp,
    models::comparison::{CompareRequest, ComparisonKind},
    services::comparison::{check_selection, ComparisonService},
    AppState,
};

pub async fn compare_admission(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    ApiJson(body): ApiJson<CompareRequest>,
) -> ApiResult<Json<Value>> {
    let ids = check_selection(&body.preschool_ids)?;
    let data = ComparisonService::compare_admission(&state.db, &ids).await?;
    ComparisonService::record(state.db.clone(), ip, ids, ComparisonKind::Admission);
    Ok(Json(json!({ "success": true, "data": data })))
}

pub async fn compare_franchise(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    ApiJson(body): ApiJson<CompareRequest>,
) -> ApiResult<Json<Value>> {
    let ids = check_selection(&body.preschool_ids)?;
    let data = ComparisonService::compare_franchise(&state.db, &ids).await?;
    ComparisonService::record(state.db.clone(), ip, ids, ComparisonKind::Franchise);
    Ok(Json(json!({ "success": true, "data": data })))
}

pub async fn comparison_history(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
) -> ApiResult<Json<Value>> {
    let data = ComparisonService::history(&state.db, &ip).await?;
    Ok(Json(json!({ "success": true, "data": data })))
}
