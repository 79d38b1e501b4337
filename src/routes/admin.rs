use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::{ApiError, ApiResult},
    extract::ApiJson,
    middleware::{auth::require_role, rate_limit::check_rate_limit},
    models::{
        admin::{
            AdminRole, BulkDeleteRequest, BulkIdsRequest, BulkModel, CreateAdminRequest, LoginRequest,
            UpdateAdminRequest,
        },
        auth::AdminPrincipal,
    },
    services::{admins::AdminService, preschools::PreschoolService, reviews::ReviewService},
    AppState,
};

const LOGIN_MAX_ATTEMPTS: u64 = 5;
const LOGIN_WINDOW_SECS: u64 = 15 * 60;
const MAX_BULK_IDS: usize = 500;

pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult<Json<Value>> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::BadRequest("Email and password are required".into()));
    }
    let key = format!("login:attempts:{}", body.email.trim().to_lowercase());
    check_rate_limit(state.redis.as_ref(), &key, LOGIN_MAX_ATTEMPTS, LOGIN_WINDOW_SECS).await?;

    let response = AdminService::login(
        &state.db,
        &body.email,
        &body.password,
        &state.config.jwt_secret,
        state.config.jwt_expiry_hours,
    )
    .await?;
    Ok(Json(json!({ "success": true, "message": "Login successful", "data": response })))
}

pub async fn dashboard_stats(
    State(state): State<AppState>,
    principal: AdminPrincipal,
) -> ApiResult<Json<Value>> {
    require_role(&principal, AdminRole::Viewer)?;
    let stats = AdminService::stats(&state.db).await?;
    Ok(Json(json!({ "success": true, "data": stats })))
}

// ── Admin accounts ─────────────────────────────────────────────────────────

pub async fn list_admins(
    State(state): State<AppState>,
    principal: AdminPrincipal,
) -> ApiResult<Json<Value>> {
    require_role(&principal, AdminRole::Admin)?;
    let data = AdminService::list(&state.db).await?;
    Ok(Json(json!({ "success": true, "data": data })))
}

pub async fn create_admin(
    State(state): State<AppState>,
    principal: AdminPrincipal,
    ApiJson(body): ApiJson<CreateAdminRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    require_role(&principal, AdminRole::Admin)?;
    ApiError::check(body.validate())?;
    let admin = AdminService::create(&state.db, &body).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "data": admin }))))
}

pub async fn update_admin(
    State(state): State<AppState>,
    principal: AdminPrincipal,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<UpdateAdminRequest>,
) -> ApiResult<Json<Value>> {
    require_role(&principal, AdminRole::Admin)?;
    ApiError::check(body.validate())?;
    let admin = AdminService::update(&state.db, principal.admin_id, id, &body).await?;
    Ok(Json(json!({ "success": true, "data": admin })))
}

pub async fn delete_admin(
    State(state): State<AppState>,
    principal: AdminPrincipal,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    require_role(&principal, AdminRole::Admin)?;
    AdminService::delete(&state.db, principal.admin_id, id).await?;
    Ok(Json(json!({ "success": true, "message": "Admin deleted" })))
}

// ── Bulk operations ────────────────────────────────────────────────────────

fn check_ids(ids: &[i64]) -> ApiResult<()> {
    if ids.is_empty() {
        return Err(ApiError::BadRequest("ids must not be empty".into()));
    }
    if ids.len() > MAX_BULK_IDS {
        return Err(ApiError::BadRequest(format!("At most {MAX_BULK_IDS} ids per request")));
    }
    Ok(())
}

pub async fn bulk_verify_preschools(
    State(state): State<AppState>,
    principal: AdminPrincipal,
    ApiJson(body): ApiJson<BulkIdsRequest>,
) -> ApiResult<Json<Value>> {
    require_role(&principal, AdminRole::Moderator)?;
    check_ids(&body.ids)?;
    let updated = PreschoolService::bulk_verify(&state.db, &body.ids).await?;
    Ok(Json(json!({ "success": true, "message": format!("{updated} preschools verified"), "data": { "updated": updated } })))
}

pub async fn bulk_verify_reviews(
    State(state): State<AppState>,
    principal: AdminPrincipal,
    ApiJson(body): ApiJson<BulkIdsRequest>,
) -> ApiResult<Json<Value>> {
    require_role(&principal, AdminRole::Moderator)?;
    check_ids(&body.ids)?;
    let updated = ReviewService::bulk_verify(&state.db, &body.ids).await?;
    Ok(Json(json!({ "success": true, "message": format!("{updated} reviews verified"), "data": { "updated": updated } })))
}

pub async fn bulk_delete(
    State(state): State<AppState>,
    principal: AdminPrincipal,
    ApiJson(body): ApiJson<BulkDeleteRequest>,
) -> ApiResult<Json<Value>> {
    require_role(&principal, AdminRole::Admin)?;
    check_ids(&body.ids)?;
    let deleted = match body.model {
        BulkModel::Preschools => PreschoolService::bulk_delete(&state.db, &body.ids).await?,
        BulkModel::Reviews => ReviewService::bulk_delete(&state.db, &body.ids).await?,
        BulkModel::Comparisons => AdminService::bulk_delete_comparisons(&state.db, &body.ids).await?,
    };
    tracing::info!("{} bulk-deleted {deleted} {}", principal.email, body.model.as_str());
    Ok(Json(json!({
        "success": true,
        "message": format!("{deleted} {} deleted", body.model.as_str()),
        "data": { "deleted": deleted },
    })))
}
