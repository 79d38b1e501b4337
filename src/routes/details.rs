use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiQuery},
    middleware::auth::require_role,
    models::{
        admin::AdminRole,
        admission::{AdmissionInput, UpsertAdmissionRequest},
        auth::AdminPrincipal,
        franchise::{FranchiseOpportunitiesQuery, UpdateFranchiseRequest},
        preschool::{AddImageRequest, UpdateImageRequest},
    },
    services::{
        details::{AdmissionService, FranchiseService},
        images::ImageService,
    },
    AppState,
};

pub async fn update_admission(
    State(state): State<AppState>,
    principal: AdminPrincipal,
    Path(preschool_id): Path<i64>,
    ApiJson(body): ApiJson<AdmissionInput>,
) -> ApiResult<Json<Value>> {
    require_role(&principal, AdminRole::Moderator)?;
    ApiError::check(body.validate())?;
    let detail = AdmissionService::update(&state.db, preschool_id, &body).await?;
    Ok(Json(json!({ "success": true, "message": "Admission details updated", "data": detail })))
}

pub async fn upsert_admission(
    State(state): State<AppState>,
    principal: AdminPrincipal,
    ApiJson(body): ApiJson<UpsertAdmissionRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    require_role(&principal, AdminRole::Moderator)?;
    let (preschool_id, input) = body.into_parts();
    ApiError::check(input.validate())?;

    let (detail, created) = AdmissionService::upsert(&state.db, preschool_id, &input).await?;
    let (status, message) = if created {
        (StatusCode::CREATED, "Admission details created")
    } else {
        (StatusCode::OK, "Admission details updated")
    };
    Ok((status, Json(json!({ "success": true, "message": message, "data": detail }))))
}

pub async fn update_franchise(
    State(state): State<AppState>,
    principal: AdminPrincipal,
    Path(preschool_id): Path<i64>,
    ApiJson(body): ApiJson<UpdateFranchiseRequest>,
) -> ApiResult<Json<Value>> {
    require_role(&principal, AdminRole::Moderator)?;
    ApiError::check(body.validate())?;
    let detail = FranchiseService::update(&state.db, preschool_id, &body).await?;
    Ok(Json(json!({ "success": true, "message": "Franchise details updated", "data": detail })))
}

pub async fn franchise_opportunities(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<FranchiseOpportunitiesQuery>,
) -> ApiResult<Json<Value>> {
    let (data, pagination) = FranchiseService::opportunities(&state.db, &query).await?;
    Ok(Json(json!({ "success": true, "data": data, "pagination": pagination })))
}

// ── Images ─────────────────────────────────────────────────────────────────

pub async fn add_image(
    State(state): State<AppState>,
    principal: AdminPrincipal,
    ApiJson(body): ApiJson<AddImageRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    require_role(&principal, AdminRole::Moderator)?;
    ApiError::check(body.validate())?;
    let image = ImageService::add(&state.db, body.preschool_id, &body.image_url, body.is_primary).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "data": image }))))
}

pub async fn update_image(
    State(state): State<AppState>,
    principal: AdminPrincipal,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<UpdateImageRequest>,
) -> ApiResult<Json<Value>> {
    require_role(&principal, AdminRole::Moderator)?;
    let image = ImageService::set_primary(&state.db, id, body.is_primary).await?;
    Ok(Json(json!({ "success": true, "data": image })))
}

pub async fn delete_image(
    State(state): State<AppState>,
    principal: AdminPrincipal,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    require_role(&principal, AdminRole::Moderator)?;
    ImageService::delete(&state.db, id).await?;
    Ok(Json(json!({ "success": true, "message": "Image deleted" })))
}
