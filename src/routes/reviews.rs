use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiQuery},
    middleware::{auth::require_role, client_ip::ClientIp, rate_limit::check_rate_limit},
    models::{
        admin::AdminRole,
        auth::AdminPrincipal,
        pagination::{Page, DEFAULT_LIMIT},
        review::{AdminListReviewsQuery, ListReviewsQuery, SubmitReviewRequest, UpdateReviewRequest},
    },
    services::{metrics::REVIEWS_SUBMITTED_COUNTER, reviews::ReviewService},
    AppState,
};

pub async fn list_reviews(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListReviewsQuery>,
) -> ApiResult<Json<Value>> {
    let page = Page::new(query.limit, query.offset, DEFAULT_LIMIT);
    let (data, pagination) = ReviewService::list_verified(&state.db, query.preschool_id, page).await?;
    Ok(Json(json!({ "success": true, "data": data, "pagination": pagination })))
}

pub async fn submit_review(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Path(preschool_id): Path<i64>,
    ApiJson(body): ApiJson<SubmitReviewRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    ApiError::check(body.validate())?;
    check_rate_limit(state.redis.as_ref(), &format!("reviews:submit:{ip}"), 10, 3600).await?;

    let review = ReviewService::submit(&state.db, preschool_id, &body).await?;
    REVIEWS_SUBMITTED_COUNTER.inc();
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Review submitted and awaiting verification",
            "data": { "id": review.id, "preschool_id": review.preschool_id, "verified": review.verified },
        })),
    ))
}

// ── Moderation ─────────────────────────────────────────────────────────────

pub async fn pending_reviews(
    State(state): State<AppState>,
    principal: AdminPrincipal,
) -> ApiResult<Json<Value>> {
    require_role(&principal, AdminRole::Moderator)?;
    let data = ReviewService::pending(&state.db).await?;
    Ok(Json(json!({ "success": true, "data": data })))
}

pub async fn verify_review(
    State(state): State<AppState>,
    principal: AdminPrincipal,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    require_role(&principal, AdminRole::Moderator)?;
    let review = ReviewService::verify(&state.db, id).await?;
    Ok(Json(json!({ "success": true, "message": "Review verified", "data": review })))
}

pub async fn reject_review(
    State(state): State<AppState>,
    principal: AdminPrincipal,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    require_role(&principal, AdminRole::Moderator)?;
    ReviewService::reject(&state.db, id).await?;
    Ok(Json(json!({ "success": true, "message": "Review rejected" })))
}

pub async fn admin_list_reviews(
    State(state): State<AppState>,
    principal: AdminPrincipal,
    ApiQuery(query): ApiQuery<AdminListReviewsQuery>,
) -> ApiResult<Json<Value>> {
    require_role(&principal, AdminRole::Viewer)?;
    let page = Page::from_page_number(query.page, query.limit, DEFAULT_LIMIT);
    let (data, pagination) =
        ReviewService::admin_list(&state.db, query.preschool_id, query.verified, page).await?;
    Ok(Json(json!({ "success": true, "data": data, "pagination": pagination })))
}

pub async fn admin_update_review(
    State(state): State<AppState>,
    principal: AdminPrincipal,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<UpdateReviewRequest>,
) -> ApiResult<Json<Value>> {
    require_role(&principal, AdminRole::Moderator)?;
    ApiError::check(body.validate())?;
    let review = ReviewService::admin_update(&state.db, id, &body).await?;
    Ok(Json(json!({ "success": true, "message": "Review updated", "data": review })))
}

pub async fn admin_delete_review(
    State(state): State<AppState>,
    principal: AdminPrincipal,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    require_role(&principal, AdminRole::Moderator)?;
    ReviewService::admin_delete(&state.db, id).await?;
    Ok(Json(json!({ "success": true, "message": "Review deleted" })))
}
