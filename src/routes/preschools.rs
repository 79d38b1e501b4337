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
        auth::AdminPrincipal,
        pagination::{Page, DEFAULT_LIMIT},
        preschool::{
            AdminListPreschoolsQuery, CreatePreschoolRequest, ListPreschoolsQuery,
            UpdatePreschoolRequest,
        },
    },
    services::{
        metrics::NEARBY_SEARCHES_COUNTER,
        nearby::{NearbyQuery, NearbyService, SearchParams},
        preschools::{ListingFilter, PreschoolService},
    },
    AppState,
};

pub async fn list_preschools(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListPreschoolsQuery>,
) -> ApiResult<Json<Value>> {
    let filter = ListingFilter {
        city: query.city,
        min_fee: query.min_fee,
        max_fee: query.max_fee,
        min_rating: query.min_rating,
        verified: query.verified,
    };
    let page = Page::new(query.limit, query.offset, DEFAULT_LIMIT);
    let (data, pagination) = PreschoolService::list(&state.db, &filter, page).await?;
    Ok(Json(json!({ "success": true, "data": data, "pagination": pagination })))
}

pub async fn nearby_preschools(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<NearbyQuery>,
) -> ApiResult<Json<Value>> {
    let params = query.parse()?;
    NEARBY_SEARCHES_COUNTER.inc();
    let (data, pagination) = NearbyService::search(&state.db, &params).await?;
    Ok(Json(json!({
        "success": true,
        "data": data,
        "pagination": pagination,
        "searchParams": SearchParams::from(&params),
    })))
}

pub async fn get_preschool(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let detail = PreschoolService::get_detail(&state.db, id).await?;
    Ok(Json(json!({ "success": true, "data": detail })))
}

// ── Admin ──────────────────────────────────────────────────────────────────

pub async fn admin_list_preschools(
    State(state): State<AppState>,
    principal: AdminPrincipal,
    ApiQuery(query): ApiQuery<AdminListPreschoolsQuery>,
) -> ApiResult<Json<Value>> {
    require_role(&principal, AdminRole::Viewer)?;
    let filter = ListingFilter {
        city: query.city,
        verified: query.verified,
        ..Default::default()
    };
    let page = Page::from_page_number(query.page, query.limit, DEFAULT_LIMIT);
    let (data, pagination) = PreschoolService::list(&state.db, &filter, page).await?;
    Ok(Json(json!({ "success": true, "data": data, "pagination": pagination })))
}

pub async fn create_preschool(
    State(state): State<AppState>,
    principal: AdminPrincipal,
    ApiJson(body): ApiJson<CreatePreschoolRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    require_role(&principal, AdminRole::Moderator)?;
    ApiError::check(body.validate())?;

    let created = PreschoolService::create(&state.db, &body).await?;
    let detail = PreschoolService::get_detail(&state.db, created.id).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": "Preschool created", "data": detail })),
    ))
}

pub async fn update_preschool(
    State(state): State<AppState>,
    principal: AdminPrincipal,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<UpdatePreschoolRequest>,
) -> ApiResult<Json<Value>> {
    require_role(&principal, AdminRole::Moderator)?;
    ApiError::check(body.validate())?;

    PreschoolService::update(&state.db, id, &body).await?;
    let detail = PreschoolService::get_detail(&state.db, id).await?;
    Ok(Json(json!({ "success": true, "message": "Preschool updated", "data": detail })))
}

pub async fn delete_preschool(
    State(state): State<AppState>,
    principal: AdminPrincipal,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    require_role(&principal, AdminRole::Admin)?;
    PreschoolService::delete(&state.db, id).await?;
    tracing::info!("preschool {id} deleted by {}", principal.email);
    Ok(Json(json!({ "success": true, "message": "Preschool deleted" })))
}
