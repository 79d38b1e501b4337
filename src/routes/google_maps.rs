use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiQuery},
    middleware::auth::require_role,
    models::{
        admin::AdminRole,
        auth::AdminPrincipal,
        places::{ImportRequest, PlacesSearchQuery, SEARCH_RADIUS_M},
    },
    services::{import::ImportService, places::PlacesClient},
    AppState,
};

fn places_client(state: &AppState) -> ApiResult<Arc<PlacesClient>> {
    state
        .places
        .clone()
        .ok_or_else(|| ApiError::Unavailable("Google Maps API key is not configured".into()))
}

pub async fn fetch_from_google_maps(
    State(state): State<AppState>,
    principal: AdminPrincipal,
    ApiJson(body): ApiJson<ImportRequest>,
) -> ApiResult<Json<Value>> {
    require_role(&principal, AdminRole::Admin)?;
    ApiError::check(body.validate())?;
    let places = places_client(&state)?;

    let summary = ImportService::run(&state.db, &places, body.location.trim(), body.radius_m()).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Preschools fetched from Google Maps",
        "data": summary,
    })))
}

pub async fn search_google_places(
    State(state): State<AppState>,
    principal: AdminPrincipal,
    ApiQuery(query): ApiQuery<PlacesSearchQuery>,
) -> ApiResult<Json<Value>> {
    require_role(&principal, AdminRole::Admin)?;
    let (Some(keyword), Some(location)) = (
        query.query.as_deref().map(str::trim).filter(|s| !s.is_empty()),
        query.location.as_deref().map(str::trim).filter(|s| !s.is_empty()),
    ) else {
        return Err(ApiError::BadRequest("Query and location are required".into()));
    };
    let places = places_client(&state)?;

    let center = places
        .geocode(location)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Location not found".into()))?;
    let results = places.nearby_raw(center, SEARCH_RADIUS_M, keyword).await?;
    Ok(Json(json!({ "success": true, "data": results })))
}
