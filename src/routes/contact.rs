use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::{ApiError, ApiResult},
    extract::ApiJson,
    middleware::{client_ip::ClientIp, rate_limit::check_rate_limit},
    models::contact::ContactRequest,
    services::{email::Inquiry, preschools::PreschoolService},
    AppState,
};

fn inquiry(body: &ContactRequest) -> Inquiry<'_> {
    Inquiry {
        name: body.name.trim(),
        email: body.email.trim(),
        phone: body.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()),
        message: body.message.trim(),
    }
}

pub async fn submit_contact(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    ApiJson(body): ApiJson<ContactRequest>,
) -> ApiResult<Json<Value>> {
    ApiError::check(body.validate())?;
    check_rate_limit(state.redis.as_ref(), &format!("contact:form:{ip}"), 5, 3600).await?;

    match state.email.as_ref() {
        Some(email) => {
            if let Err(e) = email.send_contact_message(&state.config.contact_email, &inquiry(&body)).await {
                tracing::error!("Failed to send contact message: {e:#}");
            }
        }
        None => tracing::info!("SMTP not configured, contact message from {} not emailed", body.email),
    }

    Ok(Json(json!({ "success": true, "message": "Thank you for contacting us" })))
}

pub async fn contact_school(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<ContactRequest>,
) -> ApiResult<Json<Value>> {
    ApiError::check(body.validate())?;
    check_rate_limit(state.redis.as_ref(), &format!("contact:school:{ip}"), 5, 3600).await?;

    let preschool = PreschoolService::find(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Preschool not found".into()))?;
    let to = preschool
        .email
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .unwrap_or(&state.config.contact_email);

    match state.email.as_ref() {
        Some(email) => {
            if let Err(e) = email.send_school_inquiry(to, &preschool.name, &inquiry(&body)).await {
                tracing::error!("Failed to send inquiry for preschool {id}: {e:#}");
            }
        }
        None => tracing::info!("SMTP not configured, inquiry for preschool {id} not emailed"),
    }

    Ok(Json(json!({
        "success": true,
        "message": format!("Your inquiry has been sent to {}", preschool.name),
    })))
}
