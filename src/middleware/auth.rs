use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    error::ApiError,
    models::{
        admin::AdminRole,
        auth::{AdminPrincipal, Claims},
    },
    AppState,
};

impl FromRequestParts<AppState> for AdminPrincipal {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".into()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization header format".into()))?;

        let principal = decode_access_token(token, &state.config.jwt_secret)
            .map_err(|_| ApiError::Unauthorized("Invalid or expired token".into()))?;

        // A token outlives deactivation and role changes; the row is the source of truth.
        let row: Option<(bool, String)> =
            sqlx::query_as("SELECT active, role FROM admin_users WHERE id = $1")
                .bind(principal.admin_id)
                .fetch_optional(&state.db)
                .await?;

        match row {
            Some((true, role)) => Ok(AdminPrincipal {
                role: role.parse().unwrap_or(AdminRole::Viewer),
                ..principal
            }),
            _ => Err(ApiError::Unauthorized("Account is inactive".into())),
        }
    }
}

pub fn issue_access_token(
    admin_id: i64,
    email: &str,
    role: AdminRole,
    secret: &str,
    ttl_hours: i64,
) -> anyhow::Result<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: admin_id.to_string(),
        email: email.to_string(),
        role,
        iat: now.timestamp() as usize,
        exp: (now + chrono::Duration::hours(ttl_hours)).timestamp() as usize,
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

pub fn decode_access_token(token: &str, secret: &str) -> Result<AdminPrincipal, anyhow::Error> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let data = decode::<Claims>(token, &key, &validation)?;
    let claims = data.claims;

    Ok(AdminPrincipal {
        admin_id: claims.sub.parse()?,
        email: claims.email,
        role: claims.role,
    })
}

/// Rejects principals below `min` with 403.
pub fn require_role(principal: &AdminPrincipal, min: AdminRole) -> Result<(), ApiError> {
    if principal.role >= min {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Insufficient permissions".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn token_round_trip() {
        let token = issue_access_token(7, "mod@example.in", AdminRole::Moderator, SECRET, 24).unwrap();
        let principal = decode_access_token(&token, SECRET).unwrap();
        assert_eq!(principal.admin_id, 7);
        assert_eq!(principal.email, "mod@example.in");
        assert_eq!(principal.role, AdminRole::Moderator);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_access_token(1, "a@example.in", AdminRole::Admin, SECRET, 24).unwrap();
        assert!(decode_access_token(&token, "other").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = issue_access_token(1, "a@example.in", AdminRole::Admin, SECRET, -2).unwrap();
        assert!(decode_access_token(&token, SECRET).is_err());
    }

    #[test]
    fn role_gate() {
        let viewer = AdminPrincipal { admin_id: 1, email: "v@example.in".into(), role: AdminRole::Viewer };
        assert!(require_role(&viewer, AdminRole::Viewer).is_ok());
        assert!(matches!(require_role(&viewer, AdminRole::Moderator), Err(ApiError::Forbidden(_))));
    }
}
