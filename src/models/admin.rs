use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{
    error::FieldError,
    validation::{check_email, require_non_blank},
};

/// Ordered by privilege: a higher role may do everything a lower one can.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    Viewer,
    Moderator,
    Admin,
}

impl std::fmt::Display for AdminRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AdminRole::Viewer => "viewer",
            AdminRole::Moderator => "moderator",
            AdminRole::Admin => "admin",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for AdminRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "viewer" => Ok(AdminRole::Viewer),
            "moderator" => Ok(AdminRole::Moderator),
            "admin" => Ok(AdminRole::Admin),
            _ => Err(anyhow::anyhow!("Unknown role: {s}")),
        }
    }
}

/// DB row struct. Role is stored as constrained TEXT.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AdminUser {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: Option<String>,
    pub role: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminProfile {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub role: AdminRole,
    pub active: bool,
}

impl From<AdminUser> for AdminProfile {
    fn from(a: AdminUser) -> Self {
        Self {
            id: a.id,
            email: a.email,
            name: a.name,
            role: a.role.parse().unwrap_or(AdminRole::Viewer),
            active: a.active,
        }
    }
}

// Request/Response DTOs
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub admin: AdminProfile,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct CreateAdminRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub role: Option<AdminRole>,
}

pub const MIN_PASSWORD_LEN: usize = 8;

impl CreateAdminRequest {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        require_non_blank(&mut errors, "email", Some(&self.email));
        if !self.email.trim().is_empty() {
            check_email(&mut errors, "email", Some(&self.email));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.push(FieldError::new(
                "password",
                format!("must be at least {MIN_PASSWORD_LEN} characters"),
            ));
        }
        errors
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct UpdateAdminRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub role: Option<AdminRole>,
    pub active: Option<bool>,
}

impl UpdateAdminRequest {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_email(&mut errors, "email", self.email.as_deref());
        if let Some(p) = &self.password {
            if p.chars().count() < MIN_PASSWORD_LEN {
                errors.push(FieldError::new(
                    "password",
                    format!("must be at least {MIN_PASSWORD_LEN} characters"),
                ));
            }
        }
        errors
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BulkIdsRequest {
    pub ids: Vec<i64>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum BulkModel {
    Preschools,
    Reviews,
    Comparisons,
}

impl BulkModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkModel::Preschools => "preschools",
            BulkModel::Reviews => "reviews",
            BulkModel::Comparisons => "comparisons",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BulkDeleteRequest {
    pub model: BulkModel,
    pub ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
pub struct DashboardStats {
    pub preschools: i64,
    pub verified_preschools: i64,
    pub reviews: i64,
    pub pending_reviews: i64,
    pub comparisons: i64,
    pub admins: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_are_ordered_by_privilege() {
        assert!(AdminRole::Admin > AdminRole::Moderator);
        assert!(AdminRole::Moderator > AdminRole::Viewer);
    }

    #[test]
    fn role_round_trips_through_text() {
        for role in [AdminRole::Viewer, AdminRole::Moderator, AdminRole::Admin] {
            assert_eq!(role.to_string().parse::<AdminRole>().unwrap(), role);
        }
        assert!("owner".parse::<AdminRole>().is_err());
    }

    #[test]
    fn profile_never_contains_password_hash() {
        let user = AdminUser {
            id: 1,
            email: "admin@example.in".into(),
            password_hash: "$2b$12$secret".into(),
            name: None,
            role: "admin".into(),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert_eq!(AdminProfile::from(user).role, AdminRole::Admin);
    }

    #[test]
    fn short_password_is_rejected() {
        let req = CreateAdminRequest {
            email: "mod@example.in".into(),
            password: "short".into(),
            ..Default::default()
        };
        assert_eq!(req.validate()[0].field, "password");
    }

    #[test]
    fn bulk_model_is_closed_set() {
        let bad: Result<BulkDeleteRequest, _> =
            serde_json::from_str(r#"{"model":"admins","ids":[1]}"#);
        assert!(bad.is_err());
    }
}
