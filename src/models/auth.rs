use serde::{Deserialize, Serialize};

use super::admin::AdminRole;

/// Claims embedded in the admin JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // admin id
    pub email: String,
    pub role: AdminRole,
    pub exp: usize,
    pub iat: usize,
}

/// Extracted from the validated JWT by the Axum extractor
#[derive(Debug, Clone)]
pub struct AdminPrincipal {
    pub admin_id: i64,
    pub email: String,
    pub role: AdminRole,
}
