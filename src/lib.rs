// Library exports for the binaries and integration tests
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod geo;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod validation;

use std::sync::Arc;

use sqlx::PgPool;

use config::Config;
use services::{email::EmailService, places::PlacesClient};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// None when REDIS_URL is unset; rate limiting is then skipped.
    pub redis: Option<redis::aio::MultiplexedConnection>,
    pub config: Arc<Config>,
    pub email: Option<Arc<EmailService>>,
    pub places: Option<Arc<PlacesClient>>,
}
