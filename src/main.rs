use std::{net::SocketAddr, sync::Arc};

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use preschool_api::{
    config::Config,
    db, routes,
    services::{email::EmailService, metrics, places::PlacesClient},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    info!("Database connected and migrations applied");

    let redis = match config.redis_url.as_deref() {
        Some(url) => match connect_redis(url).await {
            Ok(conn) => {
                info!("Redis connected");
                Some(conn)
            }
            Err(e) => {
                warn!("Redis unavailable, rate limiting disabled: {e:#}");
                None
            }
        },
        None => {
            info!("REDIS_URL not set, rate limiting disabled");
            None
        }
    };

    let email = EmailService::new(&config).map(Arc::new);
    if email.is_some() {
        info!("SMTP email service configured");
    } else {
        info!("SMTP not configured, email features disabled");
    }

    let places = match config.google_maps_api_key.clone() {
        Some(key) => Some(Arc::new(PlacesClient::new(key, &config.google_places_api_base)?)),
        None => {
            info!("GOOGLE_MAPS_API_KEY not set, Places import disabled");
            None
        }
    };

    metrics::start(pool.clone());

    let state = AppState {
        db: pool,
        redis,
        config: config.clone(),
        email,
        places,
    };
    let app = routes::router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Preschool directory API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

async fn connect_redis(url: &str) -> anyhow::Result<redis::aio::MultiplexedConnection> {
    let client = redis::Client::open(url)?;
    Ok(client.get_multiplexed_async_connection().await?)
}
