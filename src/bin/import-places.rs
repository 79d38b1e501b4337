//! Imports preschools around a location from Google Places.
//!
//! Usage:
//!   import-places --location "Koramangala, Bengaluru" [--radius 10000]
//!
//! Environment variables:
//!   DATABASE_URL             PostgreSQL connection string (required)
//!   GOOGLE_MAPS_API_KEY      Places API key (required)
//!   GOOGLE_PLACES_API_BASE   Override for the Maps API base URL

use anyhow::{Context, Result};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use preschool_api::{
    db,
    models::places::{ImportRequest, DEFAULT_IMPORT_RADIUS_M},
    services::{import::ImportService, places::PlacesClient},
};

#[derive(Parser)]
#[command(name = "import-places", about = "Import preschools from Google Places")]
struct Args {
    /// Address or locality to search around
    #[arg(long)]
    location: String,
    /// Search radius in meters
    #[arg(long, default_value_t = DEFAULT_IMPORT_RADIUS_M)]
    radius: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let request = ImportRequest {
        location: args.location,
        radius: Some(args.radius),
    };
    if let Some(err) = request.validate().into_iter().next() {
        anyhow::bail!("{}: {}", err.field, err.message);
    }

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL environment variable required")?;
    let api_key = std::env::var("GOOGLE_MAPS_API_KEY").context("GOOGLE_MAPS_API_KEY environment variable required")?;
    let api_base = std::env::var("GOOGLE_PLACES_API_BASE")
        .unwrap_or_else(|_| "https://maps.googleapis.com/maps/api".to_string());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("Failed to connect to database")?;
    db::run_migrations(&pool).await?;

    let places = PlacesClient::new(api_key, &api_base)?;
    let summary = ImportService::run(&pool, &places, request.location.trim(), request.radius_m())
        .await
        .map_err(|e| anyhow::anyhow!("Import failed: {e}"))?;

    println!(
        "Imported {} preschools, skipped {} ({} candidates)",
        summary.added, summary.skipped, summary.total
    );
    Ok(())
}
