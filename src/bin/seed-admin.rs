//! Creates the first admin account, or resets an existing one.
//!
//! Usage:
//!   seed-admin --email admin@example.com --password 'S3cret!pass' [--name "Site Admin"] [--role admin]
//!
//! Environment variables:
//!   DATABASE_URL   PostgreSQL connection string (required)

use anyhow::{Context, Result};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use preschool_api::{
    db,
    models::admin::{AdminRole, MIN_PASSWORD_LEN},
    services::admins::AdminService,
};

#[derive(Parser)]
#[command(name = "seed-admin", about = "Create or reset an admin account")]
struct Args {
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
    #[arg(long)]
    name: Option<String>,
    /// viewer, moderator or admin
    #[arg(long, default_value = "admin")]
    role: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let role: AdminRole = args.role.parse()?;
    if args.password.chars().count() < MIN_PASSWORD_LEN {
        anyhow::bail!("Password must be at least {MIN_PASSWORD_LEN} characters");
    }

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL environment variable required")?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .context("Failed to connect to database")?;
    db::run_migrations(&pool).await?;

    let admin = AdminService::upsert(&pool, &args.email, &args.password, args.name.as_deref(), role).await?;
    tracing::info!("Admin {} ready with role {}", admin.email, admin.role);
    Ok(())
}
