//! Create a staff account, or promote an existing user to staff.
//!
//! Usage:
//!   DATABASE_URL=... ./create-superuser --username chef --password 's3cret!' [--name "Chef"]
//!
//! The password may also come from STAFF_PASSWORD so it stays out of shell history.

use anyhow::Context;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use std::env;

use daily_menu_api::{db, services::auth::AuthService};

#[derive(Parser)]
#[command(name = "create-superuser", about = "Create or promote a staff user")]
struct Args {
    #[arg(long)]
    username: String,

    /// Falls back to STAFF_PASSWORD
    #[arg(long)]
    password: Option<String>,

    #[arg(long, default_value = "")]
    name: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let password = match args.password {
        Some(p) => p,
        None => env::var("STAFF_PASSWORD").context("--password or STAFF_PASSWORD required")?,
    };

    let database_url = env::var("DATABASE_URL").context("DATABASE_URL required")?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .context("Failed to connect to database")?;
    db::run_migrations(&pool).await?;

    let user = AuthService::upsert_staff(&pool, &args.username, &password, &args.name)
        .await
        .context("Failed to create staff user")?;

    tracing::info!("Staff user '{}' ready ({})", user.username, user.id);
    Ok(())
}
