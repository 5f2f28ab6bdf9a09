use dotenvy::dotenv;
use std::path::Path;
use step_ordering::{
    config::{database, settings::AppSettings, venue},
    context::AppContext,
    core::{schedule, seed},
    errors::Result,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal since env vars can be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Resolve settings
    let settings = AppSettings::from_env();
    info!(
        database_url = %settings.database_url,
        venue_config = %settings.venue_config_path,
        "Loaded settings"
    );

    // 4. Initialize database
    ensure_sqlite_parent_dir(&settings.database_url)?;
    let db = database::create_connection(&settings.database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database schema ready."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Seed reference data from the venue file
    let venue_config = venue::load_config(&settings.venue_config_path)
        .inspect_err(|e| error!("Failed to load venue configuration: {}", e))?;
    let summary = seed::seed_from_config(&db, &venue_config)
        .await
        .inspect_err(|e| error!("Failed to seed venue data: {}", e))?;

    // 6. Build the shared context the transport layer hands to every operation
    let ctx = AppContext::new(db, venue_config.offset()?);
    let tables = schedule::list_active_tables(&ctx.database).await?;
    let hours = schedule::list_operating_hours(&ctx.database).await?;

    info!(
        active_tables = tables.len(),
        open_weekdays = hours.len(),
        seeded = ?summary,
        now = %ctx.now().with_timezone(&ctx.venue_offset),
        "Ordering and reservation core ready"
    );
    Ok(())
}

/// Creates the directory of a file-backed `SQLite` URL so `mode=rwc` can create the file.
fn ensure_sqlite_parent_dir(database_url: &str) -> Result<()> {
    let Some(rest) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = rest.split('?').next().unwrap_or_default();
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
