use assignment_scheduler::{
    api::{self, AppState},
    config::{self, database},
    core::status,
    errors::{Error, Result},
};
use dotenvy::dotenv;
use std::net::SocketAddr;
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

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the application configuration
    let app_config = config::load_app_config()
        .inspect_err(|e| error!("Critical error loading application configuration: {}", e))?;
    info!(scheduler = %app_config.scheduler.name, "Successfully processed application configuration.");

    let addr: SocketAddr = app_config
        .server
        .bind_address
        .parse()
        .map_err(|e| Error::Config {
            message: format!(
                "Invalid server.bind_address '{}': {e}",
                app_config.server.bind_address
            ),
        })?;

    // 4. Connect and create tables
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Seed the scheduler status row
    status::ensure_status_row(&db, &app_config.scheduler.name)
        .await
        .inspect_err(|e| error!("Failed to seed scheduler status: {}", e))?;

    // 6. Serve the API
    api::run_server(addr, AppState::new(db, app_config.scheduler)).await
}
