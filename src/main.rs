// src/main.rs

use cert_portal::config::{Config, LogConfig};
use cert_portal::routes;
use cert_portal::seed::seed_demo_data;
use cert_portal::state::AppState;
use cert_portal::store::open_store;
use dotenvy::dotenv;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file (if present)
    dotenv().ok();

    // Logging first, so configuration warnings are not lost
    let log = LogConfig::from_env();

    let file_appender = tracing_appender::rolling::daily(&log.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&log.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Load configuration from environment
    let config = Config::from_env();

    let store = open_store(&config).await?;

    if config.seed_demo_data {
        seed_demo_data(store.as_ref())
            .await
            .unwrap_or_else(|e| tracing::error!("Failed to seed demo data: {:?}", e));
    }

    tracing::info!("Login scheme: {:?}", config.login_scheme);

    let addr = config.bind_addr;
    let state = AppState::new(store, config);

    // Create the Axum application router
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
