//! Speaker queue server - Entry Point
//!
//! Loads the configuration and starts accepting connections.

use tracing_subscriber::EnvFilter;

use speakerq::{serve, AppError, Config};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=speakerq=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("speakerq=info")),
        )
        .init();

    let config = Config::from_env()?;
    serve(&config).await
}
