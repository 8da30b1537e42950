//! Stockwise Daemon
//!
//! Serves shopping sessions (cart, catalog, checkout) over HTTP.
//!
//! # Usage
//!
//! ```bash
//! # Start against a seeded in-memory ledger
//! STOCKWISE_ENV=test cargo run -p stockwised
//!
//! # Start against a ledger service
//! STOCKWISE_LEDGER_URL=http://ledger:9000 STOCKWISE_API_PORT=8081 cargo run -p stockwised
//! ```
//!
//! # Environment Variables
//!
//! - `STOCKWISE_ENV`: Environment (test, development, production)
//! - `STOCKWISE_API_HOST`: API host (default: 0.0.0.0)
//! - `STOCKWISE_API_PORT`: API port (default: 8080)
//! - `STOCKWISE_LEDGER_URL`: Ledger base URL (required outside test)
//! - `STOCKWISE_LEDGER_TIMEOUT_MS`: Per-call ledger timeout (default: 5000)
//! - `STOCKWISE_REFRESH_TIMEOUT_MS`: Catalog refresh timeout (default: 10000)
//! - `STOCKWISE_MAX_CONFLICT_RETRIES`: Retries after a write conflict, 0 or 1 (default: 1)

use stockwised::{Config, Daemon};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("stockwised=info".parse()?))
        .init();

    // Load configuration
    let config = Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        api_host = %config.api.host,
        api_port = config.api.port,
        ledger_url = config.ledger.url.as_deref().unwrap_or("memory"),
        "Stockwise Daemon"
    );

    // Create and run daemon
    let daemon = Daemon::from_config(config)?;
    daemon.run().await?;

    Ok(())
}
