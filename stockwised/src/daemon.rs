//! Daemon: Main runtime orchestrator.
//!
//! The Daemon ties together all components:
//! - Inventory ledger (HTTP, or a seeded in-memory ledger in test)
//! - Session registry (one cart and catalog per shopper)
//! - Event Bus (internal communication)
//! - API Server (HTTP endpoints)
//!
//! # Lifecycle
//!
//! 1. Load configuration
//! 2. Connect to the ledger and check it is reachable
//! 3. Start API server
//! 4. Main event loop (log checkouts and refreshes)
//! 5. Graceful shutdown on SIGINT

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use stockwise_connectors::HttpLedger;
use stockwise_domain::{Category, Price, Product, ProductId, StockLevel};
use stockwise_store::{InventoryLedger, MemoryLedger};

use crate::api::{create_router, ApiState};
use crate::config::{Config, Environment};
use crate::error::{DaemonError, DaemonResult};
use crate::event_bus::{DaemonEvent, EventBus};
use crate::sessions::SessionRegistry;

// =============================================================================
// Daemon
// =============================================================================

/// The main Stockwise daemon.
pub struct Daemon {
    /// Configuration
    config: Config,
    /// Open sessions
    registry: Arc<SessionRegistry>,
    /// Event bus
    event_bus: Arc<EventBus>,
    /// Cancels the API server on shutdown
    shutdown: CancellationToken,
}

impl Daemon {
    /// Create a daemon over a seeded in-memory ledger (for testing/development).
    pub fn new_stub(config: Config) -> DaemonResult<Self> {
        let ledger = Arc::new(MemoryLedger::with_products(demo_products()?));
        Self::new(config, ledger)
    }

    /// Create a daemon for the configured environment.
    ///
    /// The test environment runs against the seeded in-memory ledger; every
    /// other environment needs `STOCKWISE_LEDGER_URL`.
    pub fn from_config(config: Config) -> DaemonResult<Self> {
        if config.environment == Environment::Test {
            return Self::new_stub(config);
        }

        let url = config
            .ledger
            .url
            .clone()
            .ok_or_else(|| DaemonError::Config("Ledger URL not configured".to_string()))?;
        let ledger = Arc::new(HttpLedger::with_timeout(
            url,
            Duration::from_millis(config.ledger.timeout_ms),
        ));
        Self::new(config, ledger)
    }

    /// Create a daemon over any ledger.
    pub fn new(config: Config, ledger: Arc<dyn InventoryLedger>) -> DaemonResult<Self> {
        let registry = Arc::new(SessionRegistry::new(ledger, config.exec_config()?));

        Ok(Self {
            config,
            registry,
            event_bus: Arc::new(EventBus::new(1000)),
            shutdown: CancellationToken::new(),
        })
    }

    /// The session registry.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// The event bus.
    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Run the daemon.
    ///
    /// This method blocks until shutdown is requested (SIGINT or a
    /// `Shutdown` event).
    pub async fn run(self) -> DaemonResult<()> {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            environment = %self.config.environment,
            "Starting Stockwise daemon"
        );

        // 1. Probe the ledger; sessions still open if it is down
        self.check_ledger().await;

        // 2. Start API server
        let api_addr = self.start_api_server().await?;
        info!(%api_addr, "API server started");

        // 3. Subscribe to event bus
        let mut event_receiver = self.event_bus.subscribe();

        // 4. Main event loop
        info!("Entering main event loop");
        loop {
            tokio::select! {
                Some(event_result) = event_receiver.recv() => {
                    match event_result {
                        Ok(DaemonEvent::Shutdown) => {
                            info!("Shutdown event received");
                            break;
                        }
                        Ok(event) => self.handle_event(event),
                        Err(lag_msg) => {
                            warn!(%lag_msg, "Event receiver lagged");
                        }
                    }
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        // 5. Graceful shutdown
        self.shutdown().await;

        Ok(())
    }

    /// Log whether the ledger answers a health check.
    async fn check_ledger(&self) -> bool {
        match self.registry.ledger().health_check().await {
            Ok(()) => {
                info!("Ledger reachable");
                true
            },
            Err(e) => {
                warn!(error = %e, "Ledger unreachable at startup");
                false
            },
        }
    }

    /// Start the API server.
    async fn start_api_server(&self) -> DaemonResult<SocketAddr> {
        let state = Arc::new(ApiState {
            registry: self.registry.clone(),
            event_bus: self.event_bus.clone(),
        });

        let router = create_router(state);
        let addr = format!("{}:{}", self.config.api.host, self.config.api.port);

        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            DaemonError::Config(format!("Failed to bind to {}: {}", addr, e))
        })?;

        let local_addr = listener.local_addr().map_err(|e| {
            DaemonError::Config(format!("Failed to get local address: {}", e))
        })?;

        // Spawn the server task
        let token = self.shutdown.clone();
        tokio::spawn(async move {
            let serve = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await });
            if let Err(e) = serve.await {
                error!(error = %e, "API server error");
            }
        });

        Ok(local_addr)
    }

    /// Handle an event from the event bus.
    fn handle_event(&self, event: DaemonEvent) {
        match event {
            DaemonEvent::SessionOpened { session_id, generation } => {
                info!(%session_id, %generation, "Session opened");
            },

            DaemonEvent::CheckoutSettled(summary) => {
                if summary.unsettled > 0 {
                    warn!(
                        session_id = %summary.session_id,
                        confirmed = summary.confirmed,
                        unsettled = summary.unsettled,
                        "Checkout left lines in the cart"
                    );
                } else {
                    info!(
                        session_id = %summary.session_id,
                        confirmed = summary.confirmed,
                        "Checkout fully settled"
                    );
                }
            },

            DaemonEvent::CatalogRefreshed { session_id, generation } => {
                info!(%session_id, %generation, "Catalog refreshed");
            },

            DaemonEvent::Shutdown => {},
        }
    }

    /// Graceful shutdown.
    async fn shutdown(&self) {
        info!("Initiating graceful shutdown");

        // Carts are memory-resident; open sessions are dropped with the process
        self.shutdown.cancel();

        let open_sessions = self.registry.count().await;
        info!(open_sessions, "Shutdown complete");
    }
}

/// Products seeded into the in-memory ledger.
fn demo_products() -> DaemonResult<Vec<Product>> {
    let product = |seller: i64,
                   item: i64,
                   name: &str,
                   category: Category,
                   price: Decimal,
                   stock: u32|
     -> DaemonResult<Product> {
        Ok(Product {
            id: ProductId::new(seller, item),
            name: name.to_string(),
            category,
            unit_price: Price::new(price)?,
            available: StockLevel(stock),
            description: String::new(),
            image: None,
        })
    };

    Ok(vec![
        product(1, 1, "Monstera", Category::Plants, dec!(24.00), 12)?,
        product(1, 2, "Snake plant", Category::Plants, dec!(18.50), 8)?,
        product(2, 1, "Oak side table", Category::Furniture, dec!(129.00), 3)?,
        product(2, 2, "Reading lamp", Category::Furniture, dec!(45.00), 5)?,
        product(3, 1, "Cast iron skillet", Category::Kitchen, dec!(39.90), 10)?,
        product(3, 2, "Teapot", Category::Kitchen, dec!(22.00), 1)?,
    ])
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_daemon_stub_creation() {
        let daemon = Daemon::new_stub(Config::test()).unwrap();

        assert_eq!(daemon.registry().count().await, 0);
        assert!(daemon.check_ledger().await);
    }

    #[tokio::test]
    async fn test_stub_sessions_see_demo_catalog() {
        let daemon = Daemon::new_stub(Config::test()).unwrap();

        let session = daemon.registry().open().await;
        assert_eq!(session.catalog().len(), 6);
    }

    #[test]
    fn test_non_test_environment_needs_ledger_url() {
        let config = Config::default();
        assert!(matches!(Daemon::from_config(config), Err(DaemonError::Config(_))));
    }

    #[tokio::test]
    async fn test_daemon_api_server_start() {
        let daemon = Daemon::new_stub(Config::test()).unwrap();

        let addr = daemon.start_api_server().await.unwrap();
        assert!(addr.port() > 0);

        let client = reqwest::Client::new();
        let response = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .unwrap();

        assert!(response.status().is_success());

        daemon.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_event_stops_run() {
        let daemon = Daemon::new_stub(Config::test()).unwrap();
        let bus = daemon.event_bus().clone();

        let handle = tokio::spawn(daemon.run());

        // Wait for the main loop to subscribe
        while bus.receiver_count() == 0 {
            tokio::task::yield_now().await;
        }
        bus.send(DaemonEvent::Shutdown);

        handle.await.unwrap().unwrap();
    }
}
