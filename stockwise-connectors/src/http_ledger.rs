//! HTTP client for a remote inventory ledger service
//!
//! Implements the `InventoryLedger` port over a small JSON API:
//!
//! | Operation              | Request                                   | Success                  |
//! |------------------------|-------------------------------------------|--------------------------|
//! | `list_all_products`    | `GET {base}/products`                     | `200 [Product, ...]`     |
//! | `get_current_quantity` | `GET {base}/products/{s}/{i}/quantity`    | `200 {"quantity": n}`    |
//! | `set_quantity`         | `PUT {base}/products/{s}/{i}/quantity`    | `200` / `409 {"current"}`|
//! | `create_product`       | `POST {base}/products`                    | `201 Product` / `4xx`    |
//! | `health_check`         | `GET {base}/health`                       | `2xx`                    |
//!
//! # Failure mapping
//!
//! - No response within the timeout → `LedgerError::Timeout`
//! - Connection failure or 5xx → `LedgerError::Transport`
//! - 404 on a per-product path → `LedgerError::NotFound`
//! - Body that does not parse → `LedgerError::Malformed`
//!
//! A 409 on the quantity write is not an error; it is the conflict outcome.
//! A listing is posted without an item id; the 201 body carries the id the
//! ledger assigned.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, warn};

use stockwise_domain::{NewProduct, Product, ProductId, StockLevel};
use stockwise_store::{CreateOutcome, InventoryLedger, LedgerError, WriteOutcome};

// =============================================================================
// Constants
// =============================================================================

/// Default request timeout in milliseconds
const DEFAULT_TIMEOUT_MS: u64 = 5_000;

// =============================================================================
// Errors
// =============================================================================

/// Errors that can occur in the HTTP ledger client.
#[derive(Debug, Clone, Error)]
pub enum HttpLedgerError {
    /// HTTP request failed before a response arrived
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    /// Server answered with an unexpected status
    #[error("Ledger returned HTTP {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Request timed out
    #[error("Request timed out")]
    Timeout,

    /// Product path returned 404
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),
}

impl From<HttpLedgerError> for LedgerError {
    fn from(err: HttpLedgerError) -> Self {
        match err {
            HttpLedgerError::RequestFailed(msg) => LedgerError::Transport(msg),
            HttpLedgerError::UnexpectedStatus { status, body } => {
                LedgerError::Transport(format!("HTTP {}: {}", status, body))
            },
            HttpLedgerError::ParseError(msg) => LedgerError::Malformed(msg),
            HttpLedgerError::Timeout => LedgerError::Timeout,
            HttpLedgerError::ProductNotFound(id) => LedgerError::NotFound(id),
        }
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct QuantityResponse {
    quantity: u32,
}

#[derive(Debug, Serialize)]
struct SetQuantityRequest {
    expected_prior: u32,
    new_value: u32,
}

#[derive(Debug, Deserialize)]
struct ConflictResponse {
    current: u32,
}

#[derive(Debug, Deserialize)]
struct RejectionResponse {
    reason: String,
}

// =============================================================================
// HTTP Ledger
// =============================================================================

/// Inventory ledger reached over HTTP.
pub struct HttpLedger {
    /// HTTP client
    client: Client,
    /// Base URL without trailing slash
    base_url: String,
    /// Per-request time budget
    request_timeout: Duration,
}

impl HttpLedger {
    /// Create a client for the ledger at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }

    /// Create a client with a custom per-request timeout.
    pub fn with_timeout(base_url: impl Into<String>, request_timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
            request_timeout,
        }
    }

    /// The configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn quantity_url(&self, product_id: ProductId) -> String {
        format!(
            "{}/products/{}/{}/quantity",
            self.base_url, product_id.seller_id.0, product_id.item_id.0
        )
    }

    /// Send a request and return status plus body text.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<(StatusCode, String), HttpLedgerError> {
        let response = timeout(self.request_timeout, request.send())
            .await
            .map_err(|_| HttpLedgerError::Timeout)?
            .map_err(|e| HttpLedgerError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = timeout(self.request_timeout, response.text())
            .await
            .map_err(|_| HttpLedgerError::Timeout)?
            .map_err(|e| HttpLedgerError::RequestFailed(e.to_string()))?;

        debug!(%status, bytes = body.len(), "Ledger response");
        Ok((status, body))
    }
}

#[async_trait]
impl InventoryLedger for HttpLedger {
    async fn list_all_products(&self) -> Result<Vec<Product>, LedgerError> {
        let url = format!("{}/products", self.base_url);
        let (status, body) = self.send(self.client.get(&url)).await?;
        Ok(parse_product_list(status, &body)?)
    }

    async fn get_current_quantity(&self, product_id: ProductId) -> Result<StockLevel, LedgerError> {
        let (status, body) = self.send(self.client.get(self.quantity_url(product_id))).await?;
        Ok(parse_quantity(product_id, status, &body)?)
    }

    async fn set_quantity(
        &self,
        product_id: ProductId,
        expected_prior: StockLevel,
        new_value: StockLevel,
    ) -> Result<WriteOutcome, LedgerError> {
        let payload = SetQuantityRequest {
            expected_prior: expected_prior.get(),
            new_value: new_value.get(),
        };
        let request = self.client.put(self.quantity_url(product_id)).json(&payload);
        let (status, body) = self.send(request).await?;
        Ok(parse_write(product_id, status, &body)?)
    }

    async fn create_product(&self, product: NewProduct) -> Result<CreateOutcome, LedgerError> {
        let url = format!("{}/products", self.base_url);
        let (status, body) = self.send(self.client.post(&url).json(&product)).await?;
        Ok(parse_create(status, &body)?)
    }

    async fn health_check(&self) -> Result<(), LedgerError> {
        let url = format!("{}/health", self.base_url);
        let (status, body) = self.send(self.client.get(&url)).await?;
        if status.is_success() {
            Ok(())
        } else {
            warn!(%status, "Ledger health check failed");
            Err(unexpected(status, body).into())
        }
    }
}

// =============================================================================
// Response Parsing
// =============================================================================

fn unexpected(status: StatusCode, body: String) -> HttpLedgerError {
    HttpLedgerError::UnexpectedStatus {
        status: status.as_u16(),
        body,
    }
}

fn parse_json<T: for<'de> Deserialize<'de>>(body: &str) -> Result<T, HttpLedgerError> {
    serde_json::from_str(body).map_err(|e| HttpLedgerError::ParseError(e.to_string()))
}

fn parse_product_list(status: StatusCode, body: &str) -> Result<Vec<Product>, HttpLedgerError> {
    if !status.is_success() {
        return Err(unexpected(status, body.to_string()));
    }
    parse_json(body)
}

fn parse_quantity(product_id: ProductId, status: StatusCode, body: &str) -> Result<StockLevel, HttpLedgerError> {
    match status {
        StatusCode::NOT_FOUND => Err(HttpLedgerError::ProductNotFound(product_id)),
        s if s.is_success() => {
            let response: QuantityResponse = parse_json(body)?;
            Ok(StockLevel(response.quantity))
        },
        s => Err(unexpected(s, body.to_string())),
    }
}

fn parse_write(product_id: ProductId, status: StatusCode, body: &str) -> Result<WriteOutcome, HttpLedgerError> {
    match status {
        StatusCode::CONFLICT => {
            let response: ConflictResponse = parse_json(body)?;
            Ok(WriteOutcome::ConflictRejected {
                current: StockLevel(response.current),
            })
        },
        StatusCode::NOT_FOUND => Err(HttpLedgerError::ProductNotFound(product_id)),
        s if s.is_success() => Ok(WriteOutcome::Confirmed),
        s => Err(unexpected(s, body.to_string())),
    }
}

fn parse_create(status: StatusCode, body: &str) -> Result<CreateOutcome, HttpLedgerError> {
    if status.is_success() {
        let product: Product = parse_json(body)?;
        return Ok(CreateOutcome::Confirmed { product });
    }
    if status.is_client_error() {
        // Rejections without a reason body still count as rejections
        let reason = parse_json::<RejectionResponse>(body)
            .map(|r| r.reason)
            .unwrap_or_else(|_| format!("HTTP {}", status.as_u16()));
        return Ok(CreateOutcome::Rejected { reason });
    }
    Err(unexpected(status, body.to_string()))
}

// =============================================================================
// Tests
// =============================================================================
