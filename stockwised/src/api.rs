//! HTTP API for the Stockwise daemon.
//!
//! Provides REST endpoints for:
//! - Health check
//! - Opening and closing shopping sessions
//! - Cart edits and checkout
//! - Catalog browsing and refresh
//! - Seller product listing

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use stockwise_domain::{
    CategoryFilter, CheckoutReport, Generation, NewProduct, Product, ProductId, Quantity,
    SellerId, StockLevel,
};
use stockwise_engine::EngineError;
use stockwise_exec::{CartView, ExecError};
use stockwise_store::CreateOutcome;

use crate::error::DaemonError;
use crate::event_bus::{CheckoutSummary, DaemonEvent, EventBus};
use crate::sessions::SessionRegistry;

// =============================================================================
// API State
// =============================================================================

/// Shared state for API handlers.
pub struct ApiState {
    pub registry: Arc<SessionRegistry>,
    pub event_bus: Arc<EventBus>,
}

type ApiResult<T> = Result<T, (StatusCode, Json<ErrorResponse>)>;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Response after opening a session.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub generation: Generation,
}

/// Request to add units of a product to the cart.
#[derive(Debug, Deserialize)]
pub struct AddLineRequest {
    pub seller_id: i64,
    pub item_id: i64,
    pub quantity: u32,
}

/// Accepted add: the line's new quantity and the catalog it was checked against.
///
/// `exceeds_observed` warns that the line asks for more than the catalog
/// showed; settlement makes the real call.
#[derive(Debug, Serialize, Deserialize)]
pub struct AddReceipt {
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub generation: Generation,
    pub observed: StockLevel,
    pub exceeds_observed: bool,
}

/// Catalog filters. Both are optional.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub category: Option<String>,
    pub seller_id: Option<i64>,
}

/// Catalog view.
#[derive(Debug, Serialize, Deserialize)]
pub struct CatalogResponse {
    pub generation: Generation,
    pub fetched_at: DateTime<Utc>,
    pub products: Vec<Product>,
}

/// Response after a manual refresh.
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub generation: Generation,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// =============================================================================
// Router
// =============================================================================

/// Create the API router.
pub fn create_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/sessions", post(open_session_handler))
        .route("/sessions/:id", delete(close_session_handler))
        .route("/sessions/:id/cart", get(cart_handler).post(add_line_handler))
        .route("/sessions/:id/cart/:seller_id/:item_id", delete(remove_line_handler))
        .route("/sessions/:id/checkout", post(checkout_handler))
        .route("/sessions/:id/catalog", get(catalog_handler))
        .route("/sessions/:id/catalog/refresh", post(refresh_handler))
        .route("/sessions/:id/products", post(create_product_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint.
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Open a new session.
async fn open_session_handler(
    State(state): State<Arc<ApiState>>,
) -> (StatusCode, Json<SessionResponse>) {
    let session = state.registry.open().await;
    let generation = session.catalog().generation();

    state.event_bus.send(DaemonEvent::SessionOpened {
        session_id: session.id(),
        generation,
    });

    (
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id: session.id(),
            created_at: session.created_at(),
            generation,
        }),
    )
}

/// Close a session, discarding its cart.
async fn close_session_handler(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.registry.close(id).await.map_err(to_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Current cart lines and totals.
async fn cart_handler(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CartView>> {
    let session = state.registry.get(id).await.map_err(to_error_response)?;
    Ok(Json(session.cart()))
}

/// Add units of a product to the cart.
async fn add_line_handler(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<AddLineRequest>,
) -> ApiResult<Json<AddReceipt>> {
    let session = state.registry.get(id).await.map_err(to_error_response)?;

    let quantity = Quantity::new(req.quantity).map_err(|e| to_error_response(e.into()))?;
    let product_id = ProductId::new(req.seller_id, req.item_id);

    let decision = session
        .add_line(product_id, quantity)
        .map_err(|e| to_error_response(e.into()))?;

    Ok(Json(AddReceipt {
        product_id,
        quantity: decision.resulting_quantity,
        generation: decision.generation,
        observed: decision.observed,
        exceeds_observed: decision.exceeds_observed,
    }))
}

/// Remove a product's line. Succeeds whether or not the line existed.
async fn remove_line_handler(
    State(state): State<Arc<ApiState>>,
    Path((id, seller_id, item_id)): Path<(Uuid, i64, i64)>,
) -> ApiResult<StatusCode> {
    let session = state.registry.get(id).await.map_err(to_error_response)?;
    session.remove_line(ProductId::new(seller_id, item_id));
    Ok(StatusCode::NO_CONTENT)
}

/// Settle the cart against the ledger.
async fn checkout_handler(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CheckoutReport>> {
    let session = state.registry.get(id).await.map_err(to_error_response)?;

    let report = session.checkout().await.map_err(|e| to_error_response(e.into()))?;

    if !report.lines.is_empty() {
        state.event_bus.send(DaemonEvent::CheckoutSettled(CheckoutSummary {
            session_id: id,
            confirmed: report.confirmed().count(),
            unsettled: report.unsettled().count(),
            refreshed_to: report.refreshed_to,
            settled_at: Utc::now(),
        }));
    }
    if let Some(generation) = report.refreshed_to {
        state.event_bus.send(DaemonEvent::CatalogRefreshed {
            session_id: id,
            generation,
        });
    }

    Ok(Json(report))
}

/// Browse the installed catalog snapshot. Never calls the ledger.
async fn catalog_handler(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<CatalogQuery>,
) -> ApiResult<Json<CatalogResponse>> {
    let session = state.registry.get(id).await.map_err(to_error_response)?;
    let snapshot = session.catalog();

    let filter = query
        .category
        .as_deref()
        .map(CategoryFilter::parse)
        .unwrap_or_default();

    let mut products = snapshot.filter_by_category(&filter);
    if let Some(seller) = query.seller_id {
        products.retain(|p| p.id.seller_id == SellerId(seller));
    }

    Ok(Json(CatalogResponse {
        generation: snapshot.generation(),
        fetched_at: snapshot.fetched_at(),
        products,
    }))
}

/// Refresh the session's catalog from the ledger.
async fn refresh_handler(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RefreshResponse>> {
    let session = state.registry.get(id).await.map_err(to_error_response)?;

    let generation = session.refresh().await.map_err(|e| to_error_response(e.into()))?;

    state.event_bus.send(DaemonEvent::CatalogRefreshed {
        session_id: id,
        generation,
    });

    Ok(Json(RefreshResponse { generation }))
}

/// List a new product (seller flow).
async fn create_product_handler(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    Json(product): Json<NewProduct>,
) -> ApiResult<(StatusCode, Json<CreateOutcome>)> {
    let session = state.registry.get(id).await.map_err(to_error_response)?;

    let outcome = session
        .create_product(product)
        .await
        .map_err(|e| to_error_response(e.into()))?;

    let status = match &outcome {
        CreateOutcome::Confirmed { product } => {
            info!(session_id = %id, product_id = %product.id, "Product listed via API");
            state.event_bus.send(DaemonEvent::CatalogRefreshed {
                session_id: id,
                generation: session.catalog().generation(),
            });
            StatusCode::CREATED
        },
        CreateOutcome::Rejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    };

    Ok((status, Json(outcome)))
}

// =============================================================================
// Helpers
// =============================================================================

fn to_error_response(error: DaemonError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &error {
        DaemonError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        DaemonError::Exec(ExecError::Reconcile(EngineError::UnknownProduct { .. })) => {
            StatusCode::NOT_FOUND
        },
        DaemonError::Exec(ExecError::LedgerUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        DaemonError::Exec(ExecError::Refresh(_))
        | DaemonError::Exec(ExecError::Ledger(_))
        | DaemonError::Ledger(_) => StatusCode::BAD_GATEWAY,
        DaemonError::Exec(ExecError::Config(_)) | DaemonError::Config(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        },
        DaemonError::Exec(ExecError::Domain(_)) | DaemonError::Domain(_) => StatusCode::BAD_REQUEST,
    };

    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};
    use stockwise_domain::{Category, Price};
    use stockwise_exec::ExecConfig;
    use stockwise_store::MemoryLedger;
    use tower::ServiceExt;

    fn fern(available: u32) -> Product {
        Product {
            id: ProductId::new(1, 1),
            name: "Fern".to_string(),
            category: Category::Plants,
            unit_price: Price::new(dec!(12.50)).unwrap(),
            available: StockLevel(available),
            description: String::new(),
            image: None,
        }
    }

    fn create_test_app(ledger: Arc<MemoryLedger>) -> (Router, Arc<EventBus>) {
        let registry = Arc::new(SessionRegistry::new(ledger, ExecConfig::default()));
        let event_bus = Arc::new(EventBus::new(100));
        let state = Arc::new(ApiState {
            registry,
            event_bus: event_bus.clone(),
        });
        (create_router(state), event_bus)
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn open_session(app: &Router) -> String {
        let (status, body) = call(app, "POST", "/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        body["session_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (app, _) = create_test_app(Arc::new(MemoryLedger::new()));

        let (status, body) = call(&app, "GET", "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let (app, _) = create_test_app(Arc::new(MemoryLedger::new()));

        let uri = format!("/sessions/{}/cart", Uuid::now_v7());
        let (status, _) = call(&app, "GET", &uri, None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_add_then_checkout() {
        let ledger = Arc::new(MemoryLedger::with_products(vec![fern(5)]));
        let (app, bus) = create_test_app(ledger.clone());
        let mut events = bus.subscribe();
        let id = open_session(&app).await;

        let (status, receipt) = call(
            &app,
            "POST",
            &format!("/sessions/{}/cart", id),
            Some(json!({"seller_id": 1, "item_id": 1, "quantity": 2})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(receipt["quantity"], 2);
        assert_eq!(receipt["generation"], 1);

        let (status, cart) = call(&app, "GET", &format!("/sessions/{}/cart", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cart["total_units"], 2);

        let (status, report) = call(&app, "POST", &format!("/sessions/{}/checkout", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["lines"][0]["outcome"]["status"], "confirmed");
        assert_eq!(ledger.stock(ProductId::new(1, 1)), Some(StockLevel(3)));

        // SessionOpened, then CheckoutSettled
        assert!(matches!(events.try_recv(), Some(Ok(DaemonEvent::SessionOpened { .. }))));
        match events.try_recv() {
            Some(Ok(DaemonEvent::CheckoutSettled(summary))) => {
                assert_eq!(summary.confirmed, 1);
                assert_eq!(summary.unsettled, 0);
            },
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_add_error_statuses() {
        let (app, _) = create_test_app(Arc::new(MemoryLedger::with_products(vec![fern(1)])));
        let id = open_session(&app).await;
        let uri = format!("/sessions/{}/cart", id);

        let (status, _) = call(&app, "POST", &uri, Some(json!({"seller_id": 9, "item_id": 9, "quantity": 1}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, "POST", &uri, Some(json!({"seller_id": 1, "item_id": 1, "quantity": 0}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_add_beyond_observed_stock_is_flagged() {
        let (app, _) = create_test_app(Arc::new(MemoryLedger::with_products(vec![fern(1)])));
        let id = open_session(&app).await;
        let uri = format!("/sessions/{}/cart", id);

        let (status, receipt) = call(&app, "POST", &uri, Some(json!({"seller_id": 1, "item_id": 1, "quantity": 2}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(receipt["quantity"], 2);
        assert_eq!(receipt["observed"], 1);
        assert_eq!(receipt["exceeds_observed"], true);

        let (_, report) = call(&app, "POST", &format!("/sessions/{}/checkout", id), None).await;
        assert_eq!(report["lines"][0]["outcome"]["status"], "rejected");
        assert_eq!(report["lines"][0]["outcome"]["reason"], "insufficient_stock");
    }

    #[tokio::test]
    async fn test_remove_line_is_always_no_content() {
        let (app, _) = create_test_app(Arc::new(MemoryLedger::with_products(vec![fern(3)])));
        let id = open_session(&app).await;

        let uri = format!("/sessions/{}/cart/1/1", id);
        let (status, _) = call(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        call(
            &app,
            "POST",
            &format!("/sessions/{}/cart", id),
            Some(json!({"seller_id": 1, "item_id": 1, "quantity": 1})),
        )
        .await;
        let (status, _) = call(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, cart) = call(&app, "GET", &format!("/sessions/{}/cart", id), None).await;
        assert_eq!(cart["lines"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_catalog_filters() {
        let mut lamp = fern(2);
        lamp.id = ProductId::new(2, 1);
        lamp.name = "Lamp".to_string();
        lamp.category = Category::Furniture;

        let (app, _) = create_test_app(Arc::new(MemoryLedger::with_products(vec![fern(3), lamp])));
        let id = open_session(&app).await;

        let (status, all) = call(&app, "GET", &format!("/sessions/{}/catalog", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(all["products"].as_array().unwrap().len(), 2);

        let (_, plants) = call(&app, "GET", &format!("/sessions/{}/catalog?category=plants", id), None).await;
        assert_eq!(plants["products"].as_array().unwrap().len(), 1);
        assert_eq!(plants["products"][0]["name"], "Fern");

        let (_, seller) = call(&app, "GET", &format!("/sessions/{}/catalog?seller_id=2", id), None).await;
        assert_eq!(seller["products"].as_array().unwrap().len(), 1);
        assert_eq!(seller["products"][0]["name"], "Lamp");
    }

    #[tokio::test]
    async fn test_refresh_bumps_generation() {
        let (app, _) = create_test_app(Arc::new(MemoryLedger::new()));
        let id = open_session(&app).await;

        let (status, body) = call(&app, "POST", &format!("/sessions/{}/catalog/refresh", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["generation"], 2);
    }

    #[tokio::test]
    async fn test_create_product_then_browse() {
        let (app, _) = create_test_app(Arc::new(MemoryLedger::new()));
        let id = open_session(&app).await;

        let listing = json!({
            "seller_id": 7,
            "name": "Kettle",
            "category": "kitchen",
            "unit_price": "30.00",
            "initial_stock": 4
        });

        let uri = format!("/sessions/{}/products", id);
        let (status, body) = call(&app, "POST", &uri, Some(listing.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["result"], "confirmed");
        assert_eq!(body["product"]["id"]["item_id"], 7001);

        let (_, catalog) = call(&app, "GET", &format!("/sessions/{}/catalog", id), None).await;
        assert_eq!(catalog["generation"], 2);
        assert_eq!(catalog["products"][0]["name"], "Kettle");

        let (status, body) = call(&app, "POST", &uri, Some(listing)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["product"]["id"]["item_id"], 7002);

        let nameless = json!({
            "seller_id": 7,
            "name": " ",
            "category": "kitchen",
            "unit_price": "1.00",
            "initial_stock": 1
        });
        let (status, _) = call(&app, "POST", &uri, Some(nameless)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_close_session() {
        let (app, _) = create_test_app(Arc::new(MemoryLedger::new()));
        let id = open_session(&app).await;

        let (status, _) = call(&app, "DELETE", &format!("/sessions/{}", id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = call(&app, "GET", &format!("/sessions/{}/cart", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
