//! HTTP API for the chat front end.
//!
//! # Endpoints
//!
//! ```text
//! GET  /health                            - Store health (public)
//! POST /api/v1/events                     - Dispatch an intent
//! GET  /api/v1/accounts/{id}              - Account with balances and stats
//! GET  /api/v1/accounts/{id}/wagers       - Recent wagers
//! GET  /api/v1/accounts/{id}/entries      - Recent ledger entries
//! ```
//!
//! Every `/api/v1` route requires `Authorization: Bearer <FRONTEND_TOKEN>`.
//!
//! # Example
//!
//! ```rust,no_run
//! use bs_server::api::{AppState, create_router};
//! use betsmile::admin::AdminIds;
//! use betsmile::bot::Dispatcher;
//! use betsmile::ledger::MemoryStore;
//! use betsmile::notify::LogNotifier;
//! use betsmile::payments::{CryptoCloudClient, CryptoCloudConfig};
//! use betsmile::settings::{GameSettings, SettingsHandle};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new());
//! let provider = Arc::new(CryptoCloudClient::new(CryptoCloudConfig::new("key", "shop"))?);
//! let dispatcher = Dispatcher::new(
//!     store.clone(),
//!     SettingsHandle::new(GameSettings::default()),
//!     provider,
//!     Arc::new(LogNotifier),
//!     AdminIds::new([1]),
//! );
//!
//! let app = create_router(AppState::new(Arc::new(dispatcher), store, "front-end-token"));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod accounts;
pub mod events;
pub mod middleware;
pub mod request_id;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use betsmile::bot::Dispatcher;
use betsmile::ledger::AccountStore;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub accounts: Arc<dyn AccountStore>,
    pub frontend_token: Arc<str>,
}

impl AppState {
    pub fn new<S: AccountStore + 'static>(
        dispatcher: Arc<Dispatcher>,
        store: Arc<S>,
        frontend_token: &str,
    ) -> Self {
        Self {
            dispatcher,
            accounts: store,
            frontend_token: Arc::from(frontend_token),
        }
    }
}

/// Create the API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/events", post(events::post_event))
        .route("/accounts/{account_id}", get(accounts::get_account))
        .route("/accounts/{account_id}/wagers", get(accounts::list_wagers))
        .route("/accounts/{account_id}/entries", get(accounts::list_entries))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::frontend_auth,
        ));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", v1_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check for monitoring and load balancers.
///
/// `200 OK` when the ledger store answers, `503 Service Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","version":"1.0.0","store":true,"timestamp":"2026-10-18T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let store_healthy = match state.accounts.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Health check failed: {e}");
            false
        }
    };

    let status_code = if store_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if store_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "store": store_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
