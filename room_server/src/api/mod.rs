//! HTTP/WebSocket API for the poker room.
//!
//! # Endpoints
//!
//! ```text
//! GET  /health                         - Health check
//! GET  /api/v1/tables                  - List tables
//! GET  /api/v1/tables/{id}             - Table snapshot (?player_id= reveals own cards)
//! POST /api/v1/tables/{id}/sit         - Sit down with a buy-in
//! POST /api/v1/tables/{id}/leave       - Leave, cashing out the stack
//! POST /api/v1/tables/{id}/action      - Fold, check, call, bet, raise or go all-in
//! POST /api/v1/tables/{id}/rebuy       - Add chips between hands
//! POST /api/v1/tables/{id}/start       - Deal the next hand
//! POST /api/v1/tables/{id}/award       - Award the pot at showdown
//! GET  /ws/{id}                        - Live game_update stream
//! ```
//!
//! Players identify themselves with a `player_id` field; authentication is
//! handled in front of this service.
//!
//! # Example
//!
//! ```rust,no_run
//! use room_server::api::{AppState, create_router};
//! use poker_room::db::{MemoryTableStore, MemoryWallet};
//! use poker_room::table::{EventBus, TableManager};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = TableManager::new(
//!     Arc::new(MemoryTableStore::new()),
//!     Arc::new(MemoryWallet::new()),
//!     Arc::new(EventBus::new()),
//! );
//! let app = create_router(AppState::new(Arc::new(manager), None));
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:6969").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod tables;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use poker_room::db::Database;
use poker_room::table::TableManager;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers and WebSocket connections.
#[derive(Clone)]
pub struct AppState {
    pub table_manager: Arc<TableManager>,
    /// `None` when running on the in-memory stores
    pub database: Option<Database>,
}

impl AppState {
    pub fn new(table_manager: Arc<TableManager>, database: Option<Database>) -> Self {
        Self {
            table_manager,
            database,
        }
    }
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/tables", get(tables::list_tables))
        .route("/tables/{table_id}", get(tables::get_table))
        .route("/tables/{table_id}/sit", post(tables::sit_down))
        .route("/tables/{table_id}/leave", post(tables::leave_table))
        .route("/tables/{table_id}/action", post(tables::take_action))
        .route("/tables/{table_id}/rebuy", post(tables::rebuy))
        .route("/tables/{table_id}/start", post(tables::start_hand))
        .route("/tables/{table_id}/award", post(tables::award_pot));

    Router::new()
        .route("/health", get(health_check))
        .route("/ws/{table_id}", get(websocket::websocket_handler))
        .nest("/api/v1", v1_routes)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the database (if any) answers, `503` otherwise.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match &state.database {
        Some(db) => Some(db.health_check().await.is_ok()),
        None => None,
    };
    let healthy = database.unwrap_or(true);
    let active_tables = state.table_manager.active_table_count().await;

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
        "tables": { "active_count": active_tables },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
