//! HTTP API.
//!
//! Read endpoints export the tree as flattened per-language JSON and are
//! open to any origin. Write endpoints apply mutations and imports and are
//! guarded by the API key when one is configured.

mod auth;
mod error;
mod handlers;

pub use auth::{actor_from_headers, constant_time_compare, API_KEY_HEADER, USER_EMAIL_HEADER};
pub use error::ApiError;

use crate::state::StateManager;
use axum::http::{header, Method};
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub manager: StateManager,
    pub api_key: Option<Arc<str>>,
}

impl AppState {
    pub fn new(manager: StateManager, api_key: Option<String>) -> Self {
        Self {
            manager,
            api_key: api_key.map(Arc::from),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let exports = Router::new()
        .route("/api/translations", get(handlers::languages))
        .route("/api/translations/all", get(handlers::export_all))
        .route("/api/translations/page/:page_key", get(handlers::export_page))
        .route("/api/translations/:lang", get(handlers::export_language))
        .layer(cors);

    let writes = Router::new()
        .route("/api/mutations", post(handlers::apply_mutation))
        .route("/api/import/:lang", post(handlers::import))
        .route("/api/backup", post(handlers::backup))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_api_key));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/import/:lang/preview", post(handlers::preview_import))
        .route("/api/activity", get(handlers::activity))
        .route("/api/search", get(handlers::search))
        .merge(exports)
        .merge(writes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
