//! HTTP surface presented to the dashboard.

pub mod error;
pub mod fans;
pub mod session;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::vault::Vault;

/// Name of the cookie holding the sealed credentials.
pub const COOKIE_NAME: &str = "atomsync_creds";

/// Session cookie lifetime: 24 hours.
pub const SESSION_MAX_AGE_SECS: i64 = 60 * 60 * 24;

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub vault: Vault,
    /// Mark the session cookie `Secure` (production deployments).
    pub secure_cookies: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/session",
            post(session::create_session).delete(session::destroy_session),
        )
        .route("/api/fans", get(fans::list_fans))
        .route("/api/fans/{id}/command", post(fans::send_command))
        .with_state(state)
}

/// Allow the dashboard origin to call the API with its cookie.
pub fn cors_layer(origin: &str) -> Result<CorsLayer, String> {
    let origin = HeaderValue::from_str(origin)
        .map_err(|e| format!("invalid CORS origin '{origin}': {e}"))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]))
}
