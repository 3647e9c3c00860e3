//! HTTP API
//!
//! Handlers are thin: resolve the session, parse the body, run the core call
//! on the blocking pool, and wrap the result in the response envelope.

mod account;
mod admin;
pub mod body;
mod downloads;
pub mod error;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use tracing::error;

use gamedrop_core::domain::result::Result as CoreResult;
use gamedrop_core::GamedropContext;

use crate::session::{token_from_headers, SessionStore};
use error::ApiError;

const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub context: Arc<GamedropContext>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(context: Arc<GamedropContext>) -> Self {
        Self {
            context,
            sessions: Arc::new(SessionStore::new()),
        }
    }

    /// The authenticated caller, or 401
    fn caller(&self, headers: &HeaderMap) -> Result<Caller, ApiError> {
        let token = token_from_headers(headers).ok_or_else(ApiError::unauthorized)?;
        let account_id = self.sessions.resolve(&token).ok_or_else(ApiError::unauthorized)?;
        Ok(Caller { token, account_id })
    }
}

struct Caller {
    token: String,
    account_id: i64,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/login", post(account::login))
        .route("/api/register", post(account::register))
        .route("/api/logout", post(account::logout))
        .route("/api/currentUser", get(account::current_user))
        .route("/api/updateProfile", post(account::update_profile))
        .route("/api/games", get(downloads::games))
        .route("/api/download", post(downloads::download))
        .route("/api/removeDownload", post(downloads::remove_download))
        .route("/api/downloadCounts", get(downloads::download_counts))
        .route("/admin/userRequests", get(admin::user_requests))
        .route("/admin/approveUser", post(admin::approve_user))
        .route("/admin/declineUser", post(admin::decline_user))
        .route("/healthz", get(healthz))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

async fn healthz() -> Json<JsonValue> {
    Json(json!({ "status": "ok" }))
}

/// Run a core call on the blocking pool
async fn blocking<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&GamedropContext) -> CoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let context = Arc::clone(&state.context);
    tokio::task::spawn_blocking(move || f(&context))
        .await
        .map_err(|e| {
            error!(error = %e, "blocking task failed");
            ApiError::internal()
        })?
        .map_err(ApiError::from)
}

/// `{success: true, message}` body
fn envelope<T: Serialize>(message: T) -> Json<JsonValue> {
    Json(json!({ "success": true, "message": message }))
}
