//! Login, registration and profile handlers

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::info;

use gamedrop_core::{Account, NewAccount, ProfileUpdate};

use super::body::{parse, LoginRequest, RegisterRequest};
use super::error::ApiError;
use super::{blocking, envelope, AppState};
use crate::session::{expired_cookie, session_cookie, token_from_headers};

/// Open a session for `account` and build the response carrying it
fn with_session(state: &AppState, status: StatusCode, message: &str, account: &Account) -> Response {
    let token = state.sessions.create(account.id);
    (
        status,
        [(SET_COOKIE, session_cookie(&token))],
        Json(json!({
            "success": true,
            "message": message,
            "token": token,
            "account": account.summary(),
        })),
    )
        .into_response()
}

pub async fn login(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let req: LoginRequest = parse(&body)?;
    let identity = req.identity.unwrap_or_default();
    let credential = req.credential.unwrap_or_default();

    let account = blocking(&state, move |ctx| ctx.accounts.authenticate(&identity, &credential)).await?;
    info!(account_id = account.id, "session opened");
    Ok(with_session(&state, StatusCode::OK, "Login successful", &account))
}

pub async fn register(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let req: RegisterRequest = parse(&body)?;
    let new_account = NewAccount::from(req);

    let account = blocking(&state, move |ctx| ctx.accounts.register(&new_account)).await?;
    Ok(with_session(&state, StatusCode::CREATED, "Registration successful", &account))
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = token_from_headers(&headers) {
        state.sessions.remove(&token);
    }
    (
        [(SET_COOKIE, expired_cookie())],
        envelope("Logged out"),
    )
        .into_response()
}

pub async fn current_user(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    let caller = state.caller(&headers)?;
    let account_id = caller.account_id;

    match blocking(&state, move |ctx| ctx.accounts.current(account_id)).await {
        Ok(account) => Ok(envelope(account.summary()).into_response()),
        Err(e) => {
            // Declined or deleted accounts lose their session
            if e.status == StatusCode::NOT_FOUND {
                state.sessions.remove(&caller.token);
            }
            Err(e)
        }
    }
}

pub async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let caller = state.caller(&headers)?;
    let update: ProfileUpdate = parse(&body)?;
    let account_id = caller.account_id;

    let account = blocking(&state, move |ctx| ctx.accounts.update_profile(account_id, &update))
        .await
        .map_err(|e| {
            if e.status == StatusCode::NOT_FOUND {
                state.sessions.remove(&caller.token);
            }
            e
        })?;
    Ok(envelope(account.summary()).into_response())
}
