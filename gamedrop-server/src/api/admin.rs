//! Administrator handlers

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};

use super::body::{parse, UserRequest};
use super::error::ApiError;
use super::{blocking, envelope, AppState};

pub async fn user_requests(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    let admin_id = state.caller(&headers)?.account_id;

    let pending = blocking(&state, move |ctx| ctx.accounts.pending_requests(admin_id)).await?;
    Ok(envelope(pending).into_response())
}

pub async fn approve_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let admin_id = state.caller(&headers)?.account_id;
    let target_id = parse::<UserRequest>(&body)?.user_id()?;

    blocking(&state, move |ctx| ctx.accounts.approve(admin_id, target_id)).await?;
    Ok(envelope("User approved").into_response())
}

pub async fn decline_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let admin_id = state.caller(&headers)?.account_id;
    let target_id = parse::<UserRequest>(&body)?.user_id()?;

    blocking(&state, move |ctx| ctx.accounts.decline(admin_id, target_id)).await?;
    state.sessions.remove_account(target_id);
    Ok(envelope("User declined").into_response())
}
