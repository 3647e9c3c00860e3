//! Catalog, download and counter handlers

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::body::{parse, ArtifactRequest};
use super::error::ApiError;
use super::{blocking, envelope, AppState};

pub async fn games(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    state.caller(&headers)?;

    match blocking(&state, |ctx| ctx.fulfillment.catalog()).await {
        Ok(catalog) => Ok(envelope(catalog.to_document()).into_response()),
        Err(mut e) => {
            e.message = format!("Failed to retrieve games: {}", e.message);
            Err(e)
        }
    }
}

pub async fn download(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let caller = state.caller(&headers)?;
    let artifact_id = parse::<ArtifactRequest>(&body)?.artifact_id();
    let account_id = caller.account_id;

    let fulfilled = blocking(&state, move |ctx| ctx.fulfillment.fulfill(account_id, &artifact_id)).await?;
    Ok((
        [
            (CONTENT_TYPE, fulfilled.content_type.to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", fulfilled.file_name),
            ),
        ],
        fulfilled.bytes,
    )
        .into_response())
}

pub async fn remove_download(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let caller = state.caller(&headers)?;
    let artifact_id = parse::<ArtifactRequest>(&body)?.artifact_id();
    let account_id = caller.account_id;

    blocking(&state, move |ctx| ctx.fulfillment.remove_download(account_id, &artifact_id)).await?;
    Ok(envelope("Download removed").into_response())
}

/// Counters are served under both `message` and the older `counts` key
pub async fn download_counts(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    state.caller(&headers)?;

    let counts = blocking(&state, |ctx| ctx.ledger.counters()).await?;
    Ok(Json(json!({ "success": true, "message": counts, "counts": counts })).into_response())
}
