//! Request bodies
//!
//! Bodies are parsed by hand rather than through the `Json` extractor so a
//! missing or malformed body yields the usual error envelope.

use axum::body::Bytes;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use gamedrop_core::NewAccount;

use super::error::{ApiError, MISSING_JSON};

pub fn parse<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::bad_request(MISSING_JSON));
    }
    serde_json::from_slice(body).map_err(|_| ApiError::bad_request(MISSING_JSON))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default, alias = "username")]
    pub identity: Option<String>,
    #[serde(default, alias = "password")]
    pub credential: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default, alias = "username")]
    pub identity: Option<String>,
    #[serde(default, alias = "password")]
    pub credential: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, alias = "email")]
    pub contact_email: Option<String>,
}

impl From<RegisterRequest> for NewAccount {
    fn from(req: RegisterRequest) -> Self {
        NewAccount::new(
            req.identity.unwrap_or_default(),
            req.credential.unwrap_or_default(),
            req.display_name.unwrap_or_default(),
            req.contact_email.unwrap_or_default(),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactRequest {
    #[serde(default)]
    pub game_id: Option<JsonValue>,
}

impl ArtifactRequest {
    /// The artifact id as text; empty when absent
    pub fn artifact_id(&self) -> String {
        match &self.game_id {
            Some(JsonValue::String(s)) => s.clone(),
            Some(JsonValue::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    #[serde(default)]
    pub user_id: Option<JsonValue>,
}

impl UserRequest {
    pub fn user_id(&self) -> Result<i64, ApiError> {
        match &self.user_id {
            Some(JsonValue::Number(n)) => n
                .as_i64()
                .ok_or_else(|| ApiError::bad_request("Invalid userId")),
            Some(JsonValue::String(s)) if !s.trim().is_empty() => s
                .trim()
                .parse()
                .map_err(|_| ApiError::bad_request("Invalid userId")),
            _ => Err(ApiError::bad_request("Missing userId")),
        }
    }
}
