//! In-memory session table
//!
//! A session is an opaque random token mapped to an account id. Tokens reach
//! the server either as the `gamedrop_session` cookie or as an
//! `Authorization: Bearer` header. Sessions do not survive a restart.

use std::collections::HashMap;
use std::sync::RwLock;

use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::HeaderMap;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "gamedrop_session";

#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, i64>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session for an account and return its token
    pub fn create(&self, account_id: i64) -> String {
        let token = Uuid::new_v4().simple().to_string();
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.insert(token.clone(), account_id);
        }
        token
    }

    pub fn resolve(&self, token: &str) -> Option<i64> {
        self.sessions.read().ok()?.get(token).copied()
    }

    pub fn remove(&self, token: &str) -> Option<i64> {
        self.sessions.write().ok()?.remove(token)
    }

    /// Drop every session of an account
    pub fn remove_account(&self, account_id: i64) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.retain(|_, id| *id != account_id);
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }
}

/// Session token carried by a request, bearer header first
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        if let Some(token) = value.strip_prefix("Bearer ") {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value establishing a session
pub fn session_cookie(token: &str) -> String {
    format!("{}={}; HttpOnly; Path=/; SameSite=Lax", SESSION_COOKIE, token)
}

/// `Set-Cookie` value clearing the session cookie
pub fn expired_cookie() -> String {
    format!("{}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}
