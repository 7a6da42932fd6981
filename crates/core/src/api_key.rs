//! API key authentication.
//!
//! Keys are accepted from three carriers, checked in order:
//! 1. `Authorization: Bearer <key>`
//! 2. `?api_key=<key>` query parameter
//! 3. `X-API-Key: <key>` header
//!
//! API keys are simpler than OAuth but weaker; prefer OAuth for public clients.

use crate::{Authenticator, Credentials};
use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

/// Environment variable holding a comma-separated list of keys
pub const API_KEYS_ENV: &str = "MCP_API_KEYS";

pub const API_KEY_QUERY_PARAM: &str = "api_key";
pub const API_KEY_HEADER: &str = "x-api-key";

/// In-memory set of valid API keys
#[derive(Debug, Default)]
pub struct ApiKeyHandler {
    valid_keys: RwLock<HashSet<String>>,
}

impl ApiKeyHandler {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let valid_keys: HashSet<String> = normalize_keys(keys).into_iter().collect();

        if valid_keys.is_empty() {
            tracing::warn!("No API keys configured - all requests will be rejected");
        }

        Self {
            valid_keys: RwLock::new(valid_keys),
        }
    }

    /// Check a single key against the set
    pub fn contains(&self, api_key: &str) -> bool {
        self.valid_keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(api_key)
    }

    pub fn add_key(&self, api_key: impl Into<String>) {
        self.valid_keys
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(api_key.into());
        tracing::info!("New API key added");
    }

    /// Revoke a key; unknown keys are ignored
    pub fn revoke_key(&self, api_key: &str) {
        self.valid_keys
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(api_key);
        tracing::info!("API key revoked");
    }

    pub fn len(&self) -> usize {
        self.valid_keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Split a comma-separated key list, trimming entries and dropping blanks
pub fn parse_keys(raw: &str) -> Vec<String> {
    normalize_keys(raw.split(','))
}

/// Trim each key and drop the blank ones
pub fn normalize_keys<I, S>(keys: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    keys.into_iter()
        .map(|k| {
            let k: String = k.into();
            k.trim().to_string()
        })
        .filter(|k| !k.is_empty())
        .collect()
}

#[async_trait::async_trait]
impl Authenticator for ApiKeyHandler {
    fn scheme(&self) -> &'static str {
        "api_key"
    }

    async fn authenticate(&self, credentials: &Credentials<'_>) -> bool {
        if let Some(key) = credentials.bearer_token().filter(|k| !k.is_empty()) {
            if self.contains(key) {
                tracing::info!("Request authenticated via Authorization header");
                return true;
            }
        }

        if let Some(key) = credentials
            .query_param(API_KEY_QUERY_PARAM)
            .filter(|k| !k.is_empty())
        {
            if self.contains(&key) {
                tracing::info!("Request authenticated via query parameter");
                return true;
            }
        }

        if let Some(key) = credentials.header(API_KEY_HEADER).filter(|k| !k.is_empty()) {
            if self.contains(key) {
                tracing::info!("Request authenticated via X-API-Key header");
                return true;
            }
        }

        tracing::warn!("Authentication failed: Invalid or missing API key");
        false
    }
}
