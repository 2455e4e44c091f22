//! Request DTOs for the cache HTTP API
//!
//! Defines the structure of incoming HTTP request bodies.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::cache::{Expiry, SetItem};

/// Request body for `PUT /bins/:bin/items/:cid`
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// Payload to store
    pub data: Value,
    /// Raw expiry; `-1` or absent means permanent
    #[serde(default)]
    pub expire: Expiry,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SetRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        validate_tags(&self.tags)
    }
}

/// Request body for `POST /bins/:bin/items`
#[derive(Debug, Clone, Deserialize)]
pub struct SetMultipleRequest {
    pub items: BTreeMap<String, SetItem>,
}

impl SetMultipleRequest {
    /// Checks every cid and every item's tags.
    pub fn validate(&self) -> Option<String> {
        self.items
            .iter()
            .find_map(|(cid, item)| validate_cid(cid).or_else(|| validate_tags(&item.tags)))
    }
}

/// Request body for `POST /bins/:bin/lookup`
#[derive(Debug, Clone, Deserialize)]
pub struct LookupRequest {
    pub cids: Vec<String>,
    #[serde(default)]
    pub allow_invalid: bool,
}

/// Request body for the batch delete and invalidate endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct CidsRequest {
    pub cids: Vec<String>,
}

/// Query string for `GET /bins/:bin/items/:cid`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetQuery {
    #[serde(default)]
    pub allow_invalid: bool,
}

/// Validates a cid taken from a request.
pub fn validate_cid(cid: &str) -> Option<String> {
    if cid.is_empty() {
        return Some("Cache id cannot be empty".to_string());
    }
    None
}

fn validate_tags(tags: &[String]) -> Option<String> {
    if tags.iter().any(|tag| tag.is_empty()) {
        return Some("Tags cannot be empty".to_string());
    }
    None
}

/// Validates a bin name taken from a request.
pub fn validate_bin(bin: &str) -> Option<String> {
    if bin.is_empty() {
        return Some("Bin name cannot be empty".to_string());
    }
    if !bin.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Some("Bin name may only contain letters, numbers, '_' and '-'".to_string());
    }
    None
}
