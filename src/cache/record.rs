//! Cache Record Module
//!
//! The envelope stored in the pool for every cache entry, and the expiry
//! policy that turns caller-supplied expiry values into absolute times.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CacheError, Result};

/// Raw expiry value callers use for "never expires".
pub const PERMANENT: i64 = -1;

/// Raw values above this are read as Unix timestamps, not durations.
pub const TIMESTAMP_THRESHOLD: i64 = 1_000_000_000;

/// Lifetime given to permanent records (365 days); pools have no
/// infinite items.
pub const PERMANENT_TTL_SECS: i64 = 60 * 60 * 24 * 365;

// == Expiry ==
/// Caller-facing expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum Expiry {
    /// Kept for [`PERMANENT_TTL_SECS`]
    #[default]
    Permanent,
    /// Raw value: a Unix timestamp when above [`TIMESTAMP_THRESHOLD`],
    /// otherwise seconds from now
    Raw(i64),
}

impl Expiry {
    /// Absolute expiry computed against `now`.
    pub fn resolve_at(self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Expiry::Permanent => now + Duration::seconds(PERMANENT_TTL_SECS),
            Expiry::Raw(value) if value > TIMESTAMP_THRESHOLD => Utc
                .timestamp_opt(value, 0)
                .single()
                .unwrap_or(now + Duration::seconds(PERMANENT_TTL_SECS)),
            // Anything at or below zero is already expired
            Expiry::Raw(seconds) => now + Duration::seconds(seconds.max(-1)),
        }
    }

    pub fn resolve(self) -> DateTime<Utc> {
        self.resolve_at(Utc::now())
    }
}

impl From<i64> for Expiry {
    fn from(value: i64) -> Self {
        if value == PERMANENT {
            Expiry::Permanent
        } else {
            Expiry::Raw(value)
        }
    }
}

impl From<Expiry> for i64 {
    fn from(expiry: Expiry) -> Self {
        match expiry {
            Expiry::Permanent => PERMANENT,
            Expiry::Raw(value) => value,
        }
    }
}

// == Cache Record ==
/// A cache entry as returned to callers and stored in the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Caller's cache id, before normalization
    pub cid: String,
    /// Opaque payload
    pub data: Value,
    /// When the record was written
    pub created: DateTime<Utc>,
    /// Absolute expiry
    pub expires_at: DateTime<Utc>,
    /// Expiry as the caller gave it
    pub expire: Expiry,
    pub tags: BTreeSet<String>,
    /// False once soft-invalidated
    pub valid: bool,
}

impl CacheRecord {
    /// Creates a valid record, resolving `expire` against `now`.
    pub fn new<I, S>(
        cid: impl Into<String>,
        data: Value,
        expire: Expiry,
        tags: I,
        now: DateTime<Utc>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cid: cid.into(),
            data,
            created: now,
            expires_at: expire.resolve_at(now),
            expire,
            tags: tags.into_iter().map(Into::into).collect(),
            valid: true,
        }
    }

    /// Serializes the record into the value stored in the pool.
    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self)
            .map_err(|e| CacheError::Internal(format!("cannot serialize record '{}': {}", self.cid, e)))
    }

    /// Reads a pool value back, returning `None` when it is not
    /// record-shaped.
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}
