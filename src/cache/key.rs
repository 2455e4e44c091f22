//! Key Normalizer Module
//!
//! Maps arbitrary cache ids onto bounded ASCII pool keys.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::cache::MAX_KEY_LENGTH;

/// Namespace segment placed between the site prefix and the bin name.
pub const BIN_NAMESPACE: &str = "bin";

/// Site prefix used when the configured one is empty.
pub const DEFAULT_SITE_PREFIX: &str = "bc";

/// Characters the pool's key syntax reserves.
pub const RESERVED_CHARS: [char; 8] = ['{', '}', '(', ')', '/', '\\', '@', ':'];

// == Key Normalizer ==
/// Builds pool keys of the form `<site>.bin.<bin>.<cid>` for a single bin.
///
/// Keys that are non-ASCII or longer than the maximum are replaced by (or
/// suffixed with) a SHA-256 digest of the full candidate, so truncation never
/// merges two distinct ids.
#[derive(Debug, Clone)]
pub struct KeyNormalizer {
    /// `<site>.bin.<bin>.`
    prefix: String,
    max_length: usize,
}

impl KeyNormalizer {
    pub fn new(site_prefix: &str, bin: &str) -> Self {
        Self::with_max_length(site_prefix, bin, MAX_KEY_LENGTH)
    }

    /// Same as [`KeyNormalizer::new`] with a custom bound.
    ///
    /// The bound must leave room for the digest suffix.
    pub fn with_max_length(site_prefix: &str, bin: &str, max_length: usize) -> Self {
        let site = if site_prefix.is_empty() {
            DEFAULT_SITE_PREFIX
        } else {
            site_prefix
        };

        Self {
            prefix: format!("{}.{}.{}.", site, BIN_NAMESPACE, bin),
            max_length: max_length.max(hash_length()),
        }
    }

    // == Normalize ==
    /// Maps `cid` to a pool key.
    ///
    /// The result is at most `max_length` bytes, pure ASCII, and contains
    /// none of [`RESERVED_CHARS`].
    pub fn normalize(&self, cid: &str) -> String {
        let candidate = format!("{}{}", self.prefix, cid);
        let is_ascii = candidate.is_ascii();

        if is_ascii && candidate.len() <= self.max_length {
            return replace_reserved(&candidate);
        }

        let hash = hash_base64(&candidate);
        if !is_ascii {
            return replace_reserved(&hash);
        }

        // ASCII, so byte slicing lands on a char boundary
        let keep = self.max_length - hash.len();
        replace_reserved(&format!("{}{}", &candidate[..keep], hash))
    }
}

/// Unpadded URL-safe base64 of the SHA-256 digest of `input`.
pub fn hash_base64(input: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(input.as_bytes()))
}

/// Length of [`hash_base64`] output.
pub const fn hash_length() -> usize {
    // 32 digest bytes, 4 chars per 3 bytes, no padding
    (32 * 4 + 2) / 3
}

fn replace_reserved(key: &str) -> String {
    key.chars()
        .map(|c| if RESERVED_CHARS.contains(&c) { '_' } else { c })
        .collect()
}
