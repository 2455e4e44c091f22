//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the backend contract over generated ids and
//! payloads.

use proptest::prelude::*;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

use crate::cache::{
    hash_length, CacheBackend, Expiry, KeyNormalizer, MemoryPool, PoolBackend, MAX_KEY_LENGTH,
    PERMANENT_TTL_SECS, RESERVED_CHARS, TIMESTAMP_THRESHOLD,
};

// == Strategies ==
/// Any cache id, including non-ASCII and reserved characters
fn any_cid_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9_.:/@(){}\\\\-]{0,200}",
        "\\PC{0,80}",
    ]
}

fn bin_strategy() -> impl Strategy<Value = String> {
    "[a-z_]{1,12}"
}

fn payload_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,64}".prop_map(Value::from),
        (any::<bool>(), "[a-z]{1,8}").prop_map(|(flag, name)| json!({"flag": flag, "name": name})),
    ]
}

fn backend() -> PoolBackend {
    PoolBackend::new("render", Arc::new(MemoryPool::new(1_000)), "site")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // Normalized keys are bounded, ASCII and free of reserved characters
    #[test]
    fn prop_normalized_key_is_bounded(bin in bin_strategy(), cid in any_cid_strategy()) {
        let key = KeyNormalizer::new("site", &bin).normalize(&cid);

        prop_assert!(key.len() <= MAX_KEY_LENGTH, "key too long: {}", key.len());
        prop_assert!(key.is_ascii());
        prop_assert!(!key.chars().any(|c| RESERVED_CHARS.contains(&c)));
    }

    #[test]
    fn prop_normalize_is_deterministic(cid in any_cid_strategy()) {
        let normalizer = KeyNormalizer::new("site", "render");
        prop_assert_eq!(normalizer.normalize(&cid), normalizer.normalize(&cid));
    }

    // Ids sharing the kept prefix but differing afterwards stay distinct
    #[test]
    fn prop_truncated_ids_stay_unique(
        tail_a in "[a-z0-9]{1,40}",
        tail_b in "[a-z0-9]{1,40}",
    ) {
        prop_assume!(tail_a != tail_b);
        let normalizer = KeyNormalizer::new("site", "render");
        let shared = "s".repeat(MAX_KEY_LENGTH - hash_length() + 10);

        let a = normalizer.normalize(&format!("{}{}", shared, tail_a));
        let b = normalizer.normalize(&format!("{}{}", shared, tail_b));
        prop_assert_ne!(a, b);
    }

    #[test]
    fn prop_set_then_get(cid in any_cid_strategy(), data in payload_strategy()) {
        let backend = backend();
        backend.set(&cid, data.clone(), Expiry::Permanent, &[]).unwrap();

        let record = backend.get(&cid, false).unwrap();
        prop_assert!(record.is_some());
        let record = record.unwrap();
        prop_assert_eq!(record.data, data);
        prop_assert_eq!(record.cid, cid);
    }

    #[test]
    fn prop_invalidate_then_get(cid in any_cid_strategy(), data in payload_strategy()) {
        let backend = backend();
        backend.set(&cid, data.clone(), Expiry::Permanent, &[]).unwrap();
        backend.invalidate(&cid).unwrap();

        prop_assert!(backend.get(&cid, false).unwrap().is_none());
        let stale = backend.get(&cid, true).unwrap().unwrap();
        prop_assert!(!stale.valid);
        prop_assert_eq!(stale.data, data);
    }

    #[test]
    fn prop_delete_is_idempotent(cid in any_cid_strategy(), set_first in any::<bool>()) {
        let backend = backend();
        if set_first {
            backend.set(&cid, json!(1), Expiry::Permanent, &[]).unwrap();
        }

        prop_assert!(backend.delete(&cid).is_ok());
        prop_assert!(backend.delete(&cid).is_ok());
        prop_assert!(backend.get(&cid, true).unwrap().is_none());
    }

    // get_multiple leaves exactly the misses in the id list
    #[test]
    fn prop_get_multiple_leaves_misses(
        present in prop::collection::hash_set("[a-z]{1,6}", 0..10),
        absent in prop::collection::hash_set("[A-Z]{1,6}", 0..10),
    ) {
        let backend = backend();
        for cid in &present {
            backend.set(cid, json!(cid), Expiry::Permanent, &[]).unwrap();
        }

        let mut cids: Vec<String> = present.iter().chain(absent.iter()).cloned().collect();
        let found = backend.get_multiple(&mut cids, false).unwrap();

        prop_assert_eq!(found.len(), present.len());
        for cid in &present {
            prop_assert!(found.contains_key(cid));
        }
        let mut left = cids.clone();
        left.sort();
        let mut expected: Vec<String> = absent.into_iter().collect();
        expected.sort();
        prop_assert_eq!(left, expected);
    }

    // Values above the threshold are absolute, others are relative
    #[test]
    fn prop_expiry_conversion(raw in 0i64..4_000_000_000) {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let at = Expiry::Raw(raw).resolve_at(now).timestamp();

        if raw > TIMESTAMP_THRESHOLD {
            prop_assert_eq!(at, raw);
        } else {
            prop_assert_eq!(at, now.timestamp() + raw);
        }
        prop_assert_eq!(
            Expiry::Permanent.resolve_at(now).timestamp(),
            now.timestamp() + PERMANENT_TTL_SECS
        );
    }
}
