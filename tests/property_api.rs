//! Property-based tests for request validation
//!
//! Tests the error contract of feature extraction over arbitrary subsets
//! of missing and invalid features, and numeric coercion of string values.

use claimscore::{
    error::PredictError,
    features::{coerce_value, extract_features},
    schema::{FEATURE_SCHEMA, NUM_FEATURES},
};
use proptest::prelude::*;
use proptest::sample::subsequence;
use serde_json::{json, Map, Value};

fn full_features() -> Map<String, Value> {
    FEATURE_SCHEMA
        .iter()
        .enumerate()
        .map(|(i, name)| ((*name).to_string(), json!(i)))
        .collect()
}

fn body(features: Map<String, Value>) -> Value {
    json!({ "features": Value::Object(features) })
}

fn schema_indices() -> impl Strategy<Value = Vec<usize>> {
    subsequence((0..NUM_FEATURES).collect::<Vec<_>>(), 1..=NUM_FEATURES)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_missing_subset_reported_in_schema_order(missing in schema_indices()) {
        let mut features = full_features();
        for &i in &missing {
            features.remove(FEATURE_SCHEMA[i]);
        }

        let err = extract_features(&body(features)).unwrap_err();
        let names: Vec<&str> = missing.iter().map(|&i| FEATURE_SCHEMA[i]).collect();
        prop_assert_eq!(
            err.client_message(),
            format!("Missing required features: {}", names.join(", "))
        );
    }

    #[test]
    fn prop_first_invalid_in_schema_order(invalid in schema_indices()) {
        let mut features = full_features();
        for &i in &invalid {
            features.insert(FEATURE_SCHEMA[i].to_string(), json!("not-a-float"));
        }

        let err = extract_features(&body(features)).unwrap_err();
        prop_assert_eq!(
            err,
            PredictError::InvalidValue { field: FEATURE_SCHEMA[invalid[0]].to_string() }
        );
    }

    #[test]
    fn prop_numeric_strings_equal_numbers(values in prop::collection::vec(-1e12f64..1e12, NUM_FEATURES)) {
        let as_strings: Map<String, Value> = FEATURE_SCHEMA
            .iter()
            .zip(&values)
            .map(|(name, v)| ((*name).to_string(), json!(v.to_string())))
            .collect();
        let as_numbers: Map<String, Value> = FEATURE_SCHEMA
            .iter()
            .zip(&values)
            .map(|(name, v)| ((*name).to_string(), json!(v)))
            .collect();

        let from_strings = extract_features(&body(as_strings)).unwrap();
        let from_numbers = extract_features(&body(as_numbers)).unwrap();
        prop_assert_eq!(from_strings.as_slice(), values.as_slice());
        prop_assert_eq!(from_numbers.as_slice(), values.as_slice());
    }

    #[test]
    fn prop_extra_keys_ignored(extra in prop::collection::btree_map("[a-z]{12,16}", any::<bool>(), 0..8)) {
        let mut features = full_features();
        for (k, v) in extra {
            features.insert(k, json!(v));
        }
        prop_assert!(extract_features(&body(features)).is_ok());
    }

    #[test]
    fn prop_padded_numeric_string_coerces(v in -1e6f64..1e6, pad in "[ \t]{0,3}") {
        let padded = format!("{pad}{v}{pad}");
        prop_assert_eq!(coerce_value(&json!(padded)), Some(v));
    }

    #[test]
    fn prop_alphabetic_string_rejected(s in "[a-zA-Z]{1,12}") {
        // Rust float parsing accepts these spellings; they are not finite.
        prop_assume!(!["inf", "infinity", "nan"].contains(&s.to_ascii_lowercase().as_str()));
        prop_assert_eq!(coerce_value(&json!(s)), None);
    }
}

#[test]
fn test_infinity_strings_rejected() {
    for s in ["inf", "-inf", "Infinity", "NaN"] {
        assert_eq!(coerce_value(&json!(s)), None, "{s}");
    }
}

#[test]
fn test_missing_takes_priority_over_invalid() {
    let mut features = full_features();
    features.insert("Age".to_string(), json!("old"));
    features.remove("Race");
    let err = extract_features(&body(features)).unwrap_err();
    assert_eq!(err, PredictError::MissingFeatures(vec!["Race".to_string()]));
}
