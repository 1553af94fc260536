//! Property-based tests for the core round-trip guarantee
//!
//! `decode(encode(v)) == v` must hold for every value shape the encoder can
//! choose (inline, array of arrays, tabular, list) under every delimiter and
//! length-marker combination.

use proptest::prelude::*;
use serde::{de::DeserializeOwned, Serialize};
use toon_value::{
    decode, encode, from_str, to_string_with_options, DecodeOptions, Delimiter, LengthMarker,
    ToonMap, ToonOptions, Value,
};

fn all_options() -> impl Iterator<Item = ToonOptions> {
    Delimiter::ALL.into_iter().flat_map(|delimiter| {
        LengthMarker::ALL.into_iter().map(move |marker| {
            ToonOptions::new()
                .with_delimiter(delimiter)
                .with_length_marker(marker)
        })
    })
}

fn text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 ]{0,10}",
        "[ -~]{0,10}",
        "[a-z\t\n\r\"\\\\|,:-]{0,6}",
        Just("true".to_string()),
        Just("-1".to_string()),
        Just("1e5".to_string()),
    ]
}

fn key() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => "[a-zA-Z_][a-zA-Z0-9_.]{0,6}",
        1 => "[ -~]{0,6}",
    ]
}

fn finite_float() -> impl Strategy<Value = f64> {
    any::<f64>().prop_filter("finite and not negative zero", |f| {
        f.is_finite() && !(*f == 0.0 && f.is_sign_negative())
    })
}

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        finite_float().prop_map(Value::Float),
        text().prop_map(Value::String),
    ]
}

/// Uniform rows that the encoder writes in tabular form.
fn table() -> impl Strategy<Value = Value> {
    prop::collection::vec(key(), 1..4).prop_flat_map(|fields| {
        let width = fields.len();
        prop::collection::vec(prop::collection::vec(leaf(), width), 1..5).prop_map(move |rows| {
            Value::Array(
                rows.into_iter()
                    .map(|cells| Value::Object(fields.iter().cloned().zip(cells).collect()))
                    .collect(),
            )
        })
    })
}

fn value() -> impl Strategy<Value = Value> {
    let tree = leaf().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec(prop::collection::vec(leaf(), 0..4).prop_map(Value::Array), 1..4)
                .prop_map(Value::Array),
            prop::collection::vec((key(), inner), 0..6)
                .prop_map(|entries| Value::Object(entries.into_iter().collect::<ToonMap>())),
        ]
    });
    prop_oneof![
        4 => tree,
        1 => table(),
        1 => (key(), table()).prop_map(|(k, t)| Value::Object(std::iter::once((k, t)).collect())),
    ]
}

fn typed_roundtrip<T>(value: &T) -> std::result::Result<(), TestCaseError>
where
    T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
{
    for options in all_options() {
        let text = to_string_with_options(value, &options)
            .map_err(|e| TestCaseError::fail(format!("serialize failed: {}", e)))?;
        let back: T = from_str(&text)
            .map_err(|e| TestCaseError::fail(format!("deserialize of {:?} failed: {}", text, e)))?;
        prop_assert_eq!(&back, value, "encoded as {:?}", text);
    }
    Ok(())
}

proptest! {
    #[test]
    fn prop_value_round_trip(value in value()) {
        for options in all_options() {
            let text = encode(&value, &options);
            let decoded = decode(&text, &DecodeOptions::default());
            prop_assert_eq!(decoded.as_ref(), Ok(&value), "encoded as {:?}", text);
        }
    }

    #[test]
    fn prop_custom_indent_round_trip(value in value(), indent in 1usize..5) {
        let text = encode(&value, &ToonOptions::new().with_indent(indent));
        let decoded = decode(&text, &DecodeOptions::new().with_indent(indent));
        prop_assert_eq!(decoded.as_ref(), Ok(&value), "encoded as {:?}", text);
    }

    #[test]
    fn prop_encoding_is_deterministic(value in value()) {
        let options = ToonOptions::default();
        prop_assert_eq!(encode(&value, &options), encode(&value, &options));
    }

    #[test]
    fn prop_i64(n in any::<i64>()) {
        typed_roundtrip(&n)?;
    }

    #[test]
    fn prop_u64(n in any::<u64>()) {
        typed_roundtrip(&n)?;
    }

    #[test]
    fn prop_strings(v in prop::collection::vec(text(), 0..8)) {
        typed_roundtrip(&v)?;
    }

    #[test]
    fn prop_option_i32(opt in proptest::option::of(any::<i32>())) {
        typed_roundtrip(&opt)?;
    }

    #[test]
    fn prop_tuple_i32_bool(t in (any::<i32>(), any::<bool>())) {
        typed_roundtrip(&t)?;
    }
}
