use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use toon_value::{
    from_str, from_str_with_options, from_value, to_string, to_string_with_options, to_value,
    toon, DecodeOptions, DecodingLimits, Delimiter, Error, LengthMarker, ToonOptions, Value,
};

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct User {
    id: u32,
    name: String,
    active: bool,
    tags: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Product {
    sku: String,
    price: f64,
    quantity: u32,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Order {
    order_id: u32,
    customer: User,
    items: Vec<Product>,
    total: f64,
    note: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
enum Shape {
    Empty,
    Circle(f64),
    Rect(u32, u32),
    Polygon { sides: u8, label: String },
}

fn sample_order() -> Order {
    Order {
        order_id: 12345,
        customer: User {
            id: 123,
            name: "Alice".to_string(),
            active: true,
            tags: vec!["vip".to_string()],
        },
        items: vec![
            Product {
                sku: "WIDGET-001".to_string(),
                price: 29.99,
                quantity: 2,
            },
            Product {
                sku: "GADGET-002".to_string(),
                price: 49.99,
                quantity: 1,
            },
        ],
        total: 109.97,
        note: None,
    }
}

#[test]
fn test_nested_struct_layout() {
    let toon = to_string(&sample_order()).unwrap();
    let expected = "order_id: 12345\n\
                    customer:\n  id: 123\n  name: Alice\n  active: true\n  tags[1]: vip\n\
                    items[2]{sku,price,quantity}:\n  WIDGET-001,29.99,2\n  GADGET-002,49.99,1\n\
                    total: 109.97\n\
                    note: null";
    assert_eq!(toon, expected);

    let back: Order = from_str(&toon).unwrap();
    assert_eq!(back, sample_order());
}

#[test]
fn test_round_trip_every_option_combination() {
    for delimiter in Delimiter::ALL {
        for marker in LengthMarker::ALL {
            let options = ToonOptions::new()
                .with_delimiter(delimiter)
                .with_length_marker(marker);
            let toon = to_string_with_options(&sample_order(), &options).unwrap();
            let back: Order = from_str(&toon).unwrap();
            assert_eq!(back, sample_order(), "options {options:?} produced {toon:?}");
        }
    }
}

#[test]
fn test_enums_are_externally_tagged() {
    let shapes = vec![
        Shape::Empty,
        Shape::Circle(1.5),
        Shape::Rect(2, 3),
        Shape::Polygon {
            sides: 6,
            label: "hex".to_string(),
        },
    ];
    let value = to_value(&shapes).unwrap();
    assert_eq!(
        value,
        toon!([
            "Empty",
            { "Circle": 1.5 },
            { "Rect": [2, 3] },
            { "Polygon": { "sides": 6, "label": "hex" } }
        ])
    );

    let toon = to_string(&shapes).unwrap();
    let back: Vec<Shape> = from_str(&toon).unwrap();
    assert_eq!(back, shapes);
}

#[test]
fn test_collections() {
    let pairs: Vec<(i32, String)> = vec![(1, "one".to_string()), (2, "two".to_string())];
    let toon = to_string(&pairs).unwrap();
    assert_eq!(toon, "[2]:\n  - [2]: 1,one\n  - [2]: 2,two");
    assert_eq!(from_str::<Vec<(i32, String)>>(&toon).unwrap(), pairs);

    let mut scores = HashMap::new();
    scores.insert("ada".to_string(), 10);
    scores.insert("bob".to_string(), -3);
    let toon = to_string(&scores).unwrap();
    assert_eq!(from_str::<HashMap<String, i32>>(&toon).unwrap(), scores);

    let mut by_id = BTreeMap::new();
    by_id.insert(7u32, "seven".to_string());
    by_id.insert(42u32, "forty-two".to_string());
    let toon = to_string(&by_id).unwrap();
    assert_eq!(toon, "\"7\": seven\n\"42\": forty-two");
    assert_eq!(from_str::<BTreeMap<u32, String>>(&toon).unwrap(), by_id);
}

#[test]
fn test_wide_integers_travel_as_strings() {
    let big = u64::MAX;
    let value = to_value(&big).unwrap();
    assert_eq!(value, Value::from("18446744073709551615"));
    assert_eq!(from_value::<u64>(value).unwrap(), big);

    let toon = to_string(&i128::MIN).unwrap();
    assert_eq!(from_str::<i128>(&toon).unwrap(), i128::MIN);

    assert_eq!(to_value(&5u64).unwrap(), Value::Int(5));
    assert_eq!(from_str::<u128>("12").unwrap(), 12);
}

#[test]
fn test_numeric_width_enforcement() {
    #[derive(Deserialize, Debug)]
    struct Small {
        #[allow(dead_code)]
        value: i8,
    }
    #[derive(Deserialize, Debug)]
    struct Unsigned {
        #[allow(dead_code)]
        value: u8,
    }

    let err = from_str::<Small>("value: 200").unwrap_err();
    assert_eq!(
        err,
        Error::DataCorrupted("Value 200 does not fit in i8".to_string())
    );

    let err = from_str::<Unsigned>("value: -1").unwrap_err();
    assert_eq!(
        err,
        Error::DataCorrupted("Value -1 does not fit in u8".to_string())
    );

    let err = from_str::<u64>("\"-9223372036854775809\"").unwrap_err();
    assert!(matches!(err, Error::DataCorrupted(_)));
}

#[test]
fn test_type_coercion() {
    assert_eq!(from_str::<f64>("3").unwrap(), 3.0);
    assert_eq!(from_str::<f32>("0.5").unwrap(), 0.5);

    let err = from_str::<bool>("\"true\"").unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { .. }));

    let err = from_str::<String>("12").unwrap_err();
    assert_eq!(err, Error::type_mismatch("string", "int"));

    let err = from_str::<i32>("1.5").unwrap_err();
    assert_eq!(err, Error::type_mismatch("i32", "float"));

    let err = from_str::<u64>("\"42\"").unwrap_err();
    assert_eq!(err, Error::type_mismatch("u64", "string"));
    let err = from_str::<i128>("\"-7\"").unwrap_err();
    assert_eq!(err, Error::type_mismatch("i128", "string"));
}

#[test]
fn test_missing_field() {
    let err = from_str::<User>("id: 1\nname: Ada\nactive: true").unwrap_err();
    assert_eq!(err, Error::KeyNotFound("tags".to_string()));
}

#[test]
fn test_timestamps_as_rfc3339() {
    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Event {
        name: String,
        at: DateTime<Utc>,
    }

    let event = Event {
        name: "launch".to_string(),
        at: Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap(),
    };
    let toon = to_string(&event).unwrap();
    assert_eq!(toon, "name: launch\nat: \"2024-01-15T10:30:00Z\"");
    assert_eq!(from_str::<Event>(&toon).unwrap(), event);

    let err = from_str::<Event>("name: launch\nat: yesterday").unwrap_err();
    assert!(matches!(err, Error::DataCorrupted(_)));
}

#[test]
fn test_decode_errors_surface_through_from_str() {
    let err = from_str::<Vec<String>>("[3]: a,b").unwrap_err();
    assert!(matches!(err, Error::CountMismatch { expected: 3, actual: 2, .. }));
    assert_eq!(err.line(), Some(1));

    let options =
        DecodeOptions::new().with_limits(DecodingLimits::default().with_max_input_size(4));
    let err = from_str_with_options::<Value>("key: value", &options).unwrap_err();
    assert!(err.is_limit());
}

#[test]
fn test_unsupported_map_keys() {
    let mut map = HashMap::new();
    map.insert((1, 2), "pair");
    let err = to_string(&map).unwrap_err();
    assert!(matches!(err, Error::UnsupportedType(_)));
}

#[test]
fn test_value_round_trips_through_serde() {
    let value = toon!({ "a": [1, 2.5, "x", null, { "b": false }] });
    let toon = to_string(&value).unwrap();
    assert_eq!(from_str::<Value>(&toon).unwrap(), value);

    let json: serde_json::Value = serde_json::from_str(r#"{"k":[{"id":1},{"id":2}],"s":"t"}"#).unwrap();
    let toon = to_string(&json).unwrap();
    assert_eq!(toon, "k[2]{id}:\n  1\n  2\ns: t");
    let back: serde_json::Value = from_str(&toon).unwrap();
    assert_eq!(back, json);
}
