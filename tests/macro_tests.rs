use jsongraph::{from_str, json, to_string, JsonMap, JsonValue, Number};

#[test]
fn test_json_macro_scalars() {
    assert_eq!(json!(null), JsonValue::Null);
    assert_eq!(json!(false), JsonValue::Bool(false));
    assert_eq!(json!(-123), JsonValue::Number(Number::Integer(-123)));
    assert_eq!(json!(""), JsonValue::String(String::new()));
}

#[test]
fn test_json_macro_arrays() {
    assert_eq!(json!([]), JsonValue::Array(vec![]));

    let mixed = json!([1, "hello", true, null]);
    assert_eq!(
        mixed,
        JsonValue::Array(vec![
            JsonValue::Number(Number::Integer(1)),
            JsonValue::String("hello".to_string()),
            JsonValue::Bool(true),
            JsonValue::Null,
        ])
    );
}

#[test]
fn test_json_macro_objects_keep_insertion_order() {
    assert_eq!(json!({}), JsonValue::Object(JsonMap::new()));

    let value = json!({
        "zeta": 1,
        "alpha": 2,
        "mid": 3
    });
    let keys: Vec<&str> = value
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(keys, ["zeta", "alpha", "mid"]);
}

#[test]
fn test_json_macro_nested() {
    let value = json!({
        "user": {
            "id": 123,
            "name": "Bob",
            "active": true
        },
        "tags": ["admin", "developer"],
        "manager": null
    });

    assert_eq!(value["user"]["id"].as_i64(), Some(123));
    assert_eq!(value["user"]["name"].as_str(), Some("Bob"));
    assert_eq!(value["tags"][1].as_str(), Some("developer"));
    assert!(value["manager"].is_null());
    assert!(value["missing"].is_null());
}

#[test]
fn test_json_value_predicates() {
    let array = json!([1, 2, 3]);
    assert!(array.is_array());
    assert!(!array.is_object());
    assert_eq!(array.as_array().map(Vec::len), Some(3));

    let object = json!({"key": "value"});
    assert!(object.is_object());
    assert_eq!(object.get("key").and_then(JsonValue::as_str), Some("value"));
    assert_eq!(object.get("other"), None);
}

#[test]
fn test_json_value_display_is_compact() {
    let value = json!({"a": [1, 2.5], "b": "x\"y"});
    assert_eq!(value.to_string(), r#"{"a":[1,2.5],"b":"x\"y"}"#);
}

#[test]
fn test_json_value_is_a_described_type() {
    let value = json!({"id": 7, "tags": ["a"]});
    let text = to_string(&value).unwrap();
    assert_eq!(text, r#"{"id":7,"tags":["a"]}"#);

    let back: JsonValue = from_str(&text).unwrap();
    assert_eq!(back, value);
}
