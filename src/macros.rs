/// Builds a [`JsonValue`](crate::JsonValue) from JSON-like syntax.
///
/// ```rust
/// use jsongraph::{json, JsonValue};
///
/// let value = json!({ "id": 7, "tags": ["a", "b"], "parent": null });
/// assert_eq!(value["id"], JsonValue::from(7));
/// assert!(value["parent"].is_null());
/// ```
#[macro_export]
macro_rules! json {
    (null) => {
        $crate::JsonValue::Null
    };

    (true) => {
        $crate::JsonValue::Bool(true)
    };

    (false) => {
        $crate::JsonValue::Bool(false)
    };

    ([]) => {
        $crate::JsonValue::Array(vec![])
    };

    ([ $($elem:tt),* $(,)? ]) => {
        $crate::JsonValue::Array(vec![$($crate::json!($elem)),*])
    };

    ({}) => {
        $crate::JsonValue::Object($crate::JsonMap::new())
    };

    ({ $($key:literal : $value:tt),* $(,)? }) => {{
        let mut object = $crate::JsonMap::new();
        $(
            object.insert($key.to_string(), $crate::json!($value));
        )*
        $crate::JsonValue::Object(object)
    }};

    // Any other expression convertible into a value
    ($other:expr) => {
        $crate::JsonValue::from($other)
    };
}
