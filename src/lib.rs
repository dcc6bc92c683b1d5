//! # jsongraph
//!
//! Contract-driven JSON serialization for object graphs.
//!
//! ## What it does
//!
//! Types describe their shape once through [`describe::Describe`]: members,
//! accessors, constructors and annotations. A [`resolver::ContractResolver`]
//! turns descriptions into cached contracts, and the graph serializer and
//! deserializer walk values by contract rather than by static type. That makes
//! room for things a tree serializer cannot do:
//!
//! - **Shared references**: `Rc<RefCell<T>>` values written once with `$id` and
//!   referenced afterwards with `$ref`, restored as the same allocation
//! - **Cycles**: detected on the write stack and reported, skipped, or written
//!   through, per member or globally
//! - **Polymorphism**: `$type` names dispatching to registered implementors
//! - **Constructors**: default, parameterized and designated creators, with
//!   members matched to parameters by name
//! - **Recoverable errors**: an error handler can suppress a failure at the
//!   member where it happened and let the rest of the document through
//!
//! ## Quick Start
//!
//! ```rust
//! use jsongraph::describe::{Describe, TypeDescriptor};
//! use jsongraph::{from_str, to_string};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct User {
//!     id: u32,
//!     name: String,
//!     tags: Vec<String>,
//! }
//!
//! impl Describe for User {
//!     fn describe() -> TypeDescriptor {
//!         TypeDescriptor::object::<User>()
//!             .field("Id", |u: &User| &u.id, |u: &mut User| &mut u.id)
//!             .field("Name", |u: &User| &u.name, |u: &mut User| &mut u.name)
//!             .field("Tags", |u: &User| &u.tags, |u: &mut User| &mut u.tags)
//!             .default_constructor(User::default)
//!             .build()
//!     }
//! }
//!
//! let user = User { id: 7, name: "Ann".into(), tags: vec!["admin".into()] };
//! let json = to_string(&user).unwrap();
//! assert_eq!(json, r#"{"Id":7,"Name":"Ann","Tags":["admin"]}"#);
//!
//! let back: User = from_str(&json).unwrap();
//! assert_eq!(back, user);
//! ```
//!
//! ### Dynamic values with the json! macro
//!
//! ```rust
//! use jsongraph::{json, JsonValue};
//!
//! let data = json!({ "name": "Ann", "scores": [1, 2, 3] });
//! assert_eq!(data["scores"][1], JsonValue::from(2));
//! ```
//!
//! ## Modules
//!
//! - [`describe`] and [`impls`]: type descriptions and the built-in ones
//! - [`contract`] and [`resolver`]: resolved contracts and their cache
//! - [`ser`], [`de`] and [`serializer`]: the graph walkers and their facade
//! - [`reader`] and [`writer`]: the JSON token layer
//! - [`reference`]: `$id` bookkeeping
//! - [`bridge`]: serde interop over [`JsonValue`]
//!
//! ## Demos
//!
//! See the `demos/` directory: `simple.rs`, `references.rs`, `error_handling.rs`
//! and `custom_resolver.rs`. Run one with `cargo run --example <name>`.

pub mod bridge;
pub mod contract;
pub mod converter;
pub mod de;
pub mod describe;
pub mod error;
pub mod impls;
pub mod macros;
pub mod map;
mod path;
pub mod reader;
pub mod reference;
pub mod resolver;
pub mod ser;
pub mod serializer;
pub mod settings;
pub mod value;
pub mod writer;

pub use de::Deserializer;
pub use error::{Error, ErrorContext, ErrorDecision, HostError, Location, Result};
pub use map::JsonMap;
pub use ser::Serializer;
pub use serializer::JsonSerializer;
pub use settings::{
    ConstructorHandling, DefaultValueHandling, Formatting, MissingMemberHandling,
    NullValueHandling, PreserveReferencesHandling, ReferenceLoopHandling, Required,
    SerializerSettings, TypeNameFormat, TypeNameHandling,
};
pub use value::{JsonValue, Number};

use describe::Describe;
use std::io;

/// Serializes `value` to compact JSON with default settings.
///
/// # Examples
///
/// ```rust
/// use jsongraph::to_string;
/// use std::collections::BTreeMap;
///
/// let mut scores = BTreeMap::new();
/// scores.insert("ann".to_string(), vec![1, 2]);
/// assert_eq!(to_string(&scores).unwrap(), r#"{"ann":[1,2]}"#);
/// ```
///
/// # Errors
///
/// Fails on self referencing loops, excessive depth or failing accessors.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string<T: Describe>(value: &T) -> Result<String> {
    to_string_with_settings(value, &SerializerSettings::new())
}

/// Serializes `value` to indented JSON.
///
/// # Errors
///
/// Same as [`to_string`].
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string_pretty<T: Describe>(value: &T) -> Result<String> {
    to_string_with_settings(value, &SerializerSettings::pretty())
}

/// Serializes `value` with explicit settings.
///
/// # Examples
///
/// ```rust
/// use jsongraph::{to_string_with_settings, SerializerSettings};
///
/// let settings = SerializerSettings::pretty().with_indent(1);
/// assert_eq!(to_string_with_settings(&vec![1], &settings).unwrap(), "[\n 1\n]");
/// ```
///
/// # Errors
///
/// Failures the settings' error handler did not suppress.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string_with_settings<T: Describe>(value: &T, settings: &SerializerSettings) -> Result<String> {
    let mut serializer = Serializer::new(settings);
    serializer.serialize(value)?;
    Ok(serializer.into_inner())
}

/// Serializes `value` into an I/O stream.
///
/// # Errors
///
/// Serialization failures, or the writer failing.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer<W: io::Write, T: Describe>(writer: W, value: &T) -> Result<()> {
    JsonSerializer::default().serialize_to_writer(writer, value)
}

/// Deserializes a `T` from JSON text with default settings.
///
/// # Examples
///
/// ```rust
/// use jsongraph::from_str;
///
/// let values: Vec<Option<i64>> = from_str("[1, null, 3]").unwrap();
/// assert_eq!(values, vec![Some(1), None, Some(3)]);
/// ```
///
/// # Errors
///
/// Malformed JSON, or a document that does not fit `T`. Messages carry the
/// JSON path, line and position of the failure.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_str<T: Describe>(json: &str) -> Result<T> {
    from_str_with_settings(json, &SerializerSettings::new())
}

/// Deserializes a `T` with explicit settings.
///
/// # Examples
///
/// ```rust
/// use jsongraph::{from_str_with_settings, ErrorDecision, SerializerSettings};
///
/// let settings = SerializerSettings::new().with_error_handler(|_, _| ErrorDecision::Handled);
/// let values: Vec<i32> = from_str_with_settings(r#"[1, "two", 3]"#, &settings).unwrap();
/// assert_eq!(values, vec![1, 3]);
/// ```
///
/// # Errors
///
/// Failures the settings' error handler did not suppress.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_str_with_settings<T: Describe>(json: &str, settings: &SerializerSettings) -> Result<T> {
    Deserializer::new(json, settings).deserialize()
}

/// Deserializes a `T` from UTF-8 bytes.
///
/// # Errors
///
/// Invalid UTF-8, plus everything [`from_str`] rejects.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_slice<T: Describe>(bytes: &[u8]) -> Result<T> {
    let json = std::str::from_utf8(bytes).map_err(|e| Error::custom(e.to_string()))?;
    from_str(json)
}

/// Deserializes a `T` from an I/O stream.
///
/// # Errors
///
/// The reader failing, plus everything [`from_str`] rejects.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_reader<R: io::Read, T: Describe>(mut reader: R) -> Result<T> {
    let mut json = String::new();
    reader
        .read_to_string(&mut json)
        .map_err(|e| Error::io(&e.to_string()))?;
    from_str(&json)
}

/// Reads JSON onto an existing value with default settings.
///
/// # Examples
///
/// ```rust
/// use jsongraph::populate;
/// use std::collections::HashMap;
///
/// let mut map = HashMap::from([("a".to_string(), 1)]);
/// populate(r#"{"b": 2}"#, &mut map).unwrap();
/// assert_eq!(map.len(), 2);
/// ```
///
/// # Errors
///
/// Same as [`from_str`]; a root `$ref` is rejected.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn populate<T: Describe>(json: &str, target: &mut T) -> Result<()> {
    populate_with_settings(json, target, &SerializerSettings::new())
}

/// Reads JSON onto an existing value with explicit settings.
///
/// # Errors
///
/// Same as [`from_str_with_settings`].
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn populate_with_settings<T: Describe>(
    json: &str,
    target: &mut T,
    settings: &SerializerSettings,
) -> Result<()> {
    Deserializer::new(json, settings).populate(target)
}

/// Converts any `T: Serialize` to a [`JsonValue`] through serde.
///
/// # Errors
///
/// Fails for map keys that are not strings or numbers.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_value<T: ?Sized + serde::Serialize>(value: &T) -> Result<JsonValue> {
    bridge::to_json_value(value)
}

/// Converts a [`JsonValue`] to any `T: DeserializeOwned` through serde.
///
/// # Errors
///
/// The value does not have the shape `T` expects.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_value<T: serde::de::DeserializeOwned>(value: JsonValue) -> Result<T> {
    bridge::from_json_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::describe::{param, shared, Shared, TypeDescriptor};
    use std::collections::HashMap;

    #[derive(Debug, PartialEq)]
    struct Account {
        id: u64,
        owner: String,
        balance: Option<f64>,
    }

    impl Describe for Account {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::object::<Account>()
                .field("Id", |a: &Account| &a.id, |a: &mut Account| &mut a.id)
                .field("Owner", |a: &Account| &a.owner, |a: &mut Account| &mut a.owner)
                .field("Balance", |a: &Account| &a.balance, |a: &mut Account| &mut a.balance)
                .constructor(&[param::<u64>("id"), param::<String>("owner")], |mut args| {
                    Ok(Account {
                        id: args.take(0)?,
                        owner: args.take(1)?,
                        balance: None,
                    })
                })
                .build()
        }
    }

    #[test]
    fn test_round_trip_with_constructor() {
        let account = Account {
            id: 3,
            owner: "ann".into(),
            balance: Some(12.5),
        };
        let json = to_string(&account).unwrap();
        assert_eq!(json, r#"{"Id":3,"Owner":"ann","Balance":12.5}"#);
        let back: Account = from_str(&json).unwrap();
        assert_eq!(back, account);
    }

    #[test]
    fn test_pretty_round_trip() {
        let mut map = HashMap::new();
        map.insert("k".to_string(), vec![Some(1_i32), None]);
        let json = to_string_pretty(&map).unwrap();
        assert!(json.contains('\n'));
        let back: HashMap<String, Vec<Option<i32>>> = from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_reader_and_writer() {
        let mut buffer = Vec::new();
        to_writer(&mut buffer, &vec!["a".to_string()]).unwrap();
        let back: Vec<String> = from_reader(buffer.as_slice()).unwrap();
        assert_eq!(back, vec!["a".to_string()]);
        let again: Vec<String> = from_slice(&buffer).unwrap();
        assert_eq!(again, back);
    }

    #[test]
    fn test_shared_values_without_tracking_are_copies() {
        let item = shared(5_i32);
        let json = to_string(&vec![item.clone(), item]).unwrap();
        assert_eq!(json, "[5,5]");
        let back: Vec<Shared<i32>> = from_str(&json).unwrap();
        assert!(!std::rc::Rc::ptr_eq(&back[0], &back[1]));
    }

    #[test]
    fn test_serde_value_helpers() {
        let value = to_value(&vec![(1, "a")]).unwrap();
        assert_eq!(value, json!([[1, "a"]]));
        let back: Vec<(i32, String)> = from_value(value).unwrap();
        assert_eq!(back, vec![(1, "a".to_string())]);
    }
}
