//! Custom value converters.
//!
//! A converter takes over writing and reading one type. It is looked up on
//! the member first, then on the value's contract, then in the settings'
//! converter list, and the first that can convert the type wins.
//!
//! ```rust
//! use jsongraph::converter::FnConverter;
//! use jsongraph::{from_str_with_settings, to_string_with_settings, JsonValue, SerializerSettings};
//! use std::sync::Arc;
//!
//! // Booleans as "yes"/"no".
//! let yes_no = FnConverter::new(
//!     |b: &bool| Ok(JsonValue::from(if *b { "yes" } else { "no" })),
//!     |json| Ok(json.as_str() == Some("yes")),
//! );
//! let settings = SerializerSettings::new().with_converter(Arc::new(yes_no));
//!
//! let text = to_string_with_settings(&vec![true, false], &settings).unwrap();
//! assert_eq!(text, r#"["yes","no"]"#);
//! let back: Vec<bool> = from_str_with_settings(&text, &settings).unwrap();
//! assert_eq!(back, vec![true, false]);
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::describe::{mismatch, TypeKey};
use crate::error::HostError;
use crate::value::JsonValue;

/// Writes and reads values of the types it accepts.
pub trait JsonConverter: Send + Sync {
    fn can_convert(&self, type_key: TypeKey) -> bool;

    fn write_json(&self, value: &dyn Any) -> Result<JsonValue, HostError>;

    fn read_json(&self, json: JsonValue) -> Result<Box<dyn Any>, HostError>;

    fn can_read(&self) -> bool {
        true
    }

    fn can_write(&self) -> bool {
        true
    }
}

type WriteFn<T> = Arc<dyn Fn(&T) -> Result<JsonValue, HostError> + Send + Sync>;
type ReadFn<T> = Arc<dyn Fn(JsonValue) -> Result<T, HostError> + Send + Sync>;

/// A converter for exactly one type built from two closures.
pub struct FnConverter<T> {
    write: Option<WriteFn<T>>,
    read: Option<ReadFn<T>>,
}

impl<T: Any> FnConverter<T> {
    pub fn new<W, R>(write: W, read: R) -> Self
    where
        W: Fn(&T) -> Result<JsonValue, HostError> + Send + Sync + 'static,
        R: Fn(JsonValue) -> Result<T, HostError> + Send + Sync + 'static,
    {
        FnConverter {
            write: Some(Arc::new(write)),
            read: Some(Arc::new(read)),
        }
    }

    /// A converter used only when writing.
    pub fn write_only<W>(write: W) -> Self
    where
        W: Fn(&T) -> Result<JsonValue, HostError> + Send + Sync + 'static,
    {
        FnConverter {
            write: Some(Arc::new(write)),
            read: None,
        }
    }
}

impl<T> fmt::Debug for FnConverter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnConverter")
            .field("type", &std::any::type_name::<T>())
            .field("can_write", &self.write.is_some())
            .field("can_read", &self.read.is_some())
            .finish()
    }
}

impl<T: Any> JsonConverter for FnConverter<T> {
    fn can_convert(&self, type_key: TypeKey) -> bool {
        type_key == TypeKey::of::<T>()
    }

    fn write_json(&self, value: &dyn Any) -> Result<JsonValue, HostError> {
        let write = self.write.as_ref().ok_or("Converter cannot write.")?;
        write(value.downcast_ref::<T>().ok_or_else(mismatch::<T>)?)
    }

    fn read_json(&self, json: JsonValue) -> Result<Box<dyn Any>, HostError> {
        let read = self.read.as_ref().ok_or("Converter cannot read.")?;
        Ok(Box::new(read(json)?))
    }

    fn can_read(&self) -> bool {
        self.read.is_some()
    }

    fn can_write(&self) -> bool {
        self.write.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_converter_matches_one_type() {
        let converter = FnConverter::new(|v: &u8| Ok(JsonValue::from(*v)), |_| Ok(0_u8));
        assert!(converter.can_convert(TypeKey::of::<u8>()));
        assert!(!converter.can_convert(TypeKey::of::<u16>()));
    }

    #[test]
    fn test_write_only_converter() {
        let converter = FnConverter::write_only(|v: &String| Ok(JsonValue::from(v.len() as u64)));
        assert!(converter.can_write());
        assert!(!converter.can_read());
        assert_eq!(
            converter.write_json(&"abc".to_string()).unwrap(),
            JsonValue::from(3_u64)
        );
        assert!(converter.read_json(JsonValue::Null).is_err());
        assert!(converter.write_json(&5_i32).is_err());
    }
}
