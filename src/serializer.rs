//! [`JsonSerializer`]: settings bound once, reused for many calls.
//!
//! Every call gets its own reference table, write stack and error pipeline, so
//! one instance can serve any number of independent documents.
//!
//! ```rust
//! use jsongraph::describe::{shared, Shared};
//! use jsongraph::serializer::JsonSerializer;
//! use jsongraph::{PreserveReferencesHandling, SerializerSettings};
//! use std::rc::Rc;
//!
//! let serializer = JsonSerializer::new(
//!     SerializerSettings::new().with_preserve_references_handling(PreserveReferencesHandling::All),
//! );
//! let item = shared(vec![1_u8]);
//! let json = serializer.serialize(&vec![item.clone(), item]).unwrap();
//! assert_eq!(json, r#"[{"$id":"1","$values":[1]},{"$ref":"1"}]"#);
//!
//! let back: Vec<Shared<Vec<u8>>> = serializer.deserialize(&json).unwrap();
//! assert!(Rc::ptr_eq(&back[0], &back[1]));
//! ```

use std::io;
use std::sync::Arc;

use crate::contract::Contract;
use crate::de::Deserializer;
use crate::describe::Describe;
use crate::error::{Error, Result};
use crate::resolver::ContractResolver;
use crate::ser::Serializer;
use crate::settings::SerializerSettings;

/// Serializes and deserializes described types under fixed settings.
#[derive(Clone, Debug, Default)]
pub struct JsonSerializer {
    settings: SerializerSettings,
}

impl JsonSerializer {
    #[must_use]
    pub fn new(settings: SerializerSettings) -> Self {
        JsonSerializer { settings }
    }

    #[must_use]
    pub fn settings(&self) -> &SerializerSettings {
        &self.settings
    }

    /// The resolver contracts come from: the configured one or the process-wide default.
    #[must_use]
    pub fn contract_resolver(&self) -> Arc<ContractResolver> {
        self.settings
            .contract_resolver
            .clone()
            .unwrap_or_else(ContractResolver::shared)
    }

    /// Resolves the contract of `T` the way serialization would.
    ///
    /// # Errors
    ///
    /// Fails when `T`'s shape is invalid, for example duplicate member names.
    pub fn contract_of<T: Describe>(&self) -> Result<Arc<Contract>> {
        self.contract_resolver().resolve_contract::<T>()
    }

    /// Writes `value` as JSON text.
    ///
    /// # Errors
    ///
    /// Loop, depth or host failures the error handler did not suppress.
    pub fn serialize<T: Describe>(&self, value: &T) -> Result<String> {
        let mut serializer = Serializer::new(&self.settings);
        serializer.serialize(value)?;
        Ok(serializer.into_inner())
    }

    /// Writes `value` as JSON text into `writer`.
    ///
    /// # Errors
    ///
    /// Same as [`JsonSerializer::serialize`], plus I/O failures.
    pub fn serialize_to_writer<W: io::Write, T: Describe>(&self, mut writer: W, value: &T) -> Result<()> {
        let json = self.serialize(value)?;
        writer
            .write_all(json.as_bytes())
            .map_err(|e| Error::io(&e.to_string()))
    }

    /// Reads a `T` from JSON text.
    ///
    /// # Errors
    ///
    /// Malformed JSON or a document that does not fit `T`.
    pub fn deserialize<T: Describe>(&self, json: &str) -> Result<T> {
        Deserializer::new(json, &self.settings).deserialize()
    }

    /// Reads JSON text onto an existing value.
    ///
    /// # Errors
    ///
    /// Same as [`JsonSerializer::deserialize`].
    pub fn populate<T: Describe>(&self, json: &str, target: &mut T) -> Result<()> {
        Deserializer::new(json, &self.settings).populate(target)
    }
}
