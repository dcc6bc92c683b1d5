//! Graph deserializer: reads JSON tokens into described values.
//!
//! ## Overview
//!
//! The deserializer pulls tokens from a [`JsonReader`] and, for every value,
//! resolves the target contract, consumes leading metadata (`$ref`, `$id`,
//! `$type`, `$values`) and then builds the value:
//!
//! - with the **default creator** the instance is created first and its
//!   members are set as they are read
//! - with a **parameterized** or **override creator** members matching
//!   constructor parameters are buffered until the end of the object, the
//!   creator is invoked and the remaining members are set afterwards
//!
//! Missing required members are reported one by one at the end of each object.
//! Every failure is offered to the error handler at the member or element that
//! raised it; a handled failure leaves that member at its current value and the
//! walk resumes with the next token at the same depth.
//!
//! ## Usage
//!
//! ```rust
//! use jsongraph::de::Deserializer;
//! use jsongraph::SerializerSettings;
//! use std::collections::HashMap;
//!
//! let settings = SerializerSettings::new();
//! let mut de = Deserializer::new(r#"{"a": [1, 2], "b": []}"#, &settings);
//! let value: HashMap<String, Vec<u8>> = de.deserialize().unwrap();
//! assert_eq!(value["a"], vec![1, 2]);
//! assert!(value["b"].is_empty());
//! ```

use std::any::Any;
use std::sync::Arc;

use crate::contract::{Contract, ContractDetails, JsonProperty, ParameterizedCreator, PropertyCollection};
use crate::converter::JsonConverter;
use crate::describe::{CreatorArgs, Describe, ListOps, MapOps, PolymorphicOps, SerializableOps, SharedOps, TypeRef};
use crate::error::{Error, ErrorPipeline, Result};
use crate::map::JsonMap;
use crate::reader::{JsonReader, Token};
use crate::reference::{DefaultReferenceResolver, ReferenceResolver, SharedHandle};
use crate::resolver::ContractResolver;
use crate::ser::Site;
use crate::settings::{ConstructorHandling, MissingMemberHandling, NullValueHandling, Required, SerializerSettings};
use crate::value::JsonValue;

/// Metadata properties found at the head of an object.
#[derive(Debug, Default)]
struct Metadata {
    /// The value started with `{`.
    object: bool,
    id: Option<String>,
    type_name: Option<String>,
    reference: Option<String>,
    /// The reader stopped on the `$values` property name.
    values: bool,
}

fn describe_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "{null}".to_string(),
        other => other.to_string(),
    }
}

/// Reads described values from JSON text.
pub struct Deserializer<'de, 's> {
    reader: JsonReader<'de>,
    settings: &'s SerializerSettings,
    resolver: Arc<ContractResolver>,
    references: Box<dyn ReferenceResolver>,
    errors: ErrorPipeline,
}

impl<'de, 's> Deserializer<'de, 's> {
    /// Creates a deserializer over `input` with its own reference table and error pipeline.
    #[must_use]
    pub fn new(input: &'de str, settings: &'s SerializerSettings) -> Self {
        Deserializer {
            reader: JsonReader::new(input).with_max_depth(settings.max_depth),
            resolver: settings
                .contract_resolver
                .clone()
                .unwrap_or_else(ContractResolver::shared),
            references: settings.reference_resolver.as_ref().map_or_else(
                || Box::new(DefaultReferenceResolver::new()) as Box<dyn ReferenceResolver>,
                |factory| factory(),
            ),
            errors: ErrorPipeline::new(settings.error_handler.clone()),
            settings,
        }
    }

    /// Reads the whole document as a `T`.
    ///
    /// # Errors
    ///
    /// Malformed JSON, a value that does not fit `T`, or any failure the error
    /// handler did not suppress.
    pub fn deserialize<T: Describe>(&mut self) -> Result<T> {
        let contract = self.resolver.resolve_contract::<T>()?;
        tracing::debug!(type_name = %contract.name, "deserializing");
        self.reader.read()?;

        let value = match self.read_value(&contract, Site::default()) {
            Ok(value) => value,
            Err(err) => {
                let err = err.at(self.reader.location());
                self.errors.offer(err.clone(), None, None)?;
                let Some(value) = self.default_of(&contract)? else {
                    return Err(err);
                };
                self.reader.skip_to_depth(0)?;
                value
            }
        };
        self.finish()?;

        value.downcast::<T>().map(|value| *value).map_err(|_| {
            Error::resolution(format!(
                "Deserialized value is not of type '{}'.",
                contract.name
            ))
        })
    }

    /// Reads the document onto an existing value. Members absent from the
    /// JSON keep their current values; list items are appended.
    ///
    /// # Errors
    ///
    /// Same as [`Deserializer::deserialize`]; a `$ref` at the root is rejected.
    pub fn populate<T: Describe>(&mut self, target: &mut T) -> Result<()> {
        let contract = self.resolver.resolve_contract::<T>()?;
        tracing::debug!(type_name = %contract.name, "populating");
        self.reader.read()?;

        if let Err(err) = self.populate_root(target, &contract) {
            let err = err.at(self.reader.location());
            self.errors.offer(err, Some(&*target), None)?;
            self.reader.skip_to_depth(0)?;
        }
        self.finish()
    }

    fn finish(&mut self) -> Result<()> {
        if self.settings.check_additional_content {
            self.reader.read()?;
        }
        Ok(())
    }

    fn resolve(&self, type_ref: &TypeRef) -> Result<Arc<Contract>> {
        self.resolver.resolve_contract_for(type_ref)
    }

    fn token_is_null(&self) -> bool {
        self.reader.token().map_or(false, Token::is_null)
    }

    /// Skips back to `depth` after an abandoned node.
    fn recover(&mut self, depth: usize) -> Result<()> {
        let dangling = matches!(self.reader.token(), Some(Token::PropertyName(_)));
        if self.reader.depth() > depth || dangling {
            if let Err(err) = self.reader.skip_to_depth(depth) {
                self.errors.offer(err, None, None)?;
            }
        }
        Ok(())
    }

    fn converter_for(&self, site: Site<'_>, contract: &Contract) -> Option<Arc<dyn JsonConverter>> {
        let key = contract.underlying_type;
        site.member
            .and_then(|m| m.converter.clone())
            .filter(|c| c.can_read() && c.can_convert(key))
            .or_else(|| contract.converter().filter(|c| c.can_read()))
            .or_else(|| {
                self.settings
                    .converters
                    .iter()
                    .find(|c| c.can_read() && c.can_convert(key))
                    .cloned()
            })
    }

    /// The value a handled failure leaves behind, when the type has one.
    fn default_of(&self, contract: &Contract) -> Result<Option<Box<dyn Any>>> {
        match &contract.details {
            ContractDetails::Nullable(ops) => Ok(Some((ops.none)())),
            ContractDetails::Primitive(ops) => match (ops.zero)() {
                Some(zero) => (ops.from_json)(zero)
                    .map(Some)
                    .map_err(|e| Error::host(format!("Error creating '{}'", contract.name), &e)),
                None => Ok(None),
            },
            _ => match contract.default_creator() {
                Some(create) => {
                    let value = create().map_err(|e| {
                        Error::host(format!("Error creating '{}'", contract.name), &e)
                    })?;
                    contract.check_created(value).map(Some)
                }
                None => Ok(None),
            },
        }
    }

    /// Materializes a JSON value, such as a default, through a nested reader.
    fn value_from_json(&self, contract: &Arc<Contract>, json: &JsonValue) -> Result<Box<dyn Any>> {
        if let ContractDetails::Primitive(ops) = &contract.details {
            return (ops.from_json)(json.clone()).map_err(|e| Error::member(e.to_string()));
        }
        let text = json.to_string();
        let mut nested = Deserializer {
            reader: JsonReader::new(&text).with_max_depth(self.settings.max_depth),
            settings: self.settings,
            resolver: Arc::clone(&self.resolver),
            references: Box::new(DefaultReferenceResolver::new()),
            errors: ErrorPipeline::new(None),
        };
        nested.reader.read()?;
        nested.read_value(contract, Site::default())
    }

    /// Reads the value starting at the current token.
    fn read_value(&mut self, contract: &Arc<Contract>, site: Site<'_>) -> Result<Box<dyn Any>> {
        if let Some(converter) = self.converter_for(site, contract) {
            let json = self.reader.read_value_tree()?;
            let value = converter.read_json(json).map_err(|e| {
                Error::host(format!("Error reading '{}' with a converter", contract.name), &e)
            })?;
            if (*value).type_id() != contract.underlying_type.id() {
                return Err(Error::member(format!(
                    "Converter returned a value that is not of type '{}'.",
                    contract.name
                )));
            }
            return Ok(value);
        }

        match &contract.details {
            ContractDetails::Primitive(ops) => {
                let json = self.reader.read_value_tree()?;
                (ops.from_json)(json).map_err(|e| Error::member(e.to_string()))
            }
            ContractDetails::Nullable(ops) => {
                if self.token_is_null() {
                    return Ok((ops.none)());
                }
                let inner = self.resolve(&ops.inner)?;
                let value = self.read_value(&inner, site)?;
                (ops.some)(value).map_err(|e| Error::member(e.to_string()))
            }
            ContractDetails::Shared(ops) => self.read_shared(contract, *ops, site),
            _ => {
                let meta = self.read_metadata_if_object()?;
                if let Some(id) = meta.reference {
                    return Err(Error::reference(format!(
                        "Cannot resolve reference '{id}' into a value of type '{}' that has no identity.",
                        contract.name
                    )));
                }
                self.read_composite(contract, site, meta)
            }
        }
    }

    fn read_metadata_if_object(&mut self) -> Result<Metadata> {
        match self.reader.token() {
            Some(Token::StartObject) => self.read_metadata(),
            _ => Ok(Metadata::default()),
        }
    }

    /// Consumes metadata properties at the head of the current object.
    fn read_metadata(&mut self) -> Result<Metadata> {
        let mut meta = Metadata {
            object: true,
            ..Metadata::default()
        };
        loop {
            let Some(Token::PropertyName(name)) = self.reader.peek()? else {
                break;
            };
            match name.as_str() {
                "$ref" => {
                    self.reader.read()?;
                    meta.reference = Some(self.read_metadata_string("$ref")?);
                    // $ref wins over anything that follows it.
                    let depth = self.reader.depth().saturating_sub(1);
                    self.reader.skip_to_depth(depth)?;
                    return Ok(meta);
                }
                "$id" => {
                    self.reader.read()?;
                    meta.id = Some(self.read_metadata_string("$id")?);
                }
                "$type" => {
                    self.reader.read()?;
                    meta.type_name = Some(self.read_metadata_string("$type")?);
                }
                "$values" => {
                    self.reader.read()?;
                    meta.values = true;
                    break;
                }
                _ => break,
            }
        }
        Ok(meta)
    }

    fn read_metadata_string(&mut self, name: &str) -> Result<String> {
        match self.reader.read_token()? {
            Token::Value(JsonValue::String(value)) => Ok(value),
            Token::Value(JsonValue::Number(number)) if number.is_integer() => Ok(number.to_string()),
            other => Err(Error::syntax(
                format!("Unexpected token {other} when reading metadata property '{name}'."),
                self.reader.location(),
            )),
        }
    }

    fn type_name_error(&self, name: &str, contract: &Contract) -> Error {
        if self.resolver.is_known_type_name(name) {
            Error::resolution(format!(
                "Type specified in JSON '{name}' is not compatible with '{}'.",
                contract.name
            ))
        } else {
            Error::resolution(format!("Type specified in JSON '{name}' was not resolved."))
        }
    }

    fn check_type_name(&self, contract: &Contract, name: Option<&str>) -> Result<()> {
        match name {
            Some(name)
                if name != contract.type_name && name != contract.underlying_type.path() =>
            {
                Err(self.type_name_error(name, contract))
            }
            _ => Ok(()),
        }
    }

    /// Checks that the current token can start a value of `contract` and moves
    /// into the `$values` array of a wrapped list.
    fn expect_shape(&mut self, contract: &Contract, meta: &Metadata) -> Result<()> {
        let wants_array = matches!(contract.details, ContractDetails::Array(_));
        if meta.values {
            if !wants_array {
                return Err(Error::structure(format!(
                    "Unexpected metadata property '$values' for type '{}'.",
                    contract.name
                )));
            }
            return match self.reader.read_token()? {
                Token::StartArray => Ok(()),
                other => Err(Error::structure(format!(
                    "Unexpected token {other} when reading '$values' of '{}'.",
                    contract.name
                ))),
            };
        }
        match (self.reader.token(), wants_array) {
            (Some(Token::StartArray), true) => Ok(()),
            (_, false) if meta.object => Ok(()),
            (_, true) if meta.object => Err(Error::structure(format!(
                "Cannot deserialize the current JSON object (e.g. {{\"name\":\"value\"}}) into type '{}' because the type requires a JSON array (e.g. [1,2,3]) to deserialize correctly.",
                contract.name
            ))),
            (Some(Token::StartArray), false) => Err(Error::structure(format!(
                "Cannot deserialize the current JSON array (e.g. [1,2,3]) into type '{}' because the type requires a JSON object (e.g. {{\"name\":\"value\"}}) to deserialize correctly.",
                contract.name
            ))),
            (Some(Token::Value(value)), _) => Err(Error::member(format!(
                "Error converting value {} to type '{}'.",
                describe_value(value),
                contract.name
            ))),
            (Some(other), _) => Err(Error::structure(format!(
                "Unexpected token {other} when deserializing '{}'.",
                contract.name
            ))),
            (None, _) => Err(Error::structure("Unexpected end when deserializing object.")),
        }
    }

    /// Creates an instance with the default creator when the creator rules allow it.
    fn create_default(&self, contract: &Contract) -> Result<Option<Box<dyn Any>>> {
        if !matches!(
            contract.details,
            ContractDetails::Object
                | ContractDetails::Dynamic(_)
                | ContractDetails::Array(_)
                | ContractDetails::Dictionary(_)
        ) {
            return Ok(None);
        }
        if contract.override_creator().is_some() {
            return Ok(None);
        }
        let Some(create) = contract.default_creator() else {
            return Ok(None);
        };
        if contract.default_creator_non_public()
            && self.settings.constructor_handling == ConstructorHandling::Default
            && contract.parameterized_creator().is_some()
        {
            return Ok(None);
        }
        let value = create()
            .map_err(|e| Error::host(format!("Error creating '{}'", contract.name), &e))?;
        contract.check_created(value).map(Some)
    }

    fn not_instantiable(contract: &Contract) -> Error {
        if contract.is_abstract {
            Error::resolution(format!(
                "Could not create an instance of type {}. Type is an interface or abstract class and cannot be instantiated.",
                contract.name
            ))
        } else {
            Error::resolution(format!(
                "Unable to find a constructor to use for type {}. A class should either have a default constructor, one constructor with arguments or a constructor marked with a designated creator.",
                contract.name
            ))
        }
    }

    /// Reads an object, list, dictionary or trait object whose metadata is consumed.
    fn read_composite(
        &mut self,
        contract: &Arc<Contract>,
        site: Site<'_>,
        meta: Metadata,
    ) -> Result<Box<dyn Any>> {
        if let ContractDetails::Polymorphic(ops) = &contract.details {
            return self.read_polymorphic(contract, ops, site, meta);
        }
        if !matches!(
            contract.details,
            ContractDetails::Object
                | ContractDetails::Dynamic(_)
                | ContractDetails::Array(_)
                | ContractDetails::Dictionary(_)
                | ContractDetails::Serializable(_)
        ) {
            return self.read_value(contract, site);
        }
        self.check_type_name(contract, meta.type_name.as_deref())?;
        self.expect_shape(contract, &meta)?;

        if let Some(mut instance) = self.create_default(contract)? {
            self.populate_body(&mut *instance, contract, site, meta.values)?;
            return Ok(instance);
        }

        match &contract.details {
            ContractDetails::Array(ops) => {
                let Some(from_items) = ops.from_items else {
                    return Err(Self::not_instantiable(contract));
                };
                let items = self.read_items(None, contract, *ops, site, meta.values)?;
                from_items(items)
                    .map_err(|e| Error::host(format!("Error creating '{}'", contract.name), &e))
            }
            ContractDetails::Serializable(ops) => self.read_serializable(contract, *ops),
            _ => {
                let creator = contract
                    .override_creator()
                    .or_else(|| contract.parameterized_creator());
                match creator {
                    Some(creator) => self.read_with_creator(contract, creator),
                    None => Err(Self::not_instantiable(contract)),
                }
            }
        }
    }

    fn read_polymorphic(
        &mut self,
        contract: &Contract,
        ops: &PolymorphicOps,
        site: Site<'_>,
        meta: Metadata,
    ) -> Result<Box<dyn Any>> {
        let Some(name) = meta.type_name.clone() else {
            return Err(Self::not_instantiable(contract));
        };
        let mut found = None;
        for implementor in &ops.implementors {
            let target = self.resolve(&implementor.target)?;
            if target.type_name == name || target.underlying_type.path() == name {
                found = Some((implementor.clone(), target));
                break;
            }
        }
        let Some((implementor, target)) = found else {
            return Err(self.type_name_error(&name, contract));
        };
        tracing::trace!(declared = %contract.name, concrete = %target.name, "dispatching on $type");

        let meta = Metadata {
            type_name: None,
            ..meta
        };
        let value = self.read_composite(&target, site, meta)?;
        (implementor.upcast)(value).map_err(|e| Error::member(e.to_string()))
    }

    fn read_shared(
        &mut self,
        contract: &Arc<Contract>,
        ops: SharedOps,
        site: Site<'_>,
    ) -> Result<Box<dyn Any>> {
        let inner = self.resolve(&ops.inner)?;
        let meta = self.read_metadata_if_object()?;
        if let Some(id) = meta.reference {
            return self.resolve_reference(&id, contract);
        }

        if !matches!(inner.details, ContractDetails::Polymorphic(_)) && meta.object {
            self.check_type_name(&inner, meta.type_name.as_deref())?;
            self.expect_shape(&inner, &meta)?;
            if let Some(instance) = self.create_default(&inner)? {
                let wrapped = (ops.wrap)(instance).map_err(|e| Error::member(e.to_string()))?;
                if let Some(id) = &meta.id {
                    self.register(id, contract, ops, &*wrapped)?;
                }
                {
                    let mut guard = (ops.borrow_mut)(&*wrapped).ok_or_else(|| {
                        Error::resolution(format!("Shared value of type '{}' is borrowed.", inner.name))
                    })?;
                    self.populate_body(&mut *guard, &inner, site, meta.values)?;
                }
                return Ok(wrapped);
            }
            if meta.id.is_some() && matches!(inner.details, ContractDetails::Array(_)) {
                return Err(Error::reference(format!(
                    "Cannot preserve reference to array or readonly list, or list created from a non-default constructor: {}.",
                    inner.name
                )));
            }
            // Shape and type name are checked; build through the remaining creators.
            let meta = Metadata {
                type_name: None,
                values: false,
                ..meta
            };
            let id = meta.id.clone();
            let value = match &inner.details {
                ContractDetails::Serializable(inner_ops) => self.read_serializable(&inner, *inner_ops)?,
                _ => {
                    let creator = inner
                        .override_creator()
                        .or_else(|| inner.parameterized_creator());
                    match creator {
                        Some(creator) => self.read_with_creator(&inner, creator)?,
                        None => return Err(Self::not_instantiable(&inner)),
                    }
                }
            };
            return self.wrap_and_register(contract, ops, value, id.as_deref());
        }

        let id = meta.id.clone();
        let value = if meta.object {
            self.read_composite(&inner, site, meta)?
        } else {
            self.read_value(&inner, site)?
        };
        self.wrap_and_register(contract, ops, value, id.as_deref())
    }

    fn wrap_and_register(
        &mut self,
        contract: &Contract,
        ops: SharedOps,
        value: Box<dyn Any>,
        id: Option<&str>,
    ) -> Result<Box<dyn Any>> {
        let wrapped = (ops.wrap)(value).map_err(|e| Error::member(e.to_string()))?;
        if let Some(id) = id {
            self.register(id, contract, ops, &*wrapped)?;
        }
        Ok(wrapped)
    }

    fn register(&mut self, id: &str, contract: &Contract, ops: SharedOps, value: &dyn Any) -> Result<()> {
        let handle = (ops.share)(value).ok_or_else(|| {
            Error::reference(format!("Value for '{}' cannot be shared.", contract.name))
        })?;
        self.references
            .add_reference(id, SharedHandle::new(contract.underlying_type, handle, ops.share))
            .map_err(|err| err.at(self.reader.location()))
    }

    fn resolve_reference(&mut self, id: &str, contract: &Contract) -> Result<Box<dyn Any>> {
        let handle = self
            .references
            .resolve_reference(id)
            .ok_or_else(|| Error::reference(format!("Could not resolve reference '{id}'.")))?;
        if handle.type_key() != contract.underlying_type {
            return Err(Error::reference(format!(
                "Reference '{id}' points to a value of type '{}', not '{}'.",
                handle.type_key(),
                contract.name
            )));
        }
        tracing::trace!(id, "resolved reference");
        handle
            .share()
            .ok_or_else(|| Error::reference(format!("Could not resolve reference '{id}'.")))
    }

    fn populate_root(&mut self, target: &mut dyn Any, contract: &Arc<Contract>) -> Result<()> {
        match &contract.details {
            ContractDetails::Nullable(ops) => {
                let inner = self.resolve(&ops.inner)?;
                match (ops.get_mut)(target) {
                    Some(value) => self.populate_root(value, &inner),
                    None => Err(Error::structure(format!(
                        "Cannot populate an empty '{}'.",
                        contract.name
                    ))),
                }
            }
            ContractDetails::Shared(ops) => {
                let inner = self.resolve(&ops.inner)?;
                let mut guard = (ops.borrow_mut)(&*target).ok_or_else(|| {
                    Error::resolution(format!("Shared value of type '{}' is borrowed.", inner.name))
                })?;
                self.populate_root(&mut *guard, &inner)
            }
            ContractDetails::Polymorphic(ops) => {
                let concrete = (ops.concrete_mut)(target)
                    .ok_or_else(|| Error::resolution(format!("Cannot populate '{}'.", contract.name)))?;
                let id = (*concrete).type_id();
                let implementor = ops
                    .implementors
                    .iter()
                    .find(|implementor| implementor.target.key().id() == id)
                    .ok_or_else(|| {
                        Error::resolution(format!(
                            "Runtime type of value held by '{}' is not a registered implementor.",
                            contract.name
                        ))
                    })?;
                let target_contract = self.resolve(&implementor.target)?;
                self.populate_root(concrete, &target_contract)
            }
            _ => {
                let meta = self.read_metadata_if_object()?;
                if meta.reference.is_some() {
                    return Err(Error::reference(
                        "Cannot populate a value from a reference.",
                    ));
                }
                self.check_type_name(contract, meta.type_name.as_deref())?;
                self.expect_shape(contract, &meta)?;
                self.populate_body(target, contract, Site::default(), meta.values)
            }
        }
    }

    /// Fills an existing instance from the current object or array.
    fn populate_body(
        &mut self,
        target: &mut dyn Any,
        contract: &Arc<Contract>,
        site: Site<'_>,
        wrapped: bool,
    ) -> Result<()> {
        match &contract.details {
            ContractDetails::Object | ContractDetails::Dynamic(_) => {
                self.populate_object(target, contract)
            }
            ContractDetails::Array(ops) => self
                .read_items(Some(target), contract, *ops, site, wrapped)
                .map(|_| ()),
            ContractDetails::Dictionary(ops) => self.populate_dictionary(target, contract, *ops, site),
            _ => Err(Error::structure(format!("Cannot populate '{}'.", contract.name))),
        }
    }

    fn populate_object(&mut self, target: &mut dyn Any, contract: &Arc<Contract>) -> Result<()> {
        let depth = self.reader.depth();
        let properties = contract.properties();
        let mut present = vec![false; properties.len()];

        loop {
            let mut name = None;
            match self.populate_member(target, contract, &properties, &mut present, &mut name) {
                Ok(true) => {}
                Ok(false) => break,
                Err(err) => {
                    let err = err.at(self.reader.location());
                    self.errors.offer(err, Some(&*target), name.as_deref())?;
                    self.recover(depth)?;
                }
            }
        }

        for (index, property) in properties.iter().enumerate() {
            if present[index] {
                continue;
            }
            if let Err(err) = self.complete_absent(target, contract, property) {
                let err = err.at(self.reader.location());
                self.errors
                    .offer(err, Some(&*target), Some(&property.property_name))?;
            }
        }
        Ok(())
    }

    /// Handles one member; `false` at the end of the object.
    fn populate_member(
        &mut self,
        target: &mut dyn Any,
        contract: &Arc<Contract>,
        properties: &PropertyCollection,
        present: &mut [bool],
        name_slot: &mut Option<String>,
    ) -> Result<bool> {
        let name = match self.reader.read_token()? {
            Token::EndObject => return Ok(false),
            Token::PropertyName(name) => name,
            other => {
                return Err(Error::structure(format!(
                    "Unexpected token when deserializing object: {other}."
                )))
            }
        };
        *name_slot = Some(name.clone());

        let Some(index) = properties.closest_index(&name) else {
            return self.missing_member(Some(target), contract, &name, None).map(|()| true);
        };
        present[index] = true;
        let Some(property) = properties.get(index) else {
            return Ok(true);
        };
        self.reader.read()?;

        if property.ignored
            || !property.writable
            || !property.accepts_read(&*target, &contract.name)?
        {
            self.reader.skip()?;
            return Ok(true);
        }
        if self.token_is_null() && self.skip_null(property)? {
            return Ok(true);
        }

        let member_contract = self.resolve(&property.property_type)?;
        let value = self.read_value(&member_contract, Site::member(property, contract))?;
        Self::set_member(target, contract, property, value)
    }

    /// Applies the null rules of `property`; `true` when the null is dropped.
    fn skip_null(&self, property: &JsonProperty) -> Result<bool> {
        if property.required == Required::Always {
            return Err(Error::member(format!(
                "Required property '{}' expects a value but got null.",
                property.property_name
            )));
        }
        let handling = property
            .null_value_handling
            .unwrap_or(self.settings.null_value_handling);
        Ok(handling == NullValueHandling::Ignore)
    }

    fn set_member(
        target: &mut dyn Any,
        contract: &Contract,
        property: &JsonProperty,
        value: Box<dyn Any>,
    ) -> Result<bool> {
        let Some(access) = property.access() else {
            return Ok(true);
        };
        access.set(target, value).map_err(|e| {
            Error::host(
                format!(
                    "Error setting value to '{}' on '{}'",
                    property.underlying_name, contract.name
                ),
                &e,
            )
        })?;
        Ok(true)
    }

    /// A JSON property with no matching member. The reader is on its name.
    fn missing_member(
        &mut self,
        target: Option<&mut dyn Any>,
        contract: &Contract,
        name: &str,
        pending: Option<&mut Vec<(String, JsonValue)>>,
    ) -> Result<()> {
        if let ContractDetails::Dynamic(ops) = &contract.details {
            self.reader.read()?;
            let json = self.reader.read_value_tree()?;
            return match (target, pending) {
                (Some(target), _) => (ops.set)(target, name, json).map_err(|e| {
                    Error::host(
                        format!("Error setting dynamic member '{name}' on '{}'", contract.name),
                        &e,
                    )
                }),
                (None, Some(pending)) => {
                    pending.push((name.to_string(), json));
                    Ok(())
                }
                (None, None) => Ok(()),
            };
        }
        if self.settings.missing_member_handling == MissingMemberHandling::Error {
            return Err(Error::member(format!(
                "Could not find member '{name}' on object of type '{}'",
                contract.name
            )));
        }
        tracing::trace!(member = name, type_name = %contract.name, "skipping unknown member");
        self.reader.skip()
    }

    /// Required check and default population for a member absent from the JSON.
    fn complete_absent(
        &mut self,
        target: &mut dyn Any,
        contract: &Contract,
        property: &JsonProperty,
    ) -> Result<()> {
        if property.ignored {
            return Ok(());
        }
        if property.required != Required::Default {
            return Err(Error::member(format!(
                "Required property '{}' not found in JSON.",
                property.property_name
            )));
        }
        let populates = property
            .default_value_handling
            .unwrap_or(self.settings.default_value_handling)
            .populates();
        if !populates || !property.writable {
            return Ok(());
        }
        let Some(default) = property.resolved_default_value() else {
            return Ok(());
        };
        let member_contract = self.resolve(&property.property_type)?;
        let value = self.value_from_json(&member_contract, &default)?;
        Self::set_member(target, contract, property, value).map(|_| ())
    }

    /// Buffers members until the end of the object, then invokes `creator`.
    fn read_with_creator(
        &mut self,
        contract: &Arc<Contract>,
        creator: ParameterizedCreator,
    ) -> Result<Box<dyn Any>> {
        let depth = self.reader.depth();
        let parameters = contract.creator_parameters();
        let properties = contract.properties();
        let mut args: Vec<Option<Box<dyn Any>>> = (0..parameters.len()).map(|_| None).collect();
        let mut extras: Vec<(Arc<JsonProperty>, Box<dyn Any>)> = Vec::new();
        let mut dynamic: Vec<(String, JsonValue)> = Vec::new();
        let mut present = vec![false; properties.len()];

        loop {
            let mut name = None;
            let step = self.collect_member(
                contract,
                &parameters,
                &properties,
                &mut args,
                &mut extras,
                &mut dynamic,
                &mut present,
                &mut name,
            );
            match step {
                Ok(true) => {}
                Ok(false) => break,
                Err(err) => {
                    let err = err.at(self.reader.location());
                    self.errors.offer(err, None, name.as_deref())?;
                    self.recover(depth)?;
                }
            }
        }

        for (index, slot) in args.iter_mut().enumerate() {
            if slot.is_some() {
                continue;
            }
            let Some(parameter) = parameters.get(index) else {
                continue;
            };
            if let Some(default) = parameter.resolved_default_value() {
                let parameter_contract = self.resolve(&parameter.property_type)?;
                *slot = Some(self.value_from_json(&parameter_contract, &default)?);
            }
        }

        let value = creator(CreatorArgs::new(args))
            .map_err(|e| Error::host(format!("Error creating '{}'", contract.name), &e))?;
        let mut instance = contract.check_created(value)?;
        tracing::trace!(type_name = %contract.name, "created through constructor");

        for (property, value) in extras {
            let applied = property
                .accepts_read(&*instance, &contract.name)
                .and_then(|accepted| {
                    if accepted {
                        Self::set_member(&mut *instance, contract, &property, value).map(|_| ())
                    } else {
                        Ok(())
                    }
                });
            if let Err(err) = applied {
                let err = err.at(self.reader.location());
                self.errors
                    .offer(err, Some(&*instance), Some(&property.property_name))?;
            }
        }
        if let ContractDetails::Dynamic(ops) = &contract.details {
            for (name, json) in dynamic {
                (ops.set)(&mut *instance, &name, json).map_err(|e| {
                    Error::host(
                        format!("Error setting dynamic member '{name}' on '{}'", contract.name),
                        &e,
                    )
                })?;
            }
        }
        for (index, property) in properties.iter().enumerate() {
            let is_parameter = parameters
                .get_closest_match(&property.property_name)
                .is_some();
            if present[index] || (is_parameter && property.required == Required::Default) {
                continue;
            }
            if let Err(err) = self.complete_absent(&mut *instance, contract, property) {
                let err = err.at(self.reader.location());
                self.errors
                    .offer(err, Some(&*instance), Some(&property.property_name))?;
            }
        }
        Ok(instance)
    }

    #[allow(clippy::too_many_arguments)]
    fn collect_member(
        &mut self,
        contract: &Arc<Contract>,
        parameters: &PropertyCollection,
        properties: &PropertyCollection,
        args: &mut [Option<Box<dyn Any>>],
        extras: &mut Vec<(Arc<JsonProperty>, Box<dyn Any>)>,
        dynamic: &mut Vec<(String, JsonValue)>,
        present: &mut [bool],
        name_slot: &mut Option<String>,
    ) -> Result<bool> {
        let name = match self.reader.read_token()? {
            Token::EndObject => return Ok(false),
            Token::PropertyName(name) => name,
            other => {
                return Err(Error::structure(format!(
                    "Unexpected token when deserializing object: {other}."
                )))
            }
        };
        *name_slot = Some(name.clone());
        let property_index = properties.closest_index(&name);
        if let Some(index) = property_index {
            present[index] = true;
        }

        if let Some(index) = parameters.closest_index(&name) {
            let Some(parameter) = parameters.get(index) else {
                return Ok(true);
            };
            self.reader.read()?;
            if self.token_is_null() {
                let rules = property_index
                    .and_then(|i| properties.get(i))
                    .unwrap_or(parameter);
                if self.skip_null(rules)? {
                    return Ok(true);
                }
            }
            let parameter_contract = self.resolve(&parameter.property_type)?;
            let value = self.read_value(&parameter_contract, Site::member(parameter, contract))?;
            args[index] = Some(value);
            return Ok(true);
        }

        let Some(property) = property_index.and_then(|i| properties.get(i)) else {
            self.missing_member(None, contract, &name, Some(dynamic))?;
            return Ok(true);
        };
        self.reader.read()?;
        if property.ignored || !property.writable {
            self.reader.skip()?;
            return Ok(true);
        }
        if self.token_is_null() && self.skip_null(property)? {
            return Ok(true);
        }
        let member_contract = self.resolve(&property.property_type)?;
        let value = self.read_value(&member_contract, Site::member(property, contract))?;
        extras.push((Arc::clone(property), value));
        Ok(true)
    }

    /// Reads array items, pushing them into `target` or collecting them.
    fn read_items(
        &mut self,
        mut target: Option<&mut dyn Any>,
        contract: &Contract,
        ops: ListOps,
        site: Site<'_>,
        wrapped: bool,
    ) -> Result<Vec<Box<dyn Any>>> {
        let depth = self.reader.depth();
        let item_contract = self.resolve(&ops.item)?;
        let item_site = Site::item(contract, site);
        let mut collected = Vec::new();
        let mut index = 0_usize;

        loop {
            let step = match self.reader.read_token() {
                Ok(Token::EndArray) => break,
                Ok(_) => self.read_value(&item_contract, item_site),
                Err(err) => Err(err),
            };
            match step {
                Ok(item) => match target.as_deref_mut() {
                    Some(list) => {
                        if let Err(e) = (ops.push)(list, item) {
                            let err = Error::host(
                                format!("Error adding item to '{}'", contract.name),
                                &e,
                            )
                            .at(self.reader.location());
                            self.errors.offer(err, Some(&*list), Some(&index.to_string()))?;
                        }
                    }
                    None => collected.push(item),
                },
                Err(err) => {
                    let err = err.at(self.reader.location());
                    self.errors
                        .offer(err, target.as_deref(), Some(&index.to_string()))?;
                    self.recover(depth)?;
                }
            }
            index += 1;
        }

        if wrapped {
            self.reader.skip_to_depth(depth.saturating_sub(2))?;
        }
        Ok(collected)
    }

    fn populate_dictionary(
        &mut self,
        target: &mut dyn Any,
        contract: &Contract,
        ops: MapOps,
        site: Site<'_>,
    ) -> Result<()> {
        let depth = self.reader.depth();
        let value_contract = self.resolve(&ops.value)?;
        let item_site = Site::item(contract, site);

        loop {
            let mut key = None;
            match self.read_entry(target, contract, ops, &value_contract, item_site, &mut key) {
                Ok(true) => {}
                Ok(false) => break,
                Err(err) => {
                    let err = err.at(self.reader.location());
                    self.errors.offer(err, Some(&*target), key.as_deref())?;
                    self.recover(depth)?;
                }
            }
        }
        Ok(())
    }

    fn read_entry(
        &mut self,
        target: &mut dyn Any,
        contract: &Contract,
        ops: MapOps,
        value_contract: &Arc<Contract>,
        site: Site<'_>,
        key_slot: &mut Option<String>,
    ) -> Result<bool> {
        let key = match self.reader.read_token()? {
            Token::EndObject => return Ok(false),
            Token::PropertyName(key) => key,
            other => {
                return Err(Error::structure(format!(
                    "Unexpected token when deserializing dictionary: {other}."
                )))
            }
        };
        *key_slot = Some(key.clone());
        self.reader.read()?;
        let value = self.read_value(value_contract, site)?;
        (ops.insert)(target, &key, value).map_err(|e| {
            Error::host(
                format!("Error adding key '{key}' to '{}'", contract.name),
                &e,
            )
        })?;
        Ok(true)
    }

    fn read_serializable(&mut self, contract: &Contract, ops: SerializableOps) -> Result<Box<dyn Any>> {
        let mut data = JsonMap::new();
        loop {
            match self.reader.read_token()? {
                Token::EndObject => break,
                Token::PropertyName(name) => {
                    self.reader.read()?;
                    data.insert(name, self.reader.read_value_tree()?);
                }
                other => {
                    return Err(Error::structure(format!(
                        "Unexpected token when deserializing object: {other}."
                    )))
                }
            }
        }
        (ops.read)(data).map_err(|e| {
            Error::host(format!("Error creating '{}' from its members", contract.name), &e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::describe::{param, shared, Shared, TypeDescriptor};
    use crate::settings::PreserveReferencesHandling;
    use crate::ErrorDecision;
    use std::rc::Rc;

    #[derive(Debug, Default, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    impl Describe for Point {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::object::<Point>()
                .field("X", |p: &Point| &p.x, |p: &mut Point| &mut p.x)
                .field("Y", |p: &Point| &p.y, |p: &mut Point| &mut p.y)
                .default_constructor(Point::default)
                .build()
        }
    }

    #[derive(Debug, PartialEq)]
    struct Span {
        start: u32,
        end: u32,
        label: String,
    }

    impl Describe for Span {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::object::<Span>()
                .field("Start", |s: &Span| &s.start, |s: &mut Span| &mut s.start)
                .field("End", |s: &Span| &s.end, |s: &mut Span| &mut s.end)
                .field("Label", |s: &Span| &s.label, |s: &mut Span| &mut s.label)
                .constructor(&[param::<u32>("start"), param::<u32>("end")], |mut args| {
                    Ok(Span {
                        start: args.take(0)?,
                        end: args.take(1)?,
                        label: String::new(),
                    })
                })
                .build()
        }
    }

    fn read<T: Describe>(json: &str, settings: &SerializerSettings) -> Result<T> {
        Deserializer::new(json, settings).deserialize()
    }

    #[test]
    fn test_default_creator_object() {
        let point: Point = read(r#"{"X": 1, "Y": -2}"#, &SerializerSettings::new()).unwrap();
        assert_eq!(point, Point { x: 1, y: -2 });
    }

    #[test]
    fn test_case_insensitive_member_match() {
        let point: Point = read(r#"{"x": 5}"#, &SerializerSettings::new()).unwrap();
        assert_eq!(point, Point { x: 5, y: 0 });
    }

    #[test]
    fn test_parameterized_creator_sets_remaining_members() {
        let span: Span = read(
            r#"{"Label": "body", "end": 9, "START": 3}"#,
            &SerializerSettings::new(),
        )
        .unwrap();
        assert_eq!(
            span,
            Span {
                start: 3,
                end: 9,
                label: "body".into()
            }
        );
    }

    #[test]
    fn test_missing_parameter_uses_zero_value() {
        let span: Span = read(r#"{"Start": 3}"#, &SerializerSettings::new()).unwrap();
        assert_eq!(span.end, 0);
    }

    #[test]
    fn test_unknown_member_error() {
        let settings = SerializerSettings::new()
            .with_missing_member_handling(MissingMemberHandling::Error);
        let err = read::<Point>(r#"{"X": 1, "Z": 2}"#, &settings).unwrap_err();
        assert!(matches!(err, Error::Member { .. }));
        assert_eq!(err.message(), "Could not find member 'Z' on object of type 'Point'");
        assert_eq!(err.path(), "Z");
    }

    #[test]
    fn test_object_into_array_is_rejected() {
        let err = read::<Vec<i32>>(r#"{"a": 1}"#, &SerializerSettings::new()).unwrap_err();
        assert!(err.message().starts_with("Cannot deserialize the current JSON object"));
    }

    #[test]
    fn test_handled_item_is_dropped() {
        let settings = SerializerSettings::new().with_error_handler(|_, _| ErrorDecision::Handled);
        let values: Vec<Point> =
            read(r#"[{"X": 1}, {"X": "bad"}, {"Y": 2}]"#, &settings).unwrap();
        assert_eq!(values, vec![Point { x: 1, y: 0 }, Point { x: 0, y: 0 }, Point { x: 0, y: 2 }]);
    }

    #[test]
    fn test_references_share_allocation() {
        let settings = SerializerSettings::new()
            .with_preserve_references_handling(PreserveReferencesHandling::Objects);
        let values: Vec<Shared<Point>> =
            read(r#"[{"$id":"1","X":1,"Y":2},{"$ref":"1"}]"#, &settings).unwrap();
        assert!(Rc::ptr_eq(&values[0], &values[1]));
        assert_eq!(values[1].borrow().y, 2);
    }

    #[test]
    fn test_unresolved_reference() {
        let err = read::<Vec<Shared<Point>>>(r#"[{"$ref":"4"}]"#, &SerializerSettings::new())
            .unwrap_err();
        assert_eq!(err.message(), "Could not resolve reference '4'.");
    }

    #[test]
    fn test_wrapped_list_reference() {
        let values: Vec<Shared<Vec<u8>>> = read(
            r#"[{"$id":"1","$values":[1,2]},{"$ref":"1"}]"#,
            &SerializerSettings::new(),
        )
        .unwrap();
        assert!(Rc::ptr_eq(&values[0], &values[1]));
        assert_eq!(*values[0].borrow(), vec![1, 2]);
    }

    #[test]
    fn test_populate_keeps_other_members() {
        let settings = SerializerSettings::new();
        let mut point = Point { x: 1, y: 7 };
        Deserializer::new(r#"{"X": 3}"#, &settings)
            .populate(&mut point)
            .unwrap();
        assert_eq!(point, Point { x: 3, y: 7 });

        let target = shared(Point::default());
        Deserializer::new(r#"{"Y": 4}"#, &settings)
            .populate(&mut target.clone())
            .unwrap();
        assert_eq!(target.borrow().y, 4);
    }

    #[test]
    fn test_additional_content() {
        let err = read::<i32>("1 2", &SerializerSettings::new()).unwrap_err();
        assert!(err.message().starts_with("Additional text encountered"));
        let lenient = SerializerSettings::new().with_check_additional_content(false);
        assert_eq!(read::<i32>("1 2", &lenient).unwrap(), 1);
    }
}
