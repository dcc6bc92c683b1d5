//! Graph serializer: walks a described value and writes JSON.
//!
//! ## Overview
//!
//! The serializer resolves the contract of every value it meets and writes it
//! according to its kind:
//!
//! - **Primitive**: a single JSON value
//! - **Object**: `{...}` with the contract's properties, in order
//! - **Array**: `[...]`, or `{"$id":..,"$values":[...]}` when metadata is needed
//! - **Dictionary**: `{...}` keyed by the entry keys
//! - **Dynamic**: declared members, then the open member set
//! - **Serializable**: the member map the type writes itself
//!
//! Shared values (`Rc<RefCell<T>>`) are the only values with identity. While
//! one is being written it sits on the write stack; meeting it again is a
//! self referencing loop handled by [`ReferenceLoopHandling`]. With reference
//! preservation on, the first occurrence gets `$id` and later ones `{"$ref":..}`.
//!
//! ## Usage
//!
//! ```rust
//! use jsongraph::describe::{shared, Shared};
//! use jsongraph::ser::Serializer;
//! use jsongraph::{PreserveReferencesHandling, SerializerSettings};
//!
//! let settings = SerializerSettings::new()
//!     .with_preserve_references_handling(PreserveReferencesHandling::All);
//! let item: Shared<Vec<i32>> = shared(vec![1]);
//! let mut serializer = Serializer::new(&settings);
//! serializer.serialize(&vec![Some(item.clone()), Some(item)]).unwrap();
//! assert_eq!(serializer.into_inner(), r#"[{"$id":"1","$values":[1]},{"$ref":"1"}]"#);
//! ```
//!
//! Arrays are only tracked when the policy covers them:
//!
//! ```rust
//! use jsongraph::describe::shared;
//! use jsongraph::{to_string_with_settings, PreserveReferencesHandling, SerializerSettings};
//!
//! let settings = SerializerSettings::new()
//!     .with_preserve_references_handling(PreserveReferencesHandling::Arrays);
//! let list = shared(vec![true]);
//! let text = to_string_with_settings(&vec![list.clone(), list], &settings).unwrap();
//! assert_eq!(text, r#"[{"$id":"1","$values":[true]},{"$ref":"1"}]"#);
//! ```

use std::any::Any;
use std::sync::Arc;

use crate::contract::{Contract, ContractDetails, ContractKind, JsonProperty};
use crate::converter::JsonConverter;
use crate::describe::{Describe, DynamicOps, ListOps, MapOps, SerializableOps, SharedOps};
use crate::error::{Error, ErrorPipeline, Location, Result};
use crate::map::JsonMap;
use crate::reference::{DefaultReferenceResolver, ReferenceResolver};
use crate::resolver::ContractResolver;
use crate::settings::{
    NullValueHandling, ReferenceLoopHandling, SerializerSettings, TypeNameFormat,
    TypeNameHandling,
};
use crate::value::JsonValue;
use crate::writer::JsonWriter;

/// Where a value sits: the member holding it and the container around it.
///
/// Per-value policies are looked up from the most specific to the most general:
/// the member, the member holding the container, the container contract, the
/// value's own contract, then the settings.
#[derive(Clone, Copy, Default)]
pub(crate) struct Site<'c> {
    pub(crate) member: Option<&'c JsonProperty>,
    pub(crate) container: Option<&'c Contract>,
    pub(crate) container_member: Option<&'c JsonProperty>,
}

impl<'c> Site<'c> {
    pub(crate) fn member(member: &'c JsonProperty, container: &'c Contract) -> Self {
        Site {
            member: Some(member),
            container: Some(container),
            container_member: None,
        }
    }

    /// The site of an element of `container`, itself held by `holder`.
    pub(crate) fn item(container: &'c Contract, holder: Site<'c>) -> Self {
        Site {
            member: None,
            container: Some(container),
            container_member: holder.member,
        }
    }

    pub(crate) fn is_reference(&self, contract: &Contract, settings: &SerializerSettings) -> bool {
        self.member
            .and_then(|m| m.is_reference)
            .or_else(|| self.container_member.and_then(|m| m.item_is_reference))
            .or_else(|| self.container.and_then(|c| c.item_is_reference))
            .or(contract.is_reference)
            .unwrap_or_else(|| settings.preserve_references_handling.covers(contract.kind))
    }

    pub(crate) fn loop_handling(&self, settings: &SerializerSettings) -> ReferenceLoopHandling {
        self.member
            .and_then(|m| m.reference_loop_handling)
            .or_else(|| {
                self.container_member
                    .and_then(|m| m.item_reference_loop_handling)
            })
            .or_else(|| self.container.and_then(|c| c.item_reference_loop_handling))
            .unwrap_or(settings.reference_loop_handling)
    }

    pub(crate) fn type_name_handling(&self, settings: &SerializerSettings) -> TypeNameHandling {
        self.member
            .and_then(|m| m.type_name_handling)
            .or_else(|| self.container_member.and_then(|m| m.item_type_name_handling))
            .or_else(|| self.container.and_then(|c| c.item_type_name_handling))
            .unwrap_or(settings.type_name_handling)
    }

    fn property_name(&self) -> Option<&'c str> {
        self.member.map(|m| m.property_name.as_str())
    }
}

/// What to write in a slot, decided before its name is written.
enum Plan {
    Write,
    Skip,
    Reference(String),
}

/// The `$type` value for `contract`, if the policy asks for one.
pub(crate) fn type_name_for(
    contract: &Contract,
    handling: TypeNameHandling,
    format: TypeNameFormat,
    dispatched: bool,
) -> Option<String> {
    let write = match handling {
        TypeNameHandling::None => false,
        TypeNameHandling::Objects => contract.kind != ContractKind::Array,
        TypeNameHandling::Arrays => contract.kind == ContractKind::Array,
        TypeNameHandling::All => true,
        TypeNameHandling::Auto => dispatched,
    };
    write.then(|| match format {
        TypeNameFormat::Simple => contract.type_name.clone(),
        TypeNameFormat::Full => contract.underlying_type.path().to_string(),
    })
}

/// Metadata written at the head of a composite value.
#[derive(Default)]
struct Header {
    id: Option<String>,
    type_name: Option<String>,
}

impl Header {
    fn is_empty(&self) -> bool {
        self.id.is_none() && self.type_name.is_none()
    }
}

/// Writes described values as JSON text.
pub struct Serializer<'s> {
    writer: JsonWriter,
    settings: &'s SerializerSettings,
    resolver: Arc<ContractResolver>,
    references: Box<dyn ReferenceResolver>,
    stack: Vec<usize>,
    // Strong clones of every value that was given an id, so its address
    // cannot be reused by a later allocation while the id is live.
    retained: Vec<Box<dyn Any>>,
    errors: ErrorPipeline,
}

impl<'s> Serializer<'s> {
    /// Creates a serializer with its own reference table and error pipeline.
    #[must_use]
    pub fn new(settings: &'s SerializerSettings) -> Self {
        Serializer {
            writer: JsonWriter::new(settings.formatting, settings.indent),
            resolver: settings
                .contract_resolver
                .clone()
                .unwrap_or_else(ContractResolver::shared),
            references: settings.reference_resolver.as_ref().map_or_else(
                || Box::new(DefaultReferenceResolver::new()) as Box<dyn ReferenceResolver>,
                |factory| factory(),
            ),
            stack: Vec::new(),
            retained: Vec::new(),
            errors: ErrorPipeline::new(settings.error_handler.clone()),
            settings,
        }
    }

    /// Writes `value` as the root of the document.
    ///
    /// # Errors
    ///
    /// A failure the error handler did not suppress: a self referencing loop,
    /// a failing accessor or converter, or a depth overflow.
    pub fn serialize<T: Describe>(&mut self, value: &T) -> Result<()> {
        let contract = self.resolver.resolve_contract::<T>()?;
        tracing::debug!(type_name = %contract.name, "serializing");
        if let Err(err) = self.write_value(value, &contract, Site::default(), Header::default()) {
            let err = err.at(Location::at_path(self.writer.path()));
            self.errors.offer(err, None, None)?;
            self.writer.recover(0);
        }
        Ok(())
    }

    /// Consumes the serializer and returns the JSON text.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.writer.into_inner()
    }

    fn resolve(&self, type_ref: &crate::describe::TypeRef) -> Result<Arc<Contract>> {
        self.resolver.resolve_contract_for(type_ref)
    }

    /// Identity of the shared value behind `value`, with the contract of what it wraps.
    fn identity_of(
        &self,
        value: &dyn Any,
        contract: &Contract,
    ) -> Result<Option<(usize, Arc<Contract>)>> {
        match &contract.details {
            ContractDetails::Nullable(ops) => match (ops.get)(value) {
                Some(inner) => {
                    let inner_contract = self.resolve(&ops.inner)?;
                    self.identity_of(inner, &inner_contract)
                }
                None => Ok(None),
            },
            ContractDetails::Shared(ops) => match (ops.identity)(value) {
                Some(identity) => Ok(Some((identity, self.resolve(&ops.inner)?))),
                None => Ok(None),
            },
            _ => Ok(None),
        }
    }

    fn plan(&mut self, value: &dyn Any, contract: &Contract, site: Site<'_>, path: &str) -> Result<Plan> {
        let Some((identity, inner)) = self.identity_of(value, contract)? else {
            return Ok(Plan::Write);
        };
        if site.is_reference(contract, self.settings) && self.references.is_referenced(identity) {
            return Ok(Plan::Reference(self.references.get_reference(identity)));
        }
        if !self.stack.contains(&identity) {
            return Ok(Plan::Write);
        }
        match site.loop_handling(self.settings) {
            ReferenceLoopHandling::Error => {
                let message = match site.property_name() {
                    Some(property) => format!(
                        "Self referencing loop detected for property '{property}' with type '{}'.",
                        inner.name
                    ),
                    None => format!("Self referencing loop detected with type '{}'.", inner.name),
                };
                Err(Error::loop_detected(message, Location::at_path(path)))
            }
            ReferenceLoopHandling::Ignore => {
                tracing::debug!(path, "skipping self referencing loop");
                Ok(Plan::Skip)
            }
            ReferenceLoopHandling::Serialize => Ok(Plan::Write),
        }
    }

    fn converter_for(&self, site: Site<'_>, contract: &Contract) -> Option<Arc<dyn JsonConverter>> {
        let key = contract.underlying_type;
        site.member
            .and_then(|m| m.converter.clone())
            .filter(|c| c.can_write() && c.can_convert(key))
            .or_else(|| contract.converter().filter(|c| c.can_write()))
            .or_else(|| {
                self.settings
                    .converters
                    .iter()
                    .find(|c| c.can_write() && c.can_convert(key))
                    .cloned()
            })
    }

    fn write_value(
        &mut self,
        value: &dyn Any,
        contract: &Arc<Contract>,
        site: Site<'_>,
        header: Header,
    ) -> Result<()> {
        if let Some(converter) = self.converter_for(site, contract) {
            let json = converter.write_json(value).map_err(|e| {
                Error::host(format!("Error writing '{}' with a converter", contract.name), &e)
            })?;
            self.writer.write_value(&json);
            return Ok(());
        }

        match &contract.details {
            ContractDetails::Primitive(ops) => {
                let json = (ops.to_json)(value).map_err(|e| {
                    Error::host(format!("Error converting value of type '{}'", contract.name), &e)
                })?;
                self.writer.write_value(&json);
                Ok(())
            }
            ContractDetails::Nullable(ops) => match (ops.get)(value) {
                Some(inner) => {
                    let inner_contract = self.resolve(&ops.inner)?;
                    self.write_value(inner, &inner_contract, site, header)
                }
                None => {
                    self.writer.write_null();
                    Ok(())
                }
            },
            ContractDetails::Shared(ops) => self.write_shared(value, contract, *ops, site),
            ContractDetails::Polymorphic(ops) => {
                let (concrete, implementor) = ops.implementor_of(value).ok_or_else(|| {
                    Error::resolution(format!(
                        "Runtime type of value held by '{}' is not a registered implementor.",
                        contract.name
                    ))
                })?;
                let concrete_contract = self.resolve(&implementor.target)?;
                let header = Header {
                    type_name: header
                        .type_name
                        .or_else(|| self.type_name(&concrete_contract, site, true)),
                    ..header
                };
                self.write_value(concrete, &concrete_contract, site, header)
            }
            details => {
                let header = Header {
                    type_name: header
                        .type_name
                        .or_else(|| self.type_name(contract, site, false)),
                    ..header
                };
                match details {
                    ContractDetails::Array(ops) => self.write_array(value, contract, *ops, site, header),
                    ContractDetails::Dictionary(ops) => {
                        self.write_dictionary(value, contract, *ops, site, header)
                    }
                    ContractDetails::Serializable(ops) => {
                        self.write_serializable(value, contract, *ops, header)
                    }
                    ContractDetails::Dynamic(ops) => {
                        self.write_object(value, contract, Some(*ops), header)
                    }
                    _ => self.write_object(value, contract, None, header),
                }
            }
        }
    }

    fn type_name(&self, contract: &Contract, site: Site<'_>, dispatched: bool) -> Option<String> {
        type_name_for(
            contract,
            site.type_name_handling(self.settings),
            self.settings.type_name_format,
            dispatched,
        )
    }

    fn write_shared(
        &mut self,
        value: &dyn Any,
        contract: &Contract,
        ops: SharedOps,
        site: Site<'_>,
    ) -> Result<()> {
        let inner_contract = self.resolve(&ops.inner)?;
        let identity = (ops.identity)(value);
        let guard = (ops.borrow)(value).ok_or_else(|| {
            Error::resolution(format!(
                "Shared value of type '{}' is mutably borrowed.",
                inner_contract.name
            ))
        })?;

        let mut header = Header::default();
        if let Some(identity) = identity {
            if site.is_reference(contract, self.settings) {
                if !self.references.is_referenced(identity) {
                    self.retained.extend((ops.share)(value));
                }
                header.id = Some(self.references.get_reference(identity));
            }
            self.stack.push(identity);
        }
        let result = self.write_value(&*guard, &inner_contract, site, header);
        if identity.is_some() {
            self.stack.pop();
        }
        result
    }

    fn enter(&self) -> Result<()> {
        match self.settings.max_depth {
            Some(max) if self.writer.depth() >= max => Err(Error::MaxDepth {
                message: format!("Maximum serialization depth of {max} has been exceeded."),
                location: Some(Location::at_path(self.writer.next_path(None))),
            }),
            _ => Ok(()),
        }
    }

    fn write_header(&mut self, header: Header) {
        if let Some(id) = header.id {
            self.writer.write_property_name("$id", false);
            self.writer.write_value(&JsonValue::String(id));
        }
        if let Some(type_name) = header.type_name {
            self.writer.write_property_name("$type", false);
            self.writer.write_value(&JsonValue::String(type_name));
        }
    }

    fn write_reference(&mut self, id: String) {
        self.writer.write_start_object();
        self.writer.write_property_name("$ref", false);
        self.writer.write_value(&JsonValue::String(id));
        self.writer.write_end_object();
    }

    fn write_object(
        &mut self,
        value: &dyn Any,
        contract: &Contract,
        dynamic: Option<DynamicOps>,
        header: Header,
    ) -> Result<()> {
        self.enter()?;
        self.writer.write_start_object();
        let depth = self.writer.depth();
        self.write_header(header);

        let properties = contract.properties();
        for property in properties.iter() {
            if let Err(err) = self.write_property(value, contract, property) {
                self.errors.offer(err, Some(value), Some(&property.property_name))?;
                self.writer.recover(depth);
            }
        }

        if let Some(ops) = dynamic {
            for (name, json) in (ops.entries)(value) {
                if properties.iter().any(|p| p.property_name == name) {
                    continue;
                }
                if json.is_null() && self.settings.null_value_handling == NullValueHandling::Ignore {
                    continue;
                }
                let key = self.resolver.resolve_dictionary_key(&name);
                self.writer.write_property_name(&key, true);
                self.writer.write_value(json);
            }
        }

        self.writer.write_end_object();
        Ok(())
    }

    fn write_property(
        &mut self,
        target: &dyn Any,
        contract: &Contract,
        property: &JsonProperty,
    ) -> Result<()> {
        if property.ignored || !property.readable {
            return Ok(());
        }
        let path = self.writer.next_path(Some(&property.property_name));
        self.write_property_at(target, contract, property)
            .map_err(|err| err.at(Location::at_path(path)))
    }

    fn write_property_at(
        &mut self,
        target: &dyn Any,
        contract: &Contract,
        property: &JsonProperty,
    ) -> Result<()> {
        if !property.accepts_write(target, &contract.name)? {
            return Ok(());
        }
        let Some(access) = property.access() else {
            return Ok(());
        };
        let member = access.get(target).map_err(|e| {
            Error::host(
                format!(
                    "Error getting value from '{}' on '{}'",
                    property.underlying_name, contract.name
                ),
                &e,
            )
        })?;
        let value = member.as_any();
        let member_contract = self.resolve(&property.property_type)?;

        let null_handling = property
            .null_value_handling
            .unwrap_or(self.settings.null_value_handling);
        if null_handling == NullValueHandling::Ignore && is_null(value, &member_contract) {
            return Ok(());
        }
        let default_handling = property
            .default_value_handling
            .unwrap_or(self.settings.default_value_handling);
        if default_handling.ignores() && is_default(value, &member_contract, property) {
            return Ok(());
        }

        let site = Site::member(property, contract);
        let path = self.writer.next_path(Some(&property.property_name));
        match self.plan(value, &member_contract, site, &path)? {
            Plan::Skip => Ok(()),
            Plan::Reference(id) => {
                self.writer
                    .write_property_name(&property.property_name, !property.skip_property_name_escape);
                self.write_reference(id);
                Ok(())
            }
            Plan::Write => {
                self.writer
                    .write_property_name(&property.property_name, !property.skip_property_name_escape);
                self.write_value(value, &member_contract, site, Header::default())
            }
        }
    }

    /// Writes one element or dictionary entry; the slot name is already decided.
    fn write_slot(
        &mut self,
        value: &dyn Any,
        contract: &Arc<Contract>,
        site: Site<'_>,
        name: Option<&str>,
    ) -> Result<()> {
        let path = self.writer.next_path(name);
        let result = match self.plan(value, contract, site, &path) {
            Ok(Plan::Skip) => Ok(()),
            Ok(Plan::Reference(id)) => {
                if let Some(name) = name {
                    self.writer.write_property_name(name, true);
                }
                self.write_reference(id);
                Ok(())
            }
            Ok(Plan::Write) => {
                if let Some(name) = name {
                    self.writer.write_property_name(name, true);
                }
                self.write_value(value, contract, site, Header::default())
            }
            Err(err) => Err(err),
        };
        result.map_err(|err| err.at(Location::at_path(path)))
    }

    fn write_array(
        &mut self,
        value: &dyn Any,
        contract: &Contract,
        ops: ListOps,
        site: Site<'_>,
        header: Header,
    ) -> Result<()> {
        self.enter()?;
        let wrapped = !header.is_empty();
        if wrapped {
            self.writer.write_start_object();
            self.write_header(header);
            self.writer.write_property_name("$values", false);
        }
        self.writer.write_start_array();
        let depth = self.writer.depth();

        let item_contract = self.resolve(&ops.item)?;
        let item_site = Site::item(contract, site);
        for (index, item) in (ops.items)(value).into_iter().enumerate() {
            if let Err(err) = self.write_slot(item, &item_contract, item_site, None) {
                self.errors.offer(err, Some(value), Some(&index.to_string()))?;
                self.writer.recover(depth);
            }
        }

        self.writer.write_end_array();
        if wrapped {
            self.writer.write_end_object();
        }
        Ok(())
    }

    fn write_dictionary(
        &mut self,
        value: &dyn Any,
        contract: &Contract,
        ops: MapOps,
        site: Site<'_>,
        header: Header,
    ) -> Result<()> {
        self.enter()?;
        self.writer.write_start_object();
        let depth = self.writer.depth();
        self.write_header(header);

        let value_contract = self.resolve(&ops.value)?;
        let item_site = Site::item(contract, site);
        for (key, item) in (ops.entries)(value) {
            let name = self.resolver.resolve_dictionary_key(&key);
            if let Err(err) = self.write_slot(item, &value_contract, item_site, Some(&name)) {
                self.errors.offer(err, Some(value), Some(&key))?;
                self.writer.recover(depth);
            }
        }

        self.writer.write_end_object();
        Ok(())
    }

    fn write_serializable(
        &mut self,
        value: &dyn Any,
        contract: &Contract,
        ops: SerializableOps,
        header: Header,
    ) -> Result<()> {
        self.enter()?;
        let mut data = JsonMap::new();
        (ops.write)(value, &mut data).map_err(|e| {
            Error::host(format!("Error getting object data from '{}'", contract.name), &e)
        })?;
        self.writer.write_start_object();
        self.write_header(header);
        for (name, member) in data.iter() {
            self.writer.write_property_name(name, true);
            self.writer.write_value(member);
        }
        self.writer.write_end_object();
        Ok(())
    }
}

fn is_null(value: &dyn Any, contract: &Contract) -> bool {
    match &contract.details {
        ContractDetails::Nullable(ops) => (ops.get)(value).is_none(),
        ContractDetails::Primitive(ops) => matches!((ops.to_json)(value), Ok(JsonValue::Null)),
        _ => false,
    }
}

fn is_default(value: &dyn Any, contract: &Contract, property: &JsonProperty) -> bool {
    let Some(default) = property.resolved_default_value() else {
        return false;
    };
    match &contract.details {
        ContractDetails::Nullable(ops) => (ops.get)(value).is_none() && default.is_null(),
        ContractDetails::Primitive(ops) => (ops.to_json)(value).map_or(false, |json| json == default),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::describe::{shared, Shared, TypeDescriptor};
    use crate::settings::PreserveReferencesHandling;

    struct Node {
        name: String,
        next: Option<Shared<Node>>,
    }

    impl Describe for Node {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::object::<Node>()
                .field("Name", |n: &Node| &n.name, |n: &mut Node| &mut n.name)
                .field("Next", |n: &Node| &n.next, |n: &mut Node| &mut n.next)
                .default_constructor(|| Node {
                    name: String::new(),
                    next: None,
                })
                .build()
        }
    }

    fn write<T: Describe>(value: &T, settings: &SerializerSettings) -> Result<String> {
        let mut serializer = Serializer::new(settings);
        serializer.serialize(value)?;
        Ok(serializer.into_inner())
    }

    #[test]
    fn test_plain_object() {
        let node = Node {
            name: "a".into(),
            next: None,
        };
        assert_eq!(
            write(&node, &SerializerSettings::new()).unwrap(),
            r#"{"Name":"a","Next":null}"#
        );
    }

    #[test]
    fn test_cycle_is_an_error_by_default() {
        let a = shared(Node {
            name: "a".into(),
            next: None,
        });
        a.borrow_mut().next = Some(a.clone());
        let err = write(&a, &SerializerSettings::new()).unwrap_err();
        assert!(matches!(err, Error::Loop { .. }));
        assert_eq!(
            err.to_string(),
            "Self referencing loop detected for property 'Next' with type 'Node'. Path 'Next'."
        );
        a.borrow_mut().next = None;
    }

    #[test]
    fn test_cycle_ignored() {
        let a = shared(Node {
            name: "a".into(),
            next: None,
        });
        a.borrow_mut().next = Some(a.clone());
        let settings =
            SerializerSettings::new().with_reference_loop_handling(ReferenceLoopHandling::Ignore);
        assert_eq!(write(&a, &settings).unwrap(), r#"{"Name":"a"}"#);
        a.borrow_mut().next = None;
    }

    #[test]
    fn test_cycle_preserved() {
        let a = shared(Node {
            name: "a".into(),
            next: None,
        });
        a.borrow_mut().next = Some(a.clone());
        let settings = SerializerSettings::new()
            .with_preserve_references_handling(PreserveReferencesHandling::Objects);
        assert_eq!(
            write(&a, &settings).unwrap(),
            r#"{"$id":"1","Name":"a","Next":{"$ref":"1"}}"#
        );
        a.borrow_mut().next = None;
    }

    #[test]
    fn test_repeated_value_without_tracking_is_duplicated() {
        let leaf = shared(Node {
            name: "leaf".into(),
            next: None,
        });
        let text = write(&vec![leaf.clone(), leaf], &SerializerSettings::new()).unwrap();
        assert_eq!(
            text,
            r#"[{"Name":"leaf","Next":null},{"Name":"leaf","Next":null}]"#
        );
    }

    #[test]
    fn test_type_names_for_objects() {
        let node = Node {
            name: "n".into(),
            next: None,
        };
        let settings = SerializerSettings::new()
            .with_type_name_handling(TypeNameHandling::Objects)
            .with_null_value_handling(NullValueHandling::Ignore);
        assert_eq!(
            write(&node, &settings).unwrap(),
            r#"{"$type":"Node","Name":"n"}"#
        );
    }

    #[test]
    fn test_serialization_depth_limit() {
        let settings = SerializerSettings::new().with_max_depth(Some(2));
        let err = write(&vec![vec![vec![1]]], &settings).unwrap_err();
        assert!(matches!(err, Error::MaxDepth { .. }));
        assert_eq!(err.path(), "[0][0]");
    }
}
