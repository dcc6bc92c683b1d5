//! Resolved serialization contracts.
//!
//! A [`Contract`] is the cached answer to "how is this type written and
//! read": its kind, its members as [`JsonProperty`] entries and the creators
//! used to instantiate it. Contracts are built once per type by the
//! [`ContractResolver`](crate::resolver::ContractResolver) and shared between
//! calls and threads. The creators and the property collection stay
//! replaceable after resolution.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::converter::JsonConverter;
use crate::describe::{
    CreatorArgs, DynamicOps, ListOps, MapOps, MemberAccess, NullableOps, PolymorphicOps,
    Predicate, PrimitiveOps, SerializableOps, SharedOps, TypeKey, TypeRef,
};
use crate::error::{Error, HostError, Result};
use crate::settings::{
    DefaultValueHandling, NullValueHandling, ReferenceLoopHandling, Required, TypeNameHandling,
};
use crate::value::JsonValue;

/// How a type is represented in JSON.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContractKind {
    Object,
    Array,
    Dictionary,
    Primitive,
    /// An object with an open member set.
    Dynamic,
    /// An object that writes and reads its own member map.
    Serializable,
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContractKind::Object => "object",
            ContractKind::Array => "array",
            ContractKind::Dictionary => "dictionary",
            ContractKind::Primitive => "primitive",
            ContractKind::Dynamic => "dynamic",
            ContractKind::Serializable => "serializable",
        };
        f.write_str(name)
    }
}

/// Kind-specific operations.
#[derive(Clone)]
pub(crate) enum ContractDetails {
    Object,
    Array(ListOps),
    Dictionary(MapOps),
    Primitive(PrimitiveOps),
    Dynamic(DynamicOps),
    Serializable(SerializableOps),
    /// `Option<T>`: `null` or the inner contract.
    Nullable(NullableOps),
    /// `Rc<RefCell<T>>`: the inner contract plus identity.
    Shared(SharedOps),
    /// A trait-object holder dispatching on its runtime type.
    Polymorphic(PolymorphicOps),
}

/// Builds an instance without arguments.
pub type DefaultCreator = Arc<dyn Fn() -> std::result::Result<Box<dyn Any>, HostError> + Send + Sync>;

/// Builds an instance from arguments positioned like [`Contract::creator_parameters`].
pub type ParameterizedCreator =
    Arc<dyn Fn(CreatorArgs) -> std::result::Result<Box<dyn Any>, HostError> + Send + Sync>;

/// One serializable member of an object contract, or one constructor parameter.
#[derive(Clone)]
pub struct JsonProperty {
    /// Name on the wire.
    pub property_name: String,
    /// Name of the member in Rust.
    pub underlying_name: String,
    pub declaring_type: TypeKey,
    pub property_type: TypeRef,
    pub(crate) access: Option<Arc<dyn MemberAccess>>,
    pub readable: bool,
    pub writable: bool,
    pub ignored: bool,
    pub required: Required,
    pub order: Option<i32>,
    pub default_value: Option<JsonValue>,
    pub(crate) zero_value: Option<JsonValue>,
    pub is_reference: Option<bool>,
    pub reference_loop_handling: Option<ReferenceLoopHandling>,
    pub item_is_reference: Option<bool>,
    pub item_reference_loop_handling: Option<ReferenceLoopHandling>,
    pub null_value_handling: Option<NullValueHandling>,
    pub default_value_handling: Option<DefaultValueHandling>,
    pub type_name_handling: Option<TypeNameHandling>,
    pub item_type_name_handling: Option<TypeNameHandling>,
    pub should_serialize: Option<Predicate>,
    pub should_deserialize: Option<Predicate>,
    pub converter: Option<Arc<dyn JsonConverter>>,
    /// The name needs no escaping and is written verbatim.
    /// [`PropertyCollection::add`] derives it from `property_name`.
    pub skip_property_name_escape: bool,
}

impl JsonProperty {
    /// A property with no accessor, used for constructor parameters.
    #[must_use]
    pub fn new(name: impl Into<String>, declaring_type: TypeKey, property_type: TypeRef) -> Self {
        let name = name.into();
        JsonProperty {
            skip_property_name_escape: crate::writer::is_escape_free(&name),
            underlying_name: name.clone(),
            property_name: name,
            declaring_type,
            property_type,
            access: None,
            readable: false,
            writable: true,
            ignored: false,
            required: Required::Default,
            order: None,
            default_value: None,
            zero_value: None,
            is_reference: None,
            reference_loop_handling: None,
            item_is_reference: None,
            item_reference_loop_handling: None,
            null_value_handling: None,
            default_value_handling: None,
            type_name_handling: None,
            item_type_name_handling: None,
            should_serialize: None,
            should_deserialize: None,
            converter: None,
        }
    }

    /// The explicit default, or the zero value of the member type.
    #[must_use]
    pub fn resolved_default_value(&self) -> Option<JsonValue> {
        self.default_value.clone().or_else(|| self.zero_value.clone())
    }

    pub(crate) fn access(&self) -> Option<&Arc<dyn MemberAccess>> {
        self.access.as_ref()
    }

    /// `false` when the `should_serialize` predicate rejects `target`.
    pub(crate) fn accepts_write(&self, target: &dyn Any, owner: &str) -> Result<bool> {
        self.evaluate(self.should_serialize.as_ref(), "should_serialize", target, owner)
    }

    /// `false` when the `should_deserialize` predicate rejects `target`.
    pub(crate) fn accepts_read(&self, target: &dyn Any, owner: &str) -> Result<bool> {
        self.evaluate(self.should_deserialize.as_ref(), "should_deserialize", target, owner)
    }

    fn evaluate(
        &self,
        predicate: Option<&Predicate>,
        label: &str,
        target: &dyn Any,
        owner: &str,
    ) -> Result<bool> {
        match predicate {
            Some(predicate) => predicate(target).map_err(|e| {
                Error::host(
                    format!("Error evaluating {label} for '{}' on '{owner}'", self.underlying_name),
                    &e,
                )
            }),
            None => Ok(true),
        }
    }
}

impl fmt::Debug for JsonProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonProperty")
            .field("property_name", &self.property_name)
            .field("underlying_name", &self.underlying_name)
            .field("property_type", &self.property_type)
            .field("readable", &self.readable)
            .field("writable", &self.writable)
            .field("ignored", &self.ignored)
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

/// Ordered, name-unique properties of one contract.
#[derive(Clone, Debug, Default)]
pub struct PropertyCollection {
    owner: String,
    properties: Vec<Arc<JsonProperty>>,
}

impl PropertyCollection {
    #[must_use]
    pub fn new(owner: impl Into<String>) -> Self {
        PropertyCollection {
            owner: owner.into(),
            properties: Vec::new(),
        }
    }

    /// Adds a property. An ignored property yields to a live one with the same name.
    ///
    /// The escape flag is recomputed from the property's final name.
    ///
    /// # Errors
    ///
    /// Two live properties with the same name.
    pub fn add(&mut self, mut property: JsonProperty) -> Result<()> {
        property.skip_property_name_escape = crate::writer::is_escape_free(&property.property_name);
        let existing = self
            .properties
            .iter()
            .position(|p| p.property_name == property.property_name);
        match existing {
            None => self.properties.push(Arc::new(property)),
            Some(_) if property.ignored => {}
            Some(index) if self.properties[index].ignored => {
                self.properties[index] = Arc::new(property);
            }
            Some(_) => {
                return Err(Error::resolution(format!(
                    "A member with the name '{}' already exists on '{}'. Use an ignore annotation to specify which one to skip.",
                    property.property_name, self.owner
                )))
            }
        }
        Ok(())
    }

    /// Exact match first, then case-insensitive; ties go to the first declared.
    #[must_use]
    pub fn get_closest_match(&self, name: &str) -> Option<&Arc<JsonProperty>> {
        self.closest_index(name).map(|index| &self.properties[index])
    }

    #[must_use]
    pub fn closest_index(&self, name: &str) -> Option<usize> {
        self.properties
            .iter()
            .position(|p| p.property_name == name)
            .or_else(|| {
                self.properties
                    .iter()
                    .position(|p| p.property_name.eq_ignore_ascii_case(name))
            })
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Arc<JsonProperty>> {
        self.properties.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<JsonProperty>> {
        self.properties.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl<'a> IntoIterator for &'a PropertyCollection {
    type Item = &'a Arc<JsonProperty>;
    type IntoIter = std::slice::Iter<'a, Arc<JsonProperty>>;

    fn into_iter(self) -> Self::IntoIter {
        self.properties.iter()
    }
}

#[derive(Default)]
struct Creators {
    default_creator: Option<DefaultCreator>,
    default_creator_non_public: bool,
    override_creator: Option<ParameterizedCreator>,
    parameterized_creator: Option<ParameterizedCreator>,
    creator_parameters: Arc<PropertyCollection>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// How one type is serialized and deserialized.
pub struct Contract {
    pub(crate) kind: ContractKind,
    pub(crate) name: String,
    pub(crate) type_name: String,
    pub(crate) underlying_type: TypeKey,
    pub(crate) created_type: TypeKey,
    pub(crate) is_abstract: bool,
    pub(crate) is_reference: Option<bool>,
    pub(crate) item_is_reference: Option<bool>,
    pub(crate) item_reference_loop_handling: Option<ReferenceLoopHandling>,
    pub(crate) item_type_name_handling: Option<TypeNameHandling>,
    pub(crate) details: ContractDetails,
    creators: RwLock<Creators>,
    properties: RwLock<Arc<PropertyCollection>>,
    converter: RwLock<Option<Arc<dyn JsonConverter>>>,
}

impl Contract {
    pub(crate) fn new(
        kind: ContractKind,
        name: String,
        type_name: String,
        underlying_type: TypeKey,
        created_type: TypeKey,
        details: ContractDetails,
    ) -> Self {
        Contract {
            kind,
            properties: RwLock::new(Arc::new(PropertyCollection::new(name.clone()))),
            name,
            type_name,
            underlying_type,
            created_type,
            is_abstract: false,
            is_reference: None,
            item_is_reference: None,
            item_reference_loop_handling: None,
            item_type_name_handling: None,
            details,
            creators: RwLock::new(Creators::default()),
            converter: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ContractKind {
        self.kind
    }

    /// Contract name: the type's short name, or the interface it is viewed through.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name written as `$type` in the simple format.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn underlying_type(&self) -> TypeKey {
        self.underlying_type
    }

    /// The concrete type creators build; differs from the underlying type for abstract collections.
    #[must_use]
    pub fn created_type(&self) -> TypeKey {
        self.created_type
    }

    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    #[must_use]
    pub fn is_reference(&self) -> Option<bool> {
        self.is_reference
    }

    #[must_use]
    pub fn item_is_reference(&self) -> Option<bool> {
        self.item_is_reference
    }

    #[must_use]
    pub fn item_reference_loop_handling(&self) -> Option<ReferenceLoopHandling> {
        self.item_reference_loop_handling
    }

    #[must_use]
    pub fn item_type_name_handling(&self) -> Option<TypeNameHandling> {
        self.item_type_name_handling
    }

    /// Whether any way of producing a value exists.
    #[must_use]
    pub fn is_instantiable(&self) -> bool {
        match &self.details {
            ContractDetails::Primitive(_)
            | ContractDetails::Nullable(_)
            | ContractDetails::Shared(_)
            | ContractDetails::Serializable(_) => true,
            ContractDetails::Array(ops) if ops.from_items.is_some() => true,
            ContractDetails::Polymorphic(ops) => !ops.implementors.is_empty(),
            _ => {
                let creators = read(&self.creators);
                creators.default_creator.is_some()
                    || creators.override_creator.is_some()
                    || creators.parameterized_creator.is_some()
            }
        }
    }

    #[must_use]
    pub fn default_creator(&self) -> Option<DefaultCreator> {
        read(&self.creators).default_creator.clone()
    }

    #[must_use]
    pub fn default_creator_non_public(&self) -> bool {
        read(&self.creators).default_creator_non_public
    }

    /// Replaces the default creator.
    ///
    /// ```rust
    /// use jsongraph::describe::{DynList, ListLike};
    /// use jsongraph::resolver::ContractResolver;
    /// use std::collections::VecDeque;
    ///
    /// let resolver = ContractResolver::new();
    /// let contract = resolver.resolve_contract::<DynList<i32>>().unwrap();
    /// contract.set_default_creator(|| Box::new(VecDeque::<i32>::new()) as DynList<i32>);
    /// assert!(contract.is_instantiable());
    /// ```
    pub fn set_default_creator<T, F>(&self, create: F)
    where
        T: Any,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let creator: DefaultCreator =
            Arc::new(move || Ok::<_, HostError>(Box::new(create()) as Box<dyn Any>));
        self.set_default_creator_boxed(creator, false);
    }

    pub fn set_default_creator_boxed(&self, creator: DefaultCreator, non_public: bool) {
        let mut creators = write(&self.creators);
        creators.default_creator = Some(creator);
        creators.default_creator_non_public = non_public;
    }

    pub fn clear_default_creator(&self) {
        let mut creators = write(&self.creators);
        creators.default_creator = None;
        creators.default_creator_non_public = false;
    }

    #[must_use]
    pub fn override_creator(&self) -> Option<ParameterizedCreator> {
        read(&self.creators).override_creator.clone()
    }

    /// Installs a creator that wins over every other and takes `parameters` as arguments.
    pub fn set_override_creator(&self, creator: ParameterizedCreator, parameters: PropertyCollection) {
        let mut creators = write(&self.creators);
        creators.override_creator = Some(creator);
        creators.creator_parameters = Arc::new(parameters);
    }

    #[must_use]
    pub fn parameterized_creator(&self) -> Option<ParameterizedCreator> {
        read(&self.creators).parameterized_creator.clone()
    }

    pub fn set_parameterized_creator(
        &self,
        creator: ParameterizedCreator,
        parameters: PropertyCollection,
    ) {
        let mut creators = write(&self.creators);
        creators.parameterized_creator = Some(creator);
        creators.creator_parameters = Arc::new(parameters);
    }

    #[must_use]
    pub fn creator_parameters(&self) -> Arc<PropertyCollection> {
        Arc::clone(&read(&self.creators).creator_parameters)
    }

    #[must_use]
    pub fn properties(&self) -> Arc<PropertyCollection> {
        Arc::clone(&read(&self.properties))
    }

    pub fn set_properties(&self, properties: PropertyCollection) {
        *write(&self.properties) = Arc::new(properties);
    }

    #[must_use]
    pub fn converter(&self) -> Option<Arc<dyn JsonConverter>> {
        read(&self.converter).clone()
    }

    pub fn set_converter(&self, converter: Option<Arc<dyn JsonConverter>>) {
        *write(&self.converter) = converter;
    }

    /// Checks that a creator produced the underlying type.
    pub(crate) fn check_created(&self, value: Box<dyn Any>) -> Result<Box<dyn Any>> {
        if (*value).type_id() == self.underlying_type.id() {
            Ok(value)
        } else {
            Err(Error::resolution(format!(
                "Creator for type '{}' returned a value of a different type.",
                self.name
            )))
        }
    }
}

impl fmt::Debug for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Contract")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("underlying_type", &self.underlying_type)
            .field("created_type", &self.created_type)
            .field("is_abstract", &self.is_abstract)
            .field("properties", &self.properties().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn property(name: &str) -> JsonProperty {
        JsonProperty::new(name, TypeKey::of::<()>(), TypeRef::of::<i32>())
    }

    #[test]
    fn test_duplicate_names_fail() {
        let mut collection = PropertyCollection::new("Person");
        collection.add(property("Name")).unwrap();
        let err = collection.add(property("Name")).unwrap_err();
        assert_eq!(
            err.message(),
            "A member with the name 'Name' already exists on 'Person'. Use an ignore annotation to specify which one to skip."
        );
    }

    #[test]
    fn test_ignored_duplicate_yields() {
        let mut collection = PropertyCollection::new("Person");
        let mut hidden = property("Name");
        hidden.ignored = true;
        collection.add(hidden.clone()).unwrap();
        collection.add(property("Name")).unwrap();
        collection.add(hidden).unwrap();
        assert_eq!(collection.len(), 1);
        assert!(!collection.get(0).unwrap().ignored);
    }

    #[test]
    fn test_closest_match() {
        let mut collection = PropertyCollection::new("Person");
        collection.add(property("name")).unwrap();
        collection.add(property("Name")).unwrap();
        collection.add(property("Age")).unwrap();
        assert_eq!(collection.closest_index("Name"), Some(1));
        assert_eq!(collection.closest_index("NAME"), Some(0));
        assert_eq!(collection.closest_index("age"), Some(2));
        assert!(collection.get_closest_match("Missing").is_none());
    }

    #[test]
    fn test_resolved_default_value() {
        let mut p = property("Count");
        assert_eq!(p.resolved_default_value(), None);
        p.zero_value = Some(JsonValue::from(0));
        assert_eq!(p.resolved_default_value(), Some(JsonValue::from(0)));
        p.default_value = Some(JsonValue::from(7));
        assert_eq!(p.resolved_default_value(), Some(JsonValue::from(7)));
    }

    #[test]
    fn test_escape_flag() {
        assert!(property("First_Name").skip_property_name_escape);
        assert!(!property("first name").skip_property_name_escape);
    }
}
