//! Contract resolution and caching.
//!
//! [`ContractResolver`] turns a [`TypeDescriptor`] into a [`Contract`] once
//! per type and caches it. The naming and filtering decisions along the way
//! go through a [`ResolverPolicy`], the extension point for callers that want
//! different names or a narrower member set.
//!
//! ```rust
//! use jsongraph::resolver::{CamelCasePolicy, ContractResolver};
//! use jsongraph::{to_string_with_settings, SerializerSettings};
//! use jsongraph::describe::{Describe, TypeDescriptor};
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct Point { x_pos: i32 }
//!
//! impl Describe for Point {
//!     fn describe() -> TypeDescriptor {
//!         TypeDescriptor::object::<Point>()
//!             .field("XPos", |p| &p.x_pos, |p| &mut p.x_pos)
//!             .build()
//!     }
//! }
//!
//! let resolver = Arc::new(ContractResolver::with_policy(CamelCasePolicy));
//! let settings = SerializerSettings::new().with_contract_resolver(resolver);
//! assert_eq!(to_string_with_settings(&Point { x_pos: 3 }, &settings).unwrap(), r#"{"xPos":3}"#);
//! ```

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::contract::{Contract, ContractDetails, ContractKind, JsonProperty, PropertyCollection};
use crate::describe::{
    Capability, ConstructorDescriptor, ContainerAnnotations, CreatorArgs, Describe,
    MemberDescriptor, MemberKind, MemberSerialization, TypeDescriptor, TypeKey, TypeRef,
    Visibility,
};
use crate::error::{Error, HostError, Result};
use crate::value::JsonValue;

/// Naming and filtering hooks applied while contracts are built.
pub trait ResolverPolicy: Send + Sync {
    /// Wire name of a member without an explicit JSON name.
    fn resolve_property_name(&self, name: &str) -> String {
        name.to_string()
    }

    /// Wire name of a dictionary key or dynamic member, applied on write.
    fn resolve_dictionary_key(&self, key: &str) -> String {
        key.to_string()
    }

    /// An interface view to serialize the type through, by name.
    fn resolve_contract_type(&self, _descriptor: &TypeDescriptor) -> Option<String> {
        None
    }

    /// Last chance to drop, rename, reorder or reconfigure the ordered properties.
    fn filter_properties(
        &self,
        _descriptor: &TypeDescriptor,
        properties: Vec<JsonProperty>,
    ) -> Vec<JsonProperty> {
        properties
    }

    /// Called once per built contract, before it is cached.
    fn customize_contract(&self, _contract: &Contract) {}
}

/// Names are used as declared.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicy;

impl ResolverPolicy for DefaultPolicy {}

/// camelCase names for members and dictionary keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct CamelCasePolicy;

impl ResolverPolicy for CamelCasePolicy {
    fn resolve_property_name(&self, name: &str) -> String {
        to_camel_case(name)
    }

    fn resolve_dictionary_key(&self, key: &str) -> String {
        to_camel_case(key)
    }
}

/// `FirstName` to `firstName`, `URLValue` to `urlValue`, `ID` to `id`.
#[must_use]
pub fn to_camel_case(name: &str) -> String {
    let mut chars: Vec<char> = name.chars().collect();
    if !chars.first().is_some_and(|c| c.is_uppercase()) {
        return name.to_string();
    }
    for i in 0..chars.len() {
        if i == 1 && !chars[i].is_uppercase() {
            break;
        }
        let has_next = i + 1 < chars.len();
        if i > 0 && has_next && !chars[i + 1].is_uppercase() {
            if chars[i + 1] == ' ' {
                chars[i] = chars[i].to_lowercase().next().unwrap_or(chars[i]);
            }
            break;
        }
        chars[i] = chars[i].to_lowercase().next().unwrap_or(chars[i]);
    }
    chars.into_iter().collect()
}

/// Whether non-public members are serialized without an explicit annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemberVisibility {
    #[default]
    Public,
    All,
}

/// Builds and caches contracts.
///
/// Resolution is thread-safe: concurrent callers for the same type all get
/// the contract that was cached first.
pub struct ContractResolver {
    policy: Arc<dyn ResolverPolicy>,
    member_visibility: MemberVisibility,
    serialize_compiler_generated_members: bool,
    cache: RwLock<HashMap<TypeId, Arc<Contract>>>,
    type_names: RwLock<HashMap<String, TypeKey>>,
}

impl Default for ContractResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ContractResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractResolver")
            .field("member_visibility", &self.member_visibility)
            .field(
                "serialize_compiler_generated_members",
                &self.serialize_compiler_generated_members,
            )
            .field(
                "cached",
                &self.cache.read().map_or(0, |cache| cache.len()),
            )
            .finish_non_exhaustive()
    }
}

fn zero_value(type_ref: &TypeRef) -> Option<JsonValue> {
    match type_ref.describe().capability {
        Capability::Primitive(ops) => (ops.zero)(),
        Capability::Nullable(_) => Some(JsonValue::Null),
        _ => None,
    }
}

fn natural_kind(capability: &Capability) -> Option<ContractKind> {
    match capability {
        Capability::Object | Capability::Polymorphic(_) => Some(ContractKind::Object),
        Capability::Primitive(_) => Some(ContractKind::Primitive),
        Capability::List(_) => Some(ContractKind::Array),
        Capability::Map(_) => Some(ContractKind::Dictionary),
        Capability::Dynamic(_) => Some(ContractKind::Dynamic),
        Capability::Serializable(_) => Some(ContractKind::Serializable),
        Capability::Nullable(_) | Capability::Shared(_) => None,
    }
}

impl ContractResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(DefaultPolicy)
    }

    #[must_use]
    pub fn with_policy(policy: impl ResolverPolicy + 'static) -> Self {
        ContractResolver {
            policy: Arc::new(policy),
            member_visibility: MemberVisibility::default(),
            serialize_compiler_generated_members: false,
            cache: RwLock::new(HashMap::new()),
            type_names: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_member_visibility(mut self, visibility: MemberVisibility) -> Self {
        self.member_visibility = visibility;
        self
    }

    #[must_use]
    pub fn with_compiler_generated_members(mut self, serialize: bool) -> Self {
        self.serialize_compiler_generated_members = serialize;
        self
    }

    /// The process-wide resolver used when settings name none.
    #[must_use]
    pub fn shared() -> Arc<ContractResolver> {
        static SHARED: OnceLock<Arc<ContractResolver>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(ContractResolver::new())))
    }

    /// The contract of `T`, built on first use.
    ///
    /// # Errors
    ///
    /// The type's description is inconsistent, such as several designated constructors.
    pub fn resolve_contract<T: Describe>(&self) -> Result<Arc<Contract>> {
        self.resolve_contract_for(&TypeRef::of::<T>())
    }

    pub fn resolve_contract_for(&self, type_ref: &TypeRef) -> Result<Arc<Contract>> {
        let id = type_ref.key().id();
        if let Some(contract) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
        {
            return Ok(Arc::clone(contract));
        }

        let contract = self.create_contract(type_ref.describe())?;
        self.policy.customize_contract(&contract);
        let contract = {
            let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(cache.entry(id).or_insert_with(|| Arc::new(contract)))
        };
        let mut names = self
            .type_names
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        names.insert(contract.type_name.clone(), contract.underlying_type);
        names.insert(
            contract.underlying_type.path().to_string(),
            contract.underlying_type,
        );
        Ok(contract)
    }

    /// Resolves `T` ahead of time so its `$type` name is known.
    pub fn register<T: Describe>(&self) -> Result<()> {
        self.resolve_contract::<T>().map(|_| ())
    }

    /// Whether a `$type` name belongs to a type resolved by this resolver.
    #[must_use]
    pub fn is_known_type_name(&self, name: &str) -> bool {
        self.type_names
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    #[must_use]
    pub fn resolve_dictionary_key(&self, key: &str) -> String {
        self.policy.resolve_dictionary_key(key)
    }

    fn settle(&self, descriptor: &TypeDescriptor) -> Result<(ContractKind, ContainerAnnotations)> {
        match &descriptor.capability {
            Capability::Nullable(ops) => self.settle_wrapper(descriptor, &ops.inner),
            Capability::Shared(ops) => self.settle_wrapper(descriptor, &ops.inner),
            capability => {
                let natural = natural_kind(capability).unwrap_or(ContractKind::Object);
                let kind = match descriptor.kind_override {
                    None => natural,
                    Some(ContractKind::Object) => ContractKind::Object,
                    Some(kind) if kind == natural => kind,
                    Some(kind) => {
                        return Err(Error::resolution(format!(
                            "Type '{}' cannot be resolved as a {kind} contract.",
                            descriptor.name
                        )))
                    }
                };
                Ok((kind, descriptor.annotations))
            }
        }
    }

    fn settle_wrapper(
        &self,
        descriptor: &TypeDescriptor,
        inner: &TypeRef,
    ) -> Result<(ContractKind, ContainerAnnotations)> {
        let (kind, inner_annotations) = self.settle(&inner.describe())?;
        let own = descriptor.annotations;
        Ok((
            kind,
            ContainerAnnotations {
                is_reference: own.is_reference.or(inner_annotations.is_reference),
                item_is_reference: own.item_is_reference.or(inner_annotations.item_is_reference),
                item_reference_loop_handling: own
                    .item_reference_loop_handling
                    .or(inner_annotations.item_reference_loop_handling),
                item_type_name_handling: own
                    .item_type_name_handling
                    .or(inner_annotations.item_type_name_handling),
            },
        ))
    }

    fn create_contract(&self, descriptor: TypeDescriptor) -> Result<Contract> {
        let (kind, annotations) = self.settle(&descriptor)?;
        let details = match &descriptor.capability {
            Capability::Nullable(ops) => ContractDetails::Nullable(*ops),
            Capability::Shared(ops) => ContractDetails::Shared(*ops),
            _ if descriptor.kind_override == Some(ContractKind::Object) => ContractDetails::Object,
            Capability::Object => ContractDetails::Object,
            Capability::Primitive(ops) => ContractDetails::Primitive(*ops),
            Capability::List(ops) => ContractDetails::Array(*ops),
            Capability::Map(ops) => ContractDetails::Dictionary(*ops),
            Capability::Dynamic(ops) => ContractDetails::Dynamic(*ops),
            Capability::Serializable(ops) => ContractDetails::Serializable(*ops),
            Capability::Polymorphic(ops) => ContractDetails::Polymorphic(ops.clone()),
        };

        let view = match self.policy.resolve_contract_type(&descriptor) {
            Some(interface) => Some(
                descriptor
                    .interfaces
                    .iter()
                    .find(|view| view.name == interface)
                    .cloned()
                    .ok_or_else(|| {
                        Error::resolution(format!(
                            "Type '{}' does not implement '{interface}'.",
                            descriptor.name
                        ))
                    })?,
            ),
            None => None,
        };
        let name = view
            .as_ref()
            .map_or_else(|| descriptor.name.clone(), |view| view.name.clone());

        let mut contract = Contract::new(
            kind,
            name,
            descriptor.name.clone(),
            descriptor.key,
            descriptor.created_as,
            details,
        );
        contract.is_abstract = descriptor.is_abstract;
        contract.is_reference = annotations.is_reference;
        contract.item_is_reference = annotations.item_is_reference;
        contract.item_reference_loop_handling = annotations.item_reference_loop_handling;
        contract.item_type_name_handling = annotations.item_type_name_handling;
        contract.set_converter(descriptor.converter.clone());

        let instantiable = !descriptor.is_abstract || descriptor.created_as != descriptor.key;
        match &contract.details {
            ContractDetails::Object | ContractDetails::Dynamic(_) => {
                let members = view.as_ref().map(|view| view.members.as_slice());
                contract.set_properties(self.create_properties(&descriptor, members, &contract)?);
                if !descriptor.is_abstract {
                    self.attach_constructors(&contract, &descriptor.constructors)?;
                }
            }
            ContractDetails::Array(ops) => {
                if let (true, Some(create)) = (instantiable, ops.create) {
                    contract.set_default_creator_boxed(Arc::new(move || Ok::<_, HostError>(create())), false);
                }
            }
            ContractDetails::Dictionary(ops) => {
                if let (true, Some(create)) = (instantiable, ops.create) {
                    contract.set_default_creator_boxed(Arc::new(move || Ok::<_, HostError>(create())), false);
                }
            }
            _ => {}
        }

        tracing::debug!(
            type_name = %descriptor.key,
            kind = %contract.kind,
            properties = contract.properties().len(),
            instantiable = contract.is_instantiable(),
            "resolved contract"
        );
        Ok(contract)
    }

    fn create_properties(
        &self,
        descriptor: &TypeDescriptor,
        view: Option<&[String]>,
        contract: &Contract,
    ) -> Result<PropertyCollection> {
        let mut properties = Vec::with_capacity(descriptor.members.len());
        for member in &descriptor.members {
            if view.is_some_and(|names| !names.contains(&member.name)) {
                continue;
            }
            if member.is_static
                || (member.compiler_generated && !self.serialize_compiler_generated_members)
            {
                continue;
            }
            let explicit = member.annotations.include || member.annotations.json_name.is_some();
            let visible = member.visibility == Visibility::Public
                || self.member_visibility == MemberVisibility::All;
            let included = match descriptor.member_serialization {
                MemberSerialization::OptOut => visible || explicit,
                MemberSerialization::OptIn => explicit,
                MemberSerialization::Fields => member.kind == MemberKind::Field || explicit,
            };
            if included {
                properties.push(self.create_property(descriptor.key, member));
            }
        }

        properties.sort_by_key(|property| property.order.unwrap_or(-1));
        let properties = self.policy.filter_properties(descriptor, properties);

        let mut collection = PropertyCollection::new(contract.name.clone());
        for property in properties {
            collection.add(property)?;
        }
        Ok(collection)
    }

    fn create_property(&self, declaring_type: TypeKey, member: &MemberDescriptor) -> JsonProperty {
        let annotations = &member.annotations;
        let name = annotations
            .json_name
            .clone()
            .unwrap_or_else(|| self.policy.resolve_property_name(&member.name));
        let mut property = JsonProperty::new(name, declaring_type, member.member_type);
        property.underlying_name = member.name.clone();
        property.access = Some(Arc::clone(&member.access));
        property.readable = member.access.can_read();
        property.writable = member.access.can_write();
        property.ignored = annotations.ignore;
        property.required = annotations.required.unwrap_or_default();
        property.order = annotations.order;
        property.default_value = annotations.default_value.clone();
        property.zero_value = zero_value(&member.member_type);
        property.is_reference = annotations.is_reference;
        property.reference_loop_handling = annotations.reference_loop_handling;
        property.item_is_reference = annotations.item_is_reference;
        property.item_reference_loop_handling = annotations.item_reference_loop_handling;
        property.null_value_handling = annotations.null_value_handling;
        property.default_value_handling = annotations.default_value_handling;
        property.type_name_handling = annotations.type_name_handling;
        property.item_type_name_handling = annotations.item_type_name_handling;
        property.should_serialize = annotations.should_serialize.clone();
        property.should_deserialize = annotations.should_deserialize.clone();
        property.converter = annotations.converter.clone();
        property
    }

    /// Picks the creators of an object shape:
    /// a designated constructor wins, then a parameterless one, then the only
    /// public constructor with parameters.
    fn attach_constructors(
        &self,
        contract: &Contract,
        constructors: &[ConstructorDescriptor],
    ) -> Result<()> {
        let designated: Vec<_> = constructors.iter().filter(|c| c.designated).collect();
        if designated.len() > 1 {
            return Err(Error::resolution(format!(
                "Multiple constructors with the designated creator annotation on type '{}'.",
                contract.name
            )));
        }
        if let Some(constructor) = designated.first() {
            let parameters = self.creator_parameters(contract, constructor)?;
            contract.set_override_creator(Arc::clone(&constructor.invoke), parameters);
            return Ok(());
        }

        let parameterless = constructors
            .iter()
            .filter(|c| c.parameters.is_empty())
            .min_by_key(|c| c.visibility != Visibility::Public);
        if let Some(constructor) = parameterless {
            let invoke = Arc::clone(&constructor.invoke);
            contract.set_default_creator_boxed(
                Arc::new(move || invoke(CreatorArgs::new(Vec::new()))),
                constructor.visibility == Visibility::NonPublic,
            );
        }

        if parameterless.map_or(true, |c| c.visibility == Visibility::NonPublic) {
            let public: Vec<_> = constructors
                .iter()
                .filter(|c| !c.parameters.is_empty() && c.visibility == Visibility::Public)
                .collect();
            if let [only] = public.as_slice() {
                let parameters = self.creator_parameters(contract, only)?;
                contract.set_parameterized_creator(Arc::clone(&only.invoke), parameters);
            }
        }
        Ok(())
    }

    /// Matches constructor parameters to properties by name, exact then
    /// case-insensitive. A match of another type counts as no match.
    fn creator_parameters(
        &self,
        contract: &Contract,
        constructor: &ConstructorDescriptor,
    ) -> Result<PropertyCollection> {
        let properties = contract.properties();
        let mut collection = PropertyCollection::new(contract.name.clone());
        for parameter in &constructor.parameters {
            let matched = properties
                .get_closest_match(&parameter.name)
                .filter(|property| property.property_type.key() == parameter.param_type.key());
            let property = match matched {
                Some(property) => JsonProperty::clone(property),
                None => {
                    let mut property = JsonProperty::new(
                        self.policy.resolve_property_name(&parameter.name),
                        contract.underlying_type,
                        parameter.param_type,
                    );
                    property.zero_value = zero_value(&parameter.param_type);
                    property
                }
            };
            collection.add(property)?;
        }
        Ok(collection)
    }
}
