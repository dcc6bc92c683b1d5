//! Static type descriptions.
//!
//! Rust has no runtime reflection, so a type opts into graph serialization by
//! implementing [`Describe`]. The returned [`TypeDescriptor`] lists what the
//! resolver needs to build a contract: identity, annotations, one capability
//! (primitive, list, map, ...) and, for object shapes, members and
//! constructors.
//!
//! ```rust
//! use jsongraph::describe::{param, Describe, TypeDescriptor};
//! use jsongraph::{Required, from_str, to_string};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Person {
//!     name: String,
//!     age: u32,
//! }
//!
//! impl Describe for Person {
//!     fn describe() -> TypeDescriptor {
//!         TypeDescriptor::object::<Person>()
//!             .field_with("Name", |p| &p.name, |p| &mut p.name, |m| m.required(Required::Always))
//!             .field("Age", |p| &p.age, |p| &mut p.age)
//!             .default_constructor(Person::default)
//!             .build()
//!     }
//! }
//!
//! let json = to_string(&Person { name: "Ann".into(), age: 41 }).unwrap();
//! assert_eq!(json, r#"{"Name":"Ann","Age":41}"#);
//! let back: Person = from_str(&json).unwrap();
//! assert_eq!(back.age, 41);
//! ```

use std::any::{Any, TypeId};
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::contract::ContractKind;
use crate::converter::JsonConverter;
use crate::error::HostError;
use crate::settings::{
    DefaultValueHandling, NullValueHandling, ReferenceLoopHandling, Required, TypeNameHandling,
};
use crate::value::JsonValue;
use crate::JsonMap;

pub use crate::impls::{DynList, DynMap, DynamicObject};

/// A type that can describe its own serialization shape.
pub trait Describe: Any {
    fn describe() -> TypeDescriptor;
}

/// Access to `dyn Any` from trait objects.
///
/// Call it through the trait object (`(**boxed).as_any()`), not the box,
/// or the box itself is returned.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Stable identity of a Rust type.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    path: &'static str,
}

impl TypeKey {
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        TypeKey {
            id: TypeId::of::<T>(),
            path: std::any::type_name::<T>(),
        }
    }

    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Full type path, `alloc::vec::Vec<my_app::Person>`.
    #[must_use]
    pub fn path(&self) -> &'static str {
        self.path
    }

    /// Type path with every module prefix stripped, `Vec<Person>`.
    #[must_use]
    pub fn short_name(&self) -> String {
        fn last(segment: &str) -> &str {
            segment.rsplit("::").next().unwrap_or(segment)
        }

        let mut out = String::with_capacity(self.path.len());
        let mut segment = String::new();
        for ch in self.path.chars() {
            if ch.is_alphanumeric() || ch == '_' || ch == ':' {
                segment.push(ch);
            } else {
                out.push_str(last(&segment));
                segment.clear();
                out.push(ch);
            }
        }
        out.push_str(last(&segment));
        out
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_name())
    }
}

/// A type key plus the way to describe it. Member and item types are held
/// as `TypeRef`s so recursive types never describe themselves eagerly.
#[derive(Clone, Copy)]
pub struct TypeRef {
    key: TypeKey,
    describe: fn() -> TypeDescriptor,
}

impl TypeRef {
    #[must_use]
    pub fn of<T: Describe>() -> Self {
        TypeRef {
            key: TypeKey::of::<T>(),
            describe: T::describe,
        }
    }

    #[must_use]
    pub fn key(&self) -> TypeKey {
        self.key
    }

    #[must_use]
    pub fn describe(&self) -> TypeDescriptor {
        (self.describe)()
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeRef({:?})", self.key)
    }
}

/// Which members an object shape exposes by default.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MemberSerialization {
    /// Every public member unless ignored.
    #[default]
    OptOut,
    /// Only members marked with `include` or an explicit JSON name.
    OptIn,
    /// Every field, public or not; accessor properties are skipped.
    Fields,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Public,
    NonPublic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemberKind {
    /// Direct storage, read and written through references.
    Field,
    /// Accessor pair returning and taking owned values.
    Property,
}

/// Container-level annotations.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContainerAnnotations {
    pub is_reference: Option<bool>,
    pub item_is_reference: Option<bool>,
    pub item_reference_loop_handling: Option<ReferenceLoopHandling>,
    pub item_type_name_handling: Option<TypeNameHandling>,
}

/// A named subset of an object's members.
#[derive(Clone, Debug)]
pub struct InterfaceView {
    pub name: String,
    pub members: Vec<String>,
}

/// A value read from a member: borrowed for fields, owned for computed properties.
pub enum MemberValue<'a> {
    Borrowed(&'a dyn Any),
    Owned(Box<dyn Any>),
}

impl<'a> MemberValue<'a> {
    #[must_use]
    pub fn as_any(&self) -> &dyn Any {
        match self {
            MemberValue::Borrowed(value) => *value,
            MemberValue::Owned(value) => &**value,
        }
    }
}

/// Type-erased getter and setter of one member.
pub trait MemberAccess: Send + Sync {
    fn can_read(&self) -> bool;
    fn can_write(&self) -> bool;
    fn get<'a>(&self, target: &'a dyn Any) -> Result<MemberValue<'a>, HostError>;
    fn set(&self, target: &mut dyn Any, value: Box<dyn Any>) -> Result<(), HostError>;
}

pub(crate) fn mismatch<T: ?Sized + 'static>() -> HostError {
    format!("Value is not of type '{}'.", TypeKey::of::<T>().short_name()).into()
}

struct FieldAccess<T, F> {
    get: fn(&T) -> &F,
    get_mut: fn(&mut T) -> &mut F,
}

impl<T: Any, F: Any> MemberAccess for FieldAccess<T, F> {
    fn can_read(&self) -> bool {
        true
    }

    fn can_write(&self) -> bool {
        true
    }

    fn get<'a>(&self, target: &'a dyn Any) -> Result<MemberValue<'a>, HostError> {
        let target = target.downcast_ref::<T>().ok_or_else(mismatch::<T>)?;
        Ok(MemberValue::Borrowed((self.get)(target)))
    }

    fn set(&self, target: &mut dyn Any, value: Box<dyn Any>) -> Result<(), HostError> {
        let target = target.downcast_mut::<T>().ok_or_else(mismatch::<T>)?;
        let value = value.downcast::<F>().map_err(|_| mismatch::<F>())?;
        *(self.get_mut)(target) = *value;
        Ok(())
    }
}

type Getter<T, F> = fn(&T) -> Result<F, HostError>;
type Setter<T, F> = fn(&mut T, F) -> Result<(), HostError>;

struct PropertyAccess<T, F> {
    get: Option<Getter<T, F>>,
    set: Option<Setter<T, F>>,
}

impl<T: Any, F: Any> MemberAccess for PropertyAccess<T, F> {
    fn can_read(&self) -> bool {
        self.get.is_some()
    }

    fn can_write(&self) -> bool {
        self.set.is_some()
    }

    fn get<'a>(&self, target: &'a dyn Any) -> Result<MemberValue<'a>, HostError> {
        let getter = self.get.ok_or("Member has no getter.")?;
        let target = target.downcast_ref::<T>().ok_or_else(mismatch::<T>)?;
        Ok(MemberValue::Owned(Box::new(getter(target)?)))
    }

    fn set(&self, target: &mut dyn Any, value: Box<dyn Any>) -> Result<(), HostError> {
        let setter = self.set.ok_or("Member has no setter.")?;
        let target = target.downcast_mut::<T>().ok_or_else(mismatch::<T>)?;
        let value = value.downcast::<F>().map_err(|_| mismatch::<F>())?;
        setter(target, *value)
    }
}

/// Instance-bound condition: `should_serialize` and `should_deserialize`.
pub type Predicate = Arc<dyn Fn(&dyn Any) -> Result<bool, HostError> + Send + Sync>;

/// Per-member annotations. `None` means inherit.
#[derive(Clone, Default)]
pub struct MemberAnnotations {
    pub json_name: Option<String>,
    pub ignore: bool,
    pub include: bool,
    pub required: Option<Required>,
    pub order: Option<i32>,
    pub default_value: Option<JsonValue>,
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
}

impl fmt::Debug for MemberAnnotations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberAnnotations")
            .field("json_name", &self.json_name)
            .field("ignore", &self.ignore)
            .field("include", &self.include)
            .field("required", &self.required)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

/// One reflected member.
#[derive(Clone)]
pub struct MemberDescriptor {
    pub(crate) name: String,
    pub(crate) kind: MemberKind,
    pub(crate) visibility: Visibility,
    pub(crate) is_static: bool,
    pub(crate) compiler_generated: bool,
    pub(crate) member_type: TypeRef,
    pub(crate) access: Arc<dyn MemberAccess>,
    pub(crate) annotations: MemberAnnotations,
}

impl MemberDescriptor {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    #[must_use]
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    #[must_use]
    pub fn member_type(&self) -> TypeRef {
        self.member_type
    }

    #[must_use]
    pub fn annotations(&self) -> &MemberAnnotations {
        &self.annotations
    }
}

impl fmt::Debug for MemberDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("visibility", &self.visibility)
            .field("member_type", &self.member_type)
            .finish_non_exhaustive()
    }
}

/// One constructor parameter.
#[derive(Clone, Debug)]
pub struct ParameterDescriptor {
    pub(crate) name: String,
    pub(crate) param_type: TypeRef,
}

/// Declares a constructor parameter of type `A`.
#[must_use]
pub fn param<A: Describe>(name: &str) -> ParameterDescriptor {
    ParameterDescriptor {
        name: name.to_string(),
        param_type: TypeRef::of::<A>(),
    }
}

/// Arguments handed to a constructor, positioned like its parameters.
///
/// A slot is empty when the JSON had no value for it and no default was known.
pub struct CreatorArgs {
    values: Vec<Option<Box<dyn Any>>>,
}

impl CreatorArgs {
    pub(crate) fn new(values: Vec<Option<Box<dyn Any>>>) -> Self {
        CreatorArgs { values }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Takes the argument at `index`.
    ///
    /// # Errors
    ///
    /// Fails when the slot is empty, already taken or holds another type.
    pub fn take<A: Any>(&mut self, index: usize) -> Result<A, HostError> {
        match self.values.get_mut(index).and_then(Option::take) {
            Some(value) => value
                .downcast::<A>()
                .map(|value| *value)
                .map_err(|_| mismatch::<A>()),
            None => Err(format!("No value for constructor argument {index}.").into()),
        }
    }

    /// Takes the argument at `index`, falling back to `A::default()` for an empty slot.
    pub fn take_or_default<A: Any + Default>(&mut self, index: usize) -> Result<A, HostError> {
        match self.values.get_mut(index).and_then(Option::take) {
            Some(value) => value
                .downcast::<A>()
                .map(|value| *value)
                .map_err(|_| mismatch::<A>()),
            None => Ok(A::default()),
        }
    }
}

pub(crate) type Invoke = Arc<dyn Fn(CreatorArgs) -> Result<Box<dyn Any>, HostError> + Send + Sync>;

/// One constructor of an object shape.
#[derive(Clone)]
pub struct ConstructorDescriptor {
    pub(crate) parameters: Vec<ParameterDescriptor>,
    pub(crate) visibility: Visibility,
    pub(crate) designated: bool,
    pub(crate) invoke: Invoke,
}

impl fmt::Debug for ConstructorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorDescriptor")
            .field("parameters", &self.parameters)
            .field("visibility", &self.visibility)
            .field("designated", &self.designated)
            .finish_non_exhaustive()
    }
}

/// Conversion between a scalar Rust value and a JSON primitive.
pub trait Scalar: Any + Sized {
    fn to_json(&self) -> Result<JsonValue, HostError>;
    fn from_json(value: JsonValue) -> Result<Self, HostError>;

    /// The value a member of this type holds when nothing was assigned.
    fn zero() -> Option<JsonValue> {
        None
    }
}

#[derive(Clone, Copy)]
pub struct PrimitiveOps {
    pub(crate) to_json: fn(&dyn Any) -> Result<JsonValue, HostError>,
    pub(crate) from_json: fn(JsonValue) -> Result<Box<dyn Any>, HostError>,
    pub(crate) zero: fn() -> Option<JsonValue>,
}

fn scalar_to_json<T: Scalar>(value: &dyn Any) -> Result<JsonValue, HostError> {
    value.downcast_ref::<T>().ok_or_else(mismatch::<T>)?.to_json()
}

fn scalar_from_json<T: Scalar>(value: JsonValue) -> Result<Box<dyn Any>, HostError> {
    Ok(Box::new(T::from_json(value)?))
}

fn serde_to_json<T: Serialize + Any>(value: &dyn Any) -> Result<JsonValue, HostError> {
    let value = value.downcast_ref::<T>().ok_or_else(mismatch::<T>)?;
    Ok(crate::bridge::to_json_value(value)?)
}

fn serde_from_json<T: DeserializeOwned + Any>(value: JsonValue) -> Result<Box<dyn Any>, HostError> {
    Ok(Box::new(crate::bridge::from_json_value::<T>(value)?))
}

fn no_zero() -> Option<JsonValue> {
    None
}

/// `Option<T>`: absent is `null`.
#[derive(Clone, Copy)]
pub struct NullableOps {
    pub(crate) inner: TypeRef,
    pub(crate) get: fn(&dyn Any) -> Option<&dyn Any>,
    pub(crate) get_mut: fn(&mut dyn Any) -> Option<&mut dyn Any>,
    pub(crate) none: fn() -> Box<dyn Any>,
    pub(crate) some: fn(Box<dyn Any>) -> Result<Box<dyn Any>, HostError>,
}

fn option_get<T: Any>(value: &dyn Any) -> Option<&dyn Any> {
    value
        .downcast_ref::<Option<T>>()?
        .as_ref()
        .map(|inner| inner as &dyn Any)
}

fn option_get_mut<T: Any>(value: &mut dyn Any) -> Option<&mut dyn Any> {
    value
        .downcast_mut::<Option<T>>()?
        .as_mut()
        .map(|inner| inner as &mut dyn Any)
}

fn option_none<T: Any>() -> Box<dyn Any> {
    Box::new(None::<T>)
}

fn option_some<T: Any>(value: Box<dyn Any>) -> Result<Box<dyn Any>, HostError> {
    let value = value.downcast::<T>().map_err(|_| mismatch::<T>())?;
    Ok(Box::new(Some(*value)))
}

/// A value with identity: the only kind of value `$id`/`$ref` can track.
pub type Shared<T> = Rc<RefCell<T>>;

/// Wraps a value for shared, identity-tracked use.
pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

#[derive(Clone, Copy)]
pub struct SharedOps {
    pub(crate) inner: TypeRef,
    pub(crate) identity: fn(&dyn Any) -> Option<usize>,
    pub(crate) borrow: fn(&dyn Any) -> Option<Ref<'_, dyn Any + 'static>>,
    pub(crate) borrow_mut: fn(&dyn Any) -> Option<RefMut<'_, dyn Any + 'static>>,
    pub(crate) wrap: fn(Box<dyn Any>) -> Result<Box<dyn Any>, HostError>,
    pub(crate) share: fn(&dyn Any) -> Option<Box<dyn Any>>,
}

fn shared_identity<T: Any>(value: &dyn Any) -> Option<usize> {
    value
        .downcast_ref::<Shared<T>>()
        .map(|cell| Rc::as_ptr(cell) as *const () as usize)
}

fn shared_borrow<T: Any>(value: &dyn Any) -> Option<Ref<'_, dyn Any + 'static>> {
    let cell = value.downcast_ref::<Shared<T>>()?;
    let guard = cell.try_borrow().ok()?;
    Some(Ref::map(guard, |inner| inner as &(dyn Any + 'static)))
}

fn shared_borrow_mut<T: Any>(value: &dyn Any) -> Option<RefMut<'_, dyn Any + 'static>> {
    let cell = value.downcast_ref::<Shared<T>>()?;
    let guard = cell.try_borrow_mut().ok()?;
    Some(RefMut::map(guard, |inner| inner as &mut (dyn Any + 'static)))
}

fn shared_wrap<T: Any>(value: Box<dyn Any>) -> Result<Box<dyn Any>, HostError> {
    let value = value.downcast::<T>().map_err(|_| mismatch::<T>())?;
    Ok(Box::new(shared(*value)))
}

fn shared_share<T: Any>(value: &dyn Any) -> Option<Box<dyn Any>> {
    value
        .downcast_ref::<Shared<T>>()
        .map(|cell| Box::new(Rc::clone(cell)) as Box<dyn Any>)
}

/// Sequence capability.
pub trait ListLike<T>: Any {
    fn items(&self) -> Vec<&T>;
    fn push_item(&mut self, item: T);
}

#[derive(Clone, Copy)]
pub struct ListOps {
    pub(crate) item: TypeRef,
    pub(crate) items: fn(&dyn Any) -> Vec<&dyn Any>,
    pub(crate) create: Option<fn() -> Box<dyn Any>>,
    pub(crate) push: fn(&mut dyn Any, Box<dyn Any>) -> Result<(), HostError>,
    pub(crate) from_items: Option<fn(Vec<Box<dyn Any>>) -> Result<Box<dyn Any>, HostError>>,
}

pub(crate) fn list_items<L: ListLike<T>, T: Any>(value: &dyn Any) -> Vec<&dyn Any> {
    value
        .downcast_ref::<L>()
        .map(|list| {
            list.items()
                .into_iter()
                .map(|item| item as &dyn Any)
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn list_push<L: ListLike<T>, T: Any>(
    list: &mut dyn Any,
    item: Box<dyn Any>,
) -> Result<(), HostError> {
    let list = list.downcast_mut::<L>().ok_or_else(mismatch::<L>)?;
    let item = item.downcast::<T>().map_err(|_| mismatch::<T>())?;
    list.push_item(*item);
    Ok(())
}

fn create_default<C: Default + Any>() -> Box<dyn Any> {
    Box::new(C::default())
}

fn array_items<T: Any, const N: usize>(value: &dyn Any) -> Vec<&dyn Any> {
    value
        .downcast_ref::<[T; N]>()
        .map(|array| array.iter().map(|item| item as &dyn Any).collect())
        .unwrap_or_default()
}

fn array_push<T: Any, const N: usize>(
    _list: &mut dyn Any,
    _item: Box<dyn Any>,
) -> Result<(), HostError> {
    Err(format!(
        "Collection of type '{}' is read-only.",
        TypeKey::of::<[T; N]>().short_name()
    )
    .into())
}

fn array_from_items<T: Any, const N: usize>(
    items: Vec<Box<dyn Any>>,
) -> Result<Box<dyn Any>, HostError> {
    let count = items.len();
    let items = items
        .into_iter()
        .map(|item| item.downcast::<T>().map(|item| *item))
        .collect::<Result<Vec<T>, _>>()
        .map_err(|_| mismatch::<T>())?;
    let array: [T; N] = items
        .try_into()
        .map_err(|_| format!("Expected {N} items but found {count}."))?;
    Ok(Box::new(array))
}

/// Key/value capability. Keys travel as JSON property names.
pub trait MapLike<V>: Any {
    fn entries(&self) -> Vec<(String, &V)>;
    fn insert_entry(&mut self, key: &str, value: V) -> Result<(), HostError>;
}

/// A dictionary key type.
pub trait MapKey: Sized {
    fn to_key(&self) -> String;
    fn from_key(key: &str) -> Result<Self, HostError>;
}

#[derive(Clone, Copy)]
pub struct MapOps {
    pub(crate) value: TypeRef,
    pub(crate) entries: fn(&dyn Any) -> Vec<(String, &dyn Any)>,
    pub(crate) create: Option<fn() -> Box<dyn Any>>,
    pub(crate) insert: fn(&mut dyn Any, &str, Box<dyn Any>) -> Result<(), HostError>,
}

pub(crate) fn map_entries<M: MapLike<V>, V: Any>(value: &dyn Any) -> Vec<(String, &dyn Any)> {
    value
        .downcast_ref::<M>()
        .map(|map| {
            map.entries()
                .into_iter()
                .map(|(key, value)| (key, value as &dyn Any))
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn map_insert<M: MapLike<V>, V: Any>(
    map: &mut dyn Any,
    key: &str,
    value: Box<dyn Any>,
) -> Result<(), HostError> {
    let map = map.downcast_mut::<M>().ok_or_else(mismatch::<M>)?;
    let value = value.downcast::<V>().map_err(|_| mismatch::<V>())?;
    map.insert_entry(key, *value)
}

/// Open member set on top of the declared members.
pub trait DynamicMembers: Any {
    fn dynamic_members(&self) -> Vec<(String, &JsonValue)>;
    fn set_dynamic_member(&mut self, name: &str, value: JsonValue) -> Result<(), HostError>;
}

#[derive(Clone, Copy)]
pub struct DynamicOps {
    pub(crate) entries: fn(&dyn Any) -> Vec<(String, &JsonValue)>,
    pub(crate) set: fn(&mut dyn Any, &str, JsonValue) -> Result<(), HostError>,
}

fn dynamic_entries<D: DynamicMembers>(value: &dyn Any) -> Vec<(String, &JsonValue)> {
    value
        .downcast_ref::<D>()
        .map(D::dynamic_members)
        .unwrap_or_default()
}

fn dynamic_set<D: DynamicMembers>(
    target: &mut dyn Any,
    name: &str,
    value: JsonValue,
) -> Result<(), HostError> {
    target
        .downcast_mut::<D>()
        .ok_or_else(mismatch::<D>)?
        .set_dynamic_member(name, value)
}

/// A type that writes and reads its own member map.
pub trait SerializableMembers: Any + Sized {
    fn write_members(&self, data: &mut JsonMap) -> Result<(), HostError>;
    fn from_members(data: JsonMap) -> Result<Self, HostError>;
}

#[derive(Clone, Copy)]
pub struct SerializableOps {
    pub(crate) write: fn(&dyn Any, &mut JsonMap) -> Result<(), HostError>,
    pub(crate) read: fn(JsonMap) -> Result<Box<dyn Any>, HostError>,
}

fn serializable_write<S: SerializableMembers>(
    value: &dyn Any,
    data: &mut JsonMap,
) -> Result<(), HostError> {
    value
        .downcast_ref::<S>()
        .ok_or_else(mismatch::<S>)?
        .write_members(data)
}

fn serializable_read<S: SerializableMembers>(data: JsonMap) -> Result<Box<dyn Any>, HostError> {
    Ok(Box::new(S::from_members(data)?))
}

/// A trait-object holder, `Box<dyn Animal>`, whose runtime type decides the contract.
pub trait Polymorphic: Any {
    fn concrete(&self) -> &dyn Any;
    fn concrete_mut(&mut self) -> &mut dyn Any;
}

pub(crate) type Upcast = Arc<dyn Fn(Box<dyn Any>) -> Result<Box<dyn Any>, HostError> + Send + Sync>;

/// A concrete type accepted by a polymorphic holder.
#[derive(Clone)]
pub struct Implementor {
    pub(crate) target: TypeRef,
    pub(crate) upcast: Upcast,
}

#[derive(Clone)]
pub struct PolymorphicOps {
    pub(crate) concrete: fn(&dyn Any) -> Option<&dyn Any>,
    pub(crate) concrete_mut: fn(&mut dyn Any) -> Option<&mut dyn Any>,
    pub(crate) implementors: Vec<Implementor>,
}

fn polymorphic_concrete<P: Polymorphic>(value: &dyn Any) -> Option<&dyn Any> {
    value.downcast_ref::<P>().map(P::concrete)
}

fn polymorphic_concrete_mut<P: Polymorphic>(value: &mut dyn Any) -> Option<&mut dyn Any> {
    value.downcast_mut::<P>().map(P::concrete_mut)
}

impl PolymorphicOps {
    /// The implementor matching the runtime type of `value`.
    pub(crate) fn implementor_of<'a>(
        &'a self,
        value: &'a dyn Any,
    ) -> Option<(&'a dyn Any, &'a Implementor)> {
        let concrete = (self.concrete)(value)?;
        let id = concrete.type_id();
        self.implementors
            .iter()
            .find(|implementor| implementor.target.key().id() == id)
            .map(|implementor| (concrete, implementor))
    }
}

/// What a type can do beyond being a plain object shape.
#[derive(Clone)]
pub enum Capability {
    Object,
    Primitive(PrimitiveOps),
    List(ListOps),
    Map(MapOps),
    Dynamic(DynamicOps),
    Serializable(SerializableOps),
    Polymorphic(PolymorphicOps),
    Nullable(NullableOps),
    Shared(SharedOps),
}

/// Everything the resolver knows about a type.
#[derive(Clone)]
pub struct TypeDescriptor {
    pub(crate) key: TypeKey,
    pub(crate) name: String,
    pub(crate) is_abstract: bool,
    pub(crate) created_as: TypeKey,
    pub(crate) annotations: ContainerAnnotations,
    pub(crate) member_serialization: MemberSerialization,
    pub(crate) interfaces: Vec<InterfaceView>,
    pub(crate) kind_override: Option<ContractKind>,
    pub(crate) capability: Capability,
    pub(crate) members: Vec<MemberDescriptor>,
    pub(crate) constructors: Vec<ConstructorDescriptor>,
    pub(crate) converter: Option<Arc<dyn JsonConverter>>,
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("key", &self.key)
            .field("name", &self.name)
            .field("is_abstract", &self.is_abstract)
            .field("members", &self.members)
            .field("constructors", &self.constructors)
            .finish_non_exhaustive()
    }
}

impl TypeDescriptor {
    fn bare<T: ?Sized + 'static>(capability: Capability) -> Self {
        let key = TypeKey::of::<T>();
        TypeDescriptor {
            key,
            name: key.short_name(),
            is_abstract: false,
            created_as: key,
            annotations: ContainerAnnotations::default(),
            member_serialization: MemberSerialization::default(),
            interfaces: Vec::new(),
            kind_override: None,
            capability,
            members: Vec::new(),
            constructors: Vec::new(),
            converter: None,
        }
    }

    /// Starts an object shape with members and constructors.
    #[must_use]
    pub fn object<T: Any>() -> ObjectBuilder<T> {
        ObjectBuilder {
            descriptor: TypeDescriptor::bare::<T>(Capability::Object),
            _marker: PhantomData,
        }
    }

    /// A JSON primitive backed by a [`Scalar`] implementation.
    #[must_use]
    pub fn primitive<T: Scalar>() -> Self {
        TypeDescriptor::bare::<T>(Capability::Primitive(PrimitiveOps {
            to_json: scalar_to_json::<T>,
            from_json: scalar_from_json::<T>,
            zero: T::zero,
        }))
    }

    /// A primitive whose JSON form comes from its serde implementations.
    ///
    /// ```rust
    /// use jsongraph::describe::{Describe, TypeDescriptor};
    /// use serde::{Deserialize, Serialize};
    ///
    /// #[derive(Serialize, Deserialize, Debug, PartialEq)]
    /// enum Level { Low, High }
    ///
    /// impl Describe for Level {
    ///     fn describe() -> TypeDescriptor {
    ///         TypeDescriptor::serde::<Level>()
    ///     }
    /// }
    ///
    /// assert_eq!(jsongraph::to_string(&vec![Level::High]).unwrap(), r#"["High"]"#);
    /// ```
    #[must_use]
    pub fn serde<T: Serialize + DeserializeOwned + Any>() -> Self {
        TypeDescriptor::bare::<T>(Capability::Primitive(PrimitiveOps {
            to_json: serde_to_json::<T>,
            from_json: serde_from_json::<T>,
            zero: no_zero,
        }))
    }

    /// A default-constructible sequence of `T`.
    #[must_use]
    pub fn collection<L, T>() -> Self
    where
        L: ListLike<T> + Default,
        T: Describe,
    {
        TypeDescriptor::bare::<L>(Capability::List(ListOps {
            item: TypeRef::of::<T>(),
            items: list_items::<L, T>,
            create: Some(create_default::<L>),
            push: list_push::<L, T>,
            from_items: None,
        }))
    }

    /// A fixed-size array: built from its items, never populated in place.
    #[must_use]
    pub fn array<T: Describe, const N: usize>() -> Self {
        TypeDescriptor::bare::<[T; N]>(Capability::List(ListOps {
            item: TypeRef::of::<T>(),
            items: array_items::<T, N>,
            create: None,
            push: array_push::<T, N>,
            from_items: Some(array_from_items::<T, N>),
        }))
    }

    /// A default-constructible map of string-keyed `V` values.
    #[must_use]
    pub fn dictionary<M, V>() -> Self
    where
        M: MapLike<V> + Default,
        V: Describe,
    {
        TypeDescriptor::bare::<M>(Capability::Map(MapOps {
            value: TypeRef::of::<V>(),
            entries: map_entries::<M, V>,
            create: Some(create_default::<M>),
            insert: map_insert::<M, V>,
        }))
    }

    /// `Option<T>`.
    #[must_use]
    pub fn nullable<T: Describe>() -> Self {
        TypeDescriptor::bare::<Option<T>>(Capability::Nullable(NullableOps {
            inner: TypeRef::of::<T>(),
            get: option_get::<T>,
            get_mut: option_get_mut::<T>,
            none: option_none::<T>,
            some: option_some::<T>,
        }))
    }

    /// `Rc<RefCell<T>>`.
    #[must_use]
    pub fn shared<T: Describe>() -> Self {
        TypeDescriptor::bare::<Shared<T>>(Capability::Shared(SharedOps {
            inner: TypeRef::of::<T>(),
            identity: shared_identity::<T>,
            borrow: shared_borrow::<T>,
            borrow_mut: shared_borrow_mut::<T>,
            wrap: shared_wrap::<T>,
            share: shared_share::<T>,
        }))
    }

    /// Starts a trait-object holder description.
    #[must_use]
    pub fn polymorphic<P: Polymorphic>() -> PolymorphicBuilder<P> {
        let mut descriptor = TypeDescriptor::bare::<P>(Capability::Polymorphic(PolymorphicOps {
            concrete: polymorphic_concrete::<P>,
            concrete_mut: polymorphic_concrete_mut::<P>,
            implementors: Vec::new(),
        }));
        descriptor.is_abstract = true;
        PolymorphicBuilder {
            descriptor,
            _marker: PhantomData,
        }
    }

    /// Marks the type abstract and names the concrete type its creators build.
    #[must_use]
    pub fn created_as<C: ?Sized + 'static>(mut self) -> Self {
        self.is_abstract = true;
        self.created_as = TypeKey::of::<C>();
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_is_reference(mut self, is_reference: bool) -> Self {
        self.annotations.is_reference = Some(is_reference);
        self
    }

    #[must_use]
    pub fn with_item_is_reference(mut self, is_reference: bool) -> Self {
        self.annotations.item_is_reference = Some(is_reference);
        self
    }

    #[must_use]
    pub fn with_item_reference_loop_handling(mut self, handling: ReferenceLoopHandling) -> Self {
        self.annotations.item_reference_loop_handling = Some(handling);
        self
    }

    #[must_use]
    pub fn with_item_type_name_handling(mut self, handling: TypeNameHandling) -> Self {
        self.annotations.item_type_name_handling = Some(handling);
        self
    }

    /// Forces the contract kind instead of deriving it from the capability.
    #[must_use]
    pub fn with_contract_kind(mut self, kind: ContractKind) -> Self {
        self.kind_override = Some(kind);
        self
    }

    #[must_use]
    pub fn with_converter(mut self, converter: Arc<dyn JsonConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    #[must_use]
    pub fn key(&self) -> TypeKey {
        self.key
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    #[must_use]
    pub fn created_type(&self) -> TypeKey {
        self.created_as
    }

    #[must_use]
    pub fn annotations(&self) -> &ContainerAnnotations {
        &self.annotations
    }

    #[must_use]
    pub fn interfaces(&self) -> &[InterfaceView] {
        &self.interfaces
    }

    #[must_use]
    pub fn members(&self) -> &[MemberDescriptor] {
        &self.members
    }

    #[must_use]
    pub fn constructors(&self) -> &[ConstructorDescriptor] {
        &self.constructors
    }

    #[must_use]
    pub fn capability(&self) -> &Capability {
        &self.capability
    }
}

/// Builds an object shape for `T`.
pub struct ObjectBuilder<T> {
    descriptor: TypeDescriptor,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any> ObjectBuilder<T> {
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.descriptor.name = name.into();
        self
    }

    /// An abstract shape: its own constructors are never used.
    #[must_use]
    pub fn is_abstract(mut self) -> Self {
        self.descriptor.is_abstract = true;
        self
    }

    #[must_use]
    pub fn is_reference(mut self, is_reference: bool) -> Self {
        self.descriptor.annotations.is_reference = Some(is_reference);
        self
    }

    #[must_use]
    pub fn item_is_reference(mut self, is_reference: bool) -> Self {
        self.descriptor.annotations.item_is_reference = Some(is_reference);
        self
    }

    #[must_use]
    pub fn item_reference_loop_handling(mut self, handling: ReferenceLoopHandling) -> Self {
        self.descriptor.annotations.item_reference_loop_handling = Some(handling);
        self
    }

    #[must_use]
    pub fn item_type_name_handling(mut self, handling: TypeNameHandling) -> Self {
        self.descriptor.annotations.item_type_name_handling = Some(handling);
        self
    }

    #[must_use]
    pub fn member_serialization(mut self, mode: MemberSerialization) -> Self {
        self.descriptor.member_serialization = mode;
        self
    }

    /// Declares an interface view: a name and the members it exposes.
    #[must_use]
    pub fn implements(mut self, name: &str, members: &[&str]) -> Self {
        self.descriptor.interfaces.push(InterfaceView {
            name: name.to_string(),
            members: members.iter().map(|member| (*member).to_string()).collect(),
        });
        self
    }

    #[must_use]
    pub fn converter(mut self, converter: Arc<dyn JsonConverter>) -> Self {
        self.descriptor.converter = Some(converter);
        self
    }

    /// A field read and written through references.
    #[must_use]
    pub fn field<F: Describe>(
        self,
        name: &str,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> Self {
        self.field_with(name, get, get_mut, |member| member)
    }

    /// A field with annotations.
    #[must_use]
    pub fn field_with<F: Describe>(
        self,
        name: &str,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
        configure: impl FnOnce(MemberBuilder<T>) -> MemberBuilder<T>,
    ) -> Self {
        let member = MemberBuilder::new(
            name,
            MemberKind::Field,
            TypeRef::of::<F>(),
            Arc::new(FieldAccess { get, get_mut }),
        );
        self.member(configure(member).build())
    }

    /// A property with a getter and a setter.
    #[must_use]
    pub fn property<F: Describe>(self, name: &str, get: Getter<T, F>, set: Setter<T, F>) -> Self {
        self.property_with(name, Some(get), Some(set), |member| member)
    }

    /// A read-only property.
    #[must_use]
    pub fn computed<F: Describe>(self, name: &str, get: Getter<T, F>) -> Self {
        self.property_with(name, Some(get), None, |member| member)
    }

    /// A property with annotations. Either accessor may be missing.
    #[must_use]
    pub fn property_with<F: Describe>(
        self,
        name: &str,
        get: Option<Getter<T, F>>,
        set: Option<Setter<T, F>>,
        configure: impl FnOnce(MemberBuilder<T>) -> MemberBuilder<T>,
    ) -> Self {
        let member = MemberBuilder::new(
            name,
            MemberKind::Property,
            TypeRef::of::<F>(),
            Arc::new(PropertyAccess { get, set }),
        );
        self.member(configure(member).build())
    }

    #[must_use]
    pub fn member(mut self, member: MemberDescriptor) -> Self {
        self.descriptor.members.push(member);
        self
    }

    #[must_use]
    pub fn default_constructor(self, create: fn() -> T) -> Self {
        self.push_default(create, Visibility::Public)
    }

    #[must_use]
    pub fn non_public_default_constructor(self, create: fn() -> T) -> Self {
        self.push_default(create, Visibility::NonPublic)
    }

    fn push_default(mut self, create: fn() -> T, visibility: Visibility) -> Self {
        self.descriptor.constructors.push(ConstructorDescriptor {
            parameters: Vec::new(),
            visibility,
            designated: false,
            invoke: Arc::new(move |_: CreatorArgs| Ok::<_, HostError>(Box::new(create()) as Box<dyn Any>)),
        });
        self
    }

    /// A public constructor taking arguments.
    #[must_use]
    pub fn constructor(
        self,
        parameters: &[ParameterDescriptor],
        create: fn(CreatorArgs) -> Result<T, HostError>,
    ) -> Self {
        self.push_constructor(parameters, create, Visibility::Public, false)
    }

    #[must_use]
    pub fn non_public_constructor(
        self,
        parameters: &[ParameterDescriptor],
        create: fn(CreatorArgs) -> Result<T, HostError>,
    ) -> Self {
        self.push_constructor(parameters, create, Visibility::NonPublic, false)
    }

    /// The constructor to use even when a default constructor exists.
    #[must_use]
    pub fn designated_constructor(
        self,
        parameters: &[ParameterDescriptor],
        create: fn(CreatorArgs) -> Result<T, HostError>,
    ) -> Self {
        self.push_constructor(parameters, create, Visibility::Public, true)
    }

    fn push_constructor(
        mut self,
        parameters: &[ParameterDescriptor],
        create: fn(CreatorArgs) -> Result<T, HostError>,
        visibility: Visibility,
        designated: bool,
    ) -> Self {
        self.descriptor.constructors.push(ConstructorDescriptor {
            parameters: parameters.to_vec(),
            visibility,
            designated,
            invoke: Arc::new(move |args: CreatorArgs| {
                Ok::<_, HostError>(Box::new(create(args)?) as Box<dyn Any>)
            }),
        });
        self
    }

    /// Adds an open member set read and written next to the declared members.
    #[must_use]
    pub fn dynamic_members(mut self) -> Self
    where
        T: DynamicMembers,
    {
        self.descriptor.capability = Capability::Dynamic(DynamicOps {
            entries: dynamic_entries::<T>,
            set: dynamic_set::<T>,
        });
        self
    }

    /// Lets the type write and read its own member map.
    #[must_use]
    pub fn serializable(mut self) -> Self
    where
        T: SerializableMembers,
    {
        self.descriptor.capability = Capability::Serializable(SerializableOps {
            write: serializable_write::<T>,
            read: serializable_read::<T>,
        });
        self
    }

    #[must_use]
    pub fn build(self) -> TypeDescriptor {
        self.descriptor
    }
}

/// Annotations of one member.
pub struct MemberBuilder<T> {
    member: MemberDescriptor,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any> MemberBuilder<T> {
    fn new(
        name: &str,
        kind: MemberKind,
        member_type: TypeRef,
        access: Arc<dyn MemberAccess>,
    ) -> Self {
        MemberBuilder {
            member: MemberDescriptor {
                name: name.to_string(),
                kind,
                visibility: Visibility::Public,
                is_static: false,
                compiler_generated: false,
                member_type,
                access,
                annotations: MemberAnnotations::default(),
            },
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn non_public(mut self) -> Self {
        self.member.visibility = Visibility::NonPublic;
        self
    }

    #[must_use]
    pub fn static_member(mut self) -> Self {
        self.member.is_static = true;
        self
    }

    /// A synthesized backing member, skipped unless the resolver opts in.
    #[must_use]
    pub fn compiler_generated(mut self) -> Self {
        self.member.compiler_generated = true;
        self
    }

    /// The wire name, used verbatim.
    #[must_use]
    pub fn json_name(mut self, name: &str) -> Self {
        self.member.annotations.json_name = Some(name.to_string());
        self
    }

    #[must_use]
    pub fn ignore(mut self) -> Self {
        self.member.annotations.ignore = true;
        self
    }

    /// Serialize even when the member is non-public or the shape is opt-in.
    #[must_use]
    pub fn include(mut self) -> Self {
        self.member.annotations.include = true;
        self
    }

    #[must_use]
    pub fn required(mut self, required: Required) -> Self {
        self.member.annotations.required = Some(required);
        self
    }

    #[must_use]
    pub fn order(mut self, order: i32) -> Self {
        self.member.annotations.order = Some(order);
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: JsonValue) -> Self {
        self.member.annotations.default_value = Some(value);
        self
    }

    #[must_use]
    pub fn is_reference(mut self, is_reference: bool) -> Self {
        self.member.annotations.is_reference = Some(is_reference);
        self
    }

    #[must_use]
    pub fn reference_loop_handling(mut self, handling: ReferenceLoopHandling) -> Self {
        self.member.annotations.reference_loop_handling = Some(handling);
        self
    }

    #[must_use]
    pub fn item_is_reference(mut self, is_reference: bool) -> Self {
        self.member.annotations.item_is_reference = Some(is_reference);
        self
    }

    #[must_use]
    pub fn item_reference_loop_handling(mut self, handling: ReferenceLoopHandling) -> Self {
        self.member.annotations.item_reference_loop_handling = Some(handling);
        self
    }

    #[must_use]
    pub fn null_value_handling(mut self, handling: NullValueHandling) -> Self {
        self.member.annotations.null_value_handling = Some(handling);
        self
    }

    #[must_use]
    pub fn default_value_handling(mut self, handling: DefaultValueHandling) -> Self {
        self.member.annotations.default_value_handling = Some(handling);
        self
    }

    #[must_use]
    pub fn type_name_handling(mut self, handling: TypeNameHandling) -> Self {
        self.member.annotations.type_name_handling = Some(handling);
        self
    }

    #[must_use]
    pub fn item_type_name_handling(mut self, handling: TypeNameHandling) -> Self {
        self.member.annotations.item_type_name_handling = Some(handling);
        self
    }

    /// Skips the member on write when the predicate is false for the owning instance.
    #[must_use]
    pub fn should_serialize(mut self, predicate: fn(&T) -> Result<bool, HostError>) -> Self {
        self.member.annotations.should_serialize = Some(bind(predicate));
        self
    }

    /// Skips the member on read when the predicate is false for the instance being populated.
    #[must_use]
    pub fn should_deserialize(mut self, predicate: fn(&T) -> Result<bool, HostError>) -> Self {
        self.member.annotations.should_deserialize = Some(bind(predicate));
        self
    }

    #[must_use]
    pub fn converter(mut self, converter: Arc<dyn JsonConverter>) -> Self {
        self.member.annotations.converter = Some(converter);
        self
    }

    #[must_use]
    pub fn build(self) -> MemberDescriptor {
        self.member
    }
}

fn bind<T: Any>(predicate: fn(&T) -> Result<bool, HostError>) -> Predicate {
    Arc::new(move |instance: &dyn Any| instance.downcast_ref::<T>().map_or(Ok(true), predicate))
}

/// Builds a polymorphic holder description.
pub struct PolymorphicBuilder<P> {
    descriptor: TypeDescriptor,
    _marker: PhantomData<fn() -> P>,
}

impl<P: Polymorphic> PolymorphicBuilder<P> {
    /// Accepts `C` as a runtime type of the holder.
    #[must_use]
    pub fn implementor<C: Describe>(mut self, upcast: fn(C) -> P) -> Self {
        let upcast: Upcast = Arc::new(move |value: Box<dyn Any>| {
            let value = value.downcast::<C>().map_err(|_| mismatch::<C>())?;
            Ok::<_, HostError>(Box::new(upcast(*value)) as Box<dyn Any>)
        });
        if let Capability::Polymorphic(ops) = &mut self.descriptor.capability {
            ops.implementors.push(Implementor {
                target: TypeRef::of::<C>(),
                upcast,
            });
        }
        self
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.descriptor.name = name.into();
        self
    }

    #[must_use]
    pub fn is_reference(mut self, is_reference: bool) -> Self {
        self.descriptor.annotations.is_reference = Some(is_reference);
        self
    }

    #[must_use]
    pub fn build(self) -> TypeDescriptor {
        self.descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Sample {
        id: i32,
        label: String,
    }

    impl Describe for Sample {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::object::<Sample>()
                .field("Id", |s| &s.id, |s| &mut s.id)
                .property_with(
                    "Label",
                    Some(|s: &Sample| Ok(s.label.to_uppercase())),
                    None,
                    |m| m.order(1),
                )
                .default_constructor(Sample::default)
                .build()
        }
    }

    #[test]
    fn test_short_name_strips_paths() {
        assert_eq!(TypeKey::of::<Vec<String>>().short_name(), "Vec<String>");
        assert_eq!(
            TypeKey::of::<std::collections::HashMap<String, Option<i32>>>().short_name(),
            "HashMap<String, Option<i32>>"
        );
        assert_eq!(TypeKey::of::<Sample>().short_name(), "Sample");
    }

    #[test]
    fn test_type_key_identity() {
        assert_eq!(TypeKey::of::<Sample>(), TypeKey::of::<Sample>());
        assert_ne!(TypeKey::of::<Sample>(), TypeKey::of::<i32>());
    }

    #[test]
    fn test_field_access_reads_and_writes() {
        let descriptor = Sample::describe();
        let id = &descriptor.members()[0];
        let mut sample = Sample { id: 3, label: "a".into() };

        let value = id.access.get(&sample).unwrap();
        assert_eq!(value.as_any().downcast_ref::<i32>(), Some(&3));

        id.access.set(&mut sample, Box::new(9_i32)).unwrap();
        assert_eq!(sample.id, 9);
        assert!(id.access.set(&mut sample, Box::new("x")).is_err());
    }

    #[test]
    fn test_computed_property_is_read_only() {
        let descriptor = Sample::describe();
        let label = &descriptor.members()[1];
        assert!(label.access.can_read());
        assert!(!label.access.can_write());
        assert_eq!(label.annotations().order, Some(1));

        let sample = Sample { id: 1, label: "abc".into() };
        let value = label.access.get(&sample).unwrap();
        assert_eq!(value.as_any().downcast_ref::<String>().map(String::as_str), Some("ABC"));
    }

    #[test]
    fn test_creator_args() {
        let mut args = CreatorArgs::new(vec![Some(Box::new(5_u8)), None]);
        assert_eq!(args.len(), 2);
        assert_eq!(args.take::<u8>(0).unwrap(), 5);
        assert!(args.take::<u8>(0).is_err());
        assert!(args.take::<String>(1).is_err());
        assert_eq!(args.take_or_default::<String>(1).unwrap(), "");
    }

    #[test]
    fn test_shared_ops_identity() {
        let TypeDescriptor {
            capability: Capability::Shared(ops),
            ..
        } = TypeDescriptor::shared::<Sample>()
        else {
            panic!("expected a shared capability");
        };
        let a = shared(Sample::default());
        let b = Rc::clone(&a);
        let c = shared(Sample::default());
        assert_eq!((ops.identity)(&a), (ops.identity)(&b));
        assert_ne!((ops.identity)(&a), (ops.identity)(&c));

        let copy = (ops.share)(&a).unwrap();
        let copy = copy.downcast::<Shared<Sample>>().unwrap();
        assert!(Rc::ptr_eq(&a, &copy));
    }
}
