//! [`Describe`] for standard library and ecosystem types.

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::Hash;

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use num_bigint::BigInt;

use crate::describe::{
    Describe, DynamicMembers, ListLike, MapKey, MapLike, Scalar, Shared, TypeDescriptor, TypeKey,
};
use crate::error::HostError;
use crate::value::{JsonValue, Number};
use crate::JsonMap;

fn conversion_error<T: 'static>(value: &JsonValue) -> HostError {
    let shown = match value {
        JsonValue::Null => "{null}".to_string(),
        other => other.to_string(),
    };
    format!(
        "Error converting value {shown} to type '{}'.",
        TypeKey::of::<T>().short_name()
    )
    .into()
}

/// An integral float as `T`, or `None` when it does not fit exactly.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn integral_float<T: TryFrom<i128> + TryFrom<u128>>(f: f64) -> Option<T> {
    // Both bounds are powers of two, so the float comparisons are exact.
    let signed_bound = -(i128::MIN as f64);
    let unsigned_bound = 2.0 * signed_bound;
    if f >= -signed_bound && f < signed_bound {
        <T as TryFrom<i128>>::try_from(f as i128).ok()
    } else if f >= 0.0 && f < unsigned_bound {
        <T as TryFrom<u128>>::try_from(f as u128).ok()
    } else {
        None
    }
}

macro_rules! integer_scalar {
    ($($ty:ty),*) => {
        $(
            impl Scalar for $ty {
                fn to_json(&self) -> Result<JsonValue, HostError> {
                    Ok(JsonValue::Number(match i64::try_from(*self) {
                        Ok(i) => Number::Integer(i),
                        Err(_) => Number::BigInt(BigInt::from(*self)),
                    }))
                }

                fn from_json(value: JsonValue) -> Result<Self, HostError> {
                    match &value {
                        JsonValue::Number(number) => {
                            let converted = match number {
                                Number::Integer(i) => <$ty>::try_from(*i).ok(),
                                Number::BigInt(b) => <$ty>::try_from(b).ok(),
                                Number::Float(f) if f.fract() == 0.0 => integral_float(*f),
                                Number::Float(_) => {
                                    return Err(format!("Input string '{number}' is not a valid integer.").into())
                                }
                            };
                            converted.ok_or_else(|| {
                                format!(
                                    "Value {number} is too large or too small for type '{}'.",
                                    stringify!($ty)
                                )
                                .into()
                            })
                        }
                        JsonValue::String(s) => s
                            .trim()
                            .parse::<$ty>()
                            .map_err(|_| format!("Could not convert string to integer: {s}.").into()),
                        _ => Err(conversion_error::<$ty>(&value)),
                    }
                }

                fn zero() -> Option<JsonValue> {
                    Some(JsonValue::Number(Number::Integer(0)))
                }
            }

            impl Describe for $ty {
                fn describe() -> TypeDescriptor {
                    TypeDescriptor::primitive::<$ty>()
                }
            }

            impl MapKey for $ty {
                fn to_key(&self) -> String {
                    self.to_string()
                }

                fn from_key(key: &str) -> Result<Self, HostError> {
                    key.parse::<$ty>()
                        .map_err(|_| format!("Could not convert string '{key}' to dictionary key type '{}'.", stringify!($ty)).into())
                }
            }
        )*
    };
}

integer_scalar!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

macro_rules! float_scalar {
    ($($ty:ty),*) => {
        $(
            impl Scalar for $ty {
                fn to_json(&self) -> Result<JsonValue, HostError> {
                    Ok(JsonValue::Number(Number::from(*self)))
                }

                #[allow(clippy::cast_possible_truncation)]
                fn from_json(value: JsonValue) -> Result<Self, HostError> {
                    match &value {
                        JsonValue::Number(number) => Ok(number.as_f64() as $ty),
                        JsonValue::String(s) => s
                            .trim()
                            .parse::<$ty>()
                            .map_err(|_| format!("Could not convert string to {}: {s}.", stringify!($ty)).into()),
                        _ => Err(conversion_error::<$ty>(&value)),
                    }
                }

                fn zero() -> Option<JsonValue> {
                    Some(JsonValue::Number(Number::Float(0.0)))
                }
            }

            impl Describe for $ty {
                fn describe() -> TypeDescriptor {
                    TypeDescriptor::primitive::<$ty>()
                }
            }
        )*
    };
}

float_scalar!(f32, f64);

impl Scalar for bool {
    fn to_json(&self) -> Result<JsonValue, HostError> {
        Ok(JsonValue::Bool(*self))
    }

    fn from_json(value: JsonValue) -> Result<Self, HostError> {
        match &value {
            JsonValue::Bool(b) => Ok(*b),
            JsonValue::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
            JsonValue::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
            JsonValue::Number(n) if n.is_integer() => Ok(n.as_i64() != Some(0)),
            _ => Err(conversion_error::<bool>(&value)),
        }
    }

    fn zero() -> Option<JsonValue> {
        Some(JsonValue::Bool(false))
    }
}

impl Describe for bool {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::primitive::<bool>()
    }
}

impl MapKey for bool {
    fn to_key(&self) -> String {
        self.to_string()
    }

    fn from_key(key: &str) -> Result<Self, HostError> {
        key.parse::<bool>()
            .map_err(|_| format!("Could not convert string '{key}' to dictionary key type 'bool'.").into())
    }
}

impl Scalar for char {
    fn to_json(&self) -> Result<JsonValue, HostError> {
        Ok(JsonValue::String(self.to_string()))
    }

    fn from_json(value: JsonValue) -> Result<Self, HostError> {
        if let JsonValue::String(s) = &value {
            let mut chars = s.chars();
            if let (Some(ch), None) = (chars.next(), chars.next()) {
                return Ok(ch);
            }
        }
        Err(conversion_error::<char>(&value))
    }
}

impl Describe for char {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::primitive::<char>()
    }
}

impl MapKey for char {
    fn to_key(&self) -> String {
        self.to_string()
    }

    fn from_key(key: &str) -> Result<Self, HostError> {
        Self::from_json(JsonValue::from(key))
    }
}

impl Scalar for String {
    fn to_json(&self) -> Result<JsonValue, HostError> {
        Ok(JsonValue::String(self.clone()))
    }

    fn from_json(value: JsonValue) -> Result<Self, HostError> {
        match value {
            JsonValue::String(s) => Ok(s),
            JsonValue::Number(n) => Ok(n.to_string()),
            JsonValue::Bool(b) => Ok(b.to_string()),
            other => Err(conversion_error::<String>(&other)),
        }
    }
}

impl Describe for String {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::primitive::<String>()
    }
}

impl MapKey for String {
    fn to_key(&self) -> String {
        self.clone()
    }

    fn from_key(key: &str) -> Result<Self, HostError> {
        Ok(key.to_string())
    }
}

impl Scalar for BigInt {
    fn to_json(&self) -> Result<JsonValue, HostError> {
        Ok(JsonValue::Number(Number::from(self.clone())))
    }

    fn from_json(value: JsonValue) -> Result<Self, HostError> {
        match &value {
            JsonValue::Number(Number::Integer(i)) => Ok(BigInt::from(*i)),
            JsonValue::Number(Number::BigInt(b)) => Ok(b.clone()),
            JsonValue::String(s) => s
                .trim()
                .parse::<BigInt>()
                .map_err(|_| format!("Could not convert string to integer: {s}.").into()),
            _ => Err(conversion_error::<BigInt>(&value)),
        }
    }

    fn zero() -> Option<JsonValue> {
        Some(JsonValue::Number(Number::Integer(0)))
    }
}

impl Describe for BigInt {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::primitive::<BigInt>()
    }
}

impl Scalar for DateTime<Utc> {
    fn to_json(&self) -> Result<JsonValue, HostError> {
        Ok(JsonValue::String(
            self.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        ))
    }

    fn from_json(value: JsonValue) -> Result<Self, HostError> {
        match &value {
            JsonValue::String(s) => DateTime::parse_from_rfc3339(s)
                .map(|date| date.with_timezone(&Utc))
                .map_err(|err| format!("Could not convert string to DateTime: {s}. {err}").into()),
            _ => Err(conversion_error::<DateTime<Utc>>(&value)),
        }
    }
}

impl Describe for DateTime<Utc> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::primitive::<DateTime<Utc>>()
    }
}

/// Untyped JSON is carried as-is.
impl Scalar for JsonValue {
    fn to_json(&self) -> Result<JsonValue, HostError> {
        Ok(self.clone())
    }

    fn from_json(value: JsonValue) -> Result<Self, HostError> {
        Ok(value)
    }

    fn zero() -> Option<JsonValue> {
        Some(JsonValue::Null)
    }
}

impl Describe for JsonValue {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::primitive::<JsonValue>()
    }
}

impl<T: Describe> Describe for Option<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::nullable::<T>()
    }
}

impl<T: Describe> Describe for Shared<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::shared::<T>()
    }
}

impl<T: 'static> ListLike<T> for Vec<T> {
    fn items(&self) -> Vec<&T> {
        self.iter().collect()
    }

    fn push_item(&mut self, item: T) {
        self.push(item);
    }
}

impl<T: 'static> ListLike<T> for VecDeque<T> {
    fn items(&self) -> Vec<&T> {
        self.iter().collect()
    }

    fn push_item(&mut self, item: T) {
        self.push_back(item);
    }
}

impl<T: Eq + Hash + 'static> ListLike<T> for HashSet<T> {
    fn items(&self) -> Vec<&T> {
        self.iter().collect()
    }

    fn push_item(&mut self, item: T) {
        self.insert(item);
    }
}

impl<T: Ord + 'static> ListLike<T> for BTreeSet<T> {
    fn items(&self) -> Vec<&T> {
        self.iter().collect()
    }

    fn push_item(&mut self, item: T) {
        self.insert(item);
    }
}

/// A list known only through [`ListLike`]; deserialized as a `Vec<T>` unless
/// the contract's default creator is replaced.
pub type DynList<T> = Box<dyn ListLike<T>>;

impl<T: 'static> ListLike<T> for DynList<T> {
    fn items(&self) -> Vec<&T> {
        (**self).items()
    }

    fn push_item(&mut self, item: T) {
        (**self).push_item(item);
    }
}

fn create_dyn_list<T: 'static>() -> Box<dyn Any> {
    let list: DynList<T> = Box::new(Vec::<T>::new());
    Box::new(list)
}

impl<T: Describe> Describe for Vec<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::collection::<Vec<T>, T>()
    }
}

impl<T: Describe> Describe for VecDeque<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::collection::<VecDeque<T>, T>()
    }
}

impl<T: Describe + Eq + Hash> Describe for HashSet<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::collection::<HashSet<T>, T>()
    }
}

impl<T: Describe + Ord> Describe for BTreeSet<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::collection::<BTreeSet<T>, T>()
    }
}

impl<T: Describe> Describe for DynList<T> {
    fn describe() -> TypeDescriptor {
        let mut descriptor = TypeDescriptor::collection::<Vec<T>, T>();
        if let crate::describe::Capability::List(ops) = &mut descriptor.capability {
            ops.items = crate::describe::list_items::<DynList<T>, T>;
            ops.push = crate::describe::list_push::<DynList<T>, T>;
            ops.create = Some(create_dyn_list::<T>);
        }
        let key = TypeKey::of::<DynList<T>>();
        descriptor.key = key;
        descriptor.name = key.short_name();
        descriptor.created_as::<Vec<T>>()
    }
}

impl<T: Describe, const N: usize> Describe for [T; N] {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::array::<T, N>()
    }
}

impl<K: MapKey + Eq + Hash + 'static, V: 'static> MapLike<V> for HashMap<K, V> {
    fn entries(&self) -> Vec<(String, &V)> {
        self.iter().map(|(key, value)| (key.to_key(), value)).collect()
    }

    fn insert_entry(&mut self, key: &str, value: V) -> Result<(), HostError> {
        self.insert(K::from_key(key)?, value);
        Ok(())
    }
}

impl<K: MapKey + Ord + 'static, V: 'static> MapLike<V> for BTreeMap<K, V> {
    fn entries(&self) -> Vec<(String, &V)> {
        self.iter().map(|(key, value)| (key.to_key(), value)).collect()
    }

    fn insert_entry(&mut self, key: &str, value: V) -> Result<(), HostError> {
        self.insert(K::from_key(key)?, value);
        Ok(())
    }
}

impl<K: MapKey + Eq + Hash + 'static, V: 'static> MapLike<V> for IndexMap<K, V> {
    fn entries(&self) -> Vec<(String, &V)> {
        self.iter().map(|(key, value)| (key.to_key(), value)).collect()
    }

    fn insert_entry(&mut self, key: &str, value: V) -> Result<(), HostError> {
        self.insert(K::from_key(key)?, value);
        Ok(())
    }
}

/// A map known only through [`MapLike`]; deserialized as a `HashMap<String, V>`.
pub type DynMap<V> = Box<dyn MapLike<V>>;

impl<V: 'static> MapLike<V> for DynMap<V> {
    fn entries(&self) -> Vec<(String, &V)> {
        (**self).entries()
    }

    fn insert_entry(&mut self, key: &str, value: V) -> Result<(), HostError> {
        (**self).insert_entry(key, value)
    }
}

fn create_dyn_map<V: 'static>() -> Box<dyn Any> {
    let map: DynMap<V> = Box::new(HashMap::<String, V>::new());
    Box::new(map)
}

impl<K: MapKey + Eq + Hash + 'static, V: Describe> Describe for HashMap<K, V> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::dictionary::<HashMap<K, V>, V>()
    }
}

impl<K: MapKey + Ord + 'static, V: Describe> Describe for BTreeMap<K, V> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::dictionary::<BTreeMap<K, V>, V>()
    }
}

impl<K: MapKey + Eq + Hash + 'static, V: Describe> Describe for IndexMap<K, V> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::dictionary::<IndexMap<K, V>, V>()
    }
}

impl<V: Describe> Describe for DynMap<V> {
    fn describe() -> TypeDescriptor {
        let mut descriptor = TypeDescriptor::dictionary::<HashMap<String, V>, V>();
        if let crate::describe::Capability::Map(ops) = &mut descriptor.capability {
            ops.entries = crate::describe::map_entries::<DynMap<V>, V>;
            ops.insert = crate::describe::map_insert::<DynMap<V>, V>;
            ops.create = Some(create_dyn_map::<V>);
        }
        let key = TypeKey::of::<DynMap<V>>();
        descriptor.key = key;
        descriptor.name = key.short_name();
        descriptor.created_as::<HashMap<String, V>>()
    }
}

/// An object whose members are not known in advance.
///
/// ```rust
/// use jsongraph::impls::DynamicObject;
/// use jsongraph::{from_str, json, to_string};
///
/// let object: DynamicObject = from_str(r#"{"a":1,"b":[true]}"#).unwrap();
/// assert_eq!(object.get("b"), Some(&json!([true])));
/// assert_eq!(to_string(&object).unwrap(), r#"{"a":1,"b":[true]}"#);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicObject {
    members: JsonMap,
}

impl DynamicObject {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        self.members.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<JsonValue>) {
        self.members.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<JsonValue> {
        self.members.remove(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl DynamicMembers for DynamicObject {
    fn dynamic_members(&self) -> Vec<(String, &JsonValue)> {
        self.members
            .iter()
            .map(|(name, value)| (name.clone(), value))
            .collect()
    }

    fn set_dynamic_member(&mut self, name: &str, value: JsonValue) -> Result<(), HostError> {
        self.members.insert(name.to_string(), value);
        Ok(())
    }
}

impl Describe for DynamicObject {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::object::<DynamicObject>()
            .default_constructor(DynamicObject::default)
            .dynamic_members()
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_conversions() {
        assert_eq!(i32::from_json(JsonValue::from(7)).unwrap(), 7);
        assert_eq!(i32::from_json(JsonValue::from("12")).unwrap(), 12);
        assert_eq!(u8::from_json(JsonValue::from(2.0)).unwrap(), 2);
        assert_eq!(
            i32::from_json(JsonValue::from("two")).unwrap_err().to_string(),
            "Could not convert string to integer: two."
        );
        assert_eq!(
            i32::from_json(JsonValue::Null).unwrap_err().to_string(),
            "Error converting value {null} to type 'i32'."
        );
        assert!(u8::from_json(JsonValue::from(300)).is_err());
        assert!(i64::from_json(JsonValue::from(1.5)).is_err());
    }

    #[test]
    fn test_wide_integers() {
        let big = u128::MAX;
        let json = big.to_json().unwrap();
        assert_eq!(u128::from_json(json).unwrap(), big);
        assert_eq!(u64::MAX.to_json().unwrap().to_string(), u64::MAX.to_string());
    }

    #[test]
    fn test_integral_floats_at_the_bounds() {
        let two_pow_64 = JsonValue::from(18_446_744_073_709_551_616.0_f64);
        assert!(u64::from_json(two_pow_64.clone()).is_err());
        assert_eq!(u128::from_json(two_pow_64).unwrap(), 1_u128 << 64);

        let two_pow_127 = JsonValue::from(170_141_183_460_469_231_731_687_303_715_884_105_728.0_f64);
        assert!(i128::from_json(two_pow_127.clone()).is_err());
        assert_eq!(u128::from_json(two_pow_127).unwrap(), 1_u128 << 127);

        let min = JsonValue::from(-170_141_183_460_469_231_731_687_303_715_884_105_728.0_f64);
        assert_eq!(i128::from_json(min).unwrap(), i128::MIN);
        assert!(u128::from_json(JsonValue::from(f64::MAX)).is_err());
    }

    #[test]
    fn test_string_accepts_scalars() {
        assert_eq!(String::from_json(JsonValue::from(5)).unwrap(), "5");
        assert_eq!(String::from_json(JsonValue::from(true)).unwrap(), "true");
        assert!(String::from_json(JsonValue::Null).is_err());
    }

    #[test]
    fn test_char_requires_single_character() {
        assert_eq!(char::from_json(JsonValue::from("x")).unwrap(), 'x');
        assert!(char::from_json(JsonValue::from("xy")).is_err());
    }

    #[test]
    fn test_datetime_round_trip() {
        let text = "2024-03-01T12:30:00Z";
        let date = DateTime::<Utc>::from_json(JsonValue::from(text)).unwrap();
        assert_eq!(date.to_json().unwrap(), JsonValue::from(text));
    }

    #[test]
    fn test_map_keys() {
        assert_eq!(u16::from_key("42").unwrap(), 42);
        assert!(u16::from_key("x").is_err());
        assert!(bool::from_key("true").unwrap());
        assert_eq!(7_i64.to_key(), "7");
    }

    #[test]
    fn test_dyn_list_delegates() {
        let mut list: DynList<i32> = Box::new(VecDeque::new());
        list.push_item(1);
        list.push_item(2);
        assert_eq!(list.items(), vec![&1, &2]);
    }

    #[test]
    fn test_dynamic_object_members() {
        let mut object = DynamicObject::new();
        object.set("a", 1);
        object.set_dynamic_member("b", JsonValue::Bool(true)).unwrap();
        let names: Vec<_> = object.dynamic_members().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(object.remove("a"), Some(JsonValue::from(1)));
        assert_eq!(object.len(), 1);
    }
}
