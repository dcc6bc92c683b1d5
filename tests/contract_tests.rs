use jsongraph::contract::{Contract, ContractKind, JsonProperty, PropertyCollection};
use jsongraph::describe::{
    param, Describe, DynList, DynMap, ListLike, MapLike, TypeDescriptor, TypeKey,
};
use jsongraph::resolver::{CamelCasePolicy, ContractResolver, ResolverPolicy};
use jsongraph::{from_str_with_settings, to_string_with_settings, SerializerSettings};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Default, PartialEq)]
struct Reading {
    sensor_name: String,
    celsius: f64,
}

impl Describe for Reading {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::object::<Reading>()
            .field(
                "SensorName",
                |r: &Reading| &r.sensor_name,
                |r: &mut Reading| &mut r.sensor_name,
            )
            .field("Celsius", |r: &Reading| &r.celsius, |r: &mut Reading| &mut r.celsius)
            .default_constructor(Reading::default)
            .build()
    }
}

#[derive(Debug, PartialEq)]
struct Gauge {
    label: String,
    limit: u32,
}

impl Describe for Gauge {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::object::<Gauge>()
            .field("Label", |g: &Gauge| &g.label, |g: &mut Gauge| &mut g.label)
            .field("Limit", |g: &Gauge| &g.limit, |g: &mut Gauge| &mut g.limit)
            .constructor(
                &[param::<String>("label"), param::<String>("limit")],
                |mut args| {
                    let label = args.take_or_default::<String>(0)?;
                    let limit = args.take_or_default::<String>(1)?;
                    Ok(Gauge {
                        label,
                        limit: limit.parse().unwrap_or(0),
                    })
                },
            )
            .build()
    }
}

#[test]
fn test_abstract_list_contract() {
    let contract = ContractResolver::new()
        .resolve_contract::<DynList<i32>>()
        .unwrap();
    assert_eq!(contract.kind(), ContractKind::Array);
    assert!(contract.is_abstract());
    assert!(contract.is_instantiable());
}

static CREATED: AtomicUsize = AtomicUsize::new(0);

#[test]
fn test_replaced_default_creator_is_used() {
    let resolver = ContractResolver::new();
    let contract = resolver.resolve_contract::<DynList<i32>>().unwrap();
    contract.set_default_creator(|| {
        CREATED.fetch_add(1, Ordering::SeqCst);
        Box::new(VecDeque::<i32>::new()) as DynList<i32>
    });

    let settings = SerializerSettings::new().with_contract_resolver(Arc::new(resolver));
    let list: DynList<i32> = from_str_with_settings("[3, 1, 2]", &settings).unwrap();
    assert_eq!(CREATED.load(Ordering::SeqCst), 1);
    let items: Vec<i32> = list.items().into_iter().copied().collect();
    assert_eq!(items, vec![3, 1, 2]);

    let json = to_string_with_settings(&list, &settings).unwrap();
    assert_eq!(json, "[3,1,2]");
}

#[test]
fn test_cleared_creator_makes_type_uninstantiable() {
    let resolver = ContractResolver::new();
    let contract = resolver.resolve_contract::<Reading>().unwrap();
    contract.clear_default_creator();
    assert!(!contract.is_instantiable());

    let settings = SerializerSettings::new().with_contract_resolver(Arc::new(resolver));
    let err = from_str_with_settings::<Reading>(r#"{"Celsius": 1.5}"#, &settings).unwrap_err();
    assert!(err.message().starts_with("Unable to find a constructor to use for type Reading."));
}

#[test]
fn test_concurrent_resolution_shares_one_contract() {
    let resolver = Arc::new(ContractResolver::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let resolver = Arc::clone(&resolver);
            thread::spawn(move || resolver.resolve_contract::<Reading>().unwrap())
        })
        .collect();
    let contracts: Vec<Arc<Contract>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for contract in &contracts[1..] {
        assert!(Arc::ptr_eq(&contracts[0], contract));
    }
    assert!(resolver.is_known_type_name("Reading"));
}

#[test]
fn test_constructor_parameters_match_members() {
    let contract = ContractResolver::new().resolve_contract::<Gauge>().unwrap();
    assert!(contract.default_creator().is_none());

    let parameters = contract.creator_parameters();
    // Matched case-insensitively, so the member's wire name wins.
    assert_eq!(parameters.get(0).unwrap().property_name, "Label");
    // "Limit" is a u32 and the parameter a String, so it stays unmatched.
    assert_eq!(parameters.get(1).unwrap().property_name, "limit");
}

#[test]
fn test_constructor_receives_matched_values() {
    let gauge: Gauge =
        from_str_with_settings(r#"{"label": "cpu", "limit": "90"}"#, &SerializerSettings::new())
            .unwrap();
    assert_eq!(
        gauge,
        Gauge {
            label: "cpu".to_string(),
            limit: 90,
        }
    );
}

#[test]
fn test_camel_case_policy() {
    let resolver = Arc::new(ContractResolver::with_policy(CamelCasePolicy));
    let settings = SerializerSettings::new().with_contract_resolver(resolver);

    let reading = Reading {
        sensor_name: "attic".to_string(),
        celsius: 19.5,
    };
    let json = to_string_with_settings(&reading, &settings).unwrap();
    assert_eq!(json, r#"{"sensorName":"attic","celsius":19.5}"#);
    assert_eq!(from_str_with_settings::<Reading>(&json, &settings).unwrap(), reading);

    let mut map = BTreeMap::new();
    map.insert("HomeOffice".to_string(), 1_u8);
    let json = to_string_with_settings(&map, &settings).unwrap();
    assert_eq!(json, r#"{"homeOffice":1}"#);
}

struct DequeLists;

impl ResolverPolicy for DequeLists {
    fn customize_contract(&self, contract: &Contract) {
        if contract.underlying_type() == TypeKey::of::<DynList<String>>() {
            contract.set_default_creator(|| Box::new(VecDeque::<String>::new()) as DynList<String>);
        }
    }
}

#[test]
fn test_policy_customizes_contracts_once() {
    let resolver = ContractResolver::with_policy(DequeLists);
    let first = resolver.resolve_contract::<DynList<String>>().unwrap();
    let second = resolver.resolve_contract::<DynList<String>>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let settings = SerializerSettings::new().with_contract_resolver(Arc::new(resolver));
    let list: DynList<String> = from_str_with_settings(r#"["a", "b"]"#, &settings).unwrap();
    assert_eq!(list.items(), vec!["a", "b"]);
}

#[derive(Debug, Default)]
struct Tagged {
    code: String,
    shouted: String,
}

impl Describe for Tagged {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::object::<Tagged>()
            .field("Code", |t: &Tagged| &t.code, |t: &mut Tagged| &mut t.code)
            .field("CODE", |t: &Tagged| &t.shouted, |t: &mut Tagged| &mut t.shouted)
            // Parameters are declared in reverse member order.
            .constructor(
                &[param::<String>("CODE"), param::<String>("code")],
                |mut args| {
                    Ok(Tagged {
                        shouted: args.take_or_default(0)?,
                        code: args.take_or_default(1)?,
                    })
                },
            )
            .build()
    }
}

#[test]
fn test_parameter_name_collisions_ignore_position() {
    let contract = ContractResolver::new().resolve_contract::<Tagged>().unwrap();
    let parameters = contract.creator_parameters();
    // Exact match wins over the earlier case-insensitive candidate.
    assert_eq!(parameters.get(0).unwrap().property_name, "CODE");
    // No exact match: the first declared case-insensitive candidate.
    assert_eq!(parameters.get(1).unwrap().property_name, "Code");

    let tagged: Tagged =
        from_str_with_settings(r#"{"Code": "a", "CODE": "B"}"#, &SerializerSettings::new())
            .unwrap();
    assert_eq!(tagged.code, "a");
    assert_eq!(tagged.shouted, "B");
}

#[test]
fn test_abstract_map_contract() {
    let contract = ContractResolver::new()
        .resolve_contract::<DynMap<u32>>()
        .unwrap();
    assert_eq!(contract.kind(), ContractKind::Dictionary);
    assert!(contract.is_abstract());
    assert!(contract.is_instantiable());

    let map: DynMap<u32> =
        from_str_with_settings(r#"{"b": 2, "a": 1}"#, &SerializerSettings::new()).unwrap();
    let mut entries: Vec<(String, u32)> = map
        .entries()
        .into_iter()
        .map(|(key, value)| (key, *value))
        .collect();
    entries.sort();
    assert_eq!(entries, vec![("a".to_string(), 1), ("b".to_string(), 2)]);

    let single: DynMap<u32> =
        from_str_with_settings(r#"{"only": 7}"#, &SerializerSettings::new()).unwrap();
    let json = to_string_with_settings(&single, &SerializerSettings::new()).unwrap();
    assert_eq!(json, r#"{"only":7}"#);
}

#[derive(Debug, Default)]
struct Ranked {
    low: i32,
    high: i32,
    plain: i32,
}

impl Describe for Ranked {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::object::<Ranked>()
            .field_with(
                "High",
                |r: &Ranked| &r.high,
                |r: &mut Ranked| &mut r.high,
                |m| m.order(2),
            )
            .field("Plain", |r: &Ranked| &r.plain, |r: &mut Ranked| &mut r.plain)
            .field_with(
                "Low",
                |r: &Ranked| &r.low,
                |r: &mut Ranked| &mut r.low,
                |m| m.order(1),
            )
            .default_constructor(Ranked::default)
            .build()
    }
}

static FILTERED: Mutex<Vec<String>> = Mutex::new(Vec::new());

/// Drops `Plain` and records the order the hook saw.
struct DropPlain;

impl ResolverPolicy for DropPlain {
    fn filter_properties(
        &self,
        _descriptor: &TypeDescriptor,
        properties: Vec<JsonProperty>,
    ) -> Vec<JsonProperty> {
        FILTERED
            .lock()
            .unwrap()
            .extend(properties.iter().map(|p| p.property_name.clone()));
        properties
            .into_iter()
            .filter(|p| p.underlying_name != "Plain")
            .collect()
    }
}

#[test]
fn test_filter_properties_sees_ordered_members() {
    let resolver = ContractResolver::with_policy(DropPlain);
    let contract = resolver.resolve_contract::<Ranked>().unwrap();

    assert_eq!(*FILTERED.lock().unwrap(), vec!["Plain", "Low", "High"]);
    let properties = contract.properties();
    let names: Vec<&str> = properties
        .iter()
        .map(|p| p.property_name.as_str())
        .collect();
    assert_eq!(names, vec!["Low", "High"]);

    let settings = SerializerSettings::new().with_contract_resolver(Arc::new(resolver));
    let ranked = Ranked {
        low: 1,
        high: 2,
        plain: 3,
    };
    let json = to_string_with_settings(&ranked, &settings).unwrap();
    assert_eq!(json, r#"{"Low":1,"High":2}"#);

    let back: Ranked = from_str_with_settings(r#"{"Plain": 9, "High": 5}"#, &settings).unwrap();
    assert_eq!(back.high, 5);
    assert_eq!(back.plain, 0);
}

/// Renames every member to a name that needs escaping.
struct Quoted;

impl ResolverPolicy for Quoted {
    fn filter_properties(
        &self,
        _descriptor: &TypeDescriptor,
        properties: Vec<JsonProperty>,
    ) -> Vec<JsonProperty> {
        properties
            .into_iter()
            .map(|mut p| {
                p.property_name = format!("my \"{}\"", p.underlying_name);
                p
            })
            .collect()
    }
}

#[test]
fn test_renamed_properties_are_escaped() {
    let settings = SerializerSettings::new()
        .with_contract_resolver(Arc::new(ContractResolver::with_policy(Quoted)));
    let reading = Reading {
        sensor_name: "attic".to_string(),
        celsius: 1.0,
    };
    let json = to_string_with_settings(&reading, &settings).unwrap();
    assert_eq!(json, r#"{"my \"SensorName\"":"attic","my \"Celsius\"":1.0}"#);

    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["my \"SensorName\""], "attic");
    assert_eq!(from_str_with_settings::<Reading>(&json, &settings).unwrap(), reading);
}

#[test]
fn test_installed_properties_are_escaped() {
    let resolver = ContractResolver::new();
    let contract = resolver.resolve_contract::<Reading>().unwrap();
    let mut replaced = PropertyCollection::new("Reading");
    for property in contract.properties().iter() {
        let mut property = JsonProperty::clone(property);
        property.property_name = format!("{}\n", property.property_name);
        replaced.add(property).unwrap();
    }
    contract.set_properties(replaced);

    let settings = SerializerSettings::new().with_contract_resolver(Arc::new(resolver));
    let json = to_string_with_settings(&Reading::default(), &settings).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["SensorName\n"], "");
}
