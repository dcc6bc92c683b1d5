use jsongraph::describe::{param, Describe, Polymorphic, TypeDescriptor};
use jsongraph::HostError;
use jsongraph::impls::DynamicObject;
use jsongraph::{
    from_str, from_str_with_settings, json, populate, to_string, to_string_pretty,
    to_string_with_settings, DefaultValueHandling, JsonValue, NullValueHandling,
    SerializerSettings, TypeNameHandling,
};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Default, PartialEq, Clone)]
struct User {
    id: u32,
    name: String,
    active: bool,
    tags: Vec<String>,
}

impl Describe for User {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::object::<User>()
            .field("Id", |u: &User| &u.id, |u: &mut User| &mut u.id)
            .field("Name", |u: &User| &u.name, |u: &mut User| &mut u.name)
            .field("Active", |u: &User| &u.active, |u: &mut User| &mut u.active)
            .field("Tags", |u: &User| &u.tags, |u: &mut User| &mut u.tags)
            .default_constructor(User::default)
            .build()
    }
}

#[derive(Debug, Default, PartialEq, Clone)]
struct Product {
    sku: String,
    price: f64,
    quantity: u32,
}

impl Describe for Product {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::object::<Product>()
            .field("Sku", |p: &Product| &p.sku, |p: &mut Product| &mut p.sku)
            .field("Price", |p: &Product| &p.price, |p: &mut Product| &mut p.price)
            .field("Quantity", |p: &Product| &p.quantity, |p: &mut Product| &mut p.quantity)
            .default_constructor(Product::default)
            .build()
    }
}

#[derive(Debug, Default, PartialEq)]
struct Order {
    order_id: u32,
    customer: User,
    items: Vec<Product>,
    notes: Option<String>,
}

impl Describe for Order {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::object::<Order>()
            .field("OrderId", |o: &Order| &o.order_id, |o: &mut Order| &mut o.order_id)
            .field("Customer", |o: &Order| &o.customer, |o: &mut Order| &mut o.customer)
            .field("Items", |o: &Order| &o.items, |o: &mut Order| &mut o.items)
            .field("Notes", |o: &Order| &o.notes, |o: &mut Order| &mut o.notes)
            .default_constructor(Order::default)
            .build()
    }
}

fn sample_order() -> Order {
    Order {
        order_id: 12345,
        customer: User {
            id: 123,
            name: "Alice".to_string(),
            active: true,
            tags: vec!["vip".to_string()],
        },
        items: vec![
            Product {
                sku: "WIDGET-001".to_string(),
                price: 29.99,
                quantity: 2,
            },
            Product {
                sku: "GADGET-002".to_string(),
                price: 49.5,
                quantity: 1,
            },
        ],
        notes: None,
    }
}

#[test]
fn test_simple_struct() {
    let user = User {
        id: 123,
        name: "Alice".to_string(),
        active: true,
        tags: vec!["admin".to_string(), "developer".to_string()],
    };

    let json = to_string(&user).unwrap();
    assert_eq!(
        json,
        r#"{"Id":123,"Name":"Alice","Active":true,"Tags":["admin","developer"]}"#
    );

    let user_back: User = from_str(&json).unwrap();
    assert_eq!(user, user_back);
}

#[test]
fn test_nested_struct() {
    let order = sample_order();
    let json = to_string(&order).unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["Customer"]["Name"], "Alice");
    assert_eq!(parsed["Items"][1]["Quantity"], 1);
    assert!(parsed["Notes"].is_null());

    let order_back: Order = from_str(&json).unwrap();
    assert_eq!(order, order_back);
}

#[test]
fn test_pretty_output_is_valid_json() {
    let json = to_string_pretty(&sample_order()).unwrap();
    assert!(json.starts_with("{\n  \"OrderId\": 12345,"));
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["Items"].as_array().map(Vec::len), Some(2));
}

#[test]
fn test_unicode_and_escapes() {
    let user = User {
        name: "Zoë \"the\" 🦀\n".to_string(),
        ..User::default()
    };
    let json = to_string(&user).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["Name"], "Zoë \"the\" 🦀\n");
    let back: User = from_str(&json).unwrap();
    assert_eq!(back.name, user.name);
}

#[test]
fn test_whitespace_and_member_order_are_irrelevant() {
    let json = r#"
        {
            "Tags": [ "x" ],
            "Name": "Bob",
            "Id": 9
        }
    "#;
    let user: User = from_str(json).unwrap();
    assert_eq!(user.id, 9);
    assert_eq!(user.tags, vec!["x".to_string()]);
    assert!(!user.active);
}

#[test]
fn test_dictionaries() {
    let mut stock = BTreeMap::new();
    stock.insert("apples".to_string(), 3_u32);
    stock.insert("pears".to_string(), 0);
    let json = to_string(&stock).unwrap();
    assert_eq!(json, r#"{"apples":3,"pears":0}"#);
    let back: BTreeMap<String, u32> = from_str(&json).unwrap();
    assert_eq!(back, stock);

    let by_id: BTreeMap<u32, String> = from_str(r#"{"2":"b","1":"a"}"#).unwrap();
    assert_eq!(by_id.get(&1).map(String::as_str), Some("a"));
}

#[test]
fn test_populate_keeps_unmentioned_members() {
    let mut user = User {
        id: 5,
        name: "Old".to_string(),
        active: true,
        tags: vec!["a".to_string()],
    };
    populate(r#"{"Name":"James","Tags":["b"]}"#, &mut user).unwrap();
    assert_eq!(user.name, "James");
    assert_eq!(user.id, 5);
    assert!(user.active);
    assert_eq!(user.tags, vec!["b".to_string()]);
}

#[test]
fn test_null_value_handling_ignore() {
    let settings = SerializerSettings::new().with_null_value_handling(NullValueHandling::Ignore);
    let json = to_string_with_settings(&sample_order(), &settings).unwrap();
    assert!(!json.contains("Notes"));

    let mut order: Order = from_str_with_settings(r#"{"Notes":null}"#, &settings).unwrap();
    assert_eq!(order.notes, None);
    order.notes = Some("keep".to_string());
    jsongraph::populate_with_settings(r#"{"Notes":null}"#, &mut order, &settings).unwrap();
    assert_eq!(order.notes.as_deref(), Some("keep"));
}

#[derive(Debug, Default, PartialEq)]
struct Window {
    title: String,
    width: u32,
}

impl Describe for Window {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::object::<Window>()
            .field("Title", |w: &Window| &w.title, |w: &mut Window| &mut w.title)
            .field_with(
                "Width",
                |w: &Window| &w.width,
                |w: &mut Window| &mut w.width,
                |m| m.default_value(json!(640)),
            )
            .default_constructor(Window::default)
            .build()
    }
}

#[test]
fn test_default_value_handling() {
    let ignore = SerializerSettings::new().with_default_value_handling(DefaultValueHandling::Ignore);
    let window = Window {
        title: "main".to_string(),
        width: 640,
    };
    assert_eq!(to_string_with_settings(&window, &ignore).unwrap(), r#"{"Title":"main"}"#);

    let populate_defaults =
        SerializerSettings::new().with_default_value_handling(DefaultValueHandling::Populate);
    let window: Window = from_str_with_settings(r#"{"Title":"main"}"#, &populate_defaults).unwrap();
    assert_eq!(window.width, 640);

    let window: Window = from_str(r#"{"Title":"main"}"#).unwrap();
    assert_eq!(window.width, 0);
}

#[derive(Debug, PartialEq)]
struct Rgb {
    r: u8,
    g: u8,
    b: u8,
}

impl Describe for Rgb {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::object::<Rgb>()
            .field("R", |c: &Rgb| &c.r, |c: &mut Rgb| &mut c.r)
            .field("G", |c: &Rgb| &c.g, |c: &mut Rgb| &mut c.g)
            .field("B", |c: &Rgb| &c.b, |c: &mut Rgb| &mut c.b)
            .constructor(
                &[param::<u8>("r"), param::<u8>("g"), param::<u8>("b")],
                |mut args| {
                    Ok(Rgb {
                        r: args.take(0)?,
                        g: args.take(1)?,
                        b: args.take(2)?,
                    })
                },
            )
            .build()
    }
}

#[test]
fn test_constructor_round_trip() {
    let colors = vec![Rgb { r: 1, g: 2, b: 3 }, Rgb { r: 255, g: 0, b: 128 }];
    let json = to_string(&colors).unwrap();
    assert_eq!(json, r#"[{"R":1,"G":2,"B":3},{"R":255,"G":0,"B":128}]"#);
    let back: Vec<Rgb> = from_str(&json).unwrap();
    assert_eq!(back, colors);
}

#[test]
fn test_out_of_range_number() {
    let err = from_str::<Vec<Rgb>>(r#"[{"R":256,"G":0,"B":0}]"#).unwrap_err();
    assert_eq!(err.path(), "[0].R");
}

trait Animal: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[derive(Debug, Default, PartialEq)]
struct Dog {
    name: String,
    good: bool,
}

#[derive(Debug, Default, PartialEq)]
struct Cat {
    name: String,
    lives: u8,
}

impl Animal for Dog {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Animal for Cat {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Describe for Dog {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::object::<Dog>()
            .field("Name", |d: &Dog| &d.name, |d: &mut Dog| &mut d.name)
            .field("Good", |d: &Dog| &d.good, |d: &mut Dog| &mut d.good)
            .default_constructor(Dog::default)
            .build()
    }
}

impl Describe for Cat {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::object::<Cat>()
            .field("Name", |c: &Cat| &c.name, |c: &mut Cat| &mut c.name)
            .field("Lives", |c: &Cat| &c.lives, |c: &mut Cat| &mut c.lives)
            .default_constructor(Cat::default)
            .build()
    }
}

struct Pet(Box<dyn Animal>);

impl fmt::Debug for Pet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Pet")
    }
}

impl Polymorphic for Pet {
    fn concrete(&self) -> &dyn Any {
        self.0.as_any()
    }

    fn concrete_mut(&mut self) -> &mut dyn Any {
        self.0.as_any_mut()
    }
}

impl Describe for Pet {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::polymorphic::<Pet>()
            .implementor(|dog: Dog| Pet(Box::new(dog)))
            .implementor(|cat: Cat| Pet(Box::new(cat)))
            .build()
    }
}

#[test]
fn test_polymorphic_dispatch_on_type_name() {
    let settings = SerializerSettings::new().with_type_name_handling(TypeNameHandling::Auto);
    let pets = vec![
        Pet(Box::new(Dog {
            name: "Rex".to_string(),
            good: true,
        })),
        Pet(Box::new(Cat {
            name: "Tom".to_string(),
            lives: 9,
        })),
    ];
    let json = to_string_with_settings(&pets, &settings).unwrap();
    assert_eq!(
        json,
        r#"[{"$type":"Dog","Name":"Rex","Good":true},{"$type":"Cat","Name":"Tom","Lives":9}]"#
    );

    let back: Vec<Pet> = from_str_with_settings(&json, &settings).unwrap();
    let cat = back[1].concrete().downcast_ref::<Cat>().unwrap();
    assert_eq!(cat.lives, 9);
    assert!(back[0].concrete().downcast_ref::<Dog>().is_some());
}

#[test]
fn test_polymorphic_without_type_name_fails() {
    let err = from_str::<Vec<Pet>>(r#"[{"Name":"Rex"}]"#).unwrap_err();
    assert!(err
        .message()
        .starts_with("Could not create an instance of type Pet."));
}

#[test]
fn test_unknown_type_name() {
    let err = from_str::<Vec<Pet>>(r#"[{"$type":"Parrot","Name":"Polly"}]"#).unwrap_err();
    assert_eq!(err.message(), "Type specified in JSON 'Parrot' was not resolved.");
}

#[test]
fn test_dynamic_object_keeps_unknown_members() {
    let object: DynamicObject = from_str(r#"{"a":1,"nested":{"b":[true,null]}}"#).unwrap();
    assert_eq!(object.len(), 2);
    assert_eq!(object.get("nested"), Some(&json!({ "b": [true, null] })));
    assert_eq!(
        to_string(&object).unwrap(),
        r#"{"a":1,"nested":{"b":[true,null]}}"#
    );
}

#[test]
fn test_json_value_members() {
    let values: Vec<JsonValue> = from_str(r#"[1, "x", {"k": [2.5]}]"#).unwrap();
    assert_eq!(values[2], json!({ "k": [2.5] }));
    assert_eq!(to_string(&values).unwrap(), r#"[1,"x",{"k":[2.5]}]"#);
}

#[test]
fn test_syntax_error_location() {
    let err = from_str::<User>("{\n  \"Id\": 1,\n  \"Name\": }").unwrap_err();
    assert_eq!(err.location().and_then(|l| l.line), Some(3));
    assert_eq!(err.path(), "Name");
}

#[derive(Debug, Default, PartialEq)]
struct Account {
    owner: String,
    balance: i64,
    locked: bool,
    pin: String,
}

fn has_balance(account: &Account) -> Result<bool, HostError> {
    Ok(account.balance != 0)
}

fn is_unlocked(account: &Account) -> Result<bool, HostError> {
    Ok(!account.locked)
}

impl Describe for Account {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::object::<Account>()
            .field("Owner", |a: &Account| &a.owner, |a: &mut Account| &mut a.owner)
            .field_with(
                "Balance",
                |a: &Account| &a.balance,
                |a: &mut Account| &mut a.balance,
                |m| m.should_serialize(has_balance),
            )
            .field("Locked", |a: &Account| &a.locked, |a: &mut Account| &mut a.locked)
            .field_with(
                "Pin",
                |a: &Account| &a.pin,
                |a: &mut Account| &mut a.pin,
                |m| m.should_deserialize(is_unlocked),
            )
            .default_constructor(Account::default)
            .build()
    }
}

#[test]
fn test_should_serialize_is_asked_per_instance() {
    let accounts = vec![
        Account {
            owner: "ann".to_string(),
            ..Account::default()
        },
        Account {
            owner: "bo".to_string(),
            balance: 40,
            ..Account::default()
        },
    ];
    let json = to_string(&accounts).unwrap();
    assert_eq!(
        json,
        r#"[{"Owner":"ann","Locked":false,"Pin":""},{"Owner":"bo","Balance":40,"Locked":false,"Pin":""}]"#
    );
}

#[test]
fn test_should_deserialize_sees_members_read_so_far() {
    let account: Account = from_str(r#"{"Locked": true, "Pin": "1234"}"#).unwrap();
    assert!(account.locked);
    assert_eq!(account.pin, "");

    let account: Account = from_str(r#"{"Pin": "1234", "Locked": true}"#).unwrap();
    assert_eq!(account.pin, "1234");

    let mut existing = Account {
        locked: true,
        pin: "0000".to_string(),
        ..Account::default()
    };
    populate(r#"{"Pin": "9999", "Owner": "cy"}"#, &mut existing).unwrap();
    assert_eq!(existing.pin, "0000");
    assert_eq!(existing.owner, "cy");
}

#[derive(Debug, PartialEq)]
struct Badge {
    holder: String,
    secret: String,
}

impl Describe for Badge {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::object::<Badge>()
            .field("Holder", |b: &Badge| &b.holder, |b: &mut Badge| &mut b.holder)
            .field_with(
                "Secret",
                |b: &Badge| &b.secret,
                |b: &mut Badge| &mut b.secret,
                |m| m.should_deserialize(|b: &Badge| Ok(b.holder != "guest")),
            )
            .constructor(&[param::<String>("holder")], |mut args| {
                Ok(Badge {
                    holder: args.take_or_default(0)?,
                    secret: String::new(),
                })
            })
            .build()
    }
}

#[test]
fn test_should_deserialize_applies_to_constructed_objects() {
    let guest: Badge = from_str(r#"{"Secret": "s3", "Holder": "guest"}"#).unwrap();
    assert_eq!(guest.secret, "");

    let admin: Badge = from_str(r#"{"Secret": "s3", "Holder": "admin"}"#).unwrap();
    assert_eq!(
        admin,
        Badge {
            holder: "admin".to_string(),
            secret: "s3".to_string(),
        }
    );
}
