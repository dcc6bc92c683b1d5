use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use jsongraph::describe::{shared, Describe, Shared, TypeDescriptor};
use jsongraph::{
    from_str, from_str_with_settings, to_string, to_string_with_settings,
    PreserveReferencesHandling, SerializerSettings,
};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Default)]
struct User {
    id: u32,
    name: String,
    email: String,
    active: bool,
}

impl Describe for User {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::object::<User>()
            .field("id", |u: &User| &u.id, |u: &mut User| &mut u.id)
            .field("name", |u: &User| &u.name, |u: &mut User| &mut u.name)
            .field("email", |u: &User| &u.email, |u: &mut User| &mut u.email)
            .field("active", |u: &User| &u.active, |u: &mut User| &mut u.active)
            .default_constructor(User::default)
            .build()
    }
}

#[derive(Clone)]
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
            .constructor(
                &[
                    jsongraph::describe::param::<String>("sku"),
                    jsongraph::describe::param::<f64>("price"),
                    jsongraph::describe::param::<u32>("quantity"),
                ],
                |mut args| {
                    Ok(Product {
                        sku: args.take_or_default(0)?,
                        price: args.take_or_default(1)?,
                        quantity: args.take_or_default(2)?,
                    })
                },
            )
            .build()
    }
}

#[derive(Default)]
struct Node {
    name: String,
    next: Option<Shared<Node>>,
}

impl Describe for Node {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::object::<Node>()
            .field("Name", |n: &Node| &n.name, |n: &mut Node| &mut n.name)
            .field("Next", |n: &Node| &n.next, |n: &mut Node| &mut n.next)
            .default_constructor(Node::default)
            .build()
    }
}

fn user() -> User {
    User {
        id: 123,
        name: "Alice".to_string(),
        email: "alice@example.com".to_string(),
        active: true,
    }
}

fn products(size: u32) -> Vec<Product> {
    (0..size)
        .map(|i| Product {
            sku: format!("SKU{}", i),
            price: 9.99 + f64::from(i),
            quantity: i,
        })
        .collect()
}

fn benchmark_serialize_simple(c: &mut Criterion) {
    let user = user();
    c.bench_function("serialize_simple_struct", |b| {
        b.iter(|| to_string(black_box(&user)))
    });
}

fn benchmark_deserialize_simple(c: &mut Criterion) {
    let json = r#"{"id":123,"name":"Alice","email":"alice@example.com","active":true}"#;
    c.bench_function("deserialize_simple_struct", |b| {
        b.iter(|| from_str::<User>(black_box(json)))
    });
}

fn benchmark_serialize_array(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialize_array");
    for size in [10, 100, 500].iter() {
        let products = products(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| to_string(black_box(&products)))
        });
    }
    group.finish();
}

fn benchmark_deserialize_array(c: &mut Criterion) {
    let mut group = c.benchmark_group("deserialize_array_with_creator");
    for size in [10, 100, 500].iter() {
        let json = to_string(&products(*size)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), &json, |b, json| {
            b.iter(|| from_str::<Vec<Product>>(black_box(json)))
        });
    }
    group.finish();
}

fn benchmark_references(c: &mut Criterion) {
    let mut group = c.benchmark_group("preserve_references");
    let settings = SerializerSettings::new()
        .with_preserve_references_handling(PreserveReferencesHandling::Objects);

    // A chain of 50 nodes, each listed twice so every second entry is a $ref.
    let mut chain: Vec<Shared<Node>> = Vec::new();
    for i in 0..50 {
        let node = shared(Node {
            name: format!("n{}", i),
            next: chain.last().cloned(),
        });
        chain.push(node.clone());
        chain.push(node);
    }

    group.bench_function("serialize", |b| {
        b.iter(|| to_string_with_settings(black_box(&chain), &settings))
    });

    let json = to_string_with_settings(&chain, &settings).unwrap();
    group.bench_function("deserialize", |b| {
        b.iter(|| from_str_with_settings::<Vec<Shared<Node>>>(black_box(&json), &settings))
    });
    group.finish();
}

fn benchmark_primitive_array(c: &mut Criterion) {
    let mut group = c.benchmark_group("primitive_array");

    let numbers: Vec<i32> = (0..100).collect();
    let floats: Vec<f64> = (0..100).map(|i| i as f64 * 1.5).collect();

    group.bench_function("serialize_integers", |b| {
        b.iter(|| to_string(black_box(&numbers)))
    });
    group.bench_function("serialize_floats", |b| {
        b.iter(|| to_string(black_box(&floats)))
    });

    let numbers_json = to_string(&numbers).unwrap();
    let floats_json = to_string(&floats).unwrap();

    group.bench_function("deserialize_integers", |b| {
        b.iter(|| from_str::<Vec<i32>>(black_box(&numbers_json)))
    });
    group.bench_function("deserialize_floats", |b| {
        b.iter(|| from_str::<Vec<f64>>(black_box(&floats_json)))
    });

    group.finish();
}

fn benchmark_comparison_with_serde_json(c: &mut Criterion) {
    let user = user();
    let mut group = c.benchmark_group("comparison");

    group.bench_function("jsongraph_serialize", |b| {
        b.iter(|| jsongraph::to_string(black_box(&user)))
    });
    group.bench_function("serde_json_serialize", |b| {
        b.iter(|| serde_json::to_string(black_box(&user)))
    });

    let json = serde_json::to_string(&user).unwrap();
    group.bench_function("jsongraph_deserialize", |b| {
        b.iter(|| jsongraph::from_str::<User>(black_box(&json)))
    });
    group.bench_function("serde_json_deserialize", |b| {
        b.iter(|| serde_json::from_str::<User>(black_box(&json)))
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_serialize_simple,
    benchmark_deserialize_simple,
    benchmark_serialize_array,
    benchmark_deserialize_array,
    benchmark_references,
    benchmark_primitive_array,
    benchmark_comparison_with_serde_json
);
criterion_main!(benches);
