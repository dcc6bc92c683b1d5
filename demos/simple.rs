//! Describing a type and round-tripping it through JSON.
//!
//! Run with: cargo run --example simple

use jsongraph::describe::{Describe, TypeDescriptor};
use jsongraph::{from_str, to_string, to_string_pretty};
use std::error::Error;

#[derive(Debug, Default, PartialEq)]
struct User {
    id: u32,
    name: String,
    email: Option<String>,
}

impl Describe for User {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::object::<User>()
            .field("Id", |u: &User| &u.id, |u: &mut User| &mut u.id)
            .field("Name", |u: &User| &u.name, |u: &mut User| &mut u.name)
            .field("Email", |u: &User| &u.email, |u: &mut User| &mut u.email)
            .default_constructor(User::default)
            .build()
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let users = vec![
        User {
            id: 42,
            name: "Alice Johnson".to_string(),
            email: Some("alice@example.com".to_string()),
        },
        User {
            id: 43,
            name: "Bob Smith".to_string(),
            email: None,
        },
    ];

    let json = to_string(&users)?;
    println!("Compact:\n{}\n", json);
    println!("Indented:\n{}\n", to_string_pretty(&users)?);

    let users_back: Vec<User> = from_str(&json)?;
    assert_eq!(users, users_back);

    // Member names match case-insensitively when no exact match exists.
    let lenient: User = from_str(r#"{"id": 7, "NAME": "Carol"}"#)?;
    println!("Lenient read: {:?}", lenient);

    Ok(())
}
