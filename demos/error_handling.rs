//! Recovering from bad input with an error handler.
//!
//! Run with: cargo run --example error_handling

use jsongraph::describe::{Describe, TypeDescriptor};
use jsongraph::{
    from_str, from_str_with_settings, ErrorDecision, MissingMemberHandling, Required,
    SerializerSettings,
};
use std::error::Error;

#[derive(Debug, Default)]
struct Profile {
    name: String,
    age: u32,
    tags: Vec<String>,
}

impl Describe for Profile {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::object::<Profile>()
            .field_with(
                "Name",
                |p: &Profile| &p.name,
                |p: &mut Profile| &mut p.name,
                |m| m.required(Required::Always),
            )
            .field("Age", |p: &Profile| &p.age, |p: &mut Profile| &mut p.age)
            .field("Tags", |p: &Profile| &p.tags, |p: &mut Profile| &mut p.tags)
            .default_constructor(Profile::default)
            .build()
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let input = r#"[
        {"Name": "ann", "Age": "thirty", "Tags": ["a", 1]},
        {"Age": 4},
        {"Name": "cy", "Nickname": "c"}
    ]"#;

    if let Err(e) = from_str::<Vec<Profile>>(input) {
        println!("Strict read failed: {}", e);
        if let Some(location) = e.location() {
            println!(
                "  path '{}', line {:?}, position {:?}\n",
                location.path, location.line, location.position
            );
        }
    }

    let settings = SerializerSettings::new()
        .with_missing_member_handling(MissingMemberHandling::Error)
        .with_error_handler(|_, context| {
            println!("handled at '{}': {}", context.path(), context.error().message());
            ErrorDecision::Handled
        });
    let profiles: Vec<Profile> = from_str_with_settings(input, &settings)?;
    println!("\nRecovered {} profiles:", profiles.len());
    for profile in &profiles {
        println!("  {:?}", profile);
    }

    Ok(())
}
