//! Shared instances and cycles with `$id` / `$ref`.
//!
//! Run with: cargo run --example references

use jsongraph::describe::{shared, Describe, Shared, TypeDescriptor};
use jsongraph::{
    from_str_with_settings, to_string_with_settings, PreserveReferencesHandling,
    ReferenceLoopHandling, SerializerSettings,
};
use std::error::Error;
use std::rc::Rc;

#[derive(Debug, Default)]
struct Employee {
    name: String,
    manager: Option<Shared<Employee>>,
    reports: Vec<Shared<Employee>>,
}

impl Describe for Employee {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::object::<Employee>()
            .field("Name", |e: &Employee| &e.name, |e: &mut Employee| &mut e.name)
            .field("Manager", |e: &Employee| &e.manager, |e: &mut Employee| &mut e.manager)
            .field("Reports", |e: &Employee| &e.reports, |e: &mut Employee| &mut e.reports)
            .default_constructor(Employee::default)
            .build()
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let boss = shared(Employee {
        name: "Ann".to_string(),
        ..Employee::default()
    });
    let worker = shared(Employee {
        name: "Bob".to_string(),
        manager: Some(boss.clone()),
        reports: Vec::new(),
    });
    boss.borrow_mut().reports.push(worker.clone());

    match to_string_with_settings(&boss, &SerializerSettings::new()) {
        Ok(json) => println!("unexpected: {}", json),
        Err(e) => println!("Without tracking: {}\n", e),
    }

    let ignore = SerializerSettings::new().with_reference_loop_handling(ReferenceLoopHandling::Ignore);
    println!("Loop ignored:\n{}\n", to_string_with_settings(&boss, &ignore)?);

    let objects = SerializerSettings::pretty()
        .with_preserve_references_handling(PreserveReferencesHandling::Objects);
    let json = to_string_with_settings(&boss, &objects)?;
    println!("Preserved:\n{}\n", json);

    let back: Shared<Employee> = from_str_with_settings(&json, &objects)?;
    let report = back.borrow().reports[0].clone();
    let manager = report.borrow().manager.clone();
    println!(
        "Cycle restored: {}",
        manager.is_some_and(|m| Rc::ptr_eq(&m, &back))
    );

    // Break the cycles so both graphs are freed.
    for person in [&boss, &worker, &back, &report] {
        let mut person = person.borrow_mut();
        person.manager = None;
        person.reports.clear();
    }
    Ok(())
}
