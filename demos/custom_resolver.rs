//! Naming policies, member filtering and converters.
//!
//! Run with: cargo run --example custom_resolver

use chrono::{DateTime, Utc};
use jsongraph::contract::JsonProperty;
use jsongraph::converter::FnConverter;
use jsongraph::describe::{Describe, TypeDescriptor};
use jsongraph::resolver::{to_camel_case, ContractResolver, ResolverPolicy};
use jsongraph::{from_str_with_settings, to_string_with_settings, HostError, JsonValue, SerializerSettings};
use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;

#[derive(Debug, Default)]
struct Session {
    user_name: String,
    started_at: Option<DateTime<Utc>>,
    secret_token: String,
    counters: HashMap<String, u32>,
}

impl Describe for Session {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::object::<Session>()
            .field("UserName", |s: &Session| &s.user_name, |s: &mut Session| &mut s.user_name)
            .field("StartedAt", |s: &Session| &s.started_at, |s: &mut Session| &mut s.started_at)
            .field(
                "SecretToken",
                |s: &Session| &s.secret_token,
                |s: &mut Session| &mut s.secret_token,
            )
            .field("Counters", |s: &Session| &s.counters, |s: &mut Session| &mut s.counters)
            .default_constructor(Session::default)
            .build()
    }
}

/// camelCase names, and nothing that looks like a secret leaves the process.
struct PublicApi;

impl ResolverPolicy for PublicApi {
    fn resolve_property_name(&self, name: &str) -> String {
        to_camel_case(name)
    }

    fn resolve_dictionary_key(&self, key: &str) -> String {
        to_camel_case(key)
    }

    fn filter_properties(
        &self,
        _descriptor: &TypeDescriptor,
        properties: Vec<JsonProperty>,
    ) -> Vec<JsonProperty> {
        properties
            .into_iter()
            .filter(|p| !p.underlying_name.starts_with("Secret"))
            .collect()
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let unix_seconds = FnConverter::<DateTime<Utc>>::new(
        |at| Ok(JsonValue::from(at.timestamp())),
        |json| {
            json.as_i64()
                .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
                .ok_or_else(|| HostError::from("expected unix seconds"))
        },
    );
    let settings = SerializerSettings::pretty()
        .with_contract_resolver(Arc::new(ContractResolver::with_policy(PublicApi)))
        .with_converter(Arc::new(unix_seconds));

    let mut counters = HashMap::new();
    counters.insert("PageViews".to_string(), 12);
    let session = Session {
        user_name: "ann".to_string(),
        started_at: DateTime::from_timestamp(1_700_000_000, 0),
        secret_token: "hunter2".to_string(),
        counters,
    };

    let json = to_string_with_settings(&session, &settings)?;
    println!("{}", json);

    let back: Session = from_str_with_settings(&json, &settings)?;
    println!("{:?}", back);
    Ok(())
}
