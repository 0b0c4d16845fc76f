//! Contract: lookups resolve by exact name and never mutate
//!
//! Verifies that:
//! - A singular lookup returns the stringified id and translated attributes
//! - Zero matches is NotFound naming the filter value
//! - Plural lookups keep the order the service lists entities in
//! - Lookups only ever list

mod common;

use common::*;
use pingdom_core::traits::Endpoint;
use pingdom_core::{Attributes, Error, ReconcileEvent};
use serde_json::json;
use std::sync::Arc;

fn by_name(name: &str) -> Attributes {
    Attributes::new().with("name", name)
}

#[tokio::test]
async fn team_lookup_resolves_by_exact_name() {
    let primary = Arc::new(MockApiClient::new("primary"));
    primary.seed(Endpoint::Teams, json!({ "id": 41, "name": "SRE team", "members": [] }));
    primary.seed(
        Endpoint::Teams,
        json!({ "id": 42, "name": "SRE", "members": [{ "id": 9 }, { "id": 7 }] }),
    );
    let (engine, mut rx) = mock_engine(&primary, None);

    let result = engine.lookup("team", &by_name("SRE")).await.unwrap();

    assert_eq!(result.id, "42");
    assert_eq!(
        result.attributes,
        Attributes::new().with("name", "SRE").with("member_ids", json!([7, 9]))
    );
    assert_eq!(
        drain(&mut rx),
        vec![ReconcileEvent::LookupResolved {
            kind: "team".to_string(),
            id: "42".to_string(),
        }]
    );
}

#[tokio::test]
async fn zero_matches_names_the_filter() {
    let primary = Arc::new(MockApiClient::new("primary"));
    primary.seed(Endpoint::Contacts, json!({ "id": 1, "name": "Alice" }));
    let (engine, mut rx) = mock_engine(&primary, None);

    let err = engine.lookup("contact", &by_name("Ghost")).await.unwrap_err();

    assert!(matches!(err, Error::NotFound { .. }));
    assert!(err.to_string().contains("Ghost"));
    assert!(matches!(
        drain(&mut rx).as_slice(),
        [ReconcileEvent::LookupFailed { .. }]
    ));
}

#[tokio::test]
async fn first_of_several_matches_wins() {
    let primary = Arc::new(MockApiClient::new("primary"));
    primary.seed(Endpoint::Teams, json!({ "id": 5, "name": "Ops" }));
    primary.seed(Endpoint::Teams, json!({ "id": 6, "name": "Ops" }));
    let (engine, _rx) = mock_engine(&primary, None);

    let result = engine.lookup("team", &by_name("Ops")).await.unwrap();

    assert_eq!(result.id, "5");
}

#[tokio::test]
async fn lookup_requires_a_name() {
    let primary = Arc::new(MockApiClient::new("primary"));
    let (engine, _rx) = mock_engine(&primary, None);

    let err = engine.lookup("team", &Attributes::new()).await.unwrap_err();

    assert!(matches!(err, Error::Validation { .. }));
    assert_eq!(primary.total_calls(), 0);
}

#[tokio::test]
async fn plural_lookup_keeps_remote_order() {
    let primary = Arc::new(MockApiClient::new("primary"));
    primary.seed(Endpoint::Teams, json!({ "id": 30, "name": "Zulu" }));
    primary.seed(Endpoint::Teams, json!({ "id": 10, "name": "Alpha" }));
    primary.seed(Endpoint::Teams, json!({ "id": 20, "name": "Mike" }));
    let (engine, _rx) = mock_engine(&primary, None);

    let result = engine.lookup("teams", &Attributes::new()).await.unwrap();

    assert_eq!(result.id, "teams");
    assert_eq!(result.attributes.get("ids"), Some(&json!([30, 10, 20])));
    assert_eq!(
        result.attributes.get("names"),
        Some(&json!(["Zulu", "Alpha", "Mike"]))
    );
}

#[tokio::test]
async fn integration_lookups_use_the_secondary_client() {
    let primary = Arc::new(MockApiClient::new("primary"));
    let secondary = Arc::new(MockApiClient::new("secondary"));
    secondary.seed(
        Endpoint::Integrations,
        json!({
            "id": 77,
            "provider_name": "Webhook",
            "active": true,
            "user_data": { "name": "alerts", "url": "https://hooks.example.com" }
        }),
    );
    let (engine, _rx) = mock_engine(&primary, Some(&secondary));

    let single = engine.lookup("integration", &by_name("alerts")).await.unwrap();
    let listing = engine.lookup("integrations", &Attributes::new()).await.unwrap();

    assert_eq!(single.id, "77");
    assert_eq!(single.attributes.get_str("provider_name"), Some("webhook"));
    assert_eq!(listing.attributes.get("names"), Some(&json!(["alerts"])));
    assert_eq!(primary.total_calls(), 0);
}

#[tokio::test]
async fn integration_lookup_without_secondary_is_a_configuration_error() {
    let primary = Arc::new(MockApiClient::new("primary"));
    let (engine, _rx) = mock_engine(&primary, None);

    let err = engine.lookup("integrations", &Attributes::new()).await.unwrap_err();

    assert!(matches!(err, Error::Configuration(_)));
}

#[tokio::test]
async fn lookups_never_mutate() {
    let primary = Arc::new(MockApiClient::new("primary"));
    primary.seed(Endpoint::Contacts, json!({ "id": 3, "name": "Bob", "paused": false }));
    let (engine, _rx) = mock_engine(&primary, None);

    engine.lookup("contact", &by_name("Bob")).await.unwrap();
    engine.lookup("contacts", &Attributes::new()).await.unwrap();

    assert_eq!(primary.calls(Op::List), 2);
    assert_eq!(primary.total_calls(), 2);
}
