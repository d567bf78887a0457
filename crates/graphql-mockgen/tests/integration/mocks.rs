use crate::common::schema;
use graphql_mockgen::{Error, MockEngine, MockOptions, Patch, ScalarMocks, Schema};
use serde_json::{json, Value};
use std::sync::Arc;

fn mock(type_name: &str, patches: Vec<Patch>) -> Result<Value, Error> {
    MockEngine::new(schema(), ScalarMocks::builtin())
        .synthesize(type_name, patches)?
        .to_json()
}

fn patches(values: Vec<Value>) -> Vec<Patch> {
    values.into_iter().map(Patch::from).collect()
}

#[test]
fn union_list_elements_pick_their_own_type() {
    let query = mock(
        "Query",
        patches(vec![json!({ "search": [{ "__typename": "Dog" }, { "lives": 3 }] })]),
    )
    .unwrap();

    assert_eq!(
        query["search"],
        json!([
            { "__typename": "Dog", "id": "Dog-id", "name": "Dog string", "goodBoy": false },
            { "__typename": "Cat", "id": "Cat-id", "name": "Cat string", "lives": 3 },
        ])
    );
    assert_eq!(query["pet"], Value::Null);
    assert_eq!(query["me"]["role"], json!("Owner"));
}

#[test]
fn sparse_list_patches_compose() {
    let user = mock(
        "User",
        patches(vec![
            json!({ "pets": { "next": { "__typename": "Parrot" } } }),
            json!({ "pets": { "last": { "words": { "next": "hi" } } } }),
            json!({ "pets": { "next": { "name": "Felix", "lives": 7 } } }),
        ]),
    )
    .unwrap();

    assert_eq!(
        user["pets"],
        json!([
            { "__typename": "Parrot", "id": "Parrot-id", "name": "Parrot string", "words": ["hi"] },
            { "__typename": "Cat", "id": "Cat-id", "name": "Felix", "lives": 7 },
        ])
    );

    let truncated = mock(
        "User",
        patches(vec![
            json!({ "pets": [{ "__typename": "Dog" }, { "__typename": "Cat" }] }),
            json!({ "pets": { "length": 1 } }),
        ]),
    )
    .unwrap();

    assert_eq!(truncated["pets"].as_array().map(Vec::len), Some(1));
    assert_eq!(truncated["pets"][0]["__typename"], json!("Dog"));
}

#[test]
fn null_resets_the_layers_below() {
    let query = mock(
        "Query",
        patches(vec![
            json!({ "pet": { "__typename": "Dog" } }),
            json!({ "pet": null }),
            json!({ "pet": { "name": "Rex" } }),
        ]),
    )
    .unwrap();

    assert_eq!(
        query["pet"],
        json!({ "__typename": "Cat", "id": "Cat-id", "name": "Rex", "lives": 0 })
    );

    let cleared = mock(
        "User",
        patches(vec![json!({ "nickname": "Ada" }), json!({ "nickname": null })]),
    )
    .unwrap();

    assert_eq!(cleared["nickname"], Value::Null);
}

#[test]
fn derived_objects_see_the_value_below() {
    let query = mock(
        "Query",
        vec![
            Patch::from(json!({ "me": { "name": "Ada" } })),
            Patch::empty().field(
                "me",
                Patch::derive(|previous| {
                    let name = previous["name"].as_str().unwrap_or_default();
                    Patch::from(json!({ "name": format!("{name} Jr.") }))
                }),
            ),
        ],
    )
    .unwrap();

    assert_eq!(query["me"]["name"], json!("Ada Jr."));
    assert_eq!(query["me"]["id"], json!("User-id"));
}

#[test]
fn inputs_can_be_mocked() {
    let owner = mock("OwnerInput", vec![]).unwrap();

    assert_eq!(owner, json!({ "name": "OwnerInput string", "role": null }));
}

#[test]
fn custom_scalars_need_a_mock() {
    let schema = Arc::new(Schema::parse("scalar DateTime type Event { at: DateTime! }").unwrap());

    let error = MockEngine::new(schema.clone(), ScalarMocks::builtin())
        .synthesize("Event", vec![])
        .and_then(|event| event.to_json())
        .unwrap_err();
    assert_eq!(error.to_string(), "no mapping is configured for the scalar 'DateTime'");

    let scalars = ScalarMocks::builtin().generate("DateTime", |type_name| json!(format!("{type_name} at noon")));
    let event = MockEngine::new(schema, scalars)
        .synthesize("Event", vec![])
        .and_then(|event| event.to_json())
        .unwrap();
    assert_eq!(event, json!({ "__typename": "Event", "at": "Event at noon" }));
}

#[test]
fn strict_mode_requires_a_discriminating_patch() {
    let engine = MockEngine::with_options(
        schema(),
        ScalarMocks::builtin(),
        MockOptions {
            strict_discrimination: true,
        },
    );

    let error = engine
        .synthesize("Query", patches(vec![json!({ "pet": { "name": "Rex" } })]))
        .and_then(|query| query.to_json())
        .unwrap_err();

    assert!(matches!(error, Error::AmbiguousConcreteType { ref candidates, .. } if candidates.len() == 3));

    let mismatch = engine
        .synthesize("Query", patches(vec![json!({ "pet": { "goodBoy": true, "lives": 1 } })]))
        .and_then(|query| query.to_json())
        .unwrap_err();

    assert_eq!(
        mismatch.to_string(),
        "unknown field 'lives' on type 'Pet' referenced in a mock patch"
    );
}
