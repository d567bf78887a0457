use crate::common::{operations, schema};
use expect_test::expect;
use graphql_mockgen::{Build, Error, History, MockBuilders, Patch};
use indoc::indoc;
use serde_json::json;

const SEARCH: &str = indoc! {r#"
    query Search($term: String!) {
      search(term: $term) {
        ... on Dog {
          goodBoy
        }
        ... on Cat {
          lives
        }
      }
    }
"#};

const ADOPT: &str = indoc! {r#"
    mutation Adopt($petId: ID!, $owner: OwnerInput!) {
      adopt(petId: $petId, owner: $owner) {
        name
        role
      }
    }
"#};

fn builders() -> MockBuilders {
    let schema = schema();
    let operations = operations(&schema, &[
        ("search.graphql", SEARCH),
        ("adopt.graphql", ADOPT),
        ("user.graphql", "query User { me { id } }"),
    ]);

    MockBuilders::builder(schema, operations)
        .default_patch("User", json!({ "name": "Ada" }))
        .transform("Adopt", "asSitter", |_, _| {
            Patch::from(json!({ "data": { "adopt": { "role": "Sitter" } } }))
        })
        .build()
        .unwrap()
}

#[test]
fn operation_mocks_follow_the_selection() {
    let builders = builders();
    let adopt = builders.operation("Adopt").unwrap().build(vec![]).unwrap();

    expect![[r#"
        {
          "request": {
            "query": "mutation Adopt($petId: ID!, $owner: OwnerInput!) {\n  adopt(petId: $petId, owner: $owner) {\n    name\n    role\n  }\n}\n",
            "variables": {
              "petId": "AdoptVariables-id",
              "owner": {
                "name": "OwnerInput string",
                "role": null
              }
            },
            "operationName": "Adopt"
          },
          "result": {
            "data": {
              "adopt": {
                "name": "User string",
                "role": "Owner"
              }
            }
          }
        }"#]]
    .assert_eq(&serde_json::to_string_pretty(&adopt).unwrap());

    let sitter = adopt.transform("asSitter", json!(null)).unwrap();
    assert_eq!(sitter.result().data["adopt"], json!({ "name": "User string", "role": "Sitter" }));
}

#[test]
fn abstract_selections_always_carry_a_typename() {
    let builders = builders();
    let search = builders
        .operation("Search")
        .unwrap()
        .build(vec![Patch::from(json!({
            "variables": { "term": "rex" },
            "data": { "search": [{ "lives": 9 }, { "goodBoy": true }, { "__typename": "User" }] },
        }))])
        .unwrap();

    assert_eq!(search.request().variables, json!({ "term": "rex" }));
    assert_eq!(
        search.result().data["search"],
        json!([
            { "__typename": "Cat", "lives": 9 },
            { "__typename": "Dog", "goodBoy": true },
            { "__typename": "User" },
        ])
    );

    let error = builders
        .operation("Search")
        .unwrap()
        .build(vec![Patch::from(json!({ "data": { "search": [{ "name": "Rex" }] } }))])
        .unwrap_err();

    assert!(matches!(error, Error::UnknownField { ref field, .. } if field == "name"));
}

#[test]
fn clones_are_isolated_from_their_source() {
    let builders = builders();
    let users = builders.type_builder("User").unwrap();

    let ada = users.build(vec![Patch::from(json!({ "pets": [{ "__typename": "Dog" }] }))]).unwrap();
    let clone = ada.clone();
    let grace = clone
        .patch(vec![Patch::from(json!({ "name": "Grace", "pets": { "0": { "name": "Rex" } } }))])
        .unwrap();

    assert_eq!(ada.value()["name"], json!("Ada"));
    assert_eq!(ada.value()["pets"][0]["name"], json!("Dog string"));
    assert_eq!(clone.value(), ada.value());
    assert_eq!(grace.value()["name"], json!("Grace"));
    assert_eq!(grace.value()["pets"][0], json!({
        "__typename": "Dog",
        "id": "Dog-id",
        "name": "Rex",
        "goodBoy": false,
    }));
    assert_eq!(users.history().len(), 2);
}

#[test]
fn operation_history_and_errors() {
    let builders = builders();
    let search = builders.get("Search").unwrap().as_operation().unwrap();

    let failed = search
        .build(vec![
            Patch::from(json!({ "errors": [{ "message": "first" }] })),
            Patch::from(json!({ "errors": [{ "message": "boom" }], "data": { "search": { "length": 0 } } })),
        ])
        .unwrap();

    assert_eq!(failed.result().errors, Some(json!([{ "message": "boom" }])));
    assert_eq!(failed.result().error, None);
    assert_eq!(failed.result().data["search"], json!([]));
    assert_eq!(search.last().as_ref(), Some(failed.payload()));

    assert!(builders.get("UserQuery").unwrap().as_operation().is_some());
    assert!(matches!(builders.get("Nope"), Err(Error::UnknownBuilder { .. })));
}
