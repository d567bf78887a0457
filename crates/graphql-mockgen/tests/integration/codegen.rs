use crate::common::{operations, schema};
use expect_test::expect;
use graphql_mockgen::{
    Codegen, DocumentCache, Error, FileSystemLoader, MemoryLoader, OperationIndex, OperationKind, Options, Schema,
};
use indoc::indoc;

fn generate(schema: &Schema, index: &OperationIndex) -> String {
    Codegen::new(schema, index, &Options::default()).generate().unwrap()
}

#[test]
fn inputs_enums_and_scalars_are_emitted_in_order() {
    let schema = Schema::parse(indoc! {r#"
        enum Status { Ignore }
        input Foo { bar: Boolean }
        input MyInput { foo: Foo status: Status! }
        type Query { myQuery(myInput: MyInput): Boolean }
    "#})
    .unwrap();

    let index = OperationIndex::from_sources(&schema, [(
        "my-query.graphql",
        "query MyQuery($input: MyInput) { myQuery(myInput: $input) }",
    )])
    .unwrap();

    expect![[r#"
        export type Boolean = boolean;

        export type Status = "Ignore";

        export type Foo = {
          bar?: Boolean | null;
        };

        export type MyInput = {
          foo?: Foo | null;
          status: Status;
        };

        export type Inputs = {
          Foo: Foo;
          MyInput: MyInput;
        };

        export const inputs = ["Foo", "MyInput"] as const;

        export type MyQuery = {
          myQuery: Boolean | null;
        };

        export type MyQueryVariables = {
          input?: MyInput | null;
        };

        export type Query = {
          MyQuery: {
            data: MyQuery;
            variables: MyQueryVariables;
          };
        };

        export const queries = {
          MyQuery: "my-query.graphql",
        } as const;
    "#]]
    .assert_eq(&generate(&schema, &index));
}

#[test]
fn colliding_operation_names_get_their_kind_as_suffix() {
    let schema = schema();
    let index = operations(&schema, &[
        ("user.graphql", "query User { me { id } }"),
        ("adopt-query.graphql", "query Adopt { me { name } }"),
        (
            "adopt-mutation.graphql",
            "mutation Adopt($petId: ID!, $owner: OwnerInput!) { adopt(petId: $petId, owner: $owner) { id } }",
        ),
    ]);

    let names: Vec<&str> = index.operations().map(|operation| operation.export_name.as_str()).collect();
    assert_eq!(names, ["UserQuery", "AdoptQuery", "AdoptMutation"]);

    let generated = generate(&schema, &index);

    assert!(generated.contains("export type UserQuery = {\n  me: {\n    id: ID;\n  };\n};"));
    assert!(generated.contains("export type AdoptMutationVariables = {\n  petId: ID;\n  owner: OwnerInput;\n};"));
    assert!(generated.contains("export const mutations = {\n  AdoptMutation: \"adopt-mutation.graphql\",\n} as const;"));
    assert!(generated.contains("export type User = {\n  __typename: \"User\";\n  id: ID;\n  name: String;\n};"));
}

#[test]
fn imported_fragments_discriminate_interface_members() {
    let schema = schema();
    let index = operations(&schema, &[
        ("fragments/pet.graphql", "fragment PetFields on Pet { id ... on Dog { goodBoy } }"),
        (
            "queries/pet.graphql",
            indoc! {r#"
                #import "../fragments/pet.graphql"

                query PetById($id: ID!) {
                  pet(id: $id) {
                    ...PetFields
                    name
                  }
                }
            "#},
        ),
    ]);

    let generated = generate(&schema, &index);

    let expected = indoc! {r#"
        export type PetById = {
          pet: {
            id: ID;
            name: String;
          } & ({
            __typename: "Dog";
            goodBoy: Boolean;
          } | {
            __typename: "Cat" | "Parrot";
          }) | null;
        };
    "#};

    assert!(generated.contains(expected), "{generated}");
    assert_eq!(index.paths(OperationKind::Query)["PetById"].to_str(), Some("queries/pet.graphql"));
}

#[test]
fn missing_imports_are_reported() {
    let schema = schema();
    let error = OperationIndex::from_sources(&schema, [(
        "queries/me.graphql",
        "#import \"./missing.graphql\"\nquery Me { me { id } }",
    )])
    .unwrap_err();

    assert!(matches!(error, Error::MissingImport { .. }));
    assert_eq!(
        error.to_string(),
        "could not resolve the import './missing.graphql' in 'queries/me.graphql'"
    );
}

#[test]
fn unknown_fields_fail_the_whole_run() {
    let schema = schema();
    let index = operations(&schema, &[("me.graphql", "query Me { me { age } }")]);

    let error = Codegen::new(&schema, &index, &Options::default()).generate().unwrap_err();

    assert!(matches!(error, Error::UnknownField { ref field, .. } if field == "age"));
}

#[test]
fn documents_are_read_through_the_loader() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("fragments")).unwrap();
    std::fs::write(dir.path().join("fragments/user.graphql"), "fragment UserName on User { name }").unwrap();
    std::fs::write(
        dir.path().join("me.graphql"),
        "#import \"./fragments/user.graphql\"\nquery Me { me { ...UserName } }",
    )
    .unwrap();

    let schema = schema();
    let cache = DocumentCache::default();
    let mut builder = OperationIndex::builder(&FileSystemLoader, &cache);
    builder.add_document(dir.path().join("me.graphql")).unwrap();
    let index = builder.build(&schema).unwrap();

    assert_eq!(cache.len(), 1);
    assert!(index.fragment("UserName").is_some());
    assert!(generate(&schema, &index).contains("export type Me = {\n  me: {\n    name: String;\n  };\n};"));
}

#[test]
fn in_memory_sources_resolve_imports_through_the_loader() {
    let schema = schema();
    let loader = MemoryLoader::from_iter([("shared/user.graphql", "fragment UserId on User { id }")]);
    let cache = DocumentCache::default();

    let mut builder = OperationIndex::builder(&loader, &cache);
    builder
        .add_source("me.graphql", "#import \"./shared/user.graphql\"\nquery Me { me { ...UserId } }")
        .unwrap();
    let index = builder.build(&schema).unwrap();

    assert!(generate(&schema, &index).contains("export type Me = {\n  me: {\n    id: ID;\n  };\n};"));
}
