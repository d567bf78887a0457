use graphql_mockgen::{OperationIndex, Schema};
use indoc::indoc;
use std::sync::Arc;

pub const PETS: &str = indoc! {r#"
    type Query {
      me: User!
      pet(id: ID!): Pet
      search(term: String!): [SearchResult!]!
    }

    type Mutation {
      adopt(petId: ID!, owner: OwnerInput!): User!
    }

    interface Pet {
      id: ID!
      name: String!
    }

    type Cat implements Pet {
      id: ID!
      name: String!
      lives: Int!
    }

    type Dog implements Pet {
      id: ID!
      name: String!
      goodBoy: Boolean!
    }

    type Parrot implements Pet {
      id: ID!
      name: String!
      words: [String!]!
    }

    union SearchResult = User | Cat | Dog

    type User {
      id: ID!
      name: String!
      nickname: String
      pets: [Pet!]!
      role: Role!
    }

    enum Role {
      Owner
      Sitter
    }

    input OwnerInput {
      name: String!
      role: Role
    }
"#};

pub fn schema() -> Arc<Schema> {
    Arc::new(Schema::parse(PETS).unwrap())
}

pub fn operations(schema: &Schema, documents: &[(&str, &str)]) -> Arc<OperationIndex> {
    Arc::new(OperationIndex::from_sources(schema, documents.iter().copied()).unwrap())
}
