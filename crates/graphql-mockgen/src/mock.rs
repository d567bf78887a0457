//! Lazily synthesized mock values.
//!
//! A value is resolved per field on first read: the top-most patch defining the field wins, a
//! derived patch sees what the patches below it produce, and without any patch a default comes
//! from the schema and the scalar mocks.

mod list;
mod object;
mod scalars;
mod shape;

pub use object::MockObject;
pub use scalars::{ScalarMock, ScalarMocks};

pub(crate) use shape::{Composite, Shape};

use crate::{
    error::{Error, Result},
    patch::Patch,
    resolve::ObjectShape,
    schema::{Schema, TypeRef},
};
use indexmap::IndexMap;
use serde_json::Value;
use std::{fmt, rc::Rc, sync::Arc};

#[derive(Debug, Clone, Copy, Default)]
pub struct MockOptions {
    /// Fail instead of picking the first candidate when patches do not tell which concrete
    /// type an interface or union value has.
    pub strict_discrimination: bool,
}

/// Synthesizes mock values for the types of one schema. Cheap to clone.
#[derive(Clone)]
pub struct MockEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    schema: Arc<Schema>,
    scalars: ScalarMocks,
    options: MockOptions,
}

impl fmt::Debug for MockEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockEngine")
            .field("scalars", &self.inner.scalars)
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

/// The field a value is resolved for, used for scalar mocks and error messages.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Position<'a> {
    pub enclosing: &'a str,
    pub field: &'a str,
}

impl Position<'_> {
    fn label(&self) -> String {
        if self.field.is_empty() {
            self.enclosing.to_owned()
        } else {
            format!("{}.{}", self.enclosing, self.field)
        }
    }
}

impl MockEngine {
    pub fn new(schema: Arc<Schema>, scalars: ScalarMocks) -> Self {
        MockEngine::with_options(schema, scalars, MockOptions::default())
    }

    pub fn with_options(schema: Arc<Schema>, scalars: ScalarMocks, options: MockOptions) -> Self {
        MockEngine {
            inner: Arc::new(EngineInner {
                schema,
                scalars,
                options,
            }),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    /// A mock of a schema object, interface, union or input type.
    pub fn synthesize(&self, type_name: &str, patches: Vec<Patch>) -> Result<MockValue> {
        self.schema().lookup(type_name, "a mock")?;

        if !self.schema().is_composite(type_name) {
            return Err(Error::shape(
                "a mock",
                format!("'{type_name}' is not an object, interface, union or input type"),
            ));
        }

        let shape = Shape::Composite {
            composite: Composite::Type(type_name.to_owned()),
            nullable: false,
        };

        self.resolve(&shape, &patches, Position {
            enclosing: type_name,
            field: "",
        })
    }

    /// A mock shaped by a selection set, e.g. the data of an operation.
    pub fn synthesize_selection(&self, selection: Arc<ObjectShape>, patches: Vec<Patch>) -> Result<MockValue> {
        let type_name = selection.type_name.clone();
        let shape = Shape::Composite {
            composite: Composite::Selection(selection),
            nullable: false,
        };

        self.resolve(&shape, &patches, Position {
            enclosing: &type_name,
            field: "",
        })
    }

    /// A mock of operation variables, treated as an input type called `name`.
    pub fn synthesize_variables(
        &self,
        name: &str,
        variables: Arc<IndexMap<String, TypeRef>>,
        patches: Vec<Patch>,
    ) -> Result<MockValue> {
        let shape = Shape::Composite {
            composite: Composite::Variables {
                name: name.to_owned(),
                variables,
            },
            nullable: false,
        };

        self.resolve(&shape, &patches, Position {
            enclosing: name,
            field: "",
        })
    }

    /// Resolves one position from its patch stack, bottom first.
    pub(crate) fn resolve(&self, shape: &Shape, entries: &[Patch], at: Position<'_>) -> Result<MockValue> {
        match shape {
            Shape::Literal(value) => Ok(MockValue::Leaf(Value::String(value.clone()))),
            Shape::Leaf { type_name, nullable } => match entries.split_last() {
                Some((Patch::Derive(derive), rest)) => {
                    let previous = self.resolve(shape, rest, at)?.to_json()?;
                    let mut stack = rest.to_vec();
                    stack.push(derive.apply(&previous));

                    self.resolve(shape, &stack, at)
                }
                Some((top, _)) => Ok(MockValue::Leaf(top.to_json())),
                None => self.default_leaf(type_name, *nullable, at),
            },
            Shape::List { element, .. } => list::resolve_list(self, shape, element, entries, at),
            Shape::Composite { composite, nullable } => {
                let Some(layers) = after_reset(self.flatten(shape, entries, at)?) else {
                    return Ok(MockValue::Leaf(Value::Null));
                };

                if layers.is_empty() && *nullable {
                    return Ok(MockValue::Leaf(Value::Null));
                }

                let layers = layers
                    .into_iter()
                    .map(|layer| match layer {
                        Patch::Object(fields) => Ok(fields),
                        other => Err(Error::shape(
                            at.label(),
                            format!("expected a patch of '{}', got {}", composite.name(), other.to_json()),
                        )),
                    })
                    .collect::<Result<Vec<_>>>()?;

                let object = MockObject::new(self.clone(), composite, layers)?;

                Ok(MockValue::Object(Rc::new(object)))
            }
        }
    }

    /// Evaluates derived patches bottom up, each seeing the value of the layers below it.
    fn flatten(&self, shape: &Shape, entries: &[Patch], at: Position<'_>) -> Result<Vec<Patch>> {
        let mut flattened: Vec<Patch> = Vec::with_capacity(entries.len());

        for entry in entries {
            let entry = match entry {
                Patch::Derive(derive) => {
                    let previous = self.resolve(shape, &flattened, at)?.to_json()?;
                    derive.apply(&previous)
                }
                other => other.clone(),
            };

            flattened.push(entry.into_structured());
        }

        Ok(flattened)
    }

    fn default_leaf(&self, type_name: &str, nullable: bool, at: Position<'_>) -> Result<MockValue> {
        if nullable {
            return Ok(MockValue::Leaf(Value::Null));
        }

        if let Some(values) = self.schema().enum_values(type_name) {
            let first = values.first().cloned().map_or(Value::Null, Value::String);
            return Ok(MockValue::Leaf(first));
        }

        self.inner
            .scalars
            .mock(type_name, at.enclosing)
            .map(MockValue::Leaf)
            .ok_or_else(|| Error::MissingScalar {
                name: type_name.to_owned(),
            })
    }

    /// Picks the concrete type of an interface or union value from its patch layers.
    pub(crate) fn choose_concrete(
        &self,
        type_name: &str,
        candidates: &[&str],
        layers: &[IndexMap<String, Patch>],
        exposes: impl Fn(&str, &str) -> bool,
    ) -> Result<String> {
        let explicit = layers.iter().rev().find_map(|layer| layer.get("__typename"));

        if let Some(Patch::Value(Value::String(explicit))) = explicit {
            return candidates
                .iter()
                .find(|candidate| **candidate == explicit.as_str())
                .map(|candidate| (*candidate).to_owned())
                .ok_or_else(|| Error::UnknownType {
                    name: explicit.clone(),
                    context: format!("the possible types of '{type_name}'"),
                });
        }

        let mut remaining = candidates.to_vec();

        if remaining.is_empty() {
            return Err(Error::shape(
                format!("a mock of '{type_name}'"),
                "there is no concrete type to choose from",
            ));
        }

        for layer in layers.iter().rev() {
            if remaining.len() == 1 {
                break;
            }

            for key in layer.keys().filter(|key| *key != "__typename") {
                remaining.retain(|candidate| exposes(candidate, key));

                if remaining.is_empty() {
                    return Err(Error::UnknownField {
                        type_name: type_name.to_owned(),
                        field: key.clone(),
                        context: "a mock patch".to_owned(),
                    });
                }
            }
        }

        if remaining.len() > 1 {
            if self.inner.options.strict_discrimination {
                return Err(Error::AmbiguousConcreteType {
                    type_name: type_name.to_owned(),
                    candidates: remaining.iter().map(|candidate| (*candidate).to_owned()).collect(),
                });
            }

            tracing::warn!(
                type_name,
                candidates = %remaining.join(", "),
                "patches do not discriminate a concrete type, picking the first candidate"
            );
        }

        Ok(remaining[0].to_owned())
    }
}

/// Drops every layer up to the last literal `null`. `None` if the top layer is `null`.
fn after_reset(mut layers: Vec<Patch>) -> Option<Vec<Patch>> {
    match layers.iter().rposition(Patch::is_null) {
        Some(index) if index + 1 == layers.len() => None,
        Some(index) => Some(layers.split_off(index + 1)),
        None => Some(layers),
    }
}

/// A synthesized value. Objects resolve their fields on first read.
#[derive(Debug, Clone)]
pub enum MockValue {
    Leaf(Value),
    Object(Rc<MockObject>),
    List(Vec<MockValue>),
}

impl MockValue {
    pub fn as_object(&self) -> Option<&MockObject> {
        match self {
            MockValue::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Materializes the value into a fresh JSON tree.
    pub fn to_json(&self) -> Result<Value> {
        match self {
            MockValue::Leaf(value) => Ok(value.clone()),
            MockValue::Object(object) => object.to_json(),
            MockValue::List(items) => items.iter().map(MockValue::to_json).collect::<Result<_>>().map(Value::Array),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use serde_json::json;

    fn engine(options: MockOptions) -> MockEngine {
        let schema = Schema::parse(indoc! {r#"
            interface Pet { name: String! }
            type Cat implements Pet { name: String! meows: Boolean! }
            type Dog implements Pet { name: String! barks: Boolean! }
            enum Role { Admin Member }
            type User {
              id: ID!
              nickname: String
              role: Role!
              tags: [String!]!
              pet: Pet!
              score: Int!
            }
        "#})
        .unwrap();

        MockEngine::with_options(Arc::new(schema), ScalarMocks::builtin(), options)
    }

    fn mock(engine: &MockEngine, patches: Vec<Value>) -> Result<Value> {
        engine
            .synthesize("User", patches.into_iter().map(Patch::from).collect())?
            .to_json()
    }

    #[test]
    fn defaults_follow_the_schema() {
        let value = mock(&engine(MockOptions::default()), vec![]).unwrap();

        assert_eq!(
            value,
            json!({
                "__typename": "User",
                "id": "User-id",
                "nickname": null,
                "role": "Admin",
                "tags": [],
                "pet": { "__typename": "Cat", "name": "Cat string", "meows": false },
                "score": 0,
            })
        );
    }

    #[test]
    fn later_patches_win_and_derivations_see_the_layers_below() {
        let engine = engine(MockOptions::default());
        let stacked = mock(&engine, vec![json!({ "score": 1 }), json!({ "score": 2 })]).unwrap();
        assert_eq!(stacked["score"], json!(2));

        let derived = engine
            .synthesize(
                "User",
                vec![
                    Patch::from(json!({ "score": 41 })),
                    Patch::empty().field(
                        "score",
                        Patch::derive(|previous| Patch::Value(json!(previous.as_i64().unwrap_or_default() + 1))),
                    ),
                ],
            )
            .unwrap()
            .to_json()
            .unwrap();
        assert_eq!(derived["score"], json!(42));
    }

    #[test]
    fn discriminates_by_fields_and_typename() {
        let engine = engine(MockOptions::default());

        let by_field = mock(&engine, vec![json!({ "pet": { "barks": true } })]).unwrap();
        assert_eq!(by_field["pet"]["__typename"], json!("Dog"));

        let explicit = mock(&engine, vec![json!({ "pet": { "__typename": "Dog" } }), json!({ "pet": { "name": "Rex" } })]).unwrap();
        assert_eq!(explicit["pet"], json!({ "__typename": "Dog", "name": "Rex", "barks": false }));
    }

    #[test]
    fn strict_discrimination_rejects_guesses() {
        let engine = engine(MockOptions {
            strict_discrimination: true,
        });

        let error = mock(&engine, vec![json!({ "pet": { "name": "Rex" } })]).unwrap_err();
        assert_eq!(error.to_string(), "cannot choose a concrete type for 'Pet' among Cat, Dog");

        let chosen = mock(&engine, vec![json!({ "pet": { "__typename": "Cat" } })]).unwrap();
        assert_eq!(chosen["pet"]["meows"], json!(false));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let error = mock(&engine(MockOptions::default()), vec![json!({ "age": 3 })]).unwrap_err();

        assert_eq!(
            error.to_string(),
            "unknown field 'age' on type 'User' referenced in a mock patch"
        );
    }

    #[test]
    fn fields_are_memoized() {
        let engine = engine(MockOptions::default());
        let value = engine.synthesize("User", vec![]).unwrap();
        let user = value.as_object().unwrap();

        let (MockValue::Object(first), MockValue::Object(second)) = (user.get("pet").unwrap(), user.get("pet").unwrap()) else {
            unreachable!()
        };

        assert!(Rc::ptr_eq(&first, &second));
    }
}
