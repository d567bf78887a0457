use super::{Composite, MockEngine, MockValue, Position, Shape};
use crate::{
    error::{Error, Result},
    patch::Patch,
    resolve::{merge_fields, SerializedType},
    schema::{TypeDefinition, TypeKind},
};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::{cell::RefCell, fmt};

/// An object value whose fields are computed on first read and cached.
pub struct MockObject {
    engine: MockEngine,
    type_name: String,
    fields: IndexMap<String, Shape>,
    layers: Vec<IndexMap<String, Patch>>,
    cache: RefCell<IndexMap<String, MockValue>>,
}

impl fmt::Debug for MockObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockObject")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .field("layers", &self.layers.len())
            .finish_non_exhaustive()
    }
}

impl MockObject {
    pub(super) fn new(engine: MockEngine, composite: &Composite, layers: Vec<IndexMap<String, Patch>>) -> Result<Self> {
        let (type_name, fields) = match composite {
            Composite::Type(name) => type_fields(&engine, name, &layers)?,
            Composite::Selection(shape) => {
                let schema = engine.schema();

                let candidates = if schema.is_abstract(&shape.type_name) {
                    schema.possible_types(&shape.type_name)
                } else {
                    vec![shape.type_name.as_str()]
                };

                let concrete = engine.choose_concrete(&shape.type_name, &candidates, &layers, |candidate, key| {
                    shape.fields.contains_key(key)
                        || shape
                            .branch_for(candidate)
                            .is_some_and(|branch| branch.fields.contains_key(key))
                        || shape
                            .conditional_branches()
                            .any(|branch| branch.fields.contains_key(key))
                })?;

                // Values of abstract positions always tell their concrete type.
                let mut selected = IndexMap::new();

                if schema.is_abstract(&shape.type_name) {
                    selected.insert("__typename".to_owned(), SerializedType::Literal(concrete.clone()));
                }

                merge_fields(&mut selected, shape.fields.clone());

                if let Some(branch) = shape.branch_for(&concrete) {
                    merge_fields(&mut selected, branch.fields.clone());
                }

                for branch in shape.conditional_branches() {
                    merge_fields(&mut selected, branch.fields.clone());
                }

                let fields = selected
                    .iter()
                    .map(|(key, ty)| {
                        let field_shape = if key == "__typename" {
                            Shape::Literal(concrete.clone())
                        } else {
                            Shape::from_serialized(ty)
                        };

                        (key.clone(), field_shape)
                    })
                    .collect();

                (concrete, fields)
            }
            Composite::Variables { name, variables } => {
                let fields = variables
                    .iter()
                    .map(|(key, ty)| (key.clone(), Shape::from_type_ref(engine.schema(), ty)))
                    .collect();

                (name.clone(), fields)
            }
        };

        let accepts_typename = !matches!(composite, Composite::Variables { .. });

        for key in layers.iter().flat_map(IndexMap::keys) {
            let known = fields.contains_key(key) || (accepts_typename && key == "__typename");

            if !known {
                return Err(Error::UnknownField {
                    type_name,
                    field: key.clone(),
                    context: "a mock patch".to_owned(),
                });
            }
        }

        Ok(MockObject {
            engine,
            type_name,
            fields,
            layers,
            cache: RefCell::new(IndexMap::new()),
        })
    }

    /// The concrete type of this object.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Result<MockValue> {
        if let Some(value) = self.cache.borrow().get(key) {
            return Ok(value.clone());
        }

        let shape = self.fields.get(key).ok_or_else(|| Error::UnknownField {
            type_name: self.type_name.clone(),
            field: key.to_owned(),
            context: "a mock lookup".to_owned(),
        })?;

        let entries: Vec<Patch> = self
            .layers
            .iter()
            .filter_map(|layer| layer.get(key).cloned())
            .collect();

        let value = self.engine.resolve(shape, &entries, Position {
            enclosing: &self.type_name,
            field: key,
        })?;

        Ok(self
            .cache
            .borrow_mut()
            .entry(key.to_owned())
            .or_insert(value)
            .clone())
    }

    pub fn to_json(&self) -> Result<Value> {
        let mut object = Map::with_capacity(self.fields.len());

        for key in self.fields.keys() {
            object.insert(key.clone(), self.get(key)?.to_json()?);
        }

        Ok(Value::Object(object))
    }
}

/// The concrete type and fields of a schema type mock. Interfaces and unions are narrowed to
/// one of their possible types first.
fn type_fields(
    engine: &MockEngine,
    name: &str,
    layers: &[IndexMap<String, Patch>],
) -> Result<(String, IndexMap<String, Shape>)> {
    let schema = engine.schema();

    let concrete = if schema.is_abstract(name) {
        engine.choose_concrete(name, &schema.possible_types(name), layers, |candidate, key| {
            schema
                .definition(candidate)
                .and_then(TypeDefinition::fields)
                .is_some_and(|fields| fields.contains_key(key))
        })?
    } else {
        name.to_owned()
    };

    let definition = schema.lookup(&concrete, &format!("the possible types of '{name}'"))?;
    let mut fields = IndexMap::new();

    if definition.kind() == TypeKind::Object {
        fields.insert("__typename".to_owned(), Shape::Literal(concrete.clone()));
    }

    for (field, ty) in definition.fields().into_iter().flatten() {
        fields.insert(field.clone(), Shape::from_type_ref(schema, ty));
    }

    Ok((concrete, fields))
}
