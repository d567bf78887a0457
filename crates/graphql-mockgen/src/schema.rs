//! Indexed view over one or more GraphQL SDL documents.

mod type_ref;

pub use type_ref::TypeRef;

use crate::{
    error::{Error, Result},
    operations::OperationKind,
};
use async_graphql_parser::{
    types::{self as ast, TypeSystemDefinition},
    Positioned,
};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

const BUILTIN_SCALARS: [&str; 5] = ["ID", "String", "Int", "Float", "Boolean"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Object,
    Interface,
    Union,
    Input,
    Enum,
    Scalar,
}

#[derive(Debug, Clone)]
pub struct ObjectDefinition {
    pub name: String,
    pub fields: IndexMap<String, TypeRef>,
    pub interfaces: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct InterfaceDefinition {
    pub name: String,
    pub fields: IndexMap<String, TypeRef>,
    /// Object types implementing this interface, in schema order.
    pub implementors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct UnionDefinition {
    pub name: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct InputDefinition {
    pub name: String,
    pub fields: IndexMap<String, TypeRef>,
}

#[derive(Debug, Clone)]
pub struct EnumDefinition {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum TypeDefinition {
    Object(ObjectDefinition),
    Interface(InterfaceDefinition),
    Union(UnionDefinition),
    Input(InputDefinition),
    Enum(EnumDefinition),
    Scalar(String),
}

impl TypeDefinition {
    pub fn name(&self) -> &str {
        match self {
            TypeDefinition::Object(def) => &def.name,
            TypeDefinition::Interface(def) => &def.name,
            TypeDefinition::Union(def) => &def.name,
            TypeDefinition::Input(def) => &def.name,
            TypeDefinition::Enum(def) => &def.name,
            TypeDefinition::Scalar(name) => name,
        }
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            TypeDefinition::Object(_) => TypeKind::Object,
            TypeDefinition::Interface(_) => TypeKind::Interface,
            TypeDefinition::Union(_) => TypeKind::Union,
            TypeDefinition::Input(_) => TypeKind::Input,
            TypeDefinition::Enum(_) => TypeKind::Enum,
            TypeDefinition::Scalar(_) => TypeKind::Scalar,
        }
    }

    /// The field map of objects, interfaces and input objects.
    pub fn fields(&self) -> Option<&IndexMap<String, TypeRef>> {
        match self {
            TypeDefinition::Object(def) => Some(&def.fields),
            TypeDefinition::Interface(def) => Some(&def.fields),
            TypeDefinition::Input(def) => Some(&def.fields),
            TypeDefinition::Union(_) | TypeDefinition::Enum(_) | TypeDefinition::Scalar(_) => None,
        }
    }
}

#[derive(Debug, Default, Clone)]
struct RootTypes {
    query: Option<String>,
    mutation: Option<String>,
    subscription: Option<String>,
}

/// The type definitions of a schema, keyed by name in declaration order.
#[derive(Debug, Clone)]
pub struct Schema {
    definitions: IndexMap<String, TypeDefinition>,
    roots: RootTypes,
}

impl Schema {
    /// Parses a single SDL document.
    pub fn parse(sdl: &str) -> Result<Self> {
        Self::from_sources([(Path::new("schema.graphql"), sdl)])
    }

    /// Parses and merges several SDL documents, e.g. a schema split across files.
    pub fn from_sources<P, S>(sources: impl IntoIterator<Item = (P, S)>) -> Result<Self>
    where
        P: AsRef<Path>,
        S: AsRef<str>,
    {
        let mut builder = SchemaBuilder::default();

        for (path, sdl) in sources {
            let path = path.as_ref();
            let document = async_graphql_parser::parse_schema(sdl.as_ref()).map_err(|source| Error::Parse {
                path: path.to_owned(),
                source,
            })?;

            tracing::debug!(path = %path.display(), definitions = document.definitions.len(), "ingesting schema source");

            for definition in &document.definitions {
                builder.ingest(definition, path)?;
            }
        }

        builder.finish()
    }

    pub fn definition(&self, name: &str) -> Option<&TypeDefinition> {
        self.definitions.get(name)
    }

    /// Like [`Schema::definition`], failing with a message naming the referencing context.
    pub fn lookup(&self, name: &str, context: &str) -> Result<&TypeDefinition> {
        self.definitions.get(name).ok_or_else(|| Error::UnknownType {
            name: name.to_owned(),
            context: context.to_owned(),
        })
    }

    pub fn definitions(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.definitions.values()
    }

    pub fn kind_of(&self, name: &str) -> Option<TypeKind> {
        self.definitions.get(name).map(TypeDefinition::kind)
    }

    pub fn is_abstract(&self, name: &str) -> bool {
        matches!(self.kind_of(name), Some(TypeKind::Interface | TypeKind::Union))
    }

    /// Whether values of this type are objects: object, interface, union or input types.
    pub fn is_composite(&self, name: &str) -> bool {
        matches!(
            self.kind_of(name),
            Some(TypeKind::Object | TypeKind::Interface | TypeKind::Union | TypeKind::Input)
        )
    }

    /// The declared type of `field` on `type_name`.
    ///
    /// On a union the field is looked up on the first member declaring it: an unconditional
    /// selection on a union is assumed to be exposed identically by all members.
    pub fn field_type(&self, type_name: &str, field: &str, context: &str) -> Result<&TypeRef> {
        let definition = self.lookup(type_name, context)?;

        let found = match definition {
            TypeDefinition::Union(union) => union
                .members
                .iter()
                .filter_map(|member| self.definitions.get(member)?.fields()?.get(field))
                .next(),
            other => other.fields().and_then(|fields| fields.get(field)),
        };

        found.ok_or_else(|| Error::UnknownField {
            type_name: type_name.to_owned(),
            field: field.to_owned(),
            context: context.to_owned(),
        })
    }

    /// The concrete object types a value of `name` can have at runtime.
    pub fn possible_types(&self, name: &str) -> Vec<&str> {
        match self.definitions.get(name) {
            Some(TypeDefinition::Interface(def)) => def.implementors.iter().map(String::as_str).collect(),
            Some(TypeDefinition::Union(def)) => def.members.iter().map(String::as_str).collect(),
            Some(TypeDefinition::Object(def)) => vec![def.name.as_str()],
            Some(TypeDefinition::Input(def)) => vec![def.name.as_str()],
            _ => Vec::new(),
        }
    }

    /// Whether a value of the concrete type `concrete` is also a value of `abstract_type`.
    pub fn is_possible_type(&self, abstract_type: &str, concrete: &str) -> bool {
        abstract_type == concrete || self.possible_types(abstract_type).contains(&concrete)
    }

    pub fn enum_values(&self, name: &str) -> Option<&[String]> {
        match self.definitions.get(name) {
            Some(TypeDefinition::Enum(def)) => Some(&def.values),
            _ => None,
        }
    }

    pub fn root_type(&self, kind: OperationKind) -> Option<&str> {
        match kind {
            OperationKind::Query => self.roots.query.as_deref(),
            OperationKind::Mutation => self.roots.mutation.as_deref(),
            OperationKind::Subscription => self.roots.subscription.as_deref(),
        }
    }

    pub fn is_root_type(&self, name: &str) -> bool {
        OperationKind::ALL
            .into_iter()
            .any(|kind| self.root_type(kind) == Some(name))
    }
}

#[derive(Default)]
struct SchemaBuilder {
    definitions: IndexMap<String, TypeDefinition>,
    roots: RootTypes,
    schema_block: Option<PathBuf>,
}

impl SchemaBuilder {
    fn ingest(&mut self, definition: &TypeSystemDefinition, path: &Path) -> Result<()> {
        match definition {
            TypeSystemDefinition::Schema(schema) => {
                let schema = &schema.node;
                let query = schema.query.as_ref().map(|name| name.node.to_string());
                let mutation = schema.mutation.as_ref().map(|name| name.node.to_string());
                let subscription = schema.subscription.as_ref().map(|name| name.node.to_string());

                self.roots.query = query.or(self.roots.query.take());
                self.roots.mutation = mutation.or(self.roots.mutation.take());
                self.roots.subscription = subscription.or(self.roots.subscription.take());
                self.schema_block = Some(path.to_owned());
            }
            TypeSystemDefinition::Type(definition) => self.ingest_type(&definition.node)?,
            TypeSystemDefinition::Directive(_) => (),
        }

        Ok(())
    }

    fn ingest_type(&mut self, definition: &ast::TypeDefinition) -> Result<()> {
        let name = definition.name.node.to_string();

        let incoming = match &definition.kind {
            ast::TypeKind::Scalar => TypeDefinition::Scalar(name.clone()),
            ast::TypeKind::Object(object) => TypeDefinition::Object(ObjectDefinition {
                name: name.clone(),
                fields: field_map(&object.fields),
                interfaces: object.implements.iter().map(|name| name.node.to_string()).collect(),
            }),
            ast::TypeKind::Interface(interface) => TypeDefinition::Interface(InterfaceDefinition {
                name: name.clone(),
                fields: field_map(&interface.fields),
                implementors: Vec::new(),
            }),
            ast::TypeKind::Union(union) => TypeDefinition::Union(UnionDefinition {
                name: name.clone(),
                members: union.members.iter().map(|member| member.node.to_string()).collect(),
            }),
            ast::TypeKind::Enum(r#enum) => TypeDefinition::Enum(EnumDefinition {
                name: name.clone(),
                values: r#enum.values.iter().map(|value| value.node.value.node.to_string()).collect(),
            }),
            ast::TypeKind::InputObject(input) => TypeDefinition::Input(InputDefinition {
                name: name.clone(),
                fields: input
                    .fields
                    .iter()
                    .map(|field| (field.node.name.node.to_string(), TypeRef::from_ast(&field.node.ty.node)))
                    .collect(),
            }),
        };

        let Some(existing) = self.definitions.get_mut(&name) else {
            self.definitions.insert(name, incoming);
            return Ok(());
        };

        match (existing, incoming) {
            (TypeDefinition::Union(existing), TypeDefinition::Union(incoming)) => {
                extend_unique(&mut existing.members, incoming.members);
            }
            (TypeDefinition::Enum(existing), TypeDefinition::Enum(incoming)) => {
                extend_unique(&mut existing.values, incoming.values);
            }
            (TypeDefinition::Object(existing), TypeDefinition::Object(incoming)) => {
                extend_fields(&mut existing.fields, incoming.fields);
                extend_unique(&mut existing.interfaces, incoming.interfaces);
            }
            (TypeDefinition::Interface(existing), TypeDefinition::Interface(incoming)) => {
                extend_fields(&mut existing.fields, incoming.fields);
            }
            (TypeDefinition::Input(existing), TypeDefinition::Input(incoming)) => {
                extend_fields(&mut existing.fields, incoming.fields);
            }
            (TypeDefinition::Scalar(_), TypeDefinition::Scalar(_)) => (),
            (existing, incoming) => {
                return Err(Error::shape(
                    format!("the definitions of '{name}'"),
                    format!(
                        "a {:?} definition cannot be merged with a {:?} definition",
                        existing.kind(),
                        incoming.kind()
                    ),
                ))
            }
        }

        Ok(())
    }

    fn finish(mut self) -> Result<Schema> {
        let mut implementations: Vec<(String, String)> = Vec::new();

        for definition in self.definitions.values() {
            if let TypeDefinition::Object(object) = definition {
                implementations.extend(
                    object
                        .interfaces
                        .iter()
                        .map(|interface| (interface.clone(), object.name.clone())),
                );
            }
        }

        for (interface, object) in implementations {
            match self.definitions.get_mut(&interface) {
                Some(TypeDefinition::Interface(def)) => {
                    if !def.implementors.contains(&object) {
                        def.implementors.push(object);
                    }
                }
                _ => {
                    return Err(Error::UnknownType {
                        name: interface,
                        context: format!("the interfaces implemented by '{object}'"),
                    })
                }
            }
        }

        if self.schema_block.is_none() {
            let defined = |name: &str| self.definitions.contains_key(name).then(|| name.to_owned());

            self.roots = RootTypes {
                query: defined("Query"),
                mutation: defined("Mutation"),
                subscription: defined("Subscription"),
            };
        }

        let mut definitions: IndexMap<String, TypeDefinition> = BUILTIN_SCALARS
            .into_iter()
            .map(|name| (name.to_owned(), TypeDefinition::Scalar(name.to_owned())))
            .collect();

        for (name, definition) in self.definitions {
            definitions.entry(name).or_insert(definition);
        }

        Ok(Schema {
            definitions,
            roots: self.roots,
        })
    }
}

fn field_map(fields: &[Positioned<ast::FieldDefinition>]) -> IndexMap<String, TypeRef> {
    fields
        .iter()
        .map(|field| (field.node.name.node.to_string(), TypeRef::from_ast(&field.node.ty.node)))
        .collect()
}

fn extend_unique(existing: &mut Vec<String>, incoming: Vec<String>) {
    for item in incoming {
        if !existing.contains(&item) {
            existing.push(item);
        }
    }
}

fn extend_fields(existing: &mut IndexMap<String, TypeRef>, incoming: IndexMap<String, TypeRef>) {
    for (name, ty) in incoming {
        existing.entry(name).or_insert(ty);
    }
}
