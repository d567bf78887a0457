use crate::{
    resolve::{ObjectShape, SerializedType},
    schema::{Schema, TypeKind, TypeRef},
};
use indexmap::IndexMap;
use std::sync::Arc;

/// What a mock position holds.
#[derive(Debug, Clone)]
pub(crate) enum Shape {
    /// A scalar or enum value.
    Leaf { type_name: String, nullable: bool },
    /// A fixed string, e.g. the `__typename` of a concrete type.
    Literal(String),
    List { element: Box<Shape>, nullable: bool },
    Composite { composite: Composite, nullable: bool },
}

/// The source of the fields of an object value.
#[derive(Debug, Clone)]
pub(crate) enum Composite {
    /// Every field of a schema object, interface, union or input type.
    Type(String),
    /// The fields an operation selected.
    Selection(Arc<ObjectShape>),
    /// The variables of an operation.
    Variables {
        name: String,
        variables: Arc<IndexMap<String, TypeRef>>,
    },
}

impl Composite {
    pub fn name(&self) -> &str {
        match self {
            Composite::Type(name) => name,
            Composite::Selection(shape) => &shape.type_name,
            Composite::Variables { name, .. } => name,
        }
    }
}

impl Shape {
    pub fn from_type_ref(schema: &Schema, ty: &TypeRef) -> Shape {
        match ty {
            TypeRef::List { element, nullable } => Shape::List {
                element: Box::new(Shape::from_type_ref(schema, element)),
                nullable: *nullable,
            },
            TypeRef::Named { name, nullable } => match schema.kind_of(name) {
                Some(TypeKind::Object | TypeKind::Interface | TypeKind::Union | TypeKind::Input) => Shape::Composite {
                    composite: Composite::Type(name.clone()),
                    nullable: *nullable,
                },
                _ => Shape::Leaf {
                    type_name: name.clone(),
                    nullable: *nullable,
                },
            },
        }
    }

    pub fn from_serialized(ty: &SerializedType) -> Shape {
        match ty {
            SerializedType::Name { name, nullable } => Shape::Leaf {
                type_name: name.clone(),
                nullable: *nullable,
            },
            SerializedType::List { element, nullable } => Shape::List {
                element: Box::new(Shape::from_serialized(element)),
                nullable: *nullable,
            },
            SerializedType::Object(shape) => Shape::Composite {
                composite: Composite::Selection(Arc::new(shape.clone())),
                nullable: shape.nullable,
            },
            SerializedType::Literal(value) => Shape::Literal(value.clone()),
        }
    }
}
