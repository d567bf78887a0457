use async_graphql_parser::types::{BaseType, Type};
use std::fmt;

/// A field or variable type with its list and non-null wrappers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Named { name: String, nullable: bool },
    List { element: Box<TypeRef>, nullable: bool },
}

impl TypeRef {
    pub(crate) fn from_ast(ty: &Type) -> Self {
        match &ty.base {
            BaseType::Named(name) => TypeRef::Named {
                name: name.to_string(),
                nullable: ty.nullable,
            },
            BaseType::List(element) => TypeRef::List {
                element: Box::new(TypeRef::from_ast(element)),
                nullable: ty.nullable,
            },
        }
    }

    /// The innermost type name, without wrappers.
    pub fn named_type(&self) -> &str {
        match self {
            TypeRef::Named { name, .. } => name,
            TypeRef::List { element, .. } => element.named_type(),
        }
    }

    pub fn is_nullable(&self) -> bool {
        match self {
            TypeRef::Named { nullable, .. } | TypeRef::List { nullable, .. } => *nullable,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named { name, .. } => f.write_str(name)?,
            TypeRef::List { element, .. } => write!(f, "[{element}]")?,
        }

        if !self.is_nullable() {
            f.write_str("!")?;
        }

        Ok(())
    }
}
