use std::{io, path::PathBuf};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// returned if a document cannot be parsed
    #[error("could not parse '{path}'\nCaused by: {source}")]
    Parse {
        path: PathBuf,
        source: async_graphql_parser::Error,
    },
    /// returned if a document cannot be read by the loader
    #[error("could not read '{path}'\nCaused by: {source}")]
    Io { path: PathBuf, source: io::Error },
    /// returned if an `#import` directive points at a file the loader does not know
    #[error("could not resolve the import '{import}' in '{path}'")]
    MissingImport { path: PathBuf, import: String },
    #[error("unknown type '{name}' referenced in {context}")]
    UnknownType { name: String, context: String },
    #[error("unknown field '{field}' on type '{type_name}' referenced in {context}")]
    UnknownField {
        type_name: String,
        field: String,
        context: String,
    },
    #[error("unknown fragment '{name}' referenced in {context}")]
    UnknownFragment { name: String, context: String },
    #[error("the fragment '{name}' spreads itself")]
    FragmentCycle { name: String },
    #[error("the {kind} '{name}' is defined more than once ('{first}' and '{second}')")]
    DuplicateOperation {
        kind: &'static str,
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
    #[error("the fragment '{name}' is defined more than once")]
    DuplicateFragment { name: String },
    /// returned if a scalar is used but no declaration or mock is configured for it
    #[error("no mapping is configured for the scalar '{name}'")]
    MissingScalar { name: String },
    #[error("unknown operation '{name}'")]
    UnknownOperation { name: String },
    #[error("no builder is named '{name}'")]
    UnknownBuilder { name: String },
    #[error("no transform named '{transform}' is registered for '{builder}'")]
    UnknownTransform { builder: String, transform: String },
    /// returned in strict mode if patches do not identify a single concrete type
    #[error("cannot choose a concrete type for '{type_name}' among {}", .candidates.join(", "))]
    AmbiguousConcreteType {
        type_name: String,
        candidates: Vec<String>,
    },
    /// a selection or definition kind that is not modelled reached a resolver
    #[error("unsupported shape in {context}: {message}")]
    Shape { context: String, message: String },
    #[error("invalid array patch key '{key}' for '{field}', expected an index, `next`, `last` or `length`")]
    InvalidPatchKey { field: String, key: String },
    #[error("invalid array patch length for '{field}', expected a non-negative integer")]
    InvalidListLength { field: String },
    /// returned if a sparse array patch would grow a list by more than `MAX_LIST_GROWTH` elements
    #[error("array patch for '{field}' grows the list to {length} elements, past the limit of {limit}")]
    ListTooLong { field: String, length: usize, limit: usize },
    /// returned if a mock cannot be turned into the JSON handed to derivations and transforms
    #[error("could not serialize a mock\nCaused by: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("could not parse the generator options\nCaused by: {0}")]
    Options(#[from] toml::de::Error),
}

impl Error {
    pub(crate) fn shape(context: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Shape {
            context: context.into(),
            message: message.into(),
        }
    }
}
