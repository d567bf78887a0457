#![cfg_attr(test, allow(unused_crate_dependencies))]

//! TypeScript declarations and layered mock builders for GraphQL schemas and operations.
//!
//! ```ignore
//! let schema = Arc::new(Schema::parse(&sdl)?);
//! let operations = Arc::new(OperationIndex::from_sources(&schema, documents)?);
//!
//! let declarations = Codegen::new(&schema, &operations, &Options::default()).generate()?;
//!
//! let builders = MockBuilders::builder(schema, operations).build()?;
//! let user = builders.type_builder("User")?.build(vec![json!({ "name": "Ada" }).into()])?;
//! ```

pub mod builder;
pub mod codegen;
mod error;
pub mod mock;
pub mod operations;
pub mod patch;
pub mod resolve;
pub mod schema;

pub use self::{
    builder::{Build, History, MockBuilders, OperationMock, TransformRegistry, TypeMock},
    codegen::{Codegen, Options},
    error::{Error, Result},
    mock::{MockEngine, MockOptions, ScalarMock, ScalarMocks},
    operations::{DocumentCache, DocumentLoader, FileSystemLoader, MemoryLoader, OperationIndex, OperationKind},
    patch::{Derive, Patch},
    schema::Schema,
};
