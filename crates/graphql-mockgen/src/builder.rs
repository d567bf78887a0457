//! Callable mock builders for every schema type and operation.
//!
//! A builder stacks its default patches under the caller's patches, synthesizes a value and
//! records it. The values it hands out are plain JSON trees: patching or cloning one never
//! affects another.

mod operation;
mod registry;

pub use operation::{OperationBuilder, OperationMock, OperationPayload, OperationRequest, OperationResult};
pub use registry::{History, HistoryLog, Transform, TransformRegistry, Transforms};

use crate::{
    error::{Error, Result},
    mock::{MockEngine, MockOptions, ScalarMocks},
    operations::OperationIndex,
    patch::Patch,
    resolve::{FieldUsage, Resolver},
    schema::{Schema, TypeKind},
};
use indexmap::IndexMap;
use serde_json::Value;
use std::{fmt, sync::Arc};

/// Produces a value from a stack of patches, bottom first.
pub trait Build {
    type Output;

    fn build(&self, patches: Vec<Patch>) -> Result<Self::Output>;
}

/// The builders of one schema and its operations.
#[derive(Debug, Clone)]
pub struct MockBuilders {
    types: IndexMap<String, TypeBuilder>,
    operations: IndexMap<String, OperationBuilder>,
}

/// A builder found by name.
#[derive(Debug, Clone, Copy)]
pub enum Builder<'a> {
    Type(&'a TypeBuilder),
    Operation(&'a OperationBuilder),
}

impl<'a> Builder<'a> {
    pub fn as_type(self) -> Option<&'a TypeBuilder> {
        match self {
            Builder::Type(builder) => Some(builder),
            Builder::Operation(_) => None,
        }
    }

    pub fn as_operation(self) -> Option<&'a OperationBuilder> {
        match self {
            Builder::Operation(builder) => Some(builder),
            Builder::Type(_) => None,
        }
    }
}

impl MockBuilders {
    pub fn builder(schema: Arc<Schema>, operations: Arc<OperationIndex>) -> MockBuildersBuilder {
        MockBuildersBuilder {
            schema,
            operations,
            scalars: ScalarMocks::builtin(),
            defaults: IndexMap::new(),
            transforms: IndexMap::new(),
            options: MockOptions::default(),
        }
    }

    /// Looks up a builder by type name or by operation export name. Operation export names
    /// never collide with type names.
    pub fn get(&self, name: &str) -> Result<Builder<'_>> {
        if let Some(builder) = self.operations.get(name) {
            return Ok(Builder::Operation(builder));
        }

        self.types
            .get(name)
            .map(Builder::Type)
            .ok_or_else(|| Error::UnknownBuilder { name: name.to_owned() })
    }

    pub fn type_builder(&self, name: &str) -> Result<&TypeBuilder> {
        self.types
            .get(name)
            .ok_or_else(|| Error::UnknownBuilder { name: name.to_owned() })
    }

    pub fn operation(&self, export_name: &str) -> Result<&OperationBuilder> {
        self.operations.get(export_name).ok_or_else(|| Error::UnknownOperation {
            name: export_name.to_owned(),
        })
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }
}

pub struct MockBuildersBuilder {
    schema: Arc<Schema>,
    operations: Arc<OperationIndex>,
    scalars: ScalarMocks,
    defaults: IndexMap<String, Vec<Patch>>,
    transforms: IndexMap<String, Transforms>,
    options: MockOptions,
}

impl MockBuildersBuilder {
    /// Adds scalar mocks, replacing the built-in ones of the same name.
    pub fn scalars(mut self, scalars: ScalarMocks) -> Self {
        self.scalars.extend(scalars);
        self
    }

    /// Stacks a patch under every value the builder `name` produces. Defaults of the same
    /// builder stack in the order they are added.
    pub fn default_patch(mut self, name: impl Into<String>, patch: impl Into<Patch>) -> Self {
        self.defaults.entry(name.into()).or_default().push(patch.into());
        self
    }

    pub fn transform(
        mut self,
        name: impl Into<String>,
        transform_name: impl Into<String>,
        transform: impl Fn(&Value, &Value) -> Patch + Send + Sync + 'static,
    ) -> Self {
        self.transforms
            .entry(name.into())
            .or_default()
            .insert(transform_name, Arc::new(transform));

        self
    }

    pub fn options(mut self, options: MockOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Result<MockBuilders> {
        let MockBuildersBuilder {
            schema,
            operations,
            scalars,
            mut defaults,
            mut transforms,
            options,
        } = self;

        let engine = MockEngine::with_options(schema.clone(), scalars, options);
        let mut types = IndexMap::new();

        let buildable = schema.definitions().filter(|definition| {
            matches!(
                definition.kind(),
                TypeKind::Object | TypeKind::Interface | TypeKind::Union | TypeKind::Input
            )
        });

        for definition in buildable {
            let name = definition.name();

            let builder = TypeBuilder {
                inner: Arc::new(TypeBuilderInner {
                    name: name.to_owned(),
                    engine: engine.clone(),
                    defaults: defaults.shift_remove(name).unwrap_or_default(),
                    transforms: transforms.shift_remove(name).unwrap_or_default(),
                    history: HistoryLog::default(),
                }),
            };

            types.insert(name.to_owned(), builder);
        }

        // Typenames are always selected in mock data, so values of abstract fields tell their type.
        let resolver = Resolver::new(&schema, operations.fragments(), true);
        let mut usage = FieldUsage::default();
        let mut operation_builders = IndexMap::new();

        for operation in operations.operations() {
            let shape = resolver.resolve_operation(operation, &mut usage)?;
            let name = operation.export_name.as_str();

            let builder = OperationBuilder::new(
                operation.clone(),
                engine.clone(),
                Arc::new(shape),
                defaults.shift_remove(name).unwrap_or_default(),
                transforms.shift_remove(name).unwrap_or_default(),
            );

            operation_builders.insert(name.to_owned(), builder);
        }

        if let Some(name) = defaults.keys().chain(transforms.keys()).next() {
            return Err(Error::UnknownBuilder { name: name.clone() });
        }

        tracing::debug!(
            types = types.len(),
            operations = operation_builders.len(),
            "created mock builders"
        );

        Ok(MockBuilders {
            types,
            operations: operation_builders,
        })
    }
}

/// Builds mocks of one schema object, interface, union or input type. Clones share their
/// defaults, transforms and history.
#[derive(Clone)]
pub struct TypeBuilder {
    inner: Arc<TypeBuilderInner>,
}

struct TypeBuilderInner {
    name: String,
    engine: MockEngine,
    defaults: Vec<Patch>,
    transforms: Transforms,
    history: HistoryLog<Value>,
}

impl fmt::Debug for TypeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeBuilder")
            .field("name", &self.inner.name)
            .field("defaults", &self.inner.defaults.len())
            .field("transforms", &self.inner.transforms)
            .finish_non_exhaustive()
    }
}

impl TypeBuilder {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    fn produce(&self, patches: Vec<Patch>) -> Result<TypeMock> {
        let value = self.inner.engine.synthesize(&self.inner.name, patches)?.to_json()?;
        self.inner.history.record(value.clone());

        Ok(TypeMock {
            builder: self.clone(),
            value,
        })
    }
}

impl Build for TypeBuilder {
    type Output = TypeMock;

    fn build(&self, patches: Vec<Patch>) -> Result<TypeMock> {
        let mut stack = self.inner.defaults.clone();
        stack.extend(patches);

        self.produce(stack)
    }
}

impl TransformRegistry for TypeBuilder {
    fn builder_name(&self) -> &str {
        &self.inner.name
    }

    fn transforms(&self) -> &Transforms {
        &self.inner.transforms
    }
}

impl History for TypeBuilder {
    type Item = Value;

    fn log(&self) -> &HistoryLog<Value> {
        &self.inner.history
    }
}

/// A materialized mock of a schema type. Cloning copies the whole value.
#[derive(Debug, Clone)]
pub struct TypeMock {
    builder: TypeBuilder,
    value: Value,
}

impl TypeMock {
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn builder(&self) -> &TypeBuilder {
        &self.builder
    }

    /// A new mock with `patches` stacked on this one. Defaults are not applied again.
    pub fn patch(&self, patches: Vec<Patch>) -> Result<TypeMock> {
        let mut stack = Vec::with_capacity(patches.len() + 1);
        stack.push(Patch::from(self.value.clone()));
        stack.extend(patches);

        self.builder.produce(stack)
    }

    pub fn transform(&self, name: &str, args: Value) -> Result<TypeMock> {
        let patch = self.builder.apply_transform(name, &self.value, &args)?;
        self.patch(vec![patch])
    }
}

impl PartialEq for TypeMock {
    fn eq(&self, other: &Self) -> bool {
        self.builder.name() == other.builder.name() && self.value == other.value
    }
}
