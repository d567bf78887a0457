use super::{Build, History, HistoryLog, TransformRegistry, Transforms};
use crate::{
    error::{Error, Result},
    mock::MockEngine,
    operations::{Operation, OperationKind},
    patch::Patch,
    resolve::ObjectShape,
    schema::TypeRef,
};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use std::{fmt, sync::Arc};

/// The request half of an operation mock, as a client would send it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRequest {
    pub query: String,
    pub variables: Value,
    pub operation_name: String,
}

/// The response half of an operation mock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationResult {
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Value>,
    /// A transport level failure, for clients that distinguish it from GraphQL errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationPayload {
    pub request: OperationRequest,
    pub result: OperationResult,
}

/// Builds request and response mocks of one operation.
#[derive(Clone)]
pub struct OperationBuilder {
    inner: Arc<OperationBuilderInner>,
}

struct OperationBuilderInner {
    operation: Operation,
    engine: MockEngine,
    data: Arc<ObjectShape>,
    variables: Arc<IndexMap<String, TypeRef>>,
    defaults: Vec<Patch>,
    transforms: Transforms,
    history: HistoryLog<OperationPayload>,
}

impl fmt::Debug for OperationBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationBuilder")
            .field("name", &self.inner.operation.export_name)
            .field("kind", &self.inner.operation.kind)
            .field("defaults", &self.inner.defaults.len())
            .field("transforms", &self.inner.transforms)
            .finish_non_exhaustive()
    }
}

/// The patches of each part of an operation mock, bottom first.
#[derive(Default)]
struct Parts {
    variables: Vec<Patch>,
    data: Vec<Patch>,
    errors: Vec<Patch>,
    error: Vec<Patch>,
}

impl OperationBuilder {
    pub(super) fn new(
        operation: Operation,
        engine: MockEngine,
        data: Arc<ObjectShape>,
        defaults: Vec<Patch>,
        transforms: Transforms,
    ) -> Self {
        let variables = Arc::new(operation.variables.clone());

        OperationBuilder {
            inner: Arc::new(OperationBuilderInner {
                operation,
                engine,
                data,
                variables,
                defaults,
                transforms,
                history: HistoryLog::default(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.operation.export_name
    }

    pub fn kind(&self) -> OperationKind {
        self.inner.operation.kind
    }

    pub fn operation(&self) -> &Operation {
        &self.inner.operation
    }

    fn produce(&self, patches: Vec<Patch>) -> Result<OperationMock> {
        let payload = self.synthesize(patches)?;
        self.inner.history.record(payload.clone());

        Ok(OperationMock {
            builder: self.clone(),
            payload,
        })
    }

    fn synthesize(&self, patches: Vec<Patch>) -> Result<OperationPayload> {
        let mut parts = Parts::default();
        let mut applied: Vec<Patch> = Vec::with_capacity(patches.len());

        for patch in patches {
            let patch = match patch {
                Patch::Derive(derive) => {
                    let previous = serde_json::to_value(self.synthesize(applied.clone())?)?;
                    derive.apply(&previous)
                }
                other => other,
            };

            applied.push(patch.clone());
            self.split(patch, &mut parts)?;
        }

        let operation = &self.inner.operation;

        let variables = self
            .inner
            .engine
            .synthesize_variables(&operation.variables_name(), self.inner.variables.clone(), parts.variables)?
            .to_json()?;

        let data = self
            .inner
            .engine
            .synthesize_selection(self.inner.data.clone(), parts.data)?
            .to_json()?;

        Ok(OperationPayload {
            request: OperationRequest {
                query: operation.source.to_string(),
                variables,
                operation_name: operation.name.clone(),
            },
            result: OperationResult {
                data,
                errors: top_most(parts.errors),
                error: top_most(parts.error),
            },
        })
    }

    fn split(&self, patch: Patch, parts: &mut Parts) -> Result<()> {
        let fields = match patch.into_structured() {
            Patch::Object(fields) => fields,
            other => {
                return Err(Error::shape(
                    format!("a patch of '{}'", self.name()),
                    format!("expected an operation patch, got {}", other.to_json()),
                ))
            }
        };

        for (key, value) in fields {
            let part = match key.as_str() {
                "variables" => &mut parts.variables,
                "data" => &mut parts.data,
                "errors" => &mut parts.errors,
                "error" => &mut parts.error,
                _ => {
                    return Err(Error::UnknownField {
                        type_name: self.name().to_owned(),
                        field: key,
                        context: "an operation patch".to_owned(),
                    })
                }
            };

            part.push(value);
        }

        Ok(())
    }
}

/// The value of the top-most patch. Derivations see the value below them.
fn top_most(patches: Vec<Patch>) -> Option<Value> {
    patches.into_iter().fold(None, |current, patch| {
        let patch = match patch {
            Patch::Derive(derive) => derive.apply(current.as_ref().unwrap_or(&Value::Null)),
            other => other,
        };

        Some(patch.to_json())
    })
}

impl Build for OperationBuilder {
    type Output = OperationMock;

    fn build(&self, patches: Vec<Patch>) -> Result<OperationMock> {
        let mut stack = self.inner.defaults.clone();
        stack.extend(patches);

        self.produce(stack)
    }
}

impl TransformRegistry for OperationBuilder {
    fn builder_name(&self) -> &str {
        self.name()
    }

    fn transforms(&self) -> &Transforms {
        &self.inner.transforms
    }
}

impl History for OperationBuilder {
    type Item = OperationPayload;

    fn log(&self) -> &HistoryLog<OperationPayload> {
        &self.inner.history
    }
}

/// A materialized request and response of an operation. Serializes as
/// `{ request: { query, variables, operationName }, result: { data, errors?, error? } }`.
#[derive(Debug, Clone)]
pub struct OperationMock {
    builder: OperationBuilder,
    payload: OperationPayload,
}

impl OperationMock {
    pub fn request(&self) -> &OperationRequest {
        &self.payload.request
    }

    pub fn result(&self) -> &OperationResult {
        &self.payload.result
    }

    pub fn payload(&self) -> &OperationPayload {
        &self.payload
    }

    pub fn into_payload(self) -> OperationPayload {
        self.payload
    }

    pub fn builder(&self) -> &OperationBuilder {
        &self.builder
    }

    /// A new mock with `patches` stacked on this one. Defaults are not applied again.
    pub fn patch(&self, patches: Vec<Patch>) -> Result<OperationMock> {
        let mut stack = Vec::with_capacity(patches.len() + 1);
        stack.push(self.as_patch());
        stack.extend(patches);

        self.builder.produce(stack)
    }

    /// Calls a registered transform with the serialized mock and stacks the returned patch.
    pub fn transform(&self, name: &str, args: Value) -> Result<OperationMock> {
        let current = serde_json::to_value(&self.payload)?;
        let patch = self.builder.apply_transform(name, &current, &args)?;

        self.patch(vec![patch])
    }

    fn as_patch(&self) -> Patch {
        let OperationPayload { request, result } = &self.payload;
        let mut fields = Map::new();

        fields.insert("variables".to_owned(), request.variables.clone());
        fields.insert("data".to_owned(), result.data.clone());

        if let Some(errors) = &result.errors {
            fields.insert("errors".to_owned(), errors.clone());
        }

        if let Some(error) = &result.error {
            fields.insert("error".to_owned(), error.clone());
        }

        Patch::from(Value::Object(fields))
    }
}

impl Serialize for OperationMock {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.payload.serialize(serializer)
    }
}
