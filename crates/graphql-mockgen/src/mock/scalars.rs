use indexmap::IndexMap;
use serde_json::Value;
use std::{fmt, sync::Arc};

/// How values of one scalar are produced when no patch provides them.
#[derive(Clone)]
pub enum ScalarMock {
    Value(Value),
    /// Called with the name of the type declaring the field.
    Generate(Arc<dyn Fn(&str) -> Value + Send + Sync>),
}

impl fmt::Debug for ScalarMock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarMock::Value(value) => f.debug_tuple("Value").field(value).finish(),
            ScalarMock::Generate(_) => f.write_str("Generate(..)"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScalarMocks {
    mocks: IndexMap<String, ScalarMock>,
}

impl ScalarMocks {
    /// Mocks for the built-in scalars. Strings and IDs mention the type declaring the field.
    pub fn builtin() -> Self {
        ScalarMocks::default()
            .generate("ID", |type_name| Value::String(format!("{type_name}-id")))
            .generate("String", |type_name| Value::String(format!("{type_name} string")))
            .value("Int", 0)
            .value("Float", 0.0)
            .value("Boolean", false)
    }

    pub fn value(mut self, scalar: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(scalar, ScalarMock::Value(value.into()));
        self
    }

    pub fn generate(mut self, scalar: impl Into<String>, f: impl Fn(&str) -> Value + Send + Sync + 'static) -> Self {
        self.insert(scalar, ScalarMock::Generate(Arc::new(f)));
        self
    }

    pub fn insert(&mut self, scalar: impl Into<String>, mock: ScalarMock) {
        self.mocks.insert(scalar.into(), mock);
    }

    pub fn extend(&mut self, other: ScalarMocks) {
        self.mocks.extend(other.mocks);
    }

    pub(crate) fn mock(&self, scalar: &str, enclosing_type: &str) -> Option<Value> {
        match self.mocks.get(scalar)? {
            ScalarMock::Value(value) => Some(value.clone()),
            ScalarMock::Generate(generate) => Some(generate(enclosing_type)),
        }
    }
}
