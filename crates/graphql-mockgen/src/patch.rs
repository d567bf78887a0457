//! Overrides applied on top of synthesized mock values.
//!
//! Patches are stacked: later patches win field by field, earlier ones fill the gaps. Object
//! patches applied to list positions use the sparse list form, keyed by index or by one of the
//! reserved keys `next`, `last` and `length`.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde_json::Value;
use std::{collections::BTreeMap, fmt, sync::Arc};

#[derive(Clone, Debug)]
pub enum Patch {
    /// A replacement value.
    Value(Value),
    /// A partial patch of an object, or a sparse patch of a list.
    Object(IndexMap<String, Patch>),
    /// A patch of every element of a list, also fixing its length.
    List(Vec<Patch>),
    /// A patch computed from the value the layers below produce.
    Derive(Derive),
}

impl Patch {
    /// The patch changing nothing.
    pub fn empty() -> Self {
        Patch::Object(IndexMap::new())
    }

    pub fn derive(f: impl Fn(&Value) -> Patch + Send + Sync + 'static) -> Self {
        Patch::Derive(Derive(Arc::new(f)))
    }

    /// Sets `key` on an object patch. Any other patch is replaced by an object patch first.
    pub fn field(self, key: impl Into<String>, patch: impl Into<Patch>) -> Self {
        let mut fields = match self.into_structured() {
            Patch::Object(fields) => fields,
            _ => IndexMap::new(),
        };

        fields.insert(key.into(), patch.into());
        Patch::Object(fields)
    }

    /// The JSON this patch stands for on its own. Derivations see `null` as previous value.
    pub fn to_json(&self) -> Value {
        match self {
            Patch::Value(value) => value.clone(),
            Patch::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(key, patch)| (key.clone(), patch.to_json()))
                    .collect(),
            ),
            Patch::List(items) => Value::Array(items.iter().map(Patch::to_json).collect()),
            Patch::Derive(derive) => derive.apply(&Value::Null).to_json(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Patch::Value(Value::Null))
    }

    /// Splits JSON objects and arrays held in `Value` into `Object` and `List` patches.
    pub(crate) fn into_structured(self) -> Self {
        match self {
            Patch::Value(value @ (Value::Object(_) | Value::Array(_))) => Patch::from(value),
            other => other,
        }
    }
}

impl From<Value> for Patch {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(fields) => Patch::Object(fields.into_iter().map(|(key, value)| (key, Patch::from(value))).collect()),
            Value::Array(items) => Patch::List(items.into_iter().map(Patch::from).collect()),
            other => Patch::Value(other),
        }
    }
}

impl From<Derive> for Patch {
    fn from(derive: Derive) -> Self {
        Patch::Derive(derive)
    }
}

#[derive(Clone)]
pub struct Derive(Arc<dyn Fn(&Value) -> Patch + Send + Sync>);

impl Derive {
    pub fn new(f: impl Fn(&Value) -> Patch + Send + Sync + 'static) -> Self {
        Derive(Arc::new(f))
    }

    /// Calls the function until it yields something other than another derivation.
    pub fn apply(&self, previous: &Value) -> Patch {
        let mut patch = (self.0)(previous);

        while let Patch::Derive(derive) = patch {
            patch = (derive.0)(previous);
        }

        patch
    }
}

impl fmt::Debug for Derive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Derive(..)")
    }
}

/// How far past its previous length a sparse patch may grow a list.
pub(crate) const MAX_LIST_GROWTH: usize = 10_000;

/// The sparse form of a list patch.
#[derive(Debug, Default)]
pub(crate) struct ListPatch {
    field: String,
    pub indexed: BTreeMap<usize, Patch>,
    pub next: Option<Patch>,
    pub last: Option<Patch>,
    pub length: Option<usize>,
}

impl ListPatch {
    pub fn parse(field: &str, fields: IndexMap<String, Patch>) -> Result<Self> {
        let mut patch = ListPatch {
            field: field.to_owned(),
            ..ListPatch::default()
        };

        for (key, value) in fields {
            match key.as_str() {
                "next" => patch.next = Some(value),
                "last" => patch.last = Some(value),
                "length" => {
                    let length = match &value {
                        Patch::Value(Value::Number(number)) => number.as_u64(),
                        _ => None,
                    };

                    let length = length
                        .and_then(|length| usize::try_from(length).ok())
                        .ok_or_else(|| Error::InvalidListLength {
                            field: field.to_owned(),
                        })?;

                    patch.length = Some(length);
                }
                index => {
                    let index = index.parse::<usize>().map_err(|_| Error::InvalidPatchKey {
                        field: field.to_owned(),
                        key: key.clone(),
                    })?;

                    patch.indexed.insert(index, value);
                }
            }
        }

        Ok(patch)
    }

    /// The length of the patched list, given the length of the list below it.
    pub fn length(&self, previous: usize) -> Result<usize> {
        let limit = previous.saturating_add(MAX_LIST_GROWTH);
        let too_long = |length: usize| Error::ListTooLong {
            field: self.field.clone(),
            length,
            limit,
        };

        if let Some(length) = self.length {
            return if length > limit { Err(too_long(length)) } else { Ok(length) };
        }

        let indexed = match self.indexed.keys().next_back() {
            Some(&index) => index.checked_add(1).ok_or_else(|| Error::InvalidPatchKey {
                field: self.field.clone(),
                key: index.to_string(),
            })?,
            None => 0,
        };

        if indexed > limit {
            return Err(too_long(indexed));
        }

        let next = if self.next.is_some() { previous.saturating_add(1) } else { 0 };
        let last = if self.last.is_some() { previous.max(1) } else { 0 };

        Ok(previous.max(indexed).max(next).max(last))
    }
}
