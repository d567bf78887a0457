use crate::{
    error::{Error, Result},
    patch::Patch,
};
use indexmap::IndexMap;
use serde_json::Value;
use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// A named transform: called with the current value and the caller's arguments, returns the
/// patch stacked on top of the value.
pub type Transform = Arc<dyn Fn(&Value, &Value) -> Patch + Send + Sync>;

/// The transforms registered for one builder.
#[derive(Clone, Default)]
pub struct Transforms {
    transforms: IndexMap<String, Transform>,
}

impl fmt::Debug for Transforms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.transforms.keys()).finish()
    }
}

impl Transforms {
    pub fn insert(&mut self, name: impl Into<String>, transform: Transform) {
        self.transforms.insert(name.into(), transform);
    }

    pub fn get(&self, name: &str) -> Option<&Transform> {
        self.transforms.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.transforms.keys().map(String::as_str)
    }
}

pub trait TransformRegistry {
    /// The name the transforms are registered under.
    fn builder_name(&self) -> &str;

    fn transforms(&self) -> &Transforms;

    fn transform_names(&self) -> Vec<&str> {
        self.transforms().names().collect()
    }

    fn apply_transform(&self, name: &str, current: &Value, args: &Value) -> Result<Patch> {
        let transform = self.transforms().get(name).ok_or_else(|| Error::UnknownTransform {
            builder: self.builder_name().to_owned(),
            transform: name.to_owned(),
        })?;

        tracing::trace!(builder = self.builder_name(), transform = name, "applying transform");

        Ok(transform(current, args))
    }
}

/// Values a builder produced, oldest first.
#[derive(Debug)]
pub struct HistoryLog<T> {
    entries: Mutex<Vec<T>>,
}

impl<T> Default for HistoryLog<T> {
    fn default() -> Self {
        HistoryLog {
            entries: Mutex::new(Vec::new()),
        }
    }
}

impl<T: Clone> HistoryLog<T> {
    pub(crate) fn record(&self, item: T) {
        self.lock().push(item);
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn last(&self) -> Option<T> {
        self.lock().last().cloned()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    // Entries are pushed whole, a poisoned log is still consistent.
    fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Builders remember every value they produce.
pub trait History {
    type Item: Clone;

    fn log(&self) -> &HistoryLog<Self::Item>;

    fn history(&self) -> Vec<Self::Item> {
        self.log().snapshot()
    }

    fn len(&self) -> usize {
        self.log().len()
    }

    fn is_empty(&self) -> bool {
        self.log().is_empty()
    }

    fn last(&self) -> Option<Self::Item> {
        self.log().last()
    }

    fn clear_history(&self) {
        self.log().clear();
    }
}
