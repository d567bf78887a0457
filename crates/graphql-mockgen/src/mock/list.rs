use super::{after_reset, MockEngine, MockValue, Position, Shape};
use crate::{
    error::{Error, Result},
    patch::{ListPatch, Patch},
};
use serde_json::Value;

/// Resolves a list from its patch stack.
///
/// Every element keeps its own stack. A literal list patch fixes the length and stacks one
/// slot on each surviving element. A sparse patch stacks its index patches, then `last` on the
/// final element and `next` on the element appended after the previous length.
pub(super) fn resolve_list(
    engine: &MockEngine,
    shape: &Shape,
    element: &Shape,
    entries: &[Patch],
    at: Position<'_>,
) -> Result<MockValue> {
    let Some(layers) = after_reset(engine.flatten(shape, entries, at)?) else {
        return Ok(MockValue::Leaf(Value::Null));
    };

    let mut items: Vec<Vec<Patch>> = Vec::new();

    for layer in layers {
        match layer {
            Patch::List(slots) => {
                items = slots
                    .into_iter()
                    .enumerate()
                    .map(|(index, slot)| {
                        let mut stack = items.get(index).cloned().unwrap_or_default();
                        stack.push(slot);
                        stack
                    })
                    .collect();
            }
            Patch::Object(fields) => {
                let mut sparse = ListPatch::parse(&at.label(), fields)?;
                let previous = items.len();
                let length = sparse.length(previous)?;

                items.resize_with(length, Vec::new);

                for (index, stack) in items.iter_mut().enumerate() {
                    if let Some(patch) = sparse.indexed.remove(&index) {
                        stack.push(patch);
                    }

                    if index + 1 == length {
                        stack.extend(sparse.last.clone());
                    }

                    if index == previous {
                        stack.extend(sparse.next.clone());
                    }
                }
            }
            other => {
                return Err(Error::shape(
                    at.label(),
                    format!("expected a list patch, got {}", other.to_json()),
                ))
            }
        }
    }

    items
        .iter()
        .map(|stack| engine.resolve(element, stack, at))
        .collect::<Result<Vec<_>>>()
        .map(MockValue::List)
}
