use super::Operation;
use crate::schema::Schema;

/// Suffixes an operation name with its root kind when the bare name would clash with a schema
/// type or with an operation of another kind. Types, queries, mutations and subscriptions share
/// one generated namespace.
pub(super) fn assign_export_names(operations: &mut [Operation], schema: &Schema) {
    let collisions: Vec<bool> = operations
        .iter()
        .map(|operation| {
            schema.definition(&operation.name).is_some()
                || operations
                    .iter()
                    .any(|other| other.kind != operation.kind && other.name == operation.name)
        })
        .collect();

    for (operation, collides) in operations.iter_mut().zip(collisions) {
        operation.export_name = if collides {
            tracing::debug!(name = %operation.name, kind = %operation.kind, "disambiguating operation name");
            format!("{}{}", operation.name, operation.kind.type_name())
        } else {
            operation.name.clone()
        };
    }
}
