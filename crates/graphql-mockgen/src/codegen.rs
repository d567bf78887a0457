//! TypeScript declarations for the schema types and operations of a run.

mod options;
mod typescript;

pub use options::{EnumStyle, ExportOptions, ExternalOptions, Naming, Options, DEFAULT_ENUMS_MODULE};

use self::typescript::{indent, quote, render_record, Renderer};
use crate::{
    error::{Error, Result},
    operations::{Operation, OperationIndex, OperationKind},
    resolve::{FieldUsage, ObjectShape, Resolver},
    schema::{Schema, TypeDefinition},
};
use indexmap::IndexSet;
use itertools::Itertools;

pub struct Codegen<'a> {
    schema: &'a Schema,
    operations: &'a OperationIndex,
    options: &'a Options,
}

impl<'a> Codegen<'a> {
    pub fn new(schema: &'a Schema, operations: &'a OperationIndex, options: &'a Options) -> Self {
        Codegen {
            schema,
            operations,
            options,
        }
    }

    /// Resolves every operation, then renders the whole module. Nothing is returned unless
    /// every referenced type, field, fragment and scalar resolves.
    pub fn generate(&self) -> Result<String> {
        let resolver = Resolver::new(self.schema, self.operations.fragments(), self.options.typename);
        let mut usage = FieldUsage::default();

        let resolved: Vec<(&Operation, ObjectShape)> = self
            .operations
            .operations()
            .map(|operation| Ok((operation, resolver.resolve_operation(operation, &mut usage)?)))
            .collect::<Result<_>>()?;

        let mut renderer = Renderer::new(self.schema, self.options.typename);
        let types_export = if self.options.export.types { "export " } else { "" };
        let operations_export = if self.options.export.operations { "export " } else { "" };

        let mut external_imports = Vec::new();

        let mut type_statements = Vec::new();
        let declared: Vec<&TypeDefinition> = self
            .schema
            .definitions()
            .filter(|definition| !self.schema.is_root_type(definition.name()))
            .filter(|definition| is_declared(definition, &usage))
            .collect();

        for definition in &declared {
            let Some(body) = renderer.render_definition(definition, &usage) else {
                continue;
            };

            match &self.options.external {
                Some(external) => external_imports.push((external.naming.apply(definition.name()), definition.name().to_owned())),
                None => type_statements.push(format!("{types_export}type {} = {body};", definition.name())),
            }
        }

        if !declared.is_empty() {
            let names: Vec<&str> = declared.iter().map(|definition| definition.name()).collect();
            type_statements.extend(registry(types_export, "Types", "types", &names));
        }

        let inputs = self.reachable_inputs()?;
        let mut input_statements = Vec::new();

        for name in &inputs {
            let Some(TypeDefinition::Input(input)) = self.schema.definition(name) else {
                continue;
            };

            let body = renderer.render_arguments(&input.fields);

            match &self.options.external {
                Some(external) => external_imports.push((external.naming.apply(name), name.clone())),
                None => input_statements.push(format!("{types_export}type {name} = {body};")),
            }
        }

        if !inputs.is_empty() {
            let names: Vec<&str> = inputs.iter().map(String::as_str).collect();
            input_statements.extend(registry(types_export, "Inputs", "inputs", &names));
        }

        let mut operation_statements = Vec::new();

        for (operation, shape) in &resolved {
            let result = renderer.render_shape(shape, 0);
            let variables = renderer.render_arguments(&operation.variables);

            match &self.options.external {
                Some(external) => {
                    let mut name = external.naming.apply(&operation.name);

                    if !external.omit_operation_suffix {
                        name.push_str(operation.kind.type_name());
                    }

                    external_imports.push((format!("{name}Variables"), operation.variables_name()));
                    external_imports.push((name, operation.export_name.clone()));
                }
                None => {
                    operation_statements.push(format!("{operations_export}type {} = {result};", operation.export_name));
                    operation_statements.push(format!(
                        "{operations_export}type {} = {variables};",
                        operation.variables_name()
                    ));
                }
            }
        }

        for kind in OperationKind::ALL {
            operation_statements.extend(self.operation_registry(kind, operations_export));
        }

        let scalar_statements = renderer
            .leaves
            .scalars
            .iter()
            .sorted_by_key(|name| self.position(name))
            .map(|name| {
                let declaration = self
                    .options
                    .scalar(name)
                    .ok_or_else(|| Error::MissingScalar { name: name.clone() })?;

                Ok(format!("{types_export}type {name} = {declaration};"))
            })
            .collect::<Result<Vec<_>>>()?;

        let enum_statements = self.enum_statements(&renderer.leaves.enums, types_export);

        let mut statements: Vec<String> = self.options.banner.iter().cloned().collect();

        if let Some(external) = &self.options.external {
            if !external_imports.is_empty() {
                let specifiers = external_imports
                    .iter()
                    .map(|(external_name, local)| {
                        if external_name == local {
                            local.clone()
                        } else {
                            format!("{external_name} as {local}")
                        }
                    });

                statements.push(format!(
                    "import type {} from {};",
                    render_list(specifiers),
                    quote(&external.module)
                ));
            }
        }

        statements.extend(scalar_statements);
        statements.extend(enum_statements);
        statements.extend(type_statements);
        statements.extend(input_statements);
        statements.extend(operation_statements);

        tracing::debug!(statements = statements.len(), "generated declarations");

        Ok(statements.into_iter().map(|statement| statement + "\n").join("\n"))
    }

    fn position(&self, name: &str) -> usize {
        self.schema
            .definitions()
            .position(|definition| definition.name() == name)
            .unwrap_or(usize::MAX)
    }

    fn enum_statements(&self, used: &IndexSet<String>, export: &str) -> Vec<String> {
        let names: Vec<&String> = used.iter().sorted_by_key(|name| self.position(name)).collect();

        match &self.options.enums {
            EnumStyle::Omit => Vec::new(),
            EnumStyle::Import { module } if !names.is_empty() => {
                let specifiers = names.iter().map(|name| name.to_string());
                vec![format!("import type {} from {};", render_list(specifiers), quote(module))]
            }
            EnumStyle::Import { .. } => Vec::new(),
            EnumStyle::Literals => names
                .iter()
                .map(|name| {
                    let values = self.schema.enum_values(name).unwrap_or_default();
                    let body = if values.is_empty() {
                        "never".to_owned()
                    } else {
                        values.iter().map(|value| quote(value)).join(" | ")
                    };

                    format!("{export}type {name} = {body};")
                })
                .collect(),
            EnumStyle::Enum => names
                .iter()
                .map(|name| {
                    let members = self
                        .schema
                        .enum_values(name)
                        .unwrap_or_default()
                        .iter()
                        .map(|value| format!("  {value} = {},\n", quote(value)))
                        .join("");

                    format!("{export}enum {name} {{\n{members}}}")
                })
                .collect(),
        }
    }

    /// Input types reachable from operation variables, in schema order.
    fn reachable_inputs(&self) -> Result<Vec<String>> {
        let mut reached: IndexSet<String> = IndexSet::new();
        let mut pending: Vec<(String, String)> = self
            .operations
            .operations()
            .flat_map(|operation| {
                operation.variables.values().map(move |ty| {
                    (
                        ty.named_type().to_owned(),
                        format!("the variables of {} {}", operation.kind, operation.name),
                    )
                })
            })
            .collect();

        while let Some((name, context)) = pending.pop() {
            let TypeDefinition::Input(input) = self.schema.lookup(&name, &context)? else {
                continue;
            };

            if !reached.insert(name.clone()) {
                continue;
            }

            pending.extend(
                input
                    .fields
                    .values()
                    .map(|ty| (ty.named_type().to_owned(), format!("the input type '{name}'"))),
            );
        }

        Ok(self
            .schema
            .definitions()
            .filter(|definition| reached.contains(definition.name()))
            .map(|definition| definition.name().to_owned())
            .collect())
    }

    fn operation_registry(&self, kind: OperationKind, export: &str) -> Vec<String> {
        let operations: Vec<&Operation> = self.operations.of_kind(kind).collect();

        if operations.is_empty() {
            return Vec::new();
        }

        let entries = operations.iter().map(|operation| {
            let entry = render_record(
                [
                    ("data", operation.export_name.clone()),
                    ("variables", operation.variables_name()),
                ],
                ';',
            );

            (operation.export_name.as_str(), indent(&entry))
        });

        let paths = operations.iter().map(|operation| {
            let path = operation.path.to_string_lossy().replace('\\', "/");
            (operation.export_name.as_str(), quote(&path))
        });

        vec![
            format!("{export}type {} = {};", kind.type_name(), render_record(entries, ';')),
            format!("{export}const {} = {} as const;", kind.plural(), render_record(paths, ',')),
        ]
    }
}

/// Objects and interfaces are declared once a field of theirs is selected, unions once one of
/// their members is.
fn is_declared(definition: &TypeDefinition, usage: &FieldUsage) -> bool {
    match definition {
        TypeDefinition::Object(_) | TypeDefinition::Interface(_) => usage.has_fields(definition.name()),
        TypeDefinition::Union(union) => {
            usage.is_touched(&union.name) && union.members.iter().any(|member| usage.has_fields(member))
        }
        TypeDefinition::Input(_) | TypeDefinition::Enum(_) | TypeDefinition::Scalar(_) => false,
    }
}

/// A type registry keyed by name, plus the constant list of its names.
fn registry(export: &str, type_name: &str, list_name: &str, names: &[&str]) -> [String; 2] {
    let entries = names.iter().map(|name| (*name, name.to_string()));
    let list = names.iter().map(|name| quote(name)).join(", ");

    [
        format!("{export}type {type_name} = {};", render_record(entries, ';')),
        format!("{export}const {list_name} = [{list}] as const;"),
    ]
}

/// `{\n  a,\n  b,\n}` for import specifier lists.
fn render_list(items: impl Iterator<Item = String>) -> String {
    let items = items.map(|item| format!("  {item},\n")).join("");
    format!("{{\n{items}}}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;
    use indoc::indoc;

    #[test]
    fn enum_styles() {
        let schema = Schema::parse(indoc! {r#"
            enum Status { Active Disabled }
            type Query { status: Status! }
        "#})
        .unwrap();
        let index = OperationIndex::from_sources(&schema, [("s.graphql", "query S { status }")]).unwrap();

        let generate = |enums: EnumStyle| {
            let options = Options {
                enums,
                export: ExportOptions {
                    types: true,
                    operations: false,
                },
                ..Options::default()
            };

            Codegen::new(&schema, &index, &options).generate().unwrap()
        };

        expect![[r#"
            export enum Status {
              Active = "Active",
              Disabled = "Disabled",
            }

            type S = {
              status: Status;
            };

            type SVariables = {};

            type Query = {
              S: {
                data: S;
                variables: SVariables;
              };
            };

            const queries = {
              S: "s.graphql",
            } as const;
        "#]]
        .assert_eq(&generate(EnumStyle::Enum));

        let imported = generate(EnumStyle::Import {
            module: DEFAULT_ENUMS_MODULE.to_owned(),
        });
        assert!(imported.starts_with("import type {\n  Status,\n} from \"./enums\";\n\ntype S = {"));

        let omitted = generate(EnumStyle::Omit);
        assert!(omitted.starts_with("type S = {"));
    }

    #[test]
    fn only_types_with_selected_fields_are_declared() {
        let schema = Schema::parse(indoc! {r#"
            type User { id: ID! name: String }
            type Cat { lives: Int }
            union Mate = User | Cat
            type Query { me: User mate: Mate }
        "#})
        .unwrap();

        let reached = OperationIndex::from_sources(&schema, [(
            "touch.graphql",
            "query Touch { me { __typename } mate { __typename } }",
        )])
        .unwrap();
        let generated = Codegen::new(&schema, &reached, &Options::default()).generate().unwrap();

        assert!(!generated.contains("type User ="), "{generated}");
        assert!(!generated.contains("type Mate ="), "{generated}");
        assert!(!generated.contains("Types"), "{generated}");

        let selected = OperationIndex::from_sources(&schema, [("pick.graphql", "query Pick { mate { ... on User { id } } }")])
            .unwrap();
        let generated = Codegen::new(&schema, &selected, &Options::default()).generate().unwrap();

        assert!(generated.contains("export type User = {\n  __typename: \"User\";\n  id: ID;\n};"), "{generated}");
        assert!(generated.contains("export type Mate = User | {\n  __typename: \"Cat\";\n};"), "{generated}");
        assert!(generated.contains("export const types = [\"User\", \"Mate\"] as const;"), "{generated}");
    }

    #[test]
    fn missing_scalar_mapping() {
        let schema = Schema::parse("scalar DateTime type Query { now: DateTime! }").unwrap();
        let index = OperationIndex::from_sources(&schema, [("now.graphql", "query Now { now }")]).unwrap();

        let error = Codegen::new(&schema, &index, &Options::default()).generate().unwrap_err();

        assert_eq!(error.to_string(), "no mapping is configured for the scalar 'DateTime'");
    }
}
