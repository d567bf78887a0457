use crate::{
    resolve::{FieldUsage, ObjectShape, SerializedType},
    schema::{Schema, TypeDefinition, TypeKind, TypeRef},
};
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;

const INDENT: &str = "  ";

/// Scalars and enums referenced by rendered declarations.
#[derive(Debug, Default)]
pub(super) struct Leaves {
    pub scalars: IndexSet<String>,
    pub enums: IndexSet<String>,
}

pub(super) struct Renderer<'a> {
    schema: &'a Schema,
    typename: bool,
    pub leaves: Leaves,
}

impl<'a> Renderer<'a> {
    pub fn new(schema: &'a Schema, typename: bool) -> Self {
        Renderer {
            schema,
            typename,
            leaves: Leaves::default(),
        }
    }

    fn note_leaf(&mut self, name: &str) {
        match self.schema.kind_of(name) {
            Some(TypeKind::Scalar) => {
                self.leaves.scalars.insert(name.to_owned());
            }
            Some(TypeKind::Enum) => {
                self.leaves.enums.insert(name.to_owned());
            }
            _ => (),
        }
    }

    pub fn render_type(&mut self, ty: &SerializedType, depth: usize) -> String {
        let (rendered, nullable) = match ty {
            SerializedType::Name { name, nullable } => {
                self.note_leaf(name);
                (name.clone(), *nullable)
            }
            SerializedType::List { element, nullable } => {
                (format!("Array<{}>", self.render_type(element, depth)), *nullable)
            }
            SerializedType::Object(shape) => (self.render_shape(shape, depth), shape.nullable),
            SerializedType::Literal(value) => (quote(value), false),
        };

        with_null(rendered, nullable)
    }

    /// Renders a selection shape: shared fields intersected with the union of discriminated
    /// branches, then with every conditional branch.
    pub fn render_shape(&mut self, shape: &ObjectShape, depth: usize) -> String {
        let mut alternatives: Vec<String> = shape
            .discriminated_branches()
            .map(|branch| self.render_fields(&branch.fields, depth))
            .collect();

        // Without branches a selected `__typename` spans every possible type.
        let typename = (self.typename && shape.selects_typename && alternatives.is_empty())
            .then(|| shape.undiscriminated.iter().map(|name| quote(name)).join(" | "))
            .filter(|literals| !literals.is_empty());

        let base = (typename.is_some() || !shape.fields.is_empty())
            .then(|| self.render_fields_with(typename, &shape.fields, depth));

        if !alternatives.is_empty() && !shape.undiscriminated.is_empty() {
            let tail = if self.typename {
                typename_tail(&shape.undiscriminated, depth)
            } else {
                "{}".to_owned()
            };

            alternatives.push(tail);
        }

        let conditionals: Vec<String> = shape
            .conditional_branches()
            .map(|branch| format!("({} | {{}})", self.render_shape(branch, depth)))
            .collect();

        let mut parts: Vec<String> = base.into_iter().collect();

        if !alternatives.is_empty() {
            let union = alternatives.join(" | ");

            if parts.is_empty() && conditionals.is_empty() {
                return union;
            }

            parts.push(format!("({union})"));
        }

        parts.extend(conditionals);

        if parts.is_empty() {
            return "{}".to_owned();
        }

        parts.join(" & ")
    }

    fn render_fields(&mut self, fields: &IndexMap<String, SerializedType>, depth: usize) -> String {
        self.render_fields_with(None, fields, depth)
    }

    fn render_fields_with(
        &mut self,
        typename: Option<String>,
        fields: &IndexMap<String, SerializedType>,
        depth: usize,
    ) -> String {
        if typename.is_none() && fields.is_empty() {
            return "{}".to_owned();
        }

        let padding = INDENT.repeat(depth + 1);
        let mut out = String::from("{\n");

        if let Some(typename) = typename {
            out.push_str(&format!("{padding}__typename: {typename};\n"));
        }

        for (name, ty) in fields {
            let rendered = self.render_type(ty, depth + 1);
            out.push_str(&format!("{padding}{name}: {rendered};\n"));
        }

        out.push_str(&INDENT.repeat(depth));
        out.push('}');
        out
    }

    pub fn render_type_ref(&mut self, ty: &TypeRef) -> String {
        match ty {
            TypeRef::Named { name, nullable } => {
                self.note_leaf(name);
                with_null(name.clone(), *nullable)
            }
            TypeRef::List { element, nullable } => {
                with_null(format!("Array<{}>", self.render_type_ref(element)), *nullable)
            }
        }
    }

    /// `{ field?: T | null; }` for inputs and variables, where nullable means optional.
    pub fn render_arguments<'b>(&mut self, fields: impl IntoIterator<Item = (&'b String, &'b TypeRef)>) -> String {
        let mut out = String::from("{\n");
        let mut empty = true;

        for (name, ty) in fields {
            let optional = if ty.is_nullable() { "?" } else { "" };
            let rendered = self.render_type_ref(ty);
            out.push_str(&format!("{INDENT}{name}{optional}: {rendered};\n"));
            empty = false;
        }

        if empty {
            return "{}".to_owned();
        }

        out.push('}');
        out
    }

    /// The pruned declaration of an object, interface or union type with selected fields.
    pub fn render_definition(&mut self, definition: &TypeDefinition, usage: &FieldUsage) -> Option<String> {
        let fields = |fields: &IndexMap<String, TypeRef>| -> Vec<(String, TypeRef)> {
            fields
                .iter()
                .filter(|(field, _)| usage.is_used(definition.name(), field))
                .map(|(field, ty)| (field.clone(), ty.clone()))
                .collect()
        };

        match definition {
            TypeDefinition::Object(object) => {
                let typename = self.typename.then(|| quote(&object.name));
                Some(self.render_schema_fields(typename, &fields(&object.fields)))
            }
            TypeDefinition::Interface(interface) => {
                let typename = (self.typename && !interface.implementors.is_empty())
                    .then(|| interface.implementors.iter().map(|name| quote(name)).join(" | "));

                Some(self.render_schema_fields(typename, &fields(&interface.fields)))
            }
            TypeDefinition::Union(union) => {
                if union.members.is_empty() {
                    return Some("{}".to_owned());
                }

                let members = union
                    .members
                    .iter()
                    .map(|member| {
                        if usage.has_fields(member) {
                            member.clone()
                        } else if self.typename {
                            typename_tail(std::slice::from_ref(member), 0)
                        } else {
                            "{}".to_owned()
                        }
                    })
                    .join(" | ");

                Some(members)
            }
            TypeDefinition::Input(_) | TypeDefinition::Enum(_) | TypeDefinition::Scalar(_) => None,
        }
    }

    fn render_schema_fields(&mut self, typename: Option<String>, fields: &[(String, TypeRef)]) -> String {
        if typename.is_none() && fields.is_empty() {
            return "{}".to_owned();
        }

        let mut out = String::from("{\n");

        if let Some(typename) = typename {
            out.push_str(&format!("{INDENT}__typename: {typename};\n"));
        }

        for (name, ty) in fields {
            let rendered = self.render_type_ref(ty);
            out.push_str(&format!("{INDENT}{name}: {rendered};\n"));
        }

        out.push('}');
        out
    }
}

fn with_null(rendered: String, nullable: bool) -> String {
    if nullable {
        format!("{rendered} | null")
    } else {
        rendered
    }
}

fn typename_tail(names: &[String], depth: usize) -> String {
    let literals = names.iter().map(|name| quote(name)).join(" | ");

    format!(
        "{{\n{}__typename: {literals};\n{}}}",
        INDENT.repeat(depth + 1),
        INDENT.repeat(depth)
    )
}

/// A TypeScript string literal.
pub(super) fn quote(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

/// `{\n  key: value;\n}` with the given separator after each entry.
pub(super) fn render_record<'b>(entries: impl IntoIterator<Item = (&'b str, String)>, separator: char) -> String {
    let mut out = String::from("{\n");

    for (key, value) in entries {
        out.push_str(&format!("{INDENT}{key}: {value}{separator}\n"));
    }

    out.push('}');
    out
}

/// Re-indents a multi-line rendering so it can be nested one level deeper.
pub(super) fn indent(rendered: &str) -> String {
    rendered.lines().join(&format!("\n{INDENT}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        operations::{OperationIndex, OperationKind},
        resolve::Resolver,
    };
    use expect_test::expect;
    use indoc::indoc;

    fn render(query: &str) -> String {
        render_with(query, true)
    }

    fn render_with(query: &str, typename: bool) -> String {
        let schema = Schema::parse(indoc! {r#"
            interface Node { id: ID! }
            type A implements Node { id: ID! x: Int }
            type B implements Node { id: ID! y: [String!] }
            type C implements Node { id: ID! }
            type Query { node: Node nodes: [Node]! }
        "#})
        .unwrap();

        let index = OperationIndex::from_sources(&schema, [("q.graphql", query)]).unwrap();
        let operation = index.get(OperationKind::Query, "Q").unwrap();
        let mut usage = FieldUsage::default();
        let shape = Resolver::new(&schema, index.fragments(), typename)
            .resolve_operation(operation, &mut usage)
            .unwrap();

        Renderer::new(&schema, typename).render_shape(&shape, 0)
    }

    #[test]
    fn discriminated_union_with_open_tail() {
        let rendered = render("query Q { node { id ... on A { x } ... on B { y } } }");

        expect![[r#"
            {
              node: {
                id: ID;
              } & ({
                __typename: "A";
                x: Int | null;
              } | {
                __typename: "B";
                y: Array<String> | null;
              } | {
                __typename: "C";
              }) | null;
            }"#]]
        .assert_eq(&rendered);
    }

    #[test]
    fn conditional_branches_are_optional() {
        let rendered = render("query Q($x: Boolean!) { nodes { ... @include(if: $x) { id } } }");

        expect![[r#"
            {
              nodes: Array<({
                id: ID;
              } | {}) | null>;
            }"#]]
        .assert_eq(&rendered);
    }

    #[test]
    fn fully_discriminated_interface_has_no_tail() {
        let rendered = render("query Q { node { ... on A { x } ... on B { y } ... on C { id } } }");

        expect![[r#"
            {
              node: {
                __typename: "A";
                x: Int | null;
              } | {
                __typename: "B";
                y: Array<String> | null;
              } | {
                __typename: "C";
                id: ID;
              } | null;
            }"#]]
        .assert_eq(&rendered);
    }

    #[test]
    fn selected_typename_without_branches_lists_every_possible_type() {
        let rendered = render("query Q { node { __typename id } }");

        expect![[r#"
            {
              node: {
                __typename: "A" | "B" | "C";
                id: ID;
              } | null;
            }"#]]
        .assert_eq(&rendered);
    }

    #[test]
    fn without_typename_unbranched_members_stay_open() {
        let rendered = render_with("query Q { node { id ... on A { x } } }", false);

        expect![[r#"
            {
              node: {
                id: ID;
              } & ({
                x: Int | null;
              } | {}) | null;
            }"#]]
        .assert_eq(&rendered);
    }
}
