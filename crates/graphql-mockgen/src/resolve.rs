//! Expands selection sets into result shapes.
//!
//! Fragment spreads and inline fragments are grouped by the type they apply to. The group of
//! the selected type becomes the shared field map, every other group becomes a branch. Branches
//! on concrete object types are discriminated by `__typename`, branches on interfaces fan out to
//! one branch per implementor.

use crate::{
    error::{Error, Result},
    operations::{Fragment, Operation, Selection},
    schema::{Schema, TypeKind, TypeRef},
};
use indexmap::{IndexMap, IndexSet};

#[derive(Debug, Clone, PartialEq)]
pub enum SerializedType {
    /// A scalar or enum, referenced by name.
    Name { name: String, nullable: bool },
    List {
        element: Box<SerializedType>,
        nullable: bool,
    },
    Object(ObjectShape),
    /// A string literal, used for `__typename` discriminants.
    Literal(String),
}

impl SerializedType {
    pub fn is_nullable(&self) -> bool {
        match self {
            SerializedType::Name { nullable, .. } | SerializedType::List { nullable, .. } => *nullable,
            SerializedType::Object(shape) => shape.nullable,
            SerializedType::Literal(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectShape {
    /// The type the selection was resolved against.
    pub type_name: String,
    /// Set on branches that only apply to one concrete object type.
    pub discriminant: Option<String>,
    /// Directives guarding a non-discriminated branch, e.g. `@include(if: $full)`.
    pub condition: Option<String>,
    /// Selections shared by every branch.
    pub fields: IndexMap<String, SerializedType>,
    pub branches: Vec<ObjectShape>,
    /// Possible concrete types of an abstract target that no branch discriminates.
    pub undiscriminated: Vec<String>,
    /// `__typename` was selected on an abstract target. Its type is carried by the branches.
    pub selects_typename: bool,
    pub nullable: bool,
}

impl ObjectShape {
    fn new(type_name: &str) -> Self {
        ObjectShape {
            type_name: type_name.to_owned(),
            ..Default::default()
        }
    }

    pub fn discriminated_branches(&self) -> impl Iterator<Item = &ObjectShape> {
        self.branches.iter().filter(|branch| branch.discriminant.is_some())
    }

    pub fn conditional_branches(&self) -> impl Iterator<Item = &ObjectShape> {
        self.branches.iter().filter(|branch| branch.condition.is_some())
    }

    /// The branch a value of `concrete` type matches, if any.
    pub fn branch_for(&self, concrete: &str) -> Option<&ObjectShape> {
        self.branches
            .iter()
            .find(|branch| branch.discriminant.as_deref() == Some(concrete))
    }

    /// Deep merge: nested object shapes merge, anything else is replaced by `other`.
    fn merge(&mut self, other: ObjectShape) {
        merge_fields(&mut self.fields, other.fields);

        for branch in other.branches {
            let existing = self
                .branches
                .iter_mut()
                .find(|existing| existing.discriminant == branch.discriminant && existing.condition == branch.condition);

            match existing {
                Some(existing) => existing.merge(branch),
                None => self.branches.push(branch),
            }
        }

        let discriminated: IndexSet<&str> = self
            .branches
            .iter()
            .filter_map(|branch| branch.discriminant.as_deref())
            .collect();

        self.undiscriminated
            .retain(|name| !discriminated.contains(name.as_str()));

        self.selects_typename |= other.selects_typename;
        self.nullable = other.nullable;
    }
}

pub(crate) fn merge_fields(target: &mut IndexMap<String, SerializedType>, source: IndexMap<String, SerializedType>) {
    for (key, value) in source {
        match target.get_mut(&key) {
            Some(existing) => merge_type(existing, value),
            None => {
                target.insert(key, value);
            }
        }
    }
}

fn merge_type(existing: &mut SerializedType, incoming: SerializedType) {
    match (existing, incoming) {
        (SerializedType::Object(existing), SerializedType::Object(incoming)) => existing.merge(incoming),
        (
            SerializedType::List { element, nullable },
            SerializedType::List {
                element: incoming,
                nullable: incoming_nullable,
            },
        ) => {
            *nullable = incoming_nullable;
            merge_type(element, *incoming);
        }
        (existing, incoming) => *existing = incoming,
    }
}

/// Fields selected per schema type across a whole run. A key is present once the type was
/// reached by any selection, even if no field of it was selected.
#[derive(Debug, Clone, Default)]
pub struct FieldUsage {
    types: IndexMap<String, IndexSet<String>>,
}

impl FieldUsage {
    pub fn touch(&mut self, type_name: &str) {
        if !self.types.contains_key(type_name) {
            self.types.insert(type_name.to_owned(), IndexSet::new());
        }
    }

    pub fn record(&mut self, type_name: &str, field: &str) {
        self.touch(type_name);

        if let Some(fields) = self.types.get_mut(type_name) {
            fields.insert(field.to_owned());
        }
    }

    pub fn is_touched(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    pub fn is_used(&self, type_name: &str, field: &str) -> bool {
        self.types
            .get(type_name)
            .is_some_and(|fields| fields.contains(field))
    }

    /// Whether any field of `type_name` was selected, as opposed to the type only being reached.
    pub fn has_fields(&self, type_name: &str) -> bool {
        self.types.get(type_name).is_some_and(|fields| !fields.is_empty())
    }

    pub fn fields(&self, type_name: &str) -> Option<&IndexSet<String>> {
        self.types.get(type_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GroupKey {
    Base,
    Type(String),
    Condition(String),
}

type Groups = IndexMap<GroupKey, IndexMap<String, SerializedType>>;

struct Walk<'a> {
    context: &'a str,
    fragments: Vec<String>,
}

pub struct Resolver<'a> {
    schema: &'a Schema,
    fragments: &'a IndexMap<String, Fragment>,
    typename: bool,
}

impl<'a> Resolver<'a> {
    /// With `typename`, discriminated branches carry a `__typename` literal field.
    pub fn new(schema: &'a Schema, fragments: &'a IndexMap<String, Fragment>, typename: bool) -> Self {
        Resolver {
            schema,
            fragments,
            typename,
        }
    }

    pub fn resolve_operation(&self, operation: &Operation, usage: &mut FieldUsage) -> Result<ObjectShape> {
        let context = format!("{} {}", operation.kind, operation.name);

        let root = self.schema.root_type(operation.kind).ok_or_else(|| Error::UnknownType {
            name: operation.kind.type_name().to_owned(),
            context: context.clone(),
        })?;

        let mut walk = Walk {
            context: &context,
            fragments: Vec::new(),
        };

        self.resolve_in(root, &operation.selection_set, usage, &mut walk)
    }

    pub fn resolve(&self, type_name: &str, selections: &[Selection], usage: &mut FieldUsage) -> Result<ObjectShape> {
        let context = format!("a selection on '{type_name}'");

        let mut walk = Walk {
            context: &context,
            fragments: Vec::new(),
        };

        self.resolve_in(type_name, selections, usage, &mut walk)
    }

    fn resolve_in(
        &self,
        type_name: &str,
        selections: &[Selection],
        usage: &mut FieldUsage,
        walk: &mut Walk<'_>,
    ) -> Result<ObjectShape> {
        self.schema.lookup(type_name, walk.context)?;
        usage.touch(type_name);

        let mut groups = Groups::new();
        groups.insert(GroupKey::Base, IndexMap::new());

        self.collect(type_name, selections, GroupKey::Base, &mut groups, usage, walk)?;

        let is_abstract = self.schema.is_abstract(type_name);
        let mut shape = ObjectShape::new(type_name);
        let mut discriminated: IndexMap<String, ObjectShape> = IndexMap::new();

        for (key, fields) in groups {
            match key {
                GroupKey::Base => shape.fields = fields,
                GroupKey::Type(condition) => match self.schema.kind_of(&condition) {
                    Some(TypeKind::Object) if self.schema.is_possible_type(type_name, &condition) => {
                        self.add_branch(&mut discriminated, &condition, fields);
                    }
                    Some(TypeKind::Interface | TypeKind::Union) => {
                        let implementors: Vec<&str> = self
                            .schema
                            .possible_types(&condition)
                            .into_iter()
                            .filter(|implementor| self.schema.is_possible_type(type_name, implementor))
                            .collect();

                        for implementor in implementors {
                            self.add_branch(&mut discriminated, implementor, fields.clone());
                        }
                    }
                    _ => {
                        tracing::debug!(
                            context = walk.context,
                            target = type_name,
                            condition = %condition,
                            "dropping a type condition that can never match"
                        );
                    }
                },
                GroupKey::Condition(directives) => shape.branches.push(ObjectShape {
                    condition: Some(directives),
                    fields,
                    ..ObjectShape::new(type_name)
                }),
            }
        }

        if is_abstract {
            if self.typename {
                shape.selects_typename = shape.fields.shift_remove("__typename").is_some();
            }

            shape.undiscriminated = self
                .schema
                .possible_types(type_name)
                .into_iter()
                .filter(|possible| !discriminated.contains_key(*possible))
                .map(str::to_owned)
                .collect();
        }

        let conditional = std::mem::take(&mut shape.branches);
        shape.branches = discriminated.into_values().chain(conditional).collect();

        Ok(shape)
    }

    fn add_branch(
        &self,
        discriminated: &mut IndexMap<String, ObjectShape>,
        concrete: &str,
        fields: IndexMap<String, SerializedType>,
    ) {
        let branch = discriminated.entry(concrete.to_owned()).or_insert_with(|| {
            let mut branch = ObjectShape::new(concrete);
            branch.discriminant = Some(concrete.to_owned());

            if self.typename {
                branch
                    .fields
                    .insert("__typename".to_owned(), SerializedType::Literal(concrete.to_owned()));
            }

            branch
        });

        merge_fields(&mut branch.fields, fields);
    }

    /// Where the selections of a fragment with `condition` land when spread in `scope`.
    fn group_for(&self, scope: &str, group: &GroupKey, condition: &str) -> (String, GroupKey) {
        let same_type = condition == scope;
        let supertype = !self.schema.is_abstract(scope) && self.schema.is_possible_type(condition, scope);

        if same_type || supertype {
            (scope.to_owned(), group.clone())
        } else {
            (condition.to_owned(), GroupKey::Type(condition.to_owned()))
        }
    }

    fn collect(
        &self,
        scope: &str,
        selections: &[Selection],
        group: GroupKey,
        groups: &mut Groups,
        usage: &mut FieldUsage,
        walk: &mut Walk<'_>,
    ) -> Result<()> {
        for selection in selections {
            match selection {
                Selection::Field(field) => {
                    let resolved = if field.name == "__typename" {
                        if self.schema.is_abstract(scope) {
                            SerializedType::Name {
                                name: "String".to_owned(),
                                nullable: false,
                            }
                        } else {
                            SerializedType::Literal(scope.to_owned())
                        }
                    } else {
                        let field_type = self.schema.field_type(scope, &field.name, walk.context)?;
                        usage.record(scope, &field.name);

                        self.serialize(field_type, &field.selection_set, usage, walk)?
                    };

                    let fields = groups.entry(group.clone()).or_default();
                    merge_fields(fields, IndexMap::from([(field.response_key().to_owned(), resolved)]));
                }
                Selection::FragmentSpread(name) => {
                    let fragment = self.fragments.get(name).ok_or_else(|| Error::UnknownFragment {
                        name: name.clone(),
                        context: walk.context.to_owned(),
                    })?;

                    if walk.fragments.contains(name) {
                        return Err(Error::FragmentCycle { name: name.clone() });
                    }

                    self.schema.lookup(&fragment.type_condition, walk.context)?;
                    usage.touch(&fragment.type_condition);

                    let (scope, group) = self.group_for(scope, &group, &fragment.type_condition);

                    walk.fragments.push(name.clone());
                    self.collect(&scope, &fragment.selection_set, group, groups, usage, walk)?;
                    walk.fragments.pop();
                }
                Selection::InlineFragment(fragment) => {
                    let (scope, group) = match &fragment.type_condition {
                        Some(condition) => {
                            self.schema.lookup(condition, walk.context)?;
                            usage.touch(condition);
                            self.group_for(scope, &group, condition)
                        }
                        None if fragment.directives.is_empty() => (scope.to_owned(), group.clone()),
                        None => (scope.to_owned(), GroupKey::Condition(fragment.directives.join(" "))),
                    };

                    self.collect(&scope, &fragment.selection_set, group, groups, usage, walk)?;
                }
            }
        }

        Ok(())
    }

    fn serialize(
        &self,
        ty: &TypeRef,
        selections: &[Selection],
        usage: &mut FieldUsage,
        walk: &mut Walk<'_>,
    ) -> Result<SerializedType> {
        match ty {
            TypeRef::List { element, nullable } => Ok(SerializedType::List {
                element: Box::new(self.serialize(element, selections, usage, walk)?),
                nullable: *nullable,
            }),
            TypeRef::Named { name, nullable } => {
                let definition = self.schema.lookup(name, walk.context)?;

                match definition.kind() {
                    TypeKind::Object | TypeKind::Interface | TypeKind::Union => {
                        if selections.is_empty() {
                            return Err(Error::shape(
                                walk.context,
                                format!("the composite type '{name}' is selected without a selection set"),
                            ));
                        }

                        let mut shape = self.resolve_in(name, selections, usage, walk)?;
                        shape.nullable = *nullable;

                        Ok(SerializedType::Object(shape))
                    }
                    TypeKind::Scalar | TypeKind::Enum => Ok(SerializedType::Name {
                        name: name.clone(),
                        nullable: *nullable,
                    }),
                    TypeKind::Input => Err(Error::shape(
                        walk.context,
                        format!("the input type '{name}' cannot be selected"),
                    )),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::{OperationIndex, OperationKind};
    use indoc::indoc;

    const SCHEMA: &str = indoc! {r#"
        interface Pet { name: String! }
        type Cat implements Pet { name: String! meows: Boolean! }
        type Dog implements Pet { name: String! barks: Boolean! }
        type Fish implements Pet { name: String! }
        union Animal = Cat | Dog
        type Query { pets: [Pet!]! animal: Animal pet: Pet }
    "#};

    fn resolve(query: &str) -> (ObjectShape, FieldUsage) {
        let schema = Schema::parse(SCHEMA).unwrap();
        let index = OperationIndex::from_sources(&schema, [("q.graphql", query)]).unwrap();
        let operation = index.get(OperationKind::Query, "Q").unwrap();

        let mut usage = FieldUsage::default();
        let shape = Resolver::new(&schema, index.fragments(), true)
            .resolve_operation(operation, &mut usage)
            .unwrap();

        (shape, usage)
    }

    fn field<'a>(shape: &'a ObjectShape, name: &str) -> &'a ObjectShape {
        match &shape.fields[name] {
            SerializedType::Object(shape) => shape,
            SerializedType::List { element, .. } => match element.as_ref() {
                SerializedType::Object(shape) => shape,
                other => unreachable!("{other:?}"),
            },
            other => unreachable!("{other:?}"),
        }
    }

    #[test]
    fn branches_per_concrete_type() {
        let (shape, usage) = resolve("query Q { pets { name ... on Cat { meows } ... on Dog { barks } } }");
        let pets = field(&shape, "pets");

        assert_eq!(pets.fields.keys().collect::<Vec<_>>(), ["name"]);

        let discriminants: Vec<_> = pets.branches.iter().filter_map(|b| b.discriminant.as_deref()).collect();
        assert_eq!(discriminants, ["Cat", "Dog"]);
        assert_eq!(pets.undiscriminated, ["Fish"]);
        assert_eq!(
            pets.branch_for("Cat").unwrap().fields["__typename"],
            SerializedType::Literal("Cat".to_owned())
        );

        assert!(usage.is_used("Pet", "name"));
        assert!(usage.is_used("Cat", "meows"));
        assert!(!usage.is_used("Cat", "name"));
    }

    #[test]
    fn interface_fragments_fan_out_to_implementors() {
        let (shape, _) = resolve(indoc! {r#"
            query Q { animal { ... on Cat { meows } ...PetName } }
            fragment PetName on Pet { name }
        "#});

        let animal = field(&shape, "animal");
        let cat = animal.branch_for("Cat").unwrap();
        let dog = animal.branch_for("Dog").unwrap();

        assert_eq!(cat.fields.keys().collect::<Vec<_>>(), ["__typename", "meows", "name"]);
        assert_eq!(dog.fields.keys().collect::<Vec<_>>(), ["__typename", "name"]);
        assert!(animal.undiscriminated.is_empty());
        assert!(animal.nullable);
    }

    #[test]
    fn spreads_on_the_same_type_merge_into_the_base_group() {
        let (shape, _) = resolve(indoc! {r#"
            query Q { pet { ...Named ... on Pet { name } } }
            fragment Named on Pet { name }
        "#});

        let pet = field(&shape, "pet");
        assert_eq!(pet.fields.keys().collect::<Vec<_>>(), ["name"]);
        assert!(pet.branches.is_empty());
        assert_eq!(pet.undiscriminated, ["Cat", "Dog", "Fish"]);
    }

    #[test]
    fn directive_fragments_become_conditional_branches() {
        let (shape, _) = resolve("query Q($full: Boolean!) { pet { name ... @include(if: $full) { __typename } } }");

        let pet = field(&shape, "pet");
        let conditional: Vec<_> = pet.conditional_branches().collect();

        assert_eq!(conditional.len(), 1);
        assert_eq!(conditional[0].condition.as_deref(), Some("@include(if: $full)"));
        assert_eq!(
            conditional[0].fields["__typename"],
            SerializedType::Name {
                name: "String".to_owned(),
                nullable: false
            }
        );
    }

    #[test]
    fn reports_fragment_cycles_and_unknown_fields() {
        let schema = Schema::parse(SCHEMA).unwrap();
        let index = OperationIndex::from_sources(
            &schema,
            [(
                "q.graphql",
                indoc! {r#"
                    query Q { pet { ...A } }
                    query R { pet { age } }
                    fragment A on Pet { ...B }
                    fragment B on Pet { ...A }
                "#},
            )],
        )
        .unwrap();

        let resolver = Resolver::new(&schema, index.fragments(), true);
        let mut usage = FieldUsage::default();

        let cycle = resolver
            .resolve_operation(index.get(OperationKind::Query, "Q").unwrap(), &mut usage)
            .unwrap_err();
        assert_eq!(cycle.to_string(), "the fragment 'A' spreads itself");

        let unknown = resolver
            .resolve_operation(index.get(OperationKind::Query, "R").unwrap(), &mut usage)
            .unwrap_err();
        assert_eq!(
            unknown.to_string(),
            "unknown field 'age' on type 'Pet' referenced in query R"
        );
    }
}
