//! Named operations and fragments, ingested from executable documents.

mod imports;
mod names;

pub use imports::{DocumentCache, DocumentLoader, FileSystemLoader, MemoryLoader, ParsedDocument};

use crate::{
    error::{Error, Result},
    schema::{Schema, TypeRef},
};
use async_graphql_parser::{
    types::{self as ast, DocumentOperations, ExecutableDocument, OperationType},
    Positioned,
};
use heck::ToUpperCamelCase;
use indexmap::IndexMap;
use itertools::Itertools;
use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

/// Stand-in operation appended to fragment-only documents, which the parser rejects otherwise.
const FRAGMENTS_ONLY_PLACEHOLDER: &str = "__MockgenFragmentsOnly";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    pub const ALL: [OperationKind; 3] = [OperationKind::Query, OperationKind::Mutation, OperationKind::Subscription];

    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
        }
    }

    /// `Query`, `Mutation` or `Subscription`: the suffix used to disambiguate names.
    pub fn type_name(self) -> &'static str {
        match self {
            OperationKind::Query => "Query",
            OperationKind::Mutation => "Mutation",
            OperationKind::Subscription => "Subscription",
        }
    }

    /// `queries`, `mutations` or `subscriptions`.
    pub fn plural(self) -> &'static str {
        match self {
            OperationKind::Query => "queries",
            OperationKind::Mutation => "mutations",
            OperationKind::Subscription => "subscriptions",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<OperationType> for OperationKind {
    fn from(value: OperationType) -> Self {
        match value {
            OperationType::Query => OperationKind::Query,
            OperationType::Mutation => OperationKind::Mutation,
            OperationType::Subscription => OperationKind::Subscription,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Field(FieldSelection),
    FragmentSpread(String),
    InlineFragment(InlineFragment),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSelection {
    pub alias: Option<String>,
    pub name: String,
    pub selection_set: Vec<Selection>,
}

impl FieldSelection {
    /// The key of this field in a response: its alias if any, otherwise its name.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InlineFragment {
    pub type_condition: Option<String>,
    /// Directives rendered back to GraphQL syntax, e.g. `@include(if: $withEmail)`.
    pub directives: Vec<String>,
    pub selection_set: Vec<Selection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub name: String,
    pub type_condition: String,
    pub selection_set: Vec<Selection>,
}

#[derive(Debug, Clone)]
pub struct Operation {
    pub name: String,
    /// The identifier used in generated declarations and builder lookups. Equal to `name`
    /// unless it collides with a schema type or an operation of another kind.
    pub export_name: String,
    pub kind: OperationKind,
    pub path: PathBuf,
    /// The document the operation was defined in, with its imports inlined.
    pub source: Arc<str>,
    pub variables: IndexMap<String, TypeRef>,
    pub selection_set: Vec<Selection>,
}

impl Operation {
    pub fn variables_name(&self) -> String {
        format!("{}Variables", self.export_name)
    }
}

/// Every operation and fragment of a run.
#[derive(Debug, Clone, Default)]
pub struct OperationIndex {
    operations: Vec<Operation>,
    fragments: IndexMap<String, Fragment>,
}

impl OperationIndex {
    pub fn builder<'a>(loader: &'a dyn DocumentLoader, cache: &'a DocumentCache) -> OperationIndexBuilder<'a> {
        OperationIndexBuilder {
            loader,
            cache,
            documents: Vec::new(),
        }
    }

    /// Indexes in-memory documents. Imports resolve against the other sources.
    pub fn from_sources<P, S>(schema: &Schema, sources: impl IntoIterator<Item = (P, S)>) -> Result<Self>
    where
        P: Into<PathBuf>,
        S: Into<String>,
    {
        let loader = MemoryLoader::from_iter(sources);
        let cache = DocumentCache::default();
        let mut builder = OperationIndex::builder(&loader, &cache);

        for path in loader.paths() {
            builder.add_document(path)?;
        }

        builder.build(schema)
    }

    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter()
    }

    pub fn of_kind(&self, kind: OperationKind) -> impl Iterator<Item = &Operation> {
        self.operations.iter().filter(move |operation| operation.kind == kind)
    }

    pub fn get(&self, kind: OperationKind, name: &str) -> Option<&Operation> {
        self.of_kind(kind).find(|operation| operation.name == name)
    }

    pub fn by_export_name(&self, export_name: &str) -> Option<&Operation> {
        self.operations
            .iter()
            .find(|operation| operation.export_name == export_name)
    }

    pub fn fragment(&self, name: &str) -> Option<&Fragment> {
        self.fragments.get(name)
    }

    pub fn fragments(&self) -> &IndexMap<String, Fragment> {
        &self.fragments
    }

    /// Export name to source path, for one root kind.
    pub fn paths(&self, kind: OperationKind) -> IndexMap<&str, &Path> {
        self.of_kind(kind)
            .map(|operation| (operation.export_name.as_str(), operation.path.as_path()))
            .collect()
    }
}

pub struct OperationIndexBuilder<'a> {
    loader: &'a dyn DocumentLoader,
    cache: &'a DocumentCache,
    documents: Vec<Arc<ParsedDocument>>,
}

impl OperationIndexBuilder<'_> {
    pub fn add_document(&mut self, path: impl AsRef<Path>) -> Result<&mut Self> {
        let document = self.cache.get_or_parse(path.as_ref(), self.loader)?;
        self.documents.push(document);

        Ok(self)
    }

    /// Adds a document whose text is already loaded. Its imports still go through the loader.
    pub fn add_source(&mut self, path: impl AsRef<Path>, text: &str) -> Result<&mut Self> {
        let path = imports::normalize(path.as_ref());
        let source = imports::inline_imports(self.loader, &path, text)?;
        self.documents.push(Arc::new(parse_document(&path, source.into())?));

        Ok(self)
    }

    pub fn build(self, schema: &Schema) -> Result<OperationIndex> {
        let mut operations: Vec<Operation> = Vec::new();
        let mut fragments: IndexMap<String, Fragment> = IndexMap::new();

        for document in &self.documents {
            for operation in &document.operations {
                if let Some(existing) = operations
                    .iter()
                    .find(|existing| existing.kind == operation.kind && existing.name == operation.name)
                {
                    return Err(Error::DuplicateOperation {
                        kind: operation.kind.as_str(),
                        name: operation.name.clone(),
                        first: existing.path.clone(),
                        second: operation.path.clone(),
                    });
                }

                operations.push(operation.clone());
            }

            // The same fragment file is inlined into every document importing it.
            for fragment in &document.fragments {
                match fragments.get(&fragment.name) {
                    Some(existing) if existing == fragment => (),
                    Some(_) => {
                        return Err(Error::DuplicateFragment {
                            name: fragment.name.clone(),
                        })
                    }
                    None => {
                        fragments.insert(fragment.name.clone(), fragment.clone());
                    }
                }
            }
        }

        names::assign_export_names(&mut operations, schema);

        tracing::debug!(
            operations = operations.len(),
            fragments = fragments.len(),
            "indexed operations"
        );

        Ok(OperationIndex { operations, fragments })
    }
}

/// Parses an executable document whose imports were already inlined.
pub(crate) fn parse_document(path: &Path, source: Arc<str>) -> Result<ParsedDocument> {
    let parse_error = |source| Error::Parse {
        path: path.to_owned(),
        source,
    };

    let document = match async_graphql_parser::parse_query(&*source) {
        Ok(document) => document,
        Err(async_graphql_parser::Error::MissingOperation) => {
            let padded = format!("{source}\nquery {FRAGMENTS_ONLY_PLACEHOLDER} {{ __typename }}\n");
            async_graphql_parser::parse_query(padded).map_err(parse_error)?
        }
        Err(error) => return Err(parse_error(error)),
    };

    let ExecutableDocument {
        operations: document_operations,
        fragments: document_fragments,
    } = document;

    let mut definitions: Vec<(Option<String>, Positioned<ast::OperationDefinition>)> = match document_operations {
        DocumentOperations::Single(operation) => vec![(None, operation)],
        DocumentOperations::Multiple(operations) => operations
            .into_iter()
            .map(|(name, operation)| (Some(name.to_string()), operation))
            .collect(),
    };

    definitions.sort_by_key(|(_, operation)| (operation.pos.line, operation.pos.column));

    let mut operations = Vec::with_capacity(definitions.len());

    for (name, definition) in definitions {
        if name.as_deref() == Some(FRAGMENTS_ONLY_PLACEHOLDER) {
            continue;
        }

        let name = match name {
            Some(name) => name,
            None => anonymous_operation_name(path)?,
        };

        let definition = definition.node;

        operations.push(Operation {
            export_name: name.clone(),
            name,
            kind: definition.ty.into(),
            path: path.to_owned(),
            source: source.clone(),
            variables: definition
                .variable_definitions
                .iter()
                .map(|variable| {
                    (
                        variable.node.name.node.to_string(),
                        TypeRef::from_ast(&variable.node.var_type.node),
                    )
                })
                .collect(),
            selection_set: ingest_selection_set(&definition.selection_set.node),
        });
    }

    let mut fragments: Vec<_> = document_fragments.into_iter().collect();
    fragments.sort_by_key(|(_, fragment)| (fragment.pos.line, fragment.pos.column));

    let fragments = fragments
        .into_iter()
        .map(|(name, fragment)| Fragment {
            name: name.to_string(),
            type_condition: fragment.node.type_condition.node.on.node.to_string(),
            selection_set: ingest_selection_set(&fragment.node.selection_set.node),
        })
        .collect();

    Ok(ParsedDocument {
        path: path.to_owned(),
        source,
        operations,
        fragments,
    })
}

fn anonymous_operation_name(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_upper_camel_case())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| Error::shape(path.display().to_string(), "an anonymous operation needs a named file"))
}

fn ingest_selection_set(selection_set: &ast::SelectionSet) -> Vec<Selection> {
    selection_set
        .items
        .iter()
        .map(|item| ingest_selection(&item.node))
        .collect()
}

fn ingest_selection(selection: &ast::Selection) -> Selection {
    match selection {
        ast::Selection::Field(field) => Selection::Field(FieldSelection {
            alias: field.node.alias.as_ref().map(|alias| alias.node.to_string()),
            name: field.node.name.node.to_string(),
            selection_set: ingest_selection_set(&field.node.selection_set.node),
        }),
        ast::Selection::FragmentSpread(spread) => Selection::FragmentSpread(spread.node.fragment_name.node.to_string()),
        ast::Selection::InlineFragment(fragment) => Selection::InlineFragment(InlineFragment {
            type_condition: fragment
                .node
                .type_condition
                .as_ref()
                .map(|condition| condition.node.on.node.to_string()),
            directives: fragment
                .node
                .directives
                .iter()
                .map(|directive| render_directive(&directive.node))
                .collect(),
            selection_set: ingest_selection_set(&fragment.node.selection_set.node),
        }),
    }
}

fn render_directive(directive: &ast::Directive) -> String {
    if directive.arguments.is_empty() {
        return format!("@{}", directive.name.node);
    }

    let arguments = directive
        .arguments
        .iter()
        .map(|(name, value)| format!("{}: {}", name.node, value.node))
        .join(", ");

    format!("@{}({arguments})", directive.name.node)
}
