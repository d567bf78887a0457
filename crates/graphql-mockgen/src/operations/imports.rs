use super::{parse_document, Fragment, Operation};
use crate::error::{Error, Result};
use dashmap::DashMap;
use indexmap::{IndexMap, IndexSet};
use std::{
    io,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

/// Reads document text. Import paths are resolved before they reach the loader.
pub trait DocumentLoader: Send + Sync {
    fn load(&self, path: &Path) -> io::Result<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FileSystemLoader;

impl DocumentLoader for FileSystemLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// Documents held in memory, keyed by normalized path.
#[derive(Debug, Default, Clone)]
pub struct MemoryLoader {
    documents: IndexMap<PathBuf, String>,
}

impl MemoryLoader {
    pub fn insert(&mut self, path: impl Into<PathBuf>, text: impl Into<String>) {
        self.documents.insert(normalize(&path.into()), text.into());
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.documents.keys().map(PathBuf::as_path)
    }
}

impl<P: Into<PathBuf>, S: Into<String>> FromIterator<(P, S)> for MemoryLoader {
    fn from_iter<T: IntoIterator<Item = (P, S)>>(iter: T) -> Self {
        let mut loader = MemoryLoader::default();

        for (path, text) in iter {
            loader.insert(path, text);
        }

        loader
    }
}

impl DocumentLoader for MemoryLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        self.documents
            .get(&normalize(path))
            .cloned()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }
}

/// A document with its imports inlined, parsed into operations and fragments.
#[derive(Debug)]
pub struct ParsedDocument {
    pub path: PathBuf,
    pub source: Arc<str>,
    pub operations: Vec<Operation>,
    pub fragments: Vec<Fragment>,
}

/// Parsed documents keyed by path. Entries live as long as the cache; document text is
/// assumed not to change while it is in use.
#[derive(Debug, Default)]
pub struct DocumentCache {
    documents: DashMap<PathBuf, Arc<ParsedDocument>>,
}

impl DocumentCache {
    pub fn get_or_parse(&self, path: &Path, loader: &dyn DocumentLoader) -> Result<Arc<ParsedDocument>> {
        let path = normalize(path);

        if let Some(document) = self.documents.get(&path) {
            return Ok(document.clone());
        }

        let text = loader.load(&path).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;

        let source = inline_imports(loader, &path, &text)?;
        let document = Arc::new(parse_document(&path, source.into())?);

        Ok(self.documents.entry(path).or_insert(document).clone())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Replaces every `#import "path"` line with the imported text, recursively. Each file is
/// included at most once.
pub(crate) fn inline_imports(loader: &dyn DocumentLoader, path: &Path, text: &str) -> Result<String> {
    let mut seen = IndexSet::new();
    seen.insert(path.to_owned());

    let mut output = String::with_capacity(text.len());
    inline_into(loader, path, text, &mut seen, &mut output)?;

    Ok(output)
}

fn inline_into(
    loader: &dyn DocumentLoader,
    path: &Path,
    text: &str,
    seen: &mut IndexSet<PathBuf>,
    output: &mut String,
) -> Result<()> {
    for line in text.lines() {
        let Some(import) = parse_import(line) else {
            output.push_str(line);
            output.push('\n');
            continue;
        };

        let target = normalize(&path.parent().unwrap_or_else(|| Path::new("")).join(import));

        if !seen.insert(target.clone()) {
            continue;
        }

        tracing::trace!(from = %path.display(), import = %target.display(), "inlining import");

        let imported = loader.load(&target).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => Error::MissingImport {
                path: path.to_owned(),
                import: import.to_owned(),
            },
            _ => Error::Io {
                path: target.clone(),
                source,
            },
        })?;

        inline_into(loader, &target, &imported, seen, output)?;
    }

    Ok(())
}

fn parse_import(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix("#import")?.trim();

    ['"', '\'']
        .into_iter()
        .find_map(|quote| rest.strip_prefix(quote)?.strip_suffix(quote))
        .filter(|import| !import.is_empty())
}

/// Lexically resolves `.` and `..` so the same file always maps to the same key.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => (),
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other),
        }
    }

    normalized
}
