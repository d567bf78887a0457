use crate::errors::CliError;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const EXTENSIONS: [&str; 2] = ["graphql", "gql"];

/// Every GraphQL document under `roots`, sorted by path within each root. Files given
/// directly are kept whatever their extension.
pub fn documents(roots: &[PathBuf]) -> Result<Vec<PathBuf>, CliError> {
    let mut documents = Vec::new();

    for root in roots {
        if root.is_file() {
            documents.push(root.clone());
            continue;
        }

        for entry in WalkDir::new(root).sort_by_file_name().follow_links(true) {
            let entry = entry.map_err(|error| CliError::WalkDirectory(root.clone(), error))?;

            if entry.file_type().is_file() && is_document(entry.path()) {
                documents.push(entry.into_path());
            }
        }
    }

    tracing::debug!(documents = documents.len(), "collected documents");

    Ok(documents)
}

/// Reads the documents under `roots` into memory.
pub fn read_documents(roots: &[PathBuf]) -> Result<Vec<(PathBuf, String)>, CliError> {
    documents(roots)?
        .into_iter()
        .map(|path| {
            let text = std::fs::read_to_string(&path).map_err(|error| CliError::ReadFile(path.clone(), error))?;
            Ok((path, text))
        })
        .collect()
}

fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| EXTENSIONS.contains(&extension))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_directories_in_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("b.graphql"), "query B { b }").unwrap();
        std::fs::write(dir.path().join("a.gql"), "query A { a }").unwrap();
        std::fs::write(dir.path().join("nested/c.graphql"), "query C { c }").unwrap();
        std::fs::write(dir.path().join("notes.md"), "# not a document").unwrap();

        let found: Vec<PathBuf> = documents(&[dir.path().to_owned()])
            .unwrap()
            .into_iter()
            .map(|path| path.strip_prefix(dir.path()).unwrap().to_owned())
            .collect();

        assert_eq!(
            found,
            [PathBuf::from("a.gql"), PathBuf::from("b.graphql"), PathBuf::from("nested/c.graphql")]
        );
    }

    #[test]
    fn missing_roots_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let error = documents(&[dir.path().join("missing")]).unwrap_err();

        assert!(matches!(error, CliError::WalkDirectory(..)));
    }
}
