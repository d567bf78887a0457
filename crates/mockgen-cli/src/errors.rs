use std::{io, path::PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    /// wraps an error originating in the generator library
    #[error(transparent)]
    Mockgen(#[from] graphql_mockgen::Error),
    /// returned if a schema, operation or configuration file cannot be read
    #[error("could not read '{0}'\nCaused by: {1}")]
    ReadFile(PathBuf, io::Error),
    /// returned if a directory given on the command line cannot be traversed
    #[error("could not list the files in '{0}'\nCaused by: {1}")]
    WalkDirectory(PathBuf, walkdir::Error),
    /// returned if no schema document was found under the `--schema` paths
    #[error("no schema document found under {0}")]
    NoSchema(String),
    /// returned if a `--scalar` argument is not of the form `name:declaration`
    #[error("invalid scalar mapping '{0}', expected `name:declaration`")]
    InvalidScalar(String),
    /// returned if the `--scalars-json` file is not an object of strings
    #[error("could not parse the scalar mappings in '{0}'\nCaused by: {1}")]
    ScalarsJson(PathBuf, serde_json::Error),
    /// returned if the output file cannot be written
    #[error("could not write the declarations to '{0}'\nCaused by: {1}")]
    WriteOutput(PathBuf, io::Error),
}
