use clap::{Parser, ValueEnum};
use std::path::PathBuf;

const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum EnumsArg {
    /// `type Status = "A" | "B";`
    Literals,
    /// `enum Status { A = "A" }`
    Enum,
    /// Emit nothing for enums
    Omit,
    /// Import enums from `--enums-module`
    Import,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum NamingArg {
    Keep,
    PascalCase,
    CamelCase,
}

#[derive(Debug, Parser)]
#[command(name = "graphql-mockgen", version)]
/// Generates TypeScript declarations for a GraphQL schema and its operations
pub struct Args {
    /// Schema files or directories of `.graphql` files
    #[arg(long, required = true, num_args = 1..)]
    pub schema: Vec<PathBuf>,
    /// Directories or files holding operations and fragments
    #[arg(long, num_args = 1..)]
    pub operations: Vec<PathBuf>,
    /// A scalar declaration, e.g. `DateTime:string`
    #[arg(long, value_name = "NAME:DECLARATION")]
    pub scalar: Vec<String>,
    /// A JSON object mapping scalar names to declarations
    #[arg(long, value_name = "FILE")]
    pub scalars_json: Option<PathBuf>,
    /// Generator options in TOML. Flags take precedence
    #[arg(long, value_name = "TOML")]
    pub config: Option<PathBuf>,
    #[arg(long, value_enum)]
    pub enums: Option<EnumsArg>,
    /// The module enums are imported from with `--enums import`
    #[arg(long, requires = "enums")]
    pub enums_module: Option<String>,
    /// Do not add `__typename` to discriminated shapes
    #[arg(long)]
    pub no_typename: bool,
    /// Naming convention of the declarations in `--external-module`
    #[arg(long, value_enum, requires = "external_module")]
    pub naming: Option<NamingArg>,
    /// Import schema type and operation declarations from this module
    #[arg(long)]
    pub external_module: Option<String>,
    /// Operation declarations in `--external-module` have no `Query`/`Mutation`/`Subscription` suffix
    #[arg(long, requires = "external_module")]
    pub omit_operation_suffix: bool,
    /// Write the declarations to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Text copied at the top of the output
    #[arg(long)]
    pub banner: Option<String>,
    /// Tracing filter, e.g. `graphql_mockgen=debug`
    #[arg(long, env = "MOCKGEN_LOG")]
    pub log_filter: Option<String>,
}

impl Args {
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}
