#![cfg_attr(test, allow(unused_crate_dependencies))]
#![forbid(unsafe_code)]

mod cli_input;
mod errors;
mod load;
mod output;

use crate::cli_input::{Args, EnumsArg, NamingArg};
use clap::Parser;
use errors::CliError;
use graphql_mockgen::{
    codegen::{EnumStyle, ExternalOptions, Naming, DEFAULT_ENUMS_MODULE},
    Codegen, DocumentCache, FileSystemLoader, OperationIndex, Options, Schema,
};
use std::{collections::BTreeMap, path::Path, process};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    let args = Args::parse();

    let exit_code = match try_main(args) {
        Ok(()) => 0,
        Err(error) => {
            output::error(&error);
            1
        }
    };

    process::exit(exit_code);
}

fn try_main(args: Args) -> Result<(), CliError> {
    let filter = EnvFilter::builder().parse_lossy(args.log_filter());

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let options = options(&args)?;

    let sources = load::read_documents(&args.schema)?;

    if sources.is_empty() {
        let roots: Vec<String> = args.schema.iter().map(|root| format!("'{}'", root.display())).collect();
        return Err(CliError::NoSchema(roots.join(", ")));
    }

    let schema = Schema::from_sources(sources.iter().map(|(path, text)| (path, text)))?;

    let cache = DocumentCache::default();
    let mut builder = OperationIndex::builder(&FileSystemLoader, &cache);

    for path in load::documents(&args.operations)? {
        builder.add_document(path)?;
    }

    let operations = builder.build(&schema)?;
    let declarations = Codegen::new(&schema, &operations, &options).generate()?;

    tracing::debug!(parsed = cache.len(), "generated declarations");

    match &args.output {
        Some(path) => {
            std::fs::write(path, declarations).map_err(|error| CliError::WriteOutput(path.clone(), error))?;
            output::written(path, operations.operations().count());
        }
        None => print!("{declarations}"),
    }

    Ok(())
}

/// The configuration file, if any, overridden by the command line flags.
fn options(args: &Args) -> Result<Options, CliError> {
    let mut options = match &args.config {
        Some(path) => Options::from_toml(&read(path)?)?,
        None => Options::default(),
    };

    if let Some(path) = &args.scalars_json {
        let scalars: BTreeMap<String, String> =
            serde_json::from_str(&read(path)?).map_err(|error| CliError::ScalarsJson(path.clone(), error))?;

        options.scalars.extend(scalars);
    }

    for mapping in &args.scalar {
        let (name, declaration) = mapping
            .split_once(':')
            .filter(|(name, declaration)| !name.trim().is_empty() && !declaration.trim().is_empty())
            .ok_or_else(|| CliError::InvalidScalar(mapping.clone()))?;

        options
            .scalars
            .insert(name.trim().to_owned(), declaration.trim().to_owned());
    }

    if let Some(enums) = args.enums {
        options.enums = match enums {
            EnumsArg::Literals => EnumStyle::Literals,
            EnumsArg::Enum => EnumStyle::Enum,
            EnumsArg::Omit => EnumStyle::Omit,
            EnumsArg::Import => EnumStyle::Import {
                module: args
                    .enums_module
                    .clone()
                    .unwrap_or_else(|| DEFAULT_ENUMS_MODULE.to_owned()),
            },
        };
    }

    if args.no_typename {
        options.typename = false;
    }

    if let Some(module) = &args.external_module {
        let naming = match args.naming {
            Some(NamingArg::PascalCase) => Naming::PascalCase,
            Some(NamingArg::CamelCase) => Naming::CamelCase,
            Some(NamingArg::Keep) | None => Naming::Keep,
        };

        options.external = Some(ExternalOptions {
            module: module.clone(),
            naming,
            omit_operation_suffix: args.omit_operation_suffix,
        });
    }

    if let Some(banner) = &args.banner {
        options.banner = Some(banner.clone());
    }

    Ok(options)
}

fn read(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|error| CliError::ReadFile(path.to_owned(), error))
}
