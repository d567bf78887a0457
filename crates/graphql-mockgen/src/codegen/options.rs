use heck::{ToLowerCamelCase, ToUpperCamelCase};
use indexmap::IndexMap;
use serde::Deserialize;

pub const DEFAULT_ENUMS_MODULE: &str = "./enums";

/// Generator settings, usually read from a TOML file.
///
/// ```toml
/// typename = true
/// enums = { style = "import", module = "./enums" }
///
/// [scalars]
/// DateTime = "string"
///
/// [external]
/// module = "./graphql"
/// naming = "pascal-case"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    /// TypeScript declarations for scalars, on top of the built-in ones.
    pub scalars: IndexMap<String, String>,
    pub enums: EnumStyle,
    /// Whether discriminated shapes carry `__typename`.
    pub typename: bool,
    pub export: ExportOptions,
    pub external: Option<ExternalOptions>,
    /// Copied verbatim at the top of the output.
    pub banner: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            scalars: IndexMap::new(),
            enums: EnumStyle::default(),
            typename: true,
            export: ExportOptions::default(),
            external: None,
            banner: None,
        }
    }
}

impl Options {
    pub fn from_toml(source: &str) -> crate::Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// The declaration of a scalar: the configured one, else the built-in default.
    pub fn scalar(&self, name: &str) -> Option<&str> {
        if let Some(declaration) = self.scalars.get(name) {
            return Some(declaration);
        }

        match name {
            "ID" | "String" => Some("string"),
            "Int" | "Float" => Some("number"),
            "Boolean" => Some("boolean"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "style", rename_all = "kebab-case")]
pub enum EnumStyle {
    /// `type Status = "A" | "B";`
    #[default]
    Literals,
    /// `enum Status { A = "A" }`
    Enum,
    /// Nothing is emitted, the declarations live elsewhere.
    Omit,
    Import {
        #[serde(default = "default_enums_module")]
        module: String,
    },
}

fn default_enums_module() -> String {
    DEFAULT_ENUMS_MODULE.to_owned()
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportOptions {
    /// Scalars, enums, schema types, inputs and their registries.
    pub types: bool,
    /// Operation result and variables types, operation registries and path maps.
    pub operations: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            types: true,
            operations: true,
        }
    }
}

/// Imports schema type and operation declarations from an existing module instead of
/// emitting them.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalOptions {
    pub module: String,
    #[serde(default)]
    pub naming: Naming,
    /// Whether the external operation names lack the `Query`/`Mutation`/`Subscription` suffix.
    #[serde(default)]
    pub omit_operation_suffix: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Naming {
    #[default]
    Keep,
    PascalCase,
    CamelCase,
}

impl Naming {
    pub fn apply(self, name: &str) -> String {
        match self {
            Naming::Keep => name.to_owned(),
            Naming::PascalCase => name.to_upper_camel_case(),
            Naming::CamelCase => name.to_lower_camel_case(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn reads_toml() {
        let options = Options::from_toml(indoc! {r#"
            typename = false
            banner = "/* eslint-disable */"
            enums = { style = "import" }

            [scalars]
            DateTime = "string"

            [export]
            operations = false

            [external]
            module = "./graphql"
            naming = "camel-case"
        "#})
        .unwrap();

        assert!(!options.typename);
        assert_eq!(
            options.enums,
            EnumStyle::Import {
                module: "./enums".to_owned()
            }
        );
        assert_eq!(options.scalar("DateTime"), Some("string"));
        assert_eq!(options.scalar("Int"), Some("number"));
        assert_eq!(options.scalar("JSON"), None);
        assert!(options.export.types && !options.export.operations);

        let external = options.external.unwrap();
        assert_eq!(external.naming, Naming::CamelCase);
        assert!(!external.omit_operation_suffix);
    }

    #[test]
    fn rejects_unknown_keys() {
        let error = Options::from_toml("typenames = true").unwrap_err();

        assert!(error.to_string().starts_with("could not parse the generator options"));
    }
}
