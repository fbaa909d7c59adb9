//! Layered configuration for the formatter and its command-line front end.
//!
//! `defaults/extfmt.default.toml` is embedded into the crate so that the
//! documented defaults and the runtime defaults stay in sync. Callers layer
//! their own files and key overrides on top via [`Loader`] before deserializing
//! into [`ExtfmtConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../defaults/extfmt.default.toml");

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExtfmtConfig {
    pub formatter: FormatterConfig,
    pub conversions: ConversionConfig,
}

/// Knobs of the template driver and field evaluation
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FormatterConfig {
    /// Name under which fields can call back into the formatter.
    pub self_name: String,
    /// Deepest allowed nesting of formatting calls.
    pub max_depth: usize,
    /// Keep compiled fields until the cache is invalidated.
    pub cache_fields: bool,
    /// Collapse `{{` / `}}` inside field string literals.
    pub collapse_string_braces: bool,
}

/// Layout used by the alignment conversions
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConversionConfig {
    pub width: usize,
    pub fill: char,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            self_name: "format".to_string(),
            max_depth: 64,
            cache_fields: true,
            collapse_string_braces: true,
        }
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            width: 80,
            fill: ' ',
        }
    }
}

/// Builds an [`ExtfmtConfig`]: `defaults/extfmt.default.toml` first, then
/// each added source in order, later values winning.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Loader holding only the compiled-in defaults.
    pub fn new() -> Self {
        let builder =
            Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Add a TOML file that must exist; `build` fails otherwise.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Add a TOML file that is skipped when absent, e.g. a project `extfmt.toml`.
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Set one dotted key such as `conversions.width`, above every file.
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Merge the sources and deserialize them into an [`ExtfmtConfig`].
    pub fn build(self) -> Result<ExtfmtConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// The compiled-in defaults alone.
pub fn load_defaults() -> Result<ExtfmtConfig, ConfigError> {
    Loader::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn embedded_defaults_match_default_impls() {
        let config = load_defaults().expect("defaults to deserialize");
        assert_eq!(config, ExtfmtConfig::default());
    }

    #[test]
    fn supports_overrides() {
        let config = Loader::new()
            .set_override("conversions.width", 20)
            .expect("override to apply")
            .set_override("formatter.self_name", "fmt")
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert_eq!(config.conversions.width, 20);
        assert_eq!(config.formatter.self_name, "fmt");
        assert_eq!(config.formatter.max_depth, 64);
    }

    #[test]
    fn layers_user_files() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        writeln!(file, "[conversions]\nfill = \"*\"").expect("write config");

        let config = Loader::new()
            .with_file(file.path())
            .build()
            .expect("config to build");
        assert_eq!(config.conversions.fill, '*');
        assert_eq!(config.conversions.width, 80);
    }

    #[test]
    fn optional_files_may_be_missing() {
        let config = Loader::new()
            .with_optional_file("/definitely/not/here/extfmt.toml")
            .build()
            .expect("config to build");
        assert_eq!(config, ExtfmtConfig::default());
    }

    #[test]
    fn required_files_must_exist() {
        assert!(Loader::new()
            .with_file("/definitely/not/here/extfmt.toml")
            .build()
            .is_err());
    }
}
