//! Configuration management for the schema compiler
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (proto-schemas.toml)
//! - Environment variables (PROTO_SCHEMAS__*)
//!
//! Command-line flags override whatever is loaded here.
//!
//! ## Example config file (proto-schemas.toml):
//! ```toml
//! [compiler]
//! proto_path = "./parsed"
//! output_dir = "./generated"
//! roots = ["squareup.protos.Person"]
//! emit_options = true
//!
//! [export]
//! output_format = "pretty"
//!
//! [load]
//! skip_prefixes = ["target/", ".git/"]
//! extension = "json"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::loader::{LoadConfig, ModelLoader};

/// Main configuration for the compiler
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Pipeline settings
    #[serde(default)]
    pub compiler: PipelineConfig,

    /// Output settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Search path scanning
    #[serde(default)]
    pub load: LoadSettings,
}

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Schema search path
    #[serde(default = "default_proto_path")]
    pub proto_path: PathBuf,

    /// Where the compiled model is written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Source files to compile; empty compiles everything on the search path
    #[serde(default)]
    pub sources: Vec<String>,

    /// Roots to filter to; absent keeps every declaration
    #[serde(default)]
    pub roots: Option<Vec<String>>,

    /// Retain option values and option-extending extend blocks
    #[serde(default = "default_true")]
    pub emit_options: bool,
}

/// Export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Output format (pretty or compact)
    #[serde(default = "default_output_format")]
    pub output_format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown output format: {} (expected pretty or compact)", other)),
        }
    }
}

/// Search path scanning settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadSettings {
    /// Paths to skip, relative to the search path
    #[serde(default = "default_skip_prefixes")]
    pub skip_prefixes: Vec<String>,

    /// Parser document extension
    #[serde(default = "default_extension")]
    pub extension: String,
}

// Default value functions
fn default_proto_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("generated")
}

fn default_true() -> bool {
    true
}

fn default_output_format() -> OutputFormat {
    OutputFormat::Pretty
}

fn default_skip_prefixes() -> Vec<String> {
    LoadConfig::default().skip_prefixes
}

fn default_extension() -> String {
    LoadConfig::default().extension
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            proto_path: default_proto_path(),
            output_dir: default_output_dir(),
            sources: Vec::new(),
            roots: None,
            emit_options: true,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Pretty,
        }
    }
}

impl Default for LoadSettings {
    fn default() -> Self {
        Self {
            skip_prefixes: default_skip_prefixes(),
            extension: default_extension(),
        }
    }
}

impl From<&LoadSettings> for LoadConfig {
    fn from(settings: &LoadSettings) -> Self {
        Self {
            skip_prefixes: settings.skip_prefixes.clone(),
            extension: settings.extension.clone(),
        }
    }
}

impl CompilerConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, adding a specific file on top of the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = [
            "proto-schemas.toml",
            ".proto-schemas.toml",
            "config/proto-schemas.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "proto-schemas") {
            let xdg_config = config_dir.config_dir().join("proto-schemas.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (PROTO_SCHEMAS__*)
        builder = builder.add_source(
            Environment::with_prefix("PROTO_SCHEMAS")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Scanner settings for the loader
    pub fn load_config(&self) -> LoadConfig {
        LoadConfig::from(&self.load)
    }

    /// Scan the configured search path, leaving out the output directory
    pub fn scan_model(&self) -> crate::Result<ModelLoader> {
        let mut load = self.load_config();
        load.exclude_dir(&self.compiler.proto_path, &self.compiler.output_dir);
        ModelLoader::scan(&self.compiler.proto_path, &load)
    }
}
