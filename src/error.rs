//! Error types for schema resolution

use thiserror::Error;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema resolution errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Unknown type {reference} in {scope}")]
    UnresolvedType { reference: String, scope: String },

    #[error("Unknown root type: {name}{}", format_suggestions(.suggestions))]
    UnknownRoot {
        name: String,
        suggestions: Vec<String>,
    },

    #[error("Integrity violation: {source_name} references {target}, which is not in the model")]
    Integrity { source_name: String, target: String },

    #[error("Schema file not found on the search path: {0}")]
    MissingFile(String),

    #[error("Invalid schema format: {0}")]
    InvalidFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean {}?)", suggestions.join(", "))
    }
}

impl SchemaError {
    /// True for errors raised by the resolution core rather than its adapters
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            Self::UnresolvedType { .. } | Self::UnknownRoot { .. } | Self::Integrity { .. }
        )
    }
}
