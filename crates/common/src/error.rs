//! Error types for SelfHeal

use thiserror::Error;

/// Result type alias using SelfHeal Error
pub type Result<T> = std::result::Result<T, Error>;

/// SelfHeal error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Config encode error: {0}")]
    TomlEncode(#[from] toml::ser::Error),

    #[error("Not found: {kind} {id}")]
    NotFound { kind: String, id: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid {field} value: {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("LLM request failed: {0}")]
    Llm(String),

    #[error("Fix could not be applied: {0}")]
    Fix(String),
}

impl Error {
    pub(crate) fn invalid(field: &'static str, value: impl Into<String>) -> Self {
        Error::InvalidValue {
            field,
            value: value.into(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Llm(e.to_string())
    }
}
