use thiserror::Error;

/// Errors raised by the shared domain layer.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Failed to read schema file {path}: {source}")]
    SchemaFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid value for property type {type_name}: {reason}")]
    InvalidValue { type_name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
