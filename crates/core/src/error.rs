use thiserror::Error;
use weft_api::ApiError;
use weft_mapping::MappingError;

#[derive(Error, Debug)]
pub enum WeftError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),
    #[error("Invalid handler declaration: {0}")]
    InvalidHandlerDeclaration(String),
    #[error("Failed to construct handler {handler}: {reason}")]
    HandlerConstruction { handler: String, reason: String },
    #[error("Adapter generation failed: {0}")]
    Generation(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, WeftError>;
