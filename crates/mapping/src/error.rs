use thiserror::Error;

#[derive(Error, Debug)]
pub enum MappingError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("No mappings for game version {0}")]
    UnknownVersion(String),
    #[error("Duplicate mapping for {0}")]
    Duplicate(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, MappingError>;
