#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid declaration: {0}")]
    InvalidDeclaration(String),
    #[error("Malformed class file: {0}")]
    ClassFormat(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl From<ristretto_classfile::Error> for ApiError {
    fn from(e: ristretto_classfile::Error) -> Self {
        ApiError::ClassFormat(e.to_string())
    }
}
