use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("internal error: {0}")]
    InternalError(String),
    #[error("failed to dispatch request to {path}: {message}")]
    Request { path: String, message: String },
    #[error("non-success status code {status} from {path}")]
    UnexpectedStatus { path: String, status: u16 },
    #[error("failed to decode response body from {path}: {message}")]
    Decode { path: String, message: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExporterError>;
