use thiserror::Error as ThisError;

/// All possible formrelay library errors
#[derive(Clone, Debug, ThisError)]
pub enum Error {
    /// Required SMTP settings are absent; raised per request, never at startup
    #[error("{0}")]
    ConfigMissing(String),
    /// Configuration is present but malformed
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Failed to build message: {0}")]
    Build(String),
    #[error("{0}")]
    SendFailed(String),
    #[error(transparent)]
    UploadRejected(#[from] UploadError),
}

/// Reasons a request body is refused before any handler runs
#[derive(Clone, Debug, PartialEq, ThisError)]
pub enum UploadError {
    #[error("File too large in field '{field}' (limit is {limit} bytes)")]
    FileTooLarge { field: String, limit: u64 },
    #[error("Unexpected file field '{0}'")]
    UnexpectedField(String),
    #[error("Too many files in field '{field}' (limit is {limit})")]
    TooManyFiles { field: String, limit: usize },
    #[error("Request body too large (limit is {0} bytes)")]
    BodyTooLarge(u64),
    #[error("Malformed request body: {0}")]
    Malformed(String),
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<lettre::error::Error> for Error {
    fn from(err: lettre::error::Error) -> Self {
        Self::Build(err.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for Error {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        Self::SendFailed(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::UploadRejected(UploadError::Malformed(err.to_string()))
    }
}
