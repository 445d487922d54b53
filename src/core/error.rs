use thiserror::Error as ThisError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Parse,
    /// A single malformed command; reported per command, never fatal to a batch.
    Validation,
    /// A structurally invalid search request.
    Query,
    /// The owning shard could not be activated or reached.
    Unavailable,
    /// Snapshot save/load failure.
    Persistence,
    InvalidState,
    Internal,
}

#[derive(Debug, Clone, ThisError)]
#[error("{kind:?}: {context}")]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: impl Into<String>) -> Self {
        Error { kind, context: context.into() }
    }

    pub fn validation(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::Validation, context)
    }

    pub fn query(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::Query, context)
    }

    pub fn unavailable(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::Unavailable, context)
    }

    pub fn persistence(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::Persistence, context)
    }

    /// Whether the caller may retry the same request later with backoff.
    pub fn is_retriable(&self) -> bool {
        matches!(self.kind, ErrorKind::Unavailable | ErrorKind::Io)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::new(ErrorKind::Io, err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::new(ErrorKind::Parse, err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::new(ErrorKind::Parse, format!("JSON error: {}", err))
    }
}

impl From<lz4_flex::block::DecompressError> for Error {
    fn from(err: lz4_flex::block::DecompressError) -> Self {
        Error::new(ErrorKind::Persistence, format!("LZ4 error: {}", err))
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::new(ErrorKind::Io, format!("Failed to persist file: {}", err.error))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
