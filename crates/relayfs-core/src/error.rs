//! Error types for sessions, paths and remote file operations.

use std::io;
use thiserror::Error;

/// Error type shared by every layer of the crate.
#[derive(Debug, Error)]
pub enum VfsError {
    /// A session for this identity is already open.
    #[error("session already open: {0}")]
    AlreadyOpen(String),

    /// Unknown session identity, or a missing path.
    #[error("not found: {0}")]
    NotFound(String),

    /// Path already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Requested access mode is not permitted.
    #[error("access denied: {path}: {reason}")]
    AccessDenied { path: String, reason: String },

    /// Malformed index, range or argument combination.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation intentionally not implemented.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// The channel was not opened with the intent this call needs.
    #[error("channel not open for {0}")]
    NotOpenFor(&'static str),

    /// The session has been closed.
    #[error("session closed: {0}")]
    Closed(String),

    /// No protocol descriptor for this URI scheme.
    #[error("unknown scheme: {0}")]
    UnknownScheme(String),

    /// The connection factory does not serve this protocol.
    #[error("unknown protocol: {0}")]
    UnknownProtocol(String),

    /// URI could not be parsed.
    #[error("invalid uri: {0}")]
    InvalidUri(#[from] url::ParseError),

    /// Registry configuration could not be loaded.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failure raised by a connection implementation.
    #[error("{protocol} connection error: {source}")]
    Connection {
        protocol: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl VfsError {
    /// Create a NotFound error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    /// Create an AccessDenied error.
    pub fn access_denied(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AccessDenied {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidArgument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory(path.into())
    }

    /// Wrap an error raised by a connection implementation.
    pub fn connection(
        protocol: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Connection {
            protocol: protocol.into(),
            source: source.into(),
        }
    }

    /// Returns true for the errors that mean "nothing there".
    pub fn is_not_found(&self) -> bool {
        match self {
            VfsError::NotFound(_) => true,
            VfsError::Io(e) => e.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Convert VfsError to std::io::Error so adapters can surface it through tokio's I/O traits.
impl From<VfsError> for io::Error {
    fn from(e: VfsError) -> Self {
        match e {
            VfsError::AlreadyOpen(msg) => io::Error::new(io::ErrorKind::AlreadyExists, msg),
            VfsError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            VfsError::AlreadyExists(msg) => io::Error::new(io::ErrorKind::AlreadyExists, msg),
            VfsError::AccessDenied { path, reason } => io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{path}: {reason}"),
            ),
            VfsError::InvalidArgument(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            VfsError::Unsupported(op) => io::Error::new(io::ErrorKind::Unsupported, op),
            VfsError::NotADirectory(msg) => io::Error::new(io::ErrorKind::NotADirectory, msg),
            VfsError::Closed(msg) => io::Error::new(io::ErrorKind::NotConnected, msg),
            VfsError::Io(e) => e,
            other => io::Error::other(other.to_string()),
        }
    }
}

/// Result type used throughout the crate.
pub type VfsResult<T> = Result<T, VfsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_kinds() {
        let e: io::Error = VfsError::not_found("/missing").into();
        assert_eq!(e.kind(), io::ErrorKind::NotFound);

        let e: io::Error = VfsError::Unsupported("position").into();
        assert_eq!(e.kind(), io::ErrorKind::Unsupported);

        let e: io::Error = VfsError::access_denied("/etc/shadow", "Can not read").into();
        assert_eq!(e.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_io_error_round_trips_cause() {
        let inner = io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed");
        let e: io::Error = VfsError::from(inner).into();
        assert_eq!(e.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_is_not_found() {
        assert!(VfsError::not_found("x").is_not_found());
        assert!(VfsError::Io(io::Error::from(io::ErrorKind::NotFound)).is_not_found());
        assert!(!VfsError::already_exists("x").is_not_found());
    }
}
