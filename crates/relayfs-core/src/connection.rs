//! Collaborator traits for connections and the files they reach.
//!
//! The registry never talks a wire protocol itself. A [`ConnectionFactory`]
//! turns a protocol name plus [`ConnectionOptions`] into a [`Connection`], and
//! every path operation resolves to a [`RemoteFile`] obtained from it.

use async_trait::async_trait;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::VfsResult;
use crate::options::ConnectionOptions;
use crate::types::{FileAttr, OsFamily};

/// Boxed read half returned by [`RemoteFile::open_read`].
pub type RemoteReader = Pin<Box<dyn AsyncRead + Send>>;

/// Boxed write half returned by [`RemoteFile::open_write`].
pub type RemoteWriter = Pin<Box<dyn AsyncWrite + Send>>;

/// Creates connections for a base protocol name.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    /// Open a connection speaking `protocol`, configured by `options`.
    async fn connect(
        &self,
        protocol: &str,
        options: &ConnectionOptions,
    ) -> VfsResult<Arc<dyn Connection>>;
}

/// A live, session-scoped handle on one back end.
#[async_trait]
pub trait Connection: Send + Sync + fmt::Debug {
    /// Base protocol name this connection speaks.
    fn protocol(&self) -> &str;

    /// Operating system family of the host; decides the path separator.
    fn host_os(&self) -> OsFamily;

    /// Get the file at `path` (rendered with the host separator).
    fn file(&self, path: &str) -> Arc<dyn RemoteFile>;

    /// Release the connection.
    async fn close(&self) -> VfsResult<()>;
}

/// One file or directory reachable through a [`Connection`].
#[async_trait]
pub trait RemoteFile: Send + Sync + fmt::Debug {
    /// Full path of this file on the host.
    fn path(&self) -> &str;

    /// Type, size, modification time and permission bits.
    async fn metadata(&self) -> VfsResult<FileAttr>;

    /// Whether the current user may read this file.
    async fn can_read(&self) -> VfsResult<bool>;

    /// Whether the current user may write this file.
    async fn can_write(&self) -> VfsResult<bool>;

    /// Whether the current user may execute this file.
    async fn can_execute(&self) -> VfsResult<bool>;

    /// Whether the host considers this file hidden.
    async fn is_hidden(&self) -> VfsResult<bool>;

    /// Open a stream over the file contents.
    async fn open_read(&self) -> VfsResult<RemoteReader>;

    /// Open a stream that replaces the file contents, creating the file if needed.
    async fn open_write(&self) -> VfsResult<RemoteWriter>;

    /// List the direct children of this directory.
    async fn list_files(&self) -> VfsResult<Vec<Arc<dyn RemoteFile>>>;

    /// Create this directory. The parent must exist.
    async fn mkdir(&self) -> VfsResult<()>;

    /// Delete this file or empty directory.
    async fn delete(&self) -> VfsResult<()>;

    // ========================================================================
    // Convenience methods (default implementations)
    // ========================================================================

    /// Check if the file exists.
    async fn exists(&self) -> VfsResult<bool> {
        match self.metadata().await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Check if this is a directory. Missing files are not directories.
    async fn is_directory(&self) -> VfsResult<bool> {
        match self.metadata().await {
            Ok(attr) => Ok(attr.is_dir()),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
