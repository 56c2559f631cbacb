//! Filesystem sessions.
//!
//! A [`Session`] owns exactly one [`Connection`] and issues [`FsPath`] values.
//! It is also the generic operation surface: every method taking a path
//! resolves it to a [`RemoteFile`] through the session's connection and
//! translates the result through one of the adapters.

use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use crate::attributes::BasicAttributes;
use crate::channel::StreamChannel;
use crate::connection::{Connection, RemoteFile};
use crate::dir_stream::{DirectoryStream, FilterFailure};
use crate::error::{VfsError, VfsResult};
use crate::options::{redact_uri, OptionValue};
use crate::path::FsPath;
use crate::protocol::ProtocolDescriptor;
use crate::registry::RegistryShared;
use crate::types::{AccessMode, OpenOptions};

/// An open handle bound to one connection.
///
/// Closing a session closes its connection and evicts its identity from the
/// registry that opened it. A closed session stays closed.
pub struct Session {
    id: Uuid,
    identity: Url,
    display: String,
    base_uri: Url,
    descriptor: ProtocolDescriptor,
    separator: &'static str,
    connection: Mutex<Option<Arc<dyn Connection>>>,
    registry: Weak<RegistryShared>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("identity", &self.display)
            .field("protocol", &self.descriptor.protocol)
            .field("open", &self.is_open())
            .finish()
    }
}

impl Session {
    pub(crate) fn new(
        identity: Url,
        base_uri: Url,
        descriptor: ProtocolDescriptor,
        connection: Arc<dyn Connection>,
        registry: Weak<RegistryShared>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            display: redact_uri(&identity),
            identity,
            base_uri,
            descriptor,
            separator: connection.host_os().separator(),
            connection: Mutex::new(Some(connection)),
            registry,
        }
    }

    /// Unique id of this session; paths from different sessions never compare equal.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Normalized URI this session is registered under.
    pub fn identity(&self) -> &Url {
        &self.identity
    }

    /// Identity with any password masked, for logs and messages.
    pub fn redacted_identity(&self) -> &str {
        &self.display
    }

    /// URI that [`FsPath::to_uri`] builds on.
    pub fn base_uri(&self) -> &Url {
        &self.base_uri
    }

    /// Descriptor selected by the URI scheme.
    pub fn descriptor(&self) -> &ProtocolDescriptor {
        &self.descriptor
    }

    /// Path separator of the host behind the connection.
    pub fn separator(&self) -> &'static str {
        self.separator
    }

    /// Returns true until [`Session::close`] has run.
    pub fn is_open(&self) -> bool {
        self.connection.lock().is_some()
    }

    /// Sessions are never read-only; the back end decides what may be written.
    pub fn is_read_only(&self) -> bool {
        false
    }

    /// The live connection, or `Closed`.
    pub fn connection(&self) -> VfsResult<Arc<dyn Connection>> {
        self.connection
            .lock()
            .clone()
            .ok_or_else(|| VfsError::Closed(self.display.clone()))
    }

    /// Build a path from `first` and `more`, joined with the separator.
    pub fn path(self: &Arc<Self>, first: &str, more: &[&str]) -> FsPath {
        if more.is_empty() {
            return FsPath::parse(self, first);
        }
        let mut joined = String::from(first);
        for part in more {
            joined.push_str(self.separator);
            joined.push_str(part);
        }
        FsPath::parse(self, &joined)
    }

    /// The single root directory.
    pub fn root(self: &Arc<Self>) -> FsPath {
        FsPath::parse(self, self.separator)
    }

    /// Close the connection and release the identity. Closing twice is a no-op.
    ///
    /// The identity is released before the first await, so dropping the
    /// returned future still leaves the registry free for a new session.
    pub async fn close(&self) -> VfsResult<()> {
        let Some(connection) = self.connection.lock().take() else {
            return Ok(());
        };
        if let Some(registry) = self.registry.upgrade() {
            registry.evict(self);
        }
        info!(identity = %self.display, protocol = self.descriptor.protocol, "Closing session");
        connection.close().await
    }

    fn remote_file(&self, path: &FsPath) -> VfsResult<Arc<dyn RemoteFile>> {
        if path.session().id() != self.id {
            return Err(VfsError::invalid_argument(format!(
                "path {path} belongs to {}, not {}",
                path.session().redacted_identity(),
                self.display
            )));
        }
        Ok(self.connection()?.file(&path.to_string()))
    }

    // ========================================================================
    // Directory operations
    // ========================================================================

    /// List `dir`, keeping the children `filter` accepts.
    ///
    /// A filter error excludes that child and the listing continues.
    pub async fn read_dir<F>(&self, dir: &FsPath, filter: F) -> VfsResult<DirectoryStream>
    where
        F: FnMut(&FsPath) -> VfsResult<bool>,
    {
        self.read_dir_with(dir, filter, FilterFailure::Exclude).await
    }

    /// List `dir` with an explicit policy for filter errors.
    pub async fn read_dir_with<F>(
        &self,
        dir: &FsPath,
        filter: F,
        on_failure: FilterFailure,
    ) -> VfsResult<DirectoryStream>
    where
        F: FnMut(&FsPath) -> VfsResult<bool>,
    {
        let file = self.remote_file(dir)?;
        if !file.is_directory().await? {
            return Err(VfsError::not_a_directory(dir.to_string()));
        }
        DirectoryStream::list(dir, file.as_ref(), filter, on_failure).await
    }

    /// Create a directory. The parent must already exist.
    pub async fn create_dir(&self, dir: &FsPath) -> VfsResult<()> {
        let file = self.remote_file(dir)?;
        if file.exists().await? {
            return Err(VfsError::already_exists(dir.to_string()));
        }
        debug!(path = %dir, "Creating directory");
        file.mkdir().await
    }

    /// Delete a file or empty directory.
    pub async fn delete(&self, path: &FsPath) -> VfsResult<()> {
        let file = self.remote_file(path)?;
        if !file.exists().await? {
            return Err(VfsError::not_found(path.to_string()));
        }
        debug!(path = %path, "Deleting");
        file.delete().await
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Check if a path exists.
    pub async fn exists(&self, path: &FsPath) -> VfsResult<bool> {
        self.remote_file(path)?.exists().await
    }

    /// Fail unless `path` exists and every mode in `modes` is permitted.
    pub async fn check_access(&self, path: &FsPath, modes: &[AccessMode]) -> VfsResult<()> {
        let file = self.remote_file(path)?;
        if !file.exists().await? {
            return Err(VfsError::not_found(path.to_string()));
        }
        for mode in modes {
            let (allowed, reason) = match mode {
                AccessMode::Read => (file.can_read().await?, "Can not read"),
                AccessMode::Write => (file.can_write().await?, "Can not write"),
                AccessMode::Execute => (file.can_execute().await?, "Can not execute"),
            };
            if !allowed {
                return Err(VfsError::access_denied(path.to_string(), reason));
            }
        }
        Ok(())
    }

    /// Whether the host considers `path` hidden.
    pub async fn is_hidden(&self, path: &FsPath) -> VfsResult<bool> {
        self.remote_file(path)?.is_hidden().await
    }

    /// Snapshot the basic attributes of `path`.
    pub async fn read_attributes(&self, path: &FsPath) -> VfsResult<BasicAttributes> {
        BasicAttributes::read(self.remote_file(path)?.as_ref()).await
    }

    // ========================================================================
    // Content
    // ========================================================================

    /// Open a sequential channel over the file's streams.
    pub async fn open_channel(
        &self,
        path: &FsPath,
        options: &OpenOptions,
    ) -> VfsResult<StreamChannel> {
        StreamChannel::open(self.remote_file(path)?.as_ref(), options).await
    }

    // ========================================================================
    // Not supported
    // ========================================================================

    /// Copying is left to generic stream utilities.
    pub async fn copy(&self, _source: &FsPath, _target: &FsPath) -> VfsResult<()> {
        Err(VfsError::Unsupported("copy"))
    }

    /// Moving is not supported.
    pub async fn move_path(&self, _source: &FsPath, _target: &FsPath) -> VfsResult<()> {
        Err(VfsError::Unsupported("move"))
    }

    /// Remote files carry no stable identity to compare.
    pub async fn is_same_file(&self, _a: &FsPath, _b: &FsPath) -> VfsResult<bool> {
        Err(VfsError::Unsupported("is_same_file"))
    }

    /// Remote hosts expose no filestore enumeration.
    pub async fn file_stores(&self) -> VfsResult<Vec<String>> {
        Err(VfsError::Unsupported("file_stores"))
    }

    /// Change notification is not available over remote connections.
    pub async fn new_watch_service(&self) -> VfsResult<()> {
        Err(VfsError::Unsupported("new_watch_service"))
    }

    /// Attributes are read-only through this layer.
    pub async fn set_attribute(
        &self,
        _path: &FsPath,
        _name: &str,
        _value: OptionValue,
    ) -> VfsResult<()> {
        Err(VfsError::Unsupported("set_attribute"))
    }
}

#[cfg(test)]
pub(crate) fn test_session() -> Arc<Session> {
    test_session_with_os(crate::types::OsFamily::Unix)
}

#[cfg(test)]
pub(crate) fn test_session_with_os(os: crate::types::OsFamily) -> Arc<Session> {
    use crate::backends::MemoryConnection;
    use crate::protocol::Scheme;

    let uri = Url::parse("memory://test/").unwrap();
    Arc::new(Session::new(
        uri.clone(),
        uri,
        Scheme::Local.descriptor(),
        Arc::new(MemoryConnection::with_os(os)),
        Weak::new(),
    ))
}
