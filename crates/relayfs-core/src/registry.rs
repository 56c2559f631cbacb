//! Session registry.
//!
//! Maps normalized URIs to open [`Session`]s. At most one live session exists
//! per identity: the check, connect and insert steps of [`SessionRegistry::open`]
//! all run under a single open lock. The map itself sits behind a short,
//! synchronous lock so closing a session never waits on an open in progress.
//!
//! A URI's identity is the URI with its path replaced by `/` and its fragment
//! dropped. Scheme, user info, host, port and query all take part, so
//! `ssh://alice@host/` and `ssh://bob@host/` are different sessions.

use parking_lot::Mutex;
use percent_encoding::percent_decode_str;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::backends::BackendFactory;
use crate::config::RegistryConfig;
use crate::connection::ConnectionFactory;
use crate::error::{VfsError, VfsResult};
use crate::options::{redact_uri, ConnectionOptions};
use crate::path::FsPath;
use crate::protocol::ProtocolDescriptor;
use crate::session::Session;

/// State shared between a registry handle and the sessions it opened.
pub(crate) struct RegistryShared {
    open_lock: tokio::sync::Mutex<()>,
    sessions: Mutex<HashMap<String, Arc<Session>>>,
    factory: Arc<dyn ConnectionFactory>,
    config: RegistryConfig,
}

impl RegistryShared {
    /// Drop `session` from the map if it is still the one registered under its identity.
    pub(crate) fn evict(&self, session: &Session) {
        let mut sessions = self.sessions.lock();
        let key = session.identity().as_str();
        if sessions.get(key).is_some_and(|s| s.id() == session.id()) {
            sessions.remove(key);
            debug!(identity = %session.redacted_identity(), "Evicted session");
        }
    }
}

/// Registry of open sessions, keyed by URI identity.
///
/// Cheap to clone; clones share the same sessions.
#[derive(Clone)]
pub struct SessionRegistry {
    shared: Arc<RegistryShared>,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(BackendFactory::new())
    }
}

impl SessionRegistry {
    /// Create a registry that connects through `factory`.
    pub fn new(factory: impl ConnectionFactory + 'static) -> Self {
        Self::with_factory(Arc::new(factory), RegistryConfig::default())
    }

    /// Create a registry from a shared factory and per-scheme defaults.
    pub fn with_factory(factory: Arc<dyn ConnectionFactory>, config: RegistryConfig) -> Self {
        Self {
            shared: Arc::new(RegistryShared {
                open_lock: tokio::sync::Mutex::new(()),
                sessions: Mutex::new(HashMap::new()),
                factory,
                config,
            }),
        }
    }

    /// Registry configuration in effect.
    pub fn config(&self) -> &RegistryConfig {
        &self.shared.config
    }

    /// Normalized identity of `uri`.
    pub fn identity_of(uri: &Url) -> VfsResult<Url> {
        if uri.cannot_be_a_base() {
            return Err(VfsError::invalid_argument(format!(
                "uri has no hierarchical path: {uri}"
            )));
        }
        let mut identity = uri.clone();
        identity.set_path("/");
        identity.set_fragment(None);
        Ok(identity)
    }

    /// Open a session for `uri`. Fails with `AlreadyOpen` if one is live.
    pub async fn open(&self, uri: &str, overrides: ConnectionOptions) -> VfsResult<Arc<Session>> {
        self.open_url(&Url::parse(uri)?, overrides).await
    }

    /// Like [`SessionRegistry::open`], for an already parsed URI.
    pub async fn open_url(&self, uri: &Url, overrides: ConnectionOptions) -> VfsResult<Arc<Session>> {
        let identity = Self::identity_of(uri)?;
        let _open = self.shared.open_lock.lock().await;
        self.open_locked(uri, identity, &overrides).await
    }

    /// Caller must hold `open_lock`; only this path inserts into the map.
    async fn open_locked(
        &self,
        uri: &Url,
        identity: Url,
        overrides: &ConnectionOptions,
    ) -> VfsResult<Arc<Session>> {
        let key = identity.as_str().to_string();
        let redacted = redact_uri(&identity);
        let taken = self.shared.sessions.lock().contains_key(&key);
        if taken {
            return Err(VfsError::AlreadyOpen(redacted));
        }

        let descriptor = ProtocolDescriptor::for_scheme(uri.scheme())?;
        let options = self.build_options(&descriptor, uri, overrides);
        debug!(
            identity = %redacted,
            options = ?options.keys().collect::<Vec<_>>(),
            "Assembled connection options"
        );

        let connection = self
            .shared
            .factory
            .connect(descriptor.protocol, &options)
            .await?;

        let mut base_uri = uri.clone();
        base_uri.set_path("/");

        let session = Arc::new(Session::new(
            identity,
            base_uri,
            descriptor,
            connection,
            Arc::downgrade(&self.shared),
        ));
        self.shared.sessions.lock().insert(key, Arc::clone(&session));

        info!(identity = %redacted, protocol = descriptor.protocol, "Opened session");
        Ok(session)
    }

    /// Registry defaults, then the URI, then caller overrides, then forced options.
    fn build_options(
        &self,
        descriptor: &ProtocolDescriptor,
        uri: &Url,
        overrides: &ConnectionOptions,
    ) -> ConnectionOptions {
        let mut options = self.shared.config.defaults_for(descriptor.scheme);
        options.merge(&ConnectionOptions::from_uri(uri));
        options.merge(overrides);
        descriptor.apply(&mut options);
        options
    }

    /// Look up the live session for `uri`.
    pub async fn get(&self, uri: &str) -> VfsResult<Arc<Session>> {
        let identity = Self::identity_of(&Url::parse(uri)?)?;
        let session = self.shared.sessions.lock().get(identity.as_str()).cloned();
        session.ok_or_else(|| VfsError::not_found(redact_uri(&identity)))
    }

    /// Path named by `uri`, opening its session with no overrides if needed.
    pub async fn path_for(&self, uri: &str) -> VfsResult<FsPath> {
        let uri = Url::parse(uri)?;
        let identity = Self::identity_of(&uri)?;

        let session = {
            let _open = self.shared.open_lock.lock().await;
            let existing = self.shared.sessions.lock().get(identity.as_str()).cloned();
            match existing {
                Some(session) => session,
                None => {
                    self.open_locked(&uri, identity, &ConnectionOptions::new())
                        .await?
                }
            }
        };

        let mut path = percent_decode_str(uri.path()).decode_utf8_lossy().into_owned();
        if session.separator() != "/" {
            path = path.replace('/', session.separator());
        }
        Ok(session.path(&path, &[]))
    }

    /// Identities of every live session, sorted, with passwords masked.
    pub async fn list(&self) -> Vec<String> {
        let mut identities: Vec<_> = self
            .shared
            .sessions
            .lock()
            .values()
            .map(|s| s.redacted_identity().to_string())
            .collect();
        identities.sort();
        identities
    }

    /// Close every live session.
    pub async fn close_all(&self) {
        let drained: Vec<_> = self
            .shared
            .sessions
            .lock()
            .drain()
            .map(|(_, session)| session)
            .collect();

        for session in drained {
            if let Err(e) = session.close().await {
                warn!(identity = %session.redacted_identity(), error = %e, "Failed to close session");
            }
        }
    }
}
