//! Bundled connection implementations.

mod local;
mod memory;

pub use local::{LocalConnection, LocalFile};
pub use memory::{MemoryConnection, MemoryFile, MEMORY_PROTOCOL};

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::connection::{Connection, ConnectionFactory};
use crate::error::{VfsError, VfsResult};
use crate::options::{ConnectionOptions, OPERATING_SYSTEM};
use crate::protocol::LOCAL_PROTOCOL;
use crate::types::OsFamily;

/// Default factory: serves `local` and `memory`.
///
/// Every other protocol fails with `UnknownProtocol`; wire protocols come from
/// a caller-supplied [`ConnectionFactory`].
#[derive(Debug, Clone, Default)]
pub struct BackendFactory;

impl BackendFactory {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ConnectionFactory for BackendFactory {
    async fn connect(
        &self,
        protocol: &str,
        options: &ConnectionOptions,
    ) -> VfsResult<Arc<dyn Connection>> {
        debug!(protocol, "Connecting bundled backend");
        match protocol {
            LOCAL_PROTOCOL => Ok(Arc::new(LocalConnection::new())),
            MEMORY_PROTOCOL => {
                let os = options.get(OPERATING_SYSTEM).and_then(|v| v.as_str());
                Ok(Arc::new(MemoryConnection::with_os(OsFamily::from_option(os))))
            }
            other => Err(VfsError::UnknownProtocol(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serves_local() {
        let conn = BackendFactory::new()
            .connect(LOCAL_PROTOCOL, &ConnectionOptions::new())
            .await
            .unwrap();
        assert_eq!(conn.protocol(), LOCAL_PROTOCOL);
    }

    #[tokio::test]
    async fn test_memory_honours_os_option() {
        let options = ConnectionOptions::new().with(OPERATING_SYSTEM, "windows");
        let conn = BackendFactory::new().connect(MEMORY_PROTOCOL, &options).await.unwrap();
        assert_eq!(conn.host_os(), OsFamily::Windows);
    }

    #[tokio::test]
    async fn test_rejects_wire_protocols() {
        let result = BackendFactory::new()
            .connect("ssh", &ConnectionOptions::new())
            .await;
        assert!(matches!(result, Err(VfsError::UnknownProtocol(p)) if p == "ssh"));
    }
}
