//! Registry configuration.
//!
//! Per-scheme default connection options, loaded from TOML. Defaults sit
//! below everything the URI and the caller supply.
//!
//! ```toml
//! [defaults.ssh]
//! os = "UNIX"
//! connectionType = "SCP"
//!
//! [defaults."cifs+winrm"]
//! port = 5986
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::error::{VfsError, VfsResult};
use crate::options::ConnectionOptions;
use crate::protocol::Scheme;

/// Configuration for a [`crate::SessionRegistry`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Default options keyed by URI scheme.
    #[serde(default)]
    pub defaults: BTreeMap<String, ConnectionOptions>,
}

impl RegistryConfig {
    /// Parse a TOML document. Every table under `defaults` must name a known scheme.
    pub fn from_toml(content: &str) -> VfsResult<Self> {
        let config: RegistryConfig =
            toml::from_str(content).map_err(|e| VfsError::Config(e.to_string()))?;
        for scheme in config.defaults.keys() {
            Scheme::parse(scheme)
                .map_err(|_| VfsError::Config(format!("defaults for unknown scheme: {scheme}")))?;
        }
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub async fn load(path: impl AsRef<Path>) -> VfsResult<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            VfsError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), "Loaded registry config");
        Self::from_toml(&content)
    }

    /// Add defaults for `scheme`, replacing any already set.
    pub fn with_default(mut self, scheme: Scheme, options: ConnectionOptions) -> Self {
        self.defaults.insert(scheme.as_str().to_string(), options);
        self
    }

    /// Defaults for `scheme`, empty if none were configured.
    pub fn defaults_for(&self, scheme: Scheme) -> ConnectionOptions {
        self.defaults
            .get(scheme.as_str())
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{OptionValue, CONNECTION_TYPE, OPERATING_SYSTEM, PORT};

    #[test]
    fn test_parse_defaults() {
        let toml = r#"
[defaults.ssh]
os = "UNIX"
connectionType = "SCP"

[defaults."cifs+winrm"]
port = 5986
"#;
        let config = RegistryConfig::from_toml(toml).unwrap();

        let ssh = config.defaults_for(Scheme::Ssh);
        assert_eq!(ssh.get_string(OPERATING_SYSTEM).as_deref(), Some("UNIX"));
        assert_eq!(ssh.get_string(CONNECTION_TYPE).as_deref(), Some("SCP"));

        let winrm = config.defaults_for(Scheme::CifsWinrm);
        assert_eq!(winrm.get(PORT), Some(&OptionValue::Integer(5986)));

        assert!(config.defaults_for(Scheme::Local).is_empty());
    }

    #[test]
    fn test_empty_document() {
        let config = RegistryConfig::from_toml("").unwrap();
        assert!(config.defaults.is_empty());
    }

    #[test]
    fn test_unknown_scheme_rejected() {
        let err = RegistryConfig::from_toml("[defaults.ftp]\nport = 21\n").unwrap_err();
        assert!(matches!(err, VfsError::Config(msg) if msg.contains("ftp")));
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            RegistryConfig::from_toml("[defaults"),
            Err(VfsError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relayfs.toml");
        std::fs::write(&path, "[defaults.local]\nos = \"WINDOWS\"\n").unwrap();

        let config = RegistryConfig::load(&path).await.unwrap();
        assert_eq!(
            config.defaults_for(Scheme::Local).get_string(OPERATING_SYSTEM).as_deref(),
            Some("WINDOWS")
        );

        let missing = RegistryConfig::load(dir.path().join("absent.toml")).await;
        assert!(matches!(missing, Err(VfsError::Config(_))));
    }

    #[test]
    fn test_with_default() {
        let config = RegistryConfig::default()
            .with_default(Scheme::Ssh, ConnectionOptions::new().with(PORT, 2222i64));
        assert_eq!(config.defaults_for(Scheme::Ssh).get(PORT), Some(&OptionValue::Integer(2222)));
    }
}
