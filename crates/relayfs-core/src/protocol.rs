//! URI schemes and the protocol descriptors they select.
//!
//! Each scheme names a base protocol handed to the connection factory plus
//! options forced on top of everything the caller supplied.

use std::str::FromStr;
use strum::{EnumIter, EnumString, IntoStaticStr};

use crate::error::{VfsError, VfsResult};
use crate::options::{ConnectionOptions, CONNECTION_TYPE, OPERATING_SYSTEM};

/// Local process protocol.
pub const LOCAL_PROTOCOL: &str = "local";
/// SSH protocol family.
pub const SSH_PROTOCOL: &str = "ssh";
/// CIFS protocol family.
pub const CIFS_PROTOCOL: &str = "cifs";

/// Every URI scheme the registry accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, IntoStaticStr)]
pub enum Scheme {
    #[strum(serialize = "local")]
    Local,
    #[strum(serialize = "ssh")]
    Ssh,
    #[strum(serialize = "ssh+sftp")]
    SshSftp,
    #[strum(serialize = "ssh+sudo")]
    SshSudo,
    #[strum(serialize = "cifs")]
    Cifs,
    #[strum(serialize = "cifs+telnet")]
    CifsTelnet,
    #[strum(serialize = "cifs+winrm")]
    CifsWinrm,
}

impl Scheme {
    /// Look up a scheme by its URI spelling.
    pub fn parse(scheme: &str) -> VfsResult<Self> {
        Scheme::from_str(scheme).map_err(|_| VfsError::UnknownScheme(scheme.to_string()))
    }

    /// URI spelling of this scheme.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Descriptor for this scheme.
    pub fn descriptor(&self) -> ProtocolDescriptor {
        match self {
            Scheme::Local => ProtocolDescriptor::new(*self, LOCAL_PROTOCOL, &[]),
            Scheme::Ssh => ProtocolDescriptor::new(*self, SSH_PROTOCOL, &[]),
            Scheme::SshSftp => {
                ProtocolDescriptor::new(*self, SSH_PROTOCOL, &[(CONNECTION_TYPE, "SFTP")])
            }
            Scheme::SshSudo => {
                ProtocolDescriptor::new(*self, SSH_PROTOCOL, &[(CONNECTION_TYPE, "SUDO")])
            }
            Scheme::Cifs => ProtocolDescriptor::new(*self, CIFS_PROTOCOL, &[]),
            Scheme::CifsTelnet => ProtocolDescriptor::new(
                *self,
                CIFS_PROTOCOL,
                &[(CONNECTION_TYPE, "TELNET"), (OPERATING_SYSTEM, "WINDOWS")],
            ),
            Scheme::CifsWinrm => ProtocolDescriptor::new(
                *self,
                CIFS_PROTOCOL,
                &[(CONNECTION_TYPE, "WINRM"), (OPERATING_SYSTEM, "WINDOWS")],
            ),
        }
    }
}

/// Base protocol plus the options a scheme forces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolDescriptor {
    /// Scheme this descriptor was selected by.
    pub scheme: Scheme,
    /// Protocol name passed to the connection factory.
    pub protocol: &'static str,
    /// Options applied after caller overrides.
    pub forced: &'static [(&'static str, &'static str)],
}

impl ProtocolDescriptor {
    const fn new(
        scheme: Scheme,
        protocol: &'static str,
        forced: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self {
            scheme,
            protocol,
            forced,
        }
    }

    /// Look up the descriptor for a URI scheme.
    pub fn for_scheme(scheme: &str) -> VfsResult<Self> {
        Ok(Scheme::parse(scheme)?.descriptor())
    }

    /// Write the forced options into `options`, replacing existing values.
    pub fn apply(&self, options: &mut ConnectionOptions) {
        for (key, value) in self.forced {
            options.set(*key, *value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_every_scheme_round_trips() {
        for scheme in Scheme::iter() {
            assert_eq!(Scheme::parse(scheme.as_str()).unwrap(), scheme);
        }
    }

    #[test]
    fn test_unknown_scheme() {
        let err = ProtocolDescriptor::for_scheme("ftp").unwrap_err();
        assert!(matches!(err, VfsError::UnknownScheme(s) if s == "ftp"));
    }

    #[test]
    fn test_sftp_forces_connection_type() {
        let descriptor = ProtocolDescriptor::for_scheme("ssh+sftp").unwrap();
        assert_eq!(descriptor.protocol, SSH_PROTOCOL);

        let mut options = ConnectionOptions::new().with(CONNECTION_TYPE, "SCP");
        descriptor.apply(&mut options);
        assert_eq!(options.get_string(CONNECTION_TYPE).as_deref(), Some("SFTP"));
    }

    #[test]
    fn test_cifs_variants_force_windows() {
        for scheme in ["cifs+telnet", "cifs+winrm"] {
            let descriptor = ProtocolDescriptor::for_scheme(scheme).unwrap();
            assert_eq!(descriptor.protocol, CIFS_PROTOCOL);

            let mut options = ConnectionOptions::new().with(OPERATING_SYSTEM, "UNIX");
            descriptor.apply(&mut options);
            assert_eq!(options.get_string(OPERATING_SYSTEM).as_deref(), Some("WINDOWS"));
        }
    }

    #[test]
    fn test_plain_schemes_force_nothing() {
        for scheme in [Scheme::Local, Scheme::Ssh, Scheme::Cifs] {
            assert!(scheme.descriptor().forced.is_empty());
        }
        assert_eq!(Scheme::Local.descriptor().protocol, LOCAL_PROTOCOL);
    }
}
