//! # relayfs-core
//!
//! One path and filesystem abstraction over local and remote hosts.
//!
//! Callers name a host with a URI such as `local:///`, `ssh+sftp://user@host/`
//! or `cifs+winrm://host/`. The [`SessionRegistry`] turns that URI into a
//! [`Session`] backed by a [`Connection`], and the session hands out
//! [`FsPath`] values for generic file operations.
//!
//! Key components:
//!
//! - [`FsPath`] - Lexical path algebra, bound to one session
//! - [`SessionRegistry`] - At most one live session per URI identity
//! - [`ConnectionOptions`] - Options assembled from URI, defaults and overrides
//! - [`StreamChannel`], [`DirectoryStream`], [`BasicAttributes`] - Adapters
//!   from remote files to channel, listing and attribute shapes
//!
//! The wire protocols live behind [`ConnectionFactory`]. The bundled
//! [`BackendFactory`] serves the local host and an in-memory tree.

pub mod attributes;
pub mod backends;
pub mod channel;
pub mod config;
pub mod connection;
pub mod dir_stream;
mod error;
pub mod options;
pub mod path;
pub mod protocol;
pub mod registry;
pub mod session;
mod types;

pub use attributes::BasicAttributes;
pub use backends::{BackendFactory, LocalConnection, MemoryConnection};
pub use channel::StreamChannel;
pub use config::RegistryConfig;
pub use connection::{Connection, ConnectionFactory, RemoteFile, RemoteReader, RemoteWriter};
pub use dir_stream::{DirectoryStream, FilterFailure};
pub use error::{VfsError, VfsResult};
pub use options::{ConnectionOptions, OptionValue};
pub use path::FsPath;
pub use protocol::{ProtocolDescriptor, Scheme};
pub use registry::SessionRegistry;
pub use session::Session;
pub use types::{AccessMode, FileAttr, FileType, OpenOptions, OsFamily};
