//! Core value types shared by connections and adapters.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::SystemTime;
use strum::{EnumString, IntoStaticStr};

/// File type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Anything else the back end reports (devices, sockets, ...).
    Other,
}

impl FileType {
    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }
}

/// Metadata reported by a remote file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAttr {
    /// Size in bytes.
    pub size: u64,
    /// File type.
    pub kind: FileType,
    /// Unix permission bits (e.g., 0o644).
    pub perm: u32,
    /// Last modification time.
    pub mtime: SystemTime,
}

impl FileAttr {
    /// Attributes for a regular file modified now.
    pub fn file(size: u64, perm: u32) -> Self {
        Self {
            size,
            kind: FileType::File,
            perm,
            mtime: SystemTime::now(),
        }
    }

    /// Attributes for a directory modified now.
    pub fn directory(perm: u32) -> Self {
        Self {
            size: 0,
            kind: FileType::Directory,
            perm,
            mtime: SystemTime::now(),
        }
    }

    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

/// Access modes accepted by `Session::check_access`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    Read,
    Write,
    Execute,
}

/// Operating system family of the host behind a connection.
///
/// Parsed from the `os` connection option, case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, IntoStaticStr)]
#[strum(ascii_case_insensitive)]
pub enum OsFamily {
    #[default]
    #[strum(serialize = "UNIX")]
    Unix,
    #[strum(serialize = "WINDOWS")]
    Windows,
}

impl OsFamily {
    /// Parse an `os` option value, falling back to Unix for anything unrecognized.
    pub fn from_option(value: Option<&str>) -> Self {
        value
            .and_then(|v| OsFamily::from_str(v).ok())
            .unwrap_or_default()
    }

    /// Path separator used on this family.
    pub fn separator(&self) -> &'static str {
        match self {
            OsFamily::Unix => "/",
            OsFamily::Windows => "\\",
        }
    }

    /// Canonical option spelling (`UNIX` / `WINDOWS`).
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// Access intents for `Session::open_channel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenOptions {
    /// Read access requested.
    pub read: bool,
    /// Write access requested.
    pub write: bool,
    /// Create if not exists.
    pub create: bool,
    /// Exclusive create (fail if exists).
    pub create_new: bool,
}

impl OpenOptions {
    /// Read-only access.
    pub fn read() -> Self {
        Self {
            read: true,
            ..Default::default()
        }
    }

    /// Write access.
    pub fn write() -> Self {
        Self {
            write: true,
            ..Default::default()
        }
    }

    /// Create with write access.
    pub fn create() -> Self {
        Self {
            write: true,
            create: true,
            ..Default::default()
        }
    }

    /// Create exclusively (fail if exists).
    pub fn create_new() -> Self {
        Self {
            write: true,
            create_new: true,
            ..Default::default()
        }
    }

    /// Also request read access.
    pub fn with_read(mut self) -> Self {
        self.read = true;
        self
    }

    /// True when any write-like intent is present.
    pub fn wants_output(&self) -> bool {
        self.write || self.create || self.create_new
    }
}
