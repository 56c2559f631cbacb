//! Basic file attributes.

use std::time::SystemTime;

use crate::connection::RemoteFile;
use crate::error::VfsResult;
use crate::types::{FileAttr, FileType};

/// Snapshot of a remote file's metadata.
///
/// Back ends only report a modification time, so the access and creation
/// times repeat it.
#[derive(Debug, Clone)]
pub struct BasicAttributes {
    attr: FileAttr,
}

impl BasicAttributes {
    pub(crate) async fn read(file: &dyn RemoteFile) -> VfsResult<Self> {
        Ok(Self {
            attr: file.metadata().await?,
        })
    }

    pub fn last_modified_time(&self) -> SystemTime {
        self.attr.mtime
    }

    pub fn last_access_time(&self) -> SystemTime {
        self.attr.mtime
    }

    pub fn creation_time(&self) -> SystemTime {
        self.attr.mtime
    }

    pub fn is_regular_file(&self) -> bool {
        self.attr.is_file()
    }

    pub fn is_directory(&self) -> bool {
        self.attr.is_dir()
    }

    /// Links are never reported.
    pub fn is_symbolic_link(&self) -> bool {
        false
    }

    pub fn is_other(&self) -> bool {
        self.attr.kind == FileType::Other
    }

    pub fn size(&self) -> u64 {
        self.attr.size
    }

    /// Remote files have no stable identity.
    pub fn file_key(&self) -> Option<&str> {
        None
    }

    /// Permission bits as reported by the back end.
    pub fn permissions(&self) -> u32 {
        self.attr.perm
    }
}
