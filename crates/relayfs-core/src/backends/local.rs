//! Local filesystem connection.
//!
//! Serves the `local` protocol: paths are absolute host paths, accessed
//! through `tokio::fs`.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

use crate::connection::{Connection, RemoteFile, RemoteReader, RemoteWriter};
use crate::error::{VfsError, VfsResult};
use crate::protocol::LOCAL_PROTOCOL;
use crate::types::{FileAttr, FileType, OsFamily};

/// Connection to the filesystem of the current host.
#[derive(Debug, Clone, Default)]
pub struct LocalConnection;

impl LocalConnection {
    /// Create a local connection.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connection for LocalConnection {
    fn protocol(&self) -> &str {
        LOCAL_PROTOCOL
    }

    fn host_os(&self) -> OsFamily {
        if cfg!(windows) {
            OsFamily::Windows
        } else {
            OsFamily::Unix
        }
    }

    fn file(&self, path: &str) -> Arc<dyn RemoteFile> {
        Arc::new(LocalFile::new(path))
    }

    async fn close(&self) -> VfsResult<()> {
        Ok(())
    }
}

/// A path on the local host.
#[derive(Debug, Clone)]
pub struct LocalFile {
    path: PathBuf,
    display: String,
}

impl LocalFile {
    fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            display: path.to_string_lossy().into_owned(),
            path,
        }
    }

    /// Convert std::fs::Metadata to FileAttr.
    fn metadata_to_attr(meta: &std::fs::Metadata) -> FileAttr {
        let kind = if meta.is_dir() {
            FileType::Directory
        } else if meta.is_file() {
            FileType::File
        } else {
            FileType::Other
        };

        FileAttr {
            size: meta.len(),
            kind,
            perm: permission_bits(meta),
            mtime: meta.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH),
        }
    }

    async fn require_exists(&self) -> VfsResult<std::fs::Metadata> {
        fs::metadata(&self.path).await.map_err(VfsError::from)
    }
}

#[cfg(unix)]
fn permission_bits(meta: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode()
}

#[cfg(not(unix))]
fn permission_bits(meta: &std::fs::Metadata) -> u32 {
    if meta.permissions().readonly() { 0o444 } else { 0o666 }
}

/// `access(2)` blocks on the filesystem, so it runs on the blocking pool.
#[cfg(unix)]
async fn access(path: &Path, mode: rustix::fs::Access) -> VfsResult<bool> {
    let path = path.to_path_buf();
    let result = tokio::task::spawn_blocking(move || rustix::fs::access(&path, mode))
        .await
        .map_err(|e| VfsError::Io(std::io::Error::other(e)))?;
    match result {
        Ok(()) => Ok(true),
        Err(rustix::io::Errno::ACCESS) | Err(rustix::io::Errno::ROFS) => Ok(false),
        Err(e) => Err(VfsError::Io(e.into())),
    }
}

#[async_trait]
impl RemoteFile for LocalFile {
    fn path(&self) -> &str {
        &self.display
    }

    async fn metadata(&self) -> VfsResult<FileAttr> {
        let meta = self.require_exists().await?;
        Ok(Self::metadata_to_attr(&meta))
    }

    #[cfg(unix)]
    async fn can_read(&self) -> VfsResult<bool> {
        access(&self.path, rustix::fs::Access::READ_OK).await
    }

    #[cfg(not(unix))]
    async fn can_read(&self) -> VfsResult<bool> {
        self.require_exists().await.map(|_| true)
    }

    #[cfg(unix)]
    async fn can_write(&self) -> VfsResult<bool> {
        access(&self.path, rustix::fs::Access::WRITE_OK).await
    }

    #[cfg(not(unix))]
    async fn can_write(&self) -> VfsResult<bool> {
        Ok(!self.require_exists().await?.permissions().readonly())
    }

    #[cfg(unix)]
    async fn can_execute(&self) -> VfsResult<bool> {
        access(&self.path, rustix::fs::Access::EXEC_OK).await
    }

    #[cfg(not(unix))]
    async fn can_execute(&self) -> VfsResult<bool> {
        let meta = self.require_exists().await?;
        Ok(meta.is_dir()
            || self
                .path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("exe")))
    }

    #[cfg(not(windows))]
    async fn is_hidden(&self) -> VfsResult<bool> {
        Ok(self
            .path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with('.')))
    }

    #[cfg(windows)]
    async fn is_hidden(&self) -> VfsResult<bool> {
        use std::os::windows::fs::MetadataExt;
        const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
        let meta = self.require_exists().await?;
        Ok(meta.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0)
    }

    async fn open_read(&self) -> VfsResult<RemoteReader> {
        let file = fs::File::open(&self.path).await.map_err(VfsError::from)?;
        Ok(Box::pin(file))
    }

    async fn open_write(&self) -> VfsResult<RemoteWriter> {
        let file = fs::File::create(&self.path).await.map_err(VfsError::from)?;
        Ok(Box::pin(file))
    }

    async fn list_files(&self) -> VfsResult<Vec<Arc<dyn RemoteFile>>> {
        let mut dir = fs::read_dir(&self.path).await.map_err(VfsError::from)?;
        let mut children = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(VfsError::from)? {
            children.push(LocalFile::new(entry.path()));
        }

        // read_dir order is unspecified; sort for stable listings
        children.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(children
            .into_iter()
            .map(|c| Arc::new(c) as Arc<dyn RemoteFile>)
            .collect())
    }

    async fn mkdir(&self) -> VfsResult<()> {
        fs::create_dir(&self.path).await.map_err(VfsError::from)
    }

    async fn delete(&self) -> VfsResult<()> {
        let meta = fs::symlink_metadata(&self.path).await.map_err(VfsError::from)?;
        if meta.is_dir() {
            fs::remove_dir(&self.path).await.map_err(VfsError::from)
        } else {
            fs::remove_file(&self.path).await.map_err(VfsError::from)
        }
    }
}
