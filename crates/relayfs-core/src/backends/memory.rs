//! In-memory connection.
//!
//! Used for testing and embedding. All data is ephemeral and shared by every
//! clone of the same [`MemoryConnection`].

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::SystemTime;
use tokio::io::AsyncWrite;

use crate::connection::{Connection, RemoteFile, RemoteReader, RemoteWriter};
use crate::error::{VfsError, VfsResult};
use crate::types::{FileAttr, OsFamily};

/// Protocol name reported by memory connections.
pub const MEMORY_PROTOCOL: &str = "memory";

/// Entry in the memory tree.
#[derive(Debug, Clone)]
enum Entry {
    File { data: Vec<u8>, attr: FileAttr },
    Directory { attr: FileAttr },
}

impl Entry {
    fn attr(&self) -> FileAttr {
        match self {
            Entry::File { data, attr } => FileAttr {
                size: data.len() as u64,
                ..attr.clone()
            },
            Entry::Directory { attr } => attr.clone(),
        }
    }
}

type Key = Vec<String>;

#[derive(Debug)]
struct Tree {
    os: OsFamily,
    entries: RwLock<BTreeMap<Key, Entry>>,
}

impl Tree {
    fn key(&self, path: &str) -> Key {
        path.split(self.os.separator())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn render(&self, key: &[String]) -> String {
        let separator = self.os.separator();
        format!("{separator}{}", key.join(separator))
    }

    /// Ensure all parent directories of `key` exist.
    fn ensure_parents(entries: &mut BTreeMap<Key, Entry>, key: &[String]) {
        for depth in 0..key.len() {
            entries
                .entry(key[..depth].to_vec())
                .or_insert_with(|| Entry::Directory {
                    attr: FileAttr::directory(0o755),
                });
        }
    }
}

/// In-memory connection.
///
/// Thread-safe via an internal `RwLock`. Clones share the same tree.
#[derive(Debug, Clone)]
pub struct MemoryConnection {
    tree: Arc<Tree>,
}

impl Default for MemoryConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryConnection {
    /// Create an empty Unix-flavoured tree.
    pub fn new() -> Self {
        Self::with_os(OsFamily::Unix)
    }

    /// Create an empty tree using the separator of `os`.
    pub fn with_os(os: OsFamily) -> Self {
        let mut entries = BTreeMap::new();
        // Root directory always exists
        entries.insert(
            Vec::new(),
            Entry::Directory {
                attr: FileAttr::directory(0o755),
            },
        );
        Self {
            tree: Arc::new(Tree {
                os,
                entries: RwLock::new(entries),
            }),
        }
    }

    /// Seed a file, creating missing parent directories.
    pub fn put_file(&self, path: &str, data: &[u8], perm: u32) {
        let key = self.tree.key(path);
        let mut entries = self.tree.entries.write();
        Tree::ensure_parents(&mut entries, &key);
        entries.insert(
            key,
            Entry::File {
                data: data.to_vec(),
                attr: FileAttr::file(data.len() as u64, perm),
            },
        );
    }

    /// Seed a directory, creating missing parent directories.
    pub fn put_dir(&self, path: &str) {
        let key = self.tree.key(path);
        let mut entries = self.tree.entries.write();
        Tree::ensure_parents(&mut entries, &key);
        entries.entry(key).or_insert_with(|| Entry::Directory {
            attr: FileAttr::directory(0o755),
        });
    }

    /// Contents of the file at `path`, if it is a file.
    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        let key = self.tree.key(path);
        match self.tree.entries.read().get(&key) {
            Some(Entry::File { data, .. }) => Some(data.clone()),
            _ => None,
        }
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    fn protocol(&self) -> &str {
        MEMORY_PROTOCOL
    }

    fn host_os(&self) -> OsFamily {
        self.tree.os
    }

    fn file(&self, path: &str) -> Arc<dyn RemoteFile> {
        let key = self.tree.key(path);
        Arc::new(MemoryFile {
            path: self.tree.render(&key),
            tree: Arc::clone(&self.tree),
            key,
        })
    }

    async fn close(&self) -> VfsResult<()> {
        Ok(())
    }
}

/// A file or directory inside a [`MemoryConnection`].
#[derive(Debug)]
pub struct MemoryFile {
    tree: Arc<Tree>,
    key: Key,
    path: String,
}

impl MemoryFile {
    fn lookup(&self) -> VfsResult<Entry> {
        self.tree
            .entries
            .read()
            .get(&self.key)
            .cloned()
            .ok_or_else(|| VfsError::not_found(self.path.clone()))
    }

    fn perm_bit(&self, mask: u32) -> VfsResult<bool> {
        Ok(self.lookup()?.attr().perm & mask != 0)
    }

    fn parent_is_directory(entries: &BTreeMap<Key, Entry>, key: &[String]) -> bool {
        match key.split_last() {
            Some((_, parent)) => matches!(entries.get(parent), Some(Entry::Directory { .. })),
            None => false,
        }
    }
}

#[async_trait]
impl RemoteFile for MemoryFile {
    fn path(&self) -> &str {
        &self.path
    }

    async fn metadata(&self) -> VfsResult<FileAttr> {
        Ok(self.lookup()?.attr())
    }

    async fn can_read(&self) -> VfsResult<bool> {
        self.perm_bit(0o400)
    }

    async fn can_write(&self) -> VfsResult<bool> {
        self.perm_bit(0o200)
    }

    async fn can_execute(&self) -> VfsResult<bool> {
        self.perm_bit(0o100)
    }

    async fn is_hidden(&self) -> VfsResult<bool> {
        Ok(self.key.last().is_some_and(|name| name.starts_with('.')))
    }

    async fn open_read(&self) -> VfsResult<RemoteReader> {
        match self.lookup()? {
            Entry::File { data, .. } => Ok(Box::pin(io::Cursor::new(data))),
            Entry::Directory { .. } => Err(VfsError::Io(io::Error::new(
                io::ErrorKind::IsADirectory,
                self.path.clone(),
            ))),
        }
    }

    async fn open_write(&self) -> VfsResult<RemoteWriter> {
        {
            let mut entries = self.tree.entries.write();
            match entries.get_mut(&self.key) {
                Some(Entry::File { data, attr }) => {
                    data.clear();
                    attr.mtime = SystemTime::now();
                }
                Some(Entry::Directory { .. }) => {
                    return Err(VfsError::Io(io::Error::new(
                        io::ErrorKind::IsADirectory,
                        self.path.clone(),
                    )));
                }
                None => {
                    if !Self::parent_is_directory(&entries, &self.key) {
                        return Err(VfsError::not_found(self.path.clone()));
                    }
                    entries.insert(
                        self.key.clone(),
                        Entry::File {
                            data: Vec::new(),
                            attr: FileAttr::file(0, 0o644),
                        },
                    );
                }
            }
        }
        Ok(Box::pin(MemoryWriter {
            tree: Arc::clone(&self.tree),
            key: self.key.clone(),
        }))
    }

    async fn list_files(&self) -> VfsResult<Vec<Arc<dyn RemoteFile>>> {
        let entries = self.tree.entries.read();
        match entries.get(&self.key) {
            Some(Entry::Directory { .. }) => {}
            Some(_) => return Err(VfsError::not_a_directory(self.path.clone())),
            None => return Err(VfsError::not_found(self.path.clone())),
        }

        // BTreeMap order keeps children sorted by name
        let depth = self.key.len() + 1;
        let children = entries
            .keys()
            .filter(|key| key.len() == depth && key.starts_with(&self.key))
            .map(|key| {
                Arc::new(MemoryFile {
                    tree: Arc::clone(&self.tree),
                    key: key.clone(),
                    path: self.tree.render(key),
                }) as Arc<dyn RemoteFile>
            })
            .collect();
        Ok(children)
    }

    async fn mkdir(&self) -> VfsResult<()> {
        let mut entries = self.tree.entries.write();
        if entries.contains_key(&self.key) {
            return Err(VfsError::already_exists(self.path.clone()));
        }
        if !Self::parent_is_directory(&entries, &self.key) {
            return Err(VfsError::not_found(format!("parent of {}", self.path)));
        }
        entries.insert(
            self.key.clone(),
            Entry::Directory {
                attr: FileAttr::directory(0o755),
            },
        );
        Ok(())
    }

    async fn delete(&self) -> VfsResult<()> {
        if self.key.is_empty() {
            return Err(VfsError::access_denied(self.path.clone(), "cannot remove root"));
        }

        let mut entries = self.tree.entries.write();
        match entries.get(&self.key) {
            Some(Entry::Directory { .. }) => {
                let has_children = entries
                    .keys()
                    .any(|key| key.len() > self.key.len() && key.starts_with(&self.key));
                if has_children {
                    return Err(VfsError::Io(io::Error::new(
                        io::ErrorKind::DirectoryNotEmpty,
                        self.path.clone(),
                    )));
                }
            }
            Some(Entry::File { .. }) => {}
            None => return Err(VfsError::not_found(self.path.clone())),
        }
        entries.remove(&self.key);
        Ok(())
    }
}

/// Appends to a file entry as bytes arrive.
struct MemoryWriter {
    tree: Arc<Tree>,
    key: Key,
}

impl AsyncWrite for MemoryWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let mut entries = self.tree.entries.write();
        match entries.get_mut(&self.key) {
            Some(Entry::File { data, attr }) => {
                data.extend_from_slice(buf);
                attr.mtime = SystemTime::now();
                Poll::Ready(Ok(buf.len()))
            }
            _ => Poll::Ready(Err(io::Error::new(
                io::ErrorKind::NotFound,
                "file removed while open for writing",
            ))),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_write_then_read() {
        let conn = MemoryConnection::new();
        let file = conn.file("/notes.txt");

        let mut writer = file.open_write().await.unwrap();
        writer.write_all(b"hello world").await.unwrap();
        writer.shutdown().await.unwrap();

        let mut reader = file.open_read().await.unwrap();
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await.unwrap();
        assert_eq!(data, b"hello world");
        assert_eq!(file.metadata().await.unwrap().size, 11);
    }

    #[tokio::test]
    async fn test_open_write_truncates() {
        let conn = MemoryConnection::new();
        conn.put_file("/a.txt", b"old contents", 0o644);

        let mut writer = conn.file("/a.txt").open_write().await.unwrap();
        writer.write_all(b"new").await.unwrap();
        assert_eq!(conn.contents("/a.txt").unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_open_write_needs_parent() {
        let conn = MemoryConnection::new();
        let result = conn.file("/missing/a.txt").open_write().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_mkdir_and_list() {
        let conn = MemoryConnection::new();
        conn.file("/subdir").mkdir().await.unwrap();
        conn.put_file("/subdir/b.txt", b"", 0o644);
        conn.put_file("/subdir/a.txt", b"", 0o644);
        conn.put_file("/subdir/nested/deep.txt", b"", 0o644);

        let children = conn.file("/subdir").list_files().await.unwrap();
        let paths: Vec<_> = children.iter().map(|c| c.path().to_string()).collect();
        assert_eq!(paths, vec!["/subdir/a.txt", "/subdir/b.txt", "/subdir/nested"]);
    }

    #[tokio::test]
    async fn test_mkdir_errors() {
        let conn = MemoryConnection::new();
        conn.put_dir("/exists");
        assert!(matches!(
            conn.file("/exists").mkdir().await,
            Err(VfsError::AlreadyExists(_))
        ));
        assert!(matches!(
            conn.file("/no/parent").mkdir().await,
            Err(VfsError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete() {
        let conn = MemoryConnection::new();
        conn.put_file("/dir/file.txt", b"x", 0o644);

        assert!(conn.file("/dir").delete().await.is_err());
        conn.file("/dir/file.txt").delete().await.unwrap();
        conn.file("/dir").delete().await.unwrap();
        assert!(!conn.file("/dir").exists().await.unwrap());
        assert!(conn.file("/").delete().await.is_err());
    }

    #[tokio::test]
    async fn test_windows_paths() {
        let conn = MemoryConnection::with_os(OsFamily::Windows);
        conn.put_file("\\Users\\admin\\a.txt", b"", 0o644);

        let children = conn.file("\\Users\\admin").list_files().await.unwrap();
        assert_eq!(children[0].path(), "\\Users\\admin\\a.txt");
    }
}
