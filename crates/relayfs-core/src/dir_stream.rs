//! Directory listing adapter.

use tracing::{debug, warn};

use crate::connection::RemoteFile;
use crate::error::VfsResult;
use crate::path::FsPath;

/// What to do when the listing filter returns an error for one child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterFailure {
    /// Leave the child out and keep listing.
    #[default]
    Exclude,
    /// Stop and return the filter's error.
    Abort,
}

/// Children of one directory, materialized when the listing was taken.
///
/// Iterates once, in the order the connection listed them.
#[derive(Debug)]
pub struct DirectoryStream {
    entries: std::vec::IntoIter<FsPath>,
}

impl DirectoryStream {
    pub(crate) async fn list<F>(
        dir: &FsPath,
        file: &dyn RemoteFile,
        mut filter: F,
        on_failure: FilterFailure,
    ) -> VfsResult<Self>
    where
        F: FnMut(&FsPath) -> VfsResult<bool>,
    {
        let children = file.list_files().await?;
        let total = children.len();

        let mut entries = Vec::with_capacity(total);
        for child in children {
            let candidate = FsPath::parse(dir.session(), child.path());
            match filter(&candidate) {
                Ok(true) => entries.push(candidate),
                Ok(false) => {}
                Err(e) => match on_failure {
                    FilterFailure::Exclude => {
                        warn!(path = %candidate, error = %e, "Filter failed, excluding entry");
                    }
                    FilterFailure::Abort => return Err(e),
                },
            }
        }

        debug!(dir = %dir, total, accepted = entries.len(), "Listed directory");
        Ok(Self {
            entries: entries.into_iter(),
        })
    }

    /// Entries not yet yielded.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether every entry has been yielded.
    pub fn is_empty(&self) -> bool {
        self.entries.len() == 0
    }

    /// Nothing is held open past construction.
    pub fn close(self) {}
}

impl Iterator for DirectoryStream {
    type Item = FsPath;

    fn next(&mut self) -> Option<FsPath> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryConnection;
    use crate::error::VfsError;
    use crate::session::Session;
    use crate::protocol::Scheme;
    use std::sync::{Arc, Weak};
    use url::Url;

    fn listing_session() -> Arc<Session> {
        let memory = MemoryConnection::new();
        memory.put_file("/dir/alpha", b"a", 0o644);
        memory.put_file("/dir/beta", b"b", 0o644);
        memory.put_file("/dir/gamma", b"c", 0o644);

        let uri = Url::parse("memory://test/").unwrap();
        Arc::new(Session::new(
            uri.clone(),
            uri,
            Scheme::Local.descriptor(),
            Arc::new(memory),
            Weak::new(),
        ))
    }

    fn names(stream: DirectoryStream) -> Vec<String> {
        stream
            .map(|p| p.file_name().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_filter_excludes_by_name() {
        let s = listing_session();
        let stream = s
            .read_dir(&s.path("/dir", &[]), |p| {
                Ok(p.file_name().is_some_and(|n| n.to_string() != "beta"))
            })
            .await
            .unwrap();

        assert_eq!(stream.len(), 2);
        assert_eq!(names(stream), vec!["alpha", "gamma"]);
    }

    #[tokio::test]
    async fn test_entries_belong_to_session() {
        let s = listing_session();
        let dir = s.path("/dir", &[]);
        let entries: Vec<_> = s.read_dir(&dir, |_| Ok(true)).await.unwrap().collect();

        assert_eq!(entries.len(), 3);
        for entry in &entries {
            assert!(entry.is_absolute());
            assert!(entry.starts_with(&dir));
            assert_eq!(entry.session().id(), s.id());
        }
    }

    #[tokio::test]
    async fn test_filter_error_excludes_entry() {
        let s = listing_session();
        let stream = s
            .read_dir(&s.path("/dir", &[]), |p| {
                if p.to_string().ends_with("alpha") {
                    Err(VfsError::invalid_argument("boom"))
                } else {
                    Ok(true)
                }
            })
            .await
            .unwrap();

        assert_eq!(names(stream), vec!["beta", "gamma"]);
    }

    #[tokio::test]
    async fn test_filter_error_aborts_when_asked() {
        let s = listing_session();
        let result = s
            .read_dir_with(
                &s.path("/dir", &[]),
                |_| Err(VfsError::invalid_argument("boom")),
                FilterFailure::Abort,
            )
            .await;

        assert!(matches!(result, Err(VfsError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_close_after_partial_iteration() {
        let s = listing_session();
        let mut stream = s.read_dir(&s.path("/dir", &[]), |_| Ok(true)).await.unwrap();
        assert!(stream.next().is_some());
        assert_eq!(stream.len(), 2);
        stream.close();
    }
}
