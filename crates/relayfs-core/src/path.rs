//! Lexical path values bound to a session.
//!
//! A [`FsPath`] is an ordered list of non-empty segments plus an absolute
//! flag. Every operation here is pure: nothing touches the connection, and
//! `..` is never resolved against the back end.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use url::Url;

use crate::error::{VfsError, VfsResult};
use crate::session::Session;

const CURRENT_DIR: &str = ".";
const PARENT_DIR: &str = "..";

/// An immutable path within one session's namespace.
///
/// Two paths are equal when they come from the same session, agree on the
/// absolute flag and hold the same segments.
#[derive(Clone)]
pub struct FsPath {
    session: Arc<Session>,
    segments: Vec<String>,
    absolute: bool,
}

impl FsPath {
    /// Parse `path` using the session separator.
    ///
    /// Empty segments are dropped, so repeated and trailing separators
    /// collapse. The path is absolute iff it begins with the separator.
    pub(crate) fn parse(session: &Arc<Session>, path: &str) -> Self {
        let separator = session.separator();
        let segments = path
            .split(separator)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            session: Arc::clone(session),
            absolute: path.starts_with(separator),
            segments,
        }
    }

    fn derive(&self, segments: Vec<String>, absolute: bool) -> Self {
        Self {
            session: Arc::clone(&self.session),
            segments,
            absolute,
        }
    }

    /// The session that issued this path.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Returns true if this path starts at the root.
    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// Number of segments.
    pub fn name_count(&self) -> usize {
        self.segments.len()
    }

    /// The raw segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The root path, or `None` for relative paths.
    pub fn root(&self) -> Option<FsPath> {
        self.absolute.then(|| self.derive(Vec::new(), true))
    }

    /// The last segment as a relative path.
    pub fn file_name(&self) -> Option<FsPath> {
        self.segments
            .last()
            .map(|last| self.derive(vec![last.clone()], false))
    }

    /// All segments but the last, keeping the absolute flag.
    ///
    /// Returns `None` once there are no segments left, so walking up from
    /// `/a/b` yields `/a`, then `/`, then `None`.
    pub fn parent(&self) -> Option<FsPath> {
        let (_, rest) = self.segments.split_last()?;
        Some(self.derive(rest.to_vec(), self.absolute))
    }

    /// The segment at `index` as a relative path.
    pub fn name(&self, index: usize) -> VfsResult<FsPath> {
        let segment = self.segments.get(index).ok_or_else(|| {
            VfsError::invalid_argument(format!(
                "cannot call name with index = {index} on path: {self}"
            ))
        })?;
        Ok(self.derive(vec![segment.clone()], false))
    }

    /// The relative path over segments `[begin, end)`.
    pub fn subpath(&self, begin: usize, end: usize) -> VfsResult<FsPath> {
        if begin >= self.segments.len() {
            return Err(VfsError::invalid_argument(format!(
                "cannot call subpath with begin = {begin} on path: {self}"
            )));
        }
        if end <= begin || end > self.segments.len() {
            return Err(VfsError::invalid_argument(format!(
                "cannot call subpath with end = {end} on path: {self}"
            )));
        }
        Ok(self.derive(self.segments[begin..end].to_vec(), false))
    }

    /// Iterate the segments as single-segment relative paths.
    pub fn names(&self) -> impl Iterator<Item = FsPath> + '_ {
        self.segments
            .iter()
            .map(|segment| self.derive(vec![segment.clone()], false))
    }

    fn same_session(&self, other: &FsPath) -> bool {
        self.session.id() == other.session.id()
    }

    /// True if `other` is a leading run of this path with the same absolute flag.
    pub fn starts_with(&self, other: &FsPath) -> bool {
        self.same_session(other)
            && self.absolute == other.absolute
            && other.segments.len() <= self.segments.len()
            && self.segments.iter().zip(&other.segments).all(|(a, b)| a == b)
    }

    /// [`FsPath::starts_with`] after parsing `other` in this session.
    pub fn starts_with_str(&self, other: &str) -> bool {
        self.starts_with(&FsPath::parse(&self.session, other))
    }

    /// True if `other` matches the trailing segments of this path.
    ///
    /// An absolute `other` of the same length never matches a relative receiver.
    pub fn ends_with(&self, other: &FsPath) -> bool {
        let size = self.segments.len();
        let other_size = other.segments.len();
        if !self.same_session(other)
            || other_size > size
            || (other_size == size && other.absolute && !self.absolute)
        {
            return false;
        }
        self.segments
            .iter()
            .rev()
            .zip(other.segments.iter().rev())
            .all(|(a, b)| a == b)
    }

    /// [`FsPath::ends_with`] after parsing `other` in this session.
    pub fn ends_with_str(&self, other: &str) -> bool {
        self.ends_with(&FsPath::parse(&self.session, other))
    }

    /// Drop `.` segments and fold `..` into the preceding segment.
    ///
    /// A `..` with nothing left to pop is discarded, so `/../a` normalizes to `/a`
    /// and `../a` to `a`.
    pub fn normalize(&self) -> FsPath {
        let mut stack: Vec<String> = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            match segment.as_str() {
                CURRENT_DIR => {}
                PARENT_DIR => {
                    stack.pop();
                }
                _ => stack.push(segment.clone()),
            }
        }
        self.derive(stack, self.absolute)
    }

    /// Append `other` to this path; an absolute `other` replaces it entirely.
    pub fn resolve(&self, other: &FsPath) -> FsPath {
        if other.absolute {
            return other.clone();
        }
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        self.derive(segments, self.absolute)
    }

    /// [`FsPath::resolve`] after parsing `other` in this session.
    pub fn resolve_str(&self, other: &str) -> FsPath {
        self.resolve(&FsPath::parse(&self.session, other))
    }

    /// Resolve `other` against the parent of this path.
    ///
    /// Returns `None` when this path has no parent.
    pub fn resolve_sibling(&self, other: &FsPath) -> Option<FsPath> {
        self.parent().map(|parent| parent.resolve(other))
    }

    /// [`FsPath::resolve_sibling`] after parsing `other` in this session.
    pub fn resolve_sibling_str(&self, other: &str) -> Option<FsPath> {
        self.parent().map(|parent| parent.resolve_str(other))
    }

    /// Build the relative path that leads from this path to `other`.
    ///
    /// Both paths must agree on the absolute flag.
    pub fn relativize(&self, other: &FsPath) -> VfsResult<FsPath> {
        if self.absolute != other.absolute {
            return Err(VfsError::invalid_argument(format!(
                "paths [{self}] and [{other}] are not both absolute or both relative"
            )));
        }
        if self == other {
            return Ok(self.derive(Vec::new(), false));
        }

        let common = self
            .segments
            .iter()
            .zip(&other.segments)
            .take_while(|(a, b)| a == b)
            .count();

        let segments = std::iter::repeat_n(PARENT_DIR.to_string(), self.segments.len() - common)
            .chain(other.segments[common..].iter().cloned())
            .collect();
        Ok(self.derive(segments, false))
    }

    /// Full URI for this path: the session base with this path as its path component.
    pub fn to_uri(&self) -> VfsResult<Url> {
        if !self.absolute {
            return Err(VfsError::Unsupported("to_uri on a relative path"));
        }
        let mut uri = self.session.base_uri().clone();
        uri.set_path(&format!("/{}", self.segments.join("/")));
        Ok(uri)
    }

    /// Not available: there is no working directory to resolve against.
    pub fn to_absolute_path(&self) -> VfsResult<FsPath> {
        Err(VfsError::Unsupported("to_absolute_path"))
    }

    /// Not available: links are never followed.
    pub fn to_real_path(&self) -> VfsResult<FsPath> {
        Err(VfsError::Unsupported("to_real_path"))
    }
}

impl fmt::Display for FsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = self.session.separator();
        if self.absolute {
            f.write_str(separator)?;
        }
        f.write_str(&self.segments.join(separator))
    }
}

impl fmt::Debug for FsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FsPath")
            .field("path", &self.to_string())
            .field("session", &self.session.redacted_identity())
            .finish()
    }
}

impl PartialEq for FsPath {
    fn eq(&self, other: &Self) -> bool {
        self.same_session(other) && self.absolute == other.absolute && self.segments == other.segments
    }
}

impl Eq for FsPath {}

impl Hash for FsPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.session.id().hash(state);
        self.segments.hash(state);
        self.absolute.hash(state);
    }
}
