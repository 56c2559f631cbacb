//! Byte channel over a remote file's sequential streams.
//!
//! Remote streams cannot seek, so the channel only moves forward. It also
//! implements tokio's I/O traits, which lets `tokio::io::copy` and friends
//! drive it directly.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncWrite, AsyncWriteExt, ReadBuf};
use tracing::{debug, warn};

use crate::connection::{RemoteFile, RemoteReader, RemoteWriter};
use crate::error::{VfsError, VfsResult};
use crate::types::OpenOptions;

/// Sequential channel holding an input stream, an output stream, or both.
pub struct StreamChannel {
    path: String,
    reader: Option<RemoteReader>,
    writer: Option<RemoteWriter>,
    open: bool,
}

impl std::fmt::Debug for StreamChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamChannel")
            .field("path", &self.path)
            .field("readable", &self.reader.is_some())
            .field("writable", &self.writer.is_some())
            .field("open", &self.open)
            .finish()
    }
}

impl StreamChannel {
    /// Open the streams `options` asks for.
    ///
    /// `read` opens the input stream; `write`, `create` or `create_new` open
    /// the output stream.
    pub(crate) async fn open(file: &dyn RemoteFile, options: &OpenOptions) -> VfsResult<Self> {
        debug!(
            path = file.path(),
            read = options.read,
            write = options.wants_output(),
            "Opening channel"
        );

        let reader = if options.read {
            Some(file.open_read().await?)
        } else {
            None
        };
        let writer = if options.wants_output() {
            Some(file.open_write().await?)
        } else {
            None
        };

        Ok(Self {
            path: file.path().to_string(),
            reader,
            writer,
            open: true,
        })
    }

    /// Returns false once [`StreamChannel::close`] has run.
    pub fn is_open(&self) -> bool {
        self.open
    }

    fn ensure_open(&self) -> VfsResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(VfsError::Closed(self.path.clone()))
        }
    }

    /// Read up to `buf.len()` bytes. `None` signals end of stream.
    pub async fn read(&mut self, buf: &mut [u8]) -> VfsResult<Option<usize>> {
        self.ensure_open()?;
        let reader = self.reader.as_mut().ok_or(VfsError::NotOpenFor("reading"))?;
        if buf.is_empty() {
            return Ok(Some(0));
        }
        match reader.read(buf).await? {
            0 => Ok(None),
            n => Ok(Some(n)),
        }
    }

    /// Write all of `buf` and return its length.
    pub async fn write(&mut self, buf: &[u8]) -> VfsResult<usize> {
        self.ensure_open()?;
        let writer = self.writer.as_mut().ok_or(VfsError::NotOpenFor("writing"))?;
        writer.write_all(buf).await?;
        Ok(buf.len())
    }

    /// Remote streams carry no position; always `Unsupported`.
    pub fn position(&self) -> VfsResult<u64> {
        Err(VfsError::Unsupported("position"))
    }

    /// Seeking is not offered; always `Unsupported`.
    pub fn set_position(&mut self, _position: u64) -> VfsResult<()> {
        Err(VfsError::Unsupported("set_position"))
    }

    /// Use [`crate::Session::read_attributes`] for the size instead.
    pub fn size(&self) -> VfsResult<u64> {
        Err(VfsError::Unsupported("size"))
    }

    /// Always `Unsupported`.
    pub fn truncate(&mut self, _size: u64) -> VfsResult<()> {
        Err(VfsError::Unsupported("truncate"))
    }

    /// Close both streams. Failures are logged, never returned.
    pub async fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;

        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.shutdown().await {
                warn!(path = %self.path, error = %e, "Failed to close output stream");
            }
        }
        self.reader = None;
    }
}

fn closed(path: &str) -> io::Error {
    VfsError::Closed(path.to_string()).into()
}

impl AsyncRead for StreamChannel {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if !this.open {
            return Poll::Ready(Err(closed(&this.path)));
        }
        match this.reader.as_mut() {
            Some(reader) => reader.as_mut().poll_read(cx, buf),
            None => Poll::Ready(Err(VfsError::NotOpenFor("reading").into())),
        }
    }
}

impl AsyncWrite for StreamChannel {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if !this.open {
            return Poll::Ready(Err(closed(&this.path)));
        }
        match this.writer.as_mut() {
            Some(writer) => writer.as_mut().poll_write(cx, buf),
            None => Poll::Ready(Err(VfsError::NotOpenFor("writing").into())),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut().writer.as_mut() {
            Some(writer) => writer.as_mut().poll_flush(cx),
            None => Poll::Ready(Ok(())),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut().writer.as_mut() {
            Some(writer) => writer.as_mut().poll_shutdown(cx),
            None => Poll::Ready(Ok(())),
        }
    }
}

impl AsyncSeek for StreamChannel {
    fn start_seek(self: Pin<&mut Self>, _position: io::SeekFrom) -> io::Result<()> {
        Err(VfsError::Unsupported("seek").into())
    }

    fn poll_complete(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        Poll::Ready(Err(VfsError::Unsupported("seek").into()))
    }
}
