//! Request and response bodies.
//!
//! A [`QuasiBody`] couples a byte source with the framing metadata that
//! travels in the lead chunk:
//!
//! - `content_length > 0`: exactly that many bytes follow the lead chunk
//! - `content_length < 0`: length unknown, bytes travel in body chunks
//! - `content_length == 0`: no body is transmitted at all

use std::fmt;
use std::io::Cursor;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::io::{AsyncRead, ReadBuf};

use crate::protocol::QuasiHttpError;
use crate::utils::io::read_all_bytes;

/// Boxed byte source backing a body.
pub type BoxReader = Pin<Box<dyn AsyncRead + Send>>;

pub struct QuasiBody {
    content_length: i64,
    content_type: Option<String>,
    reader: BoxReader,
}

impl QuasiBody {
    /// Creates a body from any byte source.
    ///
    /// Pass a negative `content_length` when the size is not known up front.
    pub fn new<R>(content_length: i64, reader: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        Self { content_length, content_type: None, reader: Box::pin(reader) }
    }

    /// Creates a body of unknown length, sent using body chunks.
    pub fn streaming<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        Self::new(-1, reader)
    }

    /// Creates a body held in memory, sent with its exact length.
    pub fn from_bytes<B: Into<Bytes>>(bytes: B) -> Self {
        let bytes = bytes.into();
        let content_length = i64::try_from(bytes.len()).unwrap_or(i64::MAX);
        Self::new(content_length, Cursor::new(bytes))
    }

    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub(crate) fn set_content_type(&mut self, content_type: Option<String>) {
        self.content_type = content_type;
    }

    pub fn content_length(&self) -> i64 {
        self.content_length
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Reads the remaining body into memory, refusing to hold more than `limit` bytes.
    pub async fn read_to_bytes(&mut self, limit: usize) -> Result<Bytes, QuasiHttpError> {
        read_all_bytes(self, limit).await
    }

    pub fn into_reader(self) -> BoxReader {
        self.reader
    }
}

impl AsyncRead for QuasiBody {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
        self.reader.as_mut().poll_read(cx, buf)
    }
}

impl fmt::Debug for QuasiBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuasiBody")
            .field("content_length", &self.content_length)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}
