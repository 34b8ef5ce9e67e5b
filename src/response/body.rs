//! Write-ready bodies, binary sources and release handles.

use std::fmt;
use std::io::{self, Cursor};

use axum::body::Bytes;
use tokio::io::AsyncRead;

/// A boxed async byte source.
pub type BodyReader = Box<dyn AsyncRead + Send + Unpin>;

/// Format-agnostic, write-ready body produced by a formatter.
///
/// A known `size` enables `Content-Length` and a bounded copy; `None` means
/// the pipeline streams until EOF.
pub struct FormattedBody {
    content_type: String,
    stream: BodyReader,
    size: Option<u64>,
}

impl FormattedBody {
    /// Create a body from an arbitrary stream.
    pub fn new(content_type: impl Into<String>, stream: BodyReader, size: Option<u64>) -> Self {
        Self {
            content_type: content_type.into(),
            stream,
            size,
        }
    }

    /// Create a fully buffered body with a known size.
    pub fn from_bytes(content_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let size = bytes.len() as u64;
        Self::new(content_type, Box::new(Cursor::new(bytes)), Some(size))
    }

    /// An empty body.
    pub fn empty(content_type: impl Into<String>) -> Self {
        Self::from_bytes(content_type, Bytes::new())
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Split into content type, stream and declared size.
    pub fn into_parts(self) -> (String, BodyReader, Option<u64>) {
        (self.content_type, self.stream, self.size)
    }
}

impl fmt::Debug for FormattedBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormattedBody")
            .field("content_type", &self.content_type)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Binary source attached to a response.
///
/// The stream is an `Option` because the binary formatter takes it; the
/// `BinaryBody` itself stays on the response so the response remains binary.
pub struct BinaryBody {
    pub(crate) stream: Option<BodyReader>,
    pub(crate) size: Option<u64>,
}

impl BinaryBody {
    pub(crate) fn new(stream: BodyReader, size: Option<u64>) -> Self {
        Self {
            stream: Some(stream),
            size,
        }
    }

    /// Declared length of the stream, if known.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Take the stream out; `None` once it has been consumed.
    pub fn take_stream(&mut self) -> Option<BodyReader> {
        self.stream.take()
    }
}

impl fmt::Debug for BinaryBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryBody")
            .field("consumed", &self.stream.is_none())
            .field("size", &self.size)
            .finish()
    }
}

/// A resource released exactly once after the body write attempt.
pub struct Release(Box<dyn FnOnce() -> io::Result<()> + Send>);

impl Release {
    pub fn new<F>(close: F) -> Self
    where
        F: FnOnce() -> io::Result<()> + Send + 'static,
    {
        Self(Box::new(close))
    }

    /// Consume the handle and release the resource.
    pub fn close(self) -> io::Result<()> {
        (self.0)()
    }
}

impl fmt::Debug for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Release")
    }
}
