//! Transport sinks.
//!
//! A sink is an `AsyncWrite` with a header map and a one-shot status commit.
//! Writing body bytes before `write_head` commits `200 OK` implicitly.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{HeaderMap, Response, StatusCode};
use tokio::io::{AsyncWrite, DuplexStream};
use tokio::sync::oneshot;

/// Write-once status/header/body sink.
pub trait ResponseSink: AsyncWrite + Send + Unpin {
    /// Headers that will be sent with the status line.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Commit the status line and headers. Later calls have no effect on the wire.
    fn write_head(&mut self, status: StatusCode);
}

/// Status line plus headers, as committed.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

/// In-memory sink recording everything written to it.
#[derive(Debug, Default)]
pub struct RecordingSink {
    headers: HeaderMap,
    status: Option<StatusCode>,
    head_writes: usize,
    body: Vec<u8>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed status; `None` until the head is written.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).and_then(|v| v.to_str().ok())
    }

    /// Number of `write_head` calls (implicit commits excluded).
    pub fn head_writes(&self) -> usize {
        self.head_writes
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn body_str(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap_or_default()
    }

    /// Convert the recording into an axum response.
    pub fn into_response(self) -> Response<Body> {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

impl ResponseSink for RecordingSink {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_head(&mut self, status: StatusCode) {
        self.head_writes += 1;
        if self.status.is_none() {
            self.status = Some(status);
        }
    }
}

impl AsyncWrite for RecordingSink {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if this.status.is_none() {
            this.status = Some(StatusCode::OK);
        }
        this.body.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Sink that streams into an axum body.
///
/// The head travels over a oneshot; body bytes go through a bounded duplex
/// pipe whose read half becomes the response body. Dropping the sink ends
/// the body.
#[derive(Debug)]
pub struct ChannelSink {
    headers: HeaderMap,
    head: Option<oneshot::Sender<ResponseHead>>,
    body: DuplexStream,
}

impl ChannelSink {
    /// Returns the sink, the head receiver and the body read half.
    pub fn new(buffer: usize) -> (Self, oneshot::Receiver<ResponseHead>, DuplexStream) {
        let (head_tx, head_rx) = oneshot::channel();
        let (writer, reader) = tokio::io::duplex(buffer);
        let sink = Self {
            headers: HeaderMap::new(),
            head: Some(head_tx),
            body: writer,
        };
        (sink, head_rx, reader)
    }

    pub fn head_sent(&self) -> bool {
        self.head.is_none()
    }
}

impl ResponseSink for ChannelSink {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_head(&mut self, status: StatusCode) {
        if let Some(head) = self.head.take() {
            let headers = std::mem::take(&mut self.headers);
            if head.send(ResponseHead { status, headers }).is_err() {
                tracing::debug!(status = %status, "Response head receiver dropped");
            }
        }
    }
}

impl AsyncWrite for ChannelSink {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if this.head.is_some() {
            this.write_head(StatusCode::OK);
        }
        Pin::new(&mut this.body).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().body).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().body).poll_shutdown(cx)
    }
}
