//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::http::{HeaderMap, StatusCode};
use data_response::error::FormatError;
use data_response::format::Format;
use data_response::http::ResponseSink;
use data_response::response::{FormattedBody, Release};
use data_response::DataResponse;
use tokio::io::AsyncWrite;

/// Sink that accepts only half of every write.
#[derive(Debug, Default)]
pub struct HalfWriteSink {
    pub headers: HeaderMap,
    pub statuses: Vec<StatusCode>,
    pub body: Vec<u8>,
}

impl HalfWriteSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResponseSink for HalfWriteSink {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_head(&mut self, status: StatusCode) {
        self.statuses.push(status);
    }
}

impl AsyncWrite for HalfWriteSink {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let accepted = buf.len() / 2;
        this.body.extend_from_slice(&buf[..accepted]);
        Poll::Ready(Ok(accepted))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Formatter that fails on every response.
#[derive(Debug)]
pub struct AlwaysFailFormatter;

impl Format for AlwaysFailFormatter {
    fn format(&self, _resp: &mut DataResponse) -> Result<FormattedBody, FormatError> {
        Err(FormatError::Custom("formatter unavailable".into()))
    }

    fn content_type(&self) -> &str {
        "application/x-fail"
    }
}

/// Release handle plus a counter of how often it was closed.
pub fn counting_release() -> (Release, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = count.clone();
    let release = Release::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    (release, count)
}

pub fn closed(count: &AtomicUsize) -> usize {
    count.load(Ordering::SeqCst)
}
