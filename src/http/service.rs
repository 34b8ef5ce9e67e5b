//! Tower service adapter.
//!
//! # Responsibilities
//! - Run a [`Handler`] per request
//! - Drive the write pipeline against a `ChannelSink` on a spawned task
//! - Turn the committed head and streamed body into a `Response<Body>`

use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Request, Response, StatusCode};
use futures_util::future::BoxFuture;
use tokio_util::io::ReaderStream;
use tower::Service;

use crate::http::sink::ChannelSink;
use crate::http::writer::ResponseWriter;
use crate::middleware::Handler;
use crate::response::headers::CONTENT_TYPE_PLAIN;
use crate::response::DataResponse;

/// Pipe capacity between the write task and the response body.
pub const DEFAULT_STREAM_BUFFER: usize = 64 * 1024;

/// Serves a [`Handler`] as a `tower::Service<Request<Body>>`.
pub struct DataResponseService<H> {
    handler: Arc<H>,
    writer: Arc<ResponseWriter>,
    buffer: usize,
}

impl<H: Handler> DataResponseService<H> {
    pub fn new(handler: H, writer: Arc<ResponseWriter>) -> Self {
        Self {
            handler: Arc::new(handler),
            writer,
            buffer: DEFAULT_STREAM_BUFFER,
        }
    }

    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }
}

impl<H> Clone for DataResponseService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
            writer: self.writer.clone(),
            buffer: self.buffer,
        }
    }
}

impl<H: Handler> Service<Request<Body>> for DataResponseService<H> {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response<Body>, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let handler = self.handler.clone();
        let writer = self.writer.clone();
        let buffer = self.buffer;

        Box::pin(async move {
            let resp = handler.handle(req, writer.factory().clone()).await;
            Ok(stream_response(writer, resp, buffer).await)
        })
    }
}

/// Write `resp` on a background task and return the streaming response.
pub async fn stream_response(
    writer: Arc<ResponseWriter>,
    resp: DataResponse,
    buffer: usize,
) -> Response<Body> {
    let (mut sink, head_rx, reader) = ChannelSink::new(buffer);

    tokio::spawn(async move {
        if let Err(err) = writer.write(&mut sink, resp).await {
            tracing::debug!(error = %err, "Response write finished with error");
        }
    });

    match head_rx.await {
        Ok(head) => {
            let mut response = Response::new(Body::from_stream(ReaderStream::new(reader)));
            *response.status_mut() = head.status;
            *response.headers_mut() = head.headers;
            response
        }
        Err(_) => {
            tracing::error!("Write pipeline ended without committing a response head");
            let mut response = Response::new(Body::from("Internal Server Error"));
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_PLAIN));
            response
        }
    }
}
