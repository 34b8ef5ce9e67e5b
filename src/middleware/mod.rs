//! Handler middleware.
//!
//! # Data Flow
//! ```text
//! Request<Body>
//!     → access_log.rs    (RequestTimerLayer: start time into extensions)
//!     → recovery.rs      (panic → 500)
//!     → access_log.rs    (LoggingLayer: one info line per response)
//!     → measurement.rs   (status / latency metrics by route)
//!     → compression.rs   (Accept-Encoding → pre-formatted compressed body)
//!     → content_type.rs  (415 on disallowed request bodies)
//!     → negotiator.rs    (Accept → bound formatter, or 406)
//!     → handler
//!     → DataResponse
//! ```
//!
//! # Design Decisions
//! - Middleware wrap handlers, not transports: each one receives the request
//!   and returns a `DataResponse`, so nothing is written before the pipeline
//! - Every middleware is a `tower::Layer`, so chains compose with `ServiceBuilder`
//! - Short-circuiting middleware never invoke the wrapped handler
//! - Compression sits outside negotiation so it formats with the bound formatter

pub mod access_log;
pub mod compression;
pub mod content_type;
pub mod measurement;
pub mod negotiator;
pub mod recovery;

use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use futures_util::future::BoxFuture;

use crate::factory::Factory;
use crate::response::DataResponse;

pub use access_log::{request_start, Logging, LoggingLayer, RequestStart, RequestTimer, RequestTimerLayer};
pub use compression::{compress, select_encoding, Compression, CompressionLayer, Encoding};
pub use content_type::{ContentTypeValidator, ContentTypeValidatorLayer};
pub use measurement::{Measurement, MeasurementLayer};
pub use negotiator::{select_formatter, FormatterRegistry, Negotiate, NegotiateLayer};
pub use recovery::{Recovery, RecoveryLayer};

/// Produces a `DataResponse` for a request.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, req: Request<Body>, factory: Arc<Factory>) -> BoxFuture<'static, DataResponse>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Request<Body>, Arc<Factory>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = DataResponse> + Send + 'static,
{
    fn handle(&self, req: Request<Body>, factory: Arc<Factory>) -> BoxFuture<'static, DataResponse> {
        Box::pin(self(req, factory))
    }
}
