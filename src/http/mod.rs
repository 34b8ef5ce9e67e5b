//! HTTP transport subsystem.
//!
//! # Data Flow
//! ```text
//! Request<Body>
//!     → service.rs (run handler chain)
//!     → DataResponse
//!     → writer.rs (resolve formatter, format, commit head, copy body)
//!     → sink.rs (ChannelSink → Response<Body>, or RecordingSink in tests)
//! ```
//!
//! # Design Decisions
//! - The pipeline writes to a `ResponseSink`, never to a concrete transport
//! - The status line is committed at exactly one point per response
//! - Write errors after commit are logged and returned, never retried

pub mod service;
pub mod sink;
pub mod writer;

pub use service::{stream_response, DataResponseService, DEFAULT_STREAM_BUFFER};
pub use sink::{ChannelSink, RecordingSink, ResponseHead, ResponseSink};
pub use writer::ResponseWriter;
