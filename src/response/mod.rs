//! Response value subsystem.
//!
//! # Data Flow
//! ```text
//! Factory / handler
//!     → value.rs (DataResponse: status, payload or stream, headers)
//!     → [middleware binds formatter, pre-formatted body, headers]
//!     → body.rs (FormattedBody produced by a formatter)
//!     → write pipeline
//! ```
//!
//! # Design Decisions
//! - Builders take `self` by value and return the new value
//! - Binary vs structured payload is derived from stream presence
//! - Header names/values live in headers.rs, status identifiers in codes.rs

pub mod body;
pub mod codes;
pub mod headers;
pub mod payload;
pub mod value;

pub use body::{BinaryBody, BodyReader, FormattedBody, Release};
pub use codes::code_from_status;
pub use payload::{Payload, SharedPayload};
pub use value::DataResponse;
