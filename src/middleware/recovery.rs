//! Panic recovery.
//!
//! A panic inside the wrapped handler becomes the factory's internal-error
//! response instead of tearing down the connection task.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tower::Layer;

use crate::error::ResponseError;
use crate::factory::Factory;
use crate::middleware::Handler;
use crate::response::DataResponse;

#[derive(Debug, Clone, Copy, Default)]
pub struct RecoveryLayer;

impl RecoveryLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<H: Handler> Layer<H> for RecoveryLayer {
    type Service = Recovery<H>;

    fn layer(&self, inner: H) -> Self::Service {
        Recovery {
            inner: Arc::new(inner),
        }
    }
}

/// Handler produced by [`RecoveryLayer`].
pub struct Recovery<H> {
    inner: Arc<H>,
}

impl<H> Clone for Recovery<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl<H: Handler> Handler for Recovery<H> {
    fn handle(&self, req: Request<Body>, factory: Arc<Factory>) -> BoxFuture<'static, DataResponse> {
        let inner = self.inner.clone();
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        Box::pin(async move {
            let handler_factory = factory.clone();
            let result = AssertUnwindSafe(async move { inner.handle(req, handler_factory).await })
                .catch_unwind()
                .await;

            match result {
                Ok(resp) => resp,
                Err(panic) => {
                    let err = ResponseError::HandlerPanic(panic_message(panic.as_ref()));
                    tracing::error!(
                        error = %err,
                        method = %method,
                        path = %path,
                        "Handler panicked, responding with internal error"
                    );
                    factory.internal_error(&err)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_panic_message_payloads() {
        let boxed: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(boxed.as_ref()), "static str");

        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");

        let boxed: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }

    #[tokio::test]
    async fn test_panic_becomes_internal_error() {
        let handler = RecoveryLayer::new().layer(
            |_req: Request<Body>, _factory: Arc<Factory>| async move {
                if true {
                    panic!("boom");
                }
                DataResponse::new(StatusCode::OK)
            },
        );

        let req = Request::get("/explode").body(Body::empty()).unwrap();
        let resp = handler.handle(req, Arc::new(Factory::new())).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_passes_through_without_panic() {
        let handler = RecoveryLayer::new().layer(
            |_req: Request<Body>, factory: Arc<Factory>| async move { factory.success("ok") },
        );

        let req = Request::get("/").body(Body::empty()).unwrap();
        let resp = handler.handle(req, Arc::new(Factory::new())).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
