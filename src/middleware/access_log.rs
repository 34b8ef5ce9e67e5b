//! Request timing and access logging.
//!
//! `RequestTimerLayer` stamps the request with its start time as early as
//! possible; `LoggingLayer` and `MeasurementLayer` read it back through
//! [`request_start`], falling back to the moment they were reached.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::header::{REFERER, USER_AGENT};
use axum::http::{HeaderName, Request};
use futures_util::future::BoxFuture;
use tower::Layer;

use crate::factory::Factory;
use crate::middleware::Handler;
use crate::response::DataResponse;

const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Request extension holding the instant the request entered the chain.
#[derive(Debug, Clone, Copy)]
pub struct RequestStart(pub Instant);

/// Start time stored by [`RequestTimerLayer`], or now when absent.
pub fn request_start(req: &Request<Body>) -> Instant {
    req.extensions()
        .get::<RequestStart>()
        .map(|start| start.0)
        .unwrap_or_else(Instant::now)
}

/// Layer inserting [`RequestStart`] into request extensions.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestTimerLayer;

impl<H: Handler> Layer<H> for RequestTimerLayer {
    type Service = RequestTimer<H>;

    fn layer(&self, inner: H) -> Self::Service {
        RequestTimer {
            inner: Arc::new(inner),
        }
    }
}

/// Handler produced by [`RequestTimerLayer`].
pub struct RequestTimer<H> {
    inner: Arc<H>,
}

impl<H> Clone for RequestTimer<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<H: Handler> Handler for RequestTimer<H> {
    fn handle(&self, mut req: Request<Body>, factory: Arc<Factory>) -> BoxFuture<'static, DataResponse> {
        if req.extensions().get::<RequestStart>().is_none() {
            req.extensions_mut().insert(RequestStart(Instant::now()));
        }
        self.inner.handle(req, factory)
    }
}

/// Layer emitting one `info` event per response.
#[derive(Debug, Clone, Default)]
pub struct LoggingLayer {
    skip_paths: Arc<HashSet<String>>,
}

impl LoggingLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths (exact match, no query) that are never logged, e.g. health checks.
    pub fn with_skip_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::make_mut(&mut self.skip_paths).extend(paths.into_iter().map(Into::into));
        self
    }
}

impl<H: Handler> Layer<H> for LoggingLayer {
    type Service = Logging<H>;

    fn layer(&self, inner: H) -> Self::Service {
        Logging {
            inner: Arc::new(inner),
            skip_paths: self.skip_paths.clone(),
        }
    }
}

/// Handler produced by [`LoggingLayer`].
pub struct Logging<H> {
    inner: Arc<H>,
    skip_paths: Arc<HashSet<String>>,
}

impl<H> Clone for Logging<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            skip_paths: self.skip_paths.clone(),
        }
    }
}

impl<H: Handler> Handler for Logging<H> {
    fn handle(&self, req: Request<Body>, factory: Arc<Factory>) -> BoxFuture<'static, DataResponse> {
        if self.skip_paths.contains(req.uri().path()) {
            return self.inner.handle(req, factory);
        }

        let start = request_start(&req);
        let method = req.method().clone();
        let uri = req.uri().clone();
        let version = req.version();
        let header = |name: &HeaderName| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-")
                .to_string()
        };
        let referer = header(&REFERER);
        let user_agent = header(&USER_AGENT);
        let request_id = header(&X_REQUEST_ID);

        let inner = self.inner.clone();
        Box::pin(async move {
            let resp = inner.handle(req, factory).await;
            let size = resp
                .known_size()
                .map_or_else(|| "-".to_string(), |size| size.to_string());
            tracing::info!(
                method = %method,
                uri = %uri,
                version = ?version,
                status = resp.status().as_u16(),
                size = %size,
                referer = %referer,
                user_agent = %user_agent,
                request_id = %request_id,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Request completed"
            );
            resp
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::logging::capture;
    use axum::http::StatusCode;
    use std::time::Duration;

    async fn items(_req: Request<Body>, factory: Arc<Factory>) -> DataResponse {
        factory.success(vec![1, 2, 3])
    }

    #[test]
    fn test_request_start_falls_back_to_now() {
        let before = Instant::now();
        let req = Request::get("/").body(Body::empty()).unwrap();
        assert!(request_start(&req) >= before);

        let stamped = before - Duration::from_secs(5);
        let mut req = Request::get("/").body(Body::empty()).unwrap();
        req.extensions_mut().insert(RequestStart(stamped));
        assert_eq!(request_start(&req), stamped);
    }

    #[tokio::test]
    async fn test_timer_keeps_earlier_stamp() {
        let stamped = Instant::now() - Duration::from_secs(5);
        let handler = RequestTimerLayer.layer(
            move |req: Request<Body>, factory: Arc<Factory>| async move {
                assert_eq!(request_start(&req), stamped);
                factory.no_content()
            },
        );

        let mut req = Request::get("/").body(Body::empty()).unwrap();
        req.extensions_mut().insert(RequestStart(stamped));
        let resp = handler.handle(req, Arc::new(Factory::new())).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_access_line_fields() {
        let (subscriber, logs) = capture::subscriber();
        let _guard = tracing::subscriber::set_default(subscriber);

        let handler = RequestTimerLayer.layer(LoggingLayer::new().layer(
            |_req: Request<Body>, factory: Arc<Factory>| async move {
                factory
                    .success("ok")
                    .set_header(axum::http::header::CONTENT_LENGTH, "4")
            },
        ));
        let req = Request::get("/items?page=2")
            .header(USER_AGENT, "curl/8.0")
            .header("x-request-id", "req-17")
            .body(Body::empty())
            .unwrap();
        handler.handle(req, Arc::new(Factory::new())).await;

        let logs = logs.contents();
        assert!(logs.contains(" INFO "));
        assert!(logs.contains("Request completed"));
        assert!(logs.contains("method=GET"));
        assert!(logs.contains("uri=/items?page=2"));
        assert!(logs.contains("status=200"));
        assert!(logs.contains("size=4"));
        assert!(logs.contains("user_agent=curl/8.0"));
        assert!(logs.contains("request_id=req-17"));
        assert!(logs.contains("referer=-"));
        assert!(logs.contains("elapsed_ms="));
    }

    #[tokio::test]
    async fn test_skipped_path_is_silent() {
        let (subscriber, logs) = capture::subscriber();
        let _guard = tracing::subscriber::set_default(subscriber);

        let handler = LoggingLayer::new().with_skip_paths(["/health"]).layer(items);
        let factory = Arc::new(Factory::new());

        let resp = handler
            .handle(Request::get("/health").body(Body::empty()).unwrap(), factory.clone())
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(!logs.contents().contains("Request completed"));

        handler
            .handle(Request::get("/items").body(Body::empty()).unwrap(), factory)
            .await;
        assert_eq!(logs.contents().matches("Request completed").count(), 1);
    }
}
