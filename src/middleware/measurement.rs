//! Response status and latency measurement, labelled by method and route.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::Request;
use futures_util::future::BoxFuture;
use tower::Layer;

use crate::config::ObservabilityConfig;
use crate::factory::Factory;
use crate::middleware::access_log::request_start;
use crate::middleware::Handler;
use crate::observability::metrics;
use crate::response::DataResponse;

/// Route template axum matched for the request, empty outside a router.
pub(crate) fn matched_route(req: &Request<Body>) -> String {
    req.extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_default()
}

/// Layer recording `http_responses_total` and `http_response_duration_seconds`.
#[derive(Debug, Clone, Copy)]
pub struct MeasurementLayer {
    enabled: bool,
}

impl MeasurementLayer {
    pub fn new() -> Self {
        Self { enabled: true }
    }

    pub fn from_config(config: &ObservabilityConfig) -> Self {
        Self {
            enabled: config.metrics_enabled,
        }
    }
}

impl Default for MeasurementLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Handler> Layer<H> for MeasurementLayer {
    type Service = Measurement<H>;

    fn layer(&self, inner: H) -> Self::Service {
        Measurement {
            inner: Arc::new(inner),
            enabled: self.enabled,
        }
    }
}

/// Handler produced by [`MeasurementLayer`].
pub struct Measurement<H> {
    inner: Arc<H>,
    enabled: bool,
}

impl<H> Clone for Measurement<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            enabled: self.enabled,
        }
    }
}

impl<H: Handler> Handler for Measurement<H> {
    fn handle(&self, req: Request<Body>, factory: Arc<Factory>) -> BoxFuture<'static, DataResponse> {
        if !self.enabled {
            return self.inner.handle(req, factory);
        }

        let inner = self.inner.clone();
        let start = request_start(&req);
        let method = req.method().clone();
        let route = matched_route(&req);
        Box::pin(async move {
            let resp = inner.handle(req, factory).await;
            metrics::record_response(method.as_str(), &route, resp.status().as_u16(), start);
            tracing::debug!(
                method = %method,
                route = %route,
                status = resp.status().as_u16(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Response produced"
            );
            resp
        })
    }
}
