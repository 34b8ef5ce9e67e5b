//! Content negotiation.
//!
//! Candidates from `Accept` are tried in request order; quality parameters are
//! stripped, not weighed. The first registered media type wins.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::ACCEPT;
use axum::http::{Request, StatusCode};
use futures_util::future::BoxFuture;
use tower::Layer;

use crate::error::ResponseError;
use crate::factory::Factory;
use crate::format::Formatter;
use crate::middleware::Handler;
use crate::response::headers::{
    media_type, CONTENT_TYPE_HTML, CONTENT_TYPE_JSON, CONTENT_TYPE_TEXT_XML, CONTENT_TYPE_XML,
};
use crate::response::DataResponse;

/// Media type → formatter map plus an optional default.
#[derive(Debug, Clone, Default)]
pub struct FormatterRegistry {
    formatters: HashMap<String, Formatter>,
    default: Option<Formatter>,
}

impl FormatterRegistry {
    /// Empty registry without a default.
    pub fn new() -> Self {
        Self::default()
    }

    /// JSON, XML and HTML registered; JSON is the default.
    pub fn with_defaults() -> Self {
        Self::new()
            .register(CONTENT_TYPE_JSON, Formatter::json())
            .register(CONTENT_TYPE_XML, Formatter::xml())
            .register(CONTENT_TYPE_TEXT_XML, Formatter::xml())
            .register(CONTENT_TYPE_HTML, Formatter::html())
            .with_default(Formatter::json())
    }

    /// Register `formatter` for a media type (parameters are ignored).
    pub fn register(mut self, media: &str, formatter: Formatter) -> Self {
        self.formatters.insert(media_type(media), formatter);
        self
    }

    pub fn with_default(mut self, formatter: Formatter) -> Self {
        self.default = Some(formatter);
        self
    }

    pub fn get(&self, media: &str) -> Option<&Formatter> {
        self.formatters.get(&media_type(media))
    }

    pub fn default_formatter(&self) -> Option<&Formatter> {
        self.default.as_ref()
    }
}

/// Pick a formatter for an `Accept` value.
pub fn select_formatter<'a>(
    accept: Option<&str>,
    registry: &'a FormatterRegistry,
) -> Result<&'a Formatter, ResponseError> {
    let accept = accept.map(str::trim).unwrap_or_default();

    if !accept.is_empty() {
        for candidate in accept.split(',') {
            let candidate = candidate.trim();
            if candidate.is_empty() {
                continue;
            }
            if let Some(formatter) = registry.get(candidate) {
                return Ok(formatter);
            }
        }
    }

    registry
        .default_formatter()
        .ok_or(ResponseError::NotAcceptable)
}

/// Layer binding the negotiated formatter onto responses.
#[derive(Debug, Clone)]
pub struct NegotiateLayer {
    registry: Arc<FormatterRegistry>,
}

impl NegotiateLayer {
    pub fn new(registry: FormatterRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }
}

impl<H: Handler> Layer<H> for NegotiateLayer {
    type Service = Negotiate<H>;

    fn layer(&self, inner: H) -> Self::Service {
        Negotiate {
            inner: Arc::new(inner),
            registry: self.registry.clone(),
        }
    }
}

/// Handler produced by [`NegotiateLayer`].
pub struct Negotiate<H> {
    inner: Arc<H>,
    registry: Arc<FormatterRegistry>,
}

impl<H> Clone for Negotiate<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            registry: self.registry.clone(),
        }
    }
}

impl<H: Handler> Handler for Negotiate<H> {
    fn handle(&self, req: Request<Body>, factory: Arc<Factory>) -> BoxFuture<'static, DataResponse> {
        let accept = req.headers().get(ACCEPT).and_then(|v| v.to_str().ok());

        let formatter = match select_formatter(accept, &self.registry) {
            Ok(formatter) => formatter.clone(),
            Err(err) => {
                tracing::debug!(error = %err, accept = ?accept, "Content negotiation failed");
                let resp = factory.error(StatusCode::NOT_ACCEPTABLE, "Not Acceptable");
                return Box::pin(async move { resp });
            }
        };

        tracing::debug!(formatter = formatter.name(), accept = ?accept, "Formatter negotiated");
        let inner = self.inner.clone();
        Box::pin(async move { inner.handle(req, factory).await.with_formatter(formatter) })
    }
}
