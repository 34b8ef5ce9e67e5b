//! Request `Content-Type` validation.
//!
//! Rejects request bodies whose media type is not allow-listed with `415` and
//! an `Accept` header listing what is allowed. Patterns may be exact
//! (`application/json`), a type wildcard (`text/*`) or `*/*`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE, TRANSFER_ENCODING};
use axum::http::{Method, Request, StatusCode};
use futures_util::future::BoxFuture;
use tower::Layer;

use crate::error::ResponseError;
use crate::factory::Factory;
use crate::middleware::Handler;
use crate::response::headers::{
    media_type, CONTENT_TYPE_FORM, CONTENT_TYPE_JSON, CONTENT_TYPE_MULTIPART_FORM,
    CONTENT_TYPE_TEXT_XML, CONTENT_TYPE_XML,
};
use crate::response::DataResponse;

const DEFAULT_MESSAGE: &str = "Unsupported Media Type";

/// True when `media` (already normalised) matches `pattern`.
pub(crate) fn media_type_matches(media: &str, pattern: &str) -> bool {
    let pattern = pattern.trim().to_ascii_lowercase();
    if pattern == "*/*" || pattern == "*" {
        return true;
    }
    if let Some(kind) = pattern.strip_suffix("/*") {
        return media
            .split_once('/')
            .is_some_and(|(media_kind, _)| media_kind == kind);
    }
    media == pattern
}

/// True when `media` matches any pattern in `allowed`.
pub(crate) fn matches_any(media: &str, allowed: &[String]) -> bool {
    allowed.iter().any(|pattern| media_type_matches(media, pattern))
}

#[derive(Debug, Clone)]
struct Rules {
    allowed: Vec<String>,
    methods: Vec<Method>,
    message: String,
    ignore_empty: bool,
}

/// Layer validating request media types.
#[derive(Debug, Clone)]
pub struct ContentTypeValidatorLayer {
    rules: Arc<Rules>,
}

impl ContentTypeValidatorLayer {
    /// Validate POST, PUT and PATCH bodies against `allowed`.
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rules: Arc::new(Rules {
                allowed: allowed.into_iter().map(Into::into).collect(),
                methods: vec![Method::POST, Method::PUT, Method::PATCH],
                message: DEFAULT_MESSAGE.to_string(),
                ignore_empty: false,
            }),
        }
    }

    pub fn with_methods(mut self, methods: Vec<Method>) -> Self {
        self.rules_mut().methods = methods;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.rules_mut().message = message.into();
        self
    }

    /// Let requests without a body through unchecked.
    pub fn ignore_empty(mut self, ignore: bool) -> Self {
        self.rules_mut().ignore_empty = ignore;
        self
    }

    pub fn json_only() -> Self {
        Self::new([CONTENT_TYPE_JSON])
            .ignore_empty(true)
            .with_message("Content-Type must be application/json")
    }

    pub fn xml_only() -> Self {
        Self::new([CONTENT_TYPE_XML, CONTENT_TYPE_TEXT_XML])
            .ignore_empty(true)
            .with_message("Content-Type must be application/xml or text/xml")
    }

    pub fn json_or_xml() -> Self {
        Self::new([CONTENT_TYPE_JSON, CONTENT_TYPE_XML, CONTENT_TYPE_TEXT_XML])
            .ignore_empty(true)
            .with_message("Content-Type must be application/json or application/xml")
    }

    pub fn api_content_types() -> Self {
        Self::new([
            CONTENT_TYPE_JSON,
            CONTENT_TYPE_XML,
            CONTENT_TYPE_TEXT_XML,
            CONTENT_TYPE_FORM,
            CONTENT_TYPE_MULTIPART_FORM,
        ])
        .ignore_empty(true)
    }

    /// Whether a raw `Content-Type` value is allowed; an empty value never is.
    pub fn is_allowed(&self, content_type: &str) -> bool {
        let media = media_type(content_type);
        !media.is_empty() && matches_any(&media, &self.rules.allowed)
    }

    fn rules_mut(&mut self) -> &mut Rules {
        Arc::make_mut(&mut self.rules)
    }
}

impl<H: Handler> Layer<H> for ContentTypeValidatorLayer {
    type Service = ContentTypeValidator<H>;

    fn layer(&self, inner: H) -> Self::Service {
        ContentTypeValidator {
            inner: Arc::new(inner),
            rules: self.rules.clone(),
        }
    }
}

/// Handler produced by [`ContentTypeValidatorLayer`].
pub struct ContentTypeValidator<H> {
    inner: Arc<H>,
    rules: Arc<Rules>,
}

impl<H> Clone for ContentTypeValidator<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            rules: self.rules.clone(),
        }
    }
}

fn has_empty_body(req: &Request<Body>) -> bool {
    let headers = req.headers();
    match headers.get(CONTENT_LENGTH).and_then(|v| v.to_str().ok()) {
        Some(length) => length.trim() == "0",
        None => !headers.contains_key(TRANSFER_ENCODING),
    }
}

impl<H: Handler> Handler for ContentTypeValidator<H> {
    fn handle(&self, req: Request<Body>, factory: Arc<Factory>) -> BoxFuture<'static, DataResponse> {
        let rules = &self.rules;
        let checked = rules.methods.contains(req.method())
            && !(rules.ignore_empty && has_empty_body(&req));

        if checked {
            let content_type = req
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            let media = media_type(content_type);

            if media.is_empty() || !matches_any(&media, &rules.allowed) {
                tracing::warn!(
                    error = %ResponseError::UnsupportedContentType(content_type.to_string()),
                    method = %req.method(),
                    path = %req.uri().path(),
                    "Invalid content type"
                );
                let resp = factory
                    .error(StatusCode::UNSUPPORTED_MEDIA_TYPE, &rules.message)
                    .with_header(ACCEPT, rules.allowed.join(", "));
                return Box::pin(async move { resp });
            }
        }

        self.inner.handle(req, factory)
    }
}
