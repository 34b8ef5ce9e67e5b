//! Response compression.
//!
//! # Responsibilities
//! - Pick an encoding from `Accept-Encoding` by fixed priority (br > gzip > deflate)
//! - Format the response once to learn its content type and size
//! - Compress eligible bodies and attach them as pre-formatted
//!
//! # Design Decisions
//! - Quality values are ignored; a listed token is a supported token
//! - Bodies of unknown size are never materialised
//! - Codec failures fall back to the uncompressed body

use std::io::{self, Write};
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{ACCEPT_ENCODING, CONTENT_ENCODING, VARY};
use axum::http::Request;
use flate2::write::{GzEncoder, ZlibEncoder};
use futures_util::future::BoxFuture;
use tokio::io::AsyncReadExt;
use tower::Layer;

use crate::config::CompressionConfig;
use crate::error::CompressionError;
use crate::factory::Factory;
use crate::http::writer::allows_body;
use crate::http::ResponseWriter;
use crate::middleware::content_type::matches_any;
use crate::middleware::Handler;
use crate::observability::metrics;
use crate::response::headers::{media_type, ENCODING_BROTLI, ENCODING_DEFLATE, ENCODING_GZIP};
use crate::response::{DataResponse, FormattedBody};

const BROTLI_BUFFER_SIZE: usize = 4096;
const BROTLI_LGWIN: u32 = 22;
const MAX_FLATE_LEVEL: u32 = 9;
const MAX_BROTLI_LEVEL: u32 = 11;

/// Supported content codings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Brotli,
    Gzip,
    Deflate,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Brotli => ENCODING_BROTLI,
            Encoding::Gzip => ENCODING_GZIP,
            Encoding::Deflate => ENCODING_DEFLATE,
        }
    }
}

/// Best supported encoding listed in an `Accept-Encoding` value.
pub fn select_encoding(accept_encoding: &str) -> Option<Encoding> {
    let mut listed = (false, false, false);
    for token in accept_encoding.split(',') {
        let token = token.split(';').next().unwrap_or_default().trim();
        if token.eq_ignore_ascii_case(ENCODING_BROTLI) {
            listed.0 = true;
        } else if token.eq_ignore_ascii_case(ENCODING_GZIP) {
            listed.1 = true;
        } else if token.eq_ignore_ascii_case(ENCODING_DEFLATE) {
            listed.2 = true;
        }
    }

    match listed {
        (true, _, _) => Some(Encoding::Brotli),
        (_, true, _) => Some(Encoding::Gzip),
        (_, _, true) => Some(Encoding::Deflate),
        _ => None,
    }
}

/// Compress `data` in one pass.
pub fn compress(encoding: Encoding, level: u32, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
    let codec_err = |source: io::Error| CompressionError::Codec {
        encoding: encoding.as_str(),
        source,
    };

    match encoding {
        Encoding::Gzip => {
            let level = flate2::Compression::new(level.min(MAX_FLATE_LEVEL));
            let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), level);
            encoder.write_all(data).map_err(codec_err)?;
            encoder.finish().map_err(codec_err)
        }
        Encoding::Deflate => {
            let level = flate2::Compression::new(level.min(MAX_FLATE_LEVEL));
            let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), level);
            encoder.write_all(data).map_err(codec_err)?;
            encoder.finish().map_err(codec_err)
        }
        Encoding::Brotli => {
            let mut encoder = brotli::CompressorWriter::new(
                Vec::with_capacity(data.len() / 2),
                BROTLI_BUFFER_SIZE,
                level.min(MAX_BROTLI_LEVEL),
                BROTLI_LGWIN,
            );
            encoder.write_all(data).map_err(codec_err)?;
            encoder.flush().map_err(codec_err)?;
            Ok(encoder.into_inner())
        }
    }
}

/// One-shot codec signature; [`compress`] unless replaced in tests.
type Codec = fn(Encoding, u32, &[u8]) -> Result<Vec<u8>, CompressionError>;

#[derive(Debug, Clone)]
struct Settings {
    enabled: bool,
    level: u32,
    min_size: u64,
    content_types: Vec<String>,
    codec: Codec,
}

impl From<&CompressionConfig> for Settings {
    fn from(config: &CompressionConfig) -> Self {
        Self {
            enabled: config.enabled,
            level: config.level,
            min_size: config.min_size,
            content_types: config.content_types.clone(),
            codec: compress,
        }
    }
}

/// Layer compressing responses after the handler ran.
#[derive(Debug, Clone)]
pub struct CompressionLayer {
    settings: Arc<Settings>,
    writer: Arc<ResponseWriter>,
}

impl CompressionLayer {
    /// Defaults: level 6, 1024-byte threshold, JSON/XML/text allow-list.
    ///
    /// `writer` resolves formatters exactly as the write pipeline will.
    pub fn new(writer: Arc<ResponseWriter>) -> Self {
        Self::from_config(&CompressionConfig::default(), writer)
    }

    pub fn from_config(config: &CompressionConfig, writer: Arc<ResponseWriter>) -> Self {
        Self {
            settings: Arc::new(Settings::from(config)),
            writer,
        }
    }

    pub fn with_level(mut self, level: u32) -> Self {
        Arc::make_mut(&mut self.settings).level = level;
        self
    }

    pub fn with_min_size(mut self, min_size: u64) -> Self {
        Arc::make_mut(&mut self.settings).min_size = min_size;
        self
    }

    /// Compressible media types; an empty list allows everything.
    pub fn with_content_types<I, S>(mut self, content_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::make_mut(&mut self.settings).content_types =
            content_types.into_iter().map(Into::into).collect();
        self
    }
}

impl<H: Handler> Layer<H> for CompressionLayer {
    type Service = Compression<H>;

    fn layer(&self, inner: H) -> Self::Service {
        Compression {
            inner: Arc::new(inner),
            settings: self.settings.clone(),
            writer: self.writer.clone(),
        }
    }
}

/// Handler produced by [`CompressionLayer`].
pub struct Compression<H> {
    inner: Arc<H>,
    settings: Arc<Settings>,
    writer: Arc<ResponseWriter>,
}

impl<H> Clone for Compression<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            settings: self.settings.clone(),
            writer: self.writer.clone(),
        }
    }
}

impl<H: Handler> Handler for Compression<H> {
    fn handle(&self, req: Request<Body>, factory: Arc<Factory>) -> BoxFuture<'static, DataResponse> {
        let encoding = if self.settings.enabled {
            req.headers()
                .get(ACCEPT_ENCODING)
                .and_then(|v| v.to_str().ok())
                .and_then(select_encoding)
        } else {
            None
        };

        let Some(encoding) = encoding else {
            return self.inner.handle(req, factory);
        };

        let inner = self.inner.clone();

        let settings = self.settings.clone();
        let writer = self.writer.clone();
        Box::pin(async move {
            let resp = inner.handle(req, factory.clone()).await;
            compress_response(&settings, &writer, &factory, resp, encoding).await
        })
    }
}

async fn compress_response(
    settings: &Settings,
    writer: &ResponseWriter,
    factory: &Factory,
    mut resp: DataResponse,
    encoding: Encoding,
) -> DataResponse {
    if resp.has_header(CONTENT_ENCODING) || !allows_body(resp.status()) {
        return resp;
    }

    let body = match resp.take_formatted() {
        Some(body) => body,
        None => match writer.resolve_formatter(&resp).format(&mut resp) {
            Ok(body) => body,
            Err(err) => {
                tracing::debug!(error = %err, "Skipping compression, response does not format");
                return resp;
            }
        },
    };

    let content_type = media_type(resp.content_type().unwrap_or(body.content_type()));
    if !settings.content_types.is_empty() && !matches_any(&content_type, &settings.content_types) {
        return resp.with_formatted(body);
    }

    let size = match body.size() {
        Some(size) if size >= settings.min_size => size,
        _ => return resp.with_formatted(body),
    };

    let (formatted_type, stream, _) = body.into_parts();
    let data = match read_exact_body(stream, size).await {
        Ok(data) => data,
        Err(err) => {
            let err = CompressionError::Read(err);
            tracing::error!(error = %err, status = %resp.status(), "Failed to buffer body for compression");
            let release = resp.take_release();
            let error_resp = factory.internal_error(&err);
            return match release {
                Some(release) => error_resp.with_release(release),
                None => error_resp,
            };
        }
    };

    match (settings.codec)(encoding, settings.level, &data) {
        Ok(compressed) => {
            metrics::record_compressed(encoding.as_str());
            tracing::debug!(
                encoding = encoding.as_str(),
                original = data.len(),
                compressed = compressed.len(),
                "Response compressed"
            );
            with_vary_accept_encoding(resp)
                .set_header(CONTENT_ENCODING, encoding.as_str())
                .with_formatted(FormattedBody::from_bytes(formatted_type, compressed))
        }
        Err(err) => {
            tracing::warn!(error = %err, "Compression failed, sending uncompressed");
            resp.with_formatted(FormattedBody::from_bytes(formatted_type, data))
        }
    }
}

async fn read_exact_body(
    stream: crate::response::BodyReader,
    size: u64,
) -> Result<Vec<u8>, io::Error> {
    let capacity = usize::try_from(size).unwrap_or(usize::MAX).min(1 << 20);
    let mut data = Vec::with_capacity(capacity);
    stream.take(size).read_to_end(&mut data).await?;
    if (data.len() as u64) < size {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("body ended after {} of {} bytes", data.len(), size),
        ));
    }
    Ok(data)
}

fn with_vary_accept_encoding(resp: DataResponse) -> DataResponse {
    let present = resp.header_values(VARY).iter().any(|value| {
        value
            .split(',')
            .any(|token| token.trim().eq_ignore_ascii_case(ACCEPT_ENCODING.as_str()))
    });
    if present {
        resp
    } else {
        resp.with_header(VARY, "Accept-Encoding")
    }
}
