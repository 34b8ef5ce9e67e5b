//! Middleware composed in front of the write pipeline.

use std::io::{Cursor, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::CONTENT_ENCODING;
use axum::http::{Request, StatusCode};
use data_response::http::{RecordingSink, ResponseWriter};
use data_response::middleware::{
    select_encoding, CompressionLayer, ContentTypeValidatorLayer, Encoding, FormatterRegistry,
    LoggingLayer, MeasurementLayer, NegotiateLayer, RecoveryLayer, RequestTimerLayer,
};
use data_response::{DataResponse, Factory, Handler};
use serde::Serialize;
use serde_json::json;
use tower::{Layer, ServiceBuilder};

mod common;

#[derive(Serialize)]
struct Widget {
    name: &'static str,
}

fn factory() -> Arc<Factory> {
    Arc::new(Factory::new())
}

fn writer(factory: &Arc<Factory>) -> Arc<ResponseWriter> {
    Arc::new(ResponseWriter::new(factory.clone()))
}

fn large_items(factory: Arc<Factory>) -> DataResponse {
    let items: Vec<_> = (0..200)
        .map(|i| json!({"id": i, "name": format!("item-{i}")}))
        .collect();
    factory.success(items)
}

async fn run<H: Handler>(handler: &H, req: Request<Body>, factory: Arc<Factory>) -> RecordingSink {
    let writer = ResponseWriter::new(factory.clone());
    let resp = handler.handle(req, factory).await;
    let mut sink = RecordingSink::new();
    writer.write(&mut sink, resp).await.unwrap();
    sink
}

#[test]
fn test_brotli_wins_regardless_of_quality() {
    assert_eq!(
        select_encoding("br;q=0.9, gzip;q=1.0"),
        Some(Encoding::Brotli)
    );
}

#[tokio::test]
async fn test_negotiated_xml() {
    let factory = factory();
    let handler = NegotiateLayer::new(FormatterRegistry::with_defaults()).layer(
        |_req: Request<Body>, factory: Arc<Factory>| async move {
            factory.success(Widget { name: "widget" })
        },
    );

    let req = Request::get("/widgets")
        .header("accept", "text/csv, application/xml")
        .body(Body::empty())
        .unwrap();
    let sink = run(&handler, req, factory).await;

    assert_eq!(sink.status(), Some(StatusCode::OK));
    assert_eq!(sink.header("content-type"), Some("application/xml"));
    assert!(sink.body_str().ends_with("<Widget><name>widget</name></Widget>"));
}

#[tokio::test]
async fn test_not_acceptable_short_circuits() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let registry = FormatterRegistry::new().register("application/json", data_response::Formatter::json());
    let handler = NegotiateLayer::new(registry).layer(move |_req: Request<Body>, factory: Arc<Factory>| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move { factory.success("unreachable") }
    });

    let req = Request::get("/")
        .header("accept", "image/png")
        .body(Body::empty())
        .unwrap();
    let sink = run(&handler, req, factory()).await;

    assert_eq!(sink.status(), Some(StatusCode::NOT_ACCEPTABLE));
    assert!(sink.body_str().contains("Not Acceptable"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unsupported_request_media_type() {
    let handler = ContentTypeValidatorLayer::json_only().layer(
        |_req: Request<Body>, factory: Arc<Factory>| async move { factory.created("ok", "/x/1") },
    );

    let req = Request::post("/x")
        .header("content-type", "text/plain")
        .header("content-length", "5")
        .body(Body::from("hello"))
        .unwrap();
    let sink = run(&handler, req, factory()).await;

    assert_eq!(sink.status(), Some(StatusCode::UNSUPPORTED_MEDIA_TYPE));
    assert_eq!(sink.header("accept"), Some("application/json"));

    let req = Request::post("/x")
        .header("content-type", "application/json; charset=utf-8")
        .header("content-length", "2")
        .body(Body::from("{}"))
        .unwrap();
    let sink = run(&handler, req, factory()).await;
    assert_eq!(sink.status(), Some(StatusCode::CREATED));
}

#[tokio::test]
async fn test_gzip_compressed_body_round_trips() {
    let factory = factory();
    let handler = CompressionLayer::new(writer(&factory))
        .layer(|_req: Request<Body>, factory: Arc<Factory>| async move { large_items(factory) });

    let req = Request::get("/items")
        .header("accept-encoding", "gzip, deflate")
        .body(Body::empty())
        .unwrap();
    let sink = run(&handler, req, factory.clone()).await;

    assert_eq!(sink.status(), Some(StatusCode::OK));
    assert_eq!(sink.header("content-encoding"), Some("gzip"));
    assert_eq!(sink.header("vary"), Some("Accept-Encoding"));
    assert_eq!(sink.header("content-type"), Some("application/json"));
    assert_eq!(
        sink.header("content-length"),
        Some(sink.body().len().to_string().as_str())
    );

    let mut decoded = String::new();
    flate2::read::GzDecoder::new(sink.body())
        .read_to_string(&mut decoded)
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&decoded).unwrap();
    assert_eq!(value.as_array().map(Vec::len), Some(200));
}

#[tokio::test]
async fn test_brotli_compressed_body_round_trips() {
    let factory = factory();
    let handler = CompressionLayer::new(writer(&factory))
        .layer(|_req: Request<Body>, factory: Arc<Factory>| async move { large_items(factory) });

    let req = Request::get("/items")
        .header("accept-encoding", "br;q=0.9, gzip;q=1.0")
        .body(Body::empty())
        .unwrap();
    let sink = run(&handler, req, factory).await;

    assert_eq!(sink.header("content-encoding"), Some("br"));
    let mut decoded = String::new();
    brotli::Decompressor::new(sink.body(), 4096)
        .read_to_string(&mut decoded)
        .unwrap();
    assert!(decoded.starts_with(r#"[{"id":0"#));
}

#[tokio::test]
async fn test_small_body_is_not_compressed() {
    let factory = factory();
    let handler = CompressionLayer::new(writer(&factory))
        .layer(|_req: Request<Body>, factory: Arc<Factory>| async move { factory.success(json!({"id": 1})) });

    let req = Request::get("/items/1")
        .header("accept-encoding", "gzip")
        .body(Body::empty())
        .unwrap();
    let sink = run(&handler, req, factory).await;

    assert_eq!(sink.header("content-encoding"), None);
    assert_eq!(sink.header("vary"), None);
    assert_eq!(sink.body_str(), r#"{"id":1}"#);
}

#[tokio::test]
async fn test_disallowed_content_type_is_not_compressed() {
    let factory = factory();
    let handler = CompressionLayer::new(writer(&factory))
        .with_content_types(["text/*"])
        .with_min_size(1)
        .layer(|_req: Request<Body>, factory: Arc<Factory>| async move { large_items(factory) });

    let req = Request::get("/items")
        .header("accept-encoding", "gzip")
        .body(Body::empty())
        .unwrap();
    let sink = run(&handler, req, factory).await;

    assert_eq!(sink.header("content-encoding"), None);
    assert!(sink.body_str().starts_with('['));
}

#[tokio::test]
async fn test_bodiless_status_is_not_compressed() {
    let factory = factory();
    let handler = CompressionLayer::new(writer(&factory))
        .with_min_size(1)
        .layer(|_req: Request<Body>, factory: Arc<Factory>| async move { factory.no_content() });

    let req = Request::delete("/items/1")
        .header("accept-encoding", "gzip")
        .body(Body::empty())
        .unwrap();
    let sink = run(&handler, req, factory).await;

    assert_eq!(sink.status(), Some(StatusCode::NO_CONTENT));
    assert_eq!(sink.header("content-encoding"), None);
    assert_eq!(sink.header("vary"), None);
    assert!(sink.body().is_empty());
}

#[tokio::test]
async fn test_already_encoded_body_passes_through() {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(br#"{"precompressed":true}"#).unwrap();
    let gz = encoder.finish().unwrap();
    let expected = gz.clone();

    let factory = factory();
    let handler = CompressionLayer::new(writer(&factory))
        .with_min_size(1)
        .layer(move |_req: Request<Body>, factory: Arc<Factory>| {
            let gz = gz.clone();
            async move {
                let size = gz.len() as u64;
                factory
                    .binary(Cursor::new(gz), "data.json", Some(size))
                    .set_header(CONTENT_ENCODING, "gzip")
            }
        });

    let req = Request::get("/data.json")
        .header("accept-encoding", "br")
        .body(Body::empty())
        .unwrap();
    let sink = run(&handler, req, factory).await;

    assert_eq!(sink.status(), Some(StatusCode::OK));
    assert_eq!(sink.header("content-encoding"), Some("gzip"));
    assert_eq!(sink.header("vary"), None);
    assert_eq!(sink.body(), &expected[..]);
}

#[tokio::test]
async fn test_body_read_failure_is_internal_error() {
    let (release, count) = common::counting_release();
    let slot = Arc::new(std::sync::Mutex::new(Some(release)));

    let factory = factory();
    let handler = CompressionLayer::new(writer(&factory))
        .with_min_size(1)
        .layer(move |_req: Request<Body>, factory: Arc<Factory>| {
            let release = slot.lock().unwrap().take();
            async move {
                let resp = factory.binary(&b"short"[..], "data.json", Some(4096));
                match release {
                    Some(release) => resp.with_release(release),
                    None => resp,
                }
            }
        });

    let req = Request::get("/data.json")
        .header("accept-encoding", "gzip")
        .body(Body::empty())
        .unwrap();
    let sink = run(&handler, req, factory).await;

    assert_eq!(sink.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(sink.header("content-encoding"), None);
    assert!(sink.body_str().contains("INTERNAL_SERVER_ERROR"));
    assert_eq!(common::closed(&count), 1);
}

#[tokio::test]
async fn test_full_chain_with_panicking_handler() {
    let factory = factory();
    let handler = ServiceBuilder::new()
        .layer(RequestTimerLayer)
        .layer(RecoveryLayer::new())
        .layer(LoggingLayer::new().with_skip_paths(["/health"]))
        .layer(MeasurementLayer::new())
        .layer(CompressionLayer::new(writer(&factory)).with_min_size(1))
        .layer(NegotiateLayer::new(FormatterRegistry::with_defaults()))
        .service(|req: Request<Body>, factory: Arc<Factory>| async move {
            if req.uri().path() == "/panic" {
                panic!("handler exploded");
            }
            factory.success(Widget { name: "fine" })
        });

    let req = Request::get("/panic").body(Body::empty()).unwrap();
    let sink = run(&handler, req, factory.clone()).await;
    assert_eq!(sink.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert!(sink.body_str().contains("INTERNAL_SERVER_ERROR"));

    let req = Request::get("/ok").body(Body::empty()).unwrap();
    let sink = run(&handler, req, factory.clone()).await;
    assert_eq!(sink.status(), Some(StatusCode::OK));
    assert_eq!(sink.body_str(), r#"{"name":"fine"}"#);

    let req = Request::get("/ok")
        .header("accept", "application/xml")
        .header("accept-encoding", "deflate")
        .body(Body::empty())
        .unwrap();
    let sink = run(&handler, req, factory).await;
    assert_eq!(sink.header("content-encoding"), Some("deflate"));
    assert_eq!(sink.header("content-type"), Some("application/xml"));
    let mut decoded = String::new();
    flate2::read::ZlibDecoder::new(sink.body())
        .read_to_string(&mut decoded)
        .unwrap();
    assert!(decoded.ends_with("<Widget><name>fine</name></Widget>"));
}
