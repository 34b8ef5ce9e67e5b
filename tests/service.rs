//! End-to-end through axum: handler chain → write pipeline → streamed body.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use data_response::http::{DataResponseService, ResponseWriter};
use data_response::middleware::{CompressionLayer, FormatterRegistry, NegotiateLayer};
use data_response::{DataResponse, Factory};
use serde::Serialize;
use tokio::net::TcpListener;
use tower::{ServiceBuilder, ServiceExt};
use tower_http::trace::TraceLayer;

mod common;

#[derive(Serialize)]
struct Greeting {
    message: String,
}

fn writer() -> Arc<ResponseWriter> {
    Arc::new(ResponseWriter::new(Arc::new(Factory::new())))
}

async fn greet(_req: Request<Body>, factory: Arc<Factory>) -> DataResponse {
    factory.success(Greeting {
        message: "hello ".repeat(400),
    })
}

fn app(writer: Arc<ResponseWriter>) -> Router {
    let chain = ServiceBuilder::new()
        .layer(CompressionLayer::new(writer.clone()))
        .layer(NegotiateLayer::new(FormatterRegistry::with_defaults()))
        .service(greet);

    let failing = |_req: Request<Body>, _factory: Arc<Factory>| async move {
        DataResponse::with_payload(StatusCode::OK, "x")
            .with_formatter(data_response::Formatter::custom(common::AlwaysFailFormatter))
    };

    Router::new()
        .route_service("/greet", DataResponseService::new(chain, writer.clone()))
        .route_service("/broken", DataResponseService::new(failing, writer.clone()))
        .route_service(
            "/download",
            DataResponseService::new(
                |_req: Request<Body>, factory: Arc<Factory>| async move {
                    factory.binary(&b"PK\x03\x04"[..], "bundle.zip", Some(4))
                },
                writer,
            )
            .with_buffer(2),
        )
        .layer(TraceLayer::new_for_http())
}

#[tokio::test]
async fn test_streams_json_through_router() {
    let response = app(writer())
        .oneshot(Request::get("/greet").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/json");
    let length: usize = response.headers()["content-length"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body.len(), length);
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(value["message"].as_str().unwrap().starts_with("hello hello"));
}

#[tokio::test]
async fn test_minimal_error_reaches_client() {
    let response = app(writer())
        .oneshot(Request::get("/broken").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.headers()["content-type"], "text/plain");
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"Internal Server Error");
}

#[tokio::test]
async fn test_binary_download_with_tiny_pipe() {
    let response = app(writer())
        .oneshot(Request::get("/download").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/zip");
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=\"bundle.zip\""
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"PK\x03\x04");
}

#[tokio::test]
async fn test_http_client_decodes_compressed_response() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app(writer())).await.unwrap();
    });

    let client = reqwest::Client::builder().gzip(true).build().unwrap();

    let response = client
        .get(format!("http://{}/greet", addr))
        .header("accept-encoding", "gzip")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let greeting: serde_json::Value = serde_json::from_str(&response.text().await.unwrap()).unwrap();
    assert_eq!(greeting["message"].as_str().unwrap().len(), 2400);

    let raw = reqwest::Client::builder()
        .no_gzip()
        .no_brotli()
        .no_deflate()
        .build()
        .unwrap()
        .get(format!("http://{}/greet", addr))
        .header("accept", "application/xml")
        .header("accept-encoding", "br")
        .send()
        .await
        .unwrap();
    assert_eq!(raw.headers()["content-encoding"], "br");
    assert_eq!(raw.headers()["content-type"], "application/xml");
    assert_eq!(raw.headers()["vary"], "Accept-Encoding");
}
