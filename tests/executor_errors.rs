use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;
use storefront::api::{ApiErrorKind, Query, RequestExecutor};
use storefront::application::Storefront;
use storefront::application::error::AppError;
use storefront::cache::{CacheConfig, EntryStatus};
use storefront::infra::storage::MemoryStore;
use storefront::session::SessionMirror;
use url::Url;

fn executor(base: &str) -> RequestExecutor {
    RequestExecutor::new(
        Url::parse(base).expect("base url"),
        Duration::from_secs(5),
        SessionMirror::default(),
    )
    .expect("client")
}

/// An address nothing listens on: bind an ephemeral port, then release it.
fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    let err = executor(&closed_port_url())
        .execute(&Query::product("42"))
        .await
        .expect_err("nothing listening");

    assert_eq!(err.kind, ApiErrorKind::Network);
    assert_eq!(err.status, None);
    assert!(!err.message.is_empty());
}

#[tokio::test]
async fn success_with_wrong_shape_is_a_decode_error() {
    let server = MockServer::start_async().await;
    let detail = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/products/42");
            then.status(200).json_body(json!({ "foo": 1 }));
        })
        .await;

    let err = executor(&server.base_url())
        .execute(&Query::product("42"))
        .await
        .expect_err("wrong shape");

    detail.assert_hits_async(1).await;
    assert_eq!(err.kind, ApiErrorKind::Decode);
    assert!(
        err.message.starts_with("unexpected getProductDetails response"),
        "{}",
        err.message
    );
}

#[tokio::test]
async fn non_json_error_body_gets_generic_message() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/products/top");
            then.status(502)
                .header("content-type", "text/html")
                .body("<html>upstream down</html>");
        })
        .await;

    let err = executor(&server.base_url())
        .execute(&Query::TopProducts)
        .await
        .expect_err("bad gateway");

    assert_eq!(err.kind, ApiErrorKind::Api);
    assert_eq!(err.status, Some(502));
    assert_eq!(err.message, "request failed with status 502 Bad Gateway");
}

#[tokio::test]
async fn json_error_body_message_is_kept() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/orders/o1");
            then.status(404)
                .json_body(json!({ "message": "Order not found", "stack": null }));
        })
        .await;

    let err = executor(&server.base_url())
        .execute(&Query::order("o1"))
        .await
        .expect_err("missing order");

    assert_eq!(err.kind, ApiErrorKind::Api);
    assert_eq!(err.status, Some(404));
    assert_eq!(err.message, "Order not found");
}

#[tokio::test]
async fn failed_fetch_is_cached_as_errored() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/products/42");
            then.status(200).body("not json");
        })
        .await;

    let shop = Storefront::with_storage(
        Arc::new(MemoryStore::new()),
        Url::parse(&server.base_url()).expect("base url"),
        Duration::from_secs(5),
        CacheConfig::default(),
    )
    .await
    .expect("storefront");

    let query = Query::product("42");
    match shop.fetch(&query).await {
        Err(AppError::Api(err)) => assert_eq!(err.kind, ApiErrorKind::Decode),
        other => panic!("expected decode error, got {other:?}"),
    }
    let state = shop.client().peek(&query.cache_key()).expect("entry");
    assert_eq!(state.status, EntryStatus::Errored);
    assert!(state.data.is_none());
}
