use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join;
use httpmock::prelude::*;
use metrics_util::debugging::DebuggingRecorder;
use serde_json::json;
use storefront::api::{Mutation, Query};
use storefront::application::Storefront;
use storefront::cache::{CacheConfig, Tag, TagType};
use storefront::infra::storage::MemoryStore;
use url::Url;

#[tokio::test]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/products/1");
            then.status(200)
                .delay(Duration::from_millis(100))
                .json_body(json!({ "_id": "1", "name": "Lamp", "price": 30.0 }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/orders/missing");
            then.status(404).json_body(json!({ "message": "Order not found" }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/products/1");
            then.status(500).json_body(json!({ "message": "nope" }));
        })
        .await;

    let shop = Storefront::with_storage(
        Arc::new(MemoryStore::new()),
        Url::parse(&server.base_url()).expect("mock base url"),
        Duration::from_secs(5),
        CacheConfig {
            keep_unused_for: Some(Duration::ZERO),
            sweep_interval: Duration::from_secs(3600),
            ..CacheConfig::default()
        },
    )
    .await
    .expect("storefront");
    let client = shop.client();

    // miss + dedup, then hit
    let product = Query::product("1");
    join(client.read(&product), client.read(&product)).await;
    client.read(&product).await;

    // fetch error
    client.read(&Query::order("missing")).await;

    // invalidate, reset, evict
    client.invalidate(&HashSet::from([Tag::id(TagType::Product, "1")]));
    client.reset_session_scoped();
    client.collect_garbage(Instant::now() + Duration::from_secs(1));

    // mutation error
    assert!(
        client
            .mutate(&Mutation::DeleteProduct { id: "1".into() })
            .await
            .is_err()
    );

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "storefront_cache_hit_total",
        "storefront_cache_miss_total",
        "storefront_cache_dedup_total",
        "storefront_cache_invalidated_total",
        "storefront_cache_reset_total",
        "storefront_cache_evict_total",
        "storefront_fetch_error_total",
        "storefront_fetch_ms",
        "storefront_mutation_error_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
