use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;
use storefront::application::{Storefront, error::AppError};
use storefront::cache::CacheConfig;
use storefront::infra::storage::{KeyValueStore, MemoryStore};
use storefront_api_types::ShippingAddress;
use url::Url;

const BOB: &str = r#"{"_id":"u2","name":"Bob","email":"bob@example.com","isAdmin":false,"token":"bob-token"}"#;

async fn storefront(server: &MockServer, storage: &MemoryStore) -> Storefront {
    let base = Url::parse(&server.base_url()).expect("mock base url");
    Storefront::with_storage(
        Arc::new(storage.clone()),
        base,
        Duration::from_secs(5),
        CacheConfig::default(),
    )
    .await
    .expect("storefront")
}

async fn mock_product<'a>(server: &'a MockServer, id: &str, price: f64, stock: u32) -> httpmock::Mock<'a> {
    let path = format!("/api/products/{id}");
    let body = json!({
        "_id": id,
        "name": format!("Item {id}"),
        "image": format!("/images/{id}.jpg"),
        "price": price,
        "countInStock": stock
    });
    server
        .mock_async(|when, then| {
            when.method(GET).path(path);
            then.status(200).json_body(body);
        })
        .await
}

fn address() -> ShippingAddress {
    ShippingAddress {
        address: "1 Main St".into(),
        city: "Springfield".into(),
        postal_code: "12345".into(),
        country: "US".into(),
    }
}

#[tokio::test]
async fn adding_an_item_twice_replaces_its_line() {
    let server = MockServer::start_async().await;
    let detail = mock_product(&server, "p1", 10.0, 5).await;
    let storage = MemoryStore::new();
    let shop = storefront(&server, &storage).await;

    shop.add_to_cart("p1", 1).await.expect("first add");
    let cart = shop.add_to_cart("p1", 3).await.expect("second add");

    assert_eq!(cart.cart_items.len(), 1);
    assert_eq!(cart.cart_items[0].qty, 3);
    assert_eq!(cart.item_count(), 3);
    // Second add is served from the cache.
    detail.assert_hits_async(1).await;

    let persisted = storage.snapshot("cartItems").expect("persisted");
    assert!(persisted.contains("\"qty\":3"));
}

#[tokio::test]
async fn quantity_is_checked_against_stock() {
    let server = MockServer::start_async().await;
    mock_product(&server, "p2", 5.0, 2).await;
    let storage = MemoryStore::new();
    let shop = storefront(&server, &storage).await;

    let err = shop.add_to_cart("p2", 3).await.expect_err("over stock");
    assert!(matches!(err, AppError::Validation(_)));
    let err = shop.add_to_cart("p2", 0).await.expect_err("zero");
    assert!(matches!(err, AppError::Validation(_)));
    assert!(shop.cart().snapshot().await.is_empty());
}

#[tokio::test]
async fn cart_survives_a_restart() {
    let server = MockServer::start_async().await;
    mock_product(&server, "p3", 12.5, 9).await;
    let storage = MemoryStore::new();

    {
        let shop = storefront(&server, &storage).await;
        shop.add_to_cart("p3", 2).await.expect("add");
        shop.save_shipping_address(address()).await.expect("address");
        shop.save_payment_method("Stripe").await.expect("payment");
    }

    let shop = storefront(&server, &storage).await;
    let cart = shop.cart().snapshot().await;
    assert_eq!(cart.cart_items.len(), 1);
    assert_eq!(cart.shipping_address, Some(address()));
    assert_eq!(cart.payment_method.as_deref(), Some("Stripe"));
}

#[tokio::test]
async fn placing_an_order_submits_cart_and_empties_it() {
    let server = MockServer::start_async().await;
    mock_product(&server, "p4", 89.99, 10).await;
    mock_product(&server, "p5", 10.0, 10).await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/orders")
                .header("authorization", "Bearer bob-token")
                .json_body_includes(
                    r#"{"paymentMethod":"PayPal","itemsPrice":"109.99","shippingPrice":"0.00","taxPrice":"16.50","totalPrice":"126.49"}"#,
                );
            then.status(201).json_body(json!({
                "_id": "o9",
                "user": "u2",
                "orderItems": [],
                "totalPrice": 126.49
            }));
        })
        .await;

    let storage = MemoryStore::new();
    storage.set("userInfo", BOB.to_string()).await.expect("seed");
    let shop = storefront(&server, &storage).await;

    shop.add_to_cart("p4", 1).await.expect("add p4");
    shop.add_to_cart("p5", 2).await.expect("add p5");
    shop.save_shipping_address(address()).await.expect("address");

    let order = shop.place_order().await.expect("order");
    assert_eq!(order.id, "o9");
    create.assert_hits_async(1).await;

    let cart = shop.cart().snapshot().await;
    assert!(cart.is_empty());
    assert_eq!(cart.shipping_address, Some(address()));
}

#[tokio::test]
async fn placing_an_order_requires_address_and_items() {
    let server = MockServer::start_async().await;
    mock_product(&server, "p6", 1.0, 1).await;
    let storage = MemoryStore::new();
    storage.set("userInfo", BOB.to_string()).await.expect("seed");
    let shop = storefront(&server, &storage).await;

    let err = shop.place_order().await.expect_err("empty cart");
    assert!(err.to_string().contains("cart is empty"));

    shop.add_to_cart("p6", 1).await.expect("add");
    let err = shop.place_order().await.expect_err("no address");
    assert!(err.to_string().contains("shipping address"));
}

#[tokio::test]
async fn anonymous_checkout_is_rejected() {
    let server = MockServer::start_async().await;
    let storage = MemoryStore::new();
    let shop = storefront(&server, &storage).await;

    let err = shop.place_order().await.expect_err("anonymous");
    assert!(matches!(err, AppError::Validation(_)));
}
