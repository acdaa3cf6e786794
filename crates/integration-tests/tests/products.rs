//! Product endpoint tests.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use boutique_core::{Product, ProductId};
use boutique_integration_tests::{TestContext, assert_status, body_json, product};
use serde_json::json;

fn seed(ctx: &TestContext) {
    for (id, name) in [(1163, "Blue Tee"), (1164, "Red Tee"), (1165, "Green Tee")] {
        ctx.insert_product(&product(json!({
            "id": id,
            "productDisplayName": name,
            "masterCategory": "Apparel",
            "price": 19.99,
            "imageUrls": {"default": format!("{id}/default.jpg")}
        })))
        .unwrap();
    }
}

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::new();
    assert_status(ctx.get("/health").await, StatusCode::OK).await;
}

#[tokio::test]
async fn test_list_returns_catalog_sample() {
    let ctx = TestContext::new();
    seed(&ctx);

    let response = assert_status(ctx.get("/api/products").await, StatusCode::OK).await;
    let products: Vec<Product> = body_json(response).await;

    assert_eq!(
        products.iter().map(|p| p.id.as_u64()).collect::<Vec<_>>(),
        vec![1163, 1164]
    );
    assert_eq!(products[0].product_display_name, "Blue Tee");
}

#[tokio::test]
async fn test_list_sample_is_fixed_after_first_read() {
    let ctx = TestContext::new();
    ctx.insert_product(&product(json!({"id": 2000}))).unwrap();

    let first: Vec<Product> = body_json(ctx.get("/api/products").await).await;
    seed(&ctx);
    let second: Vec<Product> = body_json(ctx.get("/api/products").await).await;

    assert_eq!(first.len(), 1);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_show_product() {
    let ctx = TestContext::new();
    seed(&ctx);

    let response = assert_status(ctx.get("/api/products/1165").await, StatusCode::OK).await;
    let product: Product = body_json(response).await;

    assert_eq!(product.id, ProductId::new(1165));
    assert_eq!(product.price.unwrap().to_string(), "$19.99");
}

#[tokio::test]
async fn test_show_missing_product_is_404() {
    let ctx = TestContext::new();
    assert_status(ctx.get("/api/products/43059").await, StatusCode::NOT_FOUND).await;
}

#[tokio::test]
async fn test_show_non_numeric_id_is_400() {
    let ctx = TestContext::new();
    assert_status(ctx.get("/api/products/tee").await, StatusCode::BAD_REQUEST).await;
}
