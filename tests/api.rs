//! HTTP round trips through the full router, backed by the in-memory store.

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use storefront::api::build_router;

enum Caller {
    Anonymous,
    Customer(&'static str),
    Admin,
}

async fn send(app: &Router, method: &str, uri: &str, caller: Caller, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    match caller {
        Caller::Anonymous => {}
        Caller::Customer(id) => request = request.header("x-user-id", id).header("x-user-name", "Test Customer"),
        Caller::Admin => request = request.header("x-user-id", "admin-1").header("x-user-role", "admin"),
    }
    let body = match body {
        Some(value) => {
            request = request.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(request.body(body).expect("request")).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body bytes");
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).expect("json parse") };
    (status, json)
}

async fn seeded_app() -> (Router, String) {
    let app = build_router(common::storefront());
    let (status, body) = send(&app, "POST", "/api/admin/categories", Caller::Admin, Some(json!({ "name": "Shoes" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let category_id = body["category"]["id"].as_str().expect("category id").to_string();

    let (status, body) = send(
        &app,
        "POST",
        "/api/admin/products",
        Caller::Admin,
        Some(json!({
            "name": "Trail Sneaker",
            "description": "Grippy and light",
            "price": "20.00",
            "images": ["/images/trail-sneaker.jpg"],
            "categoryId": category_id,
            "stock": 5,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let product_id = body["product"]["id"].as_str().expect("product id").to_string();
    (app, product_id)
}

#[tokio::test]
async fn health_is_public() {
    let app = build_router(common::storefront());
    let (status, body) = send(&app, "GET", "/health", Caller::Anonymous, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn identity_is_required_and_admin_routes_check_role() {
    let app = build_router(common::storefront());

    let (status, _) = send(&app, "GET", "/api/cart", Caller::Anonymous, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/admin/orders", Caller::Customer("user-1"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, "GET", "/api/admin/orders", Caller::Admin, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 0);
}

#[tokio::test]
async fn storefront_lists_created_products() {
    let (app, product_id) = seeded_app().await;

    let (status, body) = send(&app, "GET", "/api/products?sort=price_asc", Caller::Anonymous, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["products"][0]["id"], product_id.as_str());
    assert_eq!(body["products"][0]["slug"], "trail-sneaker");
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["pagination"]["page"], 1);

    let (status, body) = send(&app, "GET", "/api/products/info/trail-sneaker", Caller::Anonymous, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["product"]["price"], "20.00");

    let (status, _) = send(&app, "GET", "/api/products?sort=cheapest", Caller::Anonymous, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", "/api/products/info/no-such-thing", Caller::Anonymous, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_bodies_report_details() {
    let (app, product_id) = seeded_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/cart",
        Caller::Customer("user-1"),
        Some(json!({ "productId": product_id, "quantity": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation error");
    assert!(body["details"]["quantity"].is_array());

    let (status, _) = send(
        &app,
        "POST",
        "/api/admin/products",
        Caller::Admin,
        Some(json!({ "name": "", "price": "-1", "categoryId": uuid::Uuid::now_v7() })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cart_to_order_over_http() {
    let (app, product_id) = seeded_app().await;
    let buyer = Caller::Customer;

    let (status, body) = send(
        &app,
        "POST",
        "/api/cart",
        buyer("user-1"),
        Some(json!({ "productId": product_id, "quantity": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart"]["total"], "44.99");

    let (status, body) = send(&app, "POST", "/api/payment/intent", buyer("user-1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["amount"], 4499);

    let (status, body) = send(
        &app,
        "POST",
        "/api/orders",
        buyer("user-1"),
        Some(json!({
            "shippingDetails": {
                "fullName": "Ada Lovelace",
                "email": "ada@example.com",
                "phone": "+44 20 7946 0000",
                "street": "12 Analytical Row",
                "city": "London",
                "state": "Greater London",
                "zipCode": "N1 9GU",
                "country": "United Kingdom"
            },
            "paymentDetails": { "paymentId": "pay_1", "orderId": "order_1", "signature": "sig_1" },
            "items": [{ "productId": product_id, "quantity": 99, "price": "0.01" }],
            "totalAmount": "44.99",
            "shippingCost": "4.99"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let order_id = body["id"].as_str().expect("order id").to_string();

    let (status, body) = send(&app, "GET", &format!("/api/orders/{order_id}"), buyer("user-1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["orderStatus"], "pending");
    assert_eq!(body["order"]["paymentStatus"], "paid");
    assert_eq!(body["order"]["items"][0]["quantity"], 2);

    let (status, _) = send(&app, "GET", &format!("/api/orders/{order_id}"), buyer("user-2"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "GET", "/api/cart", buyer("user-1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart"]["items"].as_array().map(Vec::len), Some(0));

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/admin/orders/{order_id}/status"),
        Caller::Admin,
        Some(json!({ "orderStatus": "processing" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["orderStatus"], "processing");

    let (status, body) = send(&app, "GET", &format!("/api/admin/products/{product_id}"), Caller::Admin, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["product"]["stock"], 3);
}

#[tokio::test]
async fn product_sku_and_partial_edits_over_http() {
    let (app, product_id) = seeded_app().await;
    let (_, body) = send(&app, "GET", &format!("/api/admin/products/{product_id}"), Caller::Admin, None).await;
    let category_id = body["product"]["categoryId"].as_str().expect("category id").to_string();

    let (status, body) = send(
        &app,
        "POST",
        "/api/admin/products",
        Caller::Admin,
        Some(json!({
            "name": "Road Runner",
            "sku": "run-01",
            "location": "Aisle 3",
            "price": "60.00",
            "categoryId": category_id,
            "stock": 8,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["product"]["sku"], "RUN-01");
    assert_eq!(body["product"]["location"], "Aisle 3");
    let runner_id = body["product"]["id"].as_str().expect("product id").to_string();

    let (status, body) = send(
        &app,
        "POST",
        "/api/admin/products",
        Caller::Admin,
        Some(json!({ "name": "Road Runner II", "sku": "Run-01", "price": "65.00", "categoryId": category_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "A product with this SKU already exists");

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/admin/products/{runner_id}"),
        Caller::Admin,
        Some(json!({ "name": "Road Runner", "sku": "RUN-01", "price": "55.00", "categoryId": category_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["product"]["price"], "55.00");
    assert_eq!(body["product"]["stock"], 8);
}

#[tokio::test]
async fn reviews_over_http() {
    let (app, product_id) = seeded_app().await;
    let uri = format!("/api/products/{product_id}/reviews");

    let review = json!({ "rating": 4, "title": "Comfy", "comment": "Wore them all weekend." });
    let (status, body) = send(&app, "POST", &uri, Caller::Customer("user-1"), Some(review.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["stats"]["totalReviews"], 1);
    assert_eq!(body["review"]["userName"], "Test Customer");
    let review_id = body["review"]["id"].as_str().expect("review id").to_string();

    let (status, _) = send(&app, "POST", &uri, Caller::Customer("user-1"), Some(review)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let helpful = format!("{uri}/{review_id}/helpful");
    let (status, body) = send(&app, "POST", &helpful, Caller::Customer("user-2"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["helpful"], 1);
    let (status, _) = send(&app, "POST", &helpful, Caller::Customer("user-2"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "GET", &format!("{uri}?sortBy=helpful"), Caller::Anonymous, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reviews"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["pagination"]["total"], 1);
}
