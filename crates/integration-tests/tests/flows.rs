//! End-to-end flows over HTTP against a real database.

#![allow(clippy::unwrap_used)]

use bazaar_core::UserRole;
use bazaar_integration_tests::{
    TEST_PASSWORD, create_category, create_product, create_user, spawn_admin, spawn_storefront,
    stock_of, test_pool, unique,
};
use bazaar_storefront::db::ProductRepository;
use bazaar_storefront::db::products::ProductInput;
use reqwest::StatusCode;
use serde_json::{Value, json};

/// Decimal fields may serialize as strings or numbers; compare their text.
fn decimal_text(value: &Value) -> String {
    value.as_str().map_or_else(|| value.to_string(), str::to_owned)
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_cart_survives_logout_and_merges_on_login() {
    let pool = test_pool().await;
    let category = create_category(&pool).await;
    let kept = create_product(&pool, category.id, "6.00", 5).await;
    let added_later = create_product(&pool, category.id, "2.50", 5).await;
    let server = spawn_storefront(pool).await;
    let email = format!("{}@example.com", unique("shopper"));

    let resp = server
        .client
        .post(server.url("/auth/register"))
        .json(&json!({
            "email": email,
            "password": TEST_PASSWORD,
            "password_confirm": TEST_PASSWORD,
            "first_name": "Grace",
            "last_name": "Hopper",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = server
        .client
        .post(server.url("/cart/add"))
        .json(&json!({ "product_id": kept.id, "quantity": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = server.client.post(server.url("/auth/logout")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // Anonymous again: the old cart went with the session.
    let count: Value = server
        .client
        .get(server.url("/cart/count"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(count, json!({ "count": 0 }));

    server
        .client
        .post(server.url("/cart/add"))
        .json(&json!({ "product_id": added_later.id, "quantity": 2 }))
        .send()
        .await
        .unwrap();

    let resp = server
        .client
        .post(server.url("/auth/login"))
        .json(&json!({ "email": email, "password": TEST_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let cart: Value = server
        .client
        .get(server.url("/cart"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cart["item_count"], 3);
    assert_eq!(cart["lines"].as_array().unwrap().len(), 2);
    assert_eq!(decimal_text(&cart["total"]), "11.00");
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_checkout_and_payment_over_http() {
    let pool = test_pool().await;
    let customer = create_user(&pool, UserRole::Customer).await;
    let category = create_category(&pool).await;
    let mug = create_product(&pool, category.id, "19.99", 3).await;
    let server = spawn_storefront(pool.clone()).await;

    let resp = server
        .client
        .post(server.url("/auth/login"))
        .json(&json!({ "email": customer.email, "password": TEST_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Asking for more than exists adds only what is in stock.
    let added: Value = server
        .client
        .post(server.url("/cart/add"))
        .json(&json!({ "product_id": mug.id, "quantity": 5 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(added["added"], 3);

    let resp = server
        .client
        .post(server.url("/cart/update"))
        .json(&json!({ "product_id": mug.id, "quantity": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = server
        .client
        .post(server.url("/checkout"))
        .json(&json!({ "notes": "Leave at the door" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let order: Value = resp.json().await.unwrap();
    assert_eq!(decimal_text(&order["total_price"]), "39.98");
    assert_eq!(order["status"], "pending");
    assert_eq!(order["shipping_address"], "1 Test Street");
    assert_eq!(stock_of(&pool, &mug).await, 1);

    let count: Value = server
        .client
        .get(server.url("/cart/count"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(count, json!({ "count": 0 }));

    let id = order["id"].as_i64().unwrap();
    let detail: Value = server
        .client
        .get(server.url(&format!("/orders/{id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["items"][0]["quantity"], 2);

    let paid: Value = server
        .client
        .post(server.url(&format!("/orders/{id}/pay")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(paid["status"], "paid");

    let resp = server
        .client
        .post(server.url(&format!("/orders/{id}/pay")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Order already processed.");

    // Someone else's order does not exist for this customer.
    let stranger = server.new_client();
    stranger
        .post(server.url("/auth/login"))
        .json(&json!({
            "email": create_user(&pool, UserRole::Customer).await.email,
            "password": TEST_PASSWORD,
        }))
        .send()
        .await
        .unwrap();
    let resp = stranger
        .get(server.url(&format!("/orders/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_empty_checkout_and_shortage_responses() {
    let pool = test_pool().await;
    let customer = create_user(&pool, UserRole::Customer).await;
    let category = create_category(&pool).await;
    let scarce = create_product(&pool, category.id, "3.00", 2).await;
    let server = spawn_storefront(pool.clone()).await;

    server
        .client
        .post(server.url("/auth/login"))
        .json(&json!({ "email": customer.email, "password": TEST_PASSWORD }))
        .send()
        .await
        .unwrap();

    let resp = server
        .client
        .post(server.url("/checkout"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    server
        .client
        .post(server.url("/cart/add"))
        .json(&json!({ "product_id": scarce.id, "quantity": 2 }))
        .send()
        .await
        .unwrap();

    // Someone else buys one unit in the meantime.
    ProductRepository::new(&pool)
        .update(
            scarce.id,
            &ProductInput {
                category_id: category.id,
                name: scarce.name.clone(),
                description: scarce.description.clone(),
                short_description: String::new(),
                price: scarce.price,
                stock: 1,
                featured: false,
                image: None,
            },
        )
        .await
        .unwrap();

    let resp = server
        .client
        .post(server.url("/checkout"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["shortages"][0]["available"], 1);
    assert_eq!(body["shortages"][0]["requested"], 2);

    // The cart is kept so the shopper can adjust it.
    let count: Value = server
        .client
        .get(server.url("/cart/count"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(count, json!({ "count": 2 }));
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_checkout_rejects_bad_phone_without_writing() {
    let pool = test_pool().await;
    let customer = create_user(&pool, UserRole::Customer).await;
    let category = create_category(&pool).await;
    let product = create_product(&pool, category.id, "19.99", 5).await;
    let server = spawn_storefront(pool.clone()).await;

    server
        .client
        .post(server.url("/auth/login"))
        .json(&json!({ "email": customer.email, "password": TEST_PASSWORD }))
        .send()
        .await
        .unwrap();
    server
        .client
        .post(server.url("/cart/add"))
        .json(&json!({ "product_id": product.id, "quantity": 2 }))
        .send()
        .await
        .unwrap();

    for phone in ["+1 555 0100 0100 0100 0100 0100", "call me maybe"] {
        let resp = server
            .client
            .post(server.url("/checkout"))
            .json(&json!({ "phone": phone }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{phone}");
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("phone"));
    }

    assert_eq!(stock_of(&pool, &product).await, 5);
    let orders: Value = server
        .client
        .get(server.url("/orders"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(orders.as_array().map(Vec::len), Some(0));

    let resp = server
        .client
        .post(server.url("/checkout"))
        .json(&json!({ "phone": "+1 555 0199" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let order: Value = resp.json().await.unwrap();
    assert_eq!(order["phone"], "+1 555 0199");
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_admin_roles() {
    let pool = test_pool().await;
    let viewer = create_user(&pool, UserRole::Viewer).await;
    let admin = create_user(&pool, UserRole::Admin).await;
    let customer = create_user(&pool, UserRole::Customer).await;
    let server = spawn_admin(pool).await;

    let resp = server
        .new_client()
        .post(server.url("/auth/login"))
        .json(&json!({ "email": customer.email, "password": TEST_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let viewer_client = server.new_client();
    let resp = viewer_client
        .post(server.url("/auth/login"))
        .json(&json!({ "email": viewer.email, "password": TEST_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = viewer_client
        .get(server.url("/orders?status=pending"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = viewer_client
        .post(server.url("/categories"))
        .json(&json!({ "name": unique("Viewer Category") }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let admin_client = server.new_client();
    admin_client
        .post(server.url("/auth/login"))
        .json(&json!({ "email": admin.email, "password": TEST_PASSWORD }))
        .send()
        .await
        .unwrap();

    let resp = admin_client
        .post(server.url("/categories"))
        .json(&json!({ "name": unique("Admin Category") }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let category: Value = resp.json().await.unwrap();

    let resp = admin_client
        .post(server.url("/products"))
        .json(&json!({
            "category_id": category["id"],
            "name": unique("Admin Product"),
            "price": "19.99",
            "stock": 3,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = admin_client
        .post(server.url("/products"))
        .json(&json!({
            "category_id": category["id"],
            "name": "!!!",
            "price": "1.00",
            "stock": 1,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = admin_client
        .get(server.url("/orders?status=lost"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = admin_client
        .delete(server.url(&format!("/users/{}", admin.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}
