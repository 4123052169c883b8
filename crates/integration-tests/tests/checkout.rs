//! Order placement against a real database.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use bazaar_core::{Cart, OrderStatus, Price, ProductId, UserId, UserRole};
use bazaar_integration_tests::{
    create_category, create_product, create_user, offline_pool, stock_of, test_pool,
};
use bazaar_storefront::db::orders::ShippingDetails;
use bazaar_storefront::db::{OrderRepository, ProductRepository, RepositoryError};
use bazaar_storefront::services::checkout::{CheckoutError, place_order};

fn shipping() -> ShippingDetails {
    ShippingDetails {
        shipping_address: "1 Test Street".to_owned(),
        phone: "+1 555 0100".to_owned(),
        notes: String::new(),
    }
}

fn cart_of(lines: &[(ProductId, u32)]) -> Cart {
    let mut cart = Cart::new();
    for &(id, quantity) in lines {
        cart.add(id, quantity).unwrap();
    }
    cart
}

#[tokio::test]
async fn test_empty_cart_is_rejected_before_touching_the_database() {
    let pool = offline_pool();
    let err = place_order(&pool, UserId::new(1), &Cart::new(), &shipping())
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::EmptyCart));
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_order_total_and_stock() {
    let pool = test_pool().await;
    let user = create_user(&pool, UserRole::Customer).await;
    let category = create_category(&pool).await;
    let mug = create_product(&pool, category.id, "19.99", 5).await;

    let order = place_order(&pool, user.id, &cart_of(&[(mug.id, 2)]), &shipping())
        .await
        .unwrap();

    assert_eq!(order.total_price, "39.98".parse().unwrap());
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.shipping_address, "1 Test Street");
    assert_eq!(stock_of(&pool, &mug).await, 3);

    let stored = OrderRepository::new(&pool).get(order.id).await.unwrap().unwrap();
    assert_eq!(stored.items.len(), 1);
    assert_eq!(stored.items[0].quantity, 2);
    assert_eq!(stored.items[0].price_at_purchase, Price::parse("19.99").unwrap());
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_concurrent_checkouts_sell_the_last_unit_once() {
    const BUYERS: usize = 8;

    let pool = test_pool().await;
    let category = create_category(&pool).await;
    let last = create_product(&pool, category.id, "5.00", 1).await;
    let cart = cart_of(&[(last.id, 1)]);

    let mut buyers = Vec::with_capacity(BUYERS);
    for _ in 0..BUYERS {
        buyers.push(create_user(&pool, UserRole::Customer).await);
    }

    let tasks: Vec<_> = buyers
        .into_iter()
        .map(|buyer| {
            let pool = pool.clone();
            let cart = cart.clone();
            tokio::spawn(async move { place_order(&pool, buyer.id, &cart, &shipping()).await })
        })
        .collect();

    let mut placed = 0;
    let mut short = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => placed += 1,
            Err(CheckoutError::InsufficientStock(shortages)) => {
                assert_eq!(shortages[0].available, 0);
                short += 1;
            }
            Err(e) => panic!("unexpected checkout error: {e}"),
        }
    }

    assert_eq!(placed, 1);
    assert_eq!(short, BUYERS - 1);
    assert_eq!(stock_of(&pool, &last).await, 0);
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_oversized_total_is_refused_without_writing() {
    let pool = test_pool().await;
    let user = create_user(&pool, UserRole::Customer).await;
    let category = create_category(&pool).await;
    let pricey = create_product(&pool, category.id, "99999999.99", 1_000).await;

    let err = place_order(&pool, user.id, &cart_of(&[(pricey.id, 200)]), &shipping())
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::TotalTooLarge { .. }));
    assert_eq!(stock_of(&pool, &pricey).await, 1_000);
    assert!(
        OrderRepository::new(&pool)
            .list_for_user(user.id)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_checkout_is_all_or_nothing() {
    let pool = test_pool().await;
    let user = create_user(&pool, UserRole::Customer).await;
    let category = create_category(&pool).await;
    let plenty = create_product(&pool, category.id, "2.00", 10).await;
    let scarce = create_product(&pool, category.id, "3.00", 1).await;

    let err = place_order(
        &pool,
        user.id,
        &cart_of(&[(plenty.id, 4), (scarce.id, 2)]),
        &shipping(),
    )
    .await
    .unwrap_err();

    let CheckoutError::InsufficientStock(shortages) = err else {
        panic!("expected a stock shortage");
    };
    assert_eq!(shortages.len(), 1);
    assert_eq!(shortages[0].product_id, scarce.id);
    assert_eq!(shortages[0].available, 1);

    assert_eq!(stock_of(&pool, &plenty).await, 10);
    assert_eq!(stock_of(&pool, &scarce).await, 1);
    assert!(
        OrderRepository::new(&pool)
            .list_for_user(user.id)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_order_keeps_price_at_purchase() {
    let pool = test_pool().await;
    let user = create_user(&pool, UserRole::Customer).await;
    let category = create_category(&pool).await;
    let tea = create_product(&pool, category.id, "12.50", 5).await;

    let order = place_order(&pool, user.id, &cart_of(&[(tea.id, 1)]), &shipping())
        .await
        .unwrap();

    ProductRepository::new(&pool)
        .set_price(tea.id, Price::parse("99.00").unwrap())
        .await
        .unwrap();

    let stored = OrderRepository::new(&pool).get(order.id).await.unwrap().unwrap();
    assert_eq!(stored.order.total_price, "12.50".parse().unwrap());
    assert_eq!(stored.items[0].price_at_purchase, Price::parse("12.50").unwrap());
    assert_eq!(stored.items[0].product_slug, tea.slug.as_str());
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_status_machine_is_enforced() {
    let pool = test_pool().await;
    let user = create_user(&pool, UserRole::Customer).await;
    let stranger = create_user(&pool, UserRole::Customer).await;
    let category = create_category(&pool).await;
    let mug = create_product(&pool, category.id, "4.00", 5).await;
    let order = place_order(&pool, user.id, &cart_of(&[(mug.id, 1)]), &shipping())
        .await
        .unwrap();
    let orders = OrderRepository::new(&pool);

    assert!(matches!(
        orders.transition(order.id, Some(stranger.id), OrderStatus::Paid).await,
        Err(RepositoryError::NotFound)
    ));
    assert!(matches!(
        orders.transition(order.id, None, OrderStatus::Shipped).await,
        Err(RepositoryError::Conflict(_))
    ));

    let paid = orders
        .transition(order.id, Some(user.id), OrderStatus::Paid)
        .await
        .unwrap();
    assert_eq!(paid.status, OrderStatus::Paid);
    assert!(orders.transition(order.id, Some(user.id), OrderStatus::Paid).await.is_err());
}
