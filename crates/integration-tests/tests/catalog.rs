//! Catalog integrity rules.

#![allow(clippy::unwrap_used)]

use bazaar_core::{Cart, Slug, SlugError, UserRole};
use bazaar_integration_tests::{
    create_category, create_product, create_user, test_pool, unique,
};
use bazaar_storefront::db::orders::ShippingDetails;
use bazaar_storefront::db::products::ProductInput;
use bazaar_storefront::db::{CategoryRepository, ProductRepository, RepositoryError};
use bazaar_storefront::services::checkout::place_order;

#[test]
fn test_names_without_slug_characters_have_no_slug() {
    assert!(matches!(Slug::from_name("!!!"), Err(SlugError::Empty)));
    assert!(matches!(Slug::from_name("日本語"), Err(SlugError::Empty)));
    assert_eq!(Slug::from_name("Ñandú Plush").unwrap().as_str(), "nandu-plush");
    assert!(Slug::explicit_or_derived(Some("  "), "Blue Mug").is_ok());
    assert!(Slug::explicit_or_derived(Some("Not A Slug"), "Blue Mug").is_err());
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_database_refuses_empty_slugs() {
    let pool = test_pool().await;
    let category = create_category(&pool).await;
    let name = unique("Sluggish");

    let err = sqlx::query("INSERT INTO shop.category (name, slug) VALUES ($1, '')")
        .bind(&name)
        .execute(&pool)
        .await
        .unwrap_err();
    assert!(matches!(
        RepositoryError::from_write(err, "slug"),
        RepositoryError::Conflict(_)
    ));

    let err = sqlx::query(
        "INSERT INTO shop.product (category_id, name, slug, price, stock) \
         VALUES ($1, $2, '', 1.00, 1)",
    )
    .bind(category.id.as_i32())
    .bind(&name)
    .execute(&pool)
    .await
    .unwrap_err();
    assert!(matches!(
        RepositoryError::from_write(err, "slug"),
        RepositoryError::Conflict(_)
    ));

    let written: i64 = sqlx::query_scalar(
        "SELECT (SELECT COUNT(*) FROM shop.category WHERE name = $1) \
              + (SELECT COUNT(*) FROM shop.product WHERE name = $1)",
    )
    .bind(&name)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(written, 0);
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_product_with_order_history_cannot_be_deleted() {
    let pool = test_pool().await;
    let user = create_user(&pool, UserRole::Customer).await;
    let category = create_category(&pool).await;
    let sold = create_product(&pool, category.id, "8.00", 4).await;

    let mut cart = Cart::new();
    cart.add(sold.id, 1).unwrap();
    place_order(&pool, user.id, &cart, &ShippingDetails::default())
        .await
        .unwrap();

    let products = ProductRepository::new(&pool);
    assert!(matches!(
        products.delete(sold.id).await,
        Err(RepositoryError::Protected(_))
    ));
    assert!(products.get(sold.id).await.unwrap().is_some());

    assert!(matches!(
        CategoryRepository::new(&pool).delete(category.id).await,
        Err(RepositoryError::Protected(_))
    ));
    assert!(
        CategoryRepository::new(&pool)
            .get(category.id)
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_unsold_product_and_category_delete() {
    let pool = test_pool().await;
    let category = create_category(&pool).await;
    let product = create_product(&pool, category.id, "1.00", 1).await;

    let products = ProductRepository::new(&pool);
    products.delete(product.id).await.unwrap();
    assert!(products.get(product.id).await.unwrap().is_none());
    assert!(matches!(
        products.delete(product.id).await,
        Err(RepositoryError::NotFound)
    ));

    CategoryRepository::new(&pool).delete(category.id).await.unwrap();
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_duplicate_slug_conflicts() {
    let pool = test_pool().await;
    let category = create_category(&pool).await;
    let existing = create_product(&pool, category.id, "3.00", 2).await;

    let err = ProductRepository::new(&pool)
        .create(
            &ProductInput {
                category_id: category.id,
                name: "Another name".to_owned(),
                description: String::new(),
                short_description: String::new(),
                price: existing.price,
                stock: 1,
                featured: false,
                image: None,
            },
            &existing.slug,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_edit_keeps_slug() {
    let pool = test_pool().await;
    let category = create_category(&pool).await;
    let product = create_product(&pool, category.id, "3.00", 2).await;

    let edited = ProductRepository::new(&pool)
        .update(
            product.id,
            &ProductInput {
                category_id: category.id,
                name: "Renamed".to_owned(),
                description: product.description.clone(),
                short_description: String::new(),
                price: product.price,
                stock: 7,
                featured: true,
                image: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(edited.name, "Renamed");
    assert_eq!(edited.slug, product.slug);
    assert_eq!(edited.stock, 7);
}
