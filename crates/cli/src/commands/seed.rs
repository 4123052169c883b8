//! Demo catalog.
//!
//! Categories and products are matched on slug, so running the command
//! twice leaves the catalog as it was after the first run.

use bazaar_core::{Price, PriceError, Slug, SlugError};
use bazaar_storefront::db::categories::CategoryInput;
use bazaar_storefront::db::products::ProductInput;
use bazaar_storefront::db::{CategoryRepository, ProductRepository, RepositoryError};
use sqlx::PgPool;
use thiserror::Error;

use super::{ConnectError, connect};

/// Errors from seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Bad seed slug: {0}")]
    Slug(#[from] SlugError),

    #[error("Bad seed price: {0}")]
    Price(#[from] PriceError),
}

struct SeedCategory {
    name: &'static str,
    description: &'static str,
    products: &'static [SeedProduct],
}

struct SeedProduct {
    name: &'static str,
    short_description: &'static str,
    price: &'static str,
    stock: u32,
    featured: bool,
}

const CATALOG: &[SeedCategory] = &[
    SeedCategory {
        name: "Kitchen",
        description: "Mugs, pots and everything for the morning brew.",
        products: &[
            SeedProduct {
                name: "Stoneware Mug",
                short_description: "Hand-glazed, 350 ml.",
                price: "19.99",
                stock: 24,
                featured: true,
            },
            SeedProduct {
                name: "Pour-Over Kettle",
                short_description: "Gooseneck spout, 1 l.",
                price: "54.00",
                stock: 8,
                featured: false,
            },
            SeedProduct {
                name: "Loose Leaf Tea Tin",
                short_description: "Airtight, holds 100 g.",
                price: "12.50",
                stock: 40,
                featured: false,
            },
        ],
    },
    SeedCategory {
        name: "Stationery",
        description: "Paper goods for lists, letters and sketches.",
        products: &[
            SeedProduct {
                name: "Dotted Notebook",
                short_description: "A5, 160 pages.",
                price: "14.00",
                stock: 60,
                featured: true,
            },
            SeedProduct {
                name: "Brass Pen",
                short_description: "Refillable, fine tip.",
                price: "32.00",
                stock: 3,
                featured: true,
            },
            SeedProduct {
                name: "Letterpress Cards",
                short_description: "Set of six with envelopes.",
                price: "18.75",
                stock: 0,
                featured: false,
            },
        ],
    },
];

/// Load the demo catalog.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a write fails.
pub async fn run() -> Result<(), SeedError> {
    let pool = connect().await?;
    let (categories, products) = seed(&pool).await?;
    tracing::info!(categories, products, "Seed complete");
    Ok(())
}

/// Insert whatever is missing. Returns how many categories and products were created.
async fn seed(pool: &PgPool) -> Result<(usize, usize), SeedError> {
    let category_repo = CategoryRepository::new(pool);
    let product_repo = ProductRepository::new(pool);
    let mut created = (0, 0);

    for seed_category in CATALOG {
        let slug = Slug::from_name(seed_category.name)?;
        let category = if let Some(existing) = category_repo.get_by_slug(&slug).await? {
            existing
        } else {
            created.0 += 1;
            category_repo
                .create(
                    &CategoryInput {
                        name: seed_category.name.to_owned(),
                        description: seed_category.description.to_owned(),
                        image: None,
                    },
                    &slug,
                )
                .await?
        };

        for seed_product in seed_category.products {
            let slug = Slug::from_name(seed_product.name)?;
            if product_repo.get_by_slug(slug.as_str()).await?.is_some() {
                continue;
            }
            let input = ProductInput {
                category_id: category.id,
                name: seed_product.name.to_owned(),
                description: format!("{} {}", seed_product.short_description, category.description),
                short_description: seed_product.short_description.to_owned(),
                price: Price::parse(seed_product.price)?,
                stock: seed_product.stock,
                featured: seed_product.featured,
                image: None,
            };
            product_repo.create(&input, &slug).await?;
            created.1 += 1;
        }
    }

    Ok(created)
}
