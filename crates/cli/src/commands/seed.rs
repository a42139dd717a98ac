//! Seed the catalog with demo categories and products.
//!
//! Products are created through the same repository the admin API uses, so
//! any `initial_stock` lands as a `purchase` movement attributed to the
//! oldest admin account. Re-running is safe: existing slugs and SKUs are
//! skipped.

use std::path::Path;

use serde::Deserialize;
use solarshop_core::{UserId, UserRole};
use solarshop_server::db::{ProductRepository, RepositoryError, UserRepository};
use solarshop_server::models::catalog::{Category, CategoryInput, NewProduct, slugify};
use solarshop_server::models::user::UserFilter;
use tracing::{info, warn};

use super::connect;

/// Top-level layout of the seed file.
#[derive(Debug, Deserialize)]
pub struct CatalogSeed {
    pub categories: Vec<CategorySeed>,
}

#[derive(Debug, Deserialize)]
pub struct CategorySeed {
    #[serde(flatten)]
    pub category: CategoryInput,
    #[serde(default)]
    pub products: Vec<NewProduct>,
}

/// Load a catalog file and insert whatever is missing.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, no admin exists,
/// or a database operation fails for a reason other than a duplicate.
pub async fn catalog(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog seed");
    let content = tokio::fs::read_to_string(path).await?;
    let seed: CatalogSeed = serde_yaml::from_str(&content)?;
    info!(categories = seed.categories.len(), "Parsed seed file");

    let pool = connect().await?;
    let admin_id = oldest_admin(&UserRepository::new(&pool))
        .await?
        .ok_or("No admin user found; run `ss-cli admin create` first")?;

    let products = ProductRepository::new(&pool);
    let mut existing = products.list_categories().await?;
    let mut created = 0_usize;
    let mut skipped = 0_usize;

    for entry in seed.categories {
        let category = ensure_category(&products, &mut existing, &entry.category).await?;

        for mut product in entry.products {
            product.category_id = Some(category.id);
            let slug = product
                .slug
                .as_deref()
                .map_or_else(|| slugify(&product.name), slugify);

            match products.create(&product, &slug, admin_id).await {
                Ok(p) => {
                    info!(sku = %p.sku, stock = p.stock_quantity, "Created {}", p.name);
                    created += 1;
                }
                Err(RepositoryError::Conflict(_)) => {
                    warn!(sku = %product.sku, "Skipping existing product");
                    skipped += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    info!(created, skipped, "Seeding complete");
    Ok(())
}

async fn oldest_admin(users: &UserRepository<'_>) -> Result<Option<UserId>, RepositoryError> {
    let filter = UserFilter {
        role: Some(UserRole::Admin),
        per_page: Some(100),
        ..UserFilter::default()
    };
    let (admins, _) = users.list(&filter).await?;
    Ok(admins.last().map(|u| u.id))
}

async fn ensure_category(
    products: &ProductRepository<'_>,
    existing: &mut Vec<Category>,
    input: &CategoryInput,
) -> Result<Category, RepositoryError> {
    let slug = input
        .slug
        .as_deref()
        .map_or_else(|| slugify(&input.name), slugify);

    if let Some(found) = existing.iter().find(|c| c.slug == slug) {
        return Ok(found.clone());
    }

    let category = products.create_category(input, &slug).await?;
    info!(slug = %category.slug, "Created category");
    existing.push(category.clone());
    Ok(category)
}
