//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! categories:
//!   - name: Shoes
//!     products:
//!       - name: Trail Runner
//!         brand: Acme
//!         description: Grippy and light.
//!         price: "89.99"
//!         quantity: 40
//!         count_in_stock: 12
//!         image: /uploads/trail-runner.png
//! ```
//!
//! Categories that already exist are reused; products are always inserted.

use std::path::Path;

use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;

use bazaar_core::{CategoryId, Money};
use bazaar_storefront::db::{CategoryRepository, ProductRepository, RepositoryError};
use bazaar_storefront::models::ProductInput;
use bazaar_storefront::models::category::normalize_category_name;

use super::{CommandError, connect};

/// Top-level seed document.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub categories: Vec<SeedCategory>,
}

/// A category and the products filed under it.
#[derive(Debug, Deserialize)]
pub struct SeedCategory {
    pub name: String,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
}

/// One product to insert.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    pub brand: String,
    pub description: String,
    pub price: Money,
    pub quantity: i32,
    #[serde(default)]
    pub count_in_stock: i32,
    #[serde(default)]
    pub image: String,
}

impl SeedProduct {
    fn into_input(self, category_id: CategoryId) -> ProductInput {
        ProductInput {
            name: self.name,
            image: self.image,
            brand: self.brand,
            quantity: self.quantity,
            category_id,
            description: self.description,
            price: self.price,
            count_in_stock: self.count_in_stock,
        }
    }
}

/// Parse and validate a seed document without touching the database.
///
/// # Errors
///
/// Returns `CommandError::Yaml` for malformed YAML and
/// `CommandError::InvalidSeed` naming the first invalid entry.
pub fn parse(content: &str) -> Result<SeedFile, CommandError> {
    let file: SeedFile = serde_yaml::from_str(content)?;
    for category in &file.categories {
        normalize_category_name(&category.name)
            .map_err(|e| CommandError::InvalidSeed(format!("category {:?}: {e}", category.name)))?;
        for product in &category.products {
            let input = product.clone().into_input(CategoryId::new(0));
            input
                .validate()
                .map_err(|e| CommandError::InvalidSeed(format!("product {:?}: {e}", product.name)))?;
        }
    }
    Ok(file)
}

/// Find a category by name, creating it if missing.
async fn ensure_category(pool: &PgPool, name: &str) -> Result<CategoryId, CommandError> {
    let categories = CategoryRepository::new(pool);
    match categories.create(name).await {
        Ok(category) => Ok(category.id),
        Err(RepositoryError::Conflict(_)) => categories
            .list()
            .await?
            .into_iter()
            .find(|c| c.name == name)
            .map(|c| c.id)
            .ok_or_else(|| CommandError::InvalidSeed(format!("category {name:?} vanished"))),
        Err(e) => Err(e.into()),
    }
}

/// Seed categories and products from `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or validated, or a database
/// operation fails.
pub async fn catalog(file_path: &str) -> Result<(), CommandError> {
    let path = Path::new(file_path);
    info!(path = %file_path, "Loading catalog from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let file = parse(&content)?;
    info!(categories = file.categories.len(), "Seed file validated");

    let pool = connect().await?;
    let products = ProductRepository::new(&pool);

    let mut inserted = 0_usize;
    for category in file.categories {
        let name = normalize_category_name(&category.name).map_err(CommandError::InvalidSeed)?;
        let category_id = ensure_category(&pool, &name).await?;
        for product in category.products {
            products.create(&product.into_input(category_id)).await?;
            inserted += 1;
        }
    }

    info!("Seeding complete!");
    info!("  Products inserted: {inserted}");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_catalog() {
        let file = parse(
            r#"
categories:
  - name: "  Shoes "
    products:
      - name: Trail Runner
        brand: Acme
        description: Grippy and light.
        price: "89.99"
        quantity: 40
"#,
        )
        .unwrap();
        assert_eq!(file.categories.len(), 1);
        let product = &file.categories[0].products[0];
        assert_eq!(product.price, Money::from_cents(8999));
        assert_eq!(product.count_in_stock, 0);
    }

    #[test]
    fn test_parse_rejects_negative_price() {
        let err = parse(
            r#"
categories:
  - name: Shoes
    products:
      - name: Trail Runner
        brand: Acme
        description: x
        price: "-1.00"
        quantity: 1
"#,
        )
        .unwrap_err();
        assert!(matches!(err, CommandError::InvalidSeed(_)));
    }

    #[test]
    fn test_parse_rejects_blank_category() {
        let err = parse("categories:\n  - name: \"  \"\n").unwrap_err();
        assert!(matches!(err, CommandError::InvalidSeed(_)));
    }
}
