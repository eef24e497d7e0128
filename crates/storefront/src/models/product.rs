//! Catalog products and their reviews.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bazaar_core::order::CatalogEntry;
use bazaar_core::pricing::MAX_AMOUNT;
use bazaar_core::{CategoryId, Money, ProductId, ReviewId, UserId};

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub image: String,
    pub brand: String,
    pub quantity: i32,
    pub category_id: CategoryId,
    pub description: String,
    /// Mean review rating, 0 when there are no reviews.
    pub rating: f64,
    pub num_reviews: i32,
    pub price: Money,
    pub count_in_stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// The pricing view used at checkout.
    #[must_use]
    pub fn catalog_entry(&self) -> CatalogEntry {
        CatalogEntry {
            product_id: self.id,
            name: self.name.clone(),
            image: self.image.clone(),
            unit_price: self.price,
        }
    }
}

/// A product joined with its category name.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ProductWithCategory {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub product: Product,
    pub category_name: String,
}

/// A customer review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    /// Reviewer's username at the time of writing.
    pub name: String,
    pub rating: i16,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Fields an admin submits to create or update a product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub image: String,
    pub brand: String,
    pub quantity: i32,
    pub category_id: CategoryId,
    pub description: String,
    pub price: Money,
    #[serde(default)]
    pub count_in_stock: i32,
}

impl ProductInput {
    /// Check required fields.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        let required = [
            ("Name", &self.name),
            ("Brand", &self.brand),
            ("Description", &self.description),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(format!("{field} is required"));
        }
        if self.price.is_negative() {
            return Err("Price must not be negative".to_owned());
        }
        if self.price.amount() > MAX_AMOUNT {
            return Err(format!("Price must not exceed {MAX_AMOUNT}"));
        }
        if self.quantity < 0 {
            return Err("Quantity must not be negative".to_owned());
        }
        if self.count_in_stock < 0 {
            return Err("Count in stock must not be negative".to_owned());
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> ProductInput {
        serde_json::from_value(serde_json::json!({
            "name": "Trail Shoe",
            "brand": "Acme",
            "quantity": 10,
            "category_id": 1,
            "description": "Grippy",
            "price": "89.90",
            "count_in_stock": 4
        }))
        .unwrap()
    }

    #[test]
    fn test_valid_input() {
        let input = input();
        assert_eq!(input.validate(), Ok(()));
        assert_eq!(input.price.to_string(), "89.90");
        assert!(input.image.is_empty());
    }

    #[test]
    fn test_blank_brand() {
        let mut input = input();
        input.brand = " ".to_owned();
        assert_eq!(input.validate(), Err("Brand is required".to_owned()));
    }

    #[test]
    fn test_negative_price() {
        let mut input = input();
        input.price = Money::from_cents(-1);
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_price_above_storable_maximum() {
        let mut input = input();
        input.price = Money::from_cents(1_000_000_000_000);
        assert_eq!(
            input.validate(),
            Err("Price must not exceed 9999999999.99".to_owned())
        );

        input.price = Money::from_cents(999_999_999_999);
        assert_eq!(input.validate(), Ok(()));
    }

    #[test]
    fn test_non_numeric_price_rejected_at_parse() {
        let result: Result<ProductInput, _> = serde_json::from_value(serde_json::json!({
            "name": "X", "brand": "Y", "quantity": 1, "category_id": 1,
            "description": "Z", "price": "cheap"
        }));
        assert!(result.is_err());
    }
}
