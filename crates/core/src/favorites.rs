//! Favorite products.
//!
//! An ordered list, unique by product. Adding a product that is already a
//! favorite keeps the original entry; removing one that is not is a no-op.

use serde::{Deserialize, Serialize};

use crate::types::{Money, ProductId};

/// Snapshot of a product the customer marked as a favorite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteProduct {
    pub product_id: ProductId,
    pub name: String,
    pub price: Money,
    pub image: String,
}

/// The customer's favorites, in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Favorites(Vec<FavoriteProduct>);

impl Favorites {
    /// An empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Append `product` unless it is already present; returns whether it was added.
    pub fn add(&mut self, product: FavoriteProduct) -> bool {
        if self.contains(product.product_id) {
            return false;
        }
        self.0.push(product);
        true
    }

    /// Remove `product_id`; returns whether it was present.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.0.len();
        self.0.retain(|p| p.product_id != product_id);
        self.0.len() != before
    }

    /// Replace the whole list, dropping later duplicates.
    pub fn set(&mut self, products: impl IntoIterator<Item = FavoriteProduct>) {
        self.0.clear();
        for product in products {
            self.add(product);
        }
    }

    /// Whether `product_id` is a favorite.
    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.0.iter().any(|p| p.product_id == product_id)
    }

    /// Favorites in insertion order.
    #[must_use]
    pub fn products(&self) -> &[FavoriteProduct] {
        &self.0
    }

    /// Number of favorites.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no favorites.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fav(id: i32) -> FavoriteProduct {
        FavoriteProduct {
            product_id: ProductId::new(id),
            name: format!("Product {id}"),
            price: Money::from_cents(1_250),
            image: String::new(),
        }
    }

    #[test]
    fn test_add_is_unique() {
        let mut favorites = Favorites::new();
        assert!(favorites.add(fav(1)));
        assert!(!favorites.add(fav(1)));
        assert!(favorites.add(fav(2)));
        assert_eq!(favorites.len(), 2);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut favorites = Favorites::new();
        favorites.add(fav(1));
        assert!(!favorites.remove(ProductId::new(3)));
        assert!(favorites.remove(ProductId::new(1)));
        assert!(favorites.is_empty());
    }

    #[test]
    fn test_set_deduplicates() {
        let mut favorites = Favorites::new();
        favorites.add(fav(9));
        favorites.set([fav(1), fav(2), fav(1)]);
        let ids: Vec<i32> = favorites
            .products()
            .iter()
            .map(|p| p.product_id.as_i32())
            .collect();
        assert_eq!(ids, [1, 2]);
    }

    #[test]
    fn test_serializes_as_array() {
        let mut favorites = Favorites::new();
        favorites.add(fav(1));
        let json = serde_json::to_value(&favorites).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["price"], "12.50");
    }
}
