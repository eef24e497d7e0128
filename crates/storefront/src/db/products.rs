//! Product and review repository.
//!
//! [`ProductRepository`] is also the checkout [`Catalog`]: order lines are
//! priced from these rows, never from the client.

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use bazaar_core::order::{Catalog, CatalogEntry};
use bazaar_core::{CategoryId, Money, ProductId, UserId};

use super::RepositoryError;
use crate::models::{Product, ProductInput, ProductWithCategory, Review};

const PRODUCT_COLUMNS: &str = "p.id, p.name, p.image, p.brand, p.quantity, p.category_id, \
     p.description, p.rating, p.num_reviews, p.price, p.count_in_stock, \
     p.created_at, p.updated_at";

/// One page of a product search.
#[derive(Debug)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: i64,
}

/// Repository for product database operations.
#[derive(Clone, Copy)]
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Case-insensitive substring search on the name, one page at a time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        keyword: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<ProductPage, RepositoryError> {
        let pattern = keyword
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(|k| format!("%{}%", escape_like(k)));

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM bazaar.products p WHERE ($1::text IS NULL OR p.name ILIKE $1)",
        )
        .bind(pattern.as_deref())
        .fetch_one(self.pool)
        .await?;

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM bazaar.products p \
             WHERE ($1::text IS NULL OR p.name ILIKE $1) \
             ORDER BY p.id LIMIT $2 OFFSET $3"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(pattern.as_deref())
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool)
            .await?;

        Ok(ProductPage { products, total })
    }

    /// Newest products with their category names.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_with_category(
        &self,
        limit: i64,
    ) -> Result<Vec<ProductWithCategory>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS}, c.name AS category_name \
             FROM bazaar.products p JOIN bazaar.categories c ON c.id = p.category_id \
             ORDER BY p.created_at DESC, p.id DESC LIMIT $1"
        );
        let products = sqlx::query_as::<_, ProductWithCategory>(&sql)
            .bind(limit)
            .fetch_all(self.pool)
            .await?;
        Ok(products)
    }

    /// Highest rated products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn top_rated(&self, limit: i64) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM bazaar.products p \
             ORDER BY p.rating DESC, p.num_reviews DESC, p.id LIMIT $1"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(self.pool)
            .await?;
        Ok(products)
    }

    /// Most recently added products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn newest(&self, limit: i64) -> Result<Vec<Product>, RepositoryError> {
        let sql =
            format!("SELECT {PRODUCT_COLUMNS} FROM bazaar.products p ORDER BY p.id DESC LIMIT $1");
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(self.pool)
            .await?;
        Ok(products)
    }

    /// Products in any of `categories` (all if empty) within an optional
    /// inclusive price range.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn filter(
        &self,
        categories: &[CategoryId],
        price_range: Option<(Decimal, Decimal)>,
    ) -> Result<Vec<Product>, RepositoryError> {
        let category_ids: Vec<i32> = categories.iter().map(CategoryId::as_i32).collect();
        let (min, max) = price_range.unzip();
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM bazaar.products p \
             WHERE (cardinality($1::int4[]) = 0 OR p.category_id = ANY($1)) \
               AND ($2::numeric IS NULL OR p.price >= $2) \
               AND ($3::numeric IS NULL OR p.price <= $3) \
             ORDER BY p.id"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(&category_ids)
            .bind(min)
            .bind(max)
            .fetch_all(self.pool)
            .await?;
        Ok(products)
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM bazaar.products p WHERE p.id = $1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(product)
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the category doesn't exist.
    pub async fn create(&self, input: &ProductInput) -> Result<Product, RepositoryError> {
        let sql = format!(
            "INSERT INTO bazaar.products AS p \
                (name, image, brand, quantity, category_id, description, price, count_in_stock) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {PRODUCT_COLUMNS}"
        );
        sqlx::query_as::<_, Product>(&sql)
            .bind(input.name.trim())
            .bind(&input.image)
            .bind(input.brand.trim())
            .bind(input.quantity)
            .bind(input.category_id)
            .bind(input.description.trim())
            .bind(input.price)
            .bind(input.count_in_stock)
            .fetch_one(self.pool)
            .await
            .map_err(|e| RepositoryError::from_constraint(e, "unknown category"))
    }

    /// Replace a product's editable fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if it doesn't exist and
    /// `RepositoryError::Conflict` if the category doesn't exist.
    pub async fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        let sql = format!(
            "UPDATE bazaar.products AS p SET \
                name = $2, image = $3, brand = $4, quantity = $5, category_id = $6, \
                description = $7, price = $8, count_in_stock = $9, updated_at = now() \
             WHERE p.id = $1 RETURNING {PRODUCT_COLUMNS}"
        );
        sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(input.name.trim())
            .bind(&input.image)
            .bind(input.brand.trim())
            .bind(input.quantity)
            .bind(input.category_id)
            .bind(input.description.trim())
            .bind(input.price)
            .bind(input.count_in_stock)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| RepositoryError::from_constraint(e, "unknown category"))?
            .ok_or(RepositoryError::NotFound)
    }

    /// Delete a product, returning it. Placed orders keep their snapshots.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if it doesn't exist.
    pub async fn delete(&self, id: ProductId) -> Result<Product, RepositoryError> {
        let sql = format!("DELETE FROM bazaar.products p WHERE p.id = $1 RETURNING {PRODUCT_COLUMNS}");
        sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Reviews of a product, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn reviews(&self, product_id: ProductId) -> Result<Vec<Review>, RepositoryError> {
        let reviews = sqlx::query_as::<_, Review>(
            "SELECT id, product_id, user_id, name, rating, comment, created_at \
             FROM bazaar.product_reviews WHERE product_id = $1 ORDER BY id",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;
        Ok(reviews)
    }

    /// Add a review and refresh the product's rating and review count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist and
    /// `RepositoryError::Conflict` if the user already reviewed it.
    #[instrument(skip(self, comment))]
    pub async fn add_review(
        &self,
        product_id: ProductId,
        user_id: UserId,
        author: &str,
        rating: i16,
        comment: &str,
    ) -> Result<Review, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<i32> =
            sqlx::query_scalar("SELECT id FROM bazaar.products WHERE id = $1 FOR UPDATE")
                .bind(product_id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let review = sqlx::query_as::<_, Review>(
            "INSERT INTO bazaar.product_reviews (product_id, user_id, name, rating, comment) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, product_id, user_id, name, rating, comment, created_at",
        )
        .bind(product_id)
        .bind(user_id)
        .bind(author)
        .bind(rating)
        .bind(comment)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "Product already reviewed"))?;

        sqlx::query(
            "UPDATE bazaar.products SET \
                num_reviews = s.count, rating = s.mean, updated_at = now() \
             FROM (SELECT COUNT(*)::int4 AS count, AVG(rating)::float8 AS mean \
                   FROM bazaar.product_reviews WHERE product_id = $1) s \
             WHERE id = $1",
        )
        .bind(product_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(review)
    }
}

impl Catalog for ProductRepository<'_> {
    type Error = RepositoryError;

    async fn find_many(&self, ids: &[ProductId]) -> Result<Vec<CatalogEntry>, Self::Error> {
        #[derive(sqlx::FromRow)]
        struct EntryRow {
            id: ProductId,
            name: String,
            image: String,
            price: Money,
        }

        let ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let rows = sqlx::query_as::<_, EntryRow>(
            "SELECT id, name, image, price FROM bazaar.products WHERE id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| CatalogEntry {
                product_id: row.id,
                name: row.name,
                image: row.image,
                unit_price: row.price,
            })
            .collect())
    }
}

/// Escape `LIKE` metacharacters so a keyword matches literally.
fn escape_like(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len());
    for c in keyword.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
