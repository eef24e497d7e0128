//! Order repository.
//!
//! Implements the checkout [`OrderStore`]: an order row and its item rows
//! are written in one transaction, and status updates are conditional so
//! a repeated or racing "mark paid" cannot overwrite the first one.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use bazaar_core::order::{NewOrder, Order, OrderLine, OrderStore, PaymentResult};
use bazaar_core::pricing::Totals;
use bazaar_core::{Money, OrderId, ProductId, ShippingAddress, UserId};

use super::{RepositoryError, quantity_from_db, quantity_to_db};

const ORDER_COLUMNS: &str = "id, user_id, address, city, postal_code, country, payment_method, \
     payment_id, payment_status, payment_update_time, payment_email, \
     items_price, shipping_price, tax_price, total_price, \
     is_paid, paid_at, is_delivered, delivered_at, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    address: String,
    city: String,
    postal_code: String,
    country: String,
    payment_method: String,
    payment_id: Option<String>,
    payment_status: Option<String>,
    payment_update_time: Option<String>,
    payment_email: Option<String>,
    items_price: Money,
    shipping_price: Money,
    tax_price: Money,
    total_price: Money,
    is_paid: bool,
    paid_at: Option<DateTime<Utc>>,
    is_delivered: bool,
    delivered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    order_id: OrderId,
    product_id: ProductId,
    name: String,
    image: String,
    price: Money,
    quantity: i32,
}

impl OrderItemRow {
    fn into_line(self) -> Result<OrderLine, RepositoryError> {
        Ok(OrderLine {
            product_id: self.product_id,
            name: self.name,
            image: self.image,
            unit_price: self.price,
            quantity: quantity_from_db(self.quantity)?,
        })
    }
}

impl OrderRow {
    fn into_order(self, lines: Vec<OrderLine>) -> Order {
        let payment_result = self.payment_id.map(|id| PaymentResult {
            id,
            status: self.payment_status.unwrap_or_default(),
            update_time: self.payment_update_time.unwrap_or_default(),
            email_address: self.payment_email,
        });
        Order {
            id: self.id,
            customer_id: self.user_id,
            lines,
            shipping_address: ShippingAddress {
                address: self.address,
                city: self.city,
                postal_code: self.postal_code,
                country: self.country,
            },
            payment_method: self.payment_method,
            payment_result,
            totals: Totals {
                items_total: self.items_price,
                shipping_total: self.shipping_price,
                tax_total: self.tax_price,
                grand_total: self.total_price,
            },
            is_paid: self.is_paid,
            paid_at: self.paid_at,
            is_delivered: self.is_delivered,
            delivered_at: self.delivered_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Paid sales for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct DailySales {
    /// Day as `YYYY-MM-DD` (UTC).
    pub date: String,
    pub total_sales: Money,
}

/// Repository for order database operations.
#[derive(Clone, Copy)]
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM bazaar.orders ORDER BY id DESC");
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .fetch_all(self.pool)
            .await?;
        self.attach_lines(rows).await
    }

    /// Orders placed by one user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM bazaar.orders WHERE user_id = $1 ORDER BY id DESC"
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(user_id)
            .fetch_all(self.pool)
            .await?;
        self.attach_lines(rows).await
    }

    /// Number of orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM bazaar.orders")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Sum of the grand totals of all orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn total_sales(&self) -> Result<Money, RepositoryError> {
        let total: Decimal =
            sqlx::query_scalar("SELECT COALESCE(SUM(total_price), 0) FROM bazaar.orders")
                .fetch_one(self.pool)
                .await?;
        Ok(Money::from_decimal(total))
    }

    /// Paid sales grouped by the UTC day they were paid, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn sales_by_date(&self) -> Result<Vec<DailySales>, RepositoryError> {
        let sales = sqlx::query_as::<_, DailySales>(
            "SELECT to_char(paid_at AT TIME ZONE 'UTC', 'YYYY-MM-DD') AS date, \
                    SUM(total_price) AS total_sales \
             FROM bazaar.orders \
             WHERE is_paid AND paid_at IS NOT NULL \
             GROUP BY 1 ORDER BY 1",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(sales)
    }

    async fn lines_for(
        &self,
        order_ids: &[i32],
    ) -> Result<HashMap<OrderId, Vec<OrderLine>>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            "SELECT order_id, product_id, name, image, price, quantity \
             FROM bazaar.order_items WHERE order_id = ANY($1) ORDER BY order_id, position",
        )
        .bind(order_ids)
        .fetch_all(self.pool)
        .await?;

        let mut lines: HashMap<OrderId, Vec<OrderLine>> = HashMap::new();
        for row in rows {
            let order_id = row.order_id;
            lines.entry(order_id).or_default().push(row.into_line()?);
        }
        Ok(lines)
    }

    async fn attach_lines(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        let ids: Vec<i32> = rows.iter().map(|r| r.id.as_i32()).collect();
        let mut lines = self.lines_for(&ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let order_lines = lines.remove(&row.id).unwrap_or_default();
                row.into_order(order_lines)
            })
            .collect())
    }
}

impl OrderStore for OrderRepository<'_> {
    type Error = RepositoryError;

    async fn insert(&self, order: &NewOrder) -> Result<Order, Self::Error> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO bazaar.orders \
                (user_id, address, city, postal_code, country, payment_method, \
                 items_price, shipping_price, tax_price, total_price) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {ORDER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order.customer_id)
            .bind(&order.shipping_address.address)
            .bind(&order.shipping_address.city)
            .bind(&order.shipping_address.postal_code)
            .bind(&order.shipping_address.country)
            .bind(&order.payment_method)
            .bind(order.totals.items_total)
            .bind(order.totals.shipping_total)
            .bind(order.totals.tax_total)
            .bind(order.totals.grand_total)
            .fetch_one(&mut *tx)
            .await?;

        for (position, line) in (0_i32..).zip(&order.lines) {
            sqlx::query(
                "INSERT INTO bazaar.order_items \
                    (order_id, position, product_id, name, image, price, quantity) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(row.id)
            .bind(position)
            .bind(line.product_id)
            .bind(&line.name)
            .bind(&line.image)
            .bind(line.unit_price)
            .bind(quantity_to_db(line.quantity)?)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(row.into_order(order.lines.clone()))
    }

    async fn find(&self, id: OrderId) -> Result<Option<Order>, Self::Error> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM bazaar.orders WHERE id = $1");
        let Some(row) = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
        else {
            return Ok(None);
        };
        let mut lines = self.lines_for(&[id.as_i32()]).await?;
        let order_lines = lines.remove(&id).unwrap_or_default();
        Ok(Some(row.into_order(order_lines)))
    }

    async fn record_payment(&self, order: &Order) -> Result<bool, Self::Error> {
        let payment = order.payment_result.as_ref();
        let result = sqlx::query(
            "UPDATE bazaar.orders SET \
                is_paid = TRUE, paid_at = $2, \
                payment_id = $3, payment_status = $4, payment_update_time = $5, payment_email = $6, \
                updated_at = $7 \
             WHERE id = $1 AND NOT is_paid",
        )
        .bind(order.id)
        .bind(order.paid_at)
        .bind(payment.map(|p| p.id.as_str()))
        .bind(payment.map(|p| p.status.as_str()))
        .bind(payment.map(|p| p.update_time.as_str()))
        .bind(payment.and_then(|p| p.email_address.as_deref()))
        .bind(order.updated_at)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn record_delivery(&self, order: &Order) -> Result<bool, Self::Error> {
        let result = sqlx::query(
            "UPDATE bazaar.orders SET is_delivered = TRUE, delivered_at = $2, updated_at = $3 \
             WHERE id = $1 AND NOT is_delivered",
        )
        .bind(order.id)
        .bind(order.delivered_at)
        .bind(order.updated_at)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
