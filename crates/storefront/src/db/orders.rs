//! Order repository (dashboard reads).

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use neonmart_core::analytics::OrderSummary;
use neonmart_core::{OrderId, OrderStatus, PaymentStatus, Price};

use super::RepositoryError;

#[derive(sqlx::FromRow)]
struct OrderSummaryRow {
    id: OrderId,
    status: OrderStatus,
    payment_status: PaymentStatus,
    total_amount: Price,
    created_at: DateTime<Utc>,
}

impl From<OrderSummaryRow> for OrderSummary {
    fn from(row: OrderSummaryRow) -> Self {
        Self {
            id: row.id,
            status: row.status,
            payment_status: row.payment_status,
            total_amount: row.total_amount,
            created_at: row.created_at,
        }
    }
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Orders created at or after `since`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<OrderSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderSummaryRow>(
            r"
            SELECT id, status, payment_status, total_amount, created_at
            FROM orders
            WHERE created_at >= $1
            ORDER BY created_at ASC
            ",
        )
        .bind(since)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(OrderSummary::from).collect())
    }
}
