//! Cart line repository.
//!
//! Rows in `cart_items` hold absolute quantities. The row ID is generated by
//! the storefront when the line is first added, so the same ID addresses the
//! line in memory and in the store.

use std::num::NonZeroU32;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use neonmart_core::cart::{CartLineItem, ProductSnapshot};
use neonmart_core::{CartItemId, Price, ProductId, UserId};

use super::{CartStore, RepositoryError};

/// A cart row joined with its product and category.
#[derive(sqlx::FromRow)]
struct CartItemRow {
    id: CartItemId,
    user_id: UserId,
    product_id: ProductId,
    quantity: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    product_name: Option<String>,
    product_price: Option<Price>,
    product_images: Option<Vec<String>>,
    category_name: Option<String>,
}

impl TryFrom<CartItemRow> for CartLineItem {
    type Error = RepositoryError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity)
            .ok()
            .and_then(NonZeroU32::new)
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "cart item {} has quantity {}",
                    row.id, row.quantity
                ))
            })?;

        let product = match (row.product_name, row.product_price) {
            (Some(name), Some(price)) => Some(ProductSnapshot {
                name,
                price,
                images: row.product_images.unwrap_or_default(),
                category: row.category_name,
            }),
            _ => None,
        };

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            product_id: row.product_id,
            product,
            quantity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for cart line database operations.
#[derive(Clone)]
pub struct CartItemRepository {
    pool: PgPool,
}

impl CartItemRepository {
    /// Create a new cart line repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl CartStore for CartItemRepository {
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<CartLineItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartItemRow>(
            r"
            SELECT ci.id, ci.user_id, ci.product_id, ci.quantity,
                   ci.created_at, ci.updated_at,
                   p.name AS product_name, p.price AS product_price,
                   p.images AS product_images, c.name AS category_name
            FROM cart_items ci
            LEFT JOIN products p ON p.id = ci.product_id
            LEFT JOIN categories c ON c.id = p.category_id
            WHERE ci.user_id = $1
            ORDER BY ci.created_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CartLineItem::try_from).collect()
    }

    async fn save_line(&self, line: &CartLineItem) -> Result<(), RepositoryError> {
        let quantity = i32::try_from(line.quantity.get()).unwrap_or(i32::MAX);

        sqlx::query(
            r"
            INSERT INTO cart_items (id, user_id, product_id, quantity, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (id) DO UPDATE
            SET quantity = EXCLUDED.quantity, updated_at = NOW()
            ",
        )
        .bind(line.id)
        .bind(line.user_id)
        .bind(line.product_id)
        .bind(quantity)
        .bind(line.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict(format!(
                    "product {} is already in the cart under another line",
                    line.product_id
                ));
            }
            RepositoryError::Database(e)
        })?;

        Ok(())
    }

    async fn delete_line(&self, id: CartItemId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(quantity: i32, name: Option<&str>) -> CartItemRow {
        let now = Utc::now();
        CartItemRow {
            id: CartItemId::generate(),
            user_id: UserId::generate(),
            product_id: ProductId::generate(),
            quantity,
            created_at: now,
            updated_at: now,
            product_name: name.map(str::to_string),
            product_price: Some(Price::from_cents(1250)),
            product_images: None,
            category_name: None,
        }
    }

    #[test]
    fn test_row_with_product_builds_snapshot() {
        let line = CartLineItem::try_from(row(2, Some("Lava Lamp"))).unwrap();

        assert_eq!(line.quantity.get(), 2);
        let snapshot = line.product.unwrap();
        assert_eq!(snapshot.name, "Lava Lamp");
        assert!(snapshot.images.is_empty());
    }

    #[test]
    fn test_row_for_deleted_product_has_no_snapshot() {
        let line = CartLineItem::try_from(row(1, None)).unwrap();
        assert!(line.product.is_none());
        assert_eq!(line.line_total(), Price::ZERO);
    }

    #[test]
    fn test_non_positive_quantity_is_corruption() {
        for quantity in [0, -3] {
            let result = CartLineItem::try_from(row(quantity, Some("Lamp")));
            assert!(matches!(result, Err(RepositoryError::DataCorruption(_))));
        }
    }
}
