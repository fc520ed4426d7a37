//! Product repository for catalog reads.

use std::collections::HashMap;

use sqlx::PgPool;

use neonmart_core::{CategoryId, ProductId};

use super::{ProductCatalog, RepositoryError};
use crate::models::product::{Product, ProductFilter, ProductSort};

const PRODUCT_SELECT: &str = r"
    SELECT p.id, p.name, p.slug, p.description, p.price, p.compare_at_price,
           p.sku, p.quantity AS stock_quantity, p.category_id, c.name AS category_name,
           p.status, p.featured, p.tags, p.images, p.created_at, p.updated_at
    FROM products p
    LEFT JOIN categories c ON c.id = p.category_id
";

/// Repository for product database operations.
#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a product by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!("{PRODUCT_SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Active products matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let categories: Vec<uuid::Uuid> =
            filter.categories.iter().map(CategoryId::as_uuid).collect();
        let products = sqlx::query_as::<_, Product>(&list_sql(filter.sort))
            .bind(categories)
            .bind(filter.min_price)
            .bind(filter.max_price)
            .bind(&filter.tags)
            .bind(filter.search.as_deref().map(like_pattern))
            .bind(filter.limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Names for a set of products, for labelling analytics.
    ///
    /// IDs with no matching product are absent from the map.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn names(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, String>, RepositoryError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let raw: Vec<uuid::Uuid> = ids.iter().map(ProductId::as_uuid).collect();
        let rows: Vec<(ProductId, String)> =
            sqlx::query_as("SELECT id, name FROM products WHERE id = ANY($1)")
                .bind(raw)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().collect())
    }
}

fn list_sql(sort: ProductSort) -> String {
    format!(
        r"{PRODUCT_SELECT}
    WHERE p.status = 'active'
        AND (cardinality($1::uuid[]) = 0 OR p.category_id = ANY($1))
        AND ($2::numeric IS NULL OR p.price >= $2)
        AND ($3::numeric IS NULL OR p.price <= $3)
        AND (cardinality($4::text[]) = 0 OR p.tags && $4)
        AND ($5::text IS NULL OR p.name ILIKE $5 OR p.description ILIKE $5)
    ORDER BY {order}
    LIMIT $6
",
        order = sort.order_by()
    )
}

/// `%text%` with `LIKE` wildcards in `text` escaped.
fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

impl ProductCatalog for ProductRepository {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        self.get_by_id(id).await
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        self.list(filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("lamp"), "%lamp%");
        assert_eq!(like_pattern("100%_off\\"), "%100\\%\\_off\\\\%");
    }

    #[test]
    fn test_listing_sql_orders_by_sort() {
        assert!(list_sql(ProductSort::Newest).contains("ORDER BY p.created_at DESC, p.id"));
        assert!(list_sql(ProductSort::PriceAsc).contains("ORDER BY p.price ASC, p.id"));
        assert!(list_sql(ProductSort::PriceDesc).contains("ORDER BY p.price DESC, p.id"));
        assert!(list_sql(ProductSort::Name).contains("ORDER BY p.name ASC, p.id"));
    }

    #[test]
    fn test_listing_sql_only_lists_active_products() {
        let sql = list_sql(ProductSort::default());

        assert!(sql.contains("WHERE p.status = 'active'"));
        assert!(sql.trim_end().ends_with("LIMIT $6"));
    }
}
