//! Product route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use neonmart_core::analytics::NewAnalyticsEvent;
use neonmart_core::{CategoryId, Price, ProductId};

use crate::error::{AppError, Result};
use crate::middleware::{Client, OptionalAuth};
use crate::models::product::{MAX_PAGE_SIZE, Product, ProductFilter, ProductSort};
use crate::services::catalog;
use crate::state::AppState;

/// Longest accepted search text.
const MAX_SEARCH_LEN: usize = 200;

/// Listing query string.
///
/// `category` and `tags` take comma-separated lists.
#[derive(Debug, Default, Deserialize)]
pub struct ProductListQuery {
    pub category: Option<String>,
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
    pub tags: Option<String>,
    pub q: Option<String>,
    pub sort: Option<ProductSort>,
    pub limit: Option<i64>,
}

impl ProductListQuery {
    /// Validate the query string into a repository filter.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for malformed category IDs, negative or
    /// inverted price bounds, oversized search text, or a limit outside
    /// `1..=MAX_PAGE_SIZE`.
    pub fn into_filter(self) -> Result<ProductFilter> {
        let categories = split_list(self.category.as_deref())
            .map(|raw| {
                raw.parse::<CategoryId>()
                    .map_err(|_| AppError::BadRequest(format!("invalid category: {raw}")))
            })
            .collect::<Result<Vec<_>>>()?;

        if [self.min_price, self.max_price]
            .into_iter()
            .flatten()
            .any(|price| price < Price::ZERO)
        {
            return Err(AppError::BadRequest("prices cannot be negative".to_string()));
        }
        if let (Some(min), Some(max)) = (self.min_price, self.max_price)
            && min > max
        {
            return Err(AppError::BadRequest(
                "min_price must not exceed max_price".to_string(),
            ));
        }

        let search = self
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string);
        if search.as_ref().is_some_and(|q| q.len() > MAX_SEARCH_LEN) {
            return Err(AppError::BadRequest(format!(
                "search text is limited to {MAX_SEARCH_LEN} characters"
            )));
        }

        let mut filter = ProductFilter {
            categories,
            min_price: self.min_price,
            max_price: self.max_price,
            tags: split_list(self.tags.as_deref()).map(str::to_string).collect(),
            search,
            sort: self.sort.unwrap_or_default(),
            ..ProductFilter::default()
        };
        if let Some(limit) = self.limit {
            if !(1..=MAX_PAGE_SIZE).contains(&limit) {
                return Err(AppError::BadRequest(format!(
                    "limit must be between 1 and {MAX_PAGE_SIZE}"
                )));
            }
            filter.limit = limit;
        }
        Ok(filter)
    }
}

fn split_list(raw: Option<&str>) -> impl Iterator<Item = &str> {
    raw.into_iter()
        .flat_map(|list| list.split(','))
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

/// Listing response.
#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub products: Vec<Product>,
    pub count: usize,
}

/// Active products, filtered and sorted. Records a `search` event when `q`
/// is present.
#[instrument(skip(state, user, client))]
pub async fn list(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Client(client): Client,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<ProductListResponse>> {
    let filter = query.into_filter()?;
    let products = catalog::browse(
        state.products(),
        state.analytics(),
        &filter,
        user.map(|u| u.id),
        client.id(),
    )
    .await?;

    Ok(Json(ProductListResponse {
        count: products.len(),
        products,
    }))
}

/// Product by ID. Records a `product_view` event.
#[instrument(skip(state, user, client))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Client(client): Client,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    let product = state
        .products()
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("product".to_string()))?;

    state.analytics().track(
        NewAnalyticsEvent::product_view(id)
            .with_user(user.map(|u| u.id))
            .with_session(client.id().to_string()),
    );

    Ok(Json(product))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::product::DEFAULT_PAGE_SIZE;

    #[test]
    fn test_empty_query_uses_defaults() {
        let filter = ProductListQuery::default().into_filter().unwrap();

        assert!(filter.categories.is_empty());
        assert!(filter.tags.is_empty());
        assert!(filter.search.is_none());
        assert_eq!(filter.sort, ProductSort::Newest);
        assert_eq!(filter.limit, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_lists_are_split_and_search_trimmed() {
        let category = CategoryId::generate();
        let query = ProductListQuery {
            category: Some(format!("{category}, ")),
            tags: Some("neon,,bestseller".to_string()),
            q: Some("  sign ".to_string()),
            sort: Some(ProductSort::PriceDesc),
            limit: Some(12),
            ..ProductListQuery::default()
        };

        let filter = query.into_filter().unwrap();

        assert_eq!(filter.categories, vec![category]);
        assert_eq!(filter.tags, vec!["neon", "bestseller"]);
        assert_eq!(filter.search.as_deref(), Some("sign"));
        assert_eq!(filter.sort, ProductSort::PriceDesc);
        assert_eq!(filter.limit, 12);
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let query = ProductListQuery {
            q: Some("   ".to_string()),
            ..ProductListQuery::default()
        };

        assert!(query.into_filter().unwrap().search.is_none());
    }

    #[test]
    fn test_invalid_queries_are_rejected() {
        let cases = [
            ProductListQuery {
                category: Some("not-a-uuid".to_string()),
                ..ProductListQuery::default()
            },
            ProductListQuery {
                min_price: Some(Price::from_cents(5000)),
                max_price: Some(Price::from_cents(1000)),
                ..ProductListQuery::default()
            },
            ProductListQuery {
                min_price: Some(Price::from_cents(-1)),
                ..ProductListQuery::default()
            },
            ProductListQuery {
                limit: Some(MAX_PAGE_SIZE + 1),
                ..ProductListQuery::default()
            },
            ProductListQuery {
                q: Some("x".repeat(MAX_SEARCH_LEN + 1)),
                ..ProductListQuery::default()
            },
        ];

        for query in cases {
            assert!(matches!(query.into_filter(), Err(AppError::BadRequest(_))));
        }
    }
}
