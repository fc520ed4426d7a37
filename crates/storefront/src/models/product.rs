//! Catalog domain types.
//!
//! The storefront only reads the catalog; products are managed elsewhere.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use neonmart_core::cart::ProductSnapshot;
use neonmart_core::{CategoryId, Price, ProductId, ProductStatus};

/// Products per listing when the client does not ask for a size.
pub const DEFAULT_PAGE_SIZE: i64 = 48;

/// Largest listing a single request may ask for.
pub const MAX_PAGE_SIZE: i64 = 100;

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Price,
    /// Original price shown struck through when the product is on sale.
    pub compare_at_price: Option<Price>,
    pub sku: Option<String>,
    pub stock_quantity: i32,
    pub category_id: Option<CategoryId>,
    /// Joined from `categories`; not a column on `products`.
    pub category_name: Option<String>,
    pub status: ProductStatus,
    pub featured: bool,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock_quantity > 0
    }

    /// The fields copied onto a cart line.
    #[must_use]
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            name: self.name.clone(),
            price: self.price,
            images: self.images.clone(),
            category: self.category_name.clone(),
        }
    }
}

/// Listing order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

impl ProductSort {
    /// `ORDER BY` clause over the `p` products alias. Ties break on ID.
    #[must_use]
    pub const fn order_by(self) -> &'static str {
        match self {
            Self::Newest => "p.created_at DESC, p.id",
            Self::PriceAsc => "p.price ASC, p.id",
            Self::PriceDesc => "p.price DESC, p.id",
            Self::Name => "p.name ASC, p.id",
        }
    }

    fn compare(self, a: &Product, b: &Product) -> Ordering {
        let primary = match self {
            Self::Newest => b.created_at.cmp(&a.created_at),
            Self::PriceAsc => a.price.cmp(&b.price),
            Self::PriceDesc => b.price.cmp(&a.price),
            Self::Name => a.name.cmp(&b.name),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

/// Catalog listing filter. Only active products are ever listed.
///
/// Empty `categories` or `tags` match everything; otherwise a product needs
/// one of the listed categories and at least one of the listed tags.
/// `search` matches the name or description, case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFilter {
    pub categories: Vec<CategoryId>,
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
    pub tags: Vec<String>,
    pub search: Option<String>,
    pub sort: ProductSort,
    pub limit: i64,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            categories: Vec::new(),
            min_price: None,
            max_price: None,
            tags: Vec::new(),
            search: None,
            sort: ProductSort::default(),
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ProductFilter {
    /// Whether `product` belongs in the listing.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        product.status == ProductStatus::Active
            && (self.categories.is_empty()
                || product
                    .category_id
                    .is_some_and(|id| self.categories.contains(&id)))
            && self.min_price.is_none_or(|min| product.price >= min)
            && self.max_price.is_none_or(|max| product.price <= max)
            && (self.tags.is_empty() || product.tags.iter().any(|t| self.tags.contains(t)))
            && self.search.as_deref().is_none_or(|query| {
                contains_ignore_case(&product.name, query)
                    || product
                        .description
                        .as_deref()
                        .is_some_and(|d| contains_ignore_case(d, query))
            })
    }

    /// Filter, sort and truncate `products` the way the store does.
    #[must_use]
    pub fn apply(&self, products: impl IntoIterator<Item = Product>) -> Vec<Product> {
        let mut listed: Vec<Product> = products.into_iter().filter(|p| self.matches(p)).collect();
        listed.sort_by(|a, b| self.sort.compare(a, b));
        listed.truncate(usize::try_from(self.limit).unwrap_or(0));
        listed
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// An active product with the given price and stock.
    pub fn product(name: &str, cents: i64, stock: i32) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::generate(),
            name: name.to_string(),
            slug: name.to_lowercase().replace(' ', "-"),
            description: None,
            price: Price::from_cents(cents),
            compare_at_price: None,
            sku: None,
            stock_quantity: stock,
            category_id: None,
            category_name: Some("Lighting".to_string()),
            status: ProductStatus::Active,
            featured: false,
            tags: Vec::new(),
            images: vec![format!("/img/{}.png", name.to_lowercase())],
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_copies_display_fields() {
        let product = fixtures::product("Neon Sign", 4999, 3);
        let snapshot = product.snapshot();

        assert_eq!(snapshot.name, "Neon Sign");
        assert_eq!(snapshot.price, Price::from_cents(4999));
        assert_eq!(snapshot.images, vec!["/img/neon sign.png".to_string()]);
        assert_eq!(snapshot.category.as_deref(), Some("Lighting"));
    }

    #[test]
    fn test_in_stock() {
        assert!(fixtures::product("Lamp", 100, 1).in_stock());
        assert!(!fixtures::product("Lamp", 100, 0).in_stock());
        assert!(!fixtures::product("Lamp", 100, -2).in_stock());
    }

    fn names(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.name.as_str()).collect()
    }

    fn catalog() -> Vec<Product> {
        let mut lamp = fixtures::product("Neon Lamp", 4999, 5);
        lamp.tags = vec!["bestseller".to_string()];
        lamp.description = Some("Pink glow for any desk".to_string());
        let mut sign = fixtures::product("Open Sign", 12000, 2);
        sign.tags = vec!["premium".to_string()];
        let strip = fixtures::product("LED Strip", 1999, 9);
        let mut draft = fixtures::product("Draft Lamp", 999, 1);
        draft.status = ProductStatus::Draft;
        vec![lamp, sign, strip, draft]
    }

    #[test]
    fn test_filter_hides_inactive_products() {
        let listed = ProductFilter::default().apply(catalog());

        assert_eq!(listed.len(), 3);
        assert!(!names(&listed).contains(&"Draft Lamp"));
    }

    #[test]
    fn test_filter_price_range_and_sort() {
        let filter = ProductFilter {
            min_price: Some(Price::from_cents(1999)),
            max_price: Some(Price::from_cents(4999)),
            sort: ProductSort::PriceDesc,
            ..ProductFilter::default()
        };

        assert_eq!(names(&filter.apply(catalog())), vec!["Neon Lamp", "LED Strip"]);
    }

    #[test]
    fn test_filter_search_matches_description_ignoring_case() {
        let filter = ProductFilter {
            search: Some("GLOW".to_string()),
            ..ProductFilter::default()
        };

        assert_eq!(names(&filter.apply(catalog())), vec!["Neon Lamp"]);
    }

    #[test]
    fn test_filter_tags_and_categories() {
        let mut products = catalog();
        let category = CategoryId::generate();
        if let Some(sign) = products.iter_mut().find(|p| p.name == "Open Sign") {
            sign.category_id = Some(category);
        }

        let by_tag = ProductFilter {
            tags: vec!["bestseller".to_string(), "premium".to_string()],
            sort: ProductSort::Name,
            ..ProductFilter::default()
        };
        assert_eq!(names(&by_tag.apply(products.clone())), vec!["Neon Lamp", "Open Sign"]);

        let by_category = ProductFilter {
            categories: vec![category],
            ..ProductFilter::default()
        };
        assert_eq!(names(&by_category.apply(products)), vec!["Open Sign"]);
    }

    #[test]
    fn test_filter_limit() {
        let filter = ProductFilter {
            limit: 2,
            sort: ProductSort::PriceAsc,
            ..ProductFilter::default()
        };

        assert_eq!(names(&filter.apply(catalog())), vec!["LED Strip", "Neon Lamp"]);
    }
}
