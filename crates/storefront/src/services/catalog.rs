//! Catalog browsing.

use neonmart_core::analytics::NewAnalyticsEvent;
use neonmart_core::{ClientId, UserId};
use tracing::instrument;

use super::analytics::AnalyticsTracker;
use crate::db::{ProductCatalog, RepositoryError};
use crate::models::product::{Product, ProductFilter};

/// List products for a shopper. A filter with search text records a
/// `search` event carrying the query and the number of results.
///
/// # Errors
///
/// Returns `RepositoryError` if the catalog cannot be read. No event is
/// recorded in that case.
#[instrument(skip(catalog, analytics, filter), fields(client_id = %client_id))]
pub async fn browse<C: ProductCatalog>(
    catalog: &C,
    analytics: &AnalyticsTracker,
    filter: &ProductFilter,
    user_id: Option<UserId>,
    client_id: ClientId,
) -> Result<Vec<Product>, RepositoryError> {
    let products = catalog.list_products(filter).await?;

    if let Some(search) = &filter.search {
        tracing::debug!(results = products.len(), "Catalog search");
        analytics.track(
            NewAnalyticsEvent::search(search, products.len())
                .with_user(user_id)
                .with_session(client_id.to_string()),
        );
    }

    Ok(products)
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::db::memory::InMemoryStore;
    use crate::models::product::fixtures;

    fn store_with_catalog() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store.insert_product(fixtures::product("Neon Lamp", 4999, 3));
        store.insert_product(fixtures::product("Lava Lamp", 2999, 3));
        store.insert_product(fixtures::product("Open Sign", 12000, 3));
        store
    }

    #[tokio::test]
    async fn test_search_lists_matches_and_records_event() {
        let store = store_with_catalog();
        let analytics = AnalyticsTracker::in_memory(Arc::clone(&store));
        let user = UserId::generate();
        let client = ClientId::generate();
        let filter = ProductFilter {
            search: Some("lamp".to_string()),
            ..ProductFilter::default()
        };

        let products = browse(&*store, &analytics, &filter, Some(user), client)
            .await
            .unwrap();

        assert_eq!(products.len(), 2);
        let events = store.analytics_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "search");
        assert_eq!(events[0].metadata["query"], "lamp");
        assert_eq!(events[0].metadata["results_count"], 2);
        assert_eq!(events[0].user_id, Some(user));
        assert_eq!(events[0].session_id, Some(client.to_string()));
    }

    #[tokio::test]
    async fn test_plain_listing_records_nothing() {
        let store = store_with_catalog();
        let analytics = AnalyticsTracker::in_memory(Arc::clone(&store));

        let products = browse(
            &*store,
            &analytics,
            &ProductFilter::default(),
            None,
            ClientId::generate(),
        )
        .await
        .unwrap();

        assert_eq!(products.len(), 3);
        assert!(store.analytics_events().is_empty());
    }

    #[tokio::test]
    async fn test_failed_read_records_nothing() {
        let store = store_with_catalog();
        let analytics = AnalyticsTracker::in_memory(Arc::clone(&store));
        store.fail_reads(true);
        let filter = ProductFilter {
            search: Some("lamp".to_string()),
            ..ProductFilter::default()
        };

        let result = browse(&*store, &analytics, &filter, None, ClientId::generate()).await;

        assert!(result.is_err());
        assert!(store.analytics_events().is_empty());
    }
}
