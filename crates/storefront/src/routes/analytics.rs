//! Client-reported analytics events.
//!
//! Pages and search boxes report what the shopper saw here. Events are tagged
//! with the client session ID so the dashboard can count sessions.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;

use neonmart_core::analytics::NewAnalyticsEvent;

use crate::error::{AppError, Result};
use crate::middleware::{Client, OptionalAuth};
use crate::state::AppState;

/// Longest accepted page path.
const MAX_PAGE_LEN: usize = 2048;

/// Longest accepted search query.
const MAX_QUERY_LEN: usize = 200;

type Metadata = serde_json::Map<String, serde_json::Value>;

/// Event reported by the client.
#[derive(Debug, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum TrackRequest {
    PageView {
        page: String,
        #[serde(default)]
        metadata: Metadata,
    },
    Search {
        query: String,
        results_count: usize,
        #[serde(default)]
        metadata: Metadata,
    },
}

impl TrackRequest {
    /// Validate and build the event. Named fields win over `metadata` keys.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for an empty or oversized page or query.
    pub fn into_event(self) -> Result<NewAnalyticsEvent> {
        let (mut event, extra) = match self {
            Self::PageView { page, metadata } => {
                if !page.starts_with('/') || page.len() > MAX_PAGE_LEN {
                    return Err(AppError::BadRequest(
                        "page must be a path starting with '/'".to_string(),
                    ));
                }
                (NewAnalyticsEvent::page_view(&page), metadata)
            }
            Self::Search {
                query,
                results_count,
                metadata,
            } => {
                let query = query.trim();
                if query.is_empty() || query.len() > MAX_QUERY_LEN {
                    return Err(AppError::BadRequest(format!(
                        "query must be 1 to {MAX_QUERY_LEN} characters"
                    )));
                }
                (NewAnalyticsEvent::search(query, results_count), metadata)
            }
        };

        for (key, value) in extra {
            if event.metadata.get(&key).is_none() {
                event = event.with_metadata(&key, value);
            }
        }
        Ok(event)
    }
}

/// Record a page view or search for the caller's client session.
#[instrument(skip(state, user, client, request))]
pub async fn record(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Client(client): Client,
    Json(request): Json<TrackRequest>,
) -> Result<StatusCode> {
    let event = request
        .into_event()?
        .with_user(user.map(|u| u.id))
        .with_session(client.id().to_string());

    tracing::debug!(event_type = %event.event_type, "Recording client event");
    state.analytics().track(event);

    Ok(StatusCode::ACCEPTED)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(body: serde_json::Value) -> TrackRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_page_view_keeps_extra_metadata() {
        let event = parse(json!({
            "event_type": "page_view",
            "page": "/products",
            "metadata": { "title": "Shop", "page": "/ignored" }
        }))
        .into_event()
        .unwrap();

        assert_eq!(event.event_type, "page_view");
        assert_eq!(event.metadata["page"], "/products");
        assert_eq!(event.metadata["title"], "Shop");
    }

    #[test]
    fn test_search_trims_query() {
        let event = parse(json!({
            "event_type": "search",
            "query": "  lava lamp ",
            "results_count": 3
        }))
        .into_event()
        .unwrap();

        assert_eq!(event.metadata["query"], "lava lamp");
        assert_eq!(event.metadata["results_count"], 3);
    }

    #[test]
    fn test_rejects_bad_page_and_blank_query() {
        let page = parse(json!({ "event_type": "page_view", "page": "products" }));
        let query = parse(json!({ "event_type": "search", "query": "   ", "results_count": 0 }));

        assert!(matches!(page.into_event(), Err(AppError::BadRequest(_))));
        assert!(matches!(query.into_event(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_unknown_event_type_is_rejected() {
        let result = serde_json::from_value::<TrackRequest>(json!({
            "event_type": "purchase",
            "page": "/"
        }));

        assert!(result.is_err());
    }
}
