//! Admin analytics dashboard.

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use neonmart_core::ProductId;
use neonmart_core::analytics::{AnalyticsEvent, DashboardSummary, EventKind};

use crate::db::analytics::AnalyticsRepository;
use crate::db::orders::OrderRepository;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Default dashboard window in days.
const DEFAULT_RANGE_DAYS: i64 = 30;

/// Longest window the dashboard will aggregate.
const MAX_RANGE_DAYS: i64 = 365;

/// Most events aggregated per request. Older events in the window are left
/// out and the response is marked `truncated`.
const MAX_DASHBOARD_EVENTS: usize = 50_000;

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub days: i64,
    /// Set when the window held more than `MAX_DASHBOARD_EVENTS` events.
    pub truncated: bool,
    #[serde(flatten)]
    pub summary: DashboardSummary,
}

/// Aggregate analytics and orders for the last `days` days.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardResponse>> {
    let days = query
        .days
        .unwrap_or(DEFAULT_RANGE_DAYS)
        .clamp(1, MAX_RANGE_DAYS);
    let since = Utc::now() - Duration::days(days);

    let fetch_limit = i64::try_from(MAX_DASHBOARD_EVENTS + 1).unwrap_or(i64::MAX);
    let recent = AnalyticsRepository::new(state.pool().clone())
        .list_recent(since, fetch_limit)
        .await?;
    let (events, truncated) = oldest_first(recent, MAX_DASHBOARD_EVENTS);
    let orders = OrderRepository::new(state.pool()).list_since(since).await?;

    let product_view = EventKind::ProductView.as_str();
    let mut viewed: Vec<ProductId> = events
        .iter()
        .filter(|e| e.event_type == product_view)
        .filter_map(|e| e.product_id)
        .collect();
    viewed.sort_unstable();
    viewed.dedup();
    let names = state.products().names(&viewed).await?;

    let summary = DashboardSummary::build(&events, &orders, &names);
    tracing::debug!(
        events = events.len(),
        orders = orders.len(),
        truncated,
        "Built dashboard"
    );

    Ok(Json(DashboardResponse {
        days,
        truncated,
        summary,
    }))
}

/// Keep the newest `max` of `recent` (newest first) and return them oldest
/// first, with whether any were dropped.
fn oldest_first(mut recent: Vec<AnalyticsEvent>, max: usize) -> (Vec<AnalyticsEvent>, bool) {
    let truncated = recent.len() > max;
    recent.truncate(max);
    recent.reverse();
    (recent, truncated)
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use chrono::DateTime;
    use neonmart_core::AnalyticsEventId;

    use super::*;

    fn event_at(minute: i64) -> AnalyticsEvent {
        AnalyticsEvent {
            id: AnalyticsEventId::generate(),
            event_type: EventKind::PageView.as_str().to_string(),
            user_id: None,
            product_id: None,
            session_id: None,
            metadata: serde_json::json!({}),
            created_at: DateTime::<Utc>::UNIX_EPOCH + Duration::minutes(minute),
        }
    }

    #[test]
    fn test_oldest_first_keeps_newest_when_over_cap() {
        let recent = vec![event_at(3), event_at(2), event_at(1)];

        let (events, truncated) = oldest_first(recent, 2);

        assert!(truncated);
        let minutes: Vec<_> = events.iter().map(|e| e.created_at.timestamp() / 60).collect();
        assert_eq!(minutes, vec![2, 3]);
    }

    #[test]
    fn test_oldest_first_under_cap() {
        let (events, truncated) = oldest_first(vec![event_at(5), event_at(4)], 2);

        assert!(!truncated);
        assert_eq!(events.len(), 2);
        assert!(events[0].created_at < events[1].created_at);
    }
}
