//! Analytics event types and dashboard aggregation.
//!
//! Aggregation here is pure: callers load events and orders for a date range
//! and hand them to [`DashboardSummary::build`].

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AnalyticsEventId, OrderId, OrderStatus, PaymentStatus, Price, ProductId, UserId};

/// Number of products listed in [`DashboardSummary::top_products`].
pub const TOP_PRODUCT_LIMIT: usize = 10;

/// Well-known event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PageView,
    ProductView,
    AddToCart,
    RemoveFromCart,
    Purchase,
    Search,
    UserSignup,
    UserLogin,
}

impl EventKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PageView => "page_view",
            Self::ProductView => "product_view",
            Self::AddToCart => "add_to_cart",
            Self::RemoveFromCart => "remove_from_cart",
            Self::Purchase => "purchase",
            Self::Search => "search",
            Self::UserSignup => "user_signup",
            Self::UserLogin => "user_login",
        }
    }
}

/// An event waiting to be recorded.
///
/// `event_type` is a free-form string so that ad-hoc events can be tracked
/// alongside the [`EventKind`] ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAnalyticsEvent {
    pub event_type: String,
    pub user_id: Option<UserId>,
    pub product_id: Option<ProductId>,
    pub session_id: Option<String>,
    pub metadata: serde_json::Value,
}

impl NewAnalyticsEvent {
    #[must_use]
    pub fn new(kind: EventKind) -> Self {
        Self {
            event_type: kind.as_str().to_string(),
            user_id: None,
            product_id: None,
            session_id: None,
            metadata: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    #[must_use]
    pub fn page_view(page: &str) -> Self {
        Self::new(EventKind::PageView).with_metadata("page", page)
    }

    #[must_use]
    pub fn product_view(product_id: ProductId) -> Self {
        Self::new(EventKind::ProductView).with_product(product_id)
    }

    #[must_use]
    pub fn add_to_cart(product_id: ProductId, quantity: u32) -> Self {
        Self::new(EventKind::AddToCart)
            .with_product(product_id)
            .with_metadata("quantity", quantity)
    }

    #[must_use]
    pub fn remove_from_cart(product_id: ProductId) -> Self {
        Self::new(EventKind::RemoveFromCart).with_product(product_id)
    }

    #[must_use]
    pub fn search(query: &str, results_count: usize) -> Self {
        Self::new(EventKind::Search)
            .with_metadata("query", query)
            .with_metadata("results_count", results_count)
    }

    #[must_use]
    pub fn user_login() -> Self {
        Self::new(EventKind::UserLogin)
    }

    #[must_use]
    pub const fn with_user(mut self, user_id: Option<UserId>) -> Self {
        self.user_id = user_id;
        self
    }

    #[must_use]
    pub const fn with_product(mut self, product_id: ProductId) -> Self {
        self.product_id = Some(product_id);
        self
    }

    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Add one metadata entry. Non-object metadata is replaced by an object.
    #[must_use]
    pub fn with_metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        if !self.metadata.is_object() {
            self.metadata = serde_json::Value::Object(serde_json::Map::new());
        }
        if let Some(map) = self.metadata.as_object_mut() {
            map.insert(key.to_string(), value.into());
        }
        self
    }
}

/// A recorded event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub id: AnalyticsEventId,
    pub event_type: String,
    pub user_id: Option<UserId>,
    pub product_id: Option<ProductId>,
    pub session_id: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// The order fields the dashboard needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total_amount: Price,
    pub created_at: DateTime<Utc>,
}

impl OrderSummary {
    /// Whether the order counts toward revenue.
    #[must_use]
    pub fn is_revenue(&self) -> bool {
        self.payment_status == PaymentStatus::Paid || self.status == OrderStatus::Delivered
    }
}

/// Order counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStats {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub shipped: usize,
    pub delivered: usize,
    pub cancelled: usize,
}

impl OrderStats {
    #[must_use]
    pub fn from_orders(orders: &[OrderSummary]) -> Self {
        orders.iter().fold(Self::default(), |mut stats, order| {
            stats.total += 1;
            match order.status {
                OrderStatus::Pending => stats.pending += 1,
                OrderStatus::Processing => stats.processing += 1,
                OrderStatus::Shipped => stats.shipped += 1,
                OrderStatus::Delivered => stats.delivered += 1,
                OrderStatus::Cancelled => stats.cancelled += 1,
            }
            stats
        })
    }
}

/// Share of all events held by one event type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTypeCount {
    pub event_type: String,
    pub count: usize,
    /// Rounded to the nearest whole percent.
    pub percentage: u32,
}

/// Product views in the range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopProduct {
    pub product_id: ProductId,
    pub name: String,
    pub views: usize,
}

/// Everything the admin analytics dashboard shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_events: usize,
    pub daily_page_views: BTreeMap<NaiveDate, usize>,
    pub event_types: Vec<EventTypeCount>,
    pub top_products: Vec<TopProduct>,
    pub daily_revenue: BTreeMap<NaiveDate, Price>,
    pub unique_users: usize,
    pub total_sessions: usize,
    pub avg_events_per_session: f64,
    pub order_stats: OrderStats,
}

impl DashboardSummary {
    /// Aggregate events and orders.
    ///
    /// `product_names` resolves product IDs for the top-products list; views of
    /// products missing from it are dropped (the product was deleted).
    #[must_use]
    pub fn build(
        events: &[AnalyticsEvent],
        orders: &[OrderSummary],
        product_names: &HashMap<ProductId, String>,
    ) -> Self {
        let page_view = EventKind::PageView.as_str();
        let product_view = EventKind::ProductView.as_str();

        let mut daily_page_views = BTreeMap::new();
        let mut type_counts: HashMap<&str, usize> = HashMap::new();
        let mut product_views: HashMap<ProductId, usize> = HashMap::new();
        let mut users = HashSet::new();
        let mut sessions = HashSet::new();

        for event in events {
            *type_counts.entry(event.event_type.as_str()).or_default() += 1;
            if event.event_type == page_view {
                *daily_page_views
                    .entry(event.created_at.date_naive())
                    .or_default() += 1;
            }
            if event.event_type == product_view
                && let Some(product_id) = event.product_id
                && product_names.contains_key(&product_id)
            {
                *product_views.entry(product_id).or_default() += 1;
            }
            if let Some(user_id) = event.user_id {
                users.insert(user_id);
            }
            sessions.insert(event.session_id.as_deref());
        }

        let total_events = events.len();
        let mut event_types: Vec<EventTypeCount> = type_counts
            .into_iter()
            .map(|(event_type, count)| EventTypeCount {
                event_type: event_type.to_string(),
                count,
                percentage: percentage(count, total_events),
            })
            .collect();
        event_types.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.event_type.cmp(&b.event_type)));

        let mut top_products: Vec<TopProduct> = product_views
            .into_iter()
            .filter_map(|(product_id, views)| {
                product_names.get(&product_id).map(|name| TopProduct {
                    product_id,
                    name: name.clone(),
                    views,
                })
            })
            .collect();
        top_products.sort_by(|a, b| b.views.cmp(&a.views).then_with(|| a.name.cmp(&b.name)));
        top_products.truncate(TOP_PRODUCT_LIMIT);

        let mut daily_revenue: BTreeMap<NaiveDate, Price> = BTreeMap::new();
        for order in orders.iter().filter(|o| o.is_revenue()) {
            let day = daily_revenue.entry(order.created_at.date_naive()).or_default();
            *day = *day + order.total_amount;
        }

        let total_sessions = sessions.len();
        #[allow(clippy::cast_precision_loss)] // event counts stay far below 2^52
        let avg_events_per_session = if total_sessions == 0 {
            0.0
        } else {
            total_events as f64 / total_sessions as f64
        };

        Self {
            total_events,
            daily_page_views,
            event_types,
            top_products,
            daily_revenue,
            unique_users: users.len(),
            total_sessions,
            avg_events_per_session,
            order_stats: OrderStats::from_orders(orders),
        }
    }
}

fn percentage(count: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    // Integer rounding: (count * 100 + total / 2) / total
    let rounded = (count * 100 + total / 2) / total;
    u32::try_from(rounded).unwrap_or(u32::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap()
    }

    fn event(kind: EventKind, session: &str, day: u32) -> AnalyticsEvent {
        AnalyticsEvent {
            id: AnalyticsEventId::generate(),
            event_type: kind.as_str().to_string(),
            user_id: None,
            product_id: None,
            session_id: Some(session.to_string()),
            metadata: serde_json::json!({}),
            created_at: at(day),
        }
    }

    fn order(status: OrderStatus, payment: PaymentStatus, cents: i64, day: u32) -> OrderSummary {
        OrderSummary {
            id: OrderId::generate(),
            status,
            payment_status: payment,
            total_amount: Price::from_cents(cents),
            created_at: at(day),
        }
    }

    #[test]
    fn test_revenue_counts_only_paid_or_delivered() {
        let orders = vec![
            order(OrderStatus::Pending, PaymentStatus::Paid, 1000, 1),
            order(OrderStatus::Delivered, PaymentStatus::Pending, 500, 1),
            order(OrderStatus::Processing, PaymentStatus::Pending, 9999, 1),
            order(OrderStatus::Cancelled, PaymentStatus::Refunded, 7777, 2),
        ];

        let summary = DashboardSummary::build(&[], &orders, &HashMap::new());

        assert_eq!(summary.daily_revenue.len(), 1);
        assert_eq!(
            summary.daily_revenue.values().next().copied(),
            Some(Price::from_cents(1500))
        );
        assert_eq!(summary.order_stats.total, 4);
        assert_eq!(summary.order_stats.cancelled, 1);
    }

    #[test]
    fn test_page_views_grouped_by_day_and_sessions_counted() {
        let events = vec![
            event(EventKind::PageView, "a", 1),
            event(EventKind::PageView, "a", 1),
            event(EventKind::PageView, "b", 2),
            event(EventKind::Search, "b", 2),
        ];

        let summary = DashboardSummary::build(&events, &[], &HashMap::new());

        assert_eq!(summary.total_events, 4);
        assert_eq!(summary.daily_page_views.values().copied().collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(summary.total_sessions, 2);
        assert!((summary.avg_events_per_session - 2.0).abs() < f64::EPSILON);
        assert_eq!(summary.event_types[0].event_type, "page_view");
        assert_eq!(summary.event_types[0].percentage, 75);
    }

    #[test]
    fn test_top_products_skip_deleted_products() {
        let kept = ProductId::generate();
        let deleted = ProductId::generate();
        let mut events = Vec::new();
        for product in [kept, kept, deleted] {
            let mut e = event(EventKind::ProductView, "s", 1);
            e.product_id = Some(product);
            events.push(e);
        }
        let names = HashMap::from([(kept, "Neon Lamp".to_string())]);

        let summary = DashboardSummary::build(&events, &[], &names);

        assert_eq!(summary.top_products.len(), 1);
        assert_eq!(summary.top_products[0].views, 2);
    }

    #[test]
    fn test_empty_inputs() {
        let summary = DashboardSummary::build(&[], &[], &HashMap::new());
        assert_eq!(summary.total_sessions, 0);
        assert!(summary.avg_events_per_session.abs() < f64::EPSILON);
        assert_eq!(summary.order_stats, OrderStats::default());
    }

    #[test]
    fn test_search_event_records_query_and_results() {
        let e = NewAnalyticsEvent::search("lava lamp", 4);
        assert_eq!(e.event_type, "search");
        assert_eq!(e.metadata["query"], "lava lamp");
        assert_eq!(e.metadata["results_count"], 4);
    }

    #[test]
    fn test_event_builders_fill_metadata() {
        let product = ProductId::generate();
        let e = NewAnalyticsEvent::add_to_cart(product, 3).with_session("s1");
        assert_eq!(e.event_type, "add_to_cart");
        assert_eq!(e.product_id, Some(product));
        assert_eq!(e.metadata["quantity"], 3);
        assert_eq!(e.session_id.as_deref(), Some("s1"));
    }
}
