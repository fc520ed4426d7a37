//! Dashboard aggregation over a day of storefront traffic.

use std::collections::HashMap;

use chrono::{DateTime, Duration, TimeZone, Utc};

use neonmart_core::analytics::{AnalyticsEvent, DashboardSummary, NewAnalyticsEvent, OrderSummary};
use neonmart_core::{AnalyticsEventId, OrderId, OrderStatus, PaymentStatus, Price, ProductId, UserId};

fn recorded(event: NewAnalyticsEvent, at: DateTime<Utc>) -> AnalyticsEvent {
    AnalyticsEvent {
        id: AnalyticsEventId::generate(),
        event_type: event.event_type,
        user_id: event.user_id,
        product_id: event.product_id,
        session_id: event.session_id,
        metadata: event.metadata,
        created_at: at,
    }
}

fn order(status: OrderStatus, payment: PaymentStatus, cents: i64, at: DateTime<Utc>) -> OrderSummary {
    OrderSummary {
        id: OrderId::generate(),
        status,
        payment_status: payment,
        total_amount: Price::from_cents(cents),
        created_at: at,
    }
}

#[test]
fn test_day_of_traffic() {
    let morning = Utc.with_ymd_and_hms(2026, 10, 14, 9, 0, 0).unwrap();
    let next_day = morning + Duration::days(1);

    let lamp = ProductId::generate();
    let sign = ProductId::generate();
    let deleted = ProductId::generate();
    let names = HashMap::from([
        (lamp, "Neon Lamp".to_string()),
        (sign, "Open Sign".to_string()),
    ]);

    let alice = UserId::generate();
    let bob = UserId::generate();

    let events = vec![
        recorded(NewAnalyticsEvent::page_view("/").with_session("s1"), morning),
        recorded(
            NewAnalyticsEvent::user_login()
                .with_user(Some(alice))
                .with_session("s1"),
            morning,
        ),
        recorded(
            NewAnalyticsEvent::product_view(lamp)
                .with_user(Some(alice))
                .with_session("s1"),
            morning,
        ),
        recorded(
            NewAnalyticsEvent::add_to_cart(lamp, 2)
                .with_user(Some(alice))
                .with_session("s1"),
            morning,
        ),
        recorded(NewAnalyticsEvent::page_view("/").with_session("s2"), next_day),
        recorded(
            NewAnalyticsEvent::product_view(lamp)
                .with_user(Some(bob))
                .with_session("s2"),
            next_day,
        ),
        recorded(
            NewAnalyticsEvent::product_view(sign)
                .with_user(Some(bob))
                .with_session("s2"),
            next_day,
        ),
        recorded(NewAnalyticsEvent::product_view(deleted).with_session("s2"), next_day),
    ];

    let orders = vec![
        order(OrderStatus::Processing, PaymentStatus::Paid, 9998, morning),
        order(OrderStatus::Delivered, PaymentStatus::Pending, 12000, morning),
        order(OrderStatus::Pending, PaymentStatus::Pending, 4999, next_day),
        order(OrderStatus::Cancelled, PaymentStatus::Refunded, 4999, next_day),
    ];

    let summary = DashboardSummary::build(&events, &orders, &names);

    assert_eq!(summary.total_events, 8);
    assert_eq!(summary.unique_users, 2);
    assert_eq!(summary.total_sessions, 2);
    assert!((summary.avg_events_per_session - 4.0).abs() < f64::EPSILON);

    assert_eq!(summary.daily_page_views.len(), 2);
    assert_eq!(summary.daily_page_views.get(&morning.date_naive()), Some(&1));

    let top: Vec<(&str, usize)> = summary
        .top_products
        .iter()
        .map(|p| (p.name.as_str(), p.views))
        .collect();
    assert_eq!(top, vec![("Neon Lamp", 2), ("Open Sign", 1)]);

    let views = summary.event_types.first().unwrap();
    assert_eq!(views.event_type, "product_view");
    assert_eq!(views.count, 4);
    assert_eq!(views.percentage, 50);

    assert_eq!(
        summary.daily_revenue.get(&morning.date_naive()),
        Some(&Price::from_cents(21998))
    );
    assert!(!summary.daily_revenue.contains_key(&next_day.date_naive()));

    assert_eq!(summary.order_stats.total, 4);
    assert_eq!(summary.order_stats.pending, 1);
    assert_eq!(summary.order_stats.cancelled, 1);
}

#[test]
fn test_quiet_period() {
    let summary = DashboardSummary::build(&[], &[], &HashMap::new());

    assert_eq!(summary.total_events, 0);
    assert_eq!(summary.total_sessions, 0);
    assert!(summary.avg_events_per_session.abs() < f64::EPSILON);
    assert!(summary.top_products.is_empty());
    assert!(summary.daily_revenue.is_empty());
}
