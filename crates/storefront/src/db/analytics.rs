//! Analytics event repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use neonmart_core::analytics::{AnalyticsEvent, NewAnalyticsEvent};
use neonmart_core::{AnalyticsEventId, ProductId, UserId};

use super::RepositoryError;

#[derive(sqlx::FromRow)]
struct AnalyticsEventRow {
    id: AnalyticsEventId,
    event_type: String,
    user_id: Option<UserId>,
    product_id: Option<ProductId>,
    session_id: Option<String>,
    metadata: sqlx::types::Json<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl From<AnalyticsEventRow> for AnalyticsEvent {
    fn from(row: AnalyticsEventRow) -> Self {
        Self {
            id: row.id,
            event_type: row.event_type,
            user_id: row.user_id,
            product_id: row.product_id,
            session_id: row.session_id,
            metadata: row.metadata.0,
            created_at: row.created_at,
        }
    }
}

/// Repository for analytics events.
#[derive(Clone)]
pub struct AnalyticsRepository {
    pool: PgPool,
}

impl AnalyticsRepository {
    /// Create a new analytics repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert an event.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(&self, event: &NewAnalyticsEvent) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO analytics_events (id, event_type, user_id, product_id, session_id, metadata)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(AnalyticsEventId::generate())
        .bind(&event.event_type)
        .bind(event.user_id)
        .bind(event.product_id)
        .bind(event.session_id.as_deref())
        .bind(sqlx::types::Json(&event.metadata))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// The newest `limit` events created at or after `since`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_recent(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<AnalyticsEvent>, RepositoryError> {
        let rows = sqlx::query_as::<_, AnalyticsEventRow>(
            r"
            SELECT id, event_type, user_id, product_id, session_id, metadata, created_at
            FROM analytics_events
            WHERE created_at >= $1
            ORDER BY created_at DESC, id
            LIMIT $2
            ",
        )
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AnalyticsEvent::from).collect())
    }
}
