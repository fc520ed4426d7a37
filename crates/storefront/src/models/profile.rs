//! Profile domain type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use neonmart_core::{UserId, UserRole};

/// Storefront profile for an identity-service user.
///
/// The row ID is the identity-service user ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub id: UserId,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
