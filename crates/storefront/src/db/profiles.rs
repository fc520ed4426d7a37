//! Profile repository.

use sqlx::PgPool;

use neonmart_core::UserId;

use super::{RepositoryError, exactly_one};
use crate::models::profile::Profile;

/// Repository for profile database operations.
pub struct ProfileRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProfileRepository<'a> {
    /// Create a new profile repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the profile for an identity-service user.
    ///
    /// Exactly one row must exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no profile exists.
    /// Returns `RepositoryError::DataCorruption` if more than one row matches.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: UserId) -> Result<Profile, RepositoryError> {
        // LIMIT 2 is enough to tell "one" from "many".
        let rows = sqlx::query_as::<_, Profile>(
            r"
            SELECT id, email, full_name, avatar_url, role, created_at, updated_at
            FROM profiles
            WHERE id = $1
            LIMIT 2
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        exactly_one(rows, "profile")
    }
}
