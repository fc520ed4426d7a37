//! Session-related types.
//!
//! Types stored in the session for authentication and client state.

use serde::{Deserialize, Serialize};

use neonmart_core::{UserId, UserRole};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Identity-service user ID (also the profile ID).
    pub id: UserId,
    /// User's email address, as reported by the identity service.
    pub email: Option<String>,
    /// Role from the profile row.
    pub role: UserRole,
}

impl CurrentUser {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current signed-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the client-session registry ID bound to this browser session.
    pub const CLIENT_ID: &str = "client_id";

    /// Key for the persisted theme preference.
    pub const THEME: &str = neonmart_core::theme::THEME_PREFERENCE_KEY;
}
