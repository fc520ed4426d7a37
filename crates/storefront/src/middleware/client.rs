//! Client session extractor.
//!
//! Binds the browser's HTTP session to its [`ClientSession`] in the registry,
//! creating both on first contact. A new client session starts from the saved
//! theme preference and the `Sec-CH-Prefers-Color-Scheme` client hint.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use tower_sessions::Session;

use neonmart_core::ClientId;
use neonmart_core::theme::{SystemTheme, ThemePreference, ThemeState};

use crate::error::AppError;
use crate::models::{CurrentUser, session_keys};
use crate::services::client::ClientSession;
use crate::state::AppState;

/// Client hint header carrying the OS light/dark preference.
pub const COLOR_SCHEME_HINT: &str = "sec-ch-prefers-color-scheme";

/// Extractor for the request's client session.
///
/// When a user is signed in, the cart is hydrated for them if it has not been
/// already (first request after sign-in or after the client session expired).
pub struct Client(pub Arc<ClientSession>);

impl FromRequestParts<AppState> for Client {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer not installed".to_string()))?;

        let client_id = match session.get::<ClientId>(session_keys::CLIENT_ID).await? {
            Some(id) => id,
            None => {
                let id = ClientId::generate();
                session.insert(session_keys::CLIENT_ID, id).await?;
                tracing::debug!(client_id = %id, "Created client session");
                id
            }
        };

        let saved = saved_theme(&session).await?;
        let system = system_theme_hint(&parts.headers).unwrap_or_default();
        let client = state
            .clients()
            .get_or_create(client_id, move || ThemeState::initial(saved, system))
            .await;

        if let Some(user) = session
            .get::<CurrentUser>(session_keys::CURRENT_USER)
            .await?
        {
            state.carts().ensure_loaded(&client, user.id).await;
        }

        Ok(Self(client))
    }
}

/// The theme preference saved in the session.
///
/// Unknown stored values are treated as no preference.
///
/// # Errors
///
/// Returns an error if the session store cannot be read.
pub async fn saved_theme(
    session: &Session,
) -> Result<Option<ThemePreference>, tower_sessions::session::Error> {
    let raw = session.get::<String>(session_keys::THEME).await?;
    Ok(raw.as_deref().and_then(ThemePreference::from_stored))
}

/// Persist a theme preference in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn save_theme(
    session: &Session,
    preference: ThemePreference,
) -> Result<(), tower_sessions::session::Error> {
    session
        .insert(session_keys::THEME, preference.as_stored())
        .await
}

/// Read the OS preference from the client hint, if the browser sent one.
#[must_use]
pub fn system_theme_hint(headers: &HeaderMap) -> Option<SystemTheme> {
    headers
        .get(COLOR_SCHEME_HINT)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| SystemTheme::from_color_scheme(v.trim().trim_matches('"')))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_system_theme_hint() {
        let mut headers = HeaderMap::new();
        assert_eq!(system_theme_hint(&headers), None);

        headers.insert(COLOR_SCHEME_HINT, HeaderValue::from_static("\"dark\""));
        assert_eq!(system_theme_hint(&headers), Some(SystemTheme::Dark));

        headers.insert(COLOR_SCHEME_HINT, HeaderValue::from_static("light"));
        assert_eq!(system_theme_hint(&headers), Some(SystemTheme::Light));

        headers.insert(COLOR_SCHEME_HINT, HeaderValue::from_static("\"no-preference\""));
        assert_eq!(system_theme_hint(&headers), None);
    }
}
