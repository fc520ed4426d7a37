//! Theme route handlers.
//!
//! The chosen preference is saved in the HTTP session under the `theme` key,
//! so it survives client-session expiry and sign-out.

use axum::Json;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use neonmart_core::theme::{SystemTheme, Theme, ThemePreference};

use crate::error::{AppError, Result};
use crate::middleware::{Client, save_theme, saved_theme};

/// Theme state as returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeView {
    pub current_theme: Theme,
    pub system_theme: SystemTheme,
    /// Saved preference; `None` when the shopper never picked one.
    pub preference: Option<ThemePreference>,
}

/// Set theme request body.
#[derive(Debug, Deserialize)]
pub struct SetThemeRequest {
    /// A theme name or `system`.
    pub theme: String,
}

/// System preference report body.
#[derive(Debug, Deserialize)]
pub struct SystemThemeRequest {
    pub system_theme: SystemTheme,
}

/// Current theme.
#[instrument(skip(session, client))]
pub async fn show(session: Session, Client(client): Client) -> Result<Json<ThemeView>> {
    let preference = saved_theme(&session).await?;
    let theme = client.lock().await.theme;

    Ok(Json(ThemeView {
        current_theme: theme.current_theme,
        system_theme: theme.system_theme,
        preference,
    }))
}

/// Choose a theme, or choose to follow the system.
#[instrument(skip(session, client))]
pub async fn set(
    session: Session,
    Client(client): Client,
    Json(request): Json<SetThemeRequest>,
) -> Result<Json<ThemeView>> {
    let preference = ThemePreference::from_stored(&request.theme)
        .ok_or_else(|| AppError::BadRequest(format!("unknown theme: {}", request.theme)))?;

    save_theme(&session, preference).await?;

    let theme = {
        let mut state = client.lock().await;
        state.theme.apply_preference(preference);
        state.theme
    };
    tracing::debug!(theme = %theme.current_theme, "Theme changed");

    Ok(Json(ThemeView {
        current_theme: theme.current_theme,
        system_theme: theme.system_theme,
        preference: Some(preference),
    }))
}

/// Record a change in the OS preference.
///
/// The active theme follows only when no explicit theme is saved.
#[instrument(skip(session, client))]
pub async fn report_system(
    session: Session,
    Client(client): Client,
    Json(request): Json<SystemThemeRequest>,
) -> Result<Json<ThemeView>> {
    let preference = saved_theme(&session).await?;

    let theme = {
        let mut state = client.lock().await;
        state.theme.follow_system(preference, request.system_theme);
        state.theme
    };

    Ok(Json(ThemeView {
        current_theme: theme.current_theme,
        system_theme: theme.system_theme,
        preference,
    }))
}
