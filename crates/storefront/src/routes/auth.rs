//! Sign-in and sign-out.
//!
//! The browser signs in with the hosted identity service and posts the
//! resulting access token here. The storefront verifies it, loads the profile,
//! and keeps a [`CurrentUser`] in the HTTP session.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use neonmart_core::analytics::NewAnalyticsEvent;

use crate::db::RepositoryError;
use crate::db::profiles::ProfileRepository;
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{Client, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::state::AppState;

/// Sign-in request body.
#[derive(Deserialize)]
pub struct SignInRequest {
    pub access_token: String,
}

impl std::fmt::Debug for SignInRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignInRequest")
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Exchange an identity-service access token for a storefront session.
#[instrument(skip(state, session, client, request))]
pub async fn sign_in(
    State(state): State<AppState>,
    session: Session,
    Client(client): Client,
    Json(request): Json<SignInRequest>,
) -> Result<Json<CurrentUser>> {
    let identity = state.identity().get_user(&request.access_token).await?;

    let profile = ProfileRepository::new(state.pool())
        .get(identity.id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => {
                AppError::Unauthorized("no profile for this account".to_string())
            }
            other => AppError::Database(other),
        })?;

    let user = CurrentUser {
        id: profile.id,
        email: identity.email.or(profile.email),
        role: profile.role,
    };

    // New session ID on privilege change
    session.cycle_id().await?;
    set_current_user(&session, &user).await?;
    set_sentry_user(&user.id, user.email.as_deref());
    tracing::info!(user_id = %user.id, "User signed in");

    state.carts().load(&client, user.id).await;
    state.analytics().track(
        NewAnalyticsEvent::user_login()
            .with_user(Some(user.id))
            .with_session(client.id().to_string()),
    );

    Ok(Json(user))
}

/// Sign out. The cart is cleared locally; stored lines remain for next time.
#[instrument(skip(state, session, client))]
pub async fn sign_out(
    State(state): State<AppState>,
    session: Session,
    Client(client): Client,
) -> Result<StatusCode> {
    state.carts().sign_out(&client).await;
    clear_current_user(&session).await?;
    clear_sentry_user();
    tracing::info!(client_id = %client.id(), "User signed out");

    Ok(StatusCode::NO_CONTENT)
}
