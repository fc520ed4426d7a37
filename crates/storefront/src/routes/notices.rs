//! Pending notice handler.

use axum::Json;

use crate::middleware::Client;
use crate::services::notices::Notice;

/// Drain pending notices for this client, oldest first.
pub async fn drain(Client(client): Client) -> Json<Vec<Notice>> {
    Json(client.notices().drain())
}
