//! Live status subscriptions over SSE.
//!
//! GET /api/events?owner_id= delivers one full snapshot immediately, then
//! one per state change. A lagged client gets a fresh full snapshot instead of the
//! missed backlog; disconnecting drops the receiver and the hub prunes the
//! channel on a later publish.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use fetchd_core::registry::StatusSnapshot;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    owner_id: Option<String>,
}

async fn events(
    State(state): State<Arc<AppState>>,
    Query(q): Query<EventsQuery>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let owner_id = q
        .owner_id
        .filter(|o| !o.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing required field: owner_id".to_string()))?;

    let mut rx = state.hub.subscribe(&owner_id);
    let registry = Arc::clone(&state.registry);
    tracing::debug!(owner = %owner_id, "events subscription opened");

    let stream = async_stream::stream! {
        let initial = registry.snapshot(Some(&owner_id));
        yield Ok(snapshot_event(&initial));
        loop {
            match rx.recv().await {
                Ok(snapshot) => yield Ok(snapshot_event(&snapshot)),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(owner = %owner_id, skipped, "subscriber lagged; resending full snapshot");
                    let snapshot = registry.snapshot(Some(&owner_id));
                    yield Ok(snapshot_event(&snapshot));
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn snapshot_event(snapshot: &StatusSnapshot) -> Event {
    Event::default().data(serde_json::to_string(snapshot).unwrap_or_else(|_| "{}".to_string()))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/events", get(events))
}
