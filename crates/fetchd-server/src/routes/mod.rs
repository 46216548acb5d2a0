//! HTTP routes for the job API.

mod events;
mod jobs;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new().merge(jobs::router()).merge(events::router())
}
