//! Shared state for the HTTP layer, constructed in `main` and injected
//! everywhere. No ambient globals.

use std::path::PathBuf;
use std::sync::Arc;

use fetchd_core::executor::{CancelMap, Executor};
use fetchd_core::notify::NotificationHub;
use fetchd_core::registry::JobRegistry;

pub struct AppState {
    pub registry: Arc<JobRegistry>,
    pub hub: Arc<NotificationHub>,
    pub executor: Executor,
    pub cancels: Arc<CancelMap>,
    /// Root directory artifacts live under; served at `/downloads`.
    pub download_dir: PathBuf,
}
