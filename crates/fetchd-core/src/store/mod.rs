//! Persistent job table (SQLite via sqlx).
//!
//! One row per submitted download: owner, immutable inputs, lifecycle
//! status, and engine-reported results. Connection and migration live in
//! `db`; job CRUD lives in `jobs`.

pub mod db;
pub mod types;

mod jobs;

pub use db::*;
pub use types::*;
