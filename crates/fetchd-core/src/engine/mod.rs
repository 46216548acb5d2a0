//! Boundary to the external media-extraction engine.
//!
//! The engine is an opaque capability: give it a URL, a format selector,
//! and a destination, and it either produces an artifact with a title and
//! size or fails. It may take seconds to minutes and may fail for reasons
//! outside this system's control.

pub mod ytdlp;

pub use ytdlp::YtDlpEngine;

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use thiserror::Error;

/// One engine invocation: resolve `url` with `selector` and fetch the
/// artifact into `dest_dir`.
#[derive(Debug, Clone)]
pub struct FetchSpec {
    pub url: String,
    pub selector: String,
    pub extra_args: Vec<String>,
    pub dest_dir: PathBuf,
}

/// Engine-reported result of a successful fetch.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub title: String,
    pub byte_size: i64,
    pub final_path: PathBuf,
}

/// Engine failures, split so operators can tell "bad input" from "system
/// problem": `Rejected` becomes a terminal `failed` job, `Infra` a terminal
/// `error`.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine refused the input (unsupported site, geo-block, format
    /// unavailable).
    #[error("{0}")]
    Rejected(String),
    /// The engine could not be run, or its output could not be used.
    #[error("{0}")]
    Infra(String),
}

pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Fetched, EngineError>> + Send + 'a>>;

pub trait MediaEngine: Send + Sync {
    fn fetch(&self, spec: FetchSpec) -> FetchFuture<'_>;
}
