use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8081;
const DEFAULT_DOWNLOAD_DIR: &str = "./downloads";
const DEFAULT_WORKERS: usize = 4;
const DEFAULT_QUEUE_CAPACITY: usize = 256;
const DEFAULT_RETENTION_HOURS: u64 = 3;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;
const DEFAULT_YTDLP_BIN: &str = "yt-dlp";

/// Runtime configuration, read from the process environment with built-in
/// defaults so the service starts with no environment at all.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Directory the engine writes artifacts into; served under `/downloads`.
    pub download_dir: PathBuf,
    /// Job database path. `None` selects the XDG state dir default.
    pub database: Option<PathBuf>,
    /// Absolute prefix for output refs (e.g. behind a reverse proxy).
    pub public_base_url: Option<String>,
    /// Maximum downloads in flight at once.
    pub workers: usize,
    /// Bound on the submit queue between the API and the worker pool.
    pub queue_capacity: usize,
    /// How long terminal jobs and their artifacts are kept.
    pub retention: Duration,
    /// How often the janitor sweeps.
    pub sweep_interval: Duration,
    /// Extraction engine binary.
    pub ytdlp_bin: String,
    /// Extra arguments appended to every engine invocation.
    pub ytdlp_args: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            database: None,
            public_base_url: None,
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            retention: Duration::from_secs(DEFAULT_RETENTION_HOURS * 3600),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            ytdlp_bin: DEFAULT_YTDLP_BIN.to_string(),
            ytdlp_args: Vec::new(),
        }
    }
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with an injectable lookup, so tests never
    /// mutate the process environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Config::default();
        let retention_hours = parse_or(get("RETENTION_HOURS"), "RETENTION_HOURS", DEFAULT_RETENTION_HOURS);
        let sweep_secs = parse_or(
            get("SWEEP_INTERVAL_SECS"),
            "SWEEP_INTERVAL_SECS",
            DEFAULT_SWEEP_INTERVAL_SECS,
        );
        Config {
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_or(get("PORT"), "PORT", DEFAULT_PORT),
            download_dir: get("DOWNLOAD_DIR").map(PathBuf::from).unwrap_or(defaults.download_dir),
            database: get("DATABASE").map(PathBuf::from),
            public_base_url: get("PUBLIC_BASE_URL").filter(|s| !s.is_empty()),
            workers: parse_or(get("WORKERS"), "WORKERS", DEFAULT_WORKERS).max(1),
            queue_capacity: parse_or(get("QUEUE_CAPACITY"), "QUEUE_CAPACITY", DEFAULT_QUEUE_CAPACITY).max(1),
            retention: Duration::from_secs(retention_hours.saturating_mul(3600)),
            sweep_interval: Duration::from_secs(sweep_secs.max(1)),
            ytdlp_bin: get("YTDLP_BIN").unwrap_or(defaults.ytdlp_bin),
            ytdlp_args: get("YTDLP_ARGS")
                .map(|s| s.split_whitespace().map(String::from).collect())
                .unwrap_or_default(),
        }
    }
}

/// Parse an environment value, warning and falling back on garbage.
fn parse_or<T: std::str::FromStr + Copy>(value: Option<String>, key: &str, default: T) -> T {
    match value {
        None => default,
        Some(s) => s.parse().unwrap_or_else(|_| {
            tracing::warn!("invalid {key} value {s:?}, using default");
            default
        }),
    }
}
