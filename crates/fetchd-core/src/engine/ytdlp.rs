//! `yt-dlp` subprocess engine.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;

use super::{EngineError, FetchFuture, FetchSpec, Fetched, MediaEngine};

/// Browser user agent sent with every invocation; some hosts serve
/// different formats to unknown clients.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.36";

pub struct YtDlpEngine {
    bin: String,
    default_args: Vec<String>,
}

impl YtDlpEngine {
    pub fn new(bin: impl Into<String>, default_args: Vec<String>) -> Self {
        Self {
            bin: bin.into(),
            default_args,
        }
    }

    /// Argument list for one invocation. Split out so tests can check it
    /// without spawning the binary.
    fn invocation_args(&self, spec: &FetchSpec) -> Vec<String> {
        let mut args = vec![
            "--no-playlist".to_string(),
            "--no-simulate".to_string(),
            "--no-progress".to_string(),
            "--user-agent".to_string(),
            USER_AGENT.to_string(),
            "-f".to_string(),
            spec.selector.clone(),
            "-o".to_string(),
            format!("{}/%(title)s.%(ext)s", spec.dest_dir.display()),
            "--print".to_string(),
            "title".to_string(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
        ];
        args.extend(self.default_args.iter().cloned());
        args.extend(spec.extra_args.iter().cloned());
        args.push(spec.url.clone());
        args
    }

    async fn run(&self, spec: FetchSpec) -> Result<Fetched, EngineError> {
        // kill_on_drop: cancelling the fetch future must not leave the
        // subprocess downloading.
        let output = Command::new(&self.bin)
            .args(self.invocation_args(&spec))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| EngineError::Infra(format!("failed to launch {}: {}", self.bin, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::Rejected(rejection_detail(&stderr)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let (title, path) = parse_print_output(&stdout).ok_or_else(|| {
            EngineError::Infra("engine reported success but printed no file path".to_string())
        })?;

        let final_path = PathBuf::from(path);
        let byte_size = tokio::fs::metadata(&final_path)
            .await
            .map_err(|e| {
                EngineError::Infra(format!("artifact missing after fetch: {}: {}", final_path.display(), e))
            })?
            .len() as i64;

        Ok(Fetched {
            title: title.to_string(),
            byte_size,
            final_path,
        })
    }
}

impl MediaEngine for YtDlpEngine {
    fn fetch(&self, spec: FetchSpec) -> FetchFuture<'_> {
        Box::pin(self.run(spec))
    }
}

/// First printed line is the title (`--print title` runs before the
/// download), the last is the moved file path (`--print after_move:filepath`
/// runs after).
fn parse_print_output(stdout: &str) -> Option<(&str, &str)> {
    let lines: Vec<&str> = stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    match lines.as_slice() {
        [] | [_] => None,
        [title, .., path] => Some((title, path)),
    }
}

/// Prefer the engine's own `ERROR:` line; fall back to the last stderr line.
fn rejection_detail(stderr: &str) -> String {
    if let Some(line) = stderr.lines().rev().find(|l| l.contains("ERROR:")) {
        return line.trim().to_string();
    }
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        "engine exited with a failure status".to_string()
    } else {
        trimmed.lines().last().unwrap_or(trimmed).trim().to_string()
    }
}
