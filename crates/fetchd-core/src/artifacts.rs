//! Servable references for produced artifacts and their filesystem mapping.

use std::path::{Path, PathBuf};

/// Public URL prefix under which the download directory is served.
pub const PUBLIC_PREFIX: &str = "/downloads";

/// Servable reference for an artifact at `final_path` under `download_dir`.
/// Returns `None` when the engine wrote outside the download dir.
pub fn output_ref(download_dir: &Path, final_path: &Path, public_base_url: Option<&str>) -> Option<String> {
    let rel = final_path.strip_prefix(download_dir).ok()?;
    let rel = rel.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/");
    Some(match public_base_url {
        Some(base) => format!("{}{}/{}", base.trim_end_matches('/'), PUBLIC_PREFIX, rel),
        None => format!("{}/{}", PUBLIC_PREFIX, rel),
    })
}

/// Filesystem path for a stored output ref, used when deleting artifacts.
/// Returns `None` for refs that don't point under the public prefix or that
/// would escape the download dir.
pub fn artifact_path(download_dir: &Path, output_ref: &str) -> Option<PathBuf> {
    let marker = format!("{}/", PUBLIC_PREFIX);
    let start = output_ref.find(&marker)?;
    let rel = &output_ref[start + marker.len()..];
    if rel.is_empty() || rel.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
        return None;
    }
    Some(download_dir.join(rel))
}
