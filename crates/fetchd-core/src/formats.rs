//! Format/quality to engine-selector mapping. Pure lookup, no state.

/// Selector plus post-processing arguments for one (format, quality) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatPlan {
    pub selector: String,
    pub extra_args: Vec<String>,
}

impl FormatPlan {
    fn bare(selector: String) -> Self {
        Self {
            selector,
            extra_args: Vec::new(),
        }
    }
}

/// Map a submitted format/quality pair to an engine invocation plan.
///
/// Unknown combinations return `None`; the job then fails with a
/// descriptive detail instead of reaching the engine. Quality is ignored
/// for audio-only formats.
pub fn plan(format: &str, quality: &str) -> Option<FormatPlan> {
    match format {
        "mp4" => match parse_height(quality) {
            Some(h) => Some(FormatPlan::bare(format!(
                "bestvideo[height<={h}][ext=mp4]+bestaudio[ext=m4a]/best[height<={h}][ext=mp4]/best[height<={h}]"
            ))),
            None if quality == "best" => Some(FormatPlan::bare(
                "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best".to_string(),
            )),
            None => None,
        },
        "best" => match parse_height(quality) {
            Some(h) => Some(FormatPlan::bare(format!(
                "bestvideo[height<={h}]+bestaudio/best[height<={h}]"
            ))),
            None if quality == "best" => Some(FormatPlan::bare("bestvideo+bestaudio/best".to_string())),
            None => None,
        },
        "m4a" => Some(FormatPlan::bare("bestaudio[ext=m4a]/bestaudio/best".to_string())),
        "mp3" => Some(FormatPlan {
            selector: "bestaudio/best".to_string(),
            extra_args: vec!["-x".to_string(), "--audio-format".to_string(), "mp3".to_string()],
        }),
        _ => None,
    }
}

/// "720p" or "720" → 720. "best" and anything non-numeric → None.
fn parse_height(quality: &str) -> Option<u32> {
    quality.strip_suffix('p').unwrap_or(quality).parse().ok()
}
