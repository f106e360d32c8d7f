use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::command::metadata_args;
use crate::error::{Result, ShrineError};
use crate::process;

/// Upper bound on a single `--dump-json` lookup
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(120);

/// The subset of the tool's JSON dump shown in the queue
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VideoInfo {
    #[serde(default = "unknown_title")]
    pub title: String,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

fn unknown_title() -> String {
    "N/A".to_string()
}

impl VideoInfo {
    /// First JSON object in the tool's output. Pretty-printed dumps and
    /// one-object-per-line playlist output both work.
    pub fn parse(stdout: &[u8]) -> Result<Self> {
        serde_json::Deserializer::from_slice(stdout)
            .into_iter::<VideoInfo>()
            .next()
            .ok_or_else(|| ShrineError::InvalidMetadata("empty output".to_string()))?
            .map_err(|e| ShrineError::InvalidMetadata(e.to_string()))
    }

    pub fn resolution_label(&self) -> String {
        let part = |v: Option<u32>| v.map(|n| n.to_string()).unwrap_or_else(|| "N/A".to_string());
        format!("{}x{}", part(self.width), part(self.height))
    }

    pub fn duration_label(&self) -> String {
        format_duration(self.duration.unwrap_or(0.0))
    }
}

/// `1h 2m 3s`, or `2m 3s` under an hour
pub fn format_duration(secs: f64) -> String {
    let total = if secs.is_finite() && secs > 0.0 { secs as u64 } else { 0 };
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    if h > 0 {
        format!("{h}h {m}m {s}s")
    } else {
        format!("{m}m {s}s")
    }
}

pub async fn fetch_video_info(ytdlp: &Path, url: &str) -> Result<VideoInfo> {
    info!(url, "fetching metadata");
    let output = tokio::time::timeout(
        METADATA_TIMEOUT,
        process::command(ytdlp)
            .args(metadata_args(url))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output(),
    )
    .await
    .map_err(|_| ShrineError::Timeout(METADATA_TIMEOUT.as_secs()))??;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(ShrineError::ToolFailed {
            tool: ytdlp.display().to_string(),
            code: output.status.code(),
            stderr,
        });
    }

    let info = VideoInfo::parse(&output.stdout)?;
    debug!(title = %info.title, "metadata parsed");
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_format_like_the_preview_panel() {
        assert_eq!(format_duration(0.0), "0m 0s");
        assert_eq!(format_duration(59.9), "0m 59s");
        assert_eq!(format_duration(212.0), "3m 32s");
        assert_eq!(format_duration(3723.0), "1h 2m 3s");
        assert_eq!(format_duration(f64::NAN), "0m 0s");
    }

    #[test]
    fn parses_dump_json_with_defaults() {
        let info = VideoInfo::parse(
            br#"{"id": "abc", "title": "Clip", "duration": 61, "width": 1280, "height": 720,
                 "thumbnail": "https://i.example/abc.jpg", "formats": []}"#,
        )
        .unwrap();
        assert_eq!(info.title, "Clip");
        assert_eq!(info.resolution_label(), "1280x720");
        assert_eq!(info.duration_label(), "1m 1s");
        assert_eq!(info.thumbnail.as_deref(), Some("https://i.example/abc.jpg"));

        let bare = VideoInfo::parse(b"{}\n").unwrap();
        assert_eq!(bare.title, "N/A");
        assert_eq!(bare.resolution_label(), "N/AxN/A");
        assert!(bare.thumbnail.is_none());
    }

    #[test]
    fn first_object_of_a_playlist_dump_wins() {
        let out = b"{\"title\": \"One\"}\n{\"title\": \"Two\"}\n";
        assert_eq!(VideoInfo::parse(out).unwrap().title, "One");

        let pretty = b"{\n  \"title\": \"Spread\",\n  \"width\": 640\n}\n";
        let info = VideoInfo::parse(pretty).unwrap();
        assert_eq!(info.title, "Spread");
        assert_eq!(info.width, Some(640));
    }

    #[test]
    fn garbage_is_invalid_metadata() {
        assert!(matches!(
            VideoInfo::parse(b"ERROR: Unsupported URL"),
            Err(ShrineError::InvalidMetadata(_))
        ));
        assert!(matches!(
            VideoInfo::parse(b"  \n"),
            Err(ShrineError::InvalidMetadata(_))
        ));
    }

    #[tokio::test]
    async fn missing_binary_is_io_error() {
        let err = fetch_video_info(Path::new("/definitely/not/here/yt-dlp"), "https://x")
            .await
            .unwrap_err();
        assert!(matches!(err, ShrineError::Io(_)));
    }
}
