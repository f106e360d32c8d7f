use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{info, warn};

use crate::assets;
use crate::dns::DnsConfig;
use crate::error::{Result, ShrineError};

/// Resolution label -> downloader format selector, in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatMap(Vec<(String, String)>);

impl FormatMap {
    pub fn new(entries: Vec<(String, String)>) -> Self {
        Self(entries)
    }

    pub fn resolutions(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(res, _)| res.as_str())
    }

    pub fn get(&self, resolution: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(res, _)| res == resolution)
            .map(|(_, selector)| selector.as_str())
    }

    /// Unknown resolutions fall back to the tool's own "best"
    pub fn selector_for(&self, resolution: &str) -> &str {
        self.get(resolution).unwrap_or("best")
    }
}

impl<'de> Deserialize<'de> for FormatMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct FormatMapVisitor;

        impl<'de> Visitor<'de> for FormatMapVisitor {
            type Value = FormatMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of resolution to format selector")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<FormatMap, A::Error> {
                let mut entries = Vec::new();
                while let Some((res, selector)) = map.next_entry::<String, String>()? {
                    entries.push((res, selector));
                }
                Ok(FormatMap(entries))
            }
        }

        deserializer.deserialize_map(FormatMapVisitor)
    }
}

impl Serialize for FormatMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(k, v)| (k, v)))
    }
}

/// Contents of `video_config.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    pub format_map: FormatMap,
    pub fragment_retries: u32,
    pub concurrent_fragments: u32,
    pub merge_format: String,
    /// Explicit downloader binary; otherwise looked up next to the executable or on PATH
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yt_dlp_path: Option<PathBuf>,
}

impl VideoConfig {
    pub fn bundled() -> Result<Self> {
        let bytes = assets::bundled(assets::VIDEO_CONFIG)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Reads `path` as JSON, falling back to the embedded copy of `asset`
/// when the file does not exist. A file that exists but does not parse
/// is an error rather than being silently replaced.
pub fn load_json_or_bundled<T>(path: &Path, asset: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let bytes = if path.exists() {
        std::fs::read(path)?
    } else {
        warn!(path = %path.display(), "config file missing, using bundled default");
        assets::bundled(asset)?
    };
    serde_json::from_slice(&bytes).map_err(|e| ShrineError::InvalidConfig {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

/// Everything read from the working directory at startup
#[derive(Debug, Clone)]
pub struct Settings {
    pub config_dir: PathBuf,
    pub video: VideoConfig,
    pub dns: DnsConfig,
    pub output_dir: PathBuf,
}

impl Settings {
    pub fn load(config_dir: &Path) -> Result<Self> {
        let video = load_json_or_bundled(&config_dir.join(assets::VIDEO_CONFIG), assets::VIDEO_CONFIG)?;
        let dns = DnsConfig::load(&config_dir.join(assets::DNS_CONFIG))?;
        let output_dir = config_dir.join("downloads");
        std::fs::create_dir_all(&output_dir)?;
        let output_dir = std::fs::canonicalize(&output_dir).unwrap_or(output_dir);
        info!(output_dir = %output_dir.display(), "settings loaded");
        Ok(Self {
            config_dir: config_dir.to_path_buf(),
            video,
            dns,
            output_dir,
        })
    }

    pub fn languages_path(&self) -> PathBuf {
        self.config_dir.join(assets::LANGUAGES)
    }

    pub fn dns_path(&self) -> PathBuf {
        self.config_dir.join(assets::DNS_CONFIG)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_map_keeps_file_order() {
        let cfg: VideoConfig = serde_json::from_str(
            r#"{
                "format_map": {"1080p": "f1080", "360p": "f360", "720p": "f720"},
                "fragment_retries": 3,
                "concurrent_fragments": 2,
                "merge_format": "mkv"
            }"#,
        )
        .unwrap();
        let order: Vec<&str> = cfg.format_map.resolutions().collect();
        assert_eq!(order, vec!["1080p", "360p", "720p"]);
        assert_eq!(cfg.format_map.selector_for("360p"), "f360");
        assert_eq!(cfg.format_map.selector_for("4320p"), "best");
        assert!(cfg.yt_dlp_path.is_none());
    }

    #[test]
    fn bundled_config_has_resolutions() {
        let cfg = VideoConfig::bundled().unwrap();
        assert!(cfg.format_map.resolutions().count() > 0);
        assert_eq!(cfg.merge_format, "mp4");
    }

    #[test]
    fn missing_files_fall_back_to_bundled() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(dir.path()).unwrap();
        assert!(settings.output_dir.is_dir());
        assert_eq!(settings.dns.dns_server, "1.1.1.1");
        assert_eq!(settings.video.fragment_retries, 10);
    }

    #[test]
    fn broken_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("video_config.json"), "{ nope").unwrap();
        let err = Settings::load(dir.path()).unwrap_err();
        assert!(matches!(err, ShrineError::InvalidConfig { .. }));
    }

    #[test]
    fn save_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("video_config.json");
        let cfg = VideoConfig::bundled().unwrap();
        save_json(&path, &cfg).unwrap();
        let back: VideoConfig = load_json_or_bundled(&path, assets::VIDEO_CONFIG).unwrap();
        assert_eq!(back.format_map, cfg.format_map);
    }
}
