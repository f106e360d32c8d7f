use rust_embed::RustEmbed;

use crate::error::{Result, ShrineError};

/// Default config files and language packs shipped inside the binary
#[derive(RustEmbed)]
#[folder = "assets/"]
pub struct Asset;

pub const VIDEO_CONFIG: &str = "video_config.json";
pub const DNS_CONFIG: &str = "dns_config.json";
pub const LANGUAGES: &str = "languages.json";

pub fn bundled(name: &str) -> Result<Vec<u8>> {
    Asset::get(name)
        .map(|file| file.data.into_owned())
        .ok_or_else(|| ShrineError::MissingAsset(name.to_string()))
}
