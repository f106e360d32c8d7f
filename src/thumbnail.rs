//! Module for downloading and decoding video thumbnails for the queue table.

use crate::error::Result;

/// Largest box a thumbnail is scaled into, matching the queue row height
pub const THUMB_WIDTH: u32 = 160;
pub const THUMB_HEIGHT: u32 = 90;

/// Decoded RGBA pixels ready to upload as a texture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub size: [usize; 2],
    pub rgba: Vec<u8>,
}

/// Blocking: call from `spawn_blocking`, never from the UI thread.
pub fn fetch_thumbnail(url: &str) -> Result<Thumbnail> {
    let bytes = reqwest::blocking::get(url)?.error_for_status()?.bytes()?;
    decode_thumbnail(&bytes)
}

/// Decodes any supported image and fits it inside 160x90, keeping aspect ratio
pub fn decode_thumbnail(bytes: &[u8]) -> Result<Thumbnail> {
    let img = image::load_from_memory(bytes)?
        .thumbnail(THUMB_WIDTH, THUMB_HEIGHT)
        .to_rgba8();
    let size = [img.width() as usize, img.height() as usize];
    Ok(Thumbnail {
        size,
        rgba: img.into_raw(),
    })
}
