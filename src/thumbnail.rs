use std::io::Cursor;

use image::imageops::FilterType;
use image::{ImageFormat, Rgba, RgbaImage};
use tracing::{debug, warn};

use crate::error::ThumbnailError;
use crate::logo::LogoCache;
use crate::metrics::THUMBNAIL_DECODE_FAILURES;
use crate::playlist::PlaylistEntry;

pub const THUMBNAIL_SIZE: u32 = 80;

pub type Thumbnail = RgbaImage;

pub fn decode(bytes: &[u8]) -> Result<Thumbnail, ThumbnailError> {
    if bytes.is_empty() {
        return Err(ThumbnailError::Empty);
    }
    let img = image::load_from_memory(bytes)?;
    Ok(img
        .resize_exact(THUMBNAIL_SIZE, THUMBNAIL_SIZE, FilterType::Triangle)
        .to_rgba8())
}

pub fn encode_png(thumbnail: &Thumbnail) -> Result<Vec<u8>, image::ImageError> {
    let mut out = Cursor::new(Vec::new());
    thumbnail.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// Shown in place of channels without a usable logo.
pub fn placeholder() -> Thumbnail {
    RgbaImage::from_pixel(THUMBNAIL_SIZE, THUMBNAIL_SIZE, Rgba([0x25, 0x25, 0x25, 0xff]))
}

/// Fetches the logo at `url` through the cache and decodes it. Does not
/// touch any playlist entry, so callers can run it without holding a lock.
pub fn load_thumbnail(logos: &LogoCache, url: &str) -> Result<Thumbnail, ThumbnailError> {
    let bytes = logos.fetch(url)?;
    decode(&bytes).inspect_err(|e| {
        THUMBNAIL_DECODE_FAILURES.inc();
        warn!("Logo {} is not a usable image: {}", url, e);
    })
}

/// Returns the entry's memoised thumbnail, fetching and decoding it on first use.
/// Failures are not remembered, the next call tries again.
pub fn get_thumbnail<'a>(
    entry: &'a mut PlaylistEntry,
    logos: &LogoCache,
) -> Result<&'a Thumbnail, ThumbnailError> {
    let thumbnail = match entry.thumbnail.take() {
        Some(thumbnail) => {
            debug!("Thumbnail for {} served from memory", entry.name());
            thumbnail
        }
        None => load_thumbnail(logos, entry.logo_url())?,
    };
    Ok(entry.thumbnail.insert(thumbnail))
}
