use std::io::Cursor;
use std::path::PathBuf;

use image::{imageops, ImageReader, RgbaImage};
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// Decodes image bytes to RGBA8 and applies the EXIF orientation if the
/// container carries one. Missing or unreadable metadata keeps the pixels
/// as stored.
pub fn decode_photo(bytes: &[u8]) -> Result<RgbaImage> {
    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?;
    let img = img.to_rgba8();
    let orientation = read_orientation(bytes).unwrap_or(1);
    Ok(apply_orientation(img, orientation))
}

/// Reads and decodes a photo off the async runtime.
pub async fn load_file(path: PathBuf) -> Result<RgbaImage> {
    let bytes = tokio::fs::read(&path).await?;
    debug!(path = %path.display(), bytes = bytes.len(), "photo read");
    tokio::task::spawn_blocking(move || decode_photo(&bytes))
        .await
        .map_err(|err| Error::Render(anyhow::anyhow!("decode task failed: {err}")))?
}

pub fn apply_orientation(img: RgbaImage, orientation: u16) -> RgbaImage {
    match orientation {
        2 => imageops::flip_horizontal(&img),
        3 => imageops::rotate180(&img),
        4 => imageops::flip_vertical(&img),
        // transpose
        5 => imageops::flip_horizontal(&imageops::rotate90(&img)),
        6 => imageops::rotate90(&img),
        // transverse
        7 => imageops::flip_horizontal(&imageops::rotate270(&img)),
        8 => imageops::rotate270(&img),
        _ => img,
    }
}

fn read_orientation(bytes: &[u8]) -> Option<u16> {
    let mut cursor = Cursor::new(bytes);
    let exif = exif::Reader::new().read_from_container(&mut cursor).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let orientation = field.value.get_uint(0)? as u16;
    trace!(orientation, "exif orientation");
    Some(orientation)
}
