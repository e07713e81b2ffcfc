use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use fast_image_resize as fir;
use image::{ImageReader, RgbaImage};
use tracing::debug;

/// Template artwork decoded once and resized on demand to the surface.
#[derive(Debug)]
pub struct FixedImage {
    label: String,
    source: Arc<RgbaImage>,
    cache: Mutex<Option<CachedImage>>,
}

#[derive(Debug)]
struct CachedImage {
    width: u32,
    height: u32,
    image: Arc<RgbaImage>,
}

impl FixedImage {
    pub fn open(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path).with_context(|| {
            format!("failed to read metadata for template image at {}", path.display())
        })?;
        anyhow::ensure!(
            metadata.is_file(),
            "template image path {} must point to a file",
            path.display()
        );

        let reader = ImageReader::open(path)
            .with_context(|| format!("failed to open template image at {}", path.display()))?
            .with_guessed_format()
            .context("failed to guess template image format")?;
        let image = reader
            .decode()
            .with_context(|| format!("failed to decode template image at {}", path.display()))?
            .to_rgba8();
        debug!(
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            "template image decoded"
        );
        Ok(Self::from_image(path.display().to_string(), image))
    }

    pub fn from_image(label: impl Into<String>, image: RgbaImage) -> Self {
        Self {
            label: label.into(),
            source: Arc::new(image),
            cache: Mutex::new(None),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Artwork stretched to exactly `width`×`height`, cached per size.
    pub fn canvas_for(&self, width: u32, height: u32) -> Result<Arc<RgbaImage>> {
        anyhow::ensure!(width > 0 && height > 0, "canvas dimensions must be positive");

        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = cache
            .as_ref()
            .filter(|cached| cached.width == width && cached.height == height)
        {
            return Ok(Arc::clone(&hit.image));
        }

        let prepared = Arc::new(resize_rgba(&self.source, width, height)?);
        *cache = Some(CachedImage {
            width,
            height,
            image: Arc::clone(&prepared),
        });
        Ok(prepared)
    }
}

pub fn resize_rgba(source: &RgbaImage, target_w: u32, target_h: u32) -> Result<RgbaImage> {
    if target_w == 0 || target_h == 0 {
        anyhow::bail!("resize dimensions must be positive");
    }
    if source.width() == target_w && source.height() == target_h {
        return Ok(source.clone());
    }

    let src_view = fir::images::ImageRef::new(
        source.width(),
        source.height(),
        source.as_raw(),
        fir::PixelType::U8x4,
    )
    .context("failed to create source view for resize")?;
    let mut dst_image = fir::images::Image::new(target_w, target_h, fir::PixelType::U8x4);
    let options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::CatmullRom));
    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_view, &mut dst_image, Some(&options))
        .context("resize failed")?;
    let buffer = dst_image.into_vec();
    RgbaImage::from_raw(target_w, target_h, buffer)
        .ok_or_else(|| anyhow::anyhow!("failed to construct resized RGBA image"))
}
