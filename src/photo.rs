//! User photo state and the photo layer render.

use std::sync::Arc;

use image::{imageops, RgbaImage};
use tracing::{debug, warn};

use crate::processing::fixed_image::resize_rgba;
use crate::processing::layout::{self, clamp_zoom, FitPolicy, RectF, Size};
use crate::surface::Surface;
use crate::template::PhotoFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    /// Quarter turn clockwise.
    pub fn next(self) -> Self {
        match self {
            Rotation::R0 => Rotation::R90,
            Rotation::R90 => Rotation::R180,
            Rotation::R180 => Rotation::R270,
            Rotation::R270 => Rotation::R0,
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 90,
            Rotation::R180 => 180,
            Rotation::R270 => 270,
        }
    }

    /// Nearest quarter turn for an arbitrary angle in degrees.
    pub fn from_degrees(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            45..135 => Rotation::R90,
            135..225 => Rotation::R180,
            225..315 => Rotation::R270,
            _ => Rotation::R0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub rotation: Rotation,
    pub flipped: bool,
    pub zoom: f32,
    /// Window shift in source pixels.
    pub offset: (f32, f32),
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            rotation: Rotation::R0,
            flipped: false,
            zoom: 1.0,
            offset: (0.0, 0.0),
        }
    }
}

impl Transform {
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone)]
pub struct UserPhoto {
    image: Arc<RgbaImage>,
    transform: Transform,
}

impl UserPhoto {
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image: Arc::new(image),
            transform: Transform::default(),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn size(&self) -> Size {
        Size::new(self.image.width(), self.image.height())
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn rotate(&mut self) -> Rotation {
        self.transform.rotation = self.transform.rotation.next();
        self.transform.rotation
    }

    pub fn flip(&mut self) -> bool {
        self.transform.flipped = !self.transform.flipped;
        self.transform.flipped
    }

    pub fn set_zoom(&mut self, zoom: f32) -> f32 {
        self.transform.zoom = clamp_zoom(zoom);
        self.transform.zoom
    }

    pub fn nudge(&mut self, dx: f32, dy: f32) {
        let (x, y) = self.transform.offset;
        self.set_offset(x + dx, y + dy);
    }

    pub fn set_offset(&mut self, x: f32, y: f32) {
        let keep = |v: f32| if v.is_finite() { v } else { 0.0 };
        self.transform.offset = (keep(x), keep(y));
    }

    pub fn reset_transform(&mut self) {
        self.transform = Transform::default();
    }

    /// The bitmap as it should appear: mirrored first, then rotated
    /// clockwise.
    pub fn oriented(&self) -> RgbaImage {
        let t = self.transform;
        if t.rotation == Rotation::R0 && !t.flipped {
            return (*self.image).clone();
        }
        let mirrored;
        let base: &RgbaImage = if t.flipped {
            mirrored = imageops::flip_horizontal(&*self.image);
            &mirrored
        } else {
            &self.image
        };
        match t.rotation {
            Rotation::R0 => base.clone(),
            Rotation::R90 => imageops::rotate90(base),
            Rotation::R180 => imageops::rotate180(base),
            Rotation::R270 => imageops::rotate270(base),
        }
    }
}

/// Source window and destination for `oriented` inside `frame`.
pub fn placement_for(
    frame: &PhotoFrame,
    oriented: Size,
    transform: Transform,
) -> Option<layout::Placement> {
    let policy = frame.policy();
    let mut placement = layout::fit(oriented, frame.rect, policy)?;
    if frame.adjustable && policy != FitPolicy::Contain {
        placement.src =
            layout::adjust_window(placement.src, oriented, transform.zoom, transform.offset);
    }
    Some(placement)
}

pub struct PhotoLayer;

impl PhotoLayer {
    /// Draws the photo clipped to the frame. Returns the window that was
    /// sampled, or `None` when nothing was drawn.
    pub fn render(surface: &mut Surface, frame: &PhotoFrame, photo: &UserPhoto) -> Option<RectF> {
        let oriented = photo.oriented();
        let size = Size::new(oriented.width(), oriented.height());
        let placement = placement_for(frame, size, photo.transform())?;

        let window = placement.src.snap_within(size);
        let dst = placement.dst.snap();
        let crop = imageops::crop_imm(
            &oriented,
            window.x as u32,
            window.y as u32,
            window.width,
            window.height,
        )
        .to_image();
        let scaled = match resize_rgba(&crop, dst.width, dst.height) {
            Ok(scaled) => scaled,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "photo resample failed; skipping photo layer");
                return None;
            }
        };
        surface.blit_clipped(&scaled, dst.x, dst.y, frame.rect);
        debug!(
            src_x = window.x,
            src_y = window.y,
            src_w = window.width,
            src_h = window.height,
            dst_w = dst.width,
            dst_h = dst.height,
            "photo drawn"
        );
        Some(placement.src)
    }
}
