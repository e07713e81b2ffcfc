//! Placement math for fitting a source bitmap into a destination frame.
//!
//! Everything here is pure: callers hand in sizes and rectangles and get
//! back the source window to sample and the destination rectangle to fill.

use serde::Deserialize;

pub const MIN_ZOOM: f32 = 0.5;
pub const MAX_ZOOM: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Integer rectangle in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_square(&self) -> bool {
        self.width == self.height
    }

    /// Exclusive right edge, saturating at `i32::MAX`.
    pub fn right(&self) -> i32 {
        self.x.saturating_add_unsigned(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add_unsigned(self.height)
    }

    /// Whether the whole rectangle lies inside `0..width` by `0..height`.
    pub fn is_within(&self, size: Size) -> bool {
        let right = i64::from(self.x) + i64::from(self.width);
        let bottom = i64::from(self.y) + i64::from(self.height);
        self.x >= 0
            && self.y >= 0
            && right <= i64::from(size.width)
            && bottom <= i64::from(size.height)
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && x < self.right() && y < self.bottom()
    }

    /// Overlap of two rectangles, `None` when they do not touch.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Rect::new(x0, y0, x1.abs_diff(x0), y1.abs_diff(y0)))
    }

    pub fn to_f32(self) -> RectF {
        RectF::new(
            self.x as f32,
            self.y as f32,
            self.width as f32,
            self.height as f32,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectF {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl RectF {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Round to whole pixels, keeping at least one pixel and staying inside
    /// `bounds`.
    pub fn snap_within(&self, bounds: Size) -> Rect {
        let bw = bounds.width.max(1) as f32;
        let bh = bounds.height.max(1) as f32;
        let w = self.width.round().clamp(1.0, bw);
        let h = self.height.round().clamp(1.0, bh);
        let x = self.x.round().clamp(0.0, bw - w);
        let y = self.y.round().clamp(0.0, bh - h);
        Rect::new(x as i32, y as i32, w as u32, h as u32)
    }

    /// Round to whole pixels without bounding.
    pub fn snap(&self) -> Rect {
        Rect::new(
            self.x.round() as i32,
            self.y.round() as i32,
            self.width.round().max(1.0) as u32,
            self.height.round().max(1.0) as u32,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FitPolicy {
    /// Scale to fit entirely inside the frame, letterboxed.
    Contain,
    /// Scale to cover the frame, centred overflow clipped.
    Cover,
    /// Crop the longer axis so the source becomes a centred square.
    CenterCropSquare,
}

/// Where to sample from and where to draw to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub src: RectF,
    pub dst: RectF,
}

/// Computes the placement of a `source` bitmap into `dest` under `policy`.
///
/// Returns `None` for zero-sized inputs; callers skip drawing in that case.
pub fn fit(source: Size, dest: Rect, policy: FitPolicy) -> Option<Placement> {
    if source.is_empty() || dest.width == 0 || dest.height == 0 {
        return None;
    }
    let dst = dest.to_f32();
    let placement = match policy {
        FitPolicy::CenterCropSquare => Placement {
            src: center_crop_square(source),
            dst,
        },
        FitPolicy::Cover => Placement {
            src: cover_window(source, dest.width, dest.height),
            dst,
        },
        FitPolicy::Contain => {
            let (w, h) = (source.width as f32, source.height as f32);
            Placement {
                src: RectF::new(0.0, 0.0, w, h),
                dst: contain_rect(w, h, dst),
            }
        }
    };
    Some(placement)
}

/// Centred square window with side `min(w, h)`.
pub fn center_crop_square(source: Size) -> RectF {
    let side = source.width.min(source.height);
    let x = (source.width - side) as f32 / 2.0;
    let y = (source.height - side) as f32 / 2.0;
    RectF::new(x, y, side as f32, side as f32)
}

/// Largest centred window of the source with the aspect ratio `dw:dh`.
///
/// Sampling this window into the full destination is the same as scaling
/// the source to cover the destination and clipping the overflow.
pub fn cover_window(source: Size, dw: u32, dh: u32) -> RectF {
    let (sw, sh) = (source.width as f32, source.height as f32);
    // Cross-multiplied so equal ratios compare exactly.
    let lhs = u64::from(source.width) * u64::from(dh);
    let rhs = u64::from(dw) * u64::from(source.height);
    let (src_wider, src_taller) = (lhs > rhs, lhs < rhs);
    let (w, h) = if src_wider {
        (sh * dw as f32 / dh as f32, sh)
    } else if src_taller {
        (sw, sw * dh as f32 / dw as f32)
    } else {
        (sw, sh)
    };
    RectF::new((sw - w) / 2.0, (sh - h) / 2.0, w, h)
}

/// Largest rect of aspect `w:h` centred inside `frame`.
pub fn contain_rect(w: f32, h: f32, frame: RectF) -> RectF {
    let scale = (frame.width / w).min(frame.height / h);
    let scale = if scale.is_finite() { scale } else { 1.0 };
    let dw = w * scale;
    let dh = h * scale;
    RectF::new(
        frame.x + (frame.width - dw) / 2.0,
        frame.y + (frame.height - dh) / 2.0,
        dw,
        dh,
    )
}

pub fn clamp_zoom(zoom: f32) -> f32 {
    if zoom.is_finite() {
        zoom.clamp(MIN_ZOOM, MAX_ZOOM)
    } else {
        1.0
    }
}

/// Applies zoom and offset to a fitted window.
///
/// Larger zoom shrinks the window around its centre; the offset then moves
/// the window origin in source pixels. The result is clamped so it never
/// samples outside `[0, w] × [0, h]`: an oversized window is shrunk
/// uniformly (keeping its aspect ratio) and the origin is pinned inside.
pub fn adjust_window(window: RectF, source: Size, zoom: f32, offset: (f32, f32)) -> RectF {
    let (sw, sh) = (source.width as f32, source.height as f32);
    let zoom = clamp_zoom(zoom);
    let mut w = window.width / zoom;
    let mut h = window.height / zoom;
    let shrink = (sw / w).min(sh / h).min(1.0);
    w *= shrink;
    h *= shrink;

    let cx = window.x + window.width / 2.0;
    let cy = window.y + window.height / 2.0;
    let dx = if offset.0.is_finite() { offset.0 } else { 0.0 };
    let dy = if offset.1.is_finite() { offset.1 } else { 0.0 };
    let x = (cx - w / 2.0 + dx).clamp(0.0, (sw - w).max(0.0));
    let y = (cy - h / 2.0 + dy).clamp(0.0, (sh - h).max(0.0));
    RectF::new(x, y, w, h)
}
