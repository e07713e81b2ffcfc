//! CPU drawing surface the compositor renders into.

use image::{Rgba, RgbaImage};

use crate::processing::color::{blend_over, Color};
use crate::processing::layout::{Rect, Size};

#[derive(Debug, Clone)]
pub struct Surface {
    pixels: RgbaImage,
}

impl Surface {
    pub fn new(size: Size) -> Self {
        Self {
            pixels: RgbaImage::new(size.width.max(1), size.height.max(1)),
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.pixels.width(), self.pixels.height())
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.pixels.width(), self.pixels.height())
    }

    pub fn image(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.pixels.get_pixel(x, y)
    }

    /// Resets every pixel to transparent black.
    pub fn clear(&mut self) {
        for px in self.pixels.pixels_mut() {
            *px = Rgba([0, 0, 0, 0]);
        }
    }

    pub fn fill(&mut self, color: Color) {
        let bounds = self.bounds();
        self.fill_rect(bounds, color);
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let Some(area) = rect.intersect(&self.bounds()) else {
            return;
        };
        for y in area.y..area.bottom() {
            for x in area.x..area.right() {
                blend_over(self.pixels.get_pixel_mut(x as u32, y as u32), color.0, 1.0);
            }
        }
    }

    /// Top-to-bottom linear gradient across `rect`.
    pub fn fill_vertical_gradient(&mut self, rect: Rect, top: Color, bottom: Color) {
        let Some(area) = rect.intersect(&self.bounds()) else {
            return;
        };
        let span = (rect.height.max(2) - 1) as f32;
        for y in area.y..area.bottom() {
            let t = (i64::from(y) - i64::from(rect.y)) as f32 / span;
            let color = top.lerp(bottom, t);
            for x in area.x..area.right() {
                blend_over(self.pixels.get_pixel_mut(x as u32, y as u32), color.0, 1.0);
            }
        }
    }

    /// Strokes the outline of `rect` with the line centred on its edges.
    pub fn stroke_rect(&mut self, rect: Rect, line_width: u32, color: Color) {
        if line_width == 0 {
            return;
        }
        let inner_pad = line_width / 2;
        let outer_pad = line_width - inner_pad;
        let outer = Rect::new(
            rect.x.saturating_sub_unsigned(outer_pad),
            rect.y.saturating_sub_unsigned(outer_pad),
            rect.width.saturating_add(outer_pad.saturating_mul(2)),
            rect.height.saturating_add(outer_pad.saturating_mul(2)),
        );
        let inner_w = rect.width.saturating_sub(inner_pad.saturating_mul(2));
        let inner_h = rect.height.saturating_sub(inner_pad.saturating_mul(2));
        let inner = Rect::new(
            rect.x.saturating_add_unsigned(inner_pad),
            rect.y.saturating_add_unsigned(inner_pad),
            inner_w,
            inner_h,
        );

        let Some(area) = outer.intersect(&self.bounds()) else {
            return;
        };
        for y in area.y..area.bottom() {
            for x in area.x..area.right() {
                if inner_w > 0 && inner_h > 0 && inner.contains(x, y) {
                    continue;
                }
                blend_over(self.pixels.get_pixel_mut(x as u32, y as u32), color.0, 1.0);
            }
        }
    }

    /// Composites `img` with its top-left at `(x, y)`, drawing only inside
    /// `clip`.
    pub fn blit_clipped(&mut self, img: &RgbaImage, x: i32, y: i32, clip: Rect) {
        let placed = Rect::new(x, y, img.width(), img.height());
        let Some(area) = placed
            .intersect(&clip)
            .and_then(|r| r.intersect(&self.bounds()))
        else {
            return;
        };
        for dy in area.y..area.bottom() {
            for dx in area.x..area.right() {
                let src = img.get_pixel((dx - x) as u32, (dy - y) as u32);
                blend_over(self.pixels.get_pixel_mut(dx as u32, dy as u32), src.0, 1.0);
            }
        }
    }

    pub fn blit(&mut self, img: &RgbaImage, x: i32, y: i32) {
        let bounds = self.bounds();
        self.blit_clipped(img, x, y, bounds);
    }

    /// Blends a single pixel with partial coverage; used by glyph rasterisers.
    pub fn blend_pixel(&mut self, x: i32, y: i32, color: Color, coverage: f32) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        if x >= self.pixels.width() || y >= self.pixels.height() {
            return;
        }
        blend_over(self.pixels.get_pixel_mut(x, y), color.0, coverage);
    }
}
