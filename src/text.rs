//! Text layer: capped user text, greedy shrink-to-fit, glyph drawing.

use std::fs;
use std::path::Path;

use ab_glyph::{point, Font, FontArc, PxScale, ScaleFont};
use anyhow::{anyhow, Context, Result};
use fontdb::{Database, Family, Query, Source};
use serde::Deserialize;
use tracing::{debug, trace};

use crate::processing::color::Color;
use crate::surface::Surface;

/// Measures and draws single-line text.
pub trait Typeface: Send + Sync {
    /// Advance width of `text` at `size` pixels.
    fn advance_width(&self, text: &str, size: f32) -> f32;

    /// Draws `text` with its left end at `origin.0` and baseline at
    /// `origin.1`.
    fn draw(&self, surface: &mut Surface, text: &str, origin: (f32, f32), size: f32, color: Color);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Align {
    #[default]
    Left,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextCase {
    #[default]
    AsTyped,
    Uppercase,
}

impl TextCase {
    pub fn apply(self, text: &str) -> String {
        match self {
            TextCase::AsTyped => text.to_string(),
            TextCase::Uppercase => text.to_uppercase(),
        }
    }
}

/// Where user text goes on a template and how it shrinks.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TextAnchor {
    pub x: f32,
    /// Baseline.
    pub y: f32,
    pub max_width: f32,
    #[serde(default)]
    pub align: Align,
    #[serde(default = "TextAnchor::default_font_size")]
    pub font_size: f32,
    #[serde(default = "TextAnchor::default_min_font_size")]
    pub min_font_size: f32,
    #[serde(default = "TextAnchor::default_step")]
    pub step: f32,
    #[serde(default = "TextAnchor::default_color")]
    pub color: Color,
    #[serde(default)]
    pub case: TextCase,
    #[serde(default = "TextAnchor::default_max_chars")]
    pub max_chars: usize,
}

impl TextAnchor {
    const fn default_font_size() -> f32 {
        42.0
    }

    const fn default_min_font_size() -> f32 {
        18.0
    }

    const fn default_step() -> f32 {
        2.0
    }

    const fn default_color() -> Color {
        Color::rgb(0x11, 0x11, 0x11)
    }

    const fn default_max_chars() -> usize {
        24
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.max_width > 0.0, "text max-width must be positive");
        anyhow::ensure!(self.step > 0.0, "text step must be positive");
        anyhow::ensure!(
            self.min_font_size > 0.0 && self.min_font_size <= self.font_size,
            "text min-font-size must be positive and not above font-size"
        );
        anyhow::ensure!(self.max_chars > 0, "text max-chars must be positive");
        Ok(())
    }
}

/// Static text drawn as part of a template.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Label {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    #[serde(default = "Label::default_color")]
    pub color: Color,
    #[serde(default = "Label::default_align")]
    pub align: Align,
}

impl Label {
    const fn default_color() -> Color {
        Color::BLACK
    }

    const fn default_align() -> Align {
        Align::Center
    }

    pub fn centered(text: &str, x: f32, y: f32, size: f32, color: Color) -> Self {
        Self {
            text: text.to_string(),
            x,
            y,
            size,
            color,
            align: Align::Center,
        }
    }
}

/// Text typed by the user, capped at a number of characters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserText {
    value: String,
    max_chars: usize,
}

impl UserText {
    pub fn new(max_chars: usize) -> Self {
        Self {
            value: String::new(),
            max_chars,
        }
    }

    /// Replaces the value, keeping at most `max_chars` characters.
    pub fn set(&mut self, input: &str) -> &str {
        self.value = input.chars().take(self.max_chars).collect();
        &self.value
    }

    pub fn clear(&mut self) {
        self.value.clear();
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontFit {
    pub size: f32,
    pub width: f32,
    pub steps: u32,
}

/// Greedy shrink: step the size down until the text fits or the floor is
/// reached. Never goes below the floor; overflow at the floor is accepted.
pub fn fit_font_size(face: &dyn Typeface, text: &str, anchor: &TextAnchor) -> FontFit {
    let floor = anchor.min_font_size.min(anchor.font_size);
    let step = if anchor.step > 0.0 {
        anchor.step
    } else {
        TextAnchor::default_step()
    };
    let mut size = anchor.font_size;
    let mut width = face.advance_width(text, size);
    let mut steps = 0;
    while width > anchor.max_width && size > floor {
        size = (size - step).max(floor);
        width = face.advance_width(text, size);
        steps += 1;
        trace!(size, width, "shrinking text");
    }
    FontFit { size, width, steps }
}

pub struct TextLayer;

impl TextLayer {
    /// Draws the user text at the anchor. Returns `None` when there is
    /// nothing to draw, in which case the surface is not touched.
    pub fn render(
        surface: &mut Surface,
        anchor: &TextAnchor,
        text: &UserText,
        face: &dyn Typeface,
    ) -> Option<FontFit> {
        if text.is_blank() {
            return None;
        }
        let normalized = anchor.case.apply(text.as_str());
        let fit = fit_font_size(face, &normalized, anchor);
        let x = match anchor.align {
            Align::Left => anchor.x,
            Align::Center => anchor.x - fit.width / 2.0,
        };
        face.draw(surface, &normalized, (x, anchor.y), fit.size, anchor.color);
        debug!(size = fit.size, steps = fit.steps, "text drawn");
        Some(fit)
    }
}

pub fn draw_label(surface: &mut Surface, face: &dyn Typeface, label: &Label) {
    if label.text.is_empty() {
        return;
    }
    let x = match label.align {
        Align::Left => label.x,
        Align::Center => label.x - face.advance_width(&label.text, label.size) / 2.0,
    };
    face.draw(surface, &label.text, (x, label.y), label.size, label.color);
}

/// `ab_glyph` backed typeface.
#[derive(Clone)]
pub struct GlyphFace {
    font: FontArc,
}

impl GlyphFace {
    pub fn new(font: FontArc) -> Self {
        Self { font }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data =
            fs::read(path).with_context(|| format!("failed to read font at {}", path.display()))?;
        let font = FontArc::try_from_vec(data)
            .with_context(|| format!("failed to decode font at {}", path.display()))?;
        Ok(Self::new(font))
    }

    /// Loads the configured font, or the first matching system face.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        let mut db = Database::new();
        db.load_system_fonts();

        let preferred_families = [
            Family::Name("Patrick Hand"),
            Family::Name("Inter"),
            Family::Name("Noto Sans"),
            Family::Name("DejaVu Sans"),
            Family::SansSerif,
        ];

        for family in preferred_families {
            if let Some(id) = db.query(&Query {
                families: &[family],
                ..Default::default()
            }) && let Some(font) = load_face(&db, id)?
            {
                return Ok(Self::new(font));
            }
        }

        for face in db.faces() {
            if let Some(font) = load_face(&db, face.id)? {
                return Ok(Self::new(font));
            }
        }

        Err(anyhow!("no usable system font found"))
    }
}

fn load_face(db: &Database, id: fontdb::ID) -> Result<Option<FontArc>> {
    let face = db.face(id).context("missing font face in database")?;
    let bytes = match &face.source {
        Source::Binary(data) => data.as_ref().as_ref().to_vec(),
        Source::File(path) => {
            fs::read(path).with_context(|| format!("failed to read font at {}", path.display()))?
        }
        Source::SharedFile(_, data) => data.as_ref().as_ref().to_vec(),
    };
    match FontArc::try_from_vec(bytes) {
        Ok(font) => Ok(Some(font)),
        Err(err) => {
            debug!(error = %err, "skipping undecodable font face");
            Ok(None)
        }
    }
}

impl Typeface for GlyphFace {
    fn advance_width(&self, text: &str, size: f32) -> f32 {
        let scaled = self.font.as_scaled(PxScale::from(size));
        let mut width = 0.0;
        let mut previous = None;
        for ch in text.chars() {
            let id = scaled.glyph_id(ch);
            if let Some(prev) = previous {
                width += scaled.kern(prev, id);
            }
            width += scaled.h_advance(id);
            previous = Some(id);
        }
        width
    }

    fn draw(&self, surface: &mut Surface, text: &str, origin: (f32, f32), size: f32, color: Color) {
        let scale = PxScale::from(size);
        let scaled = self.font.as_scaled(scale);
        let mut caret = point(origin.0, origin.1);
        let mut previous = None;
        for ch in text.chars() {
            let glyph_id = scaled.glyph_id(ch);
            if let Some(prev) = previous {
                caret.x += scaled.kern(prev, glyph_id);
            }
            let glyph = glyph_id.with_scale_and_position(scale, caret);
            if let Some(outlined) = self.font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                let origin_x = bounds.min.x.floor() as i32;
                let origin_y = bounds.min.y.floor() as i32;
                outlined.draw(|gx, gy, v| {
                    surface.blend_pixel(origin_x + gx as i32, origin_y + gy as i32, color, v);
                });
            }
            caret.x += scaled.h_advance(glyph_id);
            previous = Some(glyph_id);
        }
    }
}
