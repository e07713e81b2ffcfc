//! Templates: background artwork plus fixed layout metadata.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{ensure, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::processing::color::Color;
use crate::processing::fixed_image::FixedImage;
use crate::processing::layout::{FitPolicy, Rect, Size};
use crate::surface::Surface;
use crate::text::{draw_label, Align, Label, TextAnchor, TextCase, Typeface};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Template {
    #[serde(skip)]
    pub name: String,
    pub size: Size,
    #[serde(default)]
    pub background: Background,
    #[serde(default)]
    pub frame: Option<PhotoFrame>,
    #[serde(default)]
    pub text: Option<TextAnchor>,
    /// Drawn with the background, underneath the photo.
    #[serde(default)]
    pub backdrop: Vec<Decoration>,
    /// Drawn last, on top of photo and text.
    #[serde(default)]
    pub overlay: Vec<Decoration>,
    /// Leading part of exported file names.
    #[serde(default = "Template::default_export_prefix")]
    pub export_prefix: String,
    /// Refuse to export until a photo is loaded.
    #[serde(default)]
    pub export_requires_photo: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Background {
    /// Raster artwork stretched over the whole surface.
    #[serde(default)]
    pub asset: Option<PathBuf>,
    #[serde(default)]
    pub placeholder: Placeholder,
    #[serde(skip)]
    pub runtime: Option<Arc<FixedImage>>,
}

/// Programmatic stand-in used whenever the artwork is not available.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Placeholder {
    pub fill: Fill,
    #[serde(default)]
    pub label: Option<Label>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Fill {
    Solid { color: Color },
    VerticalGradient { top: Color, bottom: Color },
}

/// Destination rectangle for the user photo.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PhotoFrame {
    pub rect: Rect,
    /// Defaults to a square crop for square frames and cover otherwise.
    #[serde(default)]
    pub fit: Option<FitPolicy>,
    /// Whether zoom and offset are honoured.
    #[serde(default)]
    pub adjustable: bool,
}

impl PhotoFrame {
    pub fn policy(&self) -> FitPolicy {
        match self.fit {
            Some(policy) => policy,
            None if self.rect.is_square() => FitPolicy::CenterCropSquare,
            None => FitPolicy::Cover,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Decoration {
    Fill { rect: Rect, color: Color },
    Border { rect: Rect, width: u32, color: Color },
    Label(Label),
}

impl Default for Placeholder {
    fn default() -> Self {
        Self {
            fill: Fill::Solid {
                color: Color::rgb(0xF5, 0xF5, 0xF5),
            },
            label: None,
        }
    }
}

impl Template {
    pub const ID_CARD: &'static str = "id-card";
    pub const VALENTINE_CARD: &'static str = "valentine-card";
    pub const PHOTOBOOTH: &'static str = "photobooth";

    pub const BUILTIN: [&'static str; 3] = [Self::ID_CARD, Self::VALENTINE_CARD, Self::PHOTOBOOTH];

    fn default_export_prefix() -> String {
        "lamour".to_string()
    }

    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            Self::ID_CARD => Some(Self::id_card()),
            Self::VALENTINE_CARD => Some(Self::valentine_card()),
            Self::PHOTOBOOTH => Some(Self::photobooth()),
            _ => None,
        }
    }

    /// Locked ID card: square photo box and a name field next to the
    /// printed "NAME:" label of `frame.jpg`.
    pub fn id_card() -> Self {
        Self {
            name: Self::ID_CARD.to_string(),
            size: Size::new(1024, 1536),
            background: Background {
                asset: Some(PathBuf::from("frame.jpg")),
                placeholder: Placeholder {
                    fill: Fill::Solid {
                        color: Color::rgb(0xF5, 0xF5, 0xF5),
                    },
                    label: Some(Label::centered(
                        "Loading template...",
                        512.0,
                        768.0,
                        24.0,
                        Color::rgb(0x99, 0x99, 0x99),
                    )),
                },
                runtime: None,
            },
            frame: Some(PhotoFrame {
                rect: Rect::new(332, 365, 360, 360),
                fit: None,
                adjustable: false,
            }),
            text: Some(TextAnchor {
                x: 310.0,
                y: 1040.0,
                max_width: 440.0,
                align: Align::Left,
                font_size: 42.0,
                min_font_size: 18.0,
                step: 2.0,
                color: Color::rgb(0x11, 0x11, 0x11),
                case: TextCase::Uppercase,
                max_chars: 24,
            }),
            backdrop: Vec::new(),
            overlay: Vec::new(),
            export_prefix: "lamour-experience".to_string(),
            export_requires_photo: false,
        }
    }

    /// Event flyer card with a letterboxed photo and a centred message.
    pub fn valentine_card() -> Self {
        let black = Color::BLACK;
        let photo_box = Rect::new(20, 470, 360, 270);
        let mut backdrop = vec![Decoration::Fill {
            rect: Rect::new(399, 0, 2, 800),
            color: black,
        }];
        for (text, x, y, size) in [
            ("L'AMOUR", 200.0, 60.0, 48.0),
            ("VALENTINES EVENT", 200.0, 100.0, 16.0),
            ("02.14.26", 600.0, 60.0, 48.0),
            ("SATURDAY", 600.0, 90.0, 16.0),
            ("15:00 TILL LATE", 600.0, 110.0, 16.0),
            ("Do you HAVE", 600.0, 340.0, 32.0),
            ("A VALENTINE?", 600.0, 380.0, 32.0),
            ("LIMITED TICKETS", 600.0, 480.0, 20.0),
            ("99 JUTA ST, BRAAM", 600.0, 510.0, 16.0),
            ("SORAH X", 600.0, 560.0, 18.0),
            ("L&T EVENTS", 600.0, 590.0, 18.0),
        ] {
            backdrop.push(Decoration::Label(Label::centered(text, x, y, size, black)));
        }
        backdrop.push(Decoration::Fill {
            rect: photo_box,
            color: Color::rgb(0xE8, 0xD5, 0xE0),
        });
        backdrop.push(Decoration::Label(Label::centered(
            "Your Photo Here",
            200.0,
            605.0,
            14.0,
            Color::rgb(0x66, 0x66, 0x66),
        )));

        Self {
            name: Self::VALENTINE_CARD.to_string(),
            size: Size::new(800, 800),
            background: Background {
                asset: None,
                placeholder: Placeholder {
                    fill: Fill::VerticalGradient {
                        top: Color::rgb(0xFF, 0xE4, 0xE6),
                        bottom: Color::rgb(0xFF, 0xC0, 0xCB),
                    },
                    label: None,
                },
                runtime: None,
            },
            frame: Some(PhotoFrame {
                rect: photo_box,
                fit: Some(FitPolicy::Contain),
                adjustable: false,
            }),
            text: Some(TextAnchor {
                x: 550.0,
                y: 280.0,
                max_width: 380.0,
                align: Align::Center,
                font_size: 32.0,
                min_font_size: 18.0,
                step: 2.0,
                color: black,
                case: TextCase::AsTyped,
                max_chars: 60,
            }),
            backdrop,
            overlay: vec![Decoration::Border {
                rect: photo_box,
                width: 2,
                color: black,
            }],
            export_prefix: "lamour-valentine-card".to_string(),
            export_requires_photo: false,
        }
    }

    /// Photobooth: gradient, white-bordered frame with the event name below.
    pub fn photobooth() -> Self {
        let size = Size::new(600, 800);
        let padding = 40;
        let frame = Rect::new(
            padding,
            padding,
            size.width - 2 * padding as u32,
            size.height - 2 * padding as u32 - 80,
        );
        let white = Color::WHITE;
        let cx = size.width as f32 / 2.0;
        Self {
            name: Self::PHOTOBOOTH.to_string(),
            size,
            background: Background {
                asset: None,
                placeholder: Placeholder {
                    fill: Fill::VerticalGradient {
                        top: Color::rgb(0xFF, 0x14, 0x93),
                        bottom: Color::rgb(0x8B, 0x00, 0x8B),
                    },
                    label: None,
                },
                runtime: None,
            },
            frame: Some(PhotoFrame {
                rect: frame,
                fit: Some(FitPolicy::Cover),
                adjustable: true,
            }),
            text: None,
            backdrop: Vec::new(),
            overlay: vec![
                Decoration::Border {
                    rect: frame,
                    width: 8,
                    color: white,
                },
                Decoration::Label(Label::centered(
                    "L'AMOUR",
                    cx,
                    size.height as f32 - 50.0,
                    24.0,
                    white,
                )),
                Decoration::Label(Label::centered(
                    "VALENTINE'S EVENT 2026",
                    cx,
                    size.height as f32 - 25.0,
                    16.0,
                    white,
                )),
            ],
            export_prefix: "lamour-photobooth".to_string(),
            export_requires_photo: true,
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.size.is_empty(), "template {} has an empty canvas", self.name);
        if let Some(frame) = &self.frame {
            ensure!(
                frame.rect.width > 0 && frame.rect.height > 0,
                "template {} has an empty photo frame",
                self.name
            );
            ensure!(
                frame.rect.is_within(self.size),
                "template {} photo frame lies outside the canvas",
                self.name
            );
        }
        if let Some(anchor) = &self.text {
            anchor.validate()?;
        }
        Ok(())
    }

    /// Loads the background artwork. A missing or broken asset is not an
    /// error: the placeholder is used instead.
    pub fn prepare_runtime(&mut self) {
        self.background.runtime = None;
        let Some(path) = &self.background.asset else {
            return;
        };
        match FixedImage::open(path) {
            Ok(image) => {
                debug!(template = %self.name, path = %path.display(), "template asset loaded");
                self.background.runtime = Some(Arc::new(image));
            }
            Err(err) => {
                warn!(
                    template = %self.name,
                    path = %path.display(),
                    error = %format!("{err:#}"),
                    "template asset unavailable; using placeholder"
                );
            }
        }
    }

    pub fn with_asset_image(mut self, image: FixedImage) -> Self {
        self.background.runtime = Some(Arc::new(image));
        self
    }

    pub fn max_chars(&self) -> usize {
        self.text.as_ref().map_or(0, |anchor| anchor.max_chars)
    }
}

/// Draws the background layer: the artwork if loaded, else the placeholder.
///
/// Returns `true` when the artwork was used.
pub fn draw_background(
    surface: &mut Surface,
    template: &Template,
    face: Option<&dyn Typeface>,
) -> bool {
    let size = surface.size();
    if let Some(asset) = &template.background.runtime {
        match asset.canvas_for(size.width, size.height) {
            Ok(canvas) => {
                surface.blit(&canvas, 0, 0);
                draw_decorations(surface, &template.backdrop, face);
                return true;
            }
            Err(err) => {
                warn!(
                    template = %template.name,
                    asset = asset.label(),
                    error = %format!("{err:#}"),
                    "template asset could not be prepared; using placeholder"
                );
            }
        }
    }
    draw_placeholder(surface, &template.background.placeholder, face);
    draw_decorations(surface, &template.backdrop, face);
    false
}

pub fn draw_placeholder(
    surface: &mut Surface,
    placeholder: &Placeholder,
    face: Option<&dyn Typeface>,
) {
    let bounds = surface.bounds();
    match placeholder.fill {
        Fill::Solid { color } => surface.fill_rect(bounds, color),
        Fill::VerticalGradient { top, bottom } => {
            surface.fill_vertical_gradient(bounds, top, bottom)
        }
    }
    if let (Some(label), Some(face)) = (&placeholder.label, face) {
        draw_label(surface, face, label);
    }
}

pub fn draw_decorations(
    surface: &mut Surface,
    decorations: &[Decoration],
    face: Option<&dyn Typeface>,
) {
    for decoration in decorations {
        match decoration {
            Decoration::Fill { rect, color } => surface.fill_rect(*rect, *color),
            Decoration::Border { rect, width, color } => surface.stroke_rect(*rect, *width, *color),
            Decoration::Label(label) => {
                if let Some(face) = face {
                    draw_label(surface, face, label);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn builtins_validate() {
        for name in Template::BUILTIN {
            let template = Template::builtin(name).unwrap();
            assert_eq!(template.name, name);
            template.validate().unwrap();
        }
    }

    #[test]
    fn square_frame_defaults_to_square_crop() {
        let card = Template::id_card();
        assert_eq!(card.frame.unwrap().policy(), FitPolicy::CenterCropSquare);
        let booth = Template::photobooth();
        let frame = booth.frame.unwrap();
        assert_eq!(frame.rect, Rect::new(40, 40, 520, 640));
        assert_eq!(frame.policy(), FitPolicy::Cover);
    }

    #[test]
    fn missing_asset_falls_back_to_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let mut card = Template::id_card();
        card.background.asset = Some(dir.path().join("frame.jpg"));
        card.prepare_runtime();
        assert!(card.background.runtime.is_none());

        let mut surface = Surface::new(card.size);
        assert!(!draw_background(&mut surface, &card, None));
        assert_eq!(surface.pixel(0, 0), Rgba([0xF5, 0xF5, 0xF5, 255]));
    }

    #[test]
    fn loaded_asset_fills_the_surface() {
        let card = Template::id_card().with_asset_image(FixedImage::from_image(
            "mem",
            RgbaImage::from_pixel(4, 6, Rgba([1, 2, 3, 255])),
        ));
        let mut surface = Surface::new(card.size);
        assert!(draw_background(&mut surface, &card, None));
        assert_eq!(surface.pixel(0, 0), Rgba([1, 2, 3, 255]));
        assert_eq!(surface.pixel(1023, 1535), Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn frame_outside_canvas_is_rejected() {
        let mut card = Template::id_card();
        card.frame = Some(PhotoFrame {
            rect: Rect::new(900, 0, 360, 360),
            fit: None,
            adjustable: false,
        });
        assert!(card.validate().is_err());
    }

    #[test]
    fn parses_template_yaml() {
        let yaml = r##"
size: { width: 400, height: 300 }
background:
  placeholder:
    fill: { type: vertical-gradient, top: "#FF1493", bottom: [139, 0, 139] }
frame:
  rect: { x: 10, y: 10, width: 200, height: 100 }
  fit: contain
text:
  x: 300
  y: 250
  max-width: 90
  case: uppercase
overlay:
  - { type: border, rect: { x: 10, y: 10, width: 200, height: 100 }, width: 4, color: "#fff" }
  - { type: label, text: "HELLO", x: 200, y: 290, size: 12 }
"##;
        let template: Template = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(template.size, Size::new(400, 300));
        assert_eq!(template.frame.as_ref().unwrap().policy(), FitPolicy::Contain);
        let text = template.text.as_ref().unwrap();
        assert_eq!(text.case, TextCase::Uppercase);
        assert_eq!(text.max_chars, 24);
        assert_eq!(template.overlay.len(), 2);
        assert_eq!(template.export_prefix, "lamour");
    }
}
