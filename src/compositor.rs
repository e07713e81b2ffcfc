//! One compositor per template: owns the photo, the text and the surface,
//! and turns failures into notices.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use image::RgbaImage;
use tracing::{debug, info, warn};

use crate::capture::{CaptureError, CaptureSession};
use crate::error::Result;
use crate::events::{LoadTicket, Notifier};
use crate::export::{export_filename, ExportManager, ExportOutcome};
use crate::photo::{PhotoLayer, UserPhoto};
use crate::surface::Surface;
use crate::tasks::loader;
use crate::template::{self, Template};
use crate::text::{TextLayer, Typeface, UserText};

pub const NO_PHOTO: &str = "Please upload a photo first";

pub struct Compositor {
    template: Arc<Template>,
    typeface: Option<Arc<dyn Typeface>>,
    surface: Surface,
    photo: Option<UserPhoto>,
    text: UserText,
    dirty: bool,
    issued: u64,
    notifier: Notifier,
}

impl Compositor {
    pub fn new(
        template: Arc<Template>,
        typeface: Option<Arc<dyn Typeface>>,
        notifier: Notifier,
    ) -> Self {
        if typeface.is_none() {
            warn!(template = %template.name, "no typeface available; text will not be drawn");
        }
        let surface = Surface::new(template.size);
        let text = UserText::new(template.max_chars());
        Self {
            template,
            typeface,
            surface,
            photo: None,
            text,
            dirty: true,
            issued: 0,
            notifier,
        }
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn photo(&self) -> Option<&UserPhoto> {
        self.photo.as_ref()
    }

    pub fn text(&self) -> &str {
        self.text.as_str()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Surface as last rendered; may be stale, see [`Compositor::refresh`].
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Sets the user text, capped to the template's limit. Returns the
    /// stored value.
    pub fn set_text(&mut self, input: &str) -> &str {
        self.dirty = true;
        self.text.set(input)
    }

    pub fn begin_load(&mut self) -> LoadTicket {
        self.issued += 1;
        LoadTicket(self.issued)
    }

    /// Applies a finished load. Only the most recently issued ticket is
    /// accepted; a failed decode keeps the current photo.
    pub fn finish_load(&mut self, ticket: LoadTicket, decoded: Result<RgbaImage>) -> bool {
        if ticket.0 != self.issued {
            debug!(ticket = ticket.0, latest = self.issued, "discarding superseded photo load");
            return false;
        }
        match decoded {
            Ok(image) => {
                info!(width = image.width(), height = image.height(), "photo loaded");
                self.photo = Some(UserPhoto::new(image));
                self.dirty = true;
                self.notifier.success("Photo loaded successfully!");
                true
            }
            Err(err) => {
                warn!(error = %err, "photo load failed");
                self.notifier.error("Could not read that image. Please try another photo.");
                false
            }
        }
    }

    pub fn load_photo_bytes(&mut self, bytes: &[u8]) -> bool {
        let ticket = self.begin_load();
        self.finish_load(ticket, loader::decode_photo(bytes))
    }

    pub async fn load_photo_file(&mut self, path: PathBuf) -> bool {
        let ticket = self.begin_load();
        let decoded = loader::load_file(path).await;
        self.finish_load(ticket, decoded)
    }

    /// Opens the camera, reporting failure as a notice.
    pub fn start_camera(&self, session: &mut CaptureSession) -> bool {
        match session.start() {
            Ok(()) => {
                self.notifier.info("Camera ready! Position yourself and tap CAPTURE");
                true
            }
            Err(err) => {
                self.camera_failed(&err);
                false
            }
        }
    }

    /// Closes the camera without taking a photo.
    pub fn stop_camera(&self, session: &mut CaptureSession) {
        session.stop();
        self.notifier.info("Camera closed");
    }

    /// Takes a snapshot and uses it as the photo with a fresh transform.
    pub fn capture_photo(&mut self, session: &mut CaptureSession) -> bool {
        let ticket = self.begin_load();
        match session.capture() {
            Ok(frame) => self.finish_load(ticket, Ok(frame)),
            Err(err) => {
                self.camera_failed(&err);
                false
            }
        }
    }

    fn camera_failed(&self, err: &CaptureError) {
        match err {
            CaptureError::PermissionDenied | CaptureError::Unavailable(_) => {
                self.notifier.error("Camera access denied or not available")
            }
            CaptureError::NotLive => self.notifier.error("Camera is not open"),
            CaptureError::Frame(_) => self.notifier.error("Could not capture a photo"),
        }
    }

    fn with_photo<T>(&mut self, op: impl FnOnce(&mut UserPhoto) -> T) -> Option<T> {
        let Some(photo) = self.photo.as_mut() else {
            self.notifier.error(NO_PHOTO);
            return None;
        };
        let out = op(photo);
        self.dirty = true;
        Some(out)
    }

    pub fn rotate(&mut self) -> bool {
        self.with_photo(|photo| photo.rotate()).is_some()
    }

    pub fn flip(&mut self) -> bool {
        self.with_photo(|photo| photo.flip()).is_some()
    }

    pub fn set_zoom(&mut self, zoom: f32) -> bool {
        self.with_photo(|photo| photo.set_zoom(zoom)).is_some()
    }

    pub fn nudge(&mut self, dx: f32, dy: f32) -> bool {
        self.with_photo(|photo| photo.nudge(dx, dy)).is_some()
    }

    pub fn set_offset(&mut self, x: f32, y: f32) -> bool {
        self.with_photo(|photo| photo.set_offset(x, y)).is_some()
    }

    pub fn reset_transform(&mut self) -> bool {
        let done = self.with_photo(UserPhoto::reset_transform).is_some();
        if done {
            self.notifier.success("Image reset to original");
        }
        done
    }

    /// Drops the photo and the text.
    pub fn reset(&mut self) {
        self.photo = None;
        self.text.clear();
        self.dirty = true;
    }

    /// Full redraw: background, photo, text, overlay.
    pub fn render(&mut self) -> &Surface {
        let face = self.typeface.as_deref();
        self.surface.clear();
        template::draw_background(&mut self.surface, &self.template, face);

        if let (Some(frame), Some(photo)) = (&self.template.frame, &self.photo) {
            PhotoLayer::render(&mut self.surface, frame, photo);
        }

        if let (Some(anchor), Some(face)) = (&self.template.text, face) {
            TextLayer::render(&mut self.surface, anchor, &self.text, face);
        }

        template::draw_decorations(&mut self.surface, &self.template.overlay, face);
        self.dirty = false;
        &self.surface
    }

    /// Renders only when something changed since the last render.
    pub fn refresh(&mut self) -> &Surface {
        if self.dirty {
            self.render();
        }
        &self.surface
    }

    pub fn export_filename(&self, now: DateTime<Utc>) -> String {
        export_filename(&self.template.export_prefix, self.text.as_str(), now)
    }

    /// Exports the current composition, re-rendering first if stale.
    pub fn export(&mut self, manager: &ExportManager, now: DateTime<Utc>) -> Option<ExportOutcome> {
        if self.template.export_requires_photo && self.photo.is_none() {
            self.notifier.error(NO_PHOTO);
            return None;
        }
        let filename = self.export_filename(now);
        self.refresh();
        match manager.export(self.surface.image(), &filename) {
            Ok(outcome) => {
                self.notifier.success(outcome.message());
                Some(outcome)
            }
            Err(err) => {
                warn!(error = %err, filename = %filename, "export failed");
                self.notifier.error("Could not save the image");
                None
            }
        }
    }
}
