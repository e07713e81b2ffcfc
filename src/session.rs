//! Everything one visitor interacts with, built once and torn down
//! explicitly.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

use crate::capture::{CameraDevice, CaptureSession};
use crate::compositor::Compositor;
use crate::config::Configuration;
use crate::countdown::Countdown;
use crate::events::{Notice, Notifier};
use crate::export::ExportManager;
use crate::navigation::SectionNavigator;
use crate::polls::Polls;
use crate::store::ListStore;
use crate::tasks::board::{Board, BoardSetup};
use crate::text::{GlyphFace, Typeface};

pub struct Session<S> {
    pub countdown: Countdown,
    pub navigator: SectionNavigator,
    pub polls: Polls,
    pub songs: Board<S>,
    pub red_flags: Board<S>,
    pub exporter: ExportManager,
    pub camera: Option<CaptureSession>,
    compositors: Vec<Compositor>,
    notifier: Notifier,
    notices: UnboundedReceiver<Notice>,
}

/// Loads the configured font, or `None` with a warning.
pub fn load_typeface(config: &Configuration) -> Option<Arc<dyn Typeface>> {
    match GlyphFace::load(config.font_path.as_deref()) {
        Ok(face) => Some(Arc::new(face)),
        Err(err) => {
            warn!(error = %format!("{err:#}"), "no font available; text layers disabled");
            None
        }
    }
}

impl<S: ListStore> Session<S> {
    /// Builds every component. Boards are not loaded yet; see
    /// [`Session::load_boards`].
    pub fn new(
        config: &Configuration,
        store: Arc<S>,
        typeface: Option<Arc<dyn Typeface>>,
        camera: Option<Box<dyn CameraDevice>>,
    ) -> Result<Self> {
        let (notifier, notices) = Notifier::channel();
        let mut compositors = Vec::new();
        for name in config.template_names() {
            let template = Arc::new(config.template(&name)?);
            compositors.push(Compositor::new(template, typeface.clone(), notifier.clone()));
        }
        let boards = &config.boards;
        let request = config.camera.request();
        Ok(Self {
            countdown: config.event.countdown()?,
            navigator: SectionNavigator::new(
                config.navigation.sections,
                config.navigation.swipe_threshold_px,
            ),
            polls: Polls::new(&config.polls),
            songs: Board::new(
                Arc::clone(&store),
                BoardSetup::songs(boards.songs_limit, boards.max_entry_chars),
                notifier.clone(),
            ),
            red_flags: Board::new(
                store,
                BoardSetup::red_flags(boards.red_flags_limit, boards.max_entry_chars),
                notifier.clone(),
            ),
            exporter: ExportManager::new(config.export.output_dir.clone()),
            camera: camera.map(|device| CaptureSession::with_request(device, request)),
            compositors,
            notifier,
            notices,
        })
    }

    pub async fn load_boards(&mut self) {
        self.songs.load().await;
        self.red_flags.load().await;
    }

    pub fn compositor(&mut self, template: &str) -> Option<&mut Compositor> {
        self.compositors
            .iter_mut()
            .find(|c| c.template().name == template)
    }

    /// Poll vote with the outcome reported as a notice.
    pub fn vote(&mut self, poll: &str, voter: &str, option: &str) -> bool {
        match self.polls.vote(poll, voter, option) {
            Ok(()) => {
                self.notifier.success("Your vote has been recorded!");
                true
            }
            Err(err) => {
                self.notifier.error(err.to_string());
                false
            }
        }
    }

    /// Pending notices, oldest first.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        crate::events::drain(&mut self.notices)
    }

    /// Stops the camera and cancels realtime feeds.
    pub fn teardown(&mut self) {
        if let Some(camera) = self.camera.as_mut() {
            camera.stop();
        }
        self.songs.close();
        self.red_flags.close();
        info!("session torn down");
    }
}
