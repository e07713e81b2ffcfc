//! Camera session: IDLE/LIVE state machine around a device stream.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::RgbaImage;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::processing::layout::Size;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("camera unavailable: {0}")]
    Unavailable(String),
    #[error("camera is not live")]
    NotLive,
    #[error("could not read camera frame: {0}")]
    Frame(String),
}

/// Which camera the stream asks for: the selfie camera or the rear one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Facing {
    User,
    Environment,
}

/// What is asked of the device when a stream opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRequest {
    pub facing: Facing,
    pub ideal: Size,
}

impl Default for StreamRequest {
    fn default() -> Self {
        Self {
            facing: Facing::User,
            ideal: Size::new(1280, 720),
        }
    }
}

pub trait CameraDevice: Send {
    fn open(&mut self, request: &StreamRequest) -> Result<Box<dyn VideoStream>, CaptureError>;
}

pub trait VideoStream: Send {
    /// Native resolution actually delivered.
    fn resolution(&self) -> Size;
    fn frame(&mut self) -> Result<RgbaImage, CaptureError>;
    /// Releases every track. Must tolerate repeated calls.
    fn stop(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Live,
}

pub struct CaptureSession {
    device: Box<dyn CameraDevice>,
    request: StreamRequest,
    stream: Option<Box<dyn VideoStream>>,
}

impl CaptureSession {
    pub fn new(device: Box<dyn CameraDevice>) -> Self {
        Self::with_request(device, StreamRequest::default())
    }

    pub fn with_request(device: Box<dyn CameraDevice>, request: StreamRequest) -> Self {
        Self {
            device,
            request,
            stream: None,
        }
    }

    pub fn request(&self) -> &StreamRequest {
        &self.request
    }

    pub fn state(&self) -> CaptureState {
        if self.stream.is_some() {
            CaptureState::Live
        } else {
            CaptureState::Idle
        }
    }

    pub fn is_live(&self) -> bool {
        self.stream.is_some()
    }

    /// Opens the stream. Already live is a no-op; on failure the session
    /// stays idle and holds nothing.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.stream.is_some() {
            debug!("camera already live");
            return Ok(());
        }
        match self.device.open(&self.request) {
            Ok(stream) => {
                let res = stream.resolution();
                info!(width = res.width, height = res.height, "camera live");
                self.stream = Some(stream);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "camera failed to start");
                Err(err)
            }
        }
    }

    /// Current frame for the live view.
    pub fn preview(&mut self) -> Result<RgbaImage, CaptureError> {
        let stream = self.stream.as_mut().ok_or(CaptureError::NotLive)?;
        stream.frame()
    }

    /// Snapshot at native resolution. The stream is stopped afterwards
    /// whether or not the snapshot succeeded.
    pub fn capture(&mut self) -> Result<RgbaImage, CaptureError> {
        let stream = self.stream.as_mut().ok_or(CaptureError::NotLive)?;
        let frame = stream.frame();
        self.stop();
        let frame = frame?;
        debug!(width = frame.width(), height = frame.height(), "frame captured");
        Ok(frame)
    }

    pub fn stop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            info!("camera stopped");
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Device that serves a fixed frame. Counts releases so callers can check
/// that nothing is left running.
pub struct StillCamera {
    frame: Option<RgbaImage>,
    failure: Option<CaptureError>,
    releases: Arc<AtomicUsize>,
}

impl StillCamera {
    pub fn new(frame: RgbaImage) -> Self {
        Self {
            frame: Some(frame),
            failure: None,
            releases: Default::default(),
        }
    }

    pub fn failing(error: CaptureError) -> Self {
        Self {
            frame: None,
            failure: Some(error),
            releases: Default::default(),
        }
    }

    pub fn release_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.releases)
    }
}

impl CameraDevice for StillCamera {
    fn open(&mut self, _request: &StreamRequest) -> Result<Box<dyn VideoStream>, CaptureError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        let frame = self
            .frame
            .clone()
            .ok_or_else(|| CaptureError::Unavailable("no frame".into()))?;
        Ok(Box::new(StillStream {
            frame,
            live: true,
            releases: Arc::clone(&self.releases),
        }))
    }
}

struct StillStream {
    frame: RgbaImage,
    live: bool,
    releases: Arc<AtomicUsize>,
}

impl VideoStream for StillStream {
    fn resolution(&self) -> Size {
        Size::new(self.frame.width(), self.frame.height())
    }

    fn frame(&mut self) -> Result<RgbaImage, CaptureError> {
        if !self.live {
            return Err(CaptureError::NotLive);
        }
        Ok(self.frame.clone())
    }

    fn stop(&mut self) {
        if self.live {
            self.live = false;
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> StillCamera {
        StillCamera::new(RgbaImage::new(1280, 720))
    }

    #[test]
    fn capture_stops_the_stream() {
        let cam = camera();
        let releases = cam.release_counter();
        let mut session = CaptureSession::new(Box::new(cam));
        session.start().unwrap();
        assert_eq!(session.state(), CaptureState::Live);
        let frame = session.capture().unwrap();
        assert_eq!(frame.dimensions(), (1280, 720));
        assert_eq!(session.state(), CaptureState::Idle);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn capture_while_idle_is_an_error() {
        let mut session = CaptureSession::new(Box::new(camera()));
        assert_eq!(session.capture().unwrap_err(), CaptureError::NotLive);
        assert_eq!(session.preview().unwrap_err(), CaptureError::NotLive);
    }

    #[test]
    fn denied_permission_stays_idle() {
        let mut session =
            CaptureSession::new(Box::new(StillCamera::failing(CaptureError::PermissionDenied)));
        assert_eq!(session.start().unwrap_err(), CaptureError::PermissionDenied);
        assert_eq!(session.state(), CaptureState::Idle);
    }

    #[test]
    fn stop_is_idempotent_and_drop_releases() {
        let cam = camera();
        let releases = cam.release_counter();
        let mut session = CaptureSession::new(Box::new(cam));
        session.start().unwrap();
        session.start().unwrap();
        session.stop();
        session.stop();
        assert_eq!(releases.load(Ordering::SeqCst), 1);

        session.start().unwrap();
        drop(session);
        assert_eq!(releases.load(Ordering::SeqCst), 2);
    }
}
