//! PNG export: share when possible, otherwise save to disk.

use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use image::{ImageFormat, RgbaImage};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("could not encode PNG: {0}")]
    Encode(#[from] image::ImageError),
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareOutcome {
    Shared,
    Cancelled,
    Unsupported,
}

/// A platform share sheet.
pub trait ShareTarget: Send + Sync {
    fn share(&self, filename: &str, mime: &str, bytes: &[u8]) -> anyhow::Result<ShareOutcome>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Shared { filename: String },
    Saved { path: PathBuf },
}

impl ExportOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            ExportOutcome::Shared { .. } => "Shared!",
            ExportOutcome::Saved { .. } => "Downloaded!",
        }
    }
}

pub struct ExportManager {
    output_dir: PathBuf,
    share: Option<Box<dyn ShareTarget>>,
}

impl ExportManager {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            share: None,
        }
    }

    pub fn with_share_target(mut self, share: Box<dyn ShareTarget>) -> Self {
        self.share = Some(share);
        self
    }

    pub fn export(&self, image: &RgbaImage, filename: &str) -> Result<ExportOutcome, ExportError> {
        let bytes = encode_png(image)?;

        if let Some(share) = &self.share {
            match share.share(filename, "image/png", &bytes) {
                Ok(ShareOutcome::Shared) => {
                    info!(filename, "export shared");
                    return Ok(ExportOutcome::Shared {
                        filename: filename.to_string(),
                    });
                }
                Ok(outcome) => debug!(?outcome, "share not completed; saving instead"),
                Err(err) => warn!(error = %format!("{err:#}"), "share failed; saving instead"),
            }
        }

        let path = self.output_dir.join(filename);
        save_atomically(&path, &bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), "export saved");
        Ok(ExportOutcome::Saved { path })
    }
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// Writes `<path>.part` then renames it into place. No partial file is left
/// behind on failure.
fn save_atomically(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    let mut part = path.as_os_str().to_owned();
    part.push(".part");
    let part = PathBuf::from(part);

    let result = (|| {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(&part)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&part, path)
    })();

    result.map_err(|source| {
        if let Err(err) = fs::remove_file(&part)
            && err.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = %part.display(), error = %err, "could not remove partial export");
        }
        ExportError::Write {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Lowercase, runs of anything outside `[a-z0-9]` collapsed to one `-`,
/// trimmed of dashes.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for ch in input.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// `<prefix>-<slug>.png`, with the Unix-millis time when the hint has no
/// usable characters.
pub fn export_filename(prefix: &str, hint: &str, now: DateTime<Utc>) -> String {
    let slug = slugify(hint);
    let tail = if slug.is_empty() {
        now.timestamp_millis().to_string()
    } else {
        slug
    };
    format!("{prefix}-{tail}.png")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use image::Rgba;
    use std::sync::Mutex;

    struct Sheet {
        outcome: ShareOutcome,
        seen: Mutex<Vec<String>>,
    }

    impl ShareTarget for Sheet {
        fn share(&self, filename: &str, mime: &str, _bytes: &[u8]) -> anyhow::Result<ShareOutcome> {
            assert_eq!(mime, "image/png");
            self.seen.lock().unwrap().push(filename.to_string());
            Ok(self.outcome)
        }
    }

    fn sheet(outcome: ShareOutcome) -> Box<Sheet> {
        Box::new(Sheet {
            outcome,
            seen: Mutex::new(Vec::new()),
        })
    }

    #[test]
    fn slug_collapses_and_trims() {
        assert_eq!(slugify("  Anna-Marie O'Neil!! "), "anna-marie-o-neil");
        assert_eq!(slugify("ÉMILE"), "mile");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn empty_hint_uses_timestamp() {
        let now = Utc.with_ymd_and_hms(2026, 2, 14, 13, 0, 0).unwrap();
        assert_eq!(
            export_filename("lamour-experience", "", now),
            format!("lamour-experience-{}.png", now.timestamp_millis())
        );
        assert_eq!(
            export_filename("lamour-experience", "Jo Bloggs", now),
            "lamour-experience-jo-bloggs.png"
        );
    }

    #[test]
    fn saves_when_no_share_target() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ExportManager::new(dir.path());
        let img = RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255]));
        let outcome = manager.export(&img, "card.png").unwrap();
        let ExportOutcome::Saved { path } = outcome else {
            panic!("expected a save");
        };
        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded, img);
        assert!(!dir.path().join("card.png.part").exists());
    }

    #[test]
    fn cancelled_share_falls_back_to_save() {
        let dir = tempfile::tempdir().unwrap();
        let manager =
            ExportManager::new(dir.path()).with_share_target(sheet(ShareOutcome::Cancelled));
        let img = RgbaImage::new(1, 1);
        let outcome = manager.export(&img, "x.png").unwrap();
        assert_eq!(
            outcome,
            ExportOutcome::Saved {
                path: dir.path().join("x.png")
            }
        );
    }

    #[test]
    fn successful_share_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ExportManager::new(dir.path()).with_share_target(sheet(ShareOutcome::Shared));
        let outcome = manager.export(&RgbaImage::new(1, 1), "x.png").unwrap();
        assert_eq!(outcome.message(), "Shared!");
        assert!(!dir.path().join("x.png").exists());
    }

    #[test]
    fn failed_write_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        // A directory squatting on the target name makes the rename fail.
        fs::create_dir(dir.path().join("x.png")).unwrap();
        fs::write(dir.path().join("x.png").join("keep"), b"1").unwrap();
        let manager = ExportManager::new(dir.path());
        let err = manager.export(&RgbaImage::new(1, 1), "x.png").unwrap_err();
        assert!(matches!(err, ExportError::Write { .. }), "{err}");
        assert!(!dir.path().join("x.png.part").exists());
    }
}
