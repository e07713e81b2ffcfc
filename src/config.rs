use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::capture::{Facing, StreamRequest};
use crate::countdown::Countdown;
use crate::error::Error;
use crate::navigation::{DEFAULT_SECTIONS, SWIPE_THRESHOLD_PX};
use crate::polls::PollOptions;
use crate::processing::layout::Size;
use crate::template::Template;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Font file for all text. When unset a system font is discovered.
    pub font_path: Option<PathBuf>,
    /// Directory relative template assets are resolved against.
    pub assets_dir: PathBuf,
    /// Extra templates, or replacements for the built-in ones by name.
    pub templates: BTreeMap<String, Template>,
    pub export: ExportOptions,
    pub event: EventOptions,
    pub boards: BoardOptions,
    pub navigation: NavigationOptions,
    pub camera: CameraOptions,
    pub polls: Vec<PollOptions>,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&s)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;
        Ok(config)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(mut self) -> Result<Self> {
        for (name, template) in &mut self.templates {
            template.name = name.clone();
            template
                .validate()
                .with_context(|| format!("invalid template {name}"))?;
        }
        ensure!(
            self.boards.songs_limit > 0,
            "boards.songs-limit must be greater than zero"
        );
        ensure!(
            self.boards.red_flags_limit > 0,
            "boards.red-flags-limit must be greater than zero"
        );
        ensure!(
            self.boards.max_entry_chars > 0,
            "boards.max-entry-chars must be greater than zero"
        );
        ensure!(
            self.navigation.sections > 0,
            "navigation.sections must be greater than zero"
        );
        ensure!(
            self.navigation.swipe_threshold_px > 0.0,
            "navigation.swipe-threshold-px must be positive"
        );
        ensure!(
            !self.camera.ideal.is_empty(),
            "camera.ideal must have a non-zero width and height"
        );
        for poll in &self.polls {
            ensure!(!poll.options.is_empty(), "poll {} has no options", poll.id);
        }
        self.event.countdown().context("invalid event start")?;
        Ok(self)
    }

    pub fn template_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Template::BUILTIN.iter().map(|s| s.to_string()).collect();
        for name in self.templates.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    /// Resolves a template by name (configured first, then built in),
    /// applies the export prefix override and loads its artwork.
    pub fn template(&self, name: &str) -> Result<Template> {
        let mut template = match self.templates.get(name) {
            Some(configured) => configured.clone(),
            None => Template::builtin(name)
                .ok_or_else(|| Error::UnknownTemplate(name.to_string()))?,
        };
        template.name = name.to_string();
        if let Some(asset) = &template.background.asset
            && asset.is_relative()
        {
            template.background.asset = Some(self.assets_dir.join(asset));
        }
        if let Some(prefix) = &self.export.prefix {
            template.export_prefix = prefix.clone();
        }
        template.validate()?;
        template.prepare_runtime();
        Ok(template)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            font_path: None,
            assets_dir: PathBuf::from("."),
            templates: BTreeMap::new(),
            export: ExportOptions::default(),
            event: EventOptions::default(),
            boards: BoardOptions::default(),
            navigation: NavigationOptions::default(),
            camera: CameraOptions::default(),
            polls: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ExportOptions {
    /// Replaces every template's file name prefix.
    pub prefix: Option<String>,
    pub output_dir: PathBuf,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            prefix: None,
            output_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct EventOptions {
    /// Local wall-clock start, e.g. `2026-02-14T15:00:00`.
    pub starts_at: NaiveDateTime,
    pub time_zone: Tz,
}

impl EventOptions {
    fn default_starts_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, 14)
            .and_then(|d| d.and_hms_opt(15, 0, 0))
            .unwrap_or_default()
    }

    pub fn countdown(&self) -> Result<Countdown> {
        Countdown::new(self.starts_at, self.time_zone)
    }
}

impl Default for EventOptions {
    fn default() -> Self {
        Self {
            starts_at: Self::default_starts_at(),
            time_zone: chrono_tz::Africa::Johannesburg,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BoardOptions {
    pub songs_limit: usize,
    pub red_flags_limit: usize,
    /// Cap on submitted entry text, in characters.
    pub max_entry_chars: usize,
}

impl BoardOptions {
    const fn default_songs_limit() -> usize {
        30
    }

    const fn default_red_flags_limit() -> usize {
        20
    }

    const fn default_max_entry_chars() -> usize {
        150
    }
}

impl Default for BoardOptions {
    fn default() -> Self {
        Self {
            songs_limit: Self::default_songs_limit(),
            red_flags_limit: Self::default_red_flags_limit(),
            max_entry_chars: Self::default_max_entry_chars(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct NavigationOptions {
    pub sections: usize,
    pub swipe_threshold_px: f32,
}

impl Default for NavigationOptions {
    fn default() -> Self {
        Self {
            sections: DEFAULT_SECTIONS,
            swipe_threshold_px: SWIPE_THRESHOLD_PX,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CameraOptions {
    pub facing: Facing,
    /// Preferred stream resolution; devices may deliver another.
    pub ideal: Size,
}

impl CameraOptions {
    pub fn request(&self) -> StreamRequest {
        StreamRequest {
            facing: self.facing,
            ideal: self.ideal,
        }
    }
}

impl Default for CameraOptions {
    fn default() -> Self {
        let request = StreamRequest::default();
        Self {
            facing: request.facing,
            ideal: request.ideal,
        }
    }
}
