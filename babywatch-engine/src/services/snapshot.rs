//! Annotated snapshot capture
//!
//! A [`SnapshotSink`] persists annotated frames. [`SnapshotPolicy`] decides
//! when a frame is worth saving: on every accepted event, on a fixed
//! interval, or both.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use image::{ImageFormat, RgbImage};

use crate::config::SnapshotConfig;
use crate::error::EngineResult;
use crate::models::DetectedEvent;
use crate::services::elapsed_secs;

/// Why a snapshot is being taken
#[derive(Debug, Clone, Copy)]
pub enum SnapshotTrigger<'a> {
    Event(&'a DetectedEvent),
    Interval,
}

pub trait SnapshotSink: Send + Sync {
    fn save(&self, image: &RgbImage, trigger: SnapshotTrigger<'_>, at: DateTime<Utc>) -> EngineResult<PathBuf>;
}

/// Writes JPEG snapshots into a directory
#[derive(Debug, Clone)]
pub struct FileSnapshotWriter {
    dir: PathBuf,
}

impl FileSnapshotWriter {
    pub fn new(dir: impl Into<PathBuf>) -> EngineResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SnapshotSink for FileSnapshotWriter {
    fn save(&self, image: &RgbImage, trigger: SnapshotTrigger<'_>, at: DateTime<Utc>) -> EngineResult<PathBuf> {
        let path = self.dir.join(snapshot_file_name(trigger, at));
        image.save_with_format(&path, ImageFormat::Jpeg)?;

        match trigger {
            SnapshotTrigger::Event(event) => tracing::info!(
                trace_id = %event.trace_id,
                path = %path.display(),
                "Annotated snapshot ({}) saved",
                event.description
            ),
            SnapshotTrigger::Interval => tracing::info!(path = %path.display(), "Periodic snapshot saved"),
        }
        Ok(path)
    }
}

/// `snapshot_<YYYYmmdd_HHMMSS_micros>[_<label>_<trace>].jpg`
pub fn snapshot_file_name(trigger: SnapshotTrigger<'_>, at: DateTime<Utc>) -> String {
    let stamp = at.format("%Y%m%d_%H%M%S_%6f");
    match trigger {
        SnapshotTrigger::Event(event) => format!(
            "snapshot_{}_{}_{}.jpg",
            stamp,
            event.label.to_string().replace(' ', "_"),
            event.trace_id
        ),
        SnapshotTrigger::Interval => format!("snapshot_{}.jpg", stamp),
    }
}

/// Decides which frames get saved
#[derive(Debug, Clone)]
pub struct SnapshotPolicy {
    on_event: bool,
    interval_secs: f64,
    last_periodic: Option<DateTime<Utc>>,
}

impl SnapshotPolicy {
    pub fn new(config: &SnapshotConfig) -> Self {
        Self {
            on_event: config.on_event,
            interval_secs: config.interval_secs.max(0.0),
            last_periodic: None,
        }
    }

    pub fn on_event(&self) -> bool {
        self.on_event
    }

    pub fn is_enabled(&self) -> bool {
        self.on_event || self.interval_secs > 0.0
    }

    /// Check the interval, claiming the slot when one is due
    pub fn claim_periodic(&mut self, now: DateTime<Utc>) -> bool {
        if self.interval_secs <= 0.0 {
            return false;
        }
        if let Some(last) = self.last_periodic {
            if elapsed_secs(last, now) < self.interval_secs {
                return false;
            }
        }
        self.last_periodic = Some(now);
        true
    }

    pub fn reset(&mut self) {
        self.last_periodic = None;
    }
}
