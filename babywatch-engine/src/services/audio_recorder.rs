//! Mono 16-bit WAV capture of the incoming audio stream
//!
//! The writer is finalized exactly once, either through [`AudioRecorder::finalize`]
//! or when the recorder is dropped.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use hound::{SampleFormat, WavSpec, WavWriter};

use crate::error::EngineResult;

pub struct AudioRecorder {
    path: PathBuf,
    writer: Option<WavWriter<BufWriter<File>>>,
    samples_written: u64,
}

impl AudioRecorder {
    /// Create `baby_audio_<YYYYmmdd_HHMMSS>.wav` inside `dir`
    ///
    /// A numeric suffix is added when a recording with that name already exists.
    pub fn create(dir: &Path, sample_rate: u32, started_at: DateTime<Utc>) -> EngineResult<Self> {
        fs::create_dir_all(dir)?;
        let path = unused_path(dir, started_at);

        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let writer = WavWriter::create(&path, spec)?;

        tracing::info!(path = %path.display(), sample_rate, "Recording audio");

        Ok(Self {
            path,
            writer: Some(writer),
            samples_written: 0,
        })
    }

    pub fn write(&mut self, samples: &[i16]) -> EngineResult<()> {
        if let Some(writer) = self.writer.as_mut() {
            for &sample in samples {
                writer.write_sample(sample)?;
            }
            self.samples_written += samples.len() as u64;
        }
        Ok(())
    }

    /// Flush the header and close the file
    pub fn finalize(mut self) -> EngineResult<()> {
        self.close()
    }

    fn close(&mut self) -> EngineResult<()> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
            tracing::info!(
                path = %self.path.display(),
                samples = self.samples_written,
                "Audio recording finalized"
            );
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }
}

impl Drop for AudioRecorder {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::error!(path = %self.path.display(), "Failed to finalize audio recording: {}", e);
        }
    }
}

pub fn recording_file_name(started_at: DateTime<Utc>) -> String {
    format!("baby_audio_{}.wav", started_at.format("%Y%m%d_%H%M%S"))
}

fn unused_path(dir: &Path, started_at: DateTime<Utc>) -> PathBuf {
    let path = dir.join(recording_file_name(started_at));
    if !path.exists() {
        return path;
    }
    let stamp = started_at.format("%Y%m%d_%H%M%S");
    (1..)
        .map(|n| dir.join(format!("baby_audio_{}_{}.wav", stamp, n)))
        .find(|candidate| !candidate.exists())
        .unwrap_or(path)
}
