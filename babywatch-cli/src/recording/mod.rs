//! Recorded stream inputs for replay
//!
//! Landmarks come from a JSON-lines file, one line per video frame:
//! `{"timestamp_ms": 40, "pose": {"image": [...], "world": [...]}}`, with
//! `"pose": null` when no body was found. Audio comes from a WAV file.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{bail, Context, Result};
use babywatch_engine::models::{AudioChunk, EstimatedPose};
use babywatch_engine::LandmarkEstimator;
use chrono::{DateTime, Duration, Utc};
use image::RgbImage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub timestamp_ms: i64,
    #[serde(default)]
    pub pose: Option<EstimatedPose>,
}

/// Parse a landmark recording, skipping blank lines
pub fn read_landmarks(path: &Path) -> Result<Vec<RecordedFrame>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open landmark recording {}", path.display()))?;

    let mut frames: Vec<RecordedFrame> = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.context("Failed to read landmark recording")?;
        if line.trim().is_empty() {
            continue;
        }

        let frame: RecordedFrame = serde_json::from_str(&line)
            .with_context(|| format!("Invalid landmark record on line {}", index + 1))?;
        if let Some(previous) = frames.last() {
            if frame.timestamp_ms < previous.timestamp_ms {
                tracing::warn!(line = index + 1, "Landmark timestamps go backwards");
            }
        }
        frames.push(frame);
    }

    tracing::debug!(frames = frames.len(), "Landmark recording loaded");
    Ok(frames)
}

/// Hands out recorded poses in frame order
pub struct RecordedEstimator {
    poses: VecDeque<Option<EstimatedPose>>,
}

impl RecordedEstimator {
    pub fn new(frames: &[RecordedFrame]) -> Self {
        Self {
            poses: frames.iter().map(|f| f.pose.clone()).collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.poses.len()
    }
}

impl LandmarkEstimator for RecordedEstimator {
    fn estimate(&mut self, _image: &RgbImage) -> Result<Option<EstimatedPose>> {
        match self.poses.pop_front() {
            Some(pose) => Ok(pose),
            None => bail!("Recording exhausted, more frames than landmark records"),
        }
    }
}

/// Read a WAV file into interleaved 16-bit chunks of `chunk_ms` each
pub fn read_wav_chunks(path: &Path, chunk_ms: u32, start: DateTime<Utc>) -> Result<Vec<AudioChunk>> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open audio recording {}", path.display()))?;
    let spec = reader.spec();

    let samples: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 16) => reader.samples::<i16>().collect::<Result<_, _>>()?,
        (hound::SampleFormat::Int, bits) if bits <= 32 => {
            let shift = bits as i32 - 16;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| rescale_int(v, shift)))
                .collect::<Result<_, _>>()?
        }
        (hound::SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
            .collect::<Result<_, _>>()?,
        (format, bits) => bail!("Unsupported WAV format: {:?} {}-bit", format, bits),
    };

    let channels = spec.channels.max(1);
    let frames_per_chunk = (spec.sample_rate as u64 * chunk_ms.max(1) as u64 / 1000).max(1) as usize;
    let chunk_len = frames_per_chunk * channels as usize;

    let chunks = samples
        .chunks(chunk_len)
        .enumerate()
        .map(|(i, block)| {
            let offset = Duration::milliseconds(i as i64 * chunk_ms as i64);
            AudioChunk::new(block.to_vec(), channels, spec.sample_rate, start + offset)
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        chunks = chunks.len(),
        sample_rate = spec.sample_rate,
        channels,
        "Audio recording loaded"
    );
    Ok(chunks)
}

fn rescale_int(value: i32, shift: i32) -> i16 {
    let scaled = if shift >= 0 { value >> shift } else { value << -shift };
    scaled.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}
