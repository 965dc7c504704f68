//! Decoded media handed over by the transport layer

use chrono::{DateTime, Utc};
use image::RgbImage;

/// One decoded video frame in RGB8 layout
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub image: RgbImage,
    pub captured_at: DateTime<Utc>,
}

impl VideoFrame {
    pub fn new(image: RgbImage, captured_at: DateTime<Utc>) -> Self {
        Self { image, captured_at }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// One block of interleaved signed 16-bit PCM
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub samples: Vec<i16>,
    pub channels: u16,
    pub sample_rate: u32,
    pub captured_at: DateTime<Utc>,
}

impl AudioChunk {
    pub fn new(samples: Vec<i16>, channels: u16, sample_rate: u32, captured_at: DateTime<Utc>) -> Self {
        Self {
            samples,
            channels,
            sample_rate,
            captured_at,
        }
    }

    /// Average interleaved channels into a single mono track
    pub fn to_mono(&self) -> Vec<i16> {
        let channels = self.channels.max(1) as usize;
        if channels == 1 {
            return self.samples.clone();
        }
        self.samples
            .chunks_exact(channels)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                (sum / channels as i32) as i16
            })
            .collect()
    }

    /// Number of samples per channel
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }
}
