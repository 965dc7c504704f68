//! Cry Detection Service
//!
//! Sliding-window heuristic over mono float samples:
//! - energy gate on the mean squared amplitude
//! - share of the Welch spectrum inside the 400-1500 Hz band
//!
//! Samples accumulate until a full window is buffered; each evaluated window
//! advances the buffer by one hop.

use chrono::{DateTime, Utc};

use crate::config::AudioConfig;
use crate::models::CryEvent;
use crate::services::spectrum::WelchEstimator;

/// Band where infant cries carry most of their energy
pub const CRY_BAND_HZ: (f32, f32) = (400.0, 1500.0);

/// Spectra with less total power than this are treated as silence
const MIN_TOTAL_POWER: f32 = 1e-8;

pub struct CryDetector {
    sample_rate: u32,
    window_size: usize,
    hop_size: usize,
    energy_threshold: f32,
    band_ratio_threshold: f32,
    buffer: Vec<f32>,
    welch: WelchEstimator,
    windows_processed: u64,
}

impl CryDetector {
    pub fn new(sample_rate: u32, config: &AudioConfig) -> Self {
        let window_size = ((sample_rate as f32 * config.window_seconds) as usize).max(1);
        let hop_size = ((sample_rate as f32 * config.hop_seconds) as usize).clamp(1, window_size);

        Self {
            sample_rate,
            window_size,
            hop_size,
            energy_threshold: config.energy_threshold,
            band_ratio_threshold: config.band_ratio_threshold,
            buffer: Vec::with_capacity(window_size * 2),
            welch: WelchEstimator::new(window_size),
            windows_processed: 0,
        }
    }

    /// Append samples and evaluate every full window
    ///
    /// Stops at the first window that looks like a cry; windows still
    /// buffered after that are evaluated on the next call.
    pub fn process_samples(&mut self, samples: &[f32], now: DateTime<Utc>) -> Option<CryEvent> {
        self.buffer.extend_from_slice(samples);

        while self.buffer.len() >= self.window_size {
            let event = self.detect(&self.buffer[..self.window_size], now);
            self.buffer.drain(..self.hop_size);
            self.windows_processed += 1;

            if event.is_some() {
                return event;
            }
        }
        None
    }

    fn detect(&self, window: &[f32], now: DateTime<Utc>) -> Option<CryEvent> {
        let energy = window.iter().map(|s| s * s).sum::<f32>() / window.len() as f32;
        if energy < self.energy_threshold {
            return None;
        }

        let spectrum = self.welch.estimate(window, self.sample_rate);
        let total = spectrum.total();
        if total <= MIN_TOTAL_POWER {
            return None;
        }

        let ratio_mid_band = spectrum.band_power(CRY_BAND_HZ.0, CRY_BAND_HZ.1) / total;
        if ratio_mid_band > self.band_ratio_threshold {
            Some(CryEvent {
                timestamp: now,
                energy,
                ratio_mid_band,
            })
        } else {
            tracing::debug!(energy, ratio_mid_band, "Window below cry band ratio");
            None
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn windows_processed(&self) -> u64 {
        self.windows_processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> CryDetector {
        CryDetector::new(16_000, &AudioConfig::default())
    }

    #[test]
    fn test_window_and_hop_sizes() {
        let detector = detector();
        assert_eq!(detector.window_size(), 32_000);
        assert_eq!(detector.hop_size(), 8_000);
    }

    #[test]
    fn test_partial_window_is_buffered() {
        let mut detector = detector();
        assert!(detector.process_samples(&vec![0.0; 10_000], Utc::now()).is_none());
        assert_eq!(detector.buffered_len(), 10_000);
        assert_eq!(detector.windows_processed(), 0);
    }

    #[test]
    fn test_silence_drains_one_hop_per_window() {
        let mut detector = detector();
        let samples = vec![0.0; 32_000 + 3 * 8_000];
        assert!(detector.process_samples(&samples, Utc::now()).is_none());
        assert_eq!(detector.windows_processed(), 4);
        assert_eq!(detector.buffered_len(), 32_000 - 8_000);
    }

    #[test]
    fn test_quiet_noise_is_rejected_by_energy() {
        let mut detector = detector();
        let samples: Vec<f32> = (0..32_000).map(|i| if i % 2 == 0 { 0.05 } else { -0.05 }).collect();
        assert!(detector.process_samples(&samples, Utc::now()).is_none());
    }

    #[test]
    fn test_mid_band_tone_is_detected() {
        let mut detector = detector();
        let samples: Vec<f32> = (0..32_000)
            .map(|i| 0.5 * (2.0 * std::f64::consts::PI * 800.0 * i as f64 / 16_000.0).sin() as f32)
            .collect();
        let now = Utc::now();
        let event = detector.process_samples(&samples, now).unwrap();
        assert_eq!(event.timestamp, now);
        assert!((event.energy - 0.125).abs() < 1e-3);
        assert!(event.ratio_mid_band > 0.9);
    }
}
