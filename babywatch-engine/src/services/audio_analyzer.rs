//! Audio Analysis Service
//!
//! Turns raw PCM chunks into cooldown-gated cry events:
//! - downmix to mono and normalize to [-1, 1)
//! - optional WAV capture of the mono stream
//! - cry detection on a lazily created per-stream detector

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::config::AudioConfig;
use crate::models::{AudioChunk, CryEvent};
use crate::services::audio_recorder::AudioRecorder;
use crate::services::cry_detector::CryDetector;
use crate::services::elapsed_secs;

const PCM_SCALE: f32 = 32768.0;

pub struct AudioAnalyzer {
    config: AudioConfig,
    recording_dir: Option<PathBuf>,
    recorder: Option<AudioRecorder>,
    recording_disabled: bool,
    detector: Option<CryDetector>,
    last_cry: Option<DateTime<Utc>>,
}

impl AudioAnalyzer {
    pub fn new(config: AudioConfig) -> Self {
        Self {
            config,
            recording_dir: None,
            recorder: None,
            recording_disabled: false,
            detector: None,
            last_cry: None,
        }
    }

    /// Record the mono stream as WAV files under `dir`
    pub fn with_recording(mut self, dir: impl Into<PathBuf>) -> Self {
        self.recording_dir = Some(dir.into());
        self
    }

    /// Analyze one chunk, returning a cry event outside the cooldown
    pub fn process_chunk(&mut self, chunk: &AudioChunk) -> Option<CryEvent> {
        let mono = chunk.to_mono();
        if mono.is_empty() {
            return None;
        }

        self.ensure_detector(chunk.sample_rate);
        self.record(&mono, chunk.sample_rate, chunk.captured_at);

        let samples: Vec<f32> = mono.iter().map(|&s| s as f32 / PCM_SCALE).collect();
        let detector = self.detector.as_mut()?;
        let event = detector.process_samples(&samples, chunk.captured_at)?;

        if let Some(last) = self.last_cry {
            if elapsed_secs(last, event.timestamp) < self.config.cry_cooldown_secs {
                tracing::debug!("Cry suppressed by cooldown");
                return None;
            }
        }

        self.last_cry = Some(event.timestamp);
        Some(event)
    }

    fn ensure_detector(&mut self, sample_rate: u32) {
        match self.detector.as_ref().map(|d| d.sample_rate()) {
            Some(current) if current == sample_rate => return,
            Some(current) => {
                tracing::warn!(
                    from = current,
                    to = sample_rate,
                    "Audio sample rate changed, restarting cry detector and recording"
                );
                // the WAV header carries the old rate, start a new file
                self.finish_recording();
            }
            None => tracing::info!(sample_rate, "Cry detector initialized"),
        }
        self.detector = Some(CryDetector::new(sample_rate, &self.config));
    }

    fn record(&mut self, mono: &[i16], sample_rate: u32, captured_at: DateTime<Utc>) {
        if self.recording_disabled {
            return;
        }
        let Some(dir) = self.recording_dir.as_ref() else {
            return;
        };

        if self.recorder.is_none() {
            match AudioRecorder::create(dir, sample_rate, captured_at) {
                Ok(recorder) => self.recorder = Some(recorder),
                Err(e) => {
                    tracing::error!("Failed to start audio recording: {}", e);
                    self.recording_disabled = true;
                    return;
                }
            }
        }

        if let Some(recorder) = self.recorder.as_mut() {
            if let Err(e) = recorder.write(mono) {
                tracing::error!("Failed to write audio samples: {}", e);
                self.recorder = None;
                self.recording_disabled = true;
            }
        }
    }

    pub fn detector(&self) -> Option<&CryDetector> {
        self.detector.as_ref()
    }

    pub fn recording_path(&self) -> Option<PathBuf> {
        self.recorder.as_ref().map(|r| r.path().to_path_buf())
    }

    /// Finalize the recording and drop the detector
    pub fn close(&mut self) {
        self.finish_recording();
        self.detector = None;
    }

    fn finish_recording(&mut self) {
        if let Some(recorder) = self.recorder.take() {
            if let Err(e) = recorder.finalize() {
                tracing::error!("Failed to finalize audio recording: {}", e);
            }
        }
    }
}

impl Drop for AudioAnalyzer {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    const RATE: u32 = 16_000;

    /// One second of an 800 Hz tone as interleaved PCM
    fn cry_chunk(channels: u16, at: DateTime<Utc>) -> AudioChunk {
        let mut samples = Vec::with_capacity(RATE as usize * channels as usize);
        for i in 0..RATE {
            let phase = 2.0 * std::f64::consts::PI * 800.0 * i as f64 / RATE as f64;
            let value = (0.5 * phase.sin() * 32767.0) as i16;
            for _ in 0..channels {
                samples.push(value);
            }
        }
        AudioChunk::new(samples, channels, RATE, at)
    }

    fn fast_config() -> AudioConfig {
        AudioConfig {
            window_seconds: 1.0,
            hop_seconds: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_detector_created_lazily() {
        let mut analyzer = AudioAnalyzer::new(AudioConfig::default());
        assert!(analyzer.detector().is_none());
        analyzer.process_chunk(&AudioChunk::new(vec![0; 320], 1, RATE, Utc::now()));
        assert_eq!(analyzer.detector().map(|d| d.sample_rate()), Some(RATE));
    }

    #[test]
    fn test_empty_chunk_is_ignored() {
        let mut analyzer = AudioAnalyzer::new(AudioConfig::default());
        assert!(analyzer.process_chunk(&AudioChunk::new(vec![], 2, RATE, Utc::now())).is_none());
        assert!(analyzer.detector().is_none());
    }

    #[test]
    fn test_stereo_cry_detected() {
        let mut analyzer = AudioAnalyzer::new(fast_config());
        let event = analyzer.process_chunk(&cry_chunk(2, Utc::now()));
        assert!(event.is_some());
    }

    #[test]
    fn test_cry_cooldown() {
        let mut analyzer = AudioAnalyzer::new(fast_config());
        let start = Utc::now();

        assert!(analyzer.process_chunk(&cry_chunk(1, start)).is_some());
        assert!(analyzer
            .process_chunk(&cry_chunk(1, start + Duration::seconds(2)))
            .is_none());
        assert!(analyzer
            .process_chunk(&cry_chunk(1, start + Duration::seconds(5)))
            .is_some());
    }

    #[test]
    fn test_sample_rate_change_restarts_detector() {
        let mut analyzer = AudioAnalyzer::new(AudioConfig::default());
        analyzer.process_chunk(&AudioChunk::new(vec![0; 320], 1, RATE, Utc::now()));
        analyzer.process_chunk(&AudioChunk::new(vec![0; 960], 1, 48_000, Utc::now()));
        let detector = analyzer.detector().unwrap();
        assert_eq!(detector.sample_rate(), 48_000);
        assert_eq!(detector.buffered_len(), 960);
    }

    #[test]
    fn test_sample_rate_change_starts_new_recording() {
        let dir = TempDir::new().unwrap();
        let mut analyzer = AudioAnalyzer::new(AudioConfig::default()).with_recording(dir.path());
        let at = Utc::now();

        analyzer.process_chunk(&AudioChunk::new(vec![1; 320], 1, RATE, at));
        let first = analyzer.recording_path().unwrap();
        analyzer.process_chunk(&AudioChunk::new(vec![2; 960], 1, 48_000, at));
        let second = analyzer.recording_path().unwrap();
        analyzer.close();

        assert_ne!(first, second);
        let first = hound::WavReader::open(&first).unwrap();
        assert_eq!(first.spec().sample_rate, RATE);
        assert_eq!(first.len(), 320);
        let second = hound::WavReader::open(&second).unwrap();
        assert_eq!(second.spec().sample_rate, 48_000);
        assert_eq!(second.len(), 960);
    }

    #[test]
    fn test_recording_is_finalized_on_close() {
        let dir = TempDir::new().unwrap();
        let mut analyzer = AudioAnalyzer::new(AudioConfig::default()).with_recording(dir.path());
        analyzer.process_chunk(&AudioChunk::new(vec![100, 300, -100, -300], 2, RATE, Utc::now()));
        let path = analyzer.recording_path().unwrap();
        analyzer.close();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 1);
        let samples: Vec<i16> = reader.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![200, -200]);
    }
}
