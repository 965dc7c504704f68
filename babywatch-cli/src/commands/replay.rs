use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use babywatch_engine::models::{AudioChunk, SessionEvent, VideoFrame};
use babywatch_engine::{FileSnapshotWriter, MediaSources, Session, SessionOptions};
use chrono::{DateTime, Duration, Utc};
use clap::{Args, ValueEnum};
use image::RgbImage;
use tokio::sync::mpsc;

use crate::config::CliConfig;
use crate::recording::{read_landmarks, read_wav_chunks, RecordedEstimator, RecordedFrame};

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Args)]
pub struct ReplayCommand {
    /// JSON-lines landmark recording, one record per video frame
    #[arg(long)]
    landmarks: PathBuf,

    /// WAV recording played alongside the video
    #[arg(long)]
    audio: Option<PathBuf>,

    /// Event output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Save annotated snapshots of accepted events into this directory
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Record the replayed audio as WAV
    #[arg(long)]
    record_audio: bool,

    /// Pace the replay at recorded speed instead of as fast as possible
    #[arg(long)]
    realtime: bool,
}

impl ReplayCommand {
    pub async fn execute(self, config_path: Option<&Path>) -> Result<()> {
        let mut config = CliConfig::load(config_path)?;
        if let Some(dir) = self.snapshot_dir.clone() {
            config.output.snapshot_dir = Some(dir);
            if !config.analyzer.snapshots.on_event && config.analyzer.snapshots.interval_secs <= 0.0 {
                config.analyzer.snapshots.on_event = true;
            }
        }
        if self.record_audio {
            config.output.record_audio = true;
        }

        let frames = read_landmarks(&self.landmarks)?;
        let start = Utc::now();
        let audio = match &self.audio {
            Some(path) => read_wav_chunks(path, config.replay.audio_chunk_ms, start)?,
            None => Vec::new(),
        };
        tracing::info!(frames = frames.len(), audio_chunks = audio.len(), "Starting replay");

        let options = session_options(&config)?;
        let (events_tx, events_rx) = mpsc::channel(64);
        let session = Session::new(RecordedEstimator::new(&frames), options, events_tx)?;

        let (video_tx, video) = mpsc::channel(32);
        let (audio_tx, audio_rx) = mpsc::channel(32);
        session.start(MediaSources { video, audio: audio_rx }).await?;

        let printer = tokio::spawn(print_events(events_rx, self.format));
        let size = (config.replay.frame_width, config.replay.frame_height);
        tokio::join!(
            feed_video(video_tx, &frames, start, size, self.realtime),
            feed_audio(audio_tx, audio, start, self.realtime),
        );

        session.join().await?;
        drop(session);
        let printed = printer.await.context("Event printer failed")?;

        tracing::info!(events = printed, "Replay finished");
        Ok(())
    }
}

fn session_options(config: &CliConfig) -> Result<SessionOptions> {
    let mut options = SessionOptions::new(config.analyzer.clone());

    if let Some(dir) = &config.output.snapshot_dir {
        let writer = FileSnapshotWriter::new(dir)
            .with_context(|| format!("Failed to prepare snapshot directory {}", dir.display()))?;
        options = options.with_snapshot_sink(Arc::new(writer));
    }
    if config.output.record_audio {
        options = options.with_audio_recording(&config.output.audio_dir);
    }

    Ok(options)
}

async fn pace(base: tokio::time::Instant, start: DateTime<Utc>, at: DateTime<Utc>) {
    let offset = (at - start).to_std().unwrap_or_default();
    tokio::time::sleep_until(base + offset).await;
}

async fn feed_video(
    tx: mpsc::Sender<VideoFrame>,
    frames: &[RecordedFrame],
    start: DateTime<Utc>,
    (width, height): (u32, u32),
    realtime: bool,
) {
    let base = tokio::time::Instant::now();
    for record in frames {
        let captured_at = start + Duration::milliseconds(record.timestamp_ms);
        if realtime {
            pace(base, start, captured_at).await;
        }
        let frame = VideoFrame::new(RgbImage::new(width, height), captured_at);
        if tx.send(frame).await.is_err() {
            tracing::warn!("Video task stopped before the recording ended");
            break;
        }
    }
}

async fn feed_audio(tx: mpsc::Sender<AudioChunk>, chunks: Vec<AudioChunk>, start: DateTime<Utc>, realtime: bool) {
    let base = tokio::time::Instant::now();
    for chunk in chunks {
        if realtime {
            pace(base, start, chunk.captured_at).await;
        }
        if tx.send(chunk).await.is_err() {
            tracing::warn!("Audio task stopped before the recording ended");
            break;
        }
    }
}

async fn print_events(mut rx: mpsc::Receiver<SessionEvent>, format: OutputFormat) -> usize {
    let mut printed = 0;
    while let Some(event) = rx.recv().await {
        match format_event(&event, format) {
            Ok(line) => {
                println!("{}", line);
                printed += 1;
            }
            Err(e) => tracing::error!("Failed to format event: {}", e),
        }
    }
    printed
}

/// Render one session event as a single output line
pub fn format_event(event: &SessionEvent, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string(event)?);
    }

    let line = match event {
        SessionEvent::Detected(detected) => {
            let time = detected
                .extras
                .event_timestamp
                .map(|t| t.format(TIME_FORMAT).to_string())
                .unwrap_or_else(|| "-".to_string());
            let mut line = format!(
                "{} {:<8} {} posture={} trace={}",
                time,
                detected.label.to_string(),
                detected.description,
                detected.extras.posture,
                detected.trace_id
            );
            if let Some(duration) = detected.extras.duration_secs {
                line.push_str(&format!(" duration={:.1}s", duration));
            }
            line
        }
        SessionEvent::Cry(cry) => format!(
            "{} {:<8} energy={:.4} ratio={:.2}",
            cry.timestamp.format(TIME_FORMAT),
            "cry",
            cry.energy,
            cry.ratio_mid_band
        ),
    };
    Ok(line)
}
