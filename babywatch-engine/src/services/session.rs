//! Session Orchestration
//!
//! A [`Session`] owns the per-stream analyzer state and runs one tokio task
//! per modality:
//! - video: landmark estimation on the blocking pool, event arbitration,
//!   optional annotated snapshots
//! - audio: downmix, optional recording, cry detection
//!
//! Both tasks stop cooperatively on cancellation or when their source
//! closes. Detected events leave the session on a single channel.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{AnalyzerConfig, AudioConfig};
use crate::error::{EngineError, EngineResult};
use crate::models::{AudioChunk, DetectedEvent, PoseObservation, SessionEvent, VideoFrame};
use crate::services::annotation::annotate_frame;
use crate::services::audio_analyzer::AudioAnalyzer;
use crate::services::event_arbitrator::EventArbitrator;
use crate::services::pose_analyzer::{LandmarkEstimator, PoseAnalyzer};
use crate::services::snapshot::{SnapshotPolicy, SnapshotSink, SnapshotTrigger};

/// Decoded media feeding one run of a session
pub struct MediaSources {
    pub video: mpsc::Receiver<VideoFrame>,
    pub audio: mpsc::Receiver<AudioChunk>,
}

/// Everything a session needs besides the estimator
#[derive(Clone)]
pub struct SessionOptions {
    pub config: AnalyzerConfig,
    pub snapshot_sink: Option<Arc<dyn SnapshotSink>>,
    pub audio_recording_dir: Option<PathBuf>,
}

impl SessionOptions {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            config,
            snapshot_sink: None,
            audio_recording_dir: None,
        }
    }

    pub fn with_snapshot_sink(mut self, sink: Arc<dyn SnapshotSink>) -> Self {
        self.snapshot_sink = Some(sink);
        self
    }

    pub fn with_audio_recording(mut self, dir: impl Into<PathBuf>) -> Self {
        self.audio_recording_dir = Some(dir.into());
        self
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

struct RunningTasks {
    cancel: CancellationToken,
    video: JoinHandle<()>,
    audio: JoinHandle<()>,
}

impl RunningTasks {
    async fn shutdown(self) {
        self.cancel.cancel();
        self.wait().await;
    }

    async fn wait(self) {
        for (name, handle) in [("video", self.video), ("audio", self.audio)] {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    tracing::error!("{} task panicked", name);
                }
            }
        }
    }

    fn is_finished(&self) -> bool {
        self.video.is_finished() && self.audio.is_finished()
    }
}

/// Analyzer state and tasks for one monitored stream
pub struct Session<E> {
    options: SessionOptions,
    pose: Arc<Mutex<PoseAnalyzer<E>>>,
    events: mpsc::Sender<SessionEvent>,
    tasks: tokio::sync::Mutex<Option<RunningTasks>>,
    rejoin_lock: tokio::sync::Mutex<()>,
    closed: AtomicBool,
}

impl<E: LandmarkEstimator + 'static> Session<E> {
    /// Create a session; events are delivered on `events`
    pub fn new(estimator: E, options: SessionOptions, events: mpsc::Sender<SessionEvent>) -> EngineResult<Self> {
        options.config.validate()?;
        let pose = PoseAnalyzer::new(estimator, &options.config.pose);

        Ok(Self {
            options,
            pose: Arc::new(Mutex::new(pose)),
            events,
            tasks: tokio::sync::Mutex::new(None),
            rejoin_lock: tokio::sync::Mutex::new(()),
            closed: AtomicBool::new(false),
        })
    }

    /// Start consuming `sources`, replacing any run still in progress
    pub async fn start(&self, sources: MediaSources) -> EngineResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(EngineError::SessionClosed);
        }

        let mut tasks = self.tasks.lock().await;
        if let Some(previous) = tasks.take() {
            tracing::warn!("Session already running, stopping previous streams");
            previous.shutdown().await;
            self.reset_pose_analyzer();
        }

        let cancel = CancellationToken::new();
        let video = tokio::spawn(run_video(
            self.pose.clone(),
            sources.video,
            cancel.clone(),
            self.events.clone(),
            self.options.clone(),
        ));
        let audio = tokio::spawn(run_audio(
            sources.audio,
            cancel.clone(),
            self.events.clone(),
            self.options.config.audio.clone(),
            self.options.audio_recording_dir.clone(),
        ));

        *tasks = Some(RunningTasks { cancel, video, audio });
        tracing::info!("Session started");
        Ok(())
    }

    /// Stop both tasks and return the analyzers to their initial state
    pub async fn reset(&self) {
        let running = self.tasks.lock().await.take();
        if let Some(running) = running {
            running.shutdown().await;
        }
        self.reset_pose_analyzer();
        tracing::info!("Session state reset");
    }

    /// Reset and restart on fresh sources
    ///
    /// Returns `Ok(false)` without doing anything when another rejoin is
    /// already in flight.
    pub async fn rejoin(&self, sources: MediaSources) -> EngineResult<bool> {
        let Ok(_guard) = self.rejoin_lock.try_lock() else {
            tracing::info!("Rejoin already in progress, ignoring");
            return Ok(false);
        };

        tracing::warn!("Connection lost, rejoining session");
        self.reset().await;
        self.start(sources).await?;
        Ok(true)
    }

    /// Wait until both sources are exhausted
    pub async fn join(&self) -> EngineResult<()> {
        let running = self
            .tasks
            .lock()
            .await
            .take()
            .ok_or(EngineError::SessionNotStarted)?;
        running.wait().await;
        tracing::info!("Session streams finished");
        Ok(())
    }

    /// Stop for good; later starts fail with [`EngineError::SessionClosed`]
    pub async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.reset().await;
    }

    pub async fn is_running(&self) -> bool {
        self.tasks
            .lock()
            .await
            .as_ref()
            .map(|t| !t.is_finished())
            .unwrap_or(false)
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.options.config
    }

    fn reset_pose_analyzer(&self) {
        lock_analyzer(&self.pose).reset();
    }
}

impl<E> Drop for Session<E> {
    fn drop(&mut self) {
        if let Some(running) = self.tasks.get_mut().take() {
            running.cancel.cancel();
        }
    }
}

/// Lock the analyzer, recovering from a panic in a previous estimator call
fn lock_analyzer<E>(pose: &Mutex<PoseAnalyzer<E>>) -> MutexGuard<'_, PoseAnalyzer<E>>
where
    E: LandmarkEstimator,
{
    match pose.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("Pose analyzer recovered after a panic, state invalidated");
            let mut guard = poisoned.into_inner();
            guard.invalidate();
            pose.clear_poison();
            guard
        }
    }
}

fn analyze_frame<E: LandmarkEstimator>(
    pose: &Mutex<PoseAnalyzer<E>>,
    frame: &VideoFrame,
) -> Result<Option<PoseObservation>> {
    lock_analyzer(pose).process_frame(frame)
}

async fn run_video<E: LandmarkEstimator + 'static>(
    pose: Arc<Mutex<PoseAnalyzer<E>>>,
    mut frames: mpsc::Receiver<VideoFrame>,
    cancel: CancellationToken,
    events: mpsc::Sender<SessionEvent>,
    options: SessionOptions,
) {
    let mut arbitrator = EventArbitrator::new(&options.config.arbitration);
    let mut snapshots = SnapshotPolicy::new(&options.config.snapshots);
    let visibility_threshold = options.config.pose.visibility_threshold;
    let mut frame_count: u64 = 0;

    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("Video task cancelled");
                break;
            }
            frame = frames.recv() => match frame {
                Some(frame) => Arc::new(frame),
                None => {
                    tracing::info!(frames = frame_count, "Video stream ended");
                    break;
                }
            },
        };

        frame_count += 1;
        if frame_count == 1 {
            tracing::info!(width = frame.width(), height = frame.height(), "First video frame received");
        }

        let job_pose = pose.clone();
        let job_frame = frame.clone();
        let observation = match tokio::task::spawn_blocking(move || analyze_frame(&job_pose, &job_frame)).await {
            Ok(Ok(Some(observation))) => observation,
            Ok(Ok(None)) => continue,
            Ok(Err(e)) => {
                tracing::error!("Pose analysis error: {:#}", e);
                continue;
            }
            Err(e) => {
                tracing::error!("Pose analysis task failed: {}", e);
                continue;
            }
        };

        let detected = arbitrator.process(&observation);

        if let Some(sink) = options.snapshot_sink.as_ref() {
            let for_events = if snapshots.on_event() { detected.clone() } else { Vec::new() };
            let periodic = snapshots.claim_periodic(observation.timestamp);
            if let Some(landmarks) = observation.landmarks.clone() {
                if !for_events.is_empty() || periodic {
                    let sink = sink.clone();
                    let frame = frame.clone();
                    let at = observation.timestamp;
                    let job = tokio::task::spawn_blocking(move || {
                        let annotated = annotate_frame(&frame.image, &landmarks, visibility_threshold);
                        save_snapshots(sink.as_ref(), &annotated, &for_events, periodic, at);
                    });
                    if let Err(e) = job.await {
                        tracing::error!("Snapshot task failed: {}", e);
                    }
                }
            }
        }

        for event in detected {
            if !deliver(&events, &cancel, SessionEvent::Detected(event)).await {
                tracing::debug!("Video task stopped while delivering events");
                return;
            }
        }
    }
}

/// Send one event unless the session is cancelled first
///
/// Returns false when the task should stop.
async fn deliver(events: &mpsc::Sender<SessionEvent>, cancel: &CancellationToken, event: SessionEvent) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        sent = events.send(event) => {
            if sent.is_err() {
                tracing::warn!("Event receiver dropped");
            }
            sent.is_ok()
        }
    }
}

fn save_snapshots(
    sink: &dyn SnapshotSink,
    annotated: &image::RgbImage,
    detected: &[DetectedEvent],
    periodic: bool,
    at: chrono::DateTime<chrono::Utc>,
) {
    for event in detected {
        if let Err(e) = sink.save(annotated, SnapshotTrigger::Event(event), at) {
            tracing::error!(trace_id = %event.trace_id, "Failed to save annotated snapshot: {}", e);
        }
    }
    if periodic {
        if let Err(e) = sink.save(annotated, SnapshotTrigger::Interval, at) {
            tracing::error!("Failed to save periodic snapshot: {}", e);
        }
    }
}

async fn run_audio(
    mut chunks: mpsc::Receiver<AudioChunk>,
    cancel: CancellationToken,
    events: mpsc::Sender<SessionEvent>,
    config: AudioConfig,
    recording_dir: Option<PathBuf>,
) {
    let mut analyzer = AudioAnalyzer::new(config);
    if let Some(dir) = recording_dir {
        analyzer = analyzer.with_recording(dir);
    }
    let mut chunk_count: u64 = 0;

    loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("Audio task cancelled");
                break;
            }
            chunk = chunks.recv() => match chunk {
                Some(chunk) => chunk,
                None => {
                    tracing::info!(chunks = chunk_count, "Audio stream ended");
                    break;
                }
            },
        };

        chunk_count += 1;
        if chunk_count == 1 {
            tracing::info!(
                sample_rate = chunk.sample_rate,
                channels = chunk.channels,
                samples = chunk.frames(),
                "First audio chunk received"
            );
        }

        if let Some(cry) = analyzer.process_chunk(&chunk) {
            tracing::info!(
                "Cry detected - energy {:.3}, ratio {:.2}",
                cry.energy,
                cry.ratio_mid_band
            );
            if !deliver(&events, &cancel, SessionEvent::Cry(cry)).await {
                tracing::debug!("Audio task stopped while delivering events");
                break;
            }
        }
    }

    analyzer.close();
}
