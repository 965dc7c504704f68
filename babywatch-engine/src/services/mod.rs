pub mod annotation;
pub mod audio_analyzer;
pub mod audio_recorder;
pub mod cry_detector;
pub mod event_arbitrator;
pub mod feature_extractor;
pub mod geometry;
pub mod movement_detector;
pub mod pose_analyzer;
pub mod posture_classifier;
pub mod session;
pub mod snapshot;
pub mod spectrum;

use chrono::{DateTime, Utc};

pub use annotation::annotate_frame;
pub use audio_analyzer::AudioAnalyzer;
pub use audio_recorder::AudioRecorder;
pub use cry_detector::CryDetector;
pub use event_arbitrator::{EventArbitrator, EventGate, LastEventGate};
pub use feature_extractor::FeatureExtractor;
pub use movement_detector::MovementDetector;
pub use pose_analyzer::{LandmarkEstimator, PoseAnalyzer};
pub use posture_classifier::PostureClassifier;
pub use session::{MediaSources, Session, SessionOptions};
pub use snapshot::{FileSnapshotWriter, SnapshotPolicy, SnapshotSink, SnapshotTrigger};

/// Seconds from `from` to `to`, negative when `to` is earlier
pub(crate) fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to - from;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1_000.0,
    }
}
