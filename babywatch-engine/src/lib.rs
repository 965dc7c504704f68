//! Infant monitor analysis engine
//!
//! Turns decoded video frames and audio chunks into posture, movement, wake
//! and cry events. Landmark estimation is delegated to a
//! [`LandmarkEstimator`] supplied by the caller.

pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use config::AnalyzerConfig;
pub use error::{EngineError, EngineResult};
pub use models::{
    AudioChunk, CryEvent, DetectedEvent, EstimatedPose, EventLabel, Landmark, LandmarkSet,
    PoseObservation, Posture, SessionEvent, VideoFrame,
};
pub use services::{
    FileSnapshotWriter, LandmarkEstimator, MediaSources, Session, SessionOptions, SnapshotSink,
};
