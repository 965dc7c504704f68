use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::observation::{FeatureSet, Posture};

/// Current layout version of [`EventExtras`]
pub const EXTRAS_SCHEMA_VERSION: u16 = 1;

/// Kinds of events produced by the arbitrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLabel {
    Movement,
    Wake,
}

impl std::fmt::Display for EventLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventLabel::Movement => write!(f, "movement"),
            EventLabel::Wake => write!(f, "wake"),
        }
    }
}

/// Measurements attached to a detected event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventExtras {
    pub schema_version: u16,
    pub posture: Posture,
    pub torso_angle: Option<f32>,
    pub forward_component: Option<f32>,
    pub movement_score: Option<f32>,
    pub avg_knee_angle: Option<f32>,
    pub left_knee_angle: Option<f32>,
    pub right_knee_angle: Option<f32>,
    pub leg_extension: Option<f32>,
    pub leg_span: Option<f32>,
    pub knee_span: Option<f32>,
    pub hip_height: Option<f32>,
    pub knee_height: Option<f32>,
    pub ankle_height: Option<f32>,
    /// How long the wake posture was held, seconds
    pub duration_secs: Option<f64>,
    /// Set when the event passes the registration gate
    pub event_timestamp: Option<DateTime<Utc>>,
}

impl EventExtras {
    pub fn from_features(posture: Posture, movement_score: f32, features: &FeatureSet) -> Self {
        Self {
            schema_version: EXTRAS_SCHEMA_VERSION,
            posture,
            torso_angle: Some(features.torso_angle),
            forward_component: Some(features.forward_component),
            movement_score: Some(movement_score),
            avg_knee_angle: features.avg_knee_angle,
            left_knee_angle: features.left_knee_angle,
            right_knee_angle: features.right_knee_angle,
            leg_extension: features.leg_extension,
            leg_span: features.leg_span,
            knee_span: features.knee_span,
            hip_height: features.hip_height,
            knee_height: features.knee_height,
            ankle_height: features.ankle_height,
            duration_secs: None,
            event_timestamp: None,
        }
    }
}

/// A movement or wake event emitted by the arbitrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedEvent {
    /// Short correlation token shared by logs and snapshot file names
    pub trace_id: String,
    pub label: EventLabel,
    pub description: String,
    pub extras: EventExtras,
}

impl DetectedEvent {
    pub fn new(label: EventLabel, description: impl Into<String>, extras: EventExtras) -> Self {
        Self {
            trace_id: new_trace_id(),
            label,
            description: description.into(),
            extras,
        }
    }
}

/// First eight hex characters of a random UUID
pub fn new_trace_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

/// A window of audio that looks like crying
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryEvent {
    pub timestamp: DateTime<Utc>,
    /// Mean squared amplitude of the window
    pub energy: f32,
    /// Share of spectral energy inside 400-1500 Hz
    pub ratio_mid_band: f32,
}

/// Everything a running session reports to its caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionEvent {
    Detected(DetectedEvent),
    Cry(CryEvent),
}
