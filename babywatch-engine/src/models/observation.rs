use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::landmark::LandmarkSet;

/// Coarse body posture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Posture {
    Lying,
    Sitting,
    Standing,
}

impl Posture {
    /// Sitting and standing both count as awake postures
    pub fn is_upright(&self) -> bool {
        matches!(self, Posture::Sitting | Posture::Standing)
    }
}

impl std::fmt::Display for Posture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Posture::Lying => write!(f, "lying"),
            Posture::Sitting => write!(f, "sitting"),
            Posture::Standing => write!(f, "standing"),
        }
    }
}

/// Geometric features derived from one frame
///
/// Optional fields are `None` when the landmarks they need are below the
/// visibility threshold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    /// Smoothed torso angle from vertical, degrees
    pub torso_angle: f32,
    /// |z| share of the torso vector
    pub forward_component: f32,
    pub avg_knee_angle: Option<f32>,
    pub left_knee_angle: Option<f32>,
    pub right_knee_angle: Option<f32>,
    /// Ankle height minus hip height in image coordinates
    pub leg_extension: Option<f32>,
    pub hip_height: Option<f32>,
    pub knee_height: Option<f32>,
    pub ankle_height: Option<f32>,
    pub leg_span: Option<f32>,
    pub knee_span: Option<f32>,
}

/// Result of analyzing one video frame
#[derive(Debug, Clone, Serialize)]
pub struct PoseObservation {
    pub timestamp: DateTime<Utc>,
    pub posture: Posture,
    pub movement_score: f32,
    pub movement_detected: bool,
    pub features: FeatureSet,
    /// Image-space landmarks kept for snapshot annotation
    #[serde(skip)]
    pub landmarks: Option<LandmarkSet>,
}
