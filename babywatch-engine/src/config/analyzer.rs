use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default)]
    pub pose: PoseConfig,

    #[serde(default)]
    pub arbitration: ArbitrationConfig,

    #[serde(default)]
    pub audio: AudioConfig,

    #[serde(default)]
    pub snapshots: SnapshotConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseConfig {
    /// Mean landmark displacement (world units) that counts as movement
    #[serde(default = "default_movement_threshold")]
    pub movement_threshold: f32,

    /// Weight of the previous torso angle in the exponential filter
    #[serde(default = "default_smoothing")]
    pub smoothing: f32,

    #[serde(default = "default_visibility_threshold")]
    pub visibility_threshold: f32,

    #[serde(default)]
    pub thresholds: PostureThresholds,
}

/// Cutoffs used by the posture classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostureThresholds {
    #[serde(default = "default_standing_angle")]
    pub standing_angle: f32,

    #[serde(default = "default_lying_angle")]
    pub lying_angle: f32,

    #[serde(default = "default_lying_forward_ratio")]
    pub lying_forward_ratio: f32,

    #[serde(default = "default_standing_forward_ratio")]
    pub standing_forward_ratio: f32,

    #[serde(default = "default_standing_knee_angle")]
    pub standing_knee_angle: f32,

    #[serde(default = "default_sitting_knee_min")]
    pub sitting_knee_min: f32,

    #[serde(default = "default_sitting_knee_max")]
    pub sitting_knee_max: f32,

    #[serde(default = "default_standing_leg_extension_min")]
    pub standing_leg_extension_min: f32,

    #[serde(default = "default_sitting_leg_extension_max")]
    pub sitting_leg_extension_max: f32,

    #[serde(default = "default_standing_leg_span_min")]
    pub standing_leg_span_min: f32,

    #[serde(default = "default_sitting_leg_span_max")]
    pub sitting_leg_span_max: f32,

    #[serde(default = "default_standing_knee_span_min")]
    pub standing_knee_span_min: f32,

    #[serde(default = "default_sitting_knee_span_max")]
    pub sitting_knee_span_max: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrationConfig {
    #[serde(default = "default_two_seconds")]
    pub movement_cooldown_secs: f64,

    #[serde(default = "default_wake_min_duration")]
    pub wake_min_duration_secs: f64,

    #[serde(default = "default_two_seconds")]
    pub event_cooldown_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_window_seconds")]
    pub window_seconds: f32,

    #[serde(default = "default_hop_seconds")]
    pub hop_seconds: f32,

    #[serde(default = "default_energy_threshold")]
    pub energy_threshold: f32,

    #[serde(default = "default_band_ratio_threshold")]
    pub band_ratio_threshold: f32,

    #[serde(default = "default_cry_cooldown")]
    pub cry_cooldown_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Save an annotated frame for every accepted event
    #[serde(default)]
    pub on_event: bool,

    /// Periodic annotated capture, 0 disables
    #[serde(default)]
    pub interval_secs: f64,
}

// Default value functions
fn default_movement_threshold() -> f32 {
    0.08
}

fn default_smoothing() -> f32 {
    0.6
}

fn default_visibility_threshold() -> f32 {
    0.5
}

fn default_standing_angle() -> f32 {
    35.0
}

fn default_lying_angle() -> f32 {
    65.0
}

fn default_lying_forward_ratio() -> f32 {
    0.45
}

fn default_standing_forward_ratio() -> f32 {
    0.35
}

fn default_standing_knee_angle() -> f32 {
    150.0
}

fn default_sitting_knee_min() -> f32 {
    70.0
}

fn default_sitting_knee_max() -> f32 {
    150.0
}

fn default_standing_leg_extension_min() -> f32 {
    0.22
}

fn default_sitting_leg_extension_max() -> f32 {
    0.18
}

fn default_standing_leg_span_min() -> f32 {
    0.22
}

fn default_sitting_leg_span_max() -> f32 {
    0.18
}

fn default_standing_knee_span_min() -> f32 {
    0.12
}

fn default_sitting_knee_span_max() -> f32 {
    0.10
}

fn default_two_seconds() -> f64 {
    2.0
}

fn default_wake_min_duration() -> f64 {
    3.0
}

fn default_window_seconds() -> f32 {
    2.0
}

fn default_hop_seconds() -> f32 {
    0.5
}

fn default_energy_threshold() -> f32 {
    0.01
}

fn default_band_ratio_threshold() -> f32 {
    0.45
}

fn default_cry_cooldown() -> f64 {
    5.0
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            pose: PoseConfig::default(),
            arbitration: ArbitrationConfig::default(),
            audio: AudioConfig::default(),
            snapshots: SnapshotConfig::default(),
        }
    }
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            movement_threshold: default_movement_threshold(),
            smoothing: default_smoothing(),
            visibility_threshold: default_visibility_threshold(),
            thresholds: PostureThresholds::default(),
        }
    }
}

impl Default for PostureThresholds {
    fn default() -> Self {
        Self {
            standing_angle: default_standing_angle(),
            lying_angle: default_lying_angle(),
            lying_forward_ratio: default_lying_forward_ratio(),
            standing_forward_ratio: default_standing_forward_ratio(),
            standing_knee_angle: default_standing_knee_angle(),
            sitting_knee_min: default_sitting_knee_min(),
            sitting_knee_max: default_sitting_knee_max(),
            standing_leg_extension_min: default_standing_leg_extension_min(),
            sitting_leg_extension_max: default_sitting_leg_extension_max(),
            standing_leg_span_min: default_standing_leg_span_min(),
            sitting_leg_span_max: default_sitting_leg_span_max(),
            standing_knee_span_min: default_standing_knee_span_min(),
            sitting_knee_span_max: default_sitting_knee_span_max(),
        }
    }
}

impl Default for ArbitrationConfig {
    fn default() -> Self {
        Self {
            movement_cooldown_secs: default_two_seconds(),
            wake_min_duration_secs: default_wake_min_duration(),
            event_cooldown_secs: default_two_seconds(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            window_seconds: default_window_seconds(),
            hop_seconds: default_hop_seconds(),
            energy_threshold: default_energy_threshold(),
            band_ratio_threshold: default_band_ratio_threshold(),
            cry_cooldown_secs: default_cry_cooldown(),
        }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            on_event: false,
            interval_secs: 0.0,
        }
    }
}

impl AnalyzerConfig {
    /// Reject values the analyzers cannot work with
    pub fn validate(&self) -> EngineResult<()> {
        let pose = &self.pose;
        if !(0.0..1.0).contains(&pose.smoothing) {
            return Err(EngineError::invalid_config(
                "pose.smoothing",
                "must be within [0, 1)",
            ));
        }
        if !(0.0..=1.0).contains(&pose.visibility_threshold) {
            return Err(EngineError::invalid_config(
                "pose.visibility_threshold",
                "must be within [0, 1]",
            ));
        }
        if pose.movement_threshold < 0.0 {
            return Err(EngineError::invalid_config(
                "pose.movement_threshold",
                "must not be negative",
            ));
        }

        let t = &pose.thresholds;
        if t.sitting_knee_min > t.sitting_knee_max {
            return Err(EngineError::invalid_config(
                "pose.thresholds.sitting_knee_min",
                "must not exceed sitting_knee_max",
            ));
        }
        if t.standing_angle >= t.lying_angle {
            return Err(EngineError::invalid_config(
                "pose.thresholds.standing_angle",
                "must be below lying_angle",
            ));
        }

        let arbitration = &self.arbitration;
        for (field, value) in [
            ("arbitration.movement_cooldown_secs", arbitration.movement_cooldown_secs),
            ("arbitration.wake_min_duration_secs", arbitration.wake_min_duration_secs),
            ("arbitration.event_cooldown_secs", arbitration.event_cooldown_secs),
            ("audio.cry_cooldown_secs", self.audio.cry_cooldown_secs),
            ("snapshots.interval_secs", self.snapshots.interval_secs),
        ] {
            if value < 0.0 {
                return Err(EngineError::invalid_config(field, "must not be negative"));
            }
        }

        let audio = &self.audio;
        if audio.window_seconds <= 0.0 || audio.hop_seconds <= 0.0 {
            return Err(EngineError::invalid_config(
                "audio.window_seconds",
                "window and hop must be positive",
            ));
        }
        if audio.hop_seconds > audio.window_seconds {
            return Err(EngineError::invalid_config(
                "audio.hop_seconds",
                "must not exceed window_seconds",
            ));
        }

        Ok(())
    }
}
