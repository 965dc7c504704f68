//! Feature extraction from an estimated pose
//!
//! Angles come from the world landmarks, heights and spans from the
//! normalized image landmarks. Visibility is always read from the image set.

use crate::models::{EstimatedPose, FeatureSet, LandmarkSet, PoseLandmark};
use crate::services::geometry::{self, AngleSmoother, MIN_VECTOR_NORM};

const HIPS: [PoseLandmark; 2] = [PoseLandmark::LeftHip, PoseLandmark::RightHip];
const KNEES: [PoseLandmark; 2] = [PoseLandmark::LeftKnee, PoseLandmark::RightKnee];
const ANKLES: [PoseLandmark; 2] = [PoseLandmark::LeftAnkle, PoseLandmark::RightAnkle];

/// Shoulder centre minus hip centre in world coordinates
pub fn torso_vector(world: &LandmarkSet) -> Option<[f32; 3]> {
    let shoulders = world.midpoint(PoseLandmark::LeftShoulder, PoseLandmark::RightShoulder)?;
    let hips = world.midpoint(PoseLandmark::LeftHip, PoseLandmark::RightHip)?;
    Some(geometry::sub(shoulders, hips))
}

/// Builds a [`FeatureSet`] for each frame
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    visibility_threshold: f32,
}

impl FeatureExtractor {
    pub fn new(visibility_threshold: f32) -> Self {
        Self {
            visibility_threshold: visibility_threshold.clamp(0.0, 1.0),
        }
    }

    pub fn visibility_threshold(&self) -> f32 {
        self.visibility_threshold
    }

    /// Extract features, feeding the raw torso angle through `smoother`
    ///
    /// Returns `None` without touching the smoother when the torso vector
    /// is missing or degenerate.
    pub fn extract(&self, pose: &EstimatedPose, smoother: &mut AngleSmoother) -> Option<FeatureSet> {
        let torso = torso_vector(&pose.world)?;
        if geometry::norm(torso) < MIN_VECTOR_NORM {
            return None;
        }

        let torso_angle = smoother.update(geometry::angle_to_vertical(torso));
        let forward_component = geometry::forward_component(torso);

        let left_knee_angle = self.knee_angle(
            pose,
            PoseLandmark::LeftHip,
            PoseLandmark::LeftKnee,
            PoseLandmark::LeftAnkle,
        );
        let right_knee_angle = self.knee_angle(
            pose,
            PoseLandmark::RightHip,
            PoseLandmark::RightKnee,
            PoseLandmark::RightAnkle,
        );
        let avg_knee_angle = match (left_knee_angle, right_knee_angle) {
            (Some(l), Some(r)) => Some((l + r) / 2.0),
            (Some(a), None) | (None, Some(a)) => Some(a),
            (None, None) => None,
        };

        let hip_height = self.mean_height(&pose.image, &HIPS);
        let knee_height = self.mean_height(&pose.image, &KNEES);
        let ankle_height = self.mean_height(&pose.image, &ANKLES);

        let leg_span = match (hip_height, ankle_height) {
            (Some(hip), Some(ankle)) => Some(ankle - hip),
            _ => None,
        };
        let knee_span = match (hip_height, knee_height) {
            (Some(hip), Some(knee)) => Some(knee - hip),
            _ => None,
        };

        Some(FeatureSet {
            torso_angle,
            forward_component,
            avg_knee_angle,
            left_knee_angle,
            right_knee_angle,
            // ankle height minus hip height, positive when legs hang below the hips
            leg_extension: leg_span,
            hip_height,
            knee_height,
            ankle_height,
            leg_span,
            knee_span,
        })
    }

    fn knee_angle(
        &self,
        pose: &EstimatedPose,
        hip: PoseLandmark,
        knee: PoseLandmark,
        ankle: PoseLandmark,
    ) -> Option<f32> {
        let all_visible = [hip, knee, ankle].iter().all(|&lm| {
            pose.image
                .get(lm)
                .map(|p| p.is_visible(self.visibility_threshold))
                .unwrap_or(false)
        });
        if !all_visible {
            return None;
        }

        let a = pose.world.get(hip)?.position();
        let b = pose.world.get(knee)?.position();
        let c = pose.world.get(ankle)?.position();
        Some(geometry::joint_angle(a, b, c))
    }

    /// Mean image-space y of the visible landmarks among `landmarks`
    fn mean_height(&self, image: &LandmarkSet, landmarks: &[PoseLandmark]) -> Option<f32> {
        let heights: Vec<f32> = landmarks
            .iter()
            .filter_map(|&lm| image.get(lm))
            .filter(|p| p.is_visible(self.visibility_threshold))
            .map(|p| p.y)
            .collect();

        if heights.is_empty() {
            return None;
        }
        Some(heights.iter().sum::<f32>() / heights.len() as f32)
    }
}
