//! Pose Observation Pipeline
//!
//! Runs the landmark estimator on a frame and turns its output into a
//! [`PoseObservation`]:
//! - feature extraction with a smoothed torso angle
//! - posture classification
//! - frame-to-frame movement scoring
//!
//! Any frame that cannot be analyzed invalidates the smoothing and movement
//! baselines so the next valid frame starts fresh.

use anyhow::Result;
use image::RgbImage;

use crate::config::PoseConfig;
use crate::models::{EstimatedPose, PoseObservation, VideoFrame};
use crate::services::feature_extractor::FeatureExtractor;
use crate::services::geometry::AngleSmoother;
use crate::services::movement_detector::MovementDetector;
use crate::services::posture_classifier::PostureClassifier;

/// Black-box body landmark model
///
/// Returns `Ok(None)` when no body is found in the frame.
pub trait LandmarkEstimator: Send {
    fn estimate(&mut self, image: &RgbImage) -> Result<Option<EstimatedPose>>;
}

impl<T: LandmarkEstimator + ?Sized> LandmarkEstimator for Box<T> {
    fn estimate(&mut self, image: &RgbImage) -> Result<Option<EstimatedPose>> {
        (**self).estimate(image)
    }
}

/// Per-session pose analyzer
pub struct PoseAnalyzer<E> {
    estimator: E,
    extractor: FeatureExtractor,
    classifier: PostureClassifier,
    smoother: AngleSmoother,
    movement: MovementDetector,
}

impl<E: LandmarkEstimator> PoseAnalyzer<E> {
    pub fn new(estimator: E, config: &PoseConfig) -> Self {
        Self {
            estimator,
            extractor: FeatureExtractor::new(config.visibility_threshold),
            classifier: PostureClassifier::new(config.thresholds.clone()),
            smoother: AngleSmoother::new(config.smoothing),
            movement: MovementDetector::new(config.movement_threshold),
        }
    }

    /// Analyze a single frame
    ///
    /// # Returns
    /// `Ok(None)` when the frame holds no usable body, `Err` when the
    /// estimator itself failed. Both cases reset the temporal state.
    pub fn process_frame(&mut self, frame: &VideoFrame) -> Result<Option<PoseObservation>> {
        let pose = match self.estimator.estimate(&frame.image) {
            Ok(Some(pose)) => pose,
            Ok(None) => {
                self.invalidate();
                return Ok(None);
            }
            Err(e) => {
                self.invalidate();
                return Err(e);
            }
        };

        Ok(self.analyze_pose(pose, frame))
    }

    fn analyze_pose(&mut self, pose: EstimatedPose, frame: &VideoFrame) -> Option<PoseObservation> {
        if !pose.is_consistent() {
            tracing::warn!(
                image_points = pose.image.len(),
                world_points = pose.world.len(),
                "Discarding pose with mismatched landmark sets"
            );
            self.invalidate();
            return None;
        }

        let Some(features) = self.extractor.extract(&pose, &mut self.smoother) else {
            tracing::debug!("Degenerate torso vector, skipping frame");
            self.invalidate();
            return None;
        };

        let posture = self.classifier.classify(&features);

        let threshold = self.extractor.visibility_threshold();
        let visible = pose.image.visibility_mask(threshold);
        let positions: Vec<[f32; 3]> = pose.world.points().iter().map(|p| p.position()).collect();
        let movement = self.movement.update(&positions, &visible);

        Some(PoseObservation {
            timestamp: frame.captured_at,
            posture,
            movement_score: movement.score,
            movement_detected: movement.detected,
            features,
            landmarks: Some(pose.image),
        })
    }

    /// Drop the smoothing and movement baselines
    pub fn invalidate(&mut self) {
        self.smoother.reset();
        self.movement.reset();
    }

    /// Return to the state of a freshly created analyzer
    pub fn reset(&mut self) {
        self.invalidate();
        tracing::debug!("Pose analyzer state reset");
    }

    pub fn visibility_threshold(&self) -> f32 {
        self.extractor.visibility_threshold()
    }

    pub fn estimator_mut(&mut self) -> &mut E {
        &mut self.estimator
    }
}
