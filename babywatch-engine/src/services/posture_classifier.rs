//! Posture Classification Service
//!
//! Two-stage decision over a [`FeatureSet`]:
//! - a hard lying gate on torso angle and forward lean
//! - score voting between sitting and standing, absent features abstain
//!
//! When neither side collects enough votes the torso angle alone decides.

use crate::config::PostureThresholds;
use crate::models::{FeatureSet, Posture};

/// Margin added to the lying thresholds for the hard gate
const LYING_GATE_ANGLE_MARGIN: f32 = 5.0;
const LYING_GATE_FORWARD_MARGIN: f32 = 0.08;

/// Votes needed before a side can win
const MIN_VOTES: u32 = 2;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Votes {
    standing: u32,
    sitting: u32,
}

/// Rule-based posture classifier
#[derive(Debug, Clone)]
pub struct PostureClassifier {
    thresholds: PostureThresholds,
}

impl PostureClassifier {
    pub fn new(thresholds: PostureThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &PostureThresholds {
        &self.thresholds
    }

    /// Classify one frame's features
    pub fn classify(&self, features: &FeatureSet) -> Posture {
        let t = &self.thresholds;
        let angle = features.torso_angle;
        let forward = features.forward_component;

        if self.is_clearly_lying(angle, forward) {
            return Posture::Lying;
        }

        let votes = self.count_votes(features);
        if votes.standing >= votes.sitting.max(MIN_VOTES) {
            return Posture::Standing;
        }
        if votes.sitting >= votes.standing.max(MIN_VOTES) {
            return Posture::Sitting;
        }

        if angle <= t.standing_angle + 6.0 {
            Posture::Standing
        } else if angle <= t.lying_angle + 8.0 {
            Posture::Sitting
        } else {
            Posture::Lying
        }
    }

    fn is_clearly_lying(&self, angle: f32, forward: f32) -> bool {
        let t = &self.thresholds;
        angle >= t.lying_angle + LYING_GATE_ANGLE_MARGIN
            || forward >= t.lying_forward_ratio + LYING_GATE_FORWARD_MARGIN
    }

    fn count_votes(&self, features: &FeatureSet) -> Votes {
        let t = &self.thresholds;
        let mut votes = Votes::default();

        if let Some(knee) = features.avg_knee_angle {
            if knee >= t.standing_knee_angle {
                votes.standing += 1;
            }
            if (t.sitting_knee_min..=t.sitting_knee_max).contains(&knee) {
                votes.sitting += 1;
            }
        }

        if let Some(extension) = features.leg_extension {
            if extension >= t.standing_leg_extension_min {
                votes.standing += 1;
            }
            if extension <= t.sitting_leg_extension_max {
                votes.sitting += 1;
            }
        }

        if let Some(span) = features.leg_span {
            if span >= t.standing_leg_span_min {
                votes.standing += 1;
            }
            if span < t.sitting_leg_span_max {
                votes.sitting += 1;
            }
        }

        if let Some(span) = features.knee_span {
            if span >= t.standing_knee_span_min {
                votes.standing += 1;
            }
            if span < t.sitting_knee_span_max {
                votes.sitting += 1;
            }
        }

        let angle = features.torso_angle;
        if angle <= t.standing_angle + 5.0 && features.forward_component <= t.standing_forward_ratio + 0.05 {
            votes.standing += 1;
        } else if angle <= t.lying_angle + 8.0 {
            votes.sitting += 1;
        }

        votes
    }
}

impl Default for PostureClassifier {
    fn default() -> Self {
        Self::new(PostureThresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn torso_only(angle: f32, forward: f32) -> FeatureSet {
        FeatureSet {
            torso_angle: angle,
            forward_component: forward,
            ..Default::default()
        }
    }

    #[test]
    fn test_hard_lying_gate_on_angle() {
        let classifier = PostureClassifier::default();
        let mut features = torso_only(70.0, 0.0);
        features.avg_knee_angle = Some(175.0);
        features.leg_span = Some(0.4);
        features.knee_span = Some(0.2);
        assert_eq!(classifier.classify(&features), Posture::Lying);
    }

    #[test]
    fn test_hard_lying_gate_on_forward_lean() {
        let classifier = PostureClassifier::default();
        assert_eq!(classifier.classify(&torso_only(10.0, 0.6)), Posture::Lying);
    }

    #[test]
    fn test_standing_with_extended_legs() {
        let classifier = PostureClassifier::default();
        let features = FeatureSet {
            torso_angle: 8.0,
            forward_component: 0.1,
            avg_knee_angle: Some(172.0),
            leg_extension: Some(0.35),
            leg_span: Some(0.35),
            knee_span: Some(0.18),
            ..Default::default()
        };
        assert_eq!(classifier.classify(&features), Posture::Standing);
    }

    #[test]
    fn test_sitting_with_bent_knees() {
        let classifier = PostureClassifier::default();
        let features = FeatureSet {
            torso_angle: 20.0,
            forward_component: 0.1,
            avg_knee_angle: Some(95.0),
            leg_extension: Some(0.05),
            leg_span: Some(0.05),
            knee_span: Some(0.04),
            ..Default::default()
        };
        assert_eq!(classifier.classify(&features), Posture::Sitting);
    }

    #[test]
    fn test_fallback_uses_torso_angle() {
        let classifier = PostureClassifier::default();
        // a single torso vote never reaches the minimum
        assert_eq!(classifier.classify(&torso_only(20.0, 0.0)), Posture::Standing);
        assert_eq!(classifier.classify(&torso_only(50.0, 0.0)), Posture::Sitting);
        assert_eq!(classifier.classify(&torso_only(69.0, 0.0)), Posture::Sitting);
    }

    #[test]
    fn test_ties_prefer_standing() {
        let classifier = PostureClassifier::default();
        let features = FeatureSet {
            torso_angle: 50.0,
            forward_component: 0.0,
            avg_knee_angle: Some(170.0),
            leg_extension: Some(0.3),
            leg_span: Some(0.05),
            knee_span: Some(0.05),
            ..Default::default()
        };
        // standing 2 (knee, extension), sitting 3 (spans, torso)
        assert_eq!(classifier.classify(&features), Posture::Sitting);

        let tied = FeatureSet {
            knee_span: None,
            ..features
        };
        assert_eq!(classifier.classify(&tied), Posture::Standing);
    }

    #[test]
    fn test_boundary_knee_votes_for_both() {
        let classifier = PostureClassifier::default();
        let features = FeatureSet {
            torso_angle: 50.0,
            forward_component: 0.0,
            avg_knee_angle: Some(150.0),
            ..Default::default()
        };
        // knee votes both ways, torso votes sitting
        assert_eq!(classifier.classify(&features), Posture::Sitting);
    }

    proptest! {
        #[test]
        fn prop_lying_gate_is_monotonic(
            angle in 0.0f32..180.0,
            extra in 0.0f32..90.0,
            forward in 0.0f32..1.0,
            knee in proptest::option::of(0.0f32..180.0),
            span in proptest::option::of(-0.5f32..0.5),
        ) {
            let classifier = PostureClassifier::default();
            let base = FeatureSet {
                torso_angle: angle,
                forward_component: forward,
                avg_knee_angle: knee,
                leg_span: span,
                ..Default::default()
            };
            if classifier.classify(&base) == Posture::Lying && angle >= 70.0 {
                let steeper = FeatureSet { torso_angle: angle + extra, ..base.clone() };
                prop_assert_eq!(classifier.classify(&steeper), Posture::Lying);
            }
            if angle >= 70.0 || forward >= 0.54 {
                prop_assert_eq!(classifier.classify(&base), Posture::Lying);
            }
        }
    }
}
