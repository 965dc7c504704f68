//! Body landmark models
//!
//! Landmarks follow the 33-point BlazePose topology. The index of a landmark
//! inside a [`LandmarkSet`] is its semantic identity and never changes
//! between frames.

use serde::{Deserialize, Serialize};

/// Number of points in a full BlazePose landmark set
pub const LANDMARK_COUNT: usize = 33;

/// A single body point with position and visibility
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Estimator confidence that the point is visible (0-1)
    #[serde(default = "default_visibility")]
    pub visibility: f32,
}

fn default_visibility() -> f32 {
    1.0
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self { x, y, z, visibility }
    }

    /// Check if the point clears the visibility threshold
    pub fn is_visible(&self, threshold: f32) -> bool {
        self.visibility >= threshold
    }

    pub fn position(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Euclidean distance to another landmark in 3D
    pub fn distance_to(&self, other: &Landmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl Default for Landmark {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            visibility: 0.0,
        }
    }
}

/// Landmark indices used by the analyzers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoseLandmark {
    Nose = 0,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
}

impl PoseLandmark {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
        }
    }
}

/// Skeleton segments drawn on annotated snapshots
pub const POSE_CONNECTIONS: [(PoseLandmark, PoseLandmark); 12] = [
    // torso
    (PoseLandmark::LeftShoulder, PoseLandmark::RightShoulder),
    (PoseLandmark::LeftShoulder, PoseLandmark::LeftHip),
    (PoseLandmark::RightShoulder, PoseLandmark::RightHip),
    (PoseLandmark::LeftHip, PoseLandmark::RightHip),
    // arms
    (PoseLandmark::LeftShoulder, PoseLandmark::LeftElbow),
    (PoseLandmark::LeftElbow, PoseLandmark::LeftWrist),
    (PoseLandmark::RightShoulder, PoseLandmark::RightElbow),
    (PoseLandmark::RightElbow, PoseLandmark::RightWrist),
    // legs
    (PoseLandmark::LeftHip, PoseLandmark::LeftKnee),
    (PoseLandmark::LeftKnee, PoseLandmark::LeftAnkle),
    (PoseLandmark::RightHip, PoseLandmark::RightKnee),
    (PoseLandmark::RightKnee, PoseLandmark::RightAnkle),
];

/// Ordered landmarks for one frame
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    points: Vec<Landmark>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether every landmark the analyzers reference is present
    pub fn covers_body(&self) -> bool {
        self.points.len() > PoseLandmark::RightAnkle.index()
    }

    pub fn get(&self, landmark: PoseLandmark) -> Option<&Landmark> {
        self.points.get(landmark.index())
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    /// Per-point visibility mask
    pub fn visibility_mask(&self, threshold: f32) -> Vec<bool> {
        self.points.iter().map(|p| p.is_visible(threshold)).collect()
    }

    /// Midpoint of two landmarks
    pub fn midpoint(&self, a: PoseLandmark, b: PoseLandmark) -> Option<[f32; 3]> {
        let pa = self.get(a)?;
        let pb = self.get(b)?;
        Some([
            (pa.x + pb.x) / 2.0,
            (pa.y + pb.y) / 2.0,
            (pa.z + pb.z) / 2.0,
        ])
    }
}

impl From<Vec<Landmark>> for LandmarkSet {
    fn from(points: Vec<Landmark>) -> Self {
        Self::new(points)
    }
}

/// Estimator output for a single frame
///
/// `image` holds normalized image coordinates (y grows downward) and carries
/// the visibility scores; `world` holds metric coordinates centred on the
/// hips with the same point ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatedPose {
    pub image: LandmarkSet,
    pub world: LandmarkSet,
}

impl EstimatedPose {
    pub fn new(image: LandmarkSet, world: LandmarkSet) -> Self {
        Self { image, world }
    }

    /// Both sets must describe the same skeleton
    pub fn is_consistent(&self) -> bool {
        self.image.len() == self.world.len() && self.image.covers_body()
    }
}
