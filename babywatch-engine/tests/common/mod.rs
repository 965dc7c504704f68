#![allow(dead_code)]

use std::collections::VecDeque;
use std::f64::consts::PI;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::Result;
use babywatch_engine::models::{
    AudioChunk, EstimatedPose, FeatureSet, Landmark, LandmarkSet, PoseLandmark, PoseObservation,
    Posture, VideoFrame, LANDMARK_COUNT,
};
use babywatch_engine::LandmarkEstimator;
use chrono::{DateTime, Duration, TimeZone, Utc};
use image::RgbImage;

/// Replays a fixed list of poses, then reports no body
pub struct ScriptedEstimator {
    poses: VecDeque<Option<EstimatedPose>>,
}

impl ScriptedEstimator {
    pub fn new(poses: Vec<Option<EstimatedPose>>) -> Self {
        Self { poses: poses.into() }
    }
}

impl LandmarkEstimator for ScriptedEstimator {
    fn estimate(&mut self, _image: &RgbImage) -> Result<Option<EstimatedPose>> {
        Ok(self.poses.pop_front().flatten())
    }
}

/// Scripted estimator that counts how many frames it was asked about
pub struct CountingEstimator {
    inner: ScriptedEstimator,
    calls: Arc<AtomicUsize>,
}

impl CountingEstimator {
    pub fn new(poses: Vec<Option<EstimatedPose>>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let estimator = Self {
            inner: ScriptedEstimator::new(poses),
            calls: calls.clone(),
        };
        (estimator, calls)
    }
}

impl LandmarkEstimator for CountingEstimator {
    fn estimate(&mut self, image: &RgbImage) -> Result<Option<EstimatedPose>> {
        let pose = self.inner.estimate(image);
        self.calls.fetch_add(1, Ordering::SeqCst);
        pose
    }
}

/// Poll `condition` until it holds, failing the test after two seconds
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(StdDuration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 21, 30, 0).unwrap()
}

pub fn at_ms(ms: i64) -> DateTime<Utc> {
    start_time() + Duration::milliseconds(ms)
}

/// Torso leaning `angle` degrees from vertical with hidden legs, shifted sideways by `offset`
pub fn leaning_pose(angle: f32, offset: f32) -> EstimatedPose {
    let rad = angle.to_radians();
    let (dx, dy) = (0.5 * rad.sin(), -0.5 * rad.cos());

    let mut world = vec![Landmark::new(offset, 0.0, 0.0, 1.0); LANDMARK_COUNT];
    world[PoseLandmark::LeftShoulder.index()] = Landmark::new(offset + dx, dy, 0.0, 1.0);
    world[PoseLandmark::RightShoulder.index()] = Landmark::new(offset + dx, dy, 0.0, 1.0);

    let mut image = vec![Landmark::new(0.5, 0.5, 0.0, 1.0); LANDMARK_COUNT];
    image[PoseLandmark::LeftShoulder.index()] = Landmark::new(0.4, 0.3, 0.0, 1.0);
    image[PoseLandmark::RightShoulder.index()] = Landmark::new(0.6, 0.3, 0.0, 1.0);
    for lm in [
        PoseLandmark::LeftKnee,
        PoseLandmark::RightKnee,
        PoseLandmark::LeftAnkle,
        PoseLandmark::RightAnkle,
    ] {
        image[lm.index()].visibility = 0.0;
    }

    EstimatedPose::new(LandmarkSet::new(image), LandmarkSet::new(world))
}

/// Leg geometry for [`posed_body`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Legs {
    /// Knees locked, feet well below the hips
    Straight,
    /// Knees at a right angle, feet tucked level with the hips
    Bent,
    /// Straight knees in view, ankles out of frame
    KneesOnly,
}

/// Torso leaning `angle` degrees from vertical with visible legs
pub fn posed_body(angle: f32, legs: Legs) -> EstimatedPose {
    let rad = angle.to_radians();
    let (dx, dy) = (0.5 * rad.sin(), -0.5 * rad.cos());

    let mut world = vec![Landmark::new(0.0, 0.0, 0.0, 1.0); LANDMARK_COUNT];
    world[PoseLandmark::LeftShoulder.index()] = Landmark::new(dx, dy, 0.0, 1.0);
    world[PoseLandmark::RightShoulder.index()] = Landmark::new(dx, dy, 0.0, 1.0);

    let ((knee_w, ankle_w), (knee_y, ankle_y)) = match legs {
        Legs::Straight | Legs::KneesOnly => (([0.0, 0.4, 0.0], [0.0, 0.8, 0.0]), (0.7, 0.9)),
        Legs::Bent => (([0.0, 0.0, -0.4], [0.0, 0.4, -0.4]), (0.52, 0.54)),
    };

    let mut image = vec![Landmark::new(0.5, 0.5, 0.0, 1.0); LANDMARK_COUNT];
    for (knee, ankle) in [
        (PoseLandmark::LeftKnee, PoseLandmark::LeftAnkle),
        (PoseLandmark::RightKnee, PoseLandmark::RightAnkle),
    ] {
        world[knee.index()] = Landmark::new(knee_w[0], knee_w[1], knee_w[2], 1.0);
        world[ankle.index()] = Landmark::new(ankle_w[0], ankle_w[1], ankle_w[2], 1.0);
        image[knee.index()].y = knee_y;
        image[ankle.index()].y = ankle_y;
        if legs == Legs::KneesOnly {
            image[ankle.index()].visibility = 0.0;
        }
    }

    EstimatedPose::new(LandmarkSet::new(image), LandmarkSet::new(world))
}

pub fn frame_at(ms: i64) -> VideoFrame {
    VideoFrame::new(RgbImage::new(64, 48), at_ms(ms))
}

pub fn observation(ms: i64, posture: Posture, movement_detected: bool) -> PoseObservation {
    PoseObservation {
        timestamp: at_ms(ms),
        posture,
        movement_score: if movement_detected { 0.2 } else { 0.0 },
        movement_detected,
        features: FeatureSet::default(),
        landmarks: None,
    }
}

/// Mono 16-bit PCM made of equal-amplitude sine tones
pub fn tone(frequencies: &[f64], amplitude: f64, sample_rate: u32, seconds: f64) -> Vec<i16> {
    let len = (sample_rate as f64 * seconds) as usize;
    let per_tone = amplitude / frequencies.len() as f64;
    (0..len)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            let value: f64 = frequencies.iter().map(|f| per_tone * (2.0 * PI * f * t).sin()).sum();
            (value * 32767.0) as i16
        })
        .collect()
}

/// Split PCM into 20 ms chunks stamped from `start_ms`
pub fn chunks(samples: &[i16], sample_rate: u32, start_ms: i64) -> Vec<AudioChunk> {
    let size = (sample_rate / 50) as usize;
    samples
        .chunks(size)
        .enumerate()
        .map(|(i, block)| AudioChunk::new(block.to_vec(), 1, sample_rate, at_ms(start_ms + 20 * i as i64)))
        .collect()
}
