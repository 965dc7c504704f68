mod common;

use babywatch_engine::config::PoseConfig;
use babywatch_engine::models::{EstimatedPose, Posture};
use babywatch_engine::services::PoseAnalyzer;
use pretty_assertions::assert_eq;

use common::{frame_at, leaning_pose, posed_body, Legs, ScriptedEstimator};

fn run(config: &PoseConfig, angles: &[f32]) -> Vec<Posture> {
    let poses = angles.iter().map(|&a| leaning_pose(a, 0.0)).collect();
    classify_all(config, poses)
}

fn classify_all(config: &PoseConfig, poses: Vec<EstimatedPose>) -> Vec<Posture> {
    let count = poses.len();
    let mut analyzer = PoseAnalyzer::new(ScriptedEstimator::new(poses.into_iter().map(Some).collect()), config);

    (0..count)
        .map(|i| {
            analyzer
                .process_frame(&frame_at(i as i64 * 100))
                .unwrap()
                .expect("pose should be analyzed")
                .posture
        })
        .collect()
}

fn rank(posture: Posture) -> u8 {
    match posture {
        Posture::Standing => 0,
        Posture::Sitting => 1,
        Posture::Lying => 2,
    }
}

#[test]
fn test_unsmoothed_ramp_passes_through_each_posture() {
    let config = PoseConfig {
        smoothing: 0.0,
        ..PoseConfig::default()
    };
    let postures = run(&config, &[10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 75.0, 80.0]);

    assert_eq!(
        postures,
        vec![
            Posture::Standing,
            Posture::Standing,
            Posture::Standing,
            Posture::Standing,
            Posture::Sitting,
            Posture::Sitting,
            Posture::Lying,
            Posture::Lying,
        ]
    );
}

#[test]
fn test_smoothed_ramp_never_oscillates() {
    let mut angles: Vec<f32> = (1..=8).map(|i| i as f32 * 10.0).collect();
    angles.extend(std::iter::repeat(80.0).take(20));

    let postures = run(&PoseConfig::default(), &angles);

    assert_eq!(postures[0], Posture::Standing);
    assert_eq!(*postures.last().unwrap(), Posture::Lying);
    assert!(
        postures.windows(2).all(|w| rank(w[0]) <= rank(w[1])),
        "posture went backwards: {:?}",
        postures
    );
}

#[test]
fn test_movement_follows_displacement() {
    let poses = vec![
        Some(leaning_pose(10.0, 0.0)),
        Some(leaning_pose(10.0, 0.01)),
        Some(leaning_pose(10.0, 0.3)),
    ];
    let mut analyzer = PoseAnalyzer::new(ScriptedEstimator::new(poses), &PoseConfig::default());

    let first = analyzer.process_frame(&frame_at(0)).unwrap().unwrap();
    let small = analyzer.process_frame(&frame_at(100)).unwrap().unwrap();
    let large = analyzer.process_frame(&frame_at(200)).unwrap().unwrap();

    assert_eq!(first.movement_score, 0.0);
    assert!(!first.movement_detected);
    assert!(!small.movement_detected);
    assert!(large.movement_detected);
    assert!((large.movement_score - 0.29).abs() < 1e-3);
}

#[test]
fn test_lost_body_restarts_smoothing() {
    let poses = vec![Some(leaning_pose(10.0, 0.0)), None, Some(leaning_pose(80.0, 0.0))];
    let mut analyzer = PoseAnalyzer::new(ScriptedEstimator::new(poses), &PoseConfig::default());

    analyzer.process_frame(&frame_at(0)).unwrap();
    assert!(analyzer.process_frame(&frame_at(100)).unwrap().is_none());
    let after = analyzer.process_frame(&frame_at(200)).unwrap().unwrap();

    // first frame after invalidation takes the raw angle
    assert!((after.features.torso_angle - 80.0).abs() < 1e-2);
    assert_eq!(after.posture, Posture::Lying);
    assert_eq!(after.movement_score, 0.0);
}

/// Legs straighten out while upright and fold once the torso tips past 45 degrees
fn body_ramp(angles: &[f32]) -> Vec<EstimatedPose> {
    angles
        .iter()
        .map(|&a| posed_body(a, if a <= 45.0 { Legs::Straight } else { Legs::Bent }))
        .collect()
}

#[test]
fn test_leg_votes_decide_the_middle_of_the_ramp() {
    let config = PoseConfig {
        smoothing: 0.0,
        ..PoseConfig::default()
    };
    let postures = classify_all(&config, body_ramp(&[10.0, 20.0, 30.0, 40.0, 45.0, 50.0, 60.0, 75.0, 80.0]));

    // at 45 degrees the angle alone says sitting, the straight legs outvote it
    assert_eq!(
        postures,
        vec![
            Posture::Standing,
            Posture::Standing,
            Posture::Standing,
            Posture::Standing,
            Posture::Standing,
            Posture::Sitting,
            Posture::Sitting,
            Posture::Lying,
            Posture::Lying,
        ]
    );
}

#[test]
fn test_smoothed_body_ramp_never_oscillates() {
    let mut angles: Vec<f32> = (1..=8).map(|i| i as f32 * 10.0).collect();
    angles.extend(std::iter::repeat(80.0).take(20));

    let postures = classify_all(&PoseConfig::default(), body_ramp(&angles));

    assert_eq!(postures[0], Posture::Standing);
    assert!(postures.contains(&Posture::Sitting));
    assert_eq!(*postures.last().unwrap(), Posture::Lying);
    assert!(
        postures.windows(2).all(|w| rank(w[0]) <= rank(w[1])),
        "posture went backwards: {:?}",
        postures
    );
}

#[test]
fn test_single_leg_vote_falls_back_to_angle() {
    let config = PoseConfig {
        smoothing: 0.0,
        ..PoseConfig::default()
    };
    let postures = classify_all(
        &config,
        vec![posed_body(45.0, Legs::Straight), posed_body(45.0, Legs::KneesOnly)],
    );

    // one knee-span vote for standing against one angle vote for sitting
    assert_eq!(postures, vec![Posture::Standing, Posture::Sitting]);
}
