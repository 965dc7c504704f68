pub mod analyzer;

pub use analyzer::{
    AnalyzerConfig, ArbitrationConfig, AudioConfig, PoseConfig, PostureThresholds,
    SnapshotConfig,
};
