//! Movement detection from frame-to-frame landmark displacement.
//!
//! Low-visibility points are masked out in both frames and the score is the
//! mean Euclidean displacement of the points that are valid in both.

/// Masked world position of one landmark
type MaskedPoint = Option<[f32; 3]>;

/// Result of comparing a frame with the stored baseline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementSample {
    pub score: f32,
    pub detected: bool,
}

impl MovementSample {
    pub fn still() -> Self {
        Self {
            score: 0.0,
            detected: false,
        }
    }
}

/// Movement detector holding the previous frame as its baseline
#[derive(Debug, Clone)]
pub struct MovementDetector {
    threshold: f32,
    previous: Option<Vec<MaskedPoint>>,
}

impl MovementDetector {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            previous: None,
        }
    }

    /// Compare `positions` against the baseline, then make them the new baseline
    ///
    /// `positions` and `visible` are indexed by landmark. The first frame after
    /// construction or [`reset`](Self::reset) always scores 0.0.
    pub fn update(&mut self, positions: &[[f32; 3]], visible: &[bool]) -> MovementSample {
        let current: Vec<MaskedPoint> = positions
            .iter()
            .zip(visible)
            .map(|(p, &ok)| if ok { Some(*p) } else { None })
            .collect();

        let sample = match &self.previous {
            Some(previous) => self.compare(previous, &current),
            None => MovementSample::still(),
        };

        self.previous = Some(current);
        sample
    }

    fn compare(&self, previous: &[MaskedPoint], current: &[MaskedPoint]) -> MovementSample {
        if previous.len() != current.len() {
            return MovementSample::still();
        }

        let displacements: Vec<f32> = previous
            .iter()
            .zip(current)
            .filter_map(|(prev, cur)| match (prev, cur) {
                (Some(a), Some(b)) => {
                    let dx = b[0] - a[0];
                    let dy = b[1] - a[1];
                    let dz = b[2] - a[2];
                    Some((dx * dx + dy * dy + dz * dz).sqrt())
                }
                _ => None,
            })
            .collect();

        if displacements.is_empty() {
            return MovementSample::still();
        }

        let score = displacements.iter().sum::<f32>() / displacements.len() as f32;
        MovementSample {
            score,
            detected: score > self.threshold,
        }
    }

    pub fn has_baseline(&self) -> bool {
        self.previous.is_some()
    }

    /// Forget the baseline
    pub fn reset(&mut self) {
        self.previous = None;
    }
}
