//! Geometry helpers shared by the pose pipeline
//!
//! - Torso angle against the vertical axis
//! - Forward-lean share of a vector
//! - Three-point joint angles
//! - Exponential smoothing of the torso angle

/// Vectors shorter than this are treated as degenerate
pub const MIN_VECTOR_NORM: f32 = 1e-6;

/// Up direction in world coordinates (y grows downward)
const VERTICAL: [f32; 3] = [0.0, -1.0, 0.0];

pub fn norm(v: [f32; 3]) -> f32 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// Angle between `v` and the up direction, in degrees
///
/// A degenerate vector reports 90 degrees.
pub fn angle_to_vertical(v: [f32; 3]) -> f32 {
    let n = norm(v);
    if n < MIN_VECTOR_NORM {
        return 90.0;
    }
    let cos_angle = dot(v, VERTICAL) / n;
    cos_angle.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Share of the vector pointing towards or away from the camera
pub fn forward_component(v: [f32; 3]) -> f32 {
    let n = norm(v);
    if n < MIN_VECTOR_NORM {
        return 0.0;
    }
    v[2].abs() / n
}

/// Angle at joint `b` formed by the segments to `a` and `c`, in degrees
///
/// Returns 0.0 when either segment has no length.
pub fn joint_angle(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> f32 {
    let ba = sub(a, b);
    let bc = sub(c, b);
    let mag_ba = norm(ba);
    let mag_bc = norm(bc);

    if mag_ba < MIN_VECTOR_NORM || mag_bc < MIN_VECTOR_NORM {
        return 0.0;
    }

    let cos_angle = dot(ba, bc) / (mag_ba * mag_bc);
    cos_angle.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Exponential filter: `prev = alpha * prev + (1 - alpha) * current`
#[derive(Debug, Clone)]
pub struct AngleSmoother {
    alpha: f32,
    previous: Option<f32>,
}

impl AngleSmoother {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            previous: None,
        }
    }

    /// Feed a raw value and get the filtered one back
    pub fn update(&mut self, raw: f32) -> f32 {
        let smoothed = match self.previous {
            Some(prev) => self.alpha * prev + (1.0 - self.alpha) * raw,
            None => raw,
        };
        self.previous = Some(smoothed);
        smoothed
    }

    pub fn current(&self) -> Option<f32> {
        self.previous
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upright_vector_is_zero_degrees() {
        assert!(angle_to_vertical([0.0, -0.5, 0.0]).abs() < 1e-4);
    }

    #[test]
    fn test_horizontal_vector_is_ninety_degrees() {
        assert!((angle_to_vertical([0.5, 0.0, 0.0]) - 90.0).abs() < 1e-4);
        assert!((angle_to_vertical([0.0, 0.0, 0.5]) - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_degenerate_vector() {
        assert_eq!(angle_to_vertical([0.0, 0.0, 0.0]), 90.0);
        assert_eq!(forward_component([0.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_forward_component() {
        assert!((forward_component([0.0, -3.0, 4.0]) - 0.8).abs() < 1e-6);
        assert!((forward_component([0.0, -3.0, -4.0]) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_joint_angle_right_angle() {
        let angle = joint_angle([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]);
        assert!((angle - 90.0).abs() < 1e-3);
    }

    #[test]
    fn test_joint_angle_straight_leg() {
        let angle = joint_angle([0.0, 0.0, 0.0], [0.0, 0.4, 0.0], [0.0, 0.8, 0.0]);
        assert!((angle - 180.0).abs() < 0.1);
    }

    #[test]
    fn test_joint_angle_degenerate() {
        assert_eq!(joint_angle([1.0, 1.0, 1.0], [1.0, 1.0, 1.0], [0.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_smoother_first_value_passes_through() {
        let mut smoother = AngleSmoother::new(0.6);
        assert_eq!(smoother.update(42.0), 42.0);
        let next = smoother.update(52.0);
        assert!((next - 46.0).abs() < 1e-4);
    }

    #[test]
    fn test_smoother_reset() {
        let mut smoother = AngleSmoother::new(0.6);
        smoother.update(10.0);
        smoother.reset();
        assert!(smoother.current().is_none());
        assert_eq!(smoother.update(70.0), 70.0);
    }
}
