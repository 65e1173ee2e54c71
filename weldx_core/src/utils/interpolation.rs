// weldx_core/src/utils/interpolation.rs

use nalgebra::{Isometry3, Translation3, UnitQuaternion};
use num_traits::Float;

/// The two samples surrounding a query time and the blend weight between them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub lower: usize,
    pub upper: usize,
    /// 0.0 selects `lower`, 1.0 selects `upper`.
    pub weight: f64,
}

/// Finds the segment of the sorted `axis` that contains `t`.
///
/// Points before the first or after the last sample clamp to that sample,
/// which is exactly the "hold boundary values" extrapolation.
pub fn locate(axis: &[f64], t: f64) -> Segment {
    let last = axis.len() - 1;
    if axis.len() == 1 || t <= axis[0] {
        return Segment { lower: 0, upper: 0, weight: 0.0 };
    }
    if t >= axis[last] {
        return Segment { lower: last, upper: last, weight: 0.0 };
    }
    // First index whose value is strictly greater than t.
    let upper = axis.partition_point(|v| *v <= t);
    let lower = upper - 1;
    let span = axis[upper] - axis[lower];
    Segment {
        lower,
        upper,
        weight: (t - axis[lower]) / span,
    }
}

/// Index of the last sample at or before `t` (the first sample if `t` precedes the axis).
pub fn locate_step(axis: &[f64], t: f64) -> usize {
    axis.partition_point(|v| *v <= t).saturating_sub(1)
}

pub fn lerp<T: Float>(a: T, b: T, weight: T) -> T {
    a + (b - a) * weight
}

/// Spherical interpolation along the shortest arc.
pub fn slerp(q0: &UnitQuaternion<f64>, q1: &UnitQuaternion<f64>, weight: f64) -> UnitQuaternion<f64> {
    // try_slerp only gives up when both rotations are (numerically) identical.
    q0.try_slerp(q1, weight, 1e-12).unwrap_or(*q0)
}

/// Blends two poses: translation linearly, rotation with slerp.
pub fn interpolate_pose(a: &Isometry3<f64>, b: &Isometry3<f64>, weight: f64) -> Isometry3<f64> {
    let ta = &a.translation.vector;
    let tb = &b.translation.vector;
    let translation = Translation3::new(
        lerp(ta.x, tb.x, weight),
        lerp(ta.y, tb.y, weight),
        lerp(ta.z, tb.z, weight),
    );
    Isometry3::from_parts(translation, slerp(&a.rotation, &b.rotation, weight))
}
