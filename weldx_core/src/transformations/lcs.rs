// weldx_core/src/transformations/lcs.rs

use chrono::TimeDelta;
use nalgebra::{Isometry3, Matrix3, Rotation3, Translation3, UnitQuaternion, Vector3};

use crate::annotations::{Annotated, Annotations};
use crate::error::{Result, WeldxError};
use crate::time::{ReferenceTime, TimeAxis};
use crate::units::LengthUnit;
use crate::utils::interpolation::{interpolate_pose, locate};

/// Tolerance used to accept a 3x3 matrix as a proper rotation.
const ORTHONORMAL_EPS: f64 = 1e-6;

// =========================================================================
// == Motion: static vs. time-indexed transforms ==
// =========================================================================

/// The transform carried by an LCS, either fixed or sampled over time.
///
/// Translations are stored in metres.
#[derive(Debug, Clone, PartialEq)]
pub enum Motion {
    Static(Isometry3<f64>),
    TimeSeries {
        time: TimeAxis,
        poses: Vec<Isometry3<f64>>,
    },
}

impl Motion {
    fn map_poses(&self, f: impl Fn(&Isometry3<f64>) -> Isometry3<f64>) -> Motion {
        match self {
            Motion::Static(iso) => Motion::Static(f(iso)),
            Motion::TimeSeries { time, poses } => Motion::TimeSeries {
                time: time.clone(),
                poses: poses.iter().map(f).collect(),
            },
        }
    }

    /// Samples the poses at `points`, clamping outside the own axis.
    fn resample(&self, points: &TimeAxis) -> Vec<Isometry3<f64>> {
        match self {
            Motion::Static(iso) => vec![*iso; points.len()],
            Motion::TimeSeries { time, poses } => {
                let axis = time.as_seconds();
                points
                    .as_seconds()
                    .into_iter()
                    .map(|t| {
                        let seg = locate(&axis, t);
                        interpolate_pose(&poses[seg.lower], &poses[seg.upper], seg.weight)
                    })
                    .collect()
            }
        }
    }
}

// =========================================================================
// == Construction inputs ==
// =========================================================================

/// Coordinates of a child origin in its parent frame, with their unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinates {
    pub values: Vec<Vector3<f64>>,
    pub unit: String,
}

impl Coordinates {
    pub fn single(value: [f64; 3], unit: impl Into<String>) -> Self {
        Self {
            values: vec![Vector3::from(value)],
            unit: unit.into(),
        }
    }

    pub fn series(values: &[[f64; 3]], unit: impl Into<String>) -> Self {
        Self {
            values: values.iter().copied().map(Vector3::from).collect(),
            unit: unit.into(),
        }
    }
}

// =========================================================================
// == Local Coordinate System ==
// =========================================================================

/// A directed rigid transform between a child frame and its parent frame.
///
/// The transform describes the child frame expressed in the parent frame:
/// the coordinates are the child origin in parent coordinates and the
/// orientation columns are the child axes in parent coordinates, so a point
/// given in child coordinates maps to `p_parent = R * p_child + t`.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalCoordinateSystem {
    motion: Motion,
    unit: LengthUnit,
    reference_time: Option<ReferenceTime>,
    annotations: Annotations,
}

impl LocalCoordinateSystem {
    /// Builds an LCS from raw coordinates, orientation matrices and an optional time axis.
    ///
    /// Without `time`, exactly one coordinate and one orientation are required.
    /// With `time`, each sequence must either match the time length or contain
    /// a single element, which is then held constant over the whole axis.
    pub fn new(
        coordinates: Coordinates,
        orientation: Vec<Matrix3<f64>>,
        time: Option<TimeAxis>,
    ) -> Result<Self> {
        let unit: LengthUnit = coordinates.unit.parse()?;
        let rotations = orientation
            .iter()
            .enumerate()
            .map(|(index, m)| rotation_from_matrix(m, index))
            .collect::<Result<Vec<_>>>()?;
        let translations: Vec<Vector3<f64>> = coordinates
            .values
            .iter()
            .map(|v| v.map(|c| unit.to_meters(c)))
            .collect();

        let motion = match time {
            None => {
                if translations.len() != 1 || rotations.len() != 1 {
                    return Err(WeldxError::Shape(format!(
                        "a static coordinate system needs exactly one coordinate and one \
                         orientation, got {} and {}",
                        translations.len(),
                        rotations.len()
                    )));
                }
                Motion::Static(pose(&translations[0], rotations[0]))
            }
            Some(time) => {
                let n = time.len();
                for (what, len) in [("coordinates", translations.len()), ("orientation", rotations.len())] {
                    if len != 1 && len != n {
                        return Err(WeldxError::Shape(format!(
                            "{what} has {len} entries but the time axis has {n}"
                        )));
                    }
                }
                let poses = (0..n)
                    .map(|i| {
                        let t = &translations[if translations.len() == 1 { 0 } else { i }];
                        let r = rotations[if rotations.len() == 1 { 0 } else { i }];
                        pose(t, r)
                    })
                    .collect();
                Motion::TimeSeries { time, poses }
            }
        };

        Ok(Self {
            motion,
            unit,
            reference_time: None,
            annotations: Annotations::default(),
        })
    }

    /// A static LCS from a single coordinate triple and rotation matrix.
    pub fn from_static(coordinates: [f64; 3], unit: &str, orientation: Matrix3<f64>) -> Result<Self> {
        Self::new(Coordinates::single(coordinates, unit), vec![orientation], None)
    }

    /// A static LCS from an isometry whose translation is given in `unit`.
    pub fn from_isometry(iso: Isometry3<f64>, unit: LengthUnit) -> Self {
        let t = iso.translation.vector.map(|c| unit.to_meters(c));
        Self::from_motion(Motion::Static(pose(&t, iso.rotation)), unit)
    }

    /// An LCS from an already validated motion (translations in metres).
    pub fn from_motion(motion: Motion, unit: LengthUnit) -> Self {
        Self {
            motion,
            unit,
            reference_time: None,
            annotations: Annotations::default(),
        }
    }

    pub fn identity() -> Self {
        Self::from_motion(Motion::Static(Isometry3::identity()), LengthUnit::default())
    }

    pub fn with_reference_time(mut self, reference_time: ReferenceTime) -> Self {
        self.reference_time = Some(reference_time);
        self
    }

    /// Changes the unit used at the boundary; the transform itself is unaffected.
    pub fn with_unit(mut self, unit: LengthUnit) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_annotations(mut self, annotations: Annotations) -> Self {
        self.annotations = annotations;
        self
    }

    // --- Accessors ---

    pub fn motion(&self) -> &Motion {
        &self.motion
    }

    pub fn unit(&self) -> LengthUnit {
        self.unit
    }

    pub fn reference_time(&self) -> Option<ReferenceTime> {
        self.reference_time
    }

    pub fn time(&self) -> Option<&TimeAxis> {
        match &self.motion {
            Motion::Static(_) => None,
            Motion::TimeSeries { time, .. } => Some(time),
        }
    }

    pub fn is_time_dependent(&self) -> bool {
        matches!(self.motion, Motion::TimeSeries { .. })
    }

    /// Poses with translations in metres (one for a static LCS).
    pub fn isometries(&self) -> &[Isometry3<f64>] {
        match &self.motion {
            Motion::Static(iso) => std::slice::from_ref(iso),
            Motion::TimeSeries { poses, .. } => poses,
        }
    }

    /// Coordinates in the LCS's own length unit.
    pub fn coordinates(&self) -> Vec<Vector3<f64>> {
        self.isometries()
            .iter()
            .map(|iso| iso.translation.vector.map(|c| self.unit.from_meters(c)))
            .collect()
    }

    pub fn orientations(&self) -> Vec<Matrix3<f64>> {
        self.isometries()
            .iter()
            .map(|iso| iso.rotation.to_rotation_matrix().into_inner())
            .collect()
    }

    // --- Algebra ---

    /// The reverse transform (parent expressed in child).
    pub fn invert(&self) -> Self {
        Self {
            motion: self.motion.map_poses(|iso| iso.inverse()),
            unit: self.unit,
            reference_time: self.reference_time,
            annotations: Annotations::default(),
        }
    }

    /// Chains two transforms: `self` maps frame B into C, `other` maps A into B,
    /// and the result maps A directly into C.
    ///
    /// Two time-dependent operands are sampled on the union of their time
    /// values inside the overlapping interval; without any overlap this fails
    /// with a time range error. Static operands are held constant.
    pub fn compose(&self, other: &Self) -> Result<Self> {
        let reference_time = self.reference_time.or(other.reference_time);
        let other_motion = match (self.reference_time, other.reference_time, &other.motion) {
            (Some(own), Some(theirs), Motion::TimeSeries { time, poses }) if own != theirs => {
                Motion::TimeSeries {
                    time: time.shifted(theirs - own),
                    poses: poses.clone(),
                }
            }
            (_, _, m) => m.clone(),
        };

        let motion = match (&self.motion, &other_motion) {
            (Motion::Static(a), Motion::Static(b)) => Motion::Static(a * b),
            (Motion::Static(a), Motion::TimeSeries { .. }) => other_motion.map_poses(|b| a * b),
            (Motion::TimeSeries { .. }, Motion::Static(b)) => self.motion.map_poses(|a| a * b),
            (Motion::TimeSeries { time: ta, .. }, Motion::TimeSeries { time: tb, .. }) => {
                let time = ta
                    .union_within_overlap(tb)
                    .ok_or_else(|| disjoint_error(ta, tb))?;
                let lhs = self.motion.resample(&time);
                let rhs = other_motion.resample(&time);
                let poses = lhs.iter().zip(rhs.iter()).map(|(a, b)| a * b).collect();
                Motion::TimeSeries { time, poses }
            }
        };

        Ok(Self {
            motion,
            unit: self.unit,
            reference_time,
            annotations: Annotations::default(),
        })
    }

    /// Resamples the LCS at `points`.
    ///
    /// Translation is interpolated linearly and rotation with slerp. Points
    /// outside the own time range are an error unless `extrapolate` is set,
    /// in which case the boundary values are held. Static systems are
    /// returned unchanged.
    pub fn interpolate(&self, points: &TimeAxis, extrapolate: bool) -> Result<Self> {
        let Motion::TimeSeries { time, .. } = &self.motion else {
            return Ok(self.clone());
        };
        if !extrapolate {
            time.check_range(points)?;
        }
        Ok(Self {
            motion: Motion::TimeSeries {
                time: points.clone(),
                poses: self.motion.resample(points),
            },
            unit: self.unit,
            reference_time: self.reference_time,
            annotations: self.annotations.clone(),
        })
    }

    /// Pose (translation in metres) at a single time.
    pub fn isometry_at(&self, t: TimeDelta, extrapolate: bool) -> Result<Isometry3<f64>> {
        let points = TimeAxis::new(vec![t])?;
        let sampled = self.interpolate(&points, extrapolate)?;
        Ok(sampled.isometries()[0])
    }

    /// Compares two systems value by value, ignoring annotations.
    pub fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        if self.time() != other.time() || self.reference_time != other.reference_time {
            return false;
        }
        let (a, b) = (self.isometries(), other.isometries());
        a.len() == b.len()
            && a.iter().zip(b.iter()).all(|(x, y)| {
                let dr = x.rotation.to_rotation_matrix().into_inner()
                    - y.rotation.to_rotation_matrix().into_inner();
                (x.translation.vector - y.translation.vector).amax() <= epsilon
                    && dr.amax() <= epsilon
            })
    }
}

impl Annotated for LocalCoordinateSystem {
    fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.annotations
    }
}

fn pose(translation: &Vector3<f64>, rotation: UnitQuaternion<f64>) -> Isometry3<f64> {
    Isometry3::from_parts(Translation3::from(*translation), rotation)
}

fn rotation_from_matrix(m: &Matrix3<f64>, index: usize) -> Result<UnitQuaternion<f64>> {
    let orthonormal = (m * m.transpose() - Matrix3::identity()).amax() <= ORTHONORMAL_EPS;
    let proper = (m.determinant() - 1.0).abs() <= ORTHONORMAL_EPS;
    if !(orthonormal && proper) {
        return Err(WeldxError::InvalidOrientation { index });
    }
    Ok(UnitQuaternion::from_rotation_matrix(
        &Rotation3::from_matrix_unchecked(*m),
    ))
}

fn disjoint_error(a: &TimeAxis, b: &TimeAxis) -> WeldxError {
    use crate::time::format_duration;
    WeldxError::TimeRange {
        requested: format!(
            "[{}, {}]",
            format_duration(b.start()),
            format_duration(b.end())
        ),
        start: format_duration(a.start()),
        end: format_duration(a.end()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    const EPS: f64 = 1e-9;

    fn rot_z(angle: f64) -> Matrix3<f64> {
        Rotation3::from_axis_angle(&Vector3::z_axis(), angle).into_inner()
    }

    fn rot_x(angle: f64) -> Matrix3<f64> {
        Rotation3::from_axis_angle(&Vector3::x_axis(), angle).into_inner()
    }

    fn assert_vector3_approx_eq(v1: &Vector3<f64>, v2: &Vector3<f64>, epsilon: f64) {
        assert_abs_diff_eq!(v1.x, v2.x, epsilon = epsilon);
        assert_abs_diff_eq!(v1.y, v2.y, epsilon = epsilon);
        assert_abs_diff_eq!(v1.z, v2.z, epsilon = epsilon);
    }

    fn moving_lcs() -> LocalCoordinateSystem {
        LocalCoordinateSystem::new(
            Coordinates::series(&[[5.0, 0.0, 2.0], [-5.0, 0.0, 2.0]], "mm"),
            vec![Matrix3::identity()],
            Some(TimeAxis::from_seconds(&[0.0, 30.0]).unwrap()),
        )
        .unwrap()
    }

    #[test]
    fn test_coordinates_keep_user_unit() {
        let lcs = LocalCoordinateSystem::from_static([1.0, 2.0, 3.0], "mm", Matrix3::identity()).unwrap();
        assert_eq!(lcs.unit(), LengthUnit::Millimeter);
        assert_vector3_approx_eq(&lcs.coordinates()[0], &Vector3::new(1.0, 2.0, 3.0), EPS);
        assert_abs_diff_eq!(lcs.isometries()[0].translation.x, 0.001, epsilon = EPS);
    }

    #[test]
    fn test_missing_unit_is_rejected() {
        let err = LocalCoordinateSystem::from_static([1.0, 0.0, 0.0], "", Matrix3::identity());
        assert!(matches!(err, Err(WeldxError::Unit(_))));
        let err = LocalCoordinateSystem::from_static([1.0, 0.0, 0.0], "s", Matrix3::identity());
        assert!(matches!(err, Err(WeldxError::Unit(_))));
    }

    #[test]
    fn test_shape_mismatch_with_time() {
        let err = LocalCoordinateSystem::new(
            Coordinates::series(&[[0.0; 3], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]], "mm"),
            vec![Matrix3::identity()],
            Some(TimeAxis::from_seconds(&[0.0, 1.0]).unwrap()),
        );
        assert!(matches!(err, Err(WeldxError::Shape(_))));

        let err = LocalCoordinateSystem::new(
            Coordinates::series(&[[0.0; 3], [1.0, 0.0, 0.0]], "mm"),
            vec![Matrix3::identity()],
            None,
        );
        assert!(matches!(err, Err(WeldxError::Shape(_))));
    }

    #[test]
    fn test_improper_rotation_is_rejected() {
        let mirror = Matrix3::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, -1.0);
        let err = LocalCoordinateSystem::from_static([0.0; 3], "mm", mirror);
        assert!(matches!(err, Err(WeldxError::InvalidOrientation { index: 0 })));
        let skewed = Matrix3::new(1.0, 0.1, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0);
        assert!(LocalCoordinateSystem::from_static([0.0; 3], "mm", skewed).is_err());
    }

    #[test]
    fn test_invert_matches_closed_form() {
        let lcs = LocalCoordinateSystem::from_static([1.0, 2.0, 3.0], "m", rot_z(FRAC_PI_2)).unwrap();
        let inv = lcs.invert();
        let r = rot_z(FRAC_PI_2);
        let expected_t = -(r.transpose() * Vector3::new(1.0, 2.0, 3.0));
        assert_vector3_approx_eq(&inv.coordinates()[0], &expected_t, EPS);
        assert_abs_diff_eq!((inv.orientations()[0] - r.transpose()).amax(), 0.0, epsilon = EPS);
    }

    #[test]
    fn test_double_inversion_is_identity() {
        let lcs = LocalCoordinateSystem::new(
            Coordinates::series(&[[1.0, 2.0, 3.0], [4.0, -1.0, 0.5]], "mm"),
            vec![rot_z(0.3), rot_x(-1.2)],
            Some(TimeAxis::from_seconds(&[0.0, 2.0]).unwrap()),
        )
        .unwrap();
        assert!(lcs.invert().invert().approx_eq(&lcs, EPS));
    }

    #[test]
    fn test_compose_maps_points_through_both_frames() {
        // workpiece in base, tcp in workpiece.
        let base_wp = LocalCoordinateSystem::from_static([1.0, 0.0, 0.0], "m", rot_z(FRAC_PI_2)).unwrap();
        let wp_tcp = LocalCoordinateSystem::from_static([0.0, 2.0, 0.0], "m", Matrix3::identity()).unwrap();
        let tcp_in_base = base_wp.compose(&wp_tcp).unwrap();
        // tcp origin is 2m along the workpiece y axis, which points along -x in base.
        assert_vector3_approx_eq(&tcp_in_base.coordinates()[0], &Vector3::new(-1.0, 0.0, 0.0), EPS);
    }

    #[test]
    fn test_compose_is_associative() {
        let a = LocalCoordinateSystem::from_static([1.0, 0.0, 0.0], "mm", rot_z(0.4)).unwrap();
        let b = LocalCoordinateSystem::from_static([0.0, 2.0, 1.0], "mm", rot_x(1.1)).unwrap();
        let c = moving_lcs();
        let left = a.compose(&b).unwrap().compose(&c).unwrap();
        let right = a.compose(&b.compose(&c).unwrap()).unwrap();
        assert!(left.approx_eq(&right, EPS));
    }

    #[test]
    fn test_interpolate_midpoint() {
        let lcs = moving_lcs();
        let mid = lcs
            .interpolate(&TimeAxis::from_seconds(&[15.0]).unwrap(), false)
            .unwrap();
        assert_vector3_approx_eq(&mid.coordinates()[0], &Vector3::new(0.0, 0.0, 2.0), EPS);
    }

    #[test]
    fn test_interpolate_rotation_uses_slerp() {
        let lcs = LocalCoordinateSystem::new(
            Coordinates::single([0.0; 3], "mm"),
            vec![Matrix3::identity(), rot_z(FRAC_PI_2)],
            Some(TimeAxis::from_seconds(&[0.0, 10.0]).unwrap()),
        )
        .unwrap();
        let iso = lcs.isometry_at(TimeDelta::seconds(5), false).unwrap();
        assert_abs_diff_eq!(iso.rotation.angle(), FRAC_PI_2 / 2.0, epsilon = EPS);
    }

    #[test]
    fn test_interpolate_out_of_range() {
        let lcs = moving_lcs();
        let outside = TimeAxis::from_seconds(&[-1.0, 40.0]).unwrap();
        assert!(matches!(
            lcs.interpolate(&outside, false),
            Err(WeldxError::TimeRange { .. })
        ));
        let held = lcs.interpolate(&outside, true).unwrap();
        assert_vector3_approx_eq(&held.coordinates()[0], &Vector3::new(5.0, 0.0, 2.0), EPS);
        assert_vector3_approx_eq(&held.coordinates()[1], &Vector3::new(-5.0, 0.0, 2.0), EPS);
    }

    #[test]
    fn test_compose_time_axes_use_overlap() {
        let a = LocalCoordinateSystem::new(
            Coordinates::series(&[[0.0; 3], [10.0, 0.0, 0.0]], "mm"),
            vec![Matrix3::identity()],
            Some(TimeAxis::from_seconds(&[0.0, 10.0]).unwrap()),
        )
        .unwrap();
        let b = LocalCoordinateSystem::new(
            Coordinates::series(&[[0.0; 3], [0.0, 10.0, 0.0]], "mm"),
            vec![Matrix3::identity()],
            Some(TimeAxis::from_seconds(&[5.0, 15.0]).unwrap()),
        )
        .unwrap();
        let c = a.compose(&b).unwrap();
        assert_eq!(c.time().unwrap().as_seconds(), vec![5.0, 10.0]);
        assert_vector3_approx_eq(&c.coordinates()[0], &Vector3::new(5.0, 0.0, 0.0), EPS);
        assert_vector3_approx_eq(&c.coordinates()[1], &Vector3::new(10.0, 5.0, 0.0), EPS);
    }

    #[test]
    fn test_compose_disjoint_time_axes_fails() {
        let a = moving_lcs();
        let b = LocalCoordinateSystem::new(
            Coordinates::single([0.0; 3], "mm"),
            vec![Matrix3::identity()],
            Some(TimeAxis::from_seconds(&[40.0, 50.0]).unwrap()),
        )
        .unwrap();
        assert!(matches!(a.compose(&b), Err(WeldxError::TimeRange { .. })));
    }

    #[test]
    fn test_compose_aligns_reference_times() {
        let t0 = crate::time::parse_timestamp("2021-01-01T00:00:00").unwrap();
        let a = moving_lcs().with_reference_time(t0);
        // Same motion, but its clock starts 10 s later.
        let b = moving_lcs().with_reference_time(t0 + TimeDelta::seconds(10));
        let c = a.compose(&b).unwrap();
        assert_eq!(c.reference_time(), Some(t0));
        assert_eq!(c.time().unwrap().as_seconds(), vec![10.0, 30.0]);
    }
}
