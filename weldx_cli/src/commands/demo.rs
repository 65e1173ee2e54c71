// weldx_cli/src/commands/demo.rs

use chrono::NaiveDate;
use nalgebra::{Matrix3, Rotation3, Vector3};
use std::collections::BTreeMap;
use std::f64::consts::FRAC_PI_2;
use weldx_core::prelude::*;

/// A small weld cell: a workpiece on the base, a seam the TCP follows for
/// 20 s and a torch merged in as a subsystem. Next to it the welding current,
/// a wire feed ramp given as an expression and the joint penetration of the seam.
pub fn build_demo_file() -> Result<WeldxFile> {
    let start = NaiveDate::from_ymd_opt(2024, 3, 5)
        .and_then(|d| d.and_hms_opt(10, 0, 0))
        .ok_or_else(|| WeldxError::malformed("reference_time", "invalid demo date"))?;

    let mut cell = CoordinateSystemManager::with_name("weld_cell", "base").with_reference_time(start);
    let turned = Rotation3::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2).into_inner();
    cell.add_cs(
        "workpiece",
        "base",
        LocalCoordinateSystem::from_static([200.0, 100.0, 0.0], "mm", turned)?,
    )?;
    let seam = LocalCoordinateSystem::new(
        Coordinates::series(&[[0.0, 0.0, 5.0], [100.0, 0.0, 5.0], [200.0, 0.0, 5.0]], "mm"),
        vec![Matrix3::identity()],
        Some(TimeAxis::from_seconds(&[0.0, 10.0, 20.0])?),
    )?;
    cell.add_cs("tcp", "workpiece", seam)?;

    let mut torch = CoordinateSystemManager::with_name("torch", "flange");
    torch.add_cs(
        "nozzle",
        "flange",
        LocalCoordinateSystem::from_static([0.0, 0.0, 350.0], "mm", Matrix3::identity())?,
    )?;
    torch.add_cs(
        "contact_tip",
        "nozzle",
        LocalCoordinateSystem::from_static([0.0, 0.0, 15.0], "mm", Matrix3::identity())?,
    )?;
    cell.add_subsystem_with(
        torch,
        "base",
        LocalCoordinateSystem::from_static([0.0, 0.0, 1200.0], "mm", Matrix3::identity())?,
    )?;

    let current = TimeSeries::new(
        vec![vec![0.0], vec![180.0], vec![180.0], vec![0.0]],
        "A",
        TimeAxis::from_seconds(&[0.0, 1.0, 19.0, 20.0])?,
        Interpolation::Linear,
    )?
    .with_reference_time(start);

    let ramp = MathematicalExpression::new(
        "v0 + a * t",
        BTreeMap::from([
            ("v0".to_string(), Quantity::new(6.0, "m/min")),
            ("a".to_string(), Quantity::new(0.1, "m/min/s")),
        ]),
    )?;
    let wire_feed = TimeSeries::from_expression(ramp, "m/min")?.with_reference_time(start);

    let mut penetration = JointPenetration::new("partial", Quantity::new(1.5, "mm"))?;
    penetration.groove_weld_size = Some(4.0);
    penetration
        .annotations_mut()
        .insert_user("seam", "butt joint, single V".into());

    let mut file = WeldxFile::new();
    file.insert("coordinate_systems", &cell)?;
    file.insert("welding_current", &current)?;
    file.insert("wire_feed", &wire_feed)?;
    file.insert("joint_penetration", &penetration)?;
    Ok(file)
}
