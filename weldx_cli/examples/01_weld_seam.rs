// weldx_cli/examples/01_weld_seam.rs

//! Builds the demo weld cell, writes it to disk, reads it back and follows the
//! contact tip along the seam.
//!
//! To run this example:
//! `cargo run --example 01_weld_seam`

use nalgebra::Vector3;
use weldx_cli::commands::demo::build_demo_file;
use weldx_cli::init_logging;
use weldx_cli::prelude::*;

fn main() -> anyhow::Result<()> {
    init_logging("info");

    // --- 1. Write and reload the file ---
    let path = std::env::temp_dir().join("weld_seam.asdf");
    build_demo_file()?.write(&path)?;
    let file = WeldxFile::read(&path)?;
    let cell: CoordinateSystemManager = file.get("coordinate_systems")?;

    // --- 2. Where is the seam point under the torch, seen from the torch? ---
    let times = TimeAxis::from_seconds(&[0.0, 5.0, 10.0, 15.0, 20.0])?;
    let tcp_in_tip = cell.get_cs_at("tcp", "contact_tip", &times, false)?;
    for (t, c) in times.as_seconds().iter().zip(tcp_in_tip.coordinates()) {
        println!("t = {t:>4.1} s  tcp in contact_tip: [{:8.2}, {:8.2}, {:8.2}] mm", c.x, c.y, c.z);
    }

    // --- 3. A seam marker given on the workpiece, expressed in the base ---
    let marker = Vector3::new(50.0, 0.0, 0.0);
    let in_base = cell.transform_points(&[marker], LengthUnit::Millimeter, "workpiece", "base", None)?;
    println!("marker in base: {:?} mm", in_base[0].as_slice());

    // --- 4. Current at the same instants ---
    let current: TimeSeries = file.get("welding_current")?;
    let sampled = current.interp_time(&times)?;
    for (t, v) in times.as_seconds().iter().zip(sampled.values()) {
        println!("t = {t:>4.1} s  current: {:6.1} {}", v[0], sampled.unit());
    }
    Ok(())
}
