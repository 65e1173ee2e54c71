// weldx_cli/src/commands/transform.rs

use anyhow::{anyhow, bail};
use std::fmt::Write;
use weldx_core::prelude::*;
use weldx_core::time::delta_to_seconds;

use super::csm_keys;

/// Expresses `from` in `to` using the hierarchy stored under `csm_key` (or the
/// first one in the file) and formats the result.
///
/// With `at` the transform is resampled at those seconds, relative to its
/// reference time.
pub fn transform(
    file: &WeldxFile,
    csm_key: Option<&str>,
    from: &str,
    to: &str,
    at: &[f64],
    extrapolate: bool,
) -> anyhow::Result<String> {
    let key = match csm_key {
        Some(key) => key.to_string(),
        None => csm_keys(file)
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("the file holds no coordinate system hierarchy"))?,
    };
    let csm: CoordinateSystemManager = file.get(&key)?;
    let mut lcs = csm.get_cs(from, to)?;
    if !at.is_empty() {
        if !lcs.is_time_dependent() {
            bail!("'{from}' is static in '{to}', --at does not apply");
        }
        lcs = lcs.interpolate(&TimeAxis::from_seconds(at)?, extrapolate)?;
    }
    Ok(render(&lcs, from, to)?)
}

fn render(lcs: &LocalCoordinateSystem, from: &str, to: &str) -> std::result::Result<String, std::fmt::Error> {
    let mut out = String::new();
    writeln!(out, "{from} in {to} [{}]", lcs.unit().symbol())?;
    if let Some(rt) = lcs.reference_time() {
        writeln!(out, "reference time: {}", weldx_core::time::format_timestamp(&rt))?;
    }
    let times: Vec<Option<f64>> = match lcs.time() {
        Some(axis) => axis.deltas().iter().map(|d| Some(delta_to_seconds(*d))).collect(),
        None => vec![None],
    };
    for ((t, c), r) in times.iter().zip(lcs.coordinates()).zip(lcs.orientations()) {
        match t {
            Some(t) => writeln!(out, "t = {t:.3} s")?,
            None => writeln!(out, "static")?,
        }
        writeln!(out, "  coordinates: [{:.4}, {:.4}, {:.4}]", c.x, c.y, c.z)?;
        for (i, row) in r.row_iter().enumerate() {
            let label = if i == 0 { "  orientation:" } else { "              " };
            writeln!(out, "{label} [{:.6}, {:.6}, {:.6}]", row[0], row[1], row[2])?;
        }
    }
    Ok(out)
}
