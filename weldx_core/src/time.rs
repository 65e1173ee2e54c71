// weldx_core/src/time.rs

//! Time primitives: relative time axes, absolute reference times and the
//! ISO-8601 text forms used in files.

use chrono::{DateTime, NaiveDateTime, TimeDelta};

use crate::error::{Result, WeldxError};

/// An absolute timestamp that anchors a relative time axis.
pub type ReferenceTime = NaiveDateTime;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Converts a time delta to floating point seconds.
pub fn delta_to_seconds(delta: TimeDelta) -> f64 {
    // num_nanoseconds overflows after ~292 years, fall back to millisecond precision.
    match delta.num_nanoseconds() {
        Some(ns) => ns as f64 / NANOS_PER_SECOND as f64,
        None => delta.num_milliseconds() as f64 / 1e3,
    }
}

/// Converts floating point seconds to a time delta with nanosecond resolution.
pub fn seconds_to_delta(seconds: f64) -> TimeDelta {
    TimeDelta::nanoseconds((seconds * NANOS_PER_SECOND as f64).round() as i64)
}

// =========================================================================
// == Time Axis ==
// =========================================================================

/// A non-empty, strictly increasing sequence of time deltas.
///
/// The deltas are relative; an optional reference time (owned by whoever holds
/// the axis) turns them into absolute timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeAxis {
    deltas: Vec<TimeDelta>,
}

impl TimeAxis {
    pub fn new(deltas: Vec<TimeDelta>) -> Result<Self> {
        if deltas.is_empty() {
            return Err(WeldxError::Shape("a time axis needs at least one value".into()));
        }
        if let Some(i) = deltas.windows(2).position(|w| w[1] <= w[0]) {
            return Err(WeldxError::Shape(format!(
                "time values must be strictly increasing (index {} -> {})",
                i,
                i + 1
            )));
        }
        Ok(Self { deltas })
    }

    /// Builds an axis from seconds, e.g. `TimeAxis::from_seconds(&[0.0, 30.0])`.
    pub fn from_seconds(seconds: &[f64]) -> Result<Self> {
        Self::new(seconds.iter().copied().map(seconds_to_delta).collect())
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    pub fn deltas(&self) -> &[TimeDelta] {
        &self.deltas
    }

    pub fn start(&self) -> TimeDelta {
        self.deltas[0]
    }

    pub fn end(&self) -> TimeDelta {
        self.deltas[self.deltas.len() - 1]
    }

    pub fn as_seconds(&self) -> Vec<f64> {
        self.deltas.iter().copied().map(delta_to_seconds).collect()
    }

    pub fn contains(&self, t: TimeDelta) -> bool {
        t >= self.start() && t <= self.end()
    }

    /// Returns the axis moved by `offset`.
    pub fn shifted(&self, offset: TimeDelta) -> Self {
        Self {
            deltas: self.deltas.iter().map(|d| *d + offset).collect(),
        }
    }

    /// The union of both axes, restricted to the interval where they overlap.
    ///
    /// Returns `None` when the axes do not overlap at all.
    pub fn union_within_overlap(&self, other: &TimeAxis) -> Option<TimeAxis> {
        let lo = self.start().max(other.start());
        let hi = self.end().min(other.end());
        if lo > hi {
            return None;
        }
        let mut merged: Vec<TimeDelta> = self
            .deltas
            .iter()
            .chain(other.deltas.iter())
            .copied()
            .filter(|t| *t >= lo && *t <= hi)
            .collect();
        merged.sort();
        merged.dedup();
        Some(TimeAxis { deltas: merged })
    }

    /// The common step when the axis is evenly spaced (and has at least two values).
    pub fn uniform_step(&self) -> Option<TimeDelta> {
        if self.deltas.len() < 2 {
            return None;
        }
        let step = self.deltas[1] - self.deltas[0];
        self.deltas
            .windows(2)
            .all(|w| w[1] - w[0] == step)
            .then_some(step)
    }

    /// Fails with a time range error when any of `points` lies outside the axis.
    pub fn check_range(&self, points: &TimeAxis) -> Result<()> {
        match points.deltas.iter().find(|t| !self.contains(**t)) {
            Some(t) => Err(WeldxError::TimeRange {
                requested: format_duration(*t),
                start: format_duration(self.start()),
                end: format_duration(self.end()),
            }),
            None => Ok(()),
        }
    }
}

// =========================================================================
// == ISO-8601 text forms ==
// =========================================================================

/// Formats a timestamp the way the file format stores it (`2020-01-01T12:00:00`).
pub fn format_timestamp(ts: &ReferenceTime) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

/// Reads naive timestamps as they are; timestamps with an offset are converted to UTC.
pub fn parse_timestamp(s: &str) -> Result<ReferenceTime> {
    s.parse::<NaiveDateTime>()
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| DateTime::parse_from_rfc3339(s).map(|t| t.naive_utc()))
        .map_err(|e| WeldxError::malformed("value", format!("invalid timestamp '{s}': {e}")))
}

/// Formats a time delta as an ISO-8601 duration (`P0DT0H0M30S`).
pub fn format_duration(delta: TimeDelta) -> String {
    let sign = if delta < TimeDelta::zero() { "-" } else { "" };
    let delta = delta.abs();
    let total_secs = delta.num_seconds();
    let nanos = delta.subsec_nanos() as i64;

    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;

    let frac = if nanos > 0 {
        let digits = format!("{nanos:09}");
        format!(".{}", digits.trim_end_matches('0'))
    } else {
        String::new()
    };
    format!("{sign}P{days}DT{hours}H{minutes}M{seconds}{frac}S")
}

/// Parses an ISO-8601 duration with day, hour, minute and second components.
///
/// Accepts the full form written by [`format_duration`] as well as short forms
/// such as `PT30S` or `PT1.5S`. Years, months and weeks are rejected.
pub fn parse_duration(s: &str) -> Result<TimeDelta> {
    let invalid = || WeldxError::malformed("value", format!("invalid ISO-8601 duration '{s}'"));

    let (negative, body) = match s.trim().strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.trim()),
    };
    let body = body.strip_prefix('P').ok_or_else(invalid)?;

    let mut total = TimeDelta::zero();
    let mut in_time = false;
    let mut number = String::new();
    for c in body.chars() {
        match c {
            'T' => in_time = true,
            '0'..='9' | '.' => number.push(c),
            'D' | 'H' | 'M' | 'S' => {
                let unit_seconds = match (c, in_time) {
                    ('D', false) => 86_400.0,
                    ('H', true) => 3_600.0,
                    ('M', true) => 60.0,
                    ('S', true) => 1.0,
                    _ => return Err(invalid()),
                };
                let value: f64 = number.parse().map_err(|_| invalid())?;
                total = total + seconds_to_delta(value * unit_seconds);
                number.clear();
            }
            _ => return Err(invalid()),
        }
    }
    if !number.is_empty() {
        return Err(invalid());
    }
    Ok(if negative { -total } else { total })
}
