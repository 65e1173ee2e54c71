// weldx_core/src/asdf/converters/time.rs

use chrono::TimeDelta;
use serde_yaml::{Mapping, Value};

use crate::asdf::tree::{as_f64_list, take, take_opt, take_string};
use crate::asdf::{from_tagged, to_tagged, TreeConverter};
use crate::error::{Result, WeldxError};
use crate::time::{format_duration, format_timestamp, parse_duration, parse_timestamp, ReferenceTime, TimeAxis};

/// Upper bound for axes expanded from `freq`.
const MAX_TIME_POINTS: i64 = 1_000_000;

impl TreeConverter for ReferenceTime {
    const NAME: &'static str = "time/timestamp";
    const VERSION: &'static str = "1.0.0";

    fn to_tree(&self) -> Result<Mapping> {
        let mut tree = Mapping::new();
        tree.insert("value".into(), format_timestamp(self).into());
        Ok(tree)
    }

    fn from_tree(mut tree: Mapping) -> Result<Self> {
        parse_timestamp(&take_string(&mut tree, "value")?)
    }
}

impl TreeConverter for TimeDelta {
    const NAME: &'static str = "time/timedelta";
    const VERSION: &'static str = "1.0.0";

    fn to_tree(&self) -> Result<Mapping> {
        let mut tree = Mapping::new();
        tree.insert("value".into(), format_duration(*self).into());
        Ok(tree)
    }

    fn from_tree(mut tree: Mapping) -> Result<Self> {
        parse_duration(&take_string(&mut tree, "value")?)
    }
}

/// Written with `freq` when evenly spaced, otherwise with nanosecond `values`.
impl TreeConverter for TimeAxis {
    const NAME: &'static str = "time/timedeltaindex";
    const VERSION: &'static str = "1.0.0";

    fn to_tree(&self) -> Result<Mapping> {
        let mut tree = Mapping::new();
        match self.uniform_step() {
            Some(step) => {
                tree.insert("freq".into(), format_freq(step).into());
            }
            None => {
                let values = self
                    .deltas()
                    .iter()
                    .map(|d| d.num_nanoseconds().map(Value::from).ok_or_else(|| overflow("values")))
                    .collect::<Result<Vec<_>>>()?;
                tree.insert("values".into(), Value::Sequence(values));
            }
        }
        // Strictly increasing, so min and max are the ends.
        for (key, delta) in [
            ("start", self.start()),
            ("end", self.end()),
            ("min", self.start()),
            ("max", self.end()),
        ] {
            tree.insert(key.into(), to_tagged(&delta)?);
        }
        Ok(tree)
    }

    fn from_tree(mut tree: Mapping) -> Result<Self> {
        if let Some(values) = take_opt(&mut tree, "values") {
            let deltas = match values.as_sequence() {
                Some(items) if items.iter().all(Value::is_i64) => items
                    .iter()
                    .filter_map(Value::as_i64)
                    .map(TimeDelta::nanoseconds)
                    .collect(),
                _ => as_f64_list(&values, "values")?
                    .into_iter()
                    .map(|ns| TimeDelta::nanoseconds(ns.round() as i64))
                    .collect(),
            };
            return TimeAxis::new(deltas);
        }
        let freq = take_string(&mut tree, "freq")?;
        let step = parse_freq(&freq)?;
        let start: TimeDelta = from_tagged(take(&mut tree, "start")?)?;
        let end: TimeDelta = from_tagged(take(&mut tree, "end")?)?;
        if end < start {
            return Err(WeldxError::malformed("end", "end lies before start"));
        }
        let span = (end - start).num_nanoseconds().ok_or_else(|| overflow("end"))?;
        let step_ns = step.num_nanoseconds().ok_or_else(|| overflow("freq"))?;
        let count = span / step_ns + 1;
        if count > MAX_TIME_POINTS {
            return Err(WeldxError::malformed(
                "freq",
                format!("'{freq}' expands to {count} time points, at most {MAX_TIME_POINTS} are supported"),
            ));
        }
        TimeAxis::new((0..count).map(|k| start + TimeDelta::nanoseconds(k * step_ns)).collect())
    }
}

fn overflow(path: &str) -> WeldxError {
    WeldxError::malformed(path, "time value does not fit into nanoseconds")
}

/// `"<n>S"` for whole seconds, `"<n>N"` otherwise.
fn format_freq(step: TimeDelta) -> String {
    if step.subsec_nanos() == 0 {
        return format!("{}S", step.num_seconds());
    }
    match step.num_nanoseconds() {
        Some(ns) => format!("{ns}N"),
        None => format!("{}S", step.num_seconds()),
    }
}

/// Parses frequency strings such as `2S`, `500L`, `10ms` or `N`.
fn parse_freq(freq: &str) -> Result<TimeDelta> {
    let invalid = || WeldxError::malformed("freq", format!("invalid frequency '{freq}'"));
    let split = freq
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(invalid)?;
    let (count, unit) = freq.split_at(split);
    let count: i64 = if count.is_empty() { 1 } else { count.parse().map_err(|_| invalid())? };
    let nanos_per_unit: i64 = match unit {
        "N" | "ns" => 1,
        "U" | "us" => 1_000,
        "L" | "ms" => 1_000_000,
        "S" | "s" => 1_000_000_000,
        "T" | "min" => 60_000_000_000,
        "H" | "h" => 3_600_000_000_000,
        "D" => 86_400_000_000_000,
        _ => return Err(invalid()),
    };
    let nanos = count.checked_mul(nanos_per_unit).ok_or_else(invalid)?;
    if nanos <= 0 {
        return Err(invalid());
    }
    Ok(TimeDelta::nanoseconds(nanos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_evenly_spaced_axis_uses_freq() {
        let axis = TimeAxis::from_seconds(&[0.0, 2.0, 4.0, 6.0]).unwrap();
        let tree = axis.to_tree().unwrap();
        assert_eq!(tree.get("freq").and_then(Value::as_str), Some("2S"));
        assert!(!tree.contains_key("values"));
        assert_eq!(TimeAxis::from_tree(tree).unwrap(), axis);
    }

    #[test]
    fn test_uneven_axis_uses_values() {
        let axis = TimeAxis::from_seconds(&[0.0, 0.5, 3.0]).unwrap();
        let tree = axis.to_tree().unwrap();
        assert!(tree.contains_key("values"));
        assert_eq!(TimeAxis::from_tree(tree).unwrap(), axis);
    }

    #[test]
    fn test_sub_second_freq() {
        let axis = TimeAxis::from_seconds(&[0.0, 0.25, 0.5]).unwrap();
        let tree = axis.to_tree().unwrap();
        assert_eq!(tree.get("freq").and_then(Value::as_str), Some("250000000N"));
        assert_eq!(TimeAxis::from_tree(tree).unwrap(), axis);
    }

    #[test]
    fn test_parse_pandas_freq_aliases() {
        assert_eq!(parse_freq("500L").unwrap(), TimeDelta::milliseconds(500));
        assert_eq!(parse_freq("S").unwrap(), TimeDelta::seconds(1));
        assert_eq!(parse_freq("10min").unwrap(), TimeDelta::minutes(10));
        assert!(parse_freq("3Y").is_err());
        assert!(parse_freq("0S").is_err());
    }

    #[test]
    fn test_timestamp_tree() {
        let ts = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_milli_opt(12, 0, 0, 500)
            .unwrap();
        let tagged = to_tagged(&ts).unwrap();
        let back: ReferenceTime = from_tagged(tagged).unwrap();
        assert_eq!(back, ts);
    }

    #[test]
    fn test_wrong_tag_is_rejected() {
        let tagged = to_tagged(&TimeDelta::seconds(3)).unwrap();
        assert!(matches!(
            from_tagged::<ReferenceTime>(tagged),
            Err(WeldxError::UnknownTag { .. })
        ));
    }

    #[test]
    fn test_dense_freq_is_rejected_before_expansion() {
        let mut tree = TimeAxis::from_seconds(&[0.0, 10.0, 20.0]).unwrap().to_tree().unwrap();
        tree.insert("freq".into(), "N".into());
        assert!(matches!(
            TimeAxis::from_tree(tree),
            Err(WeldxError::MalformedTree { path, .. }) if path == "freq"
        ));

        let mut tree = TimeAxis::from_seconds(&[0.0, 10.0, 20.0]).unwrap().to_tree().unwrap();
        tree.insert("freq".into(), "5S".into());
        assert_eq!(TimeAxis::from_tree(tree).unwrap().len(), 5);
    }
}
