// weldx_core/src/asdf/converters/time_series.rs

use serde_yaml::{Mapping, Value};

use crate::annotations::{Annotated, Annotations};
use crate::asdf::tree::{as_f64_list, as_seq, as_string, nested, take, take_opt, take_string};
use crate::asdf::{from_tagged, to_tagged, TreeConverter};
use crate::error::{Result, WeldxError};
use crate::expression::MathematicalExpression;
use crate::time::{ReferenceTime, TimeAxis};
use crate::time_series::{Interpolation, TimeSeries};

/// `values` is a list of value vectors; a constant series has one entry and no
/// `time`. Expression series carry a tagged `expression` instead of `values`.
impl TreeConverter for TimeSeries {
    const NAME: &'static str = "core/time_series";
    const VERSION: &'static str = "0.1.0";

    fn to_tree(&self) -> Result<Mapping> {
        let mut tree = Mapping::new();
        if let Some(expression) = self.expression() {
            tree.insert("expression".into(), to_tagged(expression)?);
            tree.insert("unit".into(), self.unit().into());
            if let Some(rt) = self.reference_time() {
                tree.insert("reference_time".into(), to_tagged(&rt)?);
            }
            return Ok(tree);
        }
        tree.insert(
            "values".into(),
            Value::Sequence(
                self.values()
                    .iter()
                    .map(|v| Value::Sequence(v.iter().map(|c| Value::from(*c)).collect()))
                    .collect(),
            ),
        );
        tree.insert("unit".into(), self.unit().into());
        if let Some(time) = self.time() {
            tree.insert("time".into(), to_tagged(time)?);
            tree.insert("interpolation".into(), self.interpolation().to_string().into());
        }
        if let Some(rt) = self.reference_time() {
            tree.insert("reference_time".into(), to_tagged(&rt)?);
        }
        Ok(tree)
    }

    fn from_tree(mut tree: Mapping) -> Result<Self> {
        let reference_time: Option<ReferenceTime> = take_opt(&mut tree, "reference_time")
            .map(|rt| nested("reference_time", from_tagged(rt)))
            .transpose()?;
        let mut series = match take_opt(&mut tree, "expression") {
            Some(expression) => {
                let expression: MathematicalExpression = nested("expression", from_tagged(expression))?;
                TimeSeries::from_expression(expression, take_string(&mut tree, "unit")?)?
            }
            None => discrete_from_tree(tree)?,
        };
        if let Some(rt) = reference_time {
            series = series.with_reference_time(rt);
        }
        Ok(series)
    }

    fn tree_annotations(&self) -> Option<&Annotations> {
        Some(self.annotations())
    }

    fn restore_annotations(&mut self, annotations: Annotations) {
        *self.annotations_mut() = annotations;
    }
}

fn discrete_from_tree(mut tree: Mapping) -> Result<TimeSeries> {
    let values = as_seq(take(&mut tree, "values")?, "values")?
        .iter()
        .enumerate()
        .map(|(i, v)| as_f64_list(v, &format!("values/{i}")))
        .collect::<Result<Vec<_>>>()?;
    let unit = take_string(&mut tree, "unit")?;
    let time: Option<TimeAxis> = take_opt(&mut tree, "time")
        .map(|v| nested("time", from_tagged(v)))
        .transpose()?;
    let interpolation: Interpolation = match take_opt(&mut tree, "interpolation") {
        Some(v) => as_string(v, "interpolation")?.parse()?,
        None => Interpolation::default(),
    };

    match time {
        Some(time) => TimeSeries::new(values, unit, time, interpolation),
        None => match <[Vec<f64>; 1]>::try_from(values) {
            Ok([value]) => TimeSeries::constant(value, unit),
            Err(values) => Err(WeldxError::Shape(format!(
                "a series without time needs exactly one value, found {}",
                values.len()
            ))),
        },
    }
}
