// weldx_core/src/time_series.rs

use std::fmt;
use std::str::FromStr;

use tracing::warn;

use crate::annotations::{Annotated, Annotations};
use crate::error::{Result, WeldxError};
use crate::expression::MathematicalExpression;
use crate::time::{ReferenceTime, TimeAxis};
use crate::utils::interpolation::{lerp, locate, locate_step};

/// How values between two samples are obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Interpolation {
    /// Hold the last sample.
    #[default]
    Step,
    Linear,
}

impl FromStr for Interpolation {
    type Err = WeldxError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "step" => Ok(Interpolation::Step),
            "linear" => Ok(Interpolation::Linear),
            other => Err(WeldxError::malformed(
                "interpolation",
                format!("unknown interpolation '{other}', expected 'step' or 'linear'"),
            )),
        }
    }
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Interpolation::Step => "step",
            Interpolation::Linear => "linear",
        })
    }
}

/// Where the values of a series come from.
#[derive(Debug, Clone, PartialEq)]
enum Data {
    /// Sampled values, one vector per time point; a single vector without time.
    Discrete {
        values: Vec<Vec<f64>>,
        time: Option<TimeAxis>,
    },
    /// A function of one free time variable, evaluated in seconds.
    Expression {
        expression: MathematicalExpression,
        time_variable: String,
        dimension: usize,
    },
}

/// A quantity over time: discrete samples or an expression of time.
///
/// A discrete series without a time axis is constant. The unit is an opaque
/// label; values are never converted.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    data: Data,
    unit: String,
    interpolation: Interpolation,
    reference_time: Option<ReferenceTime>,
    annotations: Annotations,
    interp_count: u32,
}

impl TimeSeries {
    fn from_data(data: Data, unit: String, interpolation: Interpolation) -> Self {
        Self {
            data,
            unit,
            interpolation,
            reference_time: None,
            annotations: Annotations::default(),
            interp_count: 0,
        }
    }

    pub fn constant(value: Vec<f64>, unit: impl Into<String>) -> Result<Self> {
        let values = vec![value];
        check_dimensions(&values)?;
        Ok(Self::from_data(
            Data::Discrete { values, time: None },
            unit.into(),
            Interpolation::Step,
        ))
    }

    /// A time-dependent series with one value vector per time point.
    pub fn new(
        values: Vec<Vec<f64>>,
        unit: impl Into<String>,
        time: TimeAxis,
        interpolation: Interpolation,
    ) -> Result<Self> {
        if values.len() != time.len() {
            return Err(WeldxError::Shape(format!(
                "time series has {} values but the time axis has {}",
                values.len(),
                time.len()
            )));
        }
        check_dimensions(&values)?;
        Ok(Self::from_data(
            Data::Discrete {
                values,
                time: Some(time),
            },
            unit.into(),
            interpolation,
        ))
    }

    /// A series defined by `expression`, which must have exactly one free
    /// variable. That variable receives the time in seconds.
    pub fn from_expression(expression: MathematicalExpression, unit: impl Into<String>) -> Result<Self> {
        let time_variable = match expression.variable_names().as_slice() {
            [name] => name.to_string(),
            names => {
                return Err(WeldxError::Expression(format!(
                    "a time series expression needs exactly one free variable, '{}' has {}",
                    expression.expression(),
                    names.len()
                )))
            }
        };
        let dimension = expression.evaluate(&[(time_variable.as_str(), 1.0)])?.len();
        Ok(Self::from_data(
            Data::Expression {
                expression,
                time_variable,
                dimension,
            },
            unit.into(),
            Interpolation::default(),
        ))
    }

    pub fn with_reference_time(mut self, reference_time: ReferenceTime) -> Self {
        self.reference_time = Some(reference_time);
        self
    }

    /// The sampled values; empty for an expression.
    pub fn values(&self) -> &[Vec<f64>] {
        match &self.data {
            Data::Discrete { values, .. } => values,
            Data::Expression { .. } => &[],
        }
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn time(&self) -> Option<&TimeAxis> {
        match &self.data {
            Data::Discrete { time, .. } => time.as_ref(),
            Data::Expression { .. } => None,
        }
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    pub fn reference_time(&self) -> Option<ReferenceTime> {
        self.reference_time
    }

    pub fn expression(&self) -> Option<&MathematicalExpression> {
        match &self.data {
            Data::Expression { expression, .. } => Some(expression),
            Data::Discrete { .. } => None,
        }
    }

    pub fn is_expression(&self) -> bool {
        matches!(self.data, Data::Expression { .. })
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.data, Data::Discrete { time: None, .. })
    }

    /// Number of components per value.
    pub fn dimension(&self) -> usize {
        match &self.data {
            Data::Discrete { values, .. } => values.first().map_or(0, Vec::len),
            Data::Expression { dimension, .. } => *dimension,
        }
    }

    /// Resamples the series at `points`.
    ///
    /// Discrete data hold their boundary values outside the own time range.
    /// Expressions are evaluated at every point and come back as a linear
    /// discrete series.
    pub fn interp_time(&self, points: &TimeAxis) -> Result<TimeSeries> {
        if self.interp_count > 0 {
            warn!(
                "time series data has already been interpolated {} time(s)",
                self.interp_count
            );
        }
        let (values, interpolation): (Vec<Vec<f64>>, Interpolation) = match &self.data {
            Data::Discrete { values, time: None } => (vec![values[0].clone(); points.len()], self.interpolation),
            Data::Discrete {
                values,
                time: Some(time),
            } => {
                let axis = time.as_seconds();
                let sampled = points
                    .as_seconds()
                    .into_iter()
                    .map(|t| match self.interpolation {
                        Interpolation::Step => values[locate_step(&axis, t)].clone(),
                        Interpolation::Linear => {
                            let seg = locate(&axis, t);
                            values[seg.lower]
                                .iter()
                                .zip(&values[seg.upper])
                                .map(|(a, b)| lerp(*a, *b, seg.weight))
                                .collect()
                        }
                    })
                    .collect();
                (sampled, self.interpolation)
            }
            Data::Expression {
                expression,
                time_variable,
                ..
            } => {
                let sampled = points
                    .as_seconds()
                    .into_iter()
                    .map(|t| expression.evaluate(&[(time_variable.as_str(), t)]))
                    .collect::<Result<Vec<_>>>()?;
                (sampled, Interpolation::Linear)
            }
        };
        let mut out = TimeSeries::new(values, self.unit.clone(), points.clone(), interpolation)?;
        out.reference_time = self.reference_time;
        out.interp_count = self.interp_count + 1;
        Ok(out)
    }
}

impl Annotated for TimeSeries {
    fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.annotations
    }
}

fn check_dimensions(values: &[Vec<f64>]) -> Result<()> {
    let Some(first) = values.first() else {
        return Err(WeldxError::Shape("a time series needs at least one value".into()));
    };
    if first.is_empty() {
        return Err(WeldxError::Shape("time series values must not be empty".into()));
    }
    match values.iter().position(|v| v.len() != first.len()) {
        Some(i) => Err(WeldxError::Shape(format!(
            "value {i} has {} components, expected {}",
            values[i].len(),
            first.len()
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn current() -> TimeSeries {
        TimeSeries::new(
            vec![vec![100.0], vec![200.0], vec![150.0]],
            "A",
            TimeAxis::from_seconds(&[0.0, 10.0, 20.0]).unwrap(),
            Interpolation::Linear,
        )
        .unwrap()
    }

    #[test]
    fn test_linear_interpolation_holds_boundaries() {
        let ts = current();
        let out = ts
            .interp_time(&TimeAxis::from_seconds(&[-5.0, 5.0, 15.0, 30.0]).unwrap())
            .unwrap();
        let flat: Vec<f64> = out.values().iter().map(|v| v[0]).collect();
        for (got, want) in flat.iter().zip([100.0, 150.0, 175.0, 150.0]) {
            assert_abs_diff_eq!(*got, want, epsilon = 1e-12);
        }
        assert_eq!(out.unit(), "A");
    }

    #[test]
    fn test_step_interpolation() {
        let mut ts = current();
        ts.interpolation = Interpolation::Step;
        let out = ts
            .interp_time(&TimeAxis::from_seconds(&[-1.0, 9.9, 10.0, 25.0]).unwrap())
            .unwrap();
        let flat: Vec<f64> = out.values().iter().map(|v| v[0]).collect();
        assert_eq!(flat, vec![100.0, 100.0, 200.0, 150.0]);
    }

    #[test]
    fn test_constant_broadcasts() {
        let ts = TimeSeries::constant(vec![1.0, 2.0], "mm/s").unwrap();
        assert!(ts.is_constant());
        let out = ts.interp_time(&TimeAxis::from_seconds(&[0.0, 1.0]).unwrap()).unwrap();
        assert_eq!(out.values(), &[vec![1.0, 2.0], vec![1.0, 2.0]]);
        assert_eq!(out.dimension(), 2);
    }

    #[test]
    fn test_shape_errors() {
        let axis = TimeAxis::from_seconds(&[0.0, 1.0]).unwrap();
        let short = TimeSeries::new(vec![vec![1.0]], "V", axis.clone(), Interpolation::Step);
        assert!(matches!(short, Err(WeldxError::Shape(_))));
        let ragged = TimeSeries::new(vec![vec![1.0], vec![1.0, 2.0]], "V", axis, Interpolation::Step);
        assert!(matches!(ragged, Err(WeldxError::Shape(_))));
    }

    #[test]
    fn test_empty_constant_is_rejected() {
        assert!(matches!(TimeSeries::constant(vec![], "V"), Err(WeldxError::Shape(_))));
    }

    #[test]
    fn test_expression_series_is_evaluated_in_seconds() {
        let params = std::collections::BTreeMap::from([
            ("a".to_string(), crate::units::Quantity::new(2.0, "A/s")),
            ("b".to_string(), crate::units::Quantity::new(100.0, "A")),
        ]);
        let expr = MathematicalExpression::new("a*t + b", params).unwrap();
        let ts = TimeSeries::from_expression(expr, "A").unwrap();
        assert!(ts.is_expression());
        assert!(!ts.is_constant());
        assert_eq!(ts.dimension(), 1);
        assert!(ts.values().is_empty());

        let out = ts.interp_time(&TimeAxis::from_seconds(&[0.0, 0.5, 10.0]).unwrap()).unwrap();
        assert_eq!(out.values(), &[vec![100.0], vec![101.0], vec![120.0]]);
        assert_eq!(out.interpolation(), Interpolation::Linear);
        assert!(!out.is_expression());
    }

    #[test]
    fn test_expression_needs_one_time_variable() {
        let expr = MathematicalExpression::new("a*t + b", Default::default()).unwrap();
        assert!(matches!(
            TimeSeries::from_expression(expr, "A"),
            Err(WeldxError::Expression(_))
        ));
    }

    #[test]
    fn test_interpolation_names() {
        assert_eq!("linear".parse::<Interpolation>().unwrap(), Interpolation::Linear);
        assert_eq!(Interpolation::Step.to_string(), "step");
        assert!("cubic".parse::<Interpolation>().is_err());
    }
}
