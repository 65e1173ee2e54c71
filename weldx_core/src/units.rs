// weldx_core/src/units.rs

//! Length units understood by the coordinate system types.
//!
//! The actual conversion arithmetic is delegated to `uom`; this module only maps
//! the unit strings found in files (`"mm"`, `"meter"`, ...) onto `uom` units and
//! back, so that everything inside the crate can work in metres.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uom::si::f64::Length;
use uom::si::length::{centimeter, inch, kilometer, meter, micrometer, millimeter};

use crate::error::{Result, WeldxError};

/// A recognized unit of length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LengthUnit {
    Kilometer,
    #[default]
    Meter,
    Centimeter,
    Millimeter,
    Micrometer,
    Inch,
}

impl LengthUnit {
    /// Converts a value given in this unit to metres.
    pub fn to_meters(self, value: f64) -> f64 {
        self.quantity(value).get::<meter>()
    }

    /// Converts a value given in metres to this unit.
    pub fn from_meters(self, value: f64) -> f64 {
        let length = Length::new::<meter>(value);
        match self {
            LengthUnit::Kilometer => length.get::<kilometer>(),
            LengthUnit::Meter => length.get::<meter>(),
            LengthUnit::Centimeter => length.get::<centimeter>(),
            LengthUnit::Millimeter => length.get::<millimeter>(),
            LengthUnit::Micrometer => length.get::<micrometer>(),
            LengthUnit::Inch => length.get::<inch>(),
        }
    }

    /// Wraps a raw value into a `uom` length quantity.
    pub fn quantity(self, value: f64) -> Length {
        match self {
            LengthUnit::Kilometer => Length::new::<kilometer>(value),
            LengthUnit::Meter => Length::new::<meter>(value),
            LengthUnit::Centimeter => Length::new::<centimeter>(value),
            LengthUnit::Millimeter => Length::new::<millimeter>(value),
            LengthUnit::Micrometer => Length::new::<micrometer>(value),
            LengthUnit::Inch => Length::new::<inch>(value),
        }
    }

    /// The canonical symbol written to files.
    pub fn symbol(self) -> &'static str {
        match self {
            LengthUnit::Kilometer => "km",
            LengthUnit::Meter => "m",
            LengthUnit::Centimeter => "cm",
            LengthUnit::Millimeter => "mm",
            LengthUnit::Micrometer => "um",
            LengthUnit::Inch => "in",
        }
    }
}

impl FromStr for LengthUnit {
    type Err = WeldxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "km" | "kilometer" | "kilometre" => Ok(LengthUnit::Kilometer),
            "m" | "meter" | "metre" => Ok(LengthUnit::Meter),
            "cm" | "centimeter" | "centimetre" => Ok(LengthUnit::Centimeter),
            "mm" | "millimeter" | "millimetre" => Ok(LengthUnit::Millimeter),
            "um" | "µm" | "micrometer" | "micrometre" => Ok(LengthUnit::Micrometer),
            "in" | "inch" => Ok(LengthUnit::Inch),
            "" => Err(WeldxError::Unit(
                "coordinates require a length unit".to_string(),
            )),
            other => Err(WeldxError::Unit(format!(
                "'{other}' is not a recognized length unit"
            ))),
        }
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A scalar value with a unit string, as stored in files.
///
/// Length quantities can be checked with [`Quantity::as_length`]; other units
/// are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: String,
}

impl Quantity {
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }

    /// Interprets the quantity as a length, failing with a unit error otherwise.
    pub fn as_length(&self) -> Result<Length> {
        let unit: LengthUnit = self.unit.parse()?;
        Ok(unit.quantity(self.value))
    }
}
