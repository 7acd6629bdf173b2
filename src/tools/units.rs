//! Length, weight and temperature conversion.
//!
//! Length and weight go through a base unit (metre, kilogram); temperature
//! uses the direct Celsius/Fahrenheit/Kelvin formulas.

use crate::error::SuiteError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitCategory {
    Length,
    Weight,
    #[serde(alias = "temp")]
    Temperature,
}

/// `(code, label, factor to base unit)`.
const LENGTH_UNITS: &[(&str, &str, f64)] = &[
    ("m", "Meter", 1.0),
    ("km", "Kilometer", 1000.0),
    ("cm", "Centimeter", 0.01),
    ("mm", "Millimeter", 0.001),
    ("ft", "Feet", 0.3048),
    ("in", "Inch", 0.0254),
    ("yd", "Yard", 0.9144),
];

const WEIGHT_UNITS: &[(&str, &str, f64)] = &[
    ("kg", "Kilogram", 1.0),
    ("g", "Gram", 0.001),
    ("mg", "Milligram", 0.000001),
    ("lb", "Pound", 0.453592),
    ("oz", "Ounce", 0.0283495),
];

const TEMPERATURE_UNITS: &[(&str, &str, f64)] = &[
    ("c", "Celsius", f64::NAN),
    ("f", "Fahrenheit", f64::NAN),
    ("k", "Kelvin", f64::NAN),
];

impl UnitCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitCategory::Length => "length",
            UnitCategory::Weight => "weight",
            UnitCategory::Temperature => "temperature",
        }
    }

    fn table(&self) -> &'static [(&'static str, &'static str, f64)] {
        match self {
            UnitCategory::Length => LENGTH_UNITS,
            UnitCategory::Weight => WEIGHT_UNITS,
            UnitCategory::Temperature => TEMPERATURE_UNITS,
        }
    }

    /// `(code, label)` pairs in display order.
    pub fn units(&self) -> impl Iterator<Item = (&'static str, &'static str)> {
        self.table().iter().map(|(code, label, _)| (*code, *label))
    }

    fn lookup(&self, unit: &str) -> Result<(&'static str, f64), SuiteError> {
        let wanted = unit.trim().to_ascii_lowercase();
        self.table()
            .iter()
            .find(|(code, _, _)| *code == wanted)
            .map(|(code, _, factor)| (*code, *factor))
            .ok_or_else(|| SuiteError::UnknownUnit {
                category: self.as_str().to_string(),
                unit: unit.to_string(),
            })
    }
}

impl fmt::Display for UnitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitCategory {
    type Err = SuiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "length" => Ok(UnitCategory::Length),
            "weight" | "mass" => Ok(UnitCategory::Weight),
            "temp" | "temperature" => Ok(UnitCategory::Temperature),
            other => Err(SuiteError::InvalidConfig(format!(
                "unknown unit category '{other}' (expected length, weight or temp)"
            ))),
        }
    }
}

/// Convert `value` from `from` to `to` within `category`.
///
/// Integral results are returned as-is; others are rounded to 6 decimals.
pub fn convert_units(
    value: f64,
    category: UnitCategory,
    from: &str,
    to: &str,
) -> Result<f64, SuiteError> {
    if !value.is_finite() {
        return Err(SuiteError::InvalidConfig(format!(
            "value to convert must be finite, got {value}"
        )));
    }
    let (from, from_factor) = category.lookup(from)?;
    let (to, to_factor) = category.lookup(to)?;

    let result = match category {
        UnitCategory::Temperature => convert_temperature(value, from, to),
        _ => value * from_factor / to_factor,
    };
    Ok(round_display(result))
}

fn convert_temperature(value: f64, from: &str, to: &str) -> f64 {
    let celsius = match from {
        "f" => (value - 32.0) * 5.0 / 9.0,
        "k" => value - 273.15,
        _ => value,
    };
    if from == to {
        return value;
    }
    match to {
        "f" => celsius * 9.0 / 5.0 + 32.0,
        "k" => celsius + 273.15,
        _ => celsius,
    }
}

fn round_display(x: f64) -> f64 {
    if x.fract() == 0.0 {
        x
    } else {
        (x * 1e6).round() / 1e6
    }
}
