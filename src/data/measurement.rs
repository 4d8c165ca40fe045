//! Measurement data structures.
//!
//! Contains the typed values decoders produce from a complete frame.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::utils::{kilograms_to_pounds, pounds_to_kilograms};

/// Unit of a weight reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WeightUnit {
    /// Kilograms.
    Kilograms,
    /// Pounds.
    Pounds,
}

impl WeightUnit {
    /// Display name of the unit.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Kilograms => "Kilograms",
            Self::Pounds => "Pounds",
        }
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WeightUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Kilograms" => Ok(Self::Kilograms),
            "Pounds" => Ok(Self::Pounds),
            other => Err(Error::InvalidData {
                context: format!("Unknown weight unit: {other}"),
            }),
        }
    }
}

/// Tagged unit of a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MeasurementUnit {
    /// A weight reading.
    Weight(WeightUnit),
}

impl MeasurementUnit {
    /// Build a weight unit from its display name, falling back to kilograms.
    pub fn from_weight_name(name: &str) -> Self {
        Self::Weight(name.parse().unwrap_or(WeightUnit::Kilograms))
    }
}

/// A single decoded reading.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeasurementValue {
    unit: MeasurementUnit,
    value: f64,
}

impl MeasurementValue {
    /// Create a measurement from a floating point magnitude.
    pub fn new(unit: MeasurementUnit, value: f64) -> Self {
        Self { unit, value }
    }

    /// Create a measurement from an integer magnitude.
    pub fn from_int(unit: MeasurementUnit, value: i64) -> Self {
        Self {
            unit,
            value: value as f64,
        }
    }

    /// Shorthand for a kilogram reading.
    pub fn kilograms(value: f64) -> Self {
        Self::new(MeasurementUnit::Weight(WeightUnit::Kilograms), value)
    }

    /// Shorthand for a pound reading.
    pub fn pounds(value: f64) -> Self {
        Self::new(MeasurementUnit::Weight(WeightUnit::Pounds), value)
    }

    /// Unit of the reading.
    pub fn unit(&self) -> MeasurementUnit {
        self.unit
    }

    /// Magnitude of the reading.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Convert a weight reading to another weight unit.
    pub fn to_unit(&self, target: WeightUnit) -> Self {
        let MeasurementUnit::Weight(current) = self.unit;
        let value = match (current, target) {
            (WeightUnit::Kilograms, WeightUnit::Pounds) => kilograms_to_pounds(self.value),
            (WeightUnit::Pounds, WeightUnit::Kilograms) => pounds_to_kilograms(self.value),
            _ => self.value,
        };
        Self::new(MeasurementUnit::Weight(target), value)
    }
}

impl fmt::Display for MeasurementValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            MeasurementUnit::Weight(WeightUnit::Kilograms) => write!(f, "{:.1} kg", self.value),
            MeasurementUnit::Weight(WeightUnit::Pounds) => write!(f, "{:.1} lb", self.value),
        }
    }
}

/// Readings from one complete frame, stamped on arrival.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeasurementBatch {
    /// Decoded readings in decoder order.
    pub values: Vec<MeasurementValue>,
    /// When the session emitted the batch.
    pub received_at: DateTime<Utc>,
}

impl MeasurementBatch {
    /// Stamp a set of readings with the current time.
    pub fn now(values: Vec<MeasurementValue>) -> Self {
        Self {
            values,
            received_at: Utc::now(),
        }
    }

    /// First reading with the given weight unit.
    pub fn weight(&self, unit: WeightUnit) -> Option<f64> {
        self.values
            .iter()
            .find(|v| v.unit() == MeasurementUnit::Weight(unit))
            .map(MeasurementValue::value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_unit_parse() {
        assert_eq!("Pounds".parse::<WeightUnit>().ok(), Some(WeightUnit::Pounds));
        assert!("stone".parse::<WeightUnit>().is_err());
    }

    #[test]
    fn test_unknown_unit_name_falls_back_to_kilograms() {
        assert_eq!(
            MeasurementUnit::from_weight_name("stone"),
            MeasurementUnit::Weight(WeightUnit::Kilograms)
        );
        assert_eq!(
            MeasurementUnit::from_weight_name("Pounds"),
            MeasurementUnit::Weight(WeightUnit::Pounds)
        );
    }

    #[test]
    fn test_from_int() {
        let value = MeasurementValue::from_int(MeasurementUnit::Weight(WeightUnit::Pounds), 150);
        assert_eq!(value.value(), 150.0);
    }

    #[test]
    fn test_to_unit() {
        let kg = MeasurementValue::kilograms(10.0);
        let lb = kg.to_unit(WeightUnit::Pounds);
        assert_eq!(lb.unit(), MeasurementUnit::Weight(WeightUnit::Pounds));
        assert!((lb.value() - 22.0462).abs() < 0.001);

        let same = kg.to_unit(WeightUnit::Kilograms);
        assert_eq!(same, kg);
    }

    #[test]
    fn test_display() {
        assert_eq!(MeasurementValue::kilograms(72.4).to_string(), "72.4 kg");
        assert_eq!(MeasurementValue::pounds(1.5).to_string(), "1.5 lb");
    }

    #[test]
    fn test_batch_weight_lookup() {
        let batch = MeasurementBatch::now(vec![
            MeasurementValue::kilograms(1.0),
            MeasurementValue::pounds(1.5),
        ]);
        assert_eq!(batch.weight(WeightUnit::Pounds), Some(1.5));
        assert_eq!(batch.weight(WeightUnit::Kilograms), Some(1.0));
    }
}
