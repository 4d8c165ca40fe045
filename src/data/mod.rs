//! Data structures for peripheral readings and faults.
//!
//! This module contains the measurement types decoders produce and the
//! error taxonomy sessions report to observers.

pub mod measurement;
pub mod peripheral_error;

pub use measurement::{MeasurementBatch, MeasurementUnit, MeasurementValue, WeightUnit};
pub use peripheral_error::{
    BloodGlucoseError, BloodOxygenError, BloodPressureError, DeviceError, GeneralError,
    PeripheralError, StepCountError, WeightError,
};
