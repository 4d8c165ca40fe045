//! Peripheral error taxonomy reported to session observers.
//!
//! Errors are split into faults any peripheral can produce and faults that
//! belong to one device type. Each device type has its own closed error enum,
//! so a weight scale decoder can only ever produce [`WeightError`] values.

use std::fmt;

/// Faults shared by every peripheral type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GeneralError {
    /// The adapter could not connect to the peripheral.
    CouldNotConnect,
    /// The peripheral reported a low battery.
    LowBattery,
    /// A session step did not complete within its configured deadline.
    Timeout,
    /// No discovered characteristic matched the decoder.
    CharacteristicNotFound,
    /// The peripheral refused to enable notifications.
    SubscribeFailed,
}

impl GeneralError {
    /// Stable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::CouldNotConnect => "General.CouldNotConnect",
            Self::LowBattery => "General.LowBattery",
            Self::Timeout => "General.Timeout",
            Self::CharacteristicNotFound => "General.CharacteristicNotFound",
            Self::SubscribeFailed => "General.SubscribeFailed",
        }
    }
}

/// Blood glucose meter faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BloodGlucoseError {
    /// Unspecified meter fault.
    Error,
}

/// Pulse oximeter faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BloodOxygenError {
    /// Unspecified oximeter fault.
    Error,
}

/// Blood pressure monitor faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BloodPressureError {
    /// The reading could not be taken.
    InvalidMeasurement,
    /// The wearer moved while the cuff was measuring.
    BodyMovementDuringMeasurement,
    /// The cuff is not tight enough.
    CuffTooLoose,
    /// The monitor detected an irregular pulse.
    IrregularPulseDetected,
    /// Pulse rate above the monitor's range.
    PulseRateExceedsUpperLimit,
    /// Pulse rate below the monitor's range.
    PulseRateIsLessThanLowerLimit,
    /// The cuff is not at heart level.
    ImproperMeasurementPosition,
}

/// Step counter faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StepCountError {
    /// Unspecified counter fault.
    Error,
}

/// Weight scale faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WeightError {
    /// Unspecified scale fault.
    Error,
}

/// A fault owned by a single device type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeviceError {
    /// Blood glucose meter fault.
    BloodGlucose(BloodGlucoseError),
    /// Pulse oximeter fault.
    BloodOxygen(BloodOxygenError),
    /// Blood pressure monitor fault.
    BloodPressure(BloodPressureError),
    /// Step counter fault.
    StepCount(StepCountError),
    /// Weight scale fault.
    Weight(WeightError),
}

impl DeviceError {
    /// Stable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BloodGlucose(BloodGlucoseError::Error) => "bloodGlucose.Error",
            Self::BloodOxygen(BloodOxygenError::Error) => "bloodOxygen.Error",
            Self::BloodPressure(e) => match e {
                BloodPressureError::InvalidMeasurement => "bloodPressure.InvalidMeasurement",
                BloodPressureError::BodyMovementDuringMeasurement => {
                    "bloodPressure.BodyMovementDuringMeasurement"
                }
                BloodPressureError::CuffTooLoose => "bloodPressure.CuffTooLoose",
                BloodPressureError::IrregularPulseDetected => "bloodPressure.IrregularPulseDetected",
                BloodPressureError::PulseRateExceedsUpperLimit => {
                    "bloodPressure.PulseRateExceedsUpperLimit"
                }
                BloodPressureError::PulseRateIsLessThanLowerLimit => {
                    "bloodPressure.PulseRateIsLessThanLowerLimit"
                }
                BloodPressureError::ImproperMeasurementPosition => {
                    "bloodPressure.ImproperMeasurementPosition"
                }
            },
            Self::StepCount(StepCountError::Error) => "stepCount.Error",
            Self::Weight(WeightError::Error) => "weight.Error",
        }
    }
}

/// Error reported by a peripheral session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PeripheralError {
    /// Fault common to all peripherals.
    Peripheral(GeneralError),
    /// Fault defined by the active decoder's device type.
    DeviceSpecific(DeviceError),
}

impl PeripheralError {
    /// Shorthand for a weight scale fault.
    pub fn weight(error: WeightError) -> Self {
        Self::DeviceSpecific(DeviceError::Weight(error))
    }

    /// Shorthand for a blood pressure fault.
    pub fn blood_pressure(error: BloodPressureError) -> Self {
        Self::DeviceSpecific(DeviceError::BloodPressure(error))
    }

    /// Stable code for this error, e.g. `"General.CouldNotConnect"`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Peripheral(e) => e.code(),
            Self::DeviceSpecific(e) => e.code(),
        }
    }

    /// Check if this error came from the connection layer.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Peripheral(GeneralError::CouldNotConnect))
    }
}

impl fmt::Display for PeripheralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Peripheral(GeneralError::CouldNotConnect) => {
                write!(f, "could not connect to peripheral")
            }
            Self::Peripheral(GeneralError::LowBattery) => write!(f, "peripheral low battery"),
            Self::Peripheral(GeneralError::Timeout) => write!(f, "peripheral timed out"),
            Self::Peripheral(GeneralError::CharacteristicNotFound) => {
                write!(f, "peripheral characteristic not found")
            }
            Self::Peripheral(GeneralError::SubscribeFailed) => {
                write!(f, "peripheral refused notifications")
            }
            Self::DeviceSpecific(e) => write!(f, "device reported {}", e.code()),
        }
    }
}

impl std::error::Error for PeripheralError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_general_codes() {
        assert_eq!(
            PeripheralError::Peripheral(GeneralError::CouldNotConnect).code(),
            "General.CouldNotConnect"
        );
        assert_eq!(
            PeripheralError::Peripheral(GeneralError::LowBattery).code(),
            "General.LowBattery"
        );
    }

    #[test]
    fn test_device_codes() {
        assert_eq!(PeripheralError::weight(WeightError::Error).code(), "weight.Error");
        assert_eq!(
            PeripheralError::blood_pressure(BloodPressureError::CuffTooLoose).code(),
            "bloodPressure.CuffTooLoose"
        );
        assert_eq!(
            PeripheralError::DeviceSpecific(DeviceError::StepCount(StepCountError::Error)).code(),
            "stepCount.Error"
        );
    }

    #[test]
    fn test_is_connection_error() {
        assert!(PeripheralError::Peripheral(GeneralError::CouldNotConnect).is_connection_error());
        assert!(!PeripheralError::Peripheral(GeneralError::Timeout).is_connection_error());
        assert!(!PeripheralError::weight(WeightError::Error).is_connection_error());
    }

    #[test]
    fn test_display() {
        let error = PeripheralError::blood_pressure(BloodPressureError::IrregularPulseDetected);
        assert_eq!(
            error.to_string(),
            "device reported bloodPressure.IrregularPulseDetected"
        );
    }
}
