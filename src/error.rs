//! Error types for the ble-health-session crate.

use thiserror::Error;

use crate::ble::adapter::BluetoothStatus;
use crate::data::PeripheralError;
use crate::registry::DeviceType;

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Bluetooth-related error from the underlying BLE library.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// The radio is not powered on, so the operation was declined.
    #[error("Bluetooth adapter unavailable (status: {status})")]
    AdapterUnavailable {
        /// Adapter status at the time of the request.
        status: BluetoothStatus,
    },

    /// Failed to establish a connection to the peripheral.
    #[error("Connection failed: {reason}")]
    ConnectionFailed {
        /// Description of why the connection failed.
        reason: String,
    },

    /// The peripheral or its decoder reported a protocol fault.
    #[error("Device protocol error: {0}")]
    DeviceProtocol(PeripheralError),

    /// No decoder is registered for the requested device type.
    #[error("Unsupported device type: {device_type}")]
    UnsupportedDeviceType {
        /// The device type that has no registered decoder.
        device_type: DeviceType,
    },

    /// Invalid data was received from the peripheral.
    #[error("Invalid data received: {context}")]
    InvalidData {
        /// Description of what was invalid about the data.
        context: String,
    },

    /// The peripheral is not known to the adapter.
    #[error("Peripheral not found: {identifier}")]
    PeripheralNotFound {
        /// The identifier that was searched for.
        identifier: String,
    },

    /// Characteristic not found on the device.
    #[error("Characteristic not found: {uuid}")]
    CharacteristicNotFound {
        /// The UUID of the characteristic that was not found.
        uuid: String,
    },

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

impl From<PeripheralError> for Error {
    fn from(error: PeripheralError) -> Self {
        Self::DeviceProtocol(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{GeneralError, WeightError};

    #[test]
    fn test_error_display() {
        let error = Error::AdapterUnavailable {
            status: BluetoothStatus::PoweredOff,
        };
        assert_eq!(
            error.to_string(),
            "Bluetooth adapter unavailable (status: PoweredOff)"
        );

        let error = Error::UnsupportedDeviceType {
            device_type: DeviceType::BloodPressure,
        };
        assert!(error.to_string().contains("BloodPressure"));
    }

    #[test]
    fn test_lookup_error_display() {
        let error = Error::PeripheralNotFound {
            identifier: "hci0/dev_AA_BB".to_string(),
        };
        assert_eq!(error.to_string(), "Peripheral not found: hci0/dev_AA_BB");

        let error = Error::CharacteristicNotFound {
            uuid: "00001524-1212-efde-1523-785feabcd123".to_string(),
        };
        assert!(error.to_string().ends_with("785feabcd123"));

        let error = Error::ConnectionFailed {
            reason: "timed out".to_string(),
        };
        assert_eq!(error.to_string(), "Connection failed: timed out");
    }

    #[test]
    fn test_from_peripheral_error() {
        let error: Error = PeripheralError::weight(WeightError::Error).into();
        assert!(matches!(error, Error::DeviceProtocol(_)));

        let error: Error = PeripheralError::Peripheral(GeneralError::LowBattery).into();
        assert!(error.to_string().contains("low battery"));
    }
}
