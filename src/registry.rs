//! Decoder registry.
//!
//! Maps a device type to the decoder that speaks its protocol. Selection
//! happens once, when a session is built; a device type without a decoder is a
//! configuration error reported at that point.

use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::decoder::DeviceDecoder;
use crate::protocol::fora_scale::ForaScaleDecoder;

/// Peripheral categories the application knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeviceType {
    /// Blood glucose meter.
    BloodGlucose,
    /// Pulse oximeter.
    BloodOxygen,
    /// Blood pressure monitor.
    BloodPressure,
    /// Step counter.
    StepCount,
    /// Weight scale.
    Weight,
    /// Heart rate monitor.
    HeartRate,
    /// Peak flow meter.
    PeakExpiratoryFlow,
    /// Spirometer.
    LungCapacity,
    /// Thermometer.
    Temperature,
}

impl DeviceType {
    /// All device types.
    pub const ALL: [DeviceType; 9] = [
        Self::BloodGlucose,
        Self::BloodOxygen,
        Self::BloodPressure,
        Self::StepCount,
        Self::Weight,
        Self::HeartRate,
        Self::PeakExpiratoryFlow,
        Self::LungCapacity,
        Self::Temperature,
    ];
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

type DecoderConstructor = Box<dyn Fn() -> Box<dyn DeviceDecoder> + Send + Sync>;

/// Registry of decoder constructors keyed by device type.
#[derive(Default)]
pub struct DecoderRegistry {
    constructors: HashMap<DeviceType, DecoderConstructor>,
}

impl DecoderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every bundled decoder.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(DeviceType::Weight, || Box::new(ForaScaleDecoder::new()));
        registry
    }

    /// Register (or replace) the decoder for a device type.
    pub fn register<F>(&mut self, device_type: DeviceType, constructor: F)
    where
        F: Fn() -> Box<dyn DeviceDecoder> + Send + Sync + 'static,
    {
        debug!("Registering decoder for {}", device_type);
        self.constructors.insert(device_type, Box::new(constructor));
    }

    /// Check if a device type has a decoder.
    pub fn is_supported(&self, device_type: DeviceType) -> bool {
        self.constructors.contains_key(&device_type)
    }

    /// Device types with a registered decoder, in declaration order.
    pub fn supported_types(&self) -> Vec<DeviceType> {
        let mut types: Vec<_> = self.constructors.keys().copied().collect();
        types.sort();
        types
    }

    /// Build a fresh decoder for a device type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedDeviceType`] when nothing is registered for
    /// the type. Callers should treat this as a startup configuration error.
    pub fn create(&self, device_type: DeviceType) -> Result<Box<dyn DeviceDecoder>> {
        let constructor = self
            .constructors
            .get(&device_type)
            .ok_or(Error::UnsupportedDeviceType { device_type })?;

        Ok(constructor())
    }
}

impl fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderRegistry")
            .field("supported", &self.supported_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_defaults_support_weight_only() {
        let registry = DecoderRegistry::with_defaults();
        assert_eq!(registry.supported_types(), vec![DeviceType::Weight]);

        let decoder = assert_ok!(registry.create(DeviceType::Weight));
        assert_eq!(decoder.device_type(), DeviceType::Weight);
        assert_eq!(decoder.device_name(), "TNG SCALE");
    }

    #[test]
    fn test_unsupported_types_fail() {
        let registry = DecoderRegistry::with_defaults();
        for device_type in DeviceType::ALL {
            if device_type == DeviceType::Weight {
                continue;
            }
            let error = assert_err!(registry.create(device_type));
            assert!(matches!(
                error,
                Error::UnsupportedDeviceType { device_type: t } if t == device_type
            ));
        }
    }

    #[test]
    fn test_empty_registry() {
        let registry = DecoderRegistry::new();
        assert!(!registry.is_supported(DeviceType::Weight));
        assert!(registry.create(DeviceType::Weight).is_err());
    }

    #[test]
    fn test_each_create_builds_a_fresh_decoder() {
        let registry = DecoderRegistry::with_defaults();
        let mut first = registry.create(DeviceType::Weight).unwrap();
        first.on_value_update(&[0xA5, 0x00]);

        let second = registry.create(DeviceType::Weight).unwrap();
        assert_eq!(format!("{second:?}"), format!("{:?}", ForaScaleDecoder::new()));
    }

    #[test]
    fn test_register_custom_decoder() {
        let mut registry = DecoderRegistry::new();
        registry.register(DeviceType::Temperature, || Box::new(ForaScaleDecoder::new()));
        assert!(registry.is_supported(DeviceType::Temperature));
        assert!(registry.create(DeviceType::Temperature).is_ok());
    }
}
