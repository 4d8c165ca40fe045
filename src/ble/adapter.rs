//! Adapter contract consumed by the session state machine.
//!
//! The session never talks to a radio directly. It issues requests through
//! [`BleAdapter`] and learns about their outcome from [`AdapterEvent`]s that the
//! adapter delivers later, in order.

use bytes::Bytes;
use std::fmt;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// Simplified radio power/authorization state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BluetoothStatus {
    /// Bluetooth is unsupported or unauthorized on this host.
    Unavailable,
    /// The radio state is transitional or unknown.
    #[default]
    Pending,
    /// The radio is switched off.
    PoweredOff,
    /// The radio is on and usable.
    PoweredOn,
}

impl BluetoothStatus {
    /// Check if scanning and connecting are allowed.
    pub fn is_powered_on(&self) -> bool {
        matches!(self, Self::PoweredOn)
    }
}

impl fmt::Display for BluetoothStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "Unavailable"),
            Self::Pending => write!(f, "Pending"),
            Self::PoweredOff => write!(f, "PoweredOff"),
            Self::PoweredOn => write!(f, "PoweredOn"),
        }
    }
}

/// Opaque identity of one physical peripheral, owned by the adapter.
///
/// Two handles are equal when their identifiers match; the address is
/// informational.
#[derive(Debug, Clone)]
pub struct PeripheralHandle {
    id: String,
    address: String,
}

impl PeripheralHandle {
    /// Create a handle from an adapter identifier and a device address.
    pub fn new(id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
        }
    }

    /// Adapter identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Device address.
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl PartialEq for PeripheralHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PeripheralHandle {}

impl Hash for PeripheralHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for PeripheralHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.address)
    }
}

/// A GATT service discovered on a peripheral.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceDescriptor {
    /// Service UUID.
    pub uuid: Uuid,
    /// Whether the service is primary.
    pub primary: bool,
}

impl ServiceDescriptor {
    /// Create a primary service descriptor.
    pub fn primary(uuid: Uuid) -> Self {
        Self {
            uuid,
            primary: true,
        }
    }
}

/// A GATT characteristic discovered within a service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CharacteristicDescriptor {
    /// Characteristic UUID.
    pub uuid: Uuid,
    /// UUID of the service that contains it.
    pub service_uuid: Uuid,
}

impl CharacteristicDescriptor {
    /// Create a characteristic descriptor.
    pub fn new(uuid: Uuid, service_uuid: Uuid) -> Self {
        Self { uuid, service_uuid }
    }
}

/// Lifecycle events delivered by the adapter, in the order it produced them.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterEvent {
    /// The radio status changed.
    AdapterStatusChanged(BluetoothStatus),
    /// A peripheral was seen while scanning.
    PeripheralDiscovered {
        /// The peripheral.
        peripheral: PeripheralHandle,
        /// Advertised local name, if any.
        name: Option<String>,
    },
    /// A connection request succeeded.
    Connected(PeripheralHandle),
    /// A connection request failed, including a link lost before it completed.
    ConnectFailed(PeripheralHandle),
    /// The peripheral disconnected, solicited or not.
    Disconnected(PeripheralHandle),
    /// Service discovery completed.
    ServicesDiscovered {
        /// The peripheral.
        peripheral: PeripheralHandle,
        /// All services found.
        services: Vec<ServiceDescriptor>,
    },
    /// Characteristic discovery for one service completed.
    CharacteristicsDiscovered {
        /// The peripheral.
        peripheral: PeripheralHandle,
        /// The service that was inspected.
        service_uuid: Uuid,
        /// All characteristics found in the service.
        characteristics: Vec<CharacteristicDescriptor>,
    },
    /// A notification enable/disable request completed.
    NotifyStateChanged {
        /// The peripheral.
        peripheral: PeripheralHandle,
        /// The characteristic.
        characteristic_uuid: Uuid,
        /// Whether notifications are now enabled.
        enabled: bool,
    },
    /// A characteristic value arrived (notification or read).
    ValueUpdated {
        /// The peripheral.
        peripheral: PeripheralHandle,
        /// The characteristic.
        characteristic_uuid: Uuid,
        /// Raw payload.
        value: Vec<u8>,
    },
}

impl AdapterEvent {
    /// The peripheral this event concerns, if any.
    pub fn peripheral(&self) -> Option<&PeripheralHandle> {
        match self {
            Self::AdapterStatusChanged(_) => None,
            Self::PeripheralDiscovered { peripheral, .. }
            | Self::ServicesDiscovered { peripheral, .. }
            | Self::CharacteristicsDiscovered { peripheral, .. }
            | Self::NotifyStateChanged { peripheral, .. }
            | Self::ValueUpdated { peripheral, .. } => Some(peripheral),
            Self::Connected(peripheral)
            | Self::ConnectFailed(peripheral)
            | Self::Disconnected(peripheral) => Some(peripheral),
        }
    }
}

/// Requests the session issues to the radio.
///
/// Every method returns immediately; completion is reported later as an
/// [`AdapterEvent`]. Implementations must deliver events for one peripheral in
/// the order the radio produced them.
#[cfg_attr(test, mockall::automock)]
pub trait BleAdapter: Send {
    /// Current radio status.
    fn status(&self) -> BluetoothStatus;

    /// Restrict subsequent scans to peripherals advertising these services.
    fn set_scan_filter(&self, services: &[Uuid]);

    /// Start scanning for peripherals.
    fn start_scan(&self);

    /// Stop scanning.
    fn stop_scan(&self);

    /// Request a connection.
    fn connect(&self, peripheral: &PeripheralHandle);

    /// Request a disconnection. Must be safe to call in any state.
    fn disconnect(&self, peripheral: &PeripheralHandle);

    /// Discover all services of a connected peripheral.
    fn discover_services(&self, peripheral: &PeripheralHandle);

    /// Discover all characteristics of one service.
    fn discover_characteristics(&self, peripheral: &PeripheralHandle, service_uuid: Uuid);

    /// Enable or disable notifications on a characteristic.
    fn set_notify_enabled(
        &self,
        peripheral: &PeripheralHandle,
        characteristic: &CharacteristicDescriptor,
        enabled: bool,
    );

    /// Write a value to a characteristic (with response).
    fn write_value(
        &self,
        peripheral: &PeripheralHandle,
        characteristic: &CharacteristicDescriptor,
        data: Bytes,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_bluetooth_status() {
        assert!(BluetoothStatus::PoweredOn.is_powered_on());
        assert!(!BluetoothStatus::Pending.is_powered_on());
        assert!(!BluetoothStatus::PoweredOff.is_powered_on());
        assert_eq!(BluetoothStatus::default(), BluetoothStatus::Pending);
        assert_eq!(format!("{}", BluetoothStatus::Unavailable), "Unavailable");
    }

    #[test]
    fn test_handle_identity_ignores_address() {
        let a = PeripheralHandle::new("peripheral-1", "AA:BB:CC:DD:EE:FF");
        let b = PeripheralHandle::new("peripheral-1", "");
        let c = PeripheralHandle::new("peripheral-2", "AA:BB:CC:DD:EE:FF");

        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_event_peripheral() {
        let handle = PeripheralHandle::new("p", "addr");
        assert_eq!(
            AdapterEvent::Connected(handle.clone()).peripheral(),
            Some(&handle)
        );
        assert_eq!(
            AdapterEvent::AdapterStatusChanged(BluetoothStatus::PoweredOn).peripheral(),
            None
        );
    }
}
