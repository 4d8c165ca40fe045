//! BLE Service and Characteristic UUIDs.
//!
//! Contains the UUID constants used by the bundled decoders.

use uuid::Uuid;

/// Bluetooth SIG base UUID that 16-bit assigned numbers expand into.
pub const BLUETOOTH_BASE_UUID: u128 = 0x0000_0000_0000_1000_8000_00805f9b34fb;

// Health Thermometer Service (Standard BLE)
/// Standard BLE Health Thermometer Service UUID.
///
/// The FORA TNG scale advertises itself under this service.
pub const HEALTH_THERMOMETER_SERVICE_UUID: Uuid =
    Uuid::from_u128(0x0000_1809_0000_1000_8000_00805f9b34fb);

// FORA TNG Scale (Vendor)
/// FORA TNG scale data characteristic UUID (Write, Notify).
pub const FORA_SCALE_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x0000_1524_1212_efde_1523_785feabcd123);

/// Expand a 16-bit assigned number into a full 128-bit UUID.
pub const fn uuid_from_u16(short: u16) -> Uuid {
    Uuid::from_u128(BLUETOOTH_BASE_UUID | ((short as u128) << 96))
}

/// Return the 16-bit assigned number if the UUID is on the Bluetooth base.
pub fn short_uuid(uuid: &Uuid) -> Option<u16> {
    let value = uuid.as_u128();
    let mask: u128 = !(0xFFFF_u128 << 96);
    if value & mask == BLUETOOTH_BASE_UUID {
        Some((value >> 96) as u16)
    } else {
        None
    }
}
