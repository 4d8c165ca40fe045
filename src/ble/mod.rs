//! BLE communication module.
//!
//! This module provides the adapter contract the session consumes and its
//! btleplug implementation.

pub mod adapter;
pub mod btleplug_adapter;
pub mod uuids;

pub use adapter::{
    AdapterEvent, BleAdapter, BluetoothStatus, CharacteristicDescriptor, PeripheralHandle,
    ServiceDescriptor,
};
pub use btleplug_adapter::BtleplugAdapter;
pub use uuids::*;
