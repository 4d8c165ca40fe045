//! Device protocol decoder capability.
//!
//! Each supported peripheral type implements [`DeviceDecoder`]. The session
//! hands it every discovered characteristic and notification payload, and the
//! decoder decides what is relevant and when a frame is complete.

use bytes::{Bytes, BytesMut};
use std::fmt;
use uuid::Uuid;

use crate::data::{MeasurementValue, PeripheralError};
use crate::registry::DeviceType;

/// Result of feeding a payload to a decoder.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeOutcome {
    /// The frame is not complete yet.
    Continue,
    /// A complete frame was decoded.
    Complete(Vec<MeasurementValue>),
    /// The frame or the device reported a fault.
    Fail(PeripheralError),
}

/// Accumulator for bytes received across notifications.
///
/// Cleared when notifications are confirmed and at each frame boundary.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    bytes: BytesMut,
}

impl FrameBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a payload.
    pub fn append(&mut self, data: &[u8]) {
        self.bytes.extend_from_slice(data);
    }

    /// Discard everything accumulated so far.
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// First accumulated byte.
    pub fn first(&self) -> Option<u8> {
        self.bytes.first().copied()
    }

    /// Number of accumulated bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if nothing has been accumulated.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// View the accumulated bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FrameBuffer({:02X?})", self.as_slice())
    }
}

/// Capability set every peripheral protocol implements.
pub trait DeviceDecoder: Send + fmt::Debug {
    /// Device type this decoder handles.
    fn device_type(&self) -> DeviceType;

    /// Services to filter scanning to.
    fn service_uuids(&self) -> &[Uuid];

    /// The characteristic used for notifications and commands.
    fn characteristic_uuid(&self) -> Uuid;

    /// Exact advertised name of the peripheral.
    fn device_name(&self) -> &str;

    /// Check if a discovered peripheral name is handled by this decoder.
    ///
    /// Matching is exact and case-sensitive.
    fn is_peripheral_supported(&self, name: &str) -> bool {
        name == self.device_name()
    }

    /// Check if a discovered characteristic is the one this decoder uses.
    fn matches_characteristic(&self, uuid: &Uuid) -> bool {
        *uuid == self.characteristic_uuid()
    }

    /// Called once notifications are enabled.
    ///
    /// Clears the frame buffer and returns the command to write, if any.
    fn on_subscribed(&mut self) -> Option<Bytes>;

    /// Append a payload and report whether a frame completed.
    fn on_value_update(&mut self, data: &[u8]) -> DecodeOutcome;

    /// Command that powers the device down, if the protocol has one.
    fn power_off_command(&self) -> Option<Bytes> {
        None
    }

    /// Drop any partial frame.
    fn reset(&mut self);
}
