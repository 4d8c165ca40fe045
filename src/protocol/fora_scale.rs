//! FORA TNG weight scale protocol.
//!
//! Command format (7 bytes):
//! - Byte 0: Start (0x51)
//! - Byte 1: Command
//! - Bytes 2-5: Command data
//! - Byte 6: Checksum (wrapping sum of bytes 0-5)
//!
//! Measurement frame (34 bytes):
//! - Byte 0: Data index, 0xA5 marks a complete measurement frame
//! - Bytes 2-4: CMD, ACK, Length
//! - Byte 5: Stable time
//! - Bytes 6-10: Year (since 2000), Month, Day, Hour, Minute
//! - Bytes 11-17: User code, gender, height, age, calorie unit
//! - Bytes 18-19: Weight in kg x10 (uint16_t little-endian)
//! - Bytes 20-21: Weight in lb x10 (uint16_t little-endian)
//! - Bytes 22-33: BMI, body fat, muscle, bone and water composition
//!
//! The vendor's layout table labels the lower byte of each weight field the
//! "high byte". Scales in the field send the low byte first, so the fields are
//! read as little-endian.

use bytes::Bytes;
use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::ble::uuids::{FORA_SCALE_CHARACTERISTIC_UUID, HEALTH_THERMOMETER_SERVICE_UUID};
use crate::data::{MeasurementValue, PeripheralError, WeightError};
use crate::error::{Error, Result};
use crate::protocol::decoder::{DecodeOutcome, DeviceDecoder, FrameBuffer};
use crate::registry::DeviceType;
use crate::utils::hex_string;

/// Advertised name of the FORA TNG scale.
pub const TNG_SCALE_NAME: &str = "TNG SCALE";

/// First byte of a complete measurement frame.
pub const FRAME_SENTINEL: u8 = 0xA5;

/// Length of a complete measurement frame.
pub const FRAME_LEN: usize = 34;

/// Start byte of every command.
const COMMAND_START: u8 = 0x51;

/// Commands understood by the scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScaleCommand {
    /// Request the latest measurement.
    ReadMeasurement,
    /// Switch the scale off.
    PowerOff,
}

impl ScaleCommand {
    fn body(&self) -> [u8; 6] {
        match self {
            Self::ReadMeasurement => [COMMAND_START, 0x71, 0x02, 0x00, 0x00, 0xA3],
            Self::PowerOff => [COMMAND_START, 0x50, 0x00, 0x00, 0x00, 0x00],
        }
    }

    /// Encode the command with its checksum.
    pub fn frame(&self) -> [u8; 7] {
        let body = self.body();
        let checksum = body.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));

        let mut frame = [0u8; 7];
        frame[..6].copy_from_slice(&body);
        frame[6] = checksum;
        frame
    }

    /// Encode the command as a write payload.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.frame())
    }
}

/// A parsed measurement frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleFrame {
    /// Weight in kilograms x10.
    pub kilograms_raw: u16,
    /// Weight in pounds x10.
    pub pounds_raw: u16,
    /// When the scale took the reading, if the clock fields are valid.
    pub measured_at: Option<NaiveDateTime>,
}

impl ScaleFrame {
    const KILOGRAMS_OFFSET: usize = 18;
    const POUNDS_OFFSET: usize = 20;
    const TIMESTAMP_OFFSET: usize = 6;

    /// Parse a complete measurement frame.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < FRAME_LEN {
            return Err(Error::InvalidData {
                context: format!(
                    "Scale frame too short: {} bytes (need {})",
                    data.len(),
                    FRAME_LEN
                ),
            });
        }

        if data[0] != FRAME_SENTINEL {
            return Err(Error::InvalidData {
                context: format!("Scale frame starts with {:#04x}, not the sentinel", data[0]),
            });
        }

        let kilograms_raw =
            u16::from_le_bytes([data[Self::KILOGRAMS_OFFSET], data[Self::KILOGRAMS_OFFSET + 1]]);
        let pounds_raw =
            u16::from_le_bytes([data[Self::POUNDS_OFFSET], data[Self::POUNDS_OFFSET + 1]]);

        Ok(Self {
            kilograms_raw,
            pounds_raw,
            measured_at: Self::parse_timestamp(&data[Self::TIMESTAMP_OFFSET..]),
        })
    }

    fn parse_timestamp(fields: &[u8]) -> Option<NaiveDateTime> {
        let [year, month, day, hour, minute, ..] = fields else {
            return None;
        };

        NaiveDate::from_ymd_opt(2000 + i32::from(*year), u32::from(*month), u32::from(*day))?
            .and_hms_opt(u32::from(*hour), u32::from(*minute), 0)
    }

    /// Weight in kilograms.
    pub fn kilograms(&self) -> f64 {
        f64::from(self.kilograms_raw) / 10.0
    }

    /// Weight in pounds.
    pub fn pounds(&self) -> f64 {
        f64::from(self.pounds_raw) / 10.0
    }

    /// Readings in kilogram, pound order.
    pub fn measurements(&self) -> Vec<MeasurementValue> {
        vec![
            MeasurementValue::kilograms(self.kilograms()),
            MeasurementValue::pounds(self.pounds()),
        ]
    }
}

/// Decoder for the FORA TNG weight scale.
#[derive(Debug, Default)]
pub struct ForaScaleDecoder {
    buffer: FrameBuffer,
}

impl ForaScaleDecoder {
    /// Service list the scale advertises.
    const SERVICES: [Uuid; 1] = [HEALTH_THERMOMETER_SERVICE_UUID];

    /// Create a decoder with an empty frame buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes accumulated for the current frame.
    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    fn is_frame_complete(&self) -> bool {
        self.buffer.first() == Some(FRAME_SENTINEL) && self.buffer.len() >= FRAME_LEN
    }
}

impl DeviceDecoder for ForaScaleDecoder {
    fn device_type(&self) -> DeviceType {
        DeviceType::Weight
    }

    fn service_uuids(&self) -> &[Uuid] {
        &Self::SERVICES
    }

    fn characteristic_uuid(&self) -> Uuid {
        FORA_SCALE_CHARACTERISTIC_UUID
    }

    fn device_name(&self) -> &str {
        TNG_SCALE_NAME
    }

    fn on_subscribed(&mut self) -> Option<Bytes> {
        self.buffer.clear();
        let command = ScaleCommand::ReadMeasurement.to_bytes();
        debug!("Sending read command: {}", hex_string(&command));
        Some(command)
    }

    fn on_value_update(&mut self, data: &[u8]) -> DecodeOutcome {
        self.buffer.append(data);
        trace!(
            "Scale buffer now {} bytes after {} byte payload",
            self.buffer.len(),
            data.len()
        );

        if self.buffer.first() != Some(FRAME_SENTINEL) && self.buffer.len() >= FRAME_LEN {
            debug!(
                "Dropping {} bytes without a frame sentinel",
                self.buffer.len()
            );
            self.buffer.clear();
            return DecodeOutcome::Fail(PeripheralError::weight(WeightError::Error));
        }

        if !self.is_frame_complete() {
            return DecodeOutcome::Continue;
        }

        let parsed = ScaleFrame::parse(self.buffer.as_slice());
        self.buffer.clear();

        match parsed {
            Ok(frame) => {
                debug!(
                    "Scale frame: {:.1} kg, {:.1} lb, measured at {:?}",
                    frame.kilograms(),
                    frame.pounds(),
                    frame.measured_at
                );
                DecodeOutcome::Complete(frame.measurements())
            }
            // Unreachable after the completeness check; keep waiting for the next frame.
            Err(e) => {
                debug!("Discarding scale frame: {}", e);
                DecodeOutcome::Continue
            }
        }
    }

    fn power_off_command(&self) -> Option<Bytes> {
        Some(ScaleCommand::PowerOff.to_bytes())
    }

    fn reset(&mut self) {
        self.buffer.clear();
    }
}
