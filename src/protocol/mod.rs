//! Protocol module for decoding peripheral payloads.
//!
//! This module contains:
//! - The decoder capability every device type implements
//! - The FORA TNG weight scale protocol

pub mod decoder;
pub mod fora_scale;

pub use decoder::{DecodeOutcome, DeviceDecoder, FrameBuffer};
pub use fora_scale::{ForaScaleDecoder, ScaleCommand, ScaleFrame, TNG_SCALE_NAME};
