// Allow unusual byte groupings for UUIDs which have standard format
#![allow(clippy::unusual_byte_groupings)]

//! # ble-health-session
//!
//! A Rust library for taking readings from personal health peripherals over
//! Bluetooth Low Energy.
//!
//! A [`Session`] drives a single peripheral through scanning, connection,
//! GATT discovery and notification subscription, hands the notification
//! payloads to a per-device [`DeviceDecoder`] and reports the decoded
//! measurements to a [`SessionObserver`]. The [`DecoderRegistry`] picks the
//! decoder for a [`DeviceType`] once, when the session is built.
//!
//! ## Features
//!
//! - **Single-peripheral sessions**: one active connection per session, with
//!   stale adapter callbacks dropped
//! - **Pluggable decoders**: FORA TNG weight scale bundled
//! - **Explicit timeouts**: connect, discovery, frame and disconnect deadlines
//! - **Bluetooth status tracking**: scanning resumes when the radio powers on
//! - **btleplug adapter**: cross-platform radio access
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ble_health_session::{DecoderRegistry, DeviceType, Result, SessionConfig, SessionManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let registry = DecoderRegistry::with_defaults();
//!     let manager =
//!         SessionManager::with_btleplug(&registry, DeviceType::Weight, SessionConfig::default())
//!             .await?;
//!
//!     manager.start_scanning()?;
//!
//!     let batch = manager.next_measurements().await?;
//!     for value in &batch.values {
//!         println!("{}", value);
//!     }
//!
//!     manager.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Platform Notes
//!
//! ### macOS
//! Requires Bluetooth permission. Add `NSBluetoothAlwaysUsageDescription`
//! to your Info.plist for bundled apps.
//!
//! ### Linux
//! Requires BlueZ. User may need to be in the `bluetooth` group.
//!
//! ### Windows
//! Requires Windows 10 or later with Bluetooth LE support.
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization for data types

// Public modules
pub mod ble;
pub mod data;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod session_manager;
pub mod utils;

// Re-exports for convenience
pub use error::{Error, Result};
pub use registry::{DecoderRegistry, DeviceType};
pub use session::{
    BroadcastObserver, Session, SessionConfig, SessionObserver, SessionOutcome, SessionState,
};
pub use session_manager::{CallbackHandle, SessionManager};
pub use utils::{kilograms_to_pounds, pounds_to_kilograms};

// Re-export commonly used types from submodules
pub use ble::{
    AdapterEvent, BleAdapter, BluetoothStatus, BtleplugAdapter, CharacteristicDescriptor,
    PeripheralHandle, ServiceDescriptor,
};
pub use data::{
    DeviceError, GeneralError, MeasurementBatch, MeasurementUnit, MeasurementValue,
    PeripheralError, WeightError, WeightUnit,
};
pub use protocol::{DecodeOutcome, DeviceDecoder, ForaScaleDecoder};
