//! Session state machine.
//!
//! A [`Session`] drives one peripheral from discovery to a decoded frame and
//! back to idle. It issues requests through a [`BleAdapter`], consumes the
//! [`AdapterEvent`]s the adapter reports, hands protocol traffic to the active
//! [`DeviceDecoder`] and tells a [`SessionObserver`] what happened.
//!
//! The session is not reentrant. Events must be delivered one at a time, in
//! the order the adapter produced them. Every handler re-checks the current
//! state and peripheral before acting; events that no longer apply are
//! dropped.

use bytes::Bytes;
use std::collections::HashSet;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::ble::adapter::{
    AdapterEvent, BleAdapter, BluetoothStatus, CharacteristicDescriptor, PeripheralHandle,
    ServiceDescriptor,
};
use crate::data::{GeneralError, MeasurementBatch, MeasurementValue, PeripheralError};
use crate::error::{Error, Result};
use crate::protocol::decoder::{DecodeOutcome, DeviceDecoder};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SessionState {
    /// Nothing in progress.
    #[default]
    Idle,
    /// Scanning for a peripheral the decoder supports.
    Scanning,
    /// Waiting for the connection to complete.
    Connecting,
    /// Waiting for the service list.
    DiscoveringServices,
    /// Waiting for per-service characteristic lists.
    DiscoveringCharacteristics,
    /// Waiting for notifications to be enabled.
    Subscribing,
    /// Receiving frame payloads.
    AwaitingData,
    /// Waiting for a requested disconnection to complete.
    Disconnecting,
}

impl SessionState {
    /// Check if a peripheral reference is live in this state.
    pub fn has_peripheral(&self) -> bool {
        !matches!(self, Self::Idle | Self::Scanning)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Scanning => write!(f, "Scanning"),
            Self::Connecting => write!(f, "Connecting"),
            Self::DiscoveringServices => write!(f, "DiscoveringServices"),
            Self::DiscoveringCharacteristics => write!(f, "DiscoveringCharacteristics"),
            Self::Subscribing => write!(f, "Subscribing"),
            Self::AwaitingData => write!(f, "AwaitingData"),
            Self::Disconnecting => write!(f, "Disconnecting"),
        }
    }
}

/// Session timing and recovery policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Deadline for a connection request. On expiry the attempt is cancelled
    /// and reported as a connection failure. No retry is made.
    pub connect_timeout: Option<Duration>,
    /// Deadline for each discovery step and for enabling notifications.
    pub discovery_timeout: Option<Duration>,
    /// Longest silence tolerated while a frame is being received.
    pub frame_timeout: Option<Duration>,
    /// Deadline for a requested disconnection to be confirmed.
    pub disconnect_timeout: Option<Duration>,
    /// Give up scanning after this long.
    pub scan_timeout: Option<Duration>,
    /// Restart scanning when the peripheral drops the link on its own.
    pub rescan_on_unsolicited_disconnect: bool,
    /// Restart scanning once the link closes after a measurement.
    pub rescan_after_measurement: bool,
    /// Send the decoder's power-off command after a measurement.
    pub power_off_after_measurement: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(10)),
            discovery_timeout: Some(Duration::from_secs(10)),
            frame_timeout: Some(Duration::from_secs(30)),
            disconnect_timeout: Some(Duration::from_secs(5)),
            scan_timeout: None,
            rescan_on_unsolicited_disconnect: true,
            rescan_after_measurement: false,
            power_off_after_measurement: false,
        }
    }
}

impl SessionConfig {
    /// Set the connection deadline.
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the discovery and subscribe deadline.
    pub fn with_discovery_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    /// Set the frame silence deadline.
    pub fn with_frame_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.frame_timeout = timeout;
        self
    }

    /// Set the disconnection deadline.
    pub fn with_disconnect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.disconnect_timeout = timeout;
        self
    }

    /// Set the scan deadline.
    pub fn with_scan_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.scan_timeout = timeout;
        self
    }

    /// Enable or disable scanning again after an unsolicited disconnection.
    pub fn with_rescan_on_unsolicited_disconnect(mut self, enabled: bool) -> Self {
        self.rescan_on_unsolicited_disconnect = enabled;
        self
    }

    /// Enable or disable scanning again after each measurement.
    pub fn with_rescan_after_measurement(mut self, enabled: bool) -> Self {
        self.rescan_after_measurement = enabled;
        self
    }

    /// Enable or disable powering the device off after each measurement.
    pub fn with_power_off_after_measurement(mut self, enabled: bool) -> Self {
        self.power_off_after_measurement = enabled;
        self
    }

    /// Disable every deadline.
    pub fn without_timeouts(self) -> Self {
        Self {
            connect_timeout: None,
            discovery_timeout: None,
            frame_timeout: None,
            disconnect_timeout: None,
            scan_timeout: None,
            ..self
        }
    }
}

/// Receiver of session outcomes.
///
/// Callbacks are fire-and-forget. They run synchronously inside event
/// handling, after the session has already updated its own state.
#[allow(unused_variables)]
pub trait SessionObserver: Send {
    /// The radio status changed.
    fn on_bluetooth_status_changed(&self, status: BluetoothStatus) {}

    /// The peripheral connected.
    fn on_connected(&self) {}

    /// The connection attempt failed or timed out.
    fn on_connection_failed(&self, error: PeripheralError) {}

    /// The link to the peripheral closed.
    fn on_disconnected(&self) {}

    /// A complete frame was decoded.
    fn on_measurements(&self, values: &[MeasurementValue]) {}

    /// The device or its protocol reported a fault. The session tears down.
    fn on_device_error(&self, error: PeripheralError) {}
}

/// Owned form of an observer callback.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SessionOutcome {
    /// The radio status changed.
    BluetoothStatusChanged(BluetoothStatus),
    /// The peripheral connected.
    Connected,
    /// The connection attempt failed.
    ConnectionFailed(PeripheralError),
    /// The link closed.
    Disconnected,
    /// A frame was decoded.
    Measurements(MeasurementBatch),
    /// The device reported a fault.
    DeviceError(PeripheralError),
}

/// Observer that forwards every outcome to a broadcast channel.
///
/// Send failures (no receivers) are ignored.
#[derive(Debug, Clone)]
pub struct BroadcastObserver {
    tx: broadcast::Sender<SessionOutcome>,
}

impl BroadcastObserver {
    /// Wrap an existing sender.
    pub fn new(tx: broadcast::Sender<SessionOutcome>) -> Self {
        Self { tx }
    }

    /// Subscribe to forwarded outcomes.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionOutcome> {
        self.tx.subscribe()
    }

    fn send(&self, outcome: SessionOutcome) {
        let _ = self.tx.send(outcome);
    }
}

impl SessionObserver for BroadcastObserver {
    fn on_bluetooth_status_changed(&self, status: BluetoothStatus) {
        self.send(SessionOutcome::BluetoothStatusChanged(status));
    }

    fn on_connected(&self) {
        self.send(SessionOutcome::Connected);
    }

    fn on_connection_failed(&self, error: PeripheralError) {
        self.send(SessionOutcome::ConnectionFailed(error));
    }

    fn on_disconnected(&self) {
        self.send(SessionOutcome::Disconnected);
    }

    fn on_measurements(&self, values: &[MeasurementValue]) {
        self.send(SessionOutcome::Measurements(MeasurementBatch::now(
            values.to_vec(),
        )));
    }

    fn on_device_error(&self, error: PeripheralError) {
        self.send(SessionOutcome::DeviceError(error));
    }
}

/// One peripheral session bound to an adapter and a decoder.
pub struct Session<A: BleAdapter> {
    adapter: A,
    decoder: Box<dyn DeviceDecoder>,
    observer: Box<dyn SessionObserver>,
    config: SessionConfig,
    state: SessionState,
    bluetooth_status: BluetoothStatus,
    /// Live whenever `state.has_peripheral()`.
    peripheral: Option<PeripheralHandle>,
    characteristic: Option<CharacteristicDescriptor>,
    /// Services whose characteristic discovery has not answered yet.
    pending_services: HashSet<Uuid>,
    scan_requested: bool,
    disconnect_requested: bool,
    rescan_after_disconnect: bool,
    deadline: Option<Instant>,
}

impl<A: BleAdapter> Session<A> {
    /// Create an idle session.
    pub fn new(
        adapter: A,
        decoder: Box<dyn DeviceDecoder>,
        observer: Box<dyn SessionObserver>,
        config: SessionConfig,
    ) -> Self {
        let bluetooth_status = adapter.status();
        debug!(
            "Creating {} session (adapter {})",
            decoder.device_type(),
            bluetooth_status
        );

        Self {
            adapter,
            decoder,
            observer,
            config,
            state: SessionState::Idle,
            bluetooth_status,
            peripheral: None,
            characteristic: None,
            pending_services: HashSet::new(),
            scan_requested: false,
            disconnect_requested: false,
            rescan_after_disconnect: false,
            deadline: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Last radio status seen.
    pub fn bluetooth_status(&self) -> BluetoothStatus {
        self.bluetooth_status
    }

    /// The active peripheral, if any.
    pub fn peripheral(&self) -> Option<&PeripheralHandle> {
        self.peripheral.as_ref()
    }

    /// The subscribed characteristic, if any.
    pub fn characteristic(&self) -> Option<&CharacteristicDescriptor> {
        self.characteristic.as_ref()
    }

    /// Check if the caller wants the session to be scanning.
    pub fn is_scan_requested(&self) -> bool {
        self.scan_requested
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The active decoder.
    pub fn decoder(&self) -> &dyn DeviceDecoder {
        self.decoder.as_ref()
    }

    /// The adapter this session issues requests to.
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    // === Caller operations ===

    /// Start scanning for the decoder's peripheral.
    ///
    /// The request is remembered even when declined, so scanning starts by
    /// itself once the radio reports [`BluetoothStatus::PoweredOn`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::AdapterUnavailable`] if the radio is not powered on.
    pub fn start_scanning(&mut self) -> Result<()> {
        self.scan_requested = true;

        if !self.bluetooth_status.is_powered_on() {
            debug!(
                "Scan request declined, adapter is {}",
                self.bluetooth_status
            );
            return Err(Error::AdapterUnavailable {
                status: self.bluetooth_status,
            });
        }

        match self.state {
            SessionState::Idle => self.begin_scan(),
            SessionState::Scanning => {}
            state => debug!("Scan request recorded while {}", state),
        }

        Ok(())
    }

    /// Stop scanning and forget the scan request.
    pub fn stop_scanning(&mut self) {
        self.scan_requested = false;

        if self.state == SessionState::Scanning {
            info!("Stopping scan");
            self.adapter.stop_scan();
            self.state = SessionState::Idle;
            self.deadline = None;
        }
    }

    /// Disconnect from the active peripheral.
    ///
    /// Legal in every state. Does nothing while idle, scanning or already
    /// disconnecting.
    pub fn disconnect(&mut self) {
        let Some(peripheral) = self.peripheral.clone() else {
            return;
        };
        if self.state == SessionState::Disconnecting {
            return;
        }

        info!("Disconnecting from {} while {}", peripheral, self.state);

        if self.state == SessionState::AwaitingData {
            if let Some(characteristic) = &self.characteristic {
                self.adapter
                    .set_notify_enabled(&peripheral, characteristic, false);
            }
        }

        self.disconnect_requested = true;
        self.adapter.disconnect(&peripheral);
        self.state = SessionState::Disconnecting;
        self.arm(self.config.disconnect_timeout);
    }

    /// End the session: stop scanning and release the peripheral.
    ///
    /// Also runs when the session is dropped.
    pub fn end(&mut self) {
        self.stop_scanning();
        self.rescan_after_disconnect = false;
        self.disconnect();
    }

    // === Event handling ===

    /// Apply one adapter event.
    pub fn handle_event(&mut self, event: AdapterEvent) {
        match event {
            AdapterEvent::AdapterStatusChanged(status) => self.on_status_changed(status),
            AdapterEvent::PeripheralDiscovered { peripheral, name } => {
                self.on_peripheral_discovered(peripheral, name)
            }
            AdapterEvent::Connected(peripheral) => self.on_connected(&peripheral),
            AdapterEvent::ConnectFailed(peripheral) => self.on_connect_failed(&peripheral),
            AdapterEvent::Disconnected(peripheral) => self.on_disconnected(&peripheral),
            AdapterEvent::ServicesDiscovered {
                peripheral,
                services,
            } => self.on_services_discovered(&peripheral, services),
            AdapterEvent::CharacteristicsDiscovered {
                peripheral,
                service_uuid,
                characteristics,
            } => self.on_characteristics_discovered(&peripheral, service_uuid, characteristics),
            AdapterEvent::NotifyStateChanged {
                peripheral,
                characteristic_uuid,
                enabled,
            } => self.on_notify_state_changed(&peripheral, characteristic_uuid, enabled),
            AdapterEvent::ValueUpdated {
                peripheral,
                characteristic_uuid,
                value,
            } => self.on_value_updated(&peripheral, characteristic_uuid, &value),
        }
    }

    /// Expire the current step if its deadline has passed.
    pub fn poll_timeouts(&mut self, now: Instant) {
        match self.deadline {
            Some(deadline) if now >= deadline => {}
            _ => return,
        }
        self.deadline = None;

        warn!("Timed out while {}", self.state);

        match self.state {
            SessionState::Idle => {}
            SessionState::Scanning => {
                self.scan_requested = false;
                self.adapter.stop_scan();
                self.state = SessionState::Idle;
            }
            SessionState::Connecting => {
                if let Some(peripheral) = self.peripheral.take() {
                    self.adapter.disconnect(&peripheral);
                }
                self.reset_link();
                self.state = SessionState::Idle;
                self.observer
                    .on_connection_failed(PeripheralError::Peripheral(GeneralError::CouldNotConnect));
            }
            SessionState::DiscoveringServices
            | SessionState::DiscoveringCharacteristics
            | SessionState::Subscribing
            | SessionState::AwaitingData => {
                self.fail(PeripheralError::Peripheral(GeneralError::Timeout));
            }
            SessionState::Disconnecting => self.finish_disconnect(),
        }
    }

    fn on_status_changed(&mut self, status: BluetoothStatus) {
        if status == self.bluetooth_status {
            return;
        }

        info!("Bluetooth status {} -> {}", self.bluetooth_status, status);
        self.bluetooth_status = status;

        if status.is_powered_on() {
            if self.state == SessionState::Idle && self.scan_requested {
                self.begin_scan();
            }
            self.observer.on_bluetooth_status_changed(status);
            return;
        }

        let had_peripheral = self.peripheral.is_some();
        self.reset_link();
        self.rescan_after_disconnect = false;
        self.state = SessionState::Idle;

        self.observer.on_bluetooth_status_changed(status);
        if had_peripheral {
            self.observer.on_disconnected();
        }
    }

    fn on_peripheral_discovered(&mut self, peripheral: PeripheralHandle, name: Option<String>) {
        if self.state != SessionState::Scanning {
            trace!("Ignoring discovery of {} while {}", peripheral, self.state);
            return;
        }

        let supported = name
            .as_deref()
            .is_some_and(|name| self.decoder.is_peripheral_supported(name));
        if !supported {
            trace!("Ignoring {} named {:?}", peripheral, name);
            return;
        }

        info!("Found {:?} at {}, connecting", name, peripheral);
        self.adapter.stop_scan();
        self.adapter.connect(&peripheral);
        self.peripheral = Some(peripheral);
        self.state = SessionState::Connecting;
        self.arm(self.config.connect_timeout);
    }

    fn on_connected(&mut self, peripheral: &PeripheralHandle) {
        if !self.is_active(peripheral, SessionState::Connecting) {
            trace!("Ignoring connection of {} while {}", peripheral, self.state);
            return;
        }

        info!("Connected to {}", peripheral);
        self.state = SessionState::DiscoveringServices;
        self.arm(self.config.discovery_timeout);
        self.adapter.discover_services(peripheral);
        self.observer.on_connected();
    }

    fn on_connect_failed(&mut self, peripheral: &PeripheralHandle) {
        if !self.is_active(peripheral, SessionState::Connecting) {
            trace!("Ignoring connect failure of {} while {}", peripheral, self.state);
            return;
        }

        warn!("Failed to connect to {}", peripheral);
        self.reset_link();
        self.state = SessionState::Idle;
        self.observer
            .on_connection_failed(PeripheralError::Peripheral(GeneralError::CouldNotConnect));
    }

    fn on_disconnected(&mut self, peripheral: &PeripheralHandle) {
        // A link lost mid-connect arrives as ConnectFailed, so a disconnection
        // seen while connecting belongs to an earlier link to the same device.
        if self.peripheral.as_ref() != Some(peripheral)
            || self.state == SessionState::Connecting
        {
            trace!("Ignoring disconnection of {} while {}", peripheral, self.state);
            return;
        }

        let solicited = self.disconnect_requested;
        info!(
            "Disconnected from {} ({})",
            peripheral,
            if solicited { "requested" } else { "unsolicited" }
        );

        if !solicited {
            self.rescan_after_disconnect = self.config.rescan_on_unsolicited_disconnect;
        }
        self.finish_disconnect();
    }

    fn on_services_discovered(
        &mut self,
        peripheral: &PeripheralHandle,
        services: Vec<ServiceDescriptor>,
    ) {
        if !self.is_active(peripheral, SessionState::DiscoveringServices) {
            trace!("Ignoring services of {} while {}", peripheral, self.state);
            return;
        }

        let declared = self.decoder.service_uuids();
        debug!(
            "Discovered {} services on {} ({} declared by decoder)",
            services.len(),
            peripheral,
            services.iter().filter(|s| declared.contains(&s.uuid)).count()
        );

        if services.is_empty() {
            self.fail(PeripheralError::Peripheral(GeneralError::CharacteristicNotFound));
            return;
        }

        self.pending_services = services.iter().map(|s| s.uuid).collect();
        self.state = SessionState::DiscoveringCharacteristics;
        self.arm(self.config.discovery_timeout);

        for service in &services {
            self.adapter.discover_characteristics(peripheral, service.uuid);
        }
    }

    fn on_characteristics_discovered(
        &mut self,
        peripheral: &PeripheralHandle,
        service_uuid: Uuid,
        characteristics: Vec<CharacteristicDescriptor>,
    ) {
        if !self.is_active(peripheral, SessionState::DiscoveringCharacteristics)
            || !self.pending_services.remove(&service_uuid)
        {
            trace!(
                "Ignoring characteristics of service {} while {}",
                service_uuid,
                self.state
            );
            return;
        }

        let matched = characteristics
            .into_iter()
            .find(|c| self.decoder.matches_characteristic(&c.uuid));

        match matched {
            Some(characteristic) => {
                debug!(
                    "Subscribing to {} in service {}",
                    characteristic.uuid, service_uuid
                );
                self.pending_services.clear();
                self.state = SessionState::Subscribing;
                self.arm(self.config.discovery_timeout);
                self.adapter
                    .set_notify_enabled(peripheral, &characteristic, true);
                self.characteristic = Some(characteristic);
            }
            None if self.pending_services.is_empty() => {
                warn!(
                    "No characteristic {} on {}",
                    self.decoder.characteristic_uuid(),
                    peripheral
                );
                self.fail(PeripheralError::Peripheral(GeneralError::CharacteristicNotFound));
            }
            None => {}
        }
    }

    fn on_notify_state_changed(
        &mut self,
        peripheral: &PeripheralHandle,
        characteristic_uuid: Uuid,
        enabled: bool,
    ) {
        if !self.is_active(peripheral, SessionState::Subscribing)
            || !self.is_subscribed_characteristic(characteristic_uuid)
        {
            trace!(
                "Ignoring notify state of {} while {}",
                characteristic_uuid,
                self.state
            );
            return;
        }

        if !enabled {
            warn!("{} refused notifications on {}", peripheral, characteristic_uuid);
            self.fail(PeripheralError::Peripheral(GeneralError::SubscribeFailed));
            return;
        }

        self.state = SessionState::AwaitingData;
        self.arm(self.config.frame_timeout);

        if let Some(command) = self.decoder.on_subscribed() {
            self.write(command);
        }
    }

    fn on_value_updated(
        &mut self,
        peripheral: &PeripheralHandle,
        characteristic_uuid: Uuid,
        value: &[u8],
    ) {
        if !self.is_active(peripheral, SessionState::AwaitingData)
            || !self.is_subscribed_characteristic(characteristic_uuid)
        {
            trace!(
                "Ignoring {} byte value from {} while {}",
                value.len(),
                characteristic_uuid,
                self.state
            );
            return;
        }

        match self.decoder.on_value_update(value) {
            DecodeOutcome::Continue => self.arm(self.config.frame_timeout),
            DecodeOutcome::Complete(values) => {
                info!("Received {} measurements from {}", values.len(), peripheral);

                if self.config.power_off_after_measurement {
                    if let Some(command) = self.decoder.power_off_command() {
                        self.write(command);
                    }
                }
                self.disconnect();
                self.rescan_after_disconnect = self.config.rescan_after_measurement;
                self.observer.on_measurements(&values);
            }
            DecodeOutcome::Fail(error) => self.fail(error),
        }
    }

    // === Internals ===

    fn begin_scan(&mut self) {
        info!("Scanning for {:?}", self.decoder.device_name());
        self.adapter.set_scan_filter(self.decoder.service_uuids());
        self.adapter.start_scan();
        self.state = SessionState::Scanning;
        self.arm(self.config.scan_timeout);
    }

    fn write(&self, data: Bytes) {
        if let (Some(peripheral), Some(characteristic)) = (&self.peripheral, &self.characteristic)
        {
            debug!("Writing {} bytes to {}", data.len(), characteristic.uuid);
            self.adapter.write_value(peripheral, characteristic, data);
        }
    }

    /// Report a device fault and tear the link down.
    fn fail(&mut self, error: PeripheralError) {
        warn!("Session failed: {}", error);
        self.disconnect();
        self.observer.on_device_error(error);
    }

    fn finish_disconnect(&mut self) {
        self.reset_link();
        self.state = SessionState::Idle;

        if std::mem::take(&mut self.rescan_after_disconnect) {
            self.scan_requested = true;
            if self.bluetooth_status.is_powered_on() {
                self.begin_scan();
            }
        }

        self.observer.on_disconnected();
    }

    fn reset_link(&mut self) {
        self.peripheral = None;
        self.characteristic = None;
        self.pending_services.clear();
        self.disconnect_requested = false;
        self.deadline = None;
        self.decoder.reset();
    }

    fn arm(&mut self, timeout: Option<Duration>) {
        self.deadline = timeout.map(|t| Instant::now() + t);
    }

    fn is_active(&self, peripheral: &PeripheralHandle, state: SessionState) -> bool {
        self.state == state && self.peripheral.as_ref() == Some(peripheral)
    }

    fn is_subscribed_characteristic(&self, uuid: Uuid) -> bool {
        self.characteristic.as_ref().is_some_and(|c| c.uuid == uuid)
    }
}

impl<A: BleAdapter> Drop for Session<A> {
    fn drop(&mut self) {
        self.end();
    }
}

impl<A: BleAdapter> fmt::Debug for Session<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("bluetooth_status", &self.bluetooth_status)
            .field("peripheral", &self.peripheral)
            .field("decoder", &self.decoder)
            .field("scan_requested", &self.scan_requested)
            .finish()
    }
}
