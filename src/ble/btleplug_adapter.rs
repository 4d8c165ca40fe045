//! [`BleAdapter`] backed by btleplug.
//!
//! btleplug is async while the session is a synchronous state machine. Each
//! request spawns a task on the runtime the adapter was created on, and the
//! result comes back as an [`AdapterEvent`] on the channel returned by
//! [`BtleplugAdapter::new`].

use btleplug::api::{
    Central, CentralEvent, CentralState, Characteristic, Manager as _, Peripheral as _,
    ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use bytes::Bytes;
use futures::stream::StreamExt;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::ble::adapter::{
    AdapterEvent, BleAdapter, BluetoothStatus, CharacteristicDescriptor, PeripheralHandle,
    ServiceDescriptor,
};
use crate::error::{Error, Result};

type EventSender = mpsc::UnboundedSender<AdapterEvent>;

/// Map btleplug's radio state onto [`BluetoothStatus`].
pub fn bluetooth_status(state: CentralState) -> BluetoothStatus {
    match state {
        CentralState::PoweredOn => BluetoothStatus::PoweredOn,
        CentralState::PoweredOff => BluetoothStatus::PoweredOff,
        _ => BluetoothStatus::Pending,
    }
}

fn handle_for(peripheral: &Peripheral) -> PeripheralHandle {
    PeripheralHandle::new(peripheral.id().to_string(), peripheral.address().to_string())
}

/// Production adapter bridging btleplug to the session.
pub struct BtleplugAdapter {
    /// The btleplug central.
    adapter: Adapter,
    /// Runtime that request tasks are spawned on.
    runtime: Handle,
    /// Last radio status reported by the central.
    status: Arc<RwLock<BluetoothStatus>>,
    /// Services to restrict scans to.
    scan_filter: Arc<RwLock<Vec<Uuid>>>,
    /// Peripherals seen so far, by identifier.
    peripherals: Arc<RwLock<HashMap<String, Peripheral>>>,
    /// Notification pumps, by peripheral identifier and characteristic.
    pumps: Arc<RwLock<HashMap<(String, Uuid), JoinHandle<()>>>>,
    /// Channel for adapter events.
    event_tx: EventSender,
    /// Central event translation task.
    central_task: JoinHandle<()>,
}

impl BtleplugAdapter {
    /// Open the first Bluetooth adapter on this host.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if no adapter is present or its event stream cannot be
    /// opened.
    pub async fn new() -> Result<(Self, mpsc::UnboundedReceiver<AdapterEvent>)> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(Error::AdapterUnavailable {
                status: BluetoothStatus::Unavailable,
            })?;

        info!(
            "Using Bluetooth adapter: {:?}",
            adapter.adapter_info().await.ok()
        );

        Self::with_adapter(adapter).await
    }

    /// Wrap a specific btleplug adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if the adapter's event stream cannot be opened.
    pub async fn with_adapter(
        adapter: Adapter,
    ) -> Result<(Self, mpsc::UnboundedReceiver<AdapterEvent>)> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let initial = match adapter.adapter_state().await {
            Ok(state) => bluetooth_status(state),
            Err(e) => {
                debug!("Adapter state unknown: {}", e);
                BluetoothStatus::Pending
            }
        };
        let status = Arc::new(RwLock::new(initial));
        let peripherals = Arc::new(RwLock::new(HashMap::new()));
        let pumps = Arc::new(RwLock::new(HashMap::new()));

        let mut events = adapter.events().await?;
        let central_task = {
            let adapter = adapter.clone();
            let status = status.clone();
            let peripherals = peripherals.clone();
            let pumps = pumps.clone();
            let event_tx = event_tx.clone();

            tokio::spawn(async move {
                while let Some(event) = events.next().await {
                    Self::handle_central_event(
                        event,
                        &adapter,
                        &status,
                        &peripherals,
                        &pumps,
                        &event_tx,
                    )
                    .await;
                }
                debug!("Central event stream ended");
            })
        };

        Ok((
            Self {
                adapter,
                runtime: Handle::current(),
                status,
                scan_filter: Arc::new(RwLock::new(Vec::new())),
                peripherals,
                pumps,
                event_tx,
                central_task,
            },
            event_rx,
        ))
    }

    /// Get the underlying btleplug adapter.
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    /// Translate a btleplug central event.
    async fn handle_central_event(
        event: CentralEvent,
        adapter: &Adapter,
        status: &RwLock<BluetoothStatus>,
        peripherals: &RwLock<HashMap<String, Peripheral>>,
        pumps: &RwLock<HashMap<(String, Uuid), JoinHandle<()>>>,
        event_tx: &EventSender,
    ) {
        match event {
            CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => {
                Self::process_peripheral(adapter, id, peripherals, event_tx).await;
            }
            CentralEvent::DeviceConnected(id) => {
                debug!("Device connected: {:?}", id);
            }
            CentralEvent::DeviceDisconnected(id) => {
                let identifier = id.to_string();
                debug!("Device disconnected: {}", identifier);

                Self::stop_pumps(pumps, &identifier);
                let handle = peripherals
                    .read()
                    .get(&identifier)
                    .map(handle_for)
                    .unwrap_or_else(|| PeripheralHandle::new(identifier, ""));
                let _ = event_tx.send(AdapterEvent::Disconnected(handle));
            }
            CentralEvent::StateUpdate(state) => {
                let new_status = bluetooth_status(state);
                *status.write() = new_status;
                let _ = event_tx.send(AdapterEvent::AdapterStatusChanged(new_status));
            }
            _ => {}
        }
    }

    /// Record a peripheral and report it with its advertised name.
    async fn process_peripheral(
        adapter: &Adapter,
        id: PeripheralId,
        peripherals: &RwLock<HashMap<String, Peripheral>>,
        event_tx: &EventSender,
    ) {
        let peripheral = match adapter.peripheral(&id).await {
            Ok(p) => p,
            Err(e) => {
                trace!("Failed to get peripheral: {}", e);
                return;
            }
        };

        let name = match peripheral.properties().await {
            Ok(Some(properties)) => properties.local_name,
            _ => None,
        };

        let handle = handle_for(&peripheral);
        peripherals.write().insert(id.to_string(), peripheral);

        let _ = event_tx.send(AdapterEvent::PeripheralDiscovered {
            peripheral: handle,
            name,
        });
    }

    fn stop_pumps(pumps: &RwLock<HashMap<(String, Uuid), JoinHandle<()>>>, identifier: &str) {
        pumps.write().retain(|(id, _), pump| {
            if id == identifier {
                pump.abort();
                false
            } else {
                true
            }
        });
    }

    fn lookup(&self, handle: &PeripheralHandle) -> Result<Peripheral> {
        self.peripherals
            .read()
            .get(handle.id())
            .cloned()
            .ok_or_else(|| Error::PeripheralNotFound {
                identifier: handle.id().to_string(),
            })
    }

    fn find_characteristic(
        peripheral: &Peripheral,
        descriptor: &CharacteristicDescriptor,
    ) -> Result<Characteristic> {
        peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == descriptor.uuid && c.service_uuid == descriptor.service_uuid)
            .ok_or_else(|| Error::CharacteristicNotFound {
                uuid: descriptor.uuid.to_string(),
            })
    }

    fn resolve(
        &self,
        handle: &PeripheralHandle,
        descriptor: &CharacteristicDescriptor,
    ) -> Result<(Peripheral, Characteristic)> {
        let peripheral = self.lookup(handle)?;
        let characteristic = Self::find_characteristic(&peripheral, descriptor)?;
        Ok((peripheral, characteristic))
    }

    fn send(&self, event: AdapterEvent) {
        let _ = self.event_tx.send(event);
    }

    fn subscribe(
        &self,
        handle: &PeripheralHandle,
        peripheral: Peripheral,
        characteristic: Characteristic,
    ) {
        let handle = handle.clone();
        let key = (handle.id().to_string(), characteristic.uuid);
        let event_tx = self.event_tx.clone();

        let pump = self.runtime.spawn(async move {
            let mut notifications = match peripheral.notifications().await {
                Ok(n) => n,
                Err(e) => {
                    warn!("Could not get notifications stream: {}", e);
                    let _ = event_tx.send(AdapterEvent::NotifyStateChanged {
                        peripheral: handle,
                        characteristic_uuid: characteristic.uuid,
                        enabled: false,
                    });
                    return;
                }
            };

            let enabled = match peripheral.subscribe(&characteristic).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("Failed to subscribe to {}: {}", characteristic.uuid, e);
                    false
                }
            };
            let _ = event_tx.send(AdapterEvent::NotifyStateChanged {
                peripheral: handle.clone(),
                characteristic_uuid: characteristic.uuid,
                enabled,
            });
            if !enabled {
                return;
            }

            while let Some(notification) = notifications.next().await {
                if notification.uuid != characteristic.uuid {
                    continue;
                }
                trace!(
                    "Notification from {}: {} bytes",
                    notification.uuid,
                    notification.value.len()
                );
                let _ = event_tx.send(AdapterEvent::ValueUpdated {
                    peripheral: handle.clone(),
                    characteristic_uuid: notification.uuid,
                    value: notification.value,
                });
            }
            debug!("Notification stream for {} ended", characteristic.uuid);
        });

        if let Some(previous) = self.pumps.write().insert(key, pump) {
            previous.abort();
        }
    }

    fn unsubscribe(
        &self,
        handle: &PeripheralHandle,
        peripheral: Peripheral,
        characteristic: Characteristic,
    ) {
        if let Some(pump) = self
            .pumps
            .write()
            .remove(&(handle.id().to_string(), characteristic.uuid))
        {
            pump.abort();
        }

        let handle = handle.clone();
        let event_tx = self.event_tx.clone();
        self.runtime.spawn(async move {
            if let Err(e) = peripheral.unsubscribe(&characteristic).await {
                debug!("Failed to unsubscribe from {}: {}", characteristic.uuid, e);
            }
            let _ = event_tx.send(AdapterEvent::NotifyStateChanged {
                peripheral: handle,
                characteristic_uuid: characteristic.uuid,
                enabled: false,
            });
        });
    }
}

impl BleAdapter for BtleplugAdapter {
    fn status(&self) -> BluetoothStatus {
        *self.status.read()
    }

    fn set_scan_filter(&self, services: &[Uuid]) {
        *self.scan_filter.write() = services.to_vec();
    }

    fn start_scan(&self) {
        let adapter = self.adapter.clone();
        let filter = ScanFilter {
            services: self.scan_filter.read().clone(),
        };

        self.runtime.spawn(async move {
            info!("Starting BLE scan for services {:?}", filter.services);
            if let Err(e) = adapter.start_scan(filter).await {
                error!("Failed to start scan: {}", e);
            }
        });
    }

    fn stop_scan(&self) {
        let adapter = self.adapter.clone();
        self.runtime.spawn(async move {
            if let Err(e) = adapter.stop_scan().await {
                warn!("Failed to stop scan: {}", e);
            }
        });
    }

    fn connect(&self, handle: &PeripheralHandle) {
        let peripheral = match self.lookup(handle) {
            Ok(p) => p,
            Err(e) => {
                warn!("Cannot connect: {}", e);
                self.send(AdapterEvent::ConnectFailed(handle.clone()));
                return;
            }
        };

        let handle = handle.clone();
        let event_tx = self.event_tx.clone();
        self.runtime.spawn(async move {
            let event = match peripheral.connect().await {
                Ok(()) => AdapterEvent::Connected(handle),
                Err(e) => {
                    let error = Error::ConnectionFailed {
                        reason: e.to_string(),
                    };
                    warn!("{} ({})", error, handle);
                    AdapterEvent::ConnectFailed(handle)
                }
            };
            let _ = event_tx.send(event);
        });
    }

    fn disconnect(&self, handle: &PeripheralHandle) {
        Self::stop_pumps(&self.pumps, handle.id());

        let peripheral = match self.lookup(handle) {
            Ok(p) => p,
            Err(e) => {
                debug!("Nothing to disconnect: {}", e);
                return;
            }
        };

        let handle = handle.clone();
        let event_tx = self.event_tx.clone();
        self.runtime.spawn(async move {
            match peripheral.disconnect().await {
                // Some platforms never raise DeviceDisconnected for a link
                // closed locally. Duplicates are dropped by the session.
                Ok(()) => {
                    let _ = event_tx.send(AdapterEvent::Disconnected(handle));
                }
                Err(e) => warn!("Failed to disconnect from {}: {}", handle, e),
            }
        });
    }

    fn discover_services(&self, handle: &PeripheralHandle) {
        let peripheral = match self.lookup(handle) {
            Ok(p) => p,
            Err(e) => {
                warn!("Cannot discover services: {}", e);
                return;
            }
        };

        let handle = handle.clone();
        let event_tx = self.event_tx.clone();
        self.runtime.spawn(async move {
            if let Err(e) = peripheral.discover_services().await {
                warn!("Service discovery failed on {}: {}", handle, e);
            }

            let services = peripheral
                .services()
                .into_iter()
                .map(|s| ServiceDescriptor {
                    uuid: s.uuid,
                    primary: s.primary,
                })
                .collect();
            let _ = event_tx.send(AdapterEvent::ServicesDiscovered {
                peripheral: handle,
                services,
            });
        });
    }

    fn discover_characteristics(&self, handle: &PeripheralHandle, service_uuid: Uuid) {
        let peripheral = match self.lookup(handle) {
            Ok(p) => p,
            Err(e) => {
                warn!("Cannot discover characteristics: {}", e);
                return;
            }
        };

        // btleplug resolves characteristics during service discovery.
        let characteristics = peripheral
            .services()
            .into_iter()
            .find(|s| s.uuid == service_uuid)
            .map(|s| {
                s.characteristics
                    .into_iter()
                    .map(|c| CharacteristicDescriptor::new(c.uuid, c.service_uuid))
                    .collect()
            })
            .unwrap_or_default();

        self.send(AdapterEvent::CharacteristicsDiscovered {
            peripheral: handle.clone(),
            service_uuid,
            characteristics,
        });
    }

    fn set_notify_enabled(
        &self,
        handle: &PeripheralHandle,
        descriptor: &CharacteristicDescriptor,
        enabled: bool,
    ) {
        let (peripheral, characteristic) = match self.resolve(handle, descriptor) {
            Ok(found) => found,
            Err(e) => {
                warn!("Cannot change notifications on {}: {}", handle, e);
                self.send(AdapterEvent::NotifyStateChanged {
                    peripheral: handle.clone(),
                    characteristic_uuid: descriptor.uuid,
                    enabled: false,
                });
                return;
            }
        };

        if enabled {
            self.subscribe(handle, peripheral, characteristic);
        } else {
            self.unsubscribe(handle, peripheral, characteristic);
        }
    }

    fn write_value(
        &self,
        handle: &PeripheralHandle,
        descriptor: &CharacteristicDescriptor,
        data: Bytes,
    ) {
        let (peripheral, characteristic) = match self.resolve(handle, descriptor) {
            Ok(found) => found,
            Err(e) => {
                warn!("Cannot write to {}: {}", handle, e);
                return;
            }
        };

        self.runtime.spawn(async move {
            match peripheral
                .write(&characteristic, &data, WriteType::WithResponse)
                .await
            {
                Ok(()) => trace!("Wrote {} bytes to {}", data.len(), characteristic.uuid),
                Err(e) => warn!("Write to {} failed: {}", characteristic.uuid, e),
            }
        });
    }
}

impl Drop for BtleplugAdapter {
    fn drop(&mut self) {
        self.central_task.abort();
        for (_, pump) in self.pumps.write().drain() {
            pump.abort();
        }
    }
}
