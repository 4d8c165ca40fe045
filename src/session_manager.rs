//! Async runner for a [`Session`].
//!
//! The manager owns the session behind a mutex and a background task that
//! feeds it adapter events in order and expires its deadlines. Outcomes are
//! published on a broadcast channel.

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::ble::adapter::{AdapterEvent, BleAdapter, BluetoothStatus};
use crate::ble::btleplug_adapter::BtleplugAdapter;
use crate::data::MeasurementBatch;
use crate::error::{Error, Result};
use crate::protocol::decoder::DeviceDecoder;
use crate::registry::{DecoderRegistry, DeviceType};
use crate::session::{BroadcastObserver, Session, SessionConfig, SessionOutcome, SessionState};

/// How often session deadlines are checked.
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Capacity of the outcome channel.
const OUTCOME_CAPACITY: usize = 64;

/// Handle for a registered callback.
///
/// The callback stays registered until the handle is dropped or
/// [`CallbackHandle::unregister`] is called.
pub struct CallbackHandle {
    id: u64,
    unregister_fn: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl CallbackHandle {
    pub(crate) fn new(id: u64, unregister_fn: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            id,
            unregister_fn: Some(Box::new(unregister_fn)),
        }
    }

    /// Unregister this callback.
    pub fn unregister(mut self) {
        if let Some(f) = self.unregister_fn.take() {
            f();
        }
    }

    /// Get the callback ID.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for CallbackHandle {
    fn drop(&mut self) {
        if let Some(f) = self.unregister_fn.take() {
            f();
        }
    }
}

impl std::fmt::Debug for CallbackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackHandle").field("id", &self.id).finish()
    }
}

/// Runs one session on the tokio runtime.
pub struct SessionManager<A: BleAdapter + 'static> {
    /// The session. Never locked across an await.
    session: Arc<Mutex<Session<A>>>,
    /// Outcome channel.
    outcome_tx: broadcast::Sender<SessionOutcome>,
    /// Callback ID counter.
    callback_counter: AtomicU64,
    /// Background task handle.
    background_handle: RwLock<Option<tokio::task::JoinHandle<()>>>,
    /// Running flag.
    is_running: Arc<AtomicBool>,
}

impl SessionManager<BtleplugAdapter> {
    /// Open the host's Bluetooth adapter and build a session for a device type.
    ///
    /// # Errors
    ///
    /// Returns an error if the device type has no decoder or no Bluetooth
    /// adapter is available.
    pub async fn with_btleplug(
        registry: &DecoderRegistry,
        device_type: DeviceType,
        config: SessionConfig,
    ) -> Result<Self> {
        let decoder = registry.create(device_type)?;
        let (adapter, events) = BtleplugAdapter::new().await?;
        Ok(Self::new(adapter, events, decoder, config))
    }
}

impl<A: BleAdapter + 'static> SessionManager<A> {
    /// Create a manager and start processing adapter events.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        adapter: A,
        events: mpsc::UnboundedReceiver<AdapterEvent>,
        decoder: Box<dyn DeviceDecoder>,
        config: SessionConfig,
    ) -> Self {
        let (outcome_tx, _) = broadcast::channel(OUTCOME_CAPACITY);
        let observer = BroadcastObserver::new(outcome_tx.clone());
        let session = Arc::new(Mutex::new(Session::new(
            adapter,
            decoder,
            Box::new(observer),
            config,
        )));
        let is_running = Arc::new(AtomicBool::new(true));

        let handle = tokio::spawn(Self::run(session.clone(), events, is_running.clone()));

        Self {
            session,
            outcome_tx,
            callback_counter: AtomicU64::new(0),
            background_handle: RwLock::new(Some(handle)),
            is_running,
        }
    }

    async fn run(
        session: Arc<Mutex<Session<A>>>,
        mut events: mpsc::UnboundedReceiver<AdapterEvent>,
        is_running: Arc<AtomicBool>,
    ) {
        let mut ticker = tokio::time::interval(POLL_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        while is_running.load(Ordering::SeqCst) {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        debug!("Adapter event: {:?}", event);
                        session.lock().handle_event(event);
                    }
                    None => {
                        warn!("Adapter event channel closed");
                        break;
                    }
                },
                _ = ticker.tick() => {
                    session.lock().poll_timeouts(Instant::now());
                }
            }
        }

        is_running.store(false, Ordering::SeqCst);
        debug!("Session manager background task ended");
    }

    // === Session control ===

    /// Start scanning for the decoder's peripheral.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AdapterUnavailable`] if the radio is not powered on.
    /// Scanning still starts once it is.
    pub fn start_scanning(&self) -> Result<()> {
        self.session.lock().start_scanning()
    }

    /// Stop scanning.
    pub fn stop_scanning(&self) {
        self.session.lock().stop_scanning();
    }

    /// Disconnect from the active peripheral.
    pub fn disconnect(&self) {
        self.session.lock().disconnect();
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.session.lock().state()
    }

    /// Last radio status seen.
    pub fn bluetooth_status(&self) -> BluetoothStatus {
        self.session.lock().bluetooth_status()
    }

    /// Check if the background task is still processing events.
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    // === Outcomes ===

    /// Subscribe to session outcomes.
    pub fn subscribe_outcomes(&self) -> broadcast::Receiver<SessionOutcome> {
        self.outcome_tx.subscribe()
    }

    /// Wait for the next measurement batch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if the outcome channel closes.
    pub async fn next_measurements(&self) -> Result<MeasurementBatch> {
        let mut rx = self.subscribe_outcomes();
        loop {
            match rx.recv().await {
                Ok(SessionOutcome::Measurements(batch)) => return Ok(batch),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Skipped {} session outcomes", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(Error::Internal("outcome channel closed".to_string()));
                }
            }
        }
    }

    /// Register a callback for measurement batches.
    pub fn on_measurements<F>(&self, callback: F) -> CallbackHandle
    where
        F: Fn(&MeasurementBatch) + Send + Sync + 'static,
    {
        self.listen(move |outcome| {
            if let SessionOutcome::Measurements(batch) = outcome {
                callback(batch);
            }
        })
    }

    /// Register a callback for radio status changes.
    pub fn on_status_changed<F>(&self, callback: F) -> CallbackHandle
    where
        F: Fn(BluetoothStatus) + Send + Sync + 'static,
    {
        self.listen(move |outcome| {
            if let SessionOutcome::BluetoothStatusChanged(status) = outcome {
                callback(*status);
            }
        })
    }

    fn listen<F>(&self, callback: F) -> CallbackHandle
    where
        F: Fn(&SessionOutcome) + Send + Sync + 'static,
    {
        let callback_id = self.callback_counter.fetch_add(1, Ordering::SeqCst);
        let mut rx = self.outcome_tx.subscribe();

        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(outcome) => callback(&outcome),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Callback {} skipped {} outcomes", callback_id, skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        CallbackHandle::new(callback_id, move || {
            handle.abort();
        })
    }

    // === Lifecycle ===

    /// End the session and stop the background task.
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down session manager");

        self.session.lock().end();
        self.is_running.store(false, Ordering::SeqCst);

        let handle = self.background_handle.write().take();
        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
        }

        Ok(())
    }
}

impl<A: BleAdapter + 'static> Drop for SessionManager<A> {
    fn drop(&mut self) {
        self.is_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.background_handle.write().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::adapter::{MockBleAdapter, PeripheralHandle};
    use crate::data::{GeneralError, PeripheralError};
    use crate::protocol::fora_scale::ForaScaleDecoder;
    use std::sync::atomic::AtomicUsize;
    use tokio::time::timeout;

    fn permissive_adapter(status: BluetoothStatus) -> MockBleAdapter {
        let mut adapter = MockBleAdapter::new();
        adapter.expect_status().return_const(status);
        adapter.expect_set_scan_filter().return_const(());
        adapter.expect_start_scan().return_const(());
        adapter.expect_stop_scan().return_const(());
        adapter.expect_connect().return_const(());
        adapter.expect_disconnect().return_const(());
        adapter.expect_discover_services().return_const(());
        adapter
    }

    fn new_manager(
        status: BluetoothStatus,
    ) -> (
        SessionManager<MockBleAdapter>,
        mpsc::UnboundedSender<AdapterEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let manager = SessionManager::new(
            permissive_adapter(status),
            rx,
            Box::new(ForaScaleDecoder::new()),
            SessionConfig::default(),
        );
        (manager, tx)
    }

    #[test]
    fn test_callback_handle_unregisters_on_drop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let handle = CallbackHandle::new(7, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(handle.id(), 7);
        drop(handle);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let counter = calls.clone();
        let handle = CallbackHandle::new(8, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        handle.unregister();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_events_are_applied_in_order() {
        let (manager, tx) = new_manager(BluetoothStatus::PoweredOn);
        let mut outcomes = manager.subscribe_outcomes();

        manager.start_scanning().unwrap();
        assert_eq!(manager.state(), SessionState::Scanning);

        let scale = PeripheralHandle::new("scale-1", "");
        tx.send(AdapterEvent::PeripheralDiscovered {
            peripheral: scale.clone(),
            name: Some("TNG SCALE".to_string()),
        })
        .unwrap();
        tx.send(AdapterEvent::Connected(scale.clone())).unwrap();

        let outcome = timeout(Duration::from_secs(1), outcomes.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome, SessionOutcome::Connected);
        assert_eq!(manager.state(), SessionState::DiscoveringServices);

        manager.shutdown().await.unwrap();
        assert!(!manager.is_running());
    }

    #[tokio::test]
    async fn test_connect_failure_is_broadcast() {
        let (manager, tx) = new_manager(BluetoothStatus::PoweredOn);
        let mut outcomes = manager.subscribe_outcomes();
        manager.start_scanning().unwrap();

        let scale = PeripheralHandle::new("scale-1", "");
        tx.send(AdapterEvent::PeripheralDiscovered {
            peripheral: scale.clone(),
            name: Some("TNG SCALE".to_string()),
        })
        .unwrap();
        tx.send(AdapterEvent::ConnectFailed(scale)).unwrap();

        let outcome = timeout(Duration::from_secs(1), outcomes.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            outcome,
            SessionOutcome::ConnectionFailed(PeripheralError::Peripheral(
                GeneralError::CouldNotConnect
            ))
        );
        assert_eq!(manager.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_status_callback() {
        let (manager, tx) = new_manager(BluetoothStatus::PoweredOn);
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();

        let _handle = manager.on_status_changed(move |status| {
            let _ = seen_tx.send(status);
        });

        tx.send(AdapterEvent::AdapterStatusChanged(BluetoothStatus::PoweredOff))
            .unwrap();

        let status = timeout(Duration::from_secs(1), seen_rx.recv())
            .await
            .unwrap();
        assert_eq!(status, Some(BluetoothStatus::PoweredOff));
        assert_eq!(manager.bluetooth_status(), BluetoothStatus::PoweredOff);
    }

    #[tokio::test]
    async fn test_start_scanning_declined_without_power() {
        let (manager, _tx) = new_manager(BluetoothStatus::PoweredOff);
        assert!(matches!(
            manager.start_scanning(),
            Err(Error::AdapterUnavailable { .. })
        ));
        assert_eq!(manager.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_closed_event_channel_stops_task() {
        let (manager, tx) = new_manager(BluetoothStatus::PoweredOn);
        drop(tx);

        let handle = manager.background_handle.write().take().unwrap();
        timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(!manager.is_running());
    }
}
