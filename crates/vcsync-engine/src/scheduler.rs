//! Refresh scheduler - periodic status refresh and health-update wake
//!
//! Two independent timers per account. The status timer pulls a fresh
//! snapshot for every vehicle and pushes it through the store; the
//! optional health-update timer asks each vehicle to wake and push
//! fresher telemetry upstream, leaving the store untouched until the
//! next status tick observes the result. Neither timer ever stops on
//! error; only an explicit shutdown ends them.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vcsync_core::{mask_vin, ApiError, RemoteVehicleApi};

use crate::config::SyncConfig;
use crate::store::StateStore;
use crate::supervisor::CommandSupervisor;

/// Fetch one vehicle's snapshot and store it. A failure keeps the
/// previous snapshot and bumps the failure counter; transient errors
/// are retried by the next tick, never synchronously here.
pub(crate) async fn refresh_vehicle(api: &dyn RemoteVehicleApi, store: &StateStore, vin: &str) {
    match api.fetch_snapshot(vin).await {
        Ok(snapshot) => store.put(snapshot),
        Err(err) => {
            let failures = store.record_failure(vin);
            match err {
                ApiError::Auth(_) => warn!(
                    vin = %mask_vin(vin),
                    %err,
                    "Refresh rejected; session renewal is owned by the connection layer"
                ),
                _ => warn!(
                    vin = %mask_vin(vin),
                    %err,
                    consecutive_failures = failures,
                    "Refresh failed, keeping previous snapshot"
                ),
            }
        }
    }
}

/// Timer-driven refresh loop for one account
pub struct RefreshScheduler {
    api: Arc<dyn RemoteVehicleApi>,
    store: Arc<StateStore>,
    supervisor: Arc<CommandSupervisor>,
    config: SyncConfig,
    status_handle: Mutex<Option<JoinHandle<()>>>,
    health_handle: Mutex<Option<JoinHandle<()>>>,
}

impl RefreshScheduler {
    pub fn new(
        api: Arc<dyn RemoteVehicleApi>,
        store: Arc<StateStore>,
        supervisor: Arc<CommandSupervisor>,
        config: SyncConfig,
    ) -> Self {
        Self {
            api,
            store,
            supervisor,
            config,
            status_handle: Mutex::new(None),
            health_handle: Mutex::new(None),
        }
    }

    /// Start both timers. The first refresh happens one full interval
    /// after start; callers seed the store with initial snapshots.
    pub fn start(&self) {
        self.shutdown();
        self.start_status_timer();
        self.start_health_timer();
    }

    /// Stop both timers. Idempotent.
    pub fn shutdown(&self) {
        if let Some(handle) = self.status_handle.lock().take() {
            handle.abort();
            debug!("Status refresh timer stopped");
        }
        if let Some(handle) = self.health_handle.lock().take() {
            handle.abort();
            debug!("Health update timer stopped");
        }
    }

    fn start_status_timer(&self) {
        let api = self.api.clone();
        let store = self.store.clone();
        let supervisor = self.supervisor.clone();
        let period = self.config.scan_interval();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The interval's first tick is immediate; the store was
            // seeded at startup, so skip it.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                for vin in store.vins() {
                    refresh_vehicle(api.as_ref(), &store, &vin).await;
                    supervisor.reconcile(&vin).await;
                }
            }
        });

        *self.status_handle.lock() = Some(handle);
        info!(period_secs = period.as_secs(), "Status refresh timer started");
    }

    fn start_health_timer(&self) {
        let Some(period) = self.config.health_update_interval() else {
            debug!("Health update timer disabled (interval or pin not configured)");
            return;
        };
        // health_update_interval() is None unless a pin is configured
        let Some(pin) = self.config.pin.clone() else {
            return;
        };

        let api = self.api.clone();
        let store = self.store.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                for vin in store.vins() {
                    // Fire-and-forget wake; the next status tick picks
                    // up whatever fresher telemetry the vehicle pushed
                    match api.request_health_update(&vin, &pin).await {
                        Ok(()) => debug!(vin = %mask_vin(&vin), "Health update requested"),
                        Err(err) => {
                            debug!(vin = %mask_vin(&vin), %err, "Health update request failed")
                        }
                    }
                }
            }
        });

        *self.health_handle.lock() = Some(handle);
        info!(
            period_secs = period.as_secs(),
            "Health update timer started"
        );
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.status_handle.get_mut().take() {
            handle.abort();
        }
        if let Some(handle) = self.health_handle.get_mut().take() {
            handle.abort();
        }
    }
}
