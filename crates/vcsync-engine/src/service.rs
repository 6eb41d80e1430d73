//! Caller-facing service facade
//!
//! Ties the store, scheduler and supervisor together behind the surface
//! the entity layer consumes: state queries, command invocation, change
//! notifications, and lifecycle control.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;
use vcsync_core::{
    mask_vin, CommandJob, CommandKind, CommandOutcome, CommandParams, RemoteVehicleApi,
};

use crate::config::SyncConfig;
use crate::error::EngineResult;
use crate::scheduler::{refresh_vehicle, RefreshScheduler};
use crate::store::{StateEvent, StateStore, VehicleState};
use crate::supervisor::CommandSupervisor;

/// Synchronizes one account's vehicles and executes commands against them
pub struct VehicleSyncService {
    api: Arc<dyn RemoteVehicleApi>,
    config: SyncConfig,
    store: Arc<StateStore>,
    supervisor: Arc<CommandSupervisor>,
    scheduler: RefreshScheduler,
}

impl VehicleSyncService {
    /// Build the service. Fails if the configuration is invalid; makes
    /// no remote calls until [`start`](Self::start).
    pub fn new(api: Arc<dyn RemoteVehicleApi>, config: SyncConfig) -> EngineResult<Self> {
        config.validate()?;

        let store = Arc::new(StateStore::new());
        let supervisor = Arc::new(CommandSupervisor::new(api.clone(), store.clone(), &config));
        let scheduler = RefreshScheduler::new(
            api.clone(),
            store.clone(),
            supervisor.clone(),
            config.clone(),
        );

        Ok(Self {
            api,
            config,
            store,
            supervisor,
            scheduler,
        })
    }

    /// Discover the account's vehicles, seed the store with an initial
    /// snapshot per vehicle (individual failures tolerated), and start
    /// the timers.
    pub async fn start(&self) -> EngineResult<()> {
        let vins = self.api.list_vehicles().await?;
        info!(vehicles = vins.len(), "Account vehicles discovered");

        for vin in &vins {
            self.store.register(vin);
            refresh_vehicle(self.api.as_ref(), &self.store, vin).await;
        }

        self.scheduler.start();
        Ok(())
    }

    /// Current state for one vehicle: snapshot, capabilities, tracked
    /// statuses and staleness. Never blocks behind a network call.
    pub fn vehicle_state(&self, vin: &str) -> Option<VehicleState> {
        self.store.get(vin)
    }

    /// All known VINs, sorted
    pub fn vins(&self) -> Vec<String> {
        self.store.vins()
    }

    /// Execute a command and await its terminal outcome (bounded by the
    /// configured command timeout). The account PIN from configuration
    /// is applied when the caller did not supply one.
    pub async fn invoke_command(
        &self,
        vin: &str,
        kind: CommandKind,
        params: &CommandParams,
    ) -> CommandOutcome {
        let params = if params.pin.is_none() && self.config.pin.is_some() {
            CommandParams {
                pin: self.config.pin.clone(),
                ..params.clone()
            }
        } else {
            params.clone()
        };

        self.supervisor.execute(vin, kind, &params).await
    }

    /// Trigger an immediate out-of-band refresh for one vehicle
    pub async fn refresh_now(&self, vin: &str) {
        info!(vin = %mask_vin(vin), "Out-of-band refresh requested");
        refresh_vehicle(self.api.as_ref(), &self.store, vin).await;
    }

    /// Subscribe to state change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.store.subscribe()
    }

    /// Look up a tracked command job (pending or timed out)
    pub fn job(&self, job_id: &str) -> Option<CommandJob> {
        self.supervisor.job(job_id)
    }

    /// All tracked jobs for one vehicle
    pub fn jobs_for(&self, vin: &str) -> Vec<CommandJob> {
        self.supervisor.jobs_for(vin)
    }

    /// Stop both scheduler timers. In-flight command executions run to
    /// their own timeout.
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
        info!("Vehicle sync service stopped");
    }
}
