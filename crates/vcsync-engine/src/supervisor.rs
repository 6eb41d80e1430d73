//! Command supervisor - submits commands and polls jobs to completion
//!
//! One `execute` call owns one poll loop for one service-assigned job
//! id. The loop treats "running" strictly as non-terminal (misreading
//! it as failure is the historical bug class this module exists to
//! prevent), enforces the configured overall timeout, and on timeout
//! keeps the job tracked so a late success can still be reconciled on a
//! later refresh.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};
use vcsync_core::{
    mask_vin, CommandJob, CommandKind, CommandOutcome, CommandParams, JobPoll, JobState,
    RemoteVehicleApi,
};

use crate::config::SyncConfig;
use crate::scheduler::refresh_vehicle;
use crate::store::StateStore;

/// Supervises asynchronous remote command executions
pub struct CommandSupervisor {
    api: Arc<dyn RemoteVehicleApi>,
    store: Arc<StateStore>,
    command_timeout: Duration,
    poll_interval: Duration,
    /// Jobs currently tracked, by service-assigned id
    jobs: RwLock<HashMap<String, CommandJob>>,
}

impl CommandSupervisor {
    pub fn new(api: Arc<dyn RemoteVehicleApi>, store: Arc<StateStore>, config: &SyncConfig) -> Self {
        Self {
            api,
            store,
            command_timeout: config.command_timeout(),
            poll_interval: config.poll_interval(),
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Execute a command against a vehicle and await its terminal outcome.
    ///
    /// Validation happens before any remote call: an unsupported kind or
    /// missing PIN is rejected locally. Concurrent executes for the same
    /// vehicle run independent poll loops; the store serializes writes.
    pub async fn execute(
        &self,
        vin: &str,
        kind: CommandKind,
        params: &CommandParams,
    ) -> CommandOutcome {
        let Some(state) = self.store.get(vin) else {
            return CommandOutcome::Rejected {
                reason: format!("unknown vehicle {}", mask_vin(vin)),
            };
        };

        if !state.capabilities.supports(kind) {
            info!(vin = %mask_vin(vin), %kind, "Command rejected: unsupported on this vehicle");
            return CommandOutcome::Rejected {
                reason: format!("unsupported command {kind}"),
            };
        }

        if kind.requires_pin() && params.pin.is_none() {
            return CommandOutcome::Rejected {
                reason: format!("command {kind} requires a pin"),
            };
        }

        let job_id = match self.api.submit_command(vin, kind, params).await {
            Ok(job_id) => job_id,
            Err(err) => {
                error!(vin = %mask_vin(vin), %kind, %err, "Command submission failed");
                return CommandOutcome::Failed {
                    reason: err.to_string(),
                };
            }
        };

        // At most one poll loop per job id. A duplicate means the service
        // handed out an id we are already polling; refuse to race it.
        {
            let mut jobs = self.jobs.write();
            if jobs.contains_key(&job_id) {
                warn!(%job_id, "Service returned an already-tracked job id");
                return CommandOutcome::Failed {
                    reason: format!("job {job_id} already in flight"),
                };
            }
            jobs.insert(job_id.clone(), CommandJob::pending(&job_id, vin, kind));
        }

        info!(vin = %mask_vin(vin), %kind, %job_id, "Command submitted, polling for result");

        let outcome = match timeout(self.command_timeout, self.poll_until_terminal(&job_id)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                // Never leave a cancelled loop's job silently Pending
                self.mark_job(&job_id, JobState::TimedOut, None);
                warn!(
                    vin = %mask_vin(vin),
                    %kind,
                    %job_id,
                    timeout_secs = self.command_timeout.as_secs(),
                    "Command timed out; job kept for late reconciliation"
                );
                return CommandOutcome::TimedOut;
            }
        };

        match &outcome {
            CommandOutcome::Succeeded => {
                self.jobs.write().remove(&job_id);
                info!(vin = %mask_vin(vin), %kind, %job_id, "Command succeeded");
                // Pull the resulting state change now instead of waiting
                // for the next scheduled tick
                refresh_vehicle(self.api.as_ref(), &self.store, vin).await;
            }
            CommandOutcome::Failed { reason } => {
                self.jobs.write().remove(&job_id);
                error!(vin = %mask_vin(vin), %kind, %job_id, %reason, "Command failed");
            }
            // Rejected/TimedOut are produced before this point
            _ => {}
        }

        outcome
    }

    /// Poll one job until the service reports a terminal status. The
    /// overall deadline is enforced by the caller; transport errors here
    /// just wait for the next attempt.
    async fn poll_until_terminal(&self, job_id: &str) -> CommandOutcome {
        loop {
            match self.api.poll_status(job_id).await {
                Ok(JobPoll::Running) => {
                    self.touch_job(job_id);
                    debug!(%job_id, "Job still running");
                }
                Ok(JobPoll::Success) => {
                    self.touch_job(job_id);
                    return CommandOutcome::Succeeded;
                }
                Ok(JobPoll::Failure { reason }) => {
                    self.mark_job(job_id, JobState::Failed, Some(reason.clone()));
                    return CommandOutcome::Failed { reason };
                }
                Err(err) => {
                    warn!(%job_id, %err, "Job status poll failed, will retry");
                }
            }

            sleep(self.poll_interval).await;
        }
    }

    /// Look up a tracked job by id
    pub fn job(&self, job_id: &str) -> Option<CommandJob> {
        self.jobs.read().get(job_id).cloned()
    }

    /// All tracked jobs for one vehicle
    pub fn jobs_for(&self, vin: &str) -> Vec<CommandJob> {
        self.jobs
            .read()
            .values()
            .filter(|job| job.vin == vin)
            .cloned()
            .collect()
    }

    /// Re-check timed-out jobs for a vehicle against the service.
    ///
    /// Called from every scheduler tick. A late success triggers the
    /// same out-of-band refresh a live success would have; a late
    /// failure just drops the job. Still-running jobs stay tracked, as
    /// do jobs whose poll failed transiently; a job the service no
    /// longer knows is dropped.
    pub async fn reconcile(&self, vin: &str) {
        let timed_out: Vec<String> = self
            .jobs
            .read()
            .values()
            .filter(|job| job.vin == vin && job.state == JobState::TimedOut)
            .map(|job| job.job_id.clone())
            .collect();

        let mut refresh_needed = false;
        for job_id in timed_out {
            match self.api.poll_status(&job_id).await {
                Ok(JobPoll::Success) => {
                    self.jobs.write().remove(&job_id);
                    info!(vin = %mask_vin(vin), %job_id, "Timed-out job completed late");
                    refresh_needed = true;
                }
                Ok(JobPoll::Failure { reason }) => {
                    self.jobs.write().remove(&job_id);
                    warn!(vin = %mask_vin(vin), %job_id, %reason, "Timed-out job failed late");
                }
                Ok(JobPoll::Running) => {
                    self.touch_job(&job_id);
                }
                Err(err) if err.is_transient() => {
                    debug!(%job_id, %err, "Reconciliation poll failed, keeping job");
                }
                // The service no longer knows the job; nothing left to
                // reconcile, so stop tracking it
                Err(err) => {
                    self.jobs.write().remove(&job_id);
                    warn!(vin = %mask_vin(vin), %job_id, %err, "Dropping unreconcilable job");
                }
            }
        }

        if refresh_needed {
            refresh_vehicle(self.api.as_ref(), &self.store, vin).await;
        }
    }

    fn touch_job(&self, job_id: &str) {
        if let Some(job) = self.jobs.write().get_mut(job_id) {
            job.last_polled_at = Some(Utc::now());
        }
    }

    fn mark_job(&self, job_id: &str, state: JobState, failure_reason: Option<String>) {
        if let Some(job) = self.jobs.write().get_mut(job_id) {
            job.state = state;
            job.last_polled_at = Some(Utc::now());
            if failure_reason.is_some() {
                job.failure_reason = failure_reason;
            }
        }
    }
}
