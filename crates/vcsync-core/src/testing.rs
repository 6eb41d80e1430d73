//! Mock remote API for tests
//!
//! Scripted, in-memory implementation of [`RemoteVehicleApi`]. Tests
//! seed vehicles and job scripts, then assert against the recorded
//! calls. No network, no timing of its own.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::api::{JobPoll, RemoteVehicleApi};
use crate::error::{ApiError, ApiResult};
use crate::models::{CommandKind, CommandParams, VehicleSnapshot};

/// One recorded call against the mock, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    ListVehicles,
    FetchSnapshot { vin: String },
    HealthUpdate { vin: String },
    SubmitCommand { vin: String, kind: CommandKind },
    PollStatus { job_id: String },
}

struct ScriptedJob {
    /// Job id handed out at submission; generated if the script didn't fix one
    job_id: String,
    /// Poll statuses in order; the last entry repeats forever
    polls: VecDeque<JobPoll>,
}

#[derive(Default)]
struct MockState {
    snapshots: HashMap<String, VehicleSnapshot>,
    /// Remaining forced fetch failures per VIN
    fetch_failures: HashMap<String, u32>,
    /// Remaining forced status-poll failures
    poll_failures: u32,
    /// Scripts consumed in order by submit_command
    pending_submits: VecDeque<ScriptedJob>,
    /// Active jobs by id
    jobs: HashMap<String, VecDeque<JobPoll>>,
    calls: Vec<RecordedCall>,
}

/// Scripted mock of the vendor cloud service
#[derive(Default)]
pub struct MockVehicleApi {
    state: RwLock<MockState>,
    reject_submits: AtomicBool,
}

impl MockVehicleApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or replace a vehicle snapshot
    pub fn set_snapshot(&self, snapshot: VehicleSnapshot) {
        let mut state = self.state.write();
        state.snapshots.insert(snapshot.vin.clone(), snapshot);
    }

    /// Make the next `count` fetches for `vin` fail with a transport error
    pub fn fail_next_fetches(&self, vin: &str, count: u32) {
        self.state.write().fetch_failures.insert(vin.to_string(), count);
    }

    /// Script the next submission: the given poll statuses are replayed
    /// in order, with the final one repeating. Returns the job id the
    /// submission will hand out.
    pub fn script_job(&self, polls: Vec<JobPoll>) -> String {
        assert!(!polls.is_empty(), "job script needs at least one poll status");
        let job_id = Uuid::new_v4().to_string();
        self.state.write().pending_submits.push_back(ScriptedJob {
            job_id: job_id.clone(),
            polls: polls.into(),
        });
        job_id
    }

    /// Make every submission fail with an auth error
    pub fn reject_submits(&self, reject: bool) {
        self.reject_submits.store(reject, Ordering::SeqCst);
    }

    /// Make the next `count` status polls fail with a transport error
    pub fn fail_next_polls(&self, count: u32) {
        self.state.write().poll_failures = count;
    }

    /// Drop a job as if the service had expired it; subsequent polls
    /// answer with a protocol error
    pub fn forget_job(&self, job_id: &str) {
        self.state.write().jobs.remove(job_id);
    }

    /// All calls recorded so far, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.read().calls.clone()
    }

    /// Number of submit_command calls recorded
    pub fn submit_count(&self) -> usize {
        self.state
            .read()
            .calls
            .iter()
            .filter(|c| matches!(c, RecordedCall::SubmitCommand { .. }))
            .count()
    }

    /// Number of fetch_snapshot calls recorded for one VIN
    pub fn fetch_count(&self, vin: &str) -> usize {
        self.state
            .read()
            .calls
            .iter()
            .filter(|c| matches!(c, RecordedCall::FetchSnapshot { vin: v } if v == vin))
            .count()
    }

    /// Number of health-update calls recorded
    pub fn health_update_count(&self) -> usize {
        self.state
            .read()
            .calls
            .iter()
            .filter(|c| matches!(c, RecordedCall::HealthUpdate { .. }))
            .count()
    }

    fn record(&self, call: RecordedCall) {
        self.state.write().calls.push(call);
    }
}

#[async_trait]
impl RemoteVehicleApi for MockVehicleApi {
    async fn list_vehicles(&self) -> ApiResult<Vec<String>> {
        self.record(RecordedCall::ListVehicles);
        let mut vins: Vec<String> = self.state.read().snapshots.keys().cloned().collect();
        vins.sort();
        Ok(vins)
    }

    async fn fetch_snapshot(&self, vin: &str) -> ApiResult<VehicleSnapshot> {
        self.record(RecordedCall::FetchSnapshot { vin: vin.to_string() });

        let mut state = self.state.write();
        if let Some(remaining) = state.fetch_failures.get_mut(vin) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ApiError::Transport("connection reset".to_string()));
            }
        }

        state
            .snapshots
            .get(vin)
            .cloned()
            .ok_or_else(|| ApiError::VehicleNotFound(vin.to_string()))
    }

    async fn request_health_update(&self, vin: &str, _pin: &str) -> ApiResult<()> {
        self.record(RecordedCall::HealthUpdate { vin: vin.to_string() });
        if self.state.read().snapshots.contains_key(vin) {
            Ok(())
        } else {
            Err(ApiError::VehicleNotFound(vin.to_string()))
        }
    }

    async fn submit_command(
        &self,
        vin: &str,
        kind: CommandKind,
        _params: &CommandParams,
    ) -> ApiResult<String> {
        self.record(RecordedCall::SubmitCommand {
            vin: vin.to_string(),
            kind,
        });

        if self.reject_submits.load(Ordering::SeqCst) {
            return Err(ApiError::Auth("token expired".to_string()));
        }

        let mut state = self.state.write();
        let scripted = state.pending_submits.pop_front().unwrap_or_else(|| ScriptedJob {
            job_id: Uuid::new_v4().to_string(),
            polls: VecDeque::from([JobPoll::Success]),
        });
        state.jobs.insert(scripted.job_id.clone(), scripted.polls);
        Ok(scripted.job_id)
    }

    async fn poll_status(&self, job_id: &str) -> ApiResult<JobPoll> {
        self.record(RecordedCall::PollStatus {
            job_id: job_id.to_string(),
        });

        let mut state = self.state.write();
        if state.poll_failures > 0 {
            state.poll_failures -= 1;
            return Err(ApiError::Transport("connection reset".to_string()));
        }

        let polls = state
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| ApiError::Protocol(format!("unknown job id: {job_id}")))?;

        // Replay the script, holding the final status forever
        if polls.len() > 1 {
            Ok(polls.pop_front().unwrap_or(JobPoll::Success))
        } else {
            Ok(polls.front().cloned().unwrap_or(JobPoll::Success))
        }
    }
}
