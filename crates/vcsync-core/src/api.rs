//! RemoteVehicleApi trait - the boundary to the vendor cloud service
//!
//! The engine never talks HTTP itself; it drives this trait. Production
//! code wires in a real client, tests wire in
//! [`crate::testing::MockVehicleApi`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::models::{CommandKind, CommandParams, VehicleSnapshot};

/// Status reported by the service's job-status endpoint.
///
/// `Running` covers every non-terminal wording the service uses
/// ("Started", "Running", "Pending") and must never be treated as a
/// failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobPoll {
    /// Command accepted, not yet terminal
    Running,
    /// Terminal success
    Success,
    /// Terminal failure with the service's reason, verbatim
    Failure { reason: String },
}

impl JobPoll {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobPoll::Running)
    }
}

/// Interface to the remote vehicle cloud service.
///
/// Implementations own session handling and transport; every method is
/// a single round trip with no internal retry. The engine decides what
/// to retry and when.
#[async_trait]
pub trait RemoteVehicleApi: Send + Sync {
    /// List the VINs registered on this account
    async fn list_vehicles(&self) -> ApiResult<Vec<String>>;

    /// Fetch a full state snapshot for one vehicle
    async fn fetch_snapshot(&self, vin: &str) -> ApiResult<VehicleSnapshot>;

    /// Ask the vehicle to wake and push fresh telemetry upstream.
    ///
    /// Fire-and-forget: a success acknowledges the request only. The
    /// fresher data arrives via a later `fetch_snapshot`.
    async fn request_health_update(&self, vin: &str, pin: &str) -> ApiResult<()>;

    /// Submit a control command, returning the service-assigned job id
    async fn submit_command(
        &self,
        vin: &str,
        kind: CommandKind,
        params: &CommandParams,
    ) -> ApiResult<String>;

    /// Query the status of a previously submitted job
    async fn poll_status(&self, job_id: &str) -> ApiResult<JobPoll>;
}
