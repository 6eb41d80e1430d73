//! Remote command kinds, parameters, and tracked jobs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Remote commands the engine can submit to the cloud service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Honk,
    Lock,
    Unlock,
    StartEngine,
    StopEngine,
    StartCharge,
    StopCharge,
    ResetAlarm,
    StartPrecondition,
    StopPrecondition,
    SetMaxCharge,
    UpdateHealth,
}

impl CommandKind {
    /// All command kinds, for capability derivation
    pub fn all() -> [CommandKind; 12] {
        [
            CommandKind::Honk,
            CommandKind::Lock,
            CommandKind::Unlock,
            CommandKind::StartEngine,
            CommandKind::StopEngine,
            CommandKind::StartCharge,
            CommandKind::StopCharge,
            CommandKind::ResetAlarm,
            CommandKind::StartPrecondition,
            CommandKind::StopPrecondition,
            CommandKind::SetMaxCharge,
            CommandKind::UpdateHealth,
        ]
    }

    /// Vendor service code this command maps to on the wire
    pub fn service_code(&self) -> &'static str {
        match self {
            CommandKind::Honk => "HBLF",
            CommandKind::Lock => "RDL",
            CommandKind::Unlock => "RDU",
            CommandKind::StartEngine => "REON",
            CommandKind::StopEngine => "REOFF",
            CommandKind::StartCharge | CommandKind::StopCharge | CommandKind::SetMaxCharge => "CP",
            CommandKind::ResetAlarm => "ALOFF",
            CommandKind::StartPrecondition | CommandKind::StopPrecondition => "ECC",
            CommandKind::UpdateHealth => "VHS",
        }
    }

    /// Whether the vendor requires the account PIN for this command
    pub fn requires_pin(&self) -> bool {
        matches!(
            self,
            CommandKind::Lock
                | CommandKind::Unlock
                | CommandKind::StartEngine
                | CommandKind::StopEngine
                | CommandKind::ResetAlarm
        )
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CommandKind::Honk => "honk",
            CommandKind::Lock => "lock",
            CommandKind::Unlock => "unlock",
            CommandKind::StartEngine => "start_engine",
            CommandKind::StopEngine => "stop_engine",
            CommandKind::StartCharge => "start_charge",
            CommandKind::StopCharge => "stop_charge",
            CommandKind::ResetAlarm => "reset_alarm",
            CommandKind::StartPrecondition => "start_precondition",
            CommandKind::StopPrecondition => "stop_precondition",
            CommandKind::SetMaxCharge => "set_max_charge",
            CommandKind::UpdateHealth => "update_health",
        };
        f.write_str(s)
    }
}

/// Optional parameters carried with a command submission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandParams {
    /// Account PIN, required by some command kinds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
    /// Target cabin temperature in degrees Celsius (engine start,
    /// preconditioning)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_temp_celsius: Option<f64>,
    /// Maximum state of charge in percent (set_max_charge)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_charge_percent: Option<u8>,
}

impl CommandParams {
    pub fn with_pin(pin: impl Into<String>) -> Self {
        Self {
            pin: Some(pin.into()),
            ..Self::default()
        }
    }
}

/// Lifecycle state of a tracked command job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Submitted, poll loop running
    Pending,
    /// Terminal success reported by the service
    Succeeded,
    /// Terminal failure reported by the service
    Failed,
    /// Local poll deadline elapsed; still reconcilable against a late
    /// terminal status
    TimedOut,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Pending)
    }
}

/// A tracked asynchronous command execution.
///
/// Created at submission, mutated only by the poll loop that owns it,
/// and dropped from tracking once terminal and reported - except for
/// `TimedOut` jobs, which stay tracked so a late success can still be
/// reconciled on a later refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandJob {
    /// Service-assigned job identifier
    pub job_id: String,
    pub vin: String,
    pub kind: CommandKind,
    pub submitted_at: DateTime<Utc>,
    pub state: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_polled_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl CommandJob {
    /// Create a new pending job for a fresh submission
    pub fn pending(job_id: impl Into<String>, vin: impl Into<String>, kind: CommandKind) -> Self {
        Self {
            job_id: job_id.into(),
            vin: vin.into(),
            kind,
            submitted_at: Utc::now(),
            state: JobState::Pending,
            last_polled_at: None,
            failure_reason: None,
        }
    }
}

/// Terminal result of one `invoke_command` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    /// The service reported terminal success
    Succeeded,
    /// The service reported terminal failure, or submission failed
    Failed { reason: String },
    /// Rejected locally before any remote call was made
    Rejected { reason: String },
    /// No terminal status within the configured timeout; the job stays
    /// tracked for late reconciliation
    TimedOut,
}

impl CommandOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CommandOutcome::Succeeded)
    }
}
