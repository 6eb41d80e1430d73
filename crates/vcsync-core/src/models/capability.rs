//! Derived vehicle capabilities
//!
//! Capabilities are inferred from the latest snapshot on every refresh,
//! never cached across snapshots: a feature that disappears from
//! telemetry is currently unsupported, not sticky. The inference itself
//! lives in the engine's resolver; these are the result types.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::command::CommandKind;

/// Powertrain classification inferred from telemetry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Powertrain {
    /// Combustion only
    Ice,
    /// Battery electric
    Ev,
    /// Plug-in hybrid (both battery and fuel telemetry present)
    Phev,
    /// Neither battery nor fuel indicators present
    #[default]
    Unknown,
}

impl Powertrain {
    /// Whether the vehicle carries a traction battery
    pub fn has_battery(&self) -> bool {
        matches!(self, Powertrain::Ev | Powertrain::Phev)
    }

    /// Whether the vehicle carries a combustion engine
    pub fn has_engine(&self) -> bool {
        matches!(self, Powertrain::Ice | Powertrain::Phev)
    }
}

impl std::fmt::Display for Powertrain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Powertrain::Ice => "ice",
            Powertrain::Ev => "ev",
            Powertrain::Phev => "phev",
            Powertrain::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Feature set derived from one snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub powertrain: Powertrain,
    pub has_guardian_mode: bool,
    pub has_preconditioning: bool,
    pub has_service_mode: bool,
    pub has_transport_mode: bool,
    pub has_journey_recording: bool,
    /// Commands whose prerequisite capability is present
    pub supported_commands: HashSet<CommandKind>,
}

impl CapabilitySet {
    /// Whether a command kind can currently be executed on this vehicle
    pub fn supports(&self, kind: CommandKind) -> bool {
        self.supported_commands.contains(&kind)
    }
}

/// Boolean statuses tracked per refresh for downstream consumers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedStatuses {
    /// Remote climate running (remote engine start on ICE, precondition
    /// operating status on EV/PHEV)
    pub climate_active: bool,
    pub guardian_mode_active: bool,
    pub is_charging: bool,
    /// Journey recording disabled by the privacy switch
    pub privacy_enabled: bool,
    /// Service mode window currently open
    pub service_mode_active: bool,
    /// Transport mode window currently open
    pub transport_mode_active: bool,
}
