//! Data model for vehicle state and remote commands

pub mod capability;
pub mod command;
pub mod snapshot;

pub use capability::{CapabilitySet, Powertrain, TrackedStatuses};
pub use command::{CommandJob, CommandKind, CommandOutcome, CommandParams, JobState};
pub use snapshot::{mask_vin, Position, VehicleSnapshot};
