//! vcsync-engine - Vehicle state synchronization and command orchestration
//!
//! Builds the engine on top of `vcsync-core`:
//! - a capability resolver deriving the feature set from each snapshot
//! - a state store holding the latest snapshot per vehicle
//! - a refresh scheduler with independent status and health-update timers
//! - a command supervisor polling submitted jobs to a terminal outcome
//! - a service facade tying the pieces together for callers

pub mod config;
pub mod error;
pub mod resolver;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod supervisor;

pub use config::SyncConfig;
pub use error::{EngineError, EngineResult};
pub use scheduler::RefreshScheduler;
pub use service::VehicleSyncService;
pub use store::{StateEvent, StateStore, VehicleState};
pub use supervisor::CommandSupervisor;
