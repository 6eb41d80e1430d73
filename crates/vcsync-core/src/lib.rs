//! vcsync-core - Core types for the vehicle cloud sync engine
//!
//! This crate provides the data model (snapshots, capabilities, command
//! jobs), the error taxonomy, and the `RemoteVehicleApi` trait that
//! abstracts the vendor cloud service. The engine crate builds the
//! scheduler, state store, and command supervisor on top of these.

pub mod api;
pub mod error;
pub mod models;
pub mod testing;

pub use api::{JobPoll, RemoteVehicleApi};
pub use error::{ApiError, ApiResult};
pub use models::*;
