//! Domain models for the maquinas service.
//!
//! Records as stored, their explicit wire mapping, and field validation.

pub mod dto;
pub mod machine;
pub mod maintenance;
pub mod validation;

pub use dto::{AccessTokenResponse, ApiResponse, RefreshRequest, TokenPairResponse, TokenRequest};
pub use machine::{Machine, MachinePatch, MachineView, NewMachine};
pub use maintenance::{Maintenance, MaintenancePatch, NewMaintenance};
pub use validation::{FieldErrors, FieldReader, Presence};
