//! Service layer module.
//!
//! Validation and resource semantics on top of storage, plus authentication.

pub mod machine;
pub mod maintenance;
pub mod token;

pub use machine::MachineService;
pub use maintenance::MaintenanceService;
pub use token::{Principal, TokenInfo, TokenKind, TokenService};
