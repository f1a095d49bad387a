//! Application services and ports.

#![forbid(unsafe_code)]

mod active_role_service;
mod role_gate;
mod user_service;

pub use active_role_service::{
    ActiveRoleService, ActiveRoleSession, RoleContext, RoleRepository,
};
pub use role_gate::{GateDecision, GateMode, RoleGate};
pub use user_service::{AuthOutcome, PasswordHasher, UserRecord, UserRepository, UserService};

#[cfg(test)]
pub(crate) mod testing;
