use std::sync::Arc;

use netdock_application::{ActiveRoleService, RoleGate, RoleRepository, UserService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub active_role_service: ActiveRoleService,
    pub role_gate: RoleGate,
    pub role_repository: Arc<dyn RoleRepository>,
    pub frontend_url: String,
}
