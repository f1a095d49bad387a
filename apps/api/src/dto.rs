use netdock_core::UserIdentity;
use netdock_domain::Role;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Health response payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/health-response.ts"
)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Generic confirmation payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/generic-message-response.ts"
)]
pub struct GenericMessageResponse {
    pub message: String,
}

/// Incoming payload for email+password login.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/login-request.ts"
)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login outcome payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/login-response.ts"
)]
pub struct LoginResponse {
    pub status: &'static str,
}

/// Incoming payload for a password change.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/change-password-request.ts"
)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// API representation of a role.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/role-response.ts"
)]
pub struct RoleResponse {
    pub name: String,
    pub slug: String,
    pub capabilities: Vec<String>,
}

impl From<Role> for RoleResponse {
    fn from(role: Role) -> Self {
        Self {
            name: role.name().to_owned(),
            slug: role.slug().to_string(),
            capabilities: role
                .capabilities()
                .iter()
                .map(|capability| capability.as_str().to_owned())
                .collect(),
        }
    }
}

/// API representation of the authenticated user and their role state.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/me-response.ts"
)]
pub struct MeResponse {
    pub subject: String,
    pub display_name: String,
    pub email: Option<String>,
    pub is_superuser: bool,
    pub active_role: Option<RoleResponse>,
    pub roles: Vec<RoleResponse>,
}

impl MeResponse {
    /// Combines session identity with the freshly resolved role context.
    #[must_use]
    pub fn new(
        identity: &UserIdentity,
        is_superuser: bool,
        active_role: Option<Role>,
        roles: Vec<Role>,
    ) -> Self {
        Self {
            subject: identity.subject().to_owned(),
            display_name: identity.display_name().to_owned(),
            email: identity.email().map(ToOwned::to_owned),
            is_superuser,
            active_role: active_role.map(RoleResponse::from),
            roles: roles.into_iter().map(RoleResponse::from).collect(),
        }
    }
}

/// Incoming payload for role selection.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/select-role-request.ts"
)]
pub struct SelectRoleRequest {
    /// When true the selection is written to the durable user record;
    /// otherwise it lives in the session only.
    #[serde(default)]
    pub persist: bool,
}

/// Role selection outcome payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/select-role-response.ts"
)]
pub struct SelectRoleResponse {
    pub role: RoleResponse,
    pub message: String,
    pub redirect_to: String,
}
