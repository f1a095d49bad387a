//! Session-backed adapter for the active-role override port.

use async_trait::async_trait;
use netdock_application::ActiveRoleSession;
use netdock_core::{AppError, AppResult};
use netdock_domain::RoleId;
use tower_sessions::Session;

/// Session key holding the authenticated identity.
pub const SESSION_USER_KEY: &str = "user_identity";

/// Session key holding the ephemeral active-role override.
pub const SESSION_ACTIVE_ROLE_KEY: &str = "active_role_id";

/// Active-role override stored in the caller's `tower-sessions` session.
#[derive(Clone)]
pub struct HttpActiveRoleSession {
    session: Session,
}

impl HttpActiveRoleSession {
    /// Wraps the request's session.
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

#[async_trait]
impl ActiveRoleSession for HttpActiveRoleSession {
    async fn active_role_id(&self) -> AppResult<Option<RoleId>> {
        self.session
            .get::<RoleId>(SESSION_ACTIVE_ROLE_KEY)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to read session active role: {error}"))
            })
    }

    async fn set_active_role_id(&self, role_id: RoleId) -> AppResult<()> {
        self.session
            .insert(SESSION_ACTIVE_ROLE_KEY, role_id)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to persist session active role: {error}"))
            })
    }

    async fn clear_active_role_id(&self) -> AppResult<()> {
        self.session
            .remove_value(SESSION_ACTIVE_ROLE_KEY)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to clear session active role: {error}"))
            })?;

        Ok(())
    }
}
