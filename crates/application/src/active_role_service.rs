//! Active-role resolution, selection and login reconciliation.
//!
//! A user's effective active role lives in two tiers: an ephemeral
//! session override under the `active_role_id` key and a durable pointer
//! on the user record. The session tier is validated against the user's
//! assigned roles on every resolution and cleared lazily when it goes
//! stale; the durable tier is validated only by the login-time
//! reconciliation pass. Resolution never fails just because no active
//! role is set.

use std::sync::Arc;

use async_trait::async_trait;
use netdock_core::{AppError, AppResult};
use netdock_domain::{Role, RoleId, RoleRef, UserId};

use crate::{UserRecord, UserRepository};

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Repository port for the role catalog and membership lookups.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Finds a role by case-insensitive slug or name.
    async fn find_by_identifier(&self, identifier: &str) -> AppResult<Option<Role>>;

    /// Finds a role by its unique identifier.
    async fn find_by_id(&self, role_id: RoleId) -> AppResult<Option<Role>>;

    /// Returns the role only when it is assigned to the user.
    async fn find_assigned(&self, user_id: UserId, role_id: RoleId) -> AppResult<Option<Role>>;

    /// Lists all roles assigned to the user.
    async fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<Role>>;

    /// Lists the whole role catalog.
    async fn list_all(&self) -> AppResult<Vec<Role>>;
}

/// Port for the per-session active-role override.
///
/// Implementations own exactly one session; `clear_active_role_id` must be
/// idempotent, and concurrent clears from the same session are resolved
/// last-write-wins.
#[async_trait]
pub trait ActiveRoleSession: Send + Sync {
    /// Reads the session override, if one is set.
    async fn active_role_id(&self) -> AppResult<Option<RoleId>>;

    /// Replaces the session override.
    async fn set_active_role_id(&self, role_id: RoleId) -> AppResult<()>;

    /// Removes the session override.
    async fn clear_active_role_id(&self) -> AppResult<()>;
}

// ---------------------------------------------------------------------------
// Role context
// ---------------------------------------------------------------------------

/// Resolved role state for the signed-in user, for role-aware UI.
#[derive(Debug, Clone)]
pub struct RoleContext {
    /// The effective active role, if any.
    pub active_role: Option<Role>,
    /// All roles assigned to the user.
    pub roles: Vec<Role>,
}

impl RoleContext {
    /// Returns whether any assigned role matches the identifier.
    #[must_use]
    pub fn holds(&self, identifier: &str) -> bool {
        self.roles.iter().any(|role| role.is_called(identifier))
    }

    /// Returns whether the effective active role matches the identifier.
    #[must_use]
    pub fn active_is(&self, identifier: &str) -> bool {
        self.active_role
            .as_ref()
            .is_some_and(|role| role.is_called(identifier))
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Application service for the dual-tier active-role mechanism.
#[derive(Clone)]
pub struct ActiveRoleService {
    roles: Arc<dyn RoleRepository>,
    users: Arc<dyn UserRepository>,
}

impl ActiveRoleService {
    /// Creates the service from repository implementations.
    #[must_use]
    pub fn new(roles: Arc<dyn RoleRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { roles, users }
    }

    /// Resolves the effective active role for one request.
    ///
    /// Session override first: when it references a role still assigned
    /// to the user it wins; when it has gone stale it is cleared here and
    /// resolution falls through. The durable pointer is returned as-is
    /// after a plain catalog lookup; its membership is reconciled at
    /// login, not on every request.
    pub async fn resolve(
        &self,
        user: &UserRecord,
        session: &dyn ActiveRoleSession,
    ) -> AppResult<Option<Role>> {
        if let Some(role_id) = session.active_role_id().await? {
            if let Some(role) = self.roles.find_assigned(user.id, role_id).await? {
                return Ok(Some(role));
            }

            // Role was unassigned after being selected: drop the override.
            session.clear_active_role_id().await?;
        }

        if let Some(role_id) = user.active_role_id {
            return self.roles.find_by_id(role_id).await;
        }

        Ok(None)
    }

    /// Switches the user's active role.
    ///
    /// The reference is normalized to a catalog role first; the user must
    /// hold the role. `persist` picks the tier: the durable pointer (one
    /// atomic field update, session untouched) or the session override
    /// (durable pointer untouched). Reselecting the same role is a no-op
    /// in effect.
    pub async fn select_role(
        &self,
        user: &UserRecord,
        role_ref: RoleRef,
        persist: bool,
        session: &dyn ActiveRoleSession,
    ) -> AppResult<Role> {
        let role = match role_ref {
            RoleRef::Role(role) => role,
            RoleRef::Identifier(identifier) => self
                .roles
                .find_by_identifier(identifier.as_str())
                .await?
                .ok_or_else(|| AppError::NotFound(format!("role '{identifier}' was not found")))?,
        };

        if self
            .roles
            .find_assigned(user.id, role.id())
            .await?
            .is_none()
        {
            return Err(AppError::Forbidden(format!(
                "you do not have access to the role '{}'",
                role.name()
            )));
        }

        if persist {
            self.users.set_active_role(user.id, Some(role.id())).await?;
        } else {
            session.set_active_role_id(role.id()).await?;
        }

        Ok(role)
    }

    /// Post-login integrity pass over both active-role tiers.
    ///
    /// Runs once per successful authentication. Clears the durable
    /// pointer and the session override independently when either
    /// references a role no longer assigned to the user. Best effort:
    /// storage failures surface, nothing is retried.
    pub async fn reconcile_on_login(
        &self,
        user: &UserRecord,
        session: &dyn ActiveRoleSession,
    ) -> AppResult<()> {
        if let Some(role_id) = user.active_role_id
            && self.roles.find_assigned(user.id, role_id).await?.is_none()
        {
            self.users.set_active_role(user.id, None).await?;
        }

        if let Some(role_id) = session.active_role_id().await?
            && self.roles.find_assigned(user.id, role_id).await?.is_none()
        {
            session.clear_active_role_id().await?;
        }

        Ok(())
    }

    /// Builds the role context for role-aware UI.
    pub async fn role_context(
        &self,
        user: &UserRecord,
        session: &dyn ActiveRoleSession,
    ) -> AppResult<RoleContext> {
        let active_role = self.resolve(user, session).await?;
        let roles = self.roles.list_for_user(user.id).await?;

        Ok(RoleContext { active_role, roles })
    }
}
