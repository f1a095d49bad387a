//! The allow/deny decision point for role-protected operations.

use std::sync::Arc;

use netdock_core::{AppError, AppResult};
use netdock_domain::RoleMatcher;

use crate::{ActiveRoleService, ActiveRoleSession, RoleRepository, UserRecord};

/// How a requirement is matched against the user's role state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateMode {
    /// Any assigned role may satisfy the requirement.
    AnyAssigned,
    /// Only the effective active role may satisfy the requirement.
    ActiveOnly,
}

/// Outcome of a gate evaluation.
///
/// An unauthenticated caller is distinguishable from an authenticated one
/// that lacks the required role: the former should be sent through the
/// login flow and return to the original destination, the latter is a
/// terminal denial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// The caller may proceed.
    Allowed,
    /// No authenticated identity was presented.
    AuthenticationRequired,
    /// The identity holds none of the acceptable roles.
    Denied {
        /// The matchers that would have satisfied the check.
        required: Vec<RoleMatcher>,
    },
}

/// Authorization primitive consuming a resolved identity and role state.
#[derive(Clone)]
pub struct RoleGate {
    roles: Arc<dyn RoleRepository>,
    active_roles: ActiveRoleService,
}

impl RoleGate {
    /// Creates a gate from the role catalog and the active-role service.
    #[must_use]
    pub fn new(roles: Arc<dyn RoleRepository>, active_roles: ActiveRoleService) -> Self {
        Self {
            roles,
            active_roles,
        }
    }

    /// Evaluates a requirement against the caller's role state.
    ///
    /// Guard order is part of the contract: unauthenticated callers are
    /// turned away first, superusers pass unconditionally (even an
    /// `ActiveOnly` check with no resolvable active role), and an empty
    /// requirement means no restriction was declared.
    pub async fn evaluate(
        &self,
        user: Option<&UserRecord>,
        required: &[RoleMatcher],
        mode: GateMode,
        session: &dyn ActiveRoleSession,
    ) -> AppResult<GateDecision> {
        let Some(user) = user else {
            return Ok(GateDecision::AuthenticationRequired);
        };

        if user.is_superuser {
            return Ok(GateDecision::Allowed);
        }

        if required.is_empty() {
            return Ok(GateDecision::Allowed);
        }

        let allowed = match mode {
            GateMode::AnyAssigned => {
                let assigned = self.roles.list_for_user(user.id).await?;
                assigned
                    .iter()
                    .any(|role| required.iter().any(|matcher| matcher.matches(role)))
            }
            GateMode::ActiveOnly => {
                let active = self.active_roles.resolve(user, session).await?;
                active.is_some_and(|role| required.iter().any(|matcher| matcher.matches(&role)))
            }
        };

        if allowed {
            Ok(GateDecision::Allowed)
        } else {
            Ok(GateDecision::Denied {
                required: required.to_vec(),
            })
        }
    }

    /// Returns whether the caller currently satisfies the requirement.
    pub async fn permits(
        &self,
        user: Option<&UserRecord>,
        required: &[RoleMatcher],
        mode: GateMode,
        session: &dyn ActiveRoleSession,
    ) -> AppResult<bool> {
        Ok(matches!(
            self.evaluate(user, required, mode, session).await?,
            GateDecision::Allowed
        ))
    }

    /// Evaluates the requirement and maps denials onto application errors.
    pub async fn require(
        &self,
        user: Option<&UserRecord>,
        required: &[RoleMatcher],
        mode: GateMode,
        session: &dyn ActiveRoleSession,
    ) -> AppResult<()> {
        match self.evaluate(user, required, mode, session).await? {
            GateDecision::Allowed => Ok(()),
            GateDecision::AuthenticationRequired => {
                Err(AppError::Unauthorized("authentication required".to_owned()))
            }
            GateDecision::Denied { required } => Err(AppError::Forbidden(format!(
                "you need one of these roles: {}",
                required
                    .iter()
                    .map(RoleMatcher::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use netdock_domain::RoleMatcher;

    use crate::testing::Fixture;

    use super::{GateDecision, GateMode};

    fn matchers(identifiers: &[&str]) -> Vec<RoleMatcher> {
        identifiers.iter().map(|id| RoleMatcher::new(*id)).collect()
    }

    #[tokio::test]
    async fn unauthenticated_caller_is_sent_to_login() {
        let fixture = Fixture::new();

        let decision = fixture
            .gate()
            .evaluate(
                None,
                &matchers(&["teacher"]),
                GateMode::AnyAssigned,
                fixture.session(),
            )
            .await;
        assert!(decision.is_ok_and(|d| d == GateDecision::AuthenticationRequired));
    }

    #[tokio::test]
    async fn superuser_passes_any_assigned_check() {
        let fixture = Fixture::new();
        let root = fixture.superuser().await;

        let decision = fixture
            .gate()
            .evaluate(
                Some(&root),
                &matchers(&["teacher", "administrator"]),
                GateMode::AnyAssigned,
                fixture.session(),
            )
            .await;
        assert!(decision.is_ok_and(|d| d == GateDecision::Allowed));
    }

    #[tokio::test]
    async fn superuser_passes_active_only_check_without_active_role() {
        let fixture = Fixture::new();
        let root = fixture.superuser().await;

        let decision = fixture
            .gate()
            .evaluate(
                Some(&root),
                &matchers(&["administrator"]),
                GateMode::ActiveOnly,
                fixture.session(),
            )
            .await;
        assert!(decision.is_ok_and(|d| d == GateDecision::Allowed));
    }

    #[tokio::test]
    async fn empty_requirement_allows_any_authenticated_user() {
        let fixture = Fixture::new();
        let user = fixture.user_with_roles(&[]).await;

        let decision = fixture
            .gate()
            .evaluate(Some(&user), &[], GateMode::AnyAssigned, fixture.session())
            .await;
        assert!(decision.is_ok_and(|d| d == GateDecision::Allowed));
    }

    #[tokio::test]
    async fn any_assigned_matches_role_names_case_insensitively() {
        let fixture = Fixture::new();
        let user = fixture.user_with_roles(&["teacher"]).await;

        let decision = fixture
            .gate()
            .evaluate(
                Some(&user),
                &matchers(&["Teacher"]),
                GateMode::AnyAssigned,
                fixture.session(),
            )
            .await;
        assert!(decision.is_ok_and(|d| d == GateDecision::Allowed));
    }

    #[tokio::test]
    async fn assigned_but_inactive_role_fails_active_only_mode() {
        let fixture = Fixture::new();
        let mut user = fixture.user_with_roles(&["role-a", "role-b"]).await;
        let role_a = fixture.role("role-a").await;
        user.active_role_id = Some(role_a.id());

        let active_only = fixture
            .gate()
            .evaluate(
                Some(&user),
                &matchers(&["role-b"]),
                GateMode::ActiveOnly,
                fixture.session(),
            )
            .await;
        assert!(active_only.is_ok_and(|d| matches!(d, GateDecision::Denied { .. })));

        let any_assigned = fixture
            .gate()
            .evaluate(
                Some(&user),
                &matchers(&["role-b"]),
                GateMode::AnyAssigned,
                fixture.session(),
            )
            .await;
        assert!(any_assigned.is_ok_and(|d| d == GateDecision::Allowed));
    }

    #[tokio::test]
    async fn active_only_honors_session_override() {
        let fixture = Fixture::new();
        let mut user = fixture.user_with_roles(&["role-a", "role-b"]).await;
        let role_a = fixture.role("role-a").await;
        let role_b = fixture.role("role-b").await;
        user.active_role_id = Some(role_a.id());
        fixture.set_session_override(role_b.id()).await;

        let decision = fixture
            .gate()
            .evaluate(
                Some(&user),
                &matchers(&["role-b"]),
                GateMode::ActiveOnly,
                fixture.session(),
            )
            .await;
        assert!(decision.is_ok_and(|d| d == GateDecision::Allowed));
    }

    #[tokio::test]
    async fn denial_carries_the_unmet_requirement() {
        let fixture = Fixture::new();
        let user = fixture.user_with_roles(&["student"]).await;

        let decision = fixture
            .gate()
            .evaluate(
                Some(&user),
                &matchers(&["teacher", "administrator"]),
                GateMode::AnyAssigned,
                fixture.session(),
            )
            .await;
        assert!(decision.is_ok_and(|d| match d {
            GateDecision::Denied { required } => {
                required.iter().map(RoleMatcher::as_str).collect::<Vec<_>>()
                    == vec!["teacher", "administrator"]
            }
            _ => false,
        }));
    }

    #[tokio::test]
    async fn require_maps_denial_to_forbidden_with_role_list() {
        let fixture = Fixture::new();
        let user = fixture.user_with_roles(&["student"]).await;

        let result = fixture
            .gate()
            .require(
                Some(&user),
                &matchers(&["teacher"]),
                GateMode::AnyAssigned,
                fixture.session(),
            )
            .await;
        assert!(result.is_err_and(|error| match error {
            netdock_core::AppError::Forbidden(message) => message.contains("teacher"),
            _ => false,
        }));
    }

    #[tokio::test]
    async fn require_maps_missing_identity_to_unauthorized() {
        let fixture = Fixture::new();

        let result = fixture
            .gate()
            .require(
                None,
                &matchers(&["teacher"]),
                GateMode::AnyAssigned,
                fixture.session(),
            )
            .await;
        assert!(result.is_err_and(|error| {
            matches!(error, netdock_core::AppError::Unauthorized(_))
        }));
    }
}
