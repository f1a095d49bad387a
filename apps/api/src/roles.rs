//! Role selection and catalog handlers.

use axum::Json;
use axum::extract::{Extension, Path, State};
use netdock_core::UserIdentity;
use netdock_domain::{Role, RoleRef};
use tower_sessions::Session;

use crate::auth::current_user;
use crate::dto::{RoleResponse, SelectRoleRequest, SelectRoleResponse};
use crate::error::ApiResult;
use crate::session::HttpActiveRoleSession;
use crate::state::AppState;

/// Landing page per role slug; anything unlisted falls back to `/`.
const ROLE_REDIRECTS: &[(&str, &str)] = &[
    ("administrator", "/admin"),
    ("network-engineer", "/devices"),
    ("technician", "/devices"),
    ("editor", "/articles"),
    ("viewer", "/"),
];

fn redirect_for(role: &Role) -> String {
    ROLE_REDIRECTS
        .iter()
        .find(|(slug, _)| role.slug().as_str() == *slug)
        .map_or("/", |(_, target)| *target)
        .to_owned()
}

/// POST /api/roles/{role_slug}/select - Switch the caller's active role.
///
/// POST-only: the switch mutates session or durable state and must never
/// ride on a cacheable method.
pub async fn select_role_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(role_slug): Path<String>,
    session: Session,
    Json(payload): Json<SelectRoleRequest>,
) -> ApiResult<Json<SelectRoleResponse>> {
    let user = current_user(&state, &identity).await?;

    let role_session = HttpActiveRoleSession::new(session);
    let role = state
        .active_role_service
        .select_role(
            &user,
            RoleRef::Identifier(role_slug),
            payload.persist,
            &role_session,
        )
        .await?;

    let message = if payload.persist {
        format!("Active role permanently set to {}", role.name())
    } else {
        format!("Active role set to {} for this session", role.name())
    };

    let redirect_to = redirect_for(&role);

    Ok(Json(SelectRoleResponse {
        role: RoleResponse::from(role),
        message,
        redirect_to,
    }))
}

/// GET /api/security/roles - Full role catalog, administrator only.
pub async fn list_roles_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let roles = state
        .role_repository
        .list_all()
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}
