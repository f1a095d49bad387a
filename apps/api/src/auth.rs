use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use netdock_application::{AuthOutcome, UserRecord};
use netdock_core::{AppError, UserIdentity};
use netdock_domain::UserId;
use tower_sessions::Session;

use crate::dto::{
    ChangePasswordRequest, GenericMessageResponse, LoginRequest, LoginResponse, MeResponse,
};
use crate::error::ApiResult;
use crate::session::{HttpActiveRoleSession, SESSION_USER_KEY};
use crate::state::AppState;

/// Loads the fresh user record behind a session identity.
///
/// The session only carries the identity snapshot taken at login; role
/// membership, the superuser flag and the durable active-role pointer are
/// always read back from the primary store.
pub async fn current_user(state: &AppState, identity: &UserIdentity) -> ApiResult<UserRecord> {
    let user_id = uuid::Uuid::parse_str(identity.subject())
        .map(UserId::from_uuid)
        .map_err(|error| AppError::Internal(format!("invalid session subject: {error}")))?;

    let user = state
        .user_service
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("session references an unknown user".to_owned()))?;

    Ok(user)
}

/// POST /auth/login - Authenticate with email+password.
pub async fn login_handler(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let outcome = state
        .user_service
        .login(&payload.email, &payload.password)
        .await?;

    match outcome {
        AuthOutcome::Authenticated(user) => {
            let identity = UserIdentity::new(
                user.id.to_string(),
                user.display_name.clone(),
                Some(user.email.clone()),
            );

            // OWASP Session Management: regenerate session ID on privilege change.
            session.cycle_id().await.map_err(|error| {
                AppError::Internal(format!("failed to cycle session id: {error}"))
            })?;

            session
                .insert(SESSION_USER_KEY, &identity)
                .await
                .map_err(|error| {
                    AppError::Internal(format!("failed to persist session identity: {error}"))
                })?;

            // Post-login integrity pass over both active-role tiers.
            let role_session = HttpActiveRoleSession::new(session);
            state
                .active_role_service
                .reconcile_on_login(&user, &role_session)
                .await?;

            tracing::info!(user = %user.id, "login succeeded");

            Ok(Json(LoginResponse {
                status: "authenticated",
            }))
        }
        AuthOutcome::Failed => {
            // OWASP: generic error message for all failure cases.
            Err(AppError::Unauthorized("invalid email or password".to_owned()).into())
        }
    }
}

/// POST /auth/logout - Destroy the current session.
pub async fn logout_handler(session: Session) -> ApiResult<StatusCode> {
    session
        .delete()
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete session: {error}")))?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/me - The signed-in user and their resolved role state.
pub async fn me_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    session: Session,
) -> ApiResult<Json<MeResponse>> {
    let user = current_user(&state, &identity).await?;

    let role_session = HttpActiveRoleSession::new(session);
    let context = state
        .active_role_service
        .role_context(&user, &role_session)
        .await?;

    Ok(Json(MeResponse::new(
        &identity,
        user.is_superuser,
        context.active_role,
        context.roles,
    )))
}

/// PUT /api/profile/password - Change the signed-in user's password.
pub async fn change_password_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(payload): Json<ChangePasswordRequest>,
) -> ApiResult<Json<GenericMessageResponse>> {
    let user = current_user(&state, &identity).await?;

    state
        .user_service
        .change_password(
            user.id,
            &payload.current_password,
            &payload.new_password,
        )
        .await?;

    Ok(Json(GenericMessageResponse {
        message: "password updated".to_owned(),
    }))
}
