use axum::Json;
use axum::extract::{Extension, Request, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use netdock_application::{GateDecision, GateMode};
use netdock_core::{AppError, UserIdentity};
use netdock_domain::RoleMatcher;
use tower_sessions::Session;

use crate::error::{ApiResult, LoginRedirectResponse};
use crate::session::{HttpActiveRoleSession, SESSION_USER_KEY};
use crate::state::AppState;

pub async fn require_auth(
    session: Session,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let identity = session
        .get::<UserIdentity>(SESSION_USER_KEY)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read session identity: {error}")))?
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Declarative role requirement attached to a route via an extension layer.
#[derive(Clone)]
pub struct RoleGateRule {
    required: Vec<RoleMatcher>,
    mode: GateMode,
}

impl RoleGateRule {
    /// Builds a rule from role names or slugs.
    #[must_use]
    pub fn new(identifiers: &[&str], mode: GateMode) -> Self {
        Self {
            required: identifiers
                .iter()
                .map(|identifier| RoleMatcher::new(*identifier))
                .collect(),
            mode,
        }
    }
}

/// Gate middleware enforcing the route's [`RoleGateRule`].
///
/// Unauthenticated callers get a 401 carrying the original destination so
/// the frontend can continue there after login; authenticated callers
/// lacking the role get a terminal 403 naming the acceptable roles.
pub async fn require_roles(
    State(state): State<AppState>,
    Extension(rule): Extension<RoleGateRule>,
    session: Session,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let identity = session
        .get::<UserIdentity>(SESSION_USER_KEY)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read session identity: {error}")))?;

    let user = match identity {
        Some(identity) => Some(crate::auth::current_user(&state, &identity).await?),
        None => None,
    };

    let role_session = HttpActiveRoleSession::new(session);
    let decision = state
        .role_gate
        .evaluate(user.as_ref(), &rule.required, rule.mode, &role_session)
        .await?;

    match decision {
        GateDecision::Allowed => Ok(next.run(request).await),
        GateDecision::AuthenticationRequired => Ok((
            StatusCode::UNAUTHORIZED,
            Json(LoginRedirectResponse {
                message: "authentication required".to_owned(),
                next: request.uri().to_string(),
            }),
        )
            .into_response()),
        GateDecision::Denied { required } => Err(AppError::Forbidden(format!(
            "you need one of these roles: {}",
            required
                .iter()
                .map(RoleMatcher::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        ))
        .into()),
    }
}

pub async fn require_same_origin_for_mutations(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    if is_state_changing_method(request.method()) {
        let headers = request.headers();

        if let Some(fetch_site) = headers.get("sec-fetch-site") {
            if fetch_site == HeaderValue::from_static("cross-site") {
                return Err(AppError::Unauthorized("cross-site request blocked".to_owned()).into());
            }
        }

        let origin = headers
            .get(header::ORIGIN)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        let referer = headers
            .get(header::REFERER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();

        let allowed_origin = state.frontend_url;
        let origin_is_allowed = origin == allowed_origin;
        let referer_is_allowed = referer.starts_with(&allowed_origin);

        if !origin_is_allowed && !referer_is_allowed {
            return Err(AppError::Unauthorized("origin validation failed".to_owned()).into());
        }
    }

    Ok(next.run(request).await)
}

fn is_state_changing_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}
