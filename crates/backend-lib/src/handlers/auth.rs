// ============================
// crates/backend-lib/src/handlers/auth.rs
// ============================
//! `/api/v1/auth`: login, registration and logout.
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use axum_extra::extract::cookie::CookieJar;
use cloudkit_common::{AuthenticateUser, ErrorMessage, RegisterUser, User};
use tracing::{info, warn};

use crate::error::AppError;
use crate::middleware::SessionContext;
use crate::users::AuthOutcome;
use crate::validation::ValidationResult;
use crate::AppState;

/// Reply for a login with an unknown email
pub const UNKNOWN_EMAIL_MESSAGE: &str = "computer sais no";

/// `PUT /api/v1/auth`: log in with a JSON `{email, password}` body
pub async fn authenticate(State(state): State<Arc<AppState>>, jar: CookieJar, request: Request) -> Response {
    match try_authenticate(&state, jar, request).await {
        Ok(response) => response,
        Err(err) => state.validator.handle_error(&err),
    }
}

async fn try_authenticate(state: &AppState, jar: CookieJar, request: Request) -> Result<Response, AppError> {
    let credentials: AuthenticateUser = state.validator.validate_body(request).await?.parse_into()?;

    let user = match state.users.authenticate(&credentials).await? {
        AuthOutcome::Authenticated(user) => user,
        AuthOutcome::UnknownEmail => {
            let body = ErrorMessage {
                message: UNKNOWN_EMAIL_MESSAGE.to_string(),
            };
            return Ok((StatusCode::BAD_REQUEST, Json(body)).into_response());
        },
        // Bare 500, not 401.
        AuthOutcome::WrongPassword => {
            warn!("rejected login with wrong password");
            return Ok(StatusCode::INTERNAL_SERVER_ERROR.into_response());
        },
    };

    info!(user_id = %user.id, "user logged in");
    start_session(state, jar, user).await
}

/// `POST /api/v1/auth`: register from a form-encoded body
pub async fn register(State(state): State<Arc<AppState>>, jar: CookieJar, request: Request) -> Response {
    match try_register(&state, jar, request).await {
        Ok(response) => response,
        Err(err @ AppError::CollectionAlreadyExists(_)) => state.validator.handle_error(&err),
        Err(err) => {
            warn!(error = %err, "registration failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        },
    }
}

async fn try_register(state: &AppState, jar: CookieJar, request: Request) -> Result<Response, AppError> {
    let form: RegisterUser = match state.validator.validate_body(request).await? {
        ValidationResult::Success { data } => serde_json::from_value(data)?,
        ValidationResult::Failure { issues } => {
            warn!(?issues, "invalid registration form");
            return Ok(StatusCode::INTERNAL_SERVER_ERROR.into_response());
        },
    };

    if state.users.exists(&form.email).await? {
        return Err(AppError::CollectionAlreadyExists(format!(
            "User with email {} already exists",
            form.email
        )));
    }

    let created = state.users.create_user(form).await?;
    start_session(state, jar, created).await
}

/// `DELETE /api/v1/auth`: end the session found by the session middleware
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<SessionContext>,
    jar: CookieJar,
) -> Response {
    let Some(session) = context.session else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    if let Err(err) = state.auth.invalidate_session(&session.id).await {
        return state.validator.handle_error(&err);
    }
    info!(user_id = %session.user_id, "user logged out");

    let jar = jar.add(state.auth.create_blank_session_cookie());
    (StatusCode::OK, jar).into_response()
}

async fn start_session(state: &AppState, jar: CookieJar, user: User) -> Result<Response, AppError> {
    let session = state.auth.create_session(user.id).await?;
    let jar = jar.add(state.auth.create_session_cookie(&session));
    Ok((jar, Json(user)).into_response())
}
