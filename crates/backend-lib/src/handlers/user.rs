//! `/api/v1/user`
use std::sync::Arc;

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;

use crate::validation::ValidationInput;
use crate::AppState;

/// `GET /api/v1/user`: the user behind the session cookie
pub async fn current_user(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let input = ValidationInput {
        cookies: Some(&jar),
        ..Default::default()
    };
    match state.validator.validate_request(input).await {
        Ok(validation) => match validation.session {
            Some(authenticated) => Json(authenticated.user).into_response(),
            None => state.validator.handle_error(&crate::error::AppError::InvalidSession),
        },
        Err(err) => state.validator.handle_error(&err),
    }
}
