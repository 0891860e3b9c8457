//! Resolves the session cookie once per request.
//!
//! Handlers read the outcome as `Extension<SessionContext>`.
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::SET_COOKIE, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use cloudkit_common::User;

use crate::auth::{Session, SessionValidation};
use crate::AppState;

/// Session state attached to every request
#[derive(Clone, Debug, Default)]
pub struct SessionContext {
    pub user: Option<User>,
    pub session: Option<Session>,
}

impl SessionContext {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.session.is_some()
    }
}

/// Session context middleware.
///
/// A renewed session gets its cookie re-issued, a dead one gets a blank
/// cookie. Either is skipped when the handler already wrote that cookie.
pub async fn session_context(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let cookie_name = state.auth.session_cookie_name().to_owned();
    let Some(session_id) = jar.get(&cookie_name).map(|c| c.value().to_owned()) else {
        request.extensions_mut().insert(SessionContext::default());
        return next.run(request).await;
    };

    let (context, cookie) = match state.auth.validate_session(&session_id).await {
        Ok(SessionValidation {
            user: Some(user),
            session: Some(session),
        }) => {
            let cookie = session
                .fresh
                .then(|| state.auth.create_session_cookie(&session));
            let context = SessionContext {
                user: Some(user),
                session: Some(session),
            };
            (context, cookie)
        },
        Ok(_) => (
            SessionContext::default(),
            Some(state.auth.create_blank_session_cookie()),
        ),
        Err(err) => return err.handle_error(),
    };

    request.extensions_mut().insert(context);
    let response = next.run(request).await;

    match cookie {
        Some(cookie) if !sets_cookie(response.headers(), &cookie_name) => with_cookie(cookie, response),
        _ => response,
    }
}

fn sets_cookie(headers: &HeaderMap, name: &str) -> bool {
    let prefix = format!("{name}=");
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.starts_with(&prefix))
}

fn with_cookie(cookie: Cookie<'static>, response: Response) -> Response {
    (CookieJar::new().add(cookie), response).into_response()
}
