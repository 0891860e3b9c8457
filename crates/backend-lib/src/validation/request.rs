//! Per-request validation of bodies, route params and session cookies.
use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::{header, HeaderMap, Method},
    response::Response,
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use cloudkit_common::User;
use serde_json::Value;
use tracing::debug;

use super::{resolve, ValidationResult};
use crate::auth::{AuthService, Session, SessionValidation};
use crate::error::AppError;

/// A session the session library vouched for, with its user
#[derive(Clone, Debug)]
pub struct AuthenticatedSession {
    pub user: User,
    pub session: Session,
}

/// Inputs to [`RequestValidator::validate_request`]; each part is optional
#[derive(Default)]
pub struct ValidationInput<'a> {
    pub cookies: Option<&'a CookieJar>,
    pub params: Option<HashMap<String, String>>,
    pub request: Option<Request>,
}

/// What [`RequestValidator::validate_request`] checked. `None` means not run.
#[derive(Debug, Default)]
pub struct RequestValidation {
    pub session: Option<AuthenticatedSession>,
    pub params: Option<ValidationResult>,
    pub body: Option<ValidationResult>,
}

/// Stateless request validator, built once and shared through `AppState`
#[derive(Clone)]
pub struct RequestValidator {
    auth: Arc<dyn AuthService>,
    enforce_params: bool,
}

impl RequestValidator {
    pub fn new(auth: Arc<dyn AuthService>, enforce_params: bool) -> Self {
        Self {
            auth,
            enforce_params,
        }
    }

    /// Read the request body once and parse it against the route's schema.
    ///
    /// Schema violations are a successful call returning
    /// [`ValidationResult::Failure`]. A body that cannot be read at all is an error.
    pub async fn validate_body(&self, request: Request) -> Result<ValidationResult, AppError> {
        let schema = resolve(request.uri().path(), request.method());
        debug!(
            schema = schema.name(),
            method = %request.method(),
            path = request.uri().path(),
            "validating body"
        );
        let data = read_body(request).await?;
        Ok(schema.safe_parse(&data))
    }

    /// Route params are passed through unchanged unless enforcement is enabled
    pub fn validate_params(
        &self,
        path: &str,
        method: &Method,
        params: HashMap<String, String>,
    ) -> ValidationResult {
        let data = Value::Object(
            params
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect(),
        );
        if !self.enforce_params {
            return ValidationResult::Success { data };
        }
        resolve(path, method).safe_parse(&data)
    }

    /// Resolve the session cookie through the session library.
    ///
    /// Only succeeds when the library reports both a user and a session.
    pub async fn validate_session(&self, cookies: &CookieJar) -> Result<AuthenticatedSession, AppError> {
        let session_id = cookies
            .get(self.auth.session_cookie_name())
            .map(|cookie| cookie.value().to_owned())
            .unwrap_or_default();

        match self.auth.validate_session(&session_id).await? {
            SessionValidation {
                user: Some(user),
                session: Some(session),
            } => Ok(AuthenticatedSession { user, session }),
            _ => Err(AppError::InvalidSession),
        }
    }

    /// Run whichever of the session, params and body checks have inputs.
    ///
    /// The checks are independent; nothing ties the session to the body.
    pub async fn validate_request(&self, input: ValidationInput<'_>) -> Result<RequestValidation, AppError> {
        let ValidationInput {
            cookies,
            params,
            request,
        } = input;
        let mut validation = RequestValidation::default();

        if let Some(cookies) = cookies {
            validation.session = Some(self.validate_session(cookies).await?);
        }
        if let Some(params) = params {
            validation.params = Some(match &request {
                Some(request) => self.validate_params(request.uri().path(), request.method(), params),
                None => ValidationResult::Success {
                    data: serde_json::to_value(params)?,
                },
            });
        }
        if let Some(request) = request {
            validation.body = Some(self.validate_body(request).await?);
        }

        Ok(validation)
    }

    /// Terminal error boundary, see [`AppError::handle_error`]
    pub fn handle_error(&self, error: &AppError) -> Response {
        error.handle_error()
    }
}

enum BodyKind {
    UrlEncoded,
    Multipart,
    Json,
}

/// Form bodies are recognised by content type; anything else is read as JSON
fn body_kind(headers: &HeaderMap) -> BodyKind {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if content_type.starts_with("application/x-www-form-urlencoded") {
        BodyKind::UrlEncoded
    } else if content_type.starts_with("multipart/form-data") {
        BodyKind::Multipart
    } else {
        BodyKind::Json
    }
}

async fn read_body(request: Request) -> Result<Value, AppError> {
    match body_kind(request.headers()) {
        BodyKind::UrlEncoded => {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(request, &())
                .await
                .map_err(|e| AppError::UnreadableBody(e.body_text()))?;
            Ok(string_object(fields))
        },
        BodyKind::Multipart => {
            let mut multipart = Multipart::from_request(request, &())
                .await
                .map_err(|e| AppError::UnreadableBody(e.body_text()))?;
            let mut fields = Vec::new();
            while let Some(field) = multipart
                .next_field()
                .await
                .map_err(|e| AppError::UnreadableBody(e.body_text()))?
            {
                let Some(name) = field.name().map(str::to_owned) else {
                    continue;
                };
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::UnreadableBody(e.body_text()))?;
                fields.push((name, value));
            }
            Ok(string_object(fields))
        },
        BodyKind::Json => {
            let bytes = Bytes::from_request(request, &())
                .await
                .map_err(|e| AppError::UnreadableBody(e.body_text()))?;
            serde_json::from_slice(&bytes).map_err(|e| AppError::UnreadableBody(e.to_string()))
        },
    }
}

/// Later duplicates of a field name win
fn string_object(fields: impl IntoIterator<Item = (String, String)>) -> Value {
    Value::Object(
        fields
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{DefaultAuth, SessionCookieConfig, SessionManager};
    use crate::storage::{InMemoryUserRepository, UserRecord, UserRepository};
    use crate::validation::Issue;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum_extra::extract::cookie::Cookie;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    struct Fixture {
        validator: RequestValidator,
        auth: Arc<DefaultAuth>,
        user: User,
    }

    async fn fixture(enforce_params: bool) -> Fixture {
        let repo = Arc::new(InMemoryUserRepository::new());
        let user = repo
            .create(UserRecord {
                user: User {
                    id: Uuid::new_v4(),
                    email: "known@x.com".to_string(),
                    name: "Known".to_string(),
                    created_at: Utc::now(),
                },
                hashed_password: String::new(),
            })
            .await
            .unwrap();
        let auth = Arc::new(DefaultAuth::new(
            SessionManager::default(),
            repo,
            SessionCookieConfig::default(),
        ));
        Fixture {
            validator: RequestValidator::new(auth.clone(), enforce_params),
            auth,
            user,
        }
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    const BOUNDARY: &str = "cloudkit-test-boundary";

    fn multipart_body(fields: &[(&str, &str)]) -> String {
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        body
    }

    fn jar_with(value: &str) -> CookieJar {
        CookieJar::new().add(Cookie::new("auth_session", value.to_string()))
    }

    #[tokio::test]
    async fn test_validate_body_success_keeps_data() {
        let f = fixture(false).await;
        let body = json!({ "email": "known@x.com", "password": "rightpass" });
        let result = f
            .validator
            .validate_body(json_request(Method::PUT, "/api/v1/auth", body.clone()))
            .await
            .unwrap();
        assert_eq!(result, ValidationResult::Success { data: body });
    }

    #[tokio::test]
    async fn test_validate_body_reports_each_violation() {
        let f = fixture(false).await;
        let body = json!({ "email": "nope", "password": 5 });
        let result = f
            .validator
            .validate_body(json_request(Method::PUT, "/api/v1/auth", body))
            .await
            .unwrap();
        assert_eq!(
            result.issues(),
            [
                Issue::new("email", "Invalid email"),
                Issue::new("password", "Expected string, received number"),
            ]
        );
    }

    #[tokio::test]
    async fn test_validate_body_reads_form_data() {
        let f = fixture(false).await;
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/auth")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(
                "email=new%40x.com&name=New&password=Secure123&confirm_password=Secure123",
            ))
            .unwrap();
        let data = f.validator.validate_body(request).await.unwrap().into_data().unwrap();
        assert_eq!(data["email"], "new@x.com");
        assert_eq!(data["confirm_password"], "Secure123");

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/auth")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(multipart_body(&[
                ("email", "new@x.com"),
                ("name", "New"),
                ("password", "Secure123"),
                ("confirm_password", "Secure123"),
            ])))
            .unwrap();
        let data = f.validator.validate_body(request).await.unwrap().into_data().unwrap();
        assert_eq!(data["email"], "new@x.com");
        assert_eq!(data["name"], "New");
        assert_eq!(data["confirm_password"], "Secure123");
    }

    #[tokio::test]
    async fn test_validate_body_ignores_json_content_type() {
        let f = fixture(false).await;
        let body = json!({ "email": "known@x.com", "password": "rightpass" });
        for content_type in [Some("text/plain;charset=UTF-8"), None] {
            let mut builder = Request::builder().method(Method::PUT).uri("/api/v1/auth");
            if let Some(content_type) = content_type {
                builder = builder.header(header::CONTENT_TYPE, content_type);
            }
            let request = builder.body(Body::from(body.to_string())).unwrap();
            let result = f.validator.validate_body(request).await.unwrap();
            assert_eq!(result, ValidationResult::Success { data: body.clone() });
        }
    }

    #[tokio::test]
    async fn test_validate_body_unmatched_route_uses_empty_schema() {
        let f = fixture(false).await;
        let result = f
            .validator
            .validate_body(json_request(Method::GET, "/api/v1/other", json!({ "a": 1 })))
            .await
            .unwrap();
        assert_eq!(result, ValidationResult::Success { data: json!({}) });
    }

    #[tokio::test]
    async fn test_validate_body_propagates_unreadable_body() {
        let f = fixture(false).await;
        let request = Request::builder()
            .method(Method::PUT)
            .uri("/api/v1/auth")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let err = f.validator.validate_body(request).await.unwrap_err();
        assert!(matches!(err, AppError::UnreadableBody(_)));
        assert_eq!(f.validator.handle_error(&err).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_validate_params_passes_through_by_default() {
        let f = fixture(false).await;
        let params = HashMap::from([("id".to_string(), "42".to_string())]);
        let result = f.validator.validate_params("/api/v1/auth", &Method::PUT, params);
        assert_eq!(result, ValidationResult::Success { data: json!({ "id": "42" }) });
    }

    #[tokio::test]
    async fn test_validate_params_enforced() {
        let f = fixture(true).await;
        let params = HashMap::from([("id".to_string(), "42".to_string())]);
        let result = f
            .validator
            .validate_params("/api/v1/auth", &Method::PUT, params.clone());
        assert_eq!(result.issues().len(), 2);

        let result = f.validator.validate_params("/api/v1/other", &Method::GET, params);
        assert_eq!(result, ValidationResult::Success { data: json!({}) });
    }

    #[tokio::test]
    async fn test_validate_session_returns_library_pair() {
        let f = fixture(false).await;
        let session = f.auth.create_session(f.user.id).await.unwrap();

        let authenticated = f.validator.validate_session(&jar_with(&session.id)).await.unwrap();
        assert_eq!(authenticated.user, f.user);
        assert_eq!(authenticated.session.id, session.id);
    }

    #[tokio::test]
    async fn test_validate_session_rejects_missing_unknown_and_revoked() {
        let f = fixture(false).await;

        let err = f.validator.validate_session(&CookieJar::new()).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidSession));

        let err = f.validator.validate_session(&jar_with("forged")).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidSession));

        let session = f.auth.create_session(f.user.id).await.unwrap();
        f.auth.invalidate_session(&session.id).await.unwrap();
        let err = f.validator.validate_session(&jar_with(&session.id)).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidSession));
    }

    #[tokio::test]
    async fn test_validate_session_rejects_expired() {
        let f = fixture(false).await;
        let session = f.auth.create_session(f.user.id).await.unwrap();
        f.auth
            .sessions()
            .set_expiry(&session.id, Utc::now() - chrono::Duration::seconds(1))
            .await;

        let err = f.validator.validate_session(&jar_with(&session.id)).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidSession));
        assert_eq!(f.validator.handle_error(&err).status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_validate_request_runs_only_supplied_checks() {
        let f = fixture(false).await;

        let nothing = f.validator.validate_request(ValidationInput::default()).await.unwrap();
        assert!(nothing.session.is_none() && nothing.params.is_none() && nothing.body.is_none());

        let body_only = f
            .validator
            .validate_request(ValidationInput {
                request: Some(json_request(Method::PUT, "/api/v1/auth", json!({}))),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(body_only.session.is_none());
        assert_eq!(body_only.body.unwrap().issues().len(), 2);

        let session = f.auth.create_session(f.user.id).await.unwrap();
        let jar = jar_with(&session.id);
        let both = f
            .validator
            .validate_request(ValidationInput {
                cookies: Some(&jar),
                params: Some(HashMap::from([("tab".to_string(), "profile".to_string())])),
                request: Some(json_request(
                    Method::PUT,
                    "/api/v1/auth",
                    json!({ "email": "someone@else.com", "password": "x" }),
                )),
            })
            .await
            .unwrap();
        assert_eq!(both.session.unwrap().user, f.user);
        assert!(both.params.unwrap().is_success());
        assert!(both.body.unwrap().is_success());
    }

    #[tokio::test]
    async fn test_validate_request_fails_on_bad_session() {
        let f = fixture(false).await;
        let jar = CookieJar::new();
        let err = f
            .validator
            .validate_request(ValidationInput {
                cookies: Some(&jar),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(f.validator.handle_error(&err).status(), StatusCode::UNAUTHORIZED);
    }
}
