//! Route key to schema lookup.
use axum::http::Method;

use super::{Schema, AUTHENTICATE_USER, EMPTY_OBJECT, REGISTER_USER};

/// Methods that can carry a schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET => Some(HttpMethod::Get),
            Method::POST => Some(HttpMethod::Post),
            Method::PUT => Some(HttpMethod::Put),
            Method::PATCH => Some(HttpMethod::Patch),
            Method::DELETE => Some(HttpMethod::Delete),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub path: &'static str,
    pub method: HttpMethod,
}

impl RouteKey {
    const fn new(path: &'static str, method: HttpMethod) -> Self {
        Self { path, method }
    }
}

/// Only routes that carry a body. `DELETE /api/v1/auth` and `GET /api/v1/user`
/// are left out on purpose and resolve to [`EMPTY_OBJECT`].
static ROUTES: [(RouteKey, &Schema); 4] = [
    (RouteKey::new("/api/v1/auth", HttpMethod::Put), &AUTHENTICATE_USER),
    (RouteKey::new("/api/v1/auth", HttpMethod::Post), &REGISTER_USER),
    (RouteKey::new("/api/v1/auth", HttpMethod::Patch), &REGISTER_USER),
    (RouteKey::new("/api/v1/user", HttpMethod::Patch), &REGISTER_USER),
];

/// Every registered route key, in table order
pub fn route_keys() -> impl Iterator<Item = RouteKey> {
    ROUTES.iter().map(|(key, _)| *key)
}

/// Schema for a request path and method.
///
/// Exact match on both; anything unregistered gets [`EMPTY_OBJECT`].
pub fn resolve(path: &str, method: &Method) -> &'static Schema {
    let Some(method) = HttpMethod::from_method(method) else {
        return &EMPTY_OBJECT;
    };
    ROUTES
        .iter()
        .find(|(key, _)| key.path == path && key.method == method)
        .map_or(&EMPTY_OBJECT, |(_, schema)| *schema)
}
