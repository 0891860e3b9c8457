// ============================
// crates/backend-lib/src/router.rs
// ============================
//! HTTP router.
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers::{auth, user};
use crate::middleware::session_context;
use crate::AppState;

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/v1/auth",
            put(auth::authenticate).post(auth::register).delete(auth::logout),
        )
        .route("/api/v1/user", get(user::current_user))
        .layer(middleware::from_fn_with_state(state.clone(), session_context))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
