use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Identity entry points, the static department/directory tables and the navigation
/// controller. Nothing here reads or writes cohort content.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for load balancers.
        .route("/health", get(handlers::health))
        // POST /auth/signup, POST /auth/login
        // Validate the form against the institution email rules, then call the identity service.
        .route("/auth/signup", post(handlers::signup))
        .route("/auth/login", post(handlers::login))
        // GET /departments, GET /departments/{id}
        // Unknown ids resolve to fallback labels.
        .route("/departments", get(handlers::list_departments))
        .route("/departments/{id}", get(handlers::get_department))
        // GET /directory/folders/{folder}
        .route("/directory/folders/{folder}", get(handlers::list_subfolders))
        .route("/directory/levels", get(handlers::list_levels))
        // POST /navigation/next, GET /navigation/access?route=...
        // The role gate runs for the caller if a valid token is present, anonymously otherwise.
        .route("/navigation/next", post(handlers::navigate))
        .route("/navigation/access", get(handlers::check_access))
}
