use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Admin Router Module
///
/// CR verification, nested under `/admin`.
///
/// Access Control:
/// Handlers resolve the caller with `AuthUser` (401 when anonymous) and the verification
/// workflow refuses non-admins with a 403 carrying a redirect to the welcome screen.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/pending-crs
        // CR accounts with is_verified=false, newest first.
        .route("/pending-crs", get(handlers::get_pending_crs))
        // GET /admin/crs/{id}
        // pending, verified or removed; unknown ids read as removed.
        .route("/crs/{id}", get(handlers::get_cr_state))
        // POST /admin/crs/{id}/approve, POST /admin/crs/{id}/reject
        // Both respond with the re-fetched pending list; repeating either is a no-op.
        .route("/crs/{id}/approve", post(handlers::approve_cr))
        .route("/crs/{id}/reject", post(handlers::reject_cr))
}
