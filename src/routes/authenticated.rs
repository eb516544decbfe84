use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post},
};

/// Authenticated Router Module
///
/// Everything a signed-in user does after landing: browsing a cohort's folders, notices
/// and resources, and (for verified CRs and teachers) publishing to it.
///
/// Publish and delete rules are enforced by `ContentService`, not by the router.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // The session profile: role, department, batch, verification flag.
        .route("/me", get(handlers::get_me))
        .route("/auth/logout", post(handlers::logout))
        // GET /directory/folders?dept&level&term
        // The "Upload (CR Only)" entry is only listed for CR sessions.
        .route("/directory/folders", get(handlers::list_folders))
        // --- Notices ---
        .route(
            "/notices",
            get(handlers::list_notices).post(handlers::create_notice),
        )
        .route("/notices/{id}", delete(handlers::delete_notice))
        // --- Resources ---
        .route(
            "/resources",
            get(handlers::list_resources).post(handlers::create_resource),
        )
        .route("/resources/{id}", delete(handlers::delete_resource))
        // POST /resources/upload-url
        // Ten-minute presigned PUT for PDF/DOC/DOCX/PPT/PPTX/ZIP files.
        .route("/resources/upload-url", post(handlers::get_upload_url))
        // --- Teacher courses ---
        .route("/courses", get(handlers::list_courses))
        .route("/courses/{id}", get(handlers::get_course))
}
