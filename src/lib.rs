use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Domain logic: no I/O.
pub mod departments;
pub mod directory;
pub mod gate;
pub mod navigation;
pub mod session;
pub mod validation;

// Workflows over the managed backend.
pub mod content;
pub mod verification;

// Infrastructure and HTTP.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod repository;
pub mod storage;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{PortalError, PortalResult};
pub use identity::{IdentityState, MockIdentityProvider, SupabaseIdentity};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

use content::ContentService;
use validation::EmailValidator;
use verification::VerificationWorkflow;

/// ApiDoc
///
/// OpenAPI document for every handler, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health, handlers::signup, handlers::login, handlers::list_departments,
        handlers::get_department, handlers::list_subfolders, handlers::list_levels,
        handlers::navigate, handlers::check_access, handlers::get_me, handlers::logout,
        handlers::list_folders, handlers::list_notices, handlers::create_notice,
        handlers::delete_notice, handlers::list_resources, handlers::create_resource,
        handlers::delete_resource, handlers::get_upload_url, handlers::list_courses,
        handlers::get_course, handlers::get_pending_crs, handlers::get_cr_state,
        handlers::approve_cr, handlers::reject_cr
    ),
    components(
        schemas(
            models::Role, models::ResourceType, models::User, models::Notice, models::Resource,
            models::SignupRequest, models::LoginRequest, models::CreateNoticeRequest,
            models::CreateResourceRequest, models::UploadUrlRequest, models::UploadUrlResponse,
            models::AuthResponse, models::PendingCr, models::VerificationResponse,
            models::LogoutResponse, session::Session, gate::Route, gate::Access,
            navigation::Location, navigation::NavAction, navigation::NavigationRequest,
            navigation::NavigationResponse, departments::Department, departments::DepartmentLabel,
            directory::Folder, directory::Subfolder, directory::Course, directory::LevelTerms,
            verification::VerificationState, verification::CrState, error::ErrorBody,
        )
    ),
    tags(
        (name = "unibee-portal", description = "UniBee university resource portal API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, cloneable container of every service a handler may need.
#[derive(Clone)]
pub struct AppState {
    /// Rows of `users`, `notices` and `resources`.
    pub repo: RepositoryState,
    /// Signup, login and logout against the identity service.
    pub identity: IdentityState,
    /// Presigned uploads for resource files.
    pub storage: StorageState,
    pub config: AppConfig,
    /// Institution email rules built from `config.institution_domain`.
    pub emails: EmailValidator,
}

impl AppState {
    /// Assembles the state, compiling the email rules for the configured domain.
    pub fn new(
        repo: RepositoryState,
        identity: IdentityState,
        storage: StorageState,
        config: AppConfig,
    ) -> Result<Self, regex::Error> {
        let emails = EmailValidator::new(&config.institution_domain)?;
        Ok(Self {
            repo,
            identity,
            storage,
            config,
            emails,
        })
    }

    pub fn content(&self) -> ContentService {
        ContentService::new(self.repo.clone(), self.storage.clone())
    }

    pub fn verification(&self) -> VerificationWorkflow {
        VerificationWorkflow::new(self.repo.clone())
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for IdentityState {
    fn from_ref(app_state: &AppState) -> IdentityState {
        app_state.identity.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Rejects the request with the extractor's 401 unless `AuthUser` resolves.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing tree, scoped middleware and the observability stack.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // The admin role is checked inside the verification workflow.
        .nest("/admin", admin::admin_routes())
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Request span carrying method, URI and the `x-request-id` set above.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
