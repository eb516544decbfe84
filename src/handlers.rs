use crate::{
    AppState,
    auth::AuthUser,
    departments::{self, Department, DepartmentLabel},
    directory::{self, Course, Folder, LevelTerms, Subfolder},
    error::{ErrorBody, PortalError, PortalResult},
    gate::{self, Access, Route},
    identity::IdentityGrant,
    models::{
        AuthResponse, CreateNoticeRequest, CreateResourceRequest, LoginRequest, LogoutResponse,
        Notice, PendingCr, Resource, Role, SignupRequest, UploadUrlRequest, UploadUrlResponse,
        User, VerificationResponse,
    },
    navigation::{self, Location, NavigationRequest, NavigationResponse, Navigator},
    session::Session,
    validation::{Cohort, ValidSignup},
    verification::{CrState, PendingQueue},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

// --- Query Structs ---

/// CohortQuery
///
/// The department/level/term triple carried by the dashboard URLs.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CohortQuery {
    pub dept: String,
    pub level: i32,
    pub term: i32,
}

/// ResourceQuery
///
/// `CohortQuery` plus an optional top-level folder filter.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ResourceQuery {
    pub dept: String,
    pub level: i32,
    pub term: i32,
    pub folder: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AccessQuery {
    /// A screen path such as `/cr-upload`. Unknown paths are checked as the not-found screen.
    pub route: String,
}

fn auth_response(user: User, access_token: Option<String>) -> AuthResponse {
    let next = navigation::landing_for(&Session::from(user.clone()));
    AuthResponse {
        url: next.url(),
        next,
        user,
        access_token,
    }
}

// --- Public: health & identity ---

#[utoipa::path(get, path = "/health", responses((status = 200, description = "Alive")))]
pub async fn health() -> &'static str {
    "ok"
}

/// signup
///
/// [Public Route] Validates the form, creates the identity account, then mirrors the
/// profile into `users` under the same id. CRs start unverified.
///
/// Retrying after a failed profile write is safe: an existing identity account with
/// matching credentials and no profile row resumes the signup instead of failing.
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid form", body = ErrorBody),
        (status = 502, description = "Backend failure", body = ErrorBody)
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> PortalResult<(StatusCode, Json<AuthResponse>)> {
    let form = state.emails.signup(payload)?;
    let grant = match state.identity.sign_up(&form.email, &form.password).await {
        Ok(grant) => grant,
        Err(err @ PortalError::Validation(_)) => resume_signup(&state, &form, err).await?,
        Err(err) => return Err(err),
    };

    let profile = User {
        id: grant.user_id,
        email: form.email,
        role: form.role,
        department_id: form.department_id,
        batch: form.batch,
        is_verified: form.role != Role::Cr,
        created_at: Utc::now(),
    };
    let user = state.repo.create_user(profile).await?;
    tracing::info!(user_id = %user.id, role = %user.role, "account created");

    Ok((StatusCode::CREATED, Json(auth_response(user, grant.access_token))))
}

/// resume_signup
///
/// The identity account exists but an earlier attempt never wrote its profile. Signing
/// in proves the caller owns it; anything else reports the original rejection.
async fn resume_signup(state: &AppState, form: &ValidSignup, rejection: PortalError) -> PortalResult<IdentityGrant> {
    let Ok(grant) = state.identity.sign_in(&form.email, &form.password).await else {
        return Err(rejection);
    };
    if state.repo.get_user(grant.user_id).await?.is_some() {
        return Err(rejection);
    }
    tracing::warn!(user_id = %grant.user_id, "resuming signup for account without a profile");
    Ok(grant)
}

/// login
///
/// [Public Route] The email must match the chosen login tab; the landing screen
/// follows the stored profile role.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 400, description = "Invalid form", body = ErrorBody),
        (status = 401, description = "Bad credentials", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> PortalResult<Json<AuthResponse>> {
    let form = state.emails.login(payload)?;
    let grant = state.identity.sign_in(&form.email, &form.password).await?;

    let user = state
        .repo
        .get_user(grant.user_id)
        .await?
        .ok_or_else(|| PortalError::NotFound("No profile exists for this account".to_string()))?;

    Ok(Json(auth_response(user, grant.access_token)))
}

// --- Public: directory & departments ---

#[utoipa::path(get, path = "/departments", responses((status = 200, description = "Departments", body = [Department])))]
pub async fn list_departments() -> Json<Vec<Department>> {
    Json(departments::DEPARTMENTS.to_vec())
}

/// get_department
///
/// [Public Route] Labels for any id. Unknown ids get fallback labels, never a 404.
#[utoipa::path(
    get,
    path = "/departments/{id}",
    params(("id" = String, Path, description = "Two-digit department code")),
    responses((status = 200, description = "Department labels", body = DepartmentLabel))
)]
pub async fn get_department(Path(id): Path<String>) -> Json<DepartmentLabel> {
    Json(departments::label(&id))
}

#[utoipa::path(
    get,
    path = "/directory/folders/{folder}",
    params(("folder" = String, Path, description = "Top-level folder id")),
    responses((status = 200, description = "Subfolders (empty for unknown folders)", body = [Subfolder]))
)]
pub async fn list_subfolders(Path(folder): Path<String>) -> Json<Vec<Subfolder>> {
    Json(directory::subfolders(&folder).to_vec())
}

#[utoipa::path(get, path = "/directory/levels", responses((status = 200, description = "Level/term grid", body = [LevelTerms])))]
pub async fn list_levels() -> Json<Vec<LevelTerms>> {
    Json(directory::level_terms())
}

// --- Public: navigation ---

/// navigate
///
/// [Public Route] Applies one action to the caller's location and back stack, and
/// reports the role gate's decision for the resulting screen.
#[utoipa::path(
    post,
    path = "/navigation/next",
    request_body = NavigationRequest,
    responses((status = 200, description = "Next location", body = NavigationResponse))
)]
pub async fn navigate(
    auth: Option<AuthUser>,
    Json(payload): Json<NavigationRequest>,
) -> Json<NavigationResponse> {
    let mut navigator = Navigator::from_parts(payload.current, payload.history);
    navigator.apply(&payload.action);
    let (location, history) = navigator.into_parts();

    let access = gate::can_access(auth.as_ref().map(|a| &a.session), location.route);
    Json(NavigationResponse {
        url: location.url(),
        location,
        history,
        access,
    })
}

#[utoipa::path(
    get,
    path = "/navigation/access",
    params(AccessQuery),
    responses((status = 200, description = "Role gate decision", body = Access))
)]
pub async fn check_access(auth: Option<AuthUser>, Query(query): Query<AccessQuery>) -> Json<Access> {
    let route = Route::from_path(&query.route);
    Json(gate::can_access(auth.as_ref().map(|a| &a.session), route))
}

// --- Authenticated: session ---

#[utoipa::path(get, path = "/me", responses((status = 200, description = "Current session", body = Session)))]
pub async fn get_me(AuthUser { session, .. }: AuthUser) -> Json<Session> {
    Json(session)
}

/// logout
///
/// [Authenticated Route] Ends the identity-service session. The client clears its
/// local session and goes to the welcome screen.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 200, description = "Signed out", body = LogoutResponse))
)]
pub async fn logout(
    AuthUser { session, access_token }: AuthUser,
    State(state): State<AppState>,
) -> PortalResult<Json<LogoutResponse>> {
    if let Some(token) = access_token {
        state.identity.sign_out(&token).await?;
    }
    tracing::info!(user_id = %session.id, "signed out");

    let next = Location::welcome();
    Ok(Json(LogoutResponse {
        url: next.url(),
        next,
    }))
}

/// list_folders
///
/// [Authenticated Route] Top-level folders of a cohort's dashboard. The "Upload (CR Only)"
/// entry is only listed for CR sessions.
#[utoipa::path(
    get,
    path = "/directory/folders",
    params(CohortQuery),
    responses((status = 200, description = "Folders", body = [Folder]))
)]
pub async fn list_folders(
    AuthUser { session, .. }: AuthUser,
    Query(query): Query<CohortQuery>,
) -> PortalResult<Json<Vec<Folder>>> {
    Cohort::new(query.dept, query.level, query.term)?;
    Ok(Json(directory::folders_for(Some(&session))))
}

// --- Authenticated: notices ---

#[utoipa::path(
    get,
    path = "/notices",
    params(CohortQuery),
    responses((status = 200, description = "Notices, newest first", body = [Notice]))
)]
pub async fn list_notices(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<CohortQuery>,
) -> PortalResult<Json<Vec<Notice>>> {
    let notices = state
        .content()
        .list_notices(query.dept, query.level, query.term)
        .await?;
    Ok(Json(notices))
}

/// create_notice
///
/// [Authenticated Route] Verified CRs and teachers only, into their own department.
#[utoipa::path(
    post,
    path = "/notices",
    request_body = CreateNoticeRequest,
    responses(
        (status = 201, description = "Created", body = Notice),
        (status = 403, description = "Not allowed to publish", body = ErrorBody)
    )
)]
pub async fn create_notice(
    AuthUser { session, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateNoticeRequest>,
) -> PortalResult<(StatusCode, Json<Notice>)> {
    let notice = state.content().create_notice(&session, payload).await?;
    Ok((StatusCode::CREATED, Json(notice)))
}

#[utoipa::path(
    delete,
    path = "/notices/{id}",
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not owner or admin", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn delete_notice(
    AuthUser { session, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> PortalResult<StatusCode> {
    state.content().delete_notice(&session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Authenticated: resources ---

#[utoipa::path(
    get,
    path = "/resources",
    params(ResourceQuery),
    responses((status = 200, description = "Resources, newest first", body = [Resource]))
)]
pub async fn list_resources(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ResourceQuery>,
) -> PortalResult<Json<Vec<Resource>>> {
    let resources = state
        .content()
        .list_resources(query.dept, query.level, query.term, query.folder.as_deref())
        .await?;
    Ok(Json(resources))
}

#[utoipa::path(
    post,
    path = "/resources",
    request_body = CreateResourceRequest,
    responses(
        (status = 201, description = "Created", body = Resource),
        (status = 403, description = "Not allowed to publish", body = ErrorBody)
    )
)]
pub async fn create_resource(
    AuthUser { session, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateResourceRequest>,
) -> PortalResult<(StatusCode, Json<Resource>)> {
    let resource = state.content().create_resource(&session, payload).await?;
    Ok((StatusCode::CREATED, Json(resource)))
}

#[utoipa::path(
    delete,
    path = "/resources/{id}",
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not owner or admin", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn delete_resource(
    AuthUser { session, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> PortalResult<StatusCode> {
    state.content().delete_resource(&session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// get_upload_url
///
/// [Authenticated Route] A ten-minute presigned PUT for a resource file. Same publish
/// rules as creating a resource.
#[utoipa::path(
    post,
    path = "/resources/upload-url",
    request_body = UploadUrlRequest,
    responses(
        (status = 200, description = "URL", body = UploadUrlResponse),
        (status = 400, description = "Unsupported file", body = ErrorBody)
    )
)]
pub async fn get_upload_url(
    AuthUser { session, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UploadUrlRequest>,
) -> PortalResult<Json<UploadUrlResponse>> {
    let response = state.content().upload_url(&session, payload).await?;
    Ok(Json(response))
}

// --- Authenticated: teacher courses ---

#[utoipa::path(get, path = "/courses", responses((status = 200, description = "Courses", body = [Course])))]
pub async fn list_courses(_auth: AuthUser) -> Json<Vec<Course>> {
    Json(directory::COURSES.to_vec())
}

#[utoipa::path(
    get,
    path = "/courses/{id}",
    responses(
        (status = 200, description = "Course", body = Course),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get_course(_auth: AuthUser, Path(id): Path<String>) -> PortalResult<Json<Course>> {
    directory::course(&id)
        .copied()
        .map(Json)
        .ok_or_else(|| PortalError::NotFound(format!("Course {id} not found")))
}

// --- Admin: CR verification ---

/// get_pending_crs
///
/// [Admin Route] Pending CR accounts, newest first.
#[utoipa::path(
    get,
    path = "/admin/pending-crs",
    responses(
        (status = 200, description = "Pending CRs", body = [PendingCr]),
        (status = 403, description = "Admin privileges required", body = ErrorBody)
    )
)]
pub async fn get_pending_crs(
    AuthUser { session, .. }: AuthUser,
    State(state): State<AppState>,
) -> PortalResult<Json<Vec<PendingCr>>> {
    let pending = state.verification().list_pending(&session).await?;
    Ok(Json(pending))
}

/// get_cr_state
///
/// [Admin Route] Where one CR account stands: `pending`, `verified` or `removed`.
/// The admin screen reads it after an approve or reject to confirm the outcome.
#[utoipa::path(
    get,
    path = "/admin/crs/{id}",
    responses(
        (status = 200, description = "Verification state", body = CrState),
        (status = 403, description = "Admin privileges required", body = ErrorBody)
    )
)]
pub async fn get_cr_state(
    AuthUser { session, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> PortalResult<Json<CrState>> {
    let cr_state = state.verification().state_of(&session, id).await?;
    Ok(Json(cr_state))
}

/// approve_cr
///
/// [Admin Route] Pending -> Verified. The response carries the re-fetched pending list.
#[utoipa::path(
    post,
    path = "/admin/crs/{id}/approve",
    responses(
        (status = 200, description = "Approved", body = VerificationResponse),
        (status = 403, description = "Admin privileges required", body = ErrorBody)
    )
)]
pub async fn approve_cr(
    AuthUser { session, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> PortalResult<Json<VerificationResponse>> {
    let mut queue = PendingQueue::new();
    let message = queue.approve(&state.verification(), &session, id).await?;
    Ok(Json(VerificationResponse {
        message: message.to_string(),
        pending: queue.items().to_vec(),
    }))
}

/// reject_cr
///
/// [Admin Route] Pending -> Removed. The response carries the re-fetched pending list.
#[utoipa::path(
    post,
    path = "/admin/crs/{id}/reject",
    responses(
        (status = 200, description = "Rejected", body = VerificationResponse),
        (status = 403, description = "Admin privileges required", body = ErrorBody)
    )
)]
pub async fn reject_cr(
    AuthUser { session, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> PortalResult<Json<VerificationResponse>> {
    let mut queue = PendingQueue::new();
    let message = queue.reject(&state.verification(), &session, id).await?;
    Ok(Json(VerificationResponse {
        message: message.to_string(),
        pending: queue.items().to_vec(),
    }))
}
