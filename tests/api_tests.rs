use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chrono::Utc;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::util::ServiceExt;
use unibee_portal::{
    AppConfig, AppState, InMemoryRepository, MockIdentityProvider, MockStorageService,
    config::Env, create_router,
    models::{Role, User},
};
use uuid::Uuid;

// --- Test Harness ---

const ADMIN_ID: Uuid = Uuid::from_u128(100);

fn admin() -> User {
    User {
        id: ADMIN_ID,
        email: "registrar@cuet.ac.bd".to_string(),
        role: Role::Admin,
        department_id: "04".to_string(),
        batch: None,
        is_verified: true,
        created_at: Utc::now(),
    }
}

fn spawn_router_with(storage: MockStorageService) -> Router {
    let config = AppConfig {
        env: Env::Production,
        ..AppConfig::default()
    };
    let identity = MockIdentityProvider::new(&config.jwt_secret).with_account(
        "registrar@cuet.ac.bd",
        "admin-secret",
        ADMIN_ID,
    );
    let state = AppState::new(
        Arc::new(InMemoryRepository::with_users(vec![admin()])),
        Arc::new(identity),
        Arc::new(storage),
        config,
    )
    .unwrap();
    create_router(state)
}

fn spawn_router() -> Router {
    spawn_router_with(MockStorageService::new())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn signup(app: &Router, email: &str, role: &str) -> Value {
    let (status, body) = send(
        app,
        post_json(
            "/auth/signup",
            None,
            json!({
                "email": email,
                "password": "secret123",
                "confirm_password": "secret123",
                "role": role,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

async fn admin_token(app: &Router) -> String {
    let (status, body) = send(
        app,
        post_json(
            "/auth/login",
            None,
            json!({ "email": "registrar@cuet.ac.bd", "password": "admin-secret", "role": "teacher" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["access_token"].as_str().unwrap().to_string()
}

// --- Tests ---

#[tokio::test]
async fn test_health_check_carries_request_id() {
    let app = spawn_router();
    let response = app.clone().oneshot(get("/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_protected_routes_require_a_session() {
    let app = spawn_router();

    for uri in ["/me", "/notices?dept=04&level=1&term=1", "/courses", "/admin/pending-crs"] {
        let (status, body) = send(&app, get(uri, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["error"], "unauthorized");
    }
}

#[tokio::test]
async fn test_student_signup_end_to_end() {
    let app = spawn_router();
    let body = signup(&app, "u2204112@student.cuet.ac.bd", "student").await;

    assert_eq!(body["url"], "/level-selection?dept=04");
    assert_eq!(body["user"]["role"], "student");
    assert_eq!(body["user"]["batch"], "22");

    let token = body["access_token"].as_str().unwrap();
    let (status, me) = send(&app, get("/me", Some(token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["department_id"], "04");

    let (status, folders) = send(
        &app,
        get("/directory/folders?dept=04&level=1&term=1", Some(token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(folders.as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_invalid_signup_email_is_a_validation_error() {
    let app = spawn_router();
    let (status, body) = send(
        &app,
        post_json(
            "/auth/signup",
            None,
            json!({
                "email": "abc@student.cuet.ac.bd",
                "password": "secret123",
                "confirm_password": "secret123",
                "role": "student",
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
    assert_eq!(
        body["message"],
        "Please use valid student email format: u2204112@student.cuet.ac.bd"
    );
}

#[tokio::test]
async fn test_non_admin_gets_access_denied_with_redirect() {
    let app = spawn_router();
    let cr = signup(&app, "u2204113@student.cuet.ac.bd", "cr").await;
    let token = cr["access_token"].as_str().unwrap();

    let (status, body) = send(&app, get("/admin/pending-crs", Some(token))).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Access denied. Admin privileges required.");
    assert_eq!(body["redirect"], "/");
}

#[tokio::test]
async fn test_cr_verification_flow() {
    let app = spawn_router();
    let cr = signup(&app, "u2204113@student.cuet.ac.bd", "cr").await;
    let cr_token = cr["access_token"].as_str().unwrap().to_string();
    let cr_id = cr["user"]["id"].as_str().unwrap().to_string();

    // Pending: the upload screen renders read-only and publishing is refused.
    let (_, access) = send(&app, get("/navigation/access?route=/cr-upload", Some(&cr_token))).await;
    assert_eq!(access["decision"], "pending_verification");

    let notice = json!({
        "title": "Lab cancelled",
        "content": "No lab this Thursday",
        "department_id": "04",
        "level": 2,
        "term": 1,
    });
    let (status, _) = send(&app, post_json("/notices", Some(&cr_token), notice.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = admin_token(&app).await;
    let (status, pending) = send(&app, get("/admin/pending-crs", Some(&admin))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending[0]["department_name"], "Computer Science and Engineering");

    let (status, approved) = send(
        &app,
        post_json(&format!("/admin/crs/{cr_id}/approve"), Some(&admin), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["message"], "CR verified successfully!");
    assert_eq!(approved["pending"], json!([]));

    // Verified: publishing now succeeds and the notice is listed.
    let (status, created) = send(&app, post_json("/notices", Some(&cr_token), notice)).await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, listed) = send(&app, get("/notices?dept=04&level=2&term=1", Some(&cr_token))).await;
    assert_eq!(listed[0]["id"], created["id"]);
}

#[tokio::test]
async fn test_admin_reads_cr_state_after_each_decision() {
    let app = spawn_router();
    let kept = signup(&app, "u2204113@student.cuet.ac.bd", "cr").await;
    let dropped = signup(&app, "u2204114@student.cuet.ac.bd", "cr").await;
    let kept_id = kept["user"]["id"].as_str().unwrap().to_string();
    let dropped_id = dropped["user"]["id"].as_str().unwrap().to_string();
    let admin = admin_token(&app).await;

    let (status, before) = send(&app, get(&format!("/admin/crs/{kept_id}"), Some(&admin))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(before["id"], kept_id.as_str());
    assert_eq!(before["state"], "pending");

    send(&app, post_json(&format!("/admin/crs/{kept_id}/approve"), Some(&admin), json!({}))).await;
    send(&app, post_json(&format!("/admin/crs/{dropped_id}/reject"), Some(&admin), json!({}))).await;

    let (_, approved) = send(&app, get(&format!("/admin/crs/{kept_id}"), Some(&admin))).await;
    assert_eq!(approved["state"], "verified");
    let (_, rejected) = send(&app, get(&format!("/admin/crs/{dropped_id}"), Some(&admin))).await;
    assert_eq!(rejected["state"], "removed");

    // The account owner cannot read it.
    let cr_token = kept["access_token"].as_str().unwrap();
    let (status, body) = send(&app, get(&format!("/admin/crs/{kept_id}"), Some(cr_token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["redirect"], "/");
}

#[tokio::test]
async fn test_navigation_is_public_and_anonymous_by_default() {
    let app = spawn_router();
    let (status, body) = send(
        &app,
        post_json(
            "/navigation/next",
            None,
            json!({
                "current": { "route": "level-selection", "dept": "04" },
                "action": { "action": "select_level_term", "level": 3, "term": 1 },
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["url"], "/main-dashboard?dept=04&level=3&term=1");
    assert_eq!(body["access"]["decision"], "redirect_to");
    assert_eq!(body["access"]["route"], "auth");
}

#[tokio::test]
async fn test_static_directory_endpoints() {
    let app = spawn_router();

    let (_, dept) = send(&app, get("/departments/04", None)).await;
    assert_eq!(dept["short_name"], "CSE");

    let (_, unknown) = send(&app, get("/departments/99", None)).await;
    assert_eq!(unknown["full_name"], "Department 99");
    assert_eq!(unknown["known"], false);

    let (_, subfolders) = send(&app, get("/directory/folders/resources", None)).await;
    assert_eq!(subfolders[0]["id"], "past-papers");

    let (_, missing) = send(&app, get("/directory/folders/nope", None)).await;
    assert_eq!(missing, json!([]));

    let (_, levels) = send(&app, get("/directory/levels", None)).await;
    assert_eq!(levels.as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_upload_url_failure_is_reported() {
    let app = spawn_router_with(MockStorageService::new_failing());
    let teacher = {
        let (status, body) = send(
            &app,
            post_json(
                "/auth/signup",
                None,
                json!({
                    "email": "rahman@cuet.ac.bd",
                    "password": "secret123",
                    "confirm_password": "secret123",
                    "role": "teacher",
                    "department_id": "04",
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body
    };
    let token = teacher["access_token"].as_str().unwrap();

    let request = json!({
        "filename": "lecture-01.pptx",
        "file_type": "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "department_id": "04",
        "level": 3,
        "term": 1,
    });
    let (status, body) = send(&app, post_json("/resources/upload-url", Some(token), request)).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "backend");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = spawn_router();
    let (status, doc) = send(&app, get("/api-docs/openapi.json", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/admin/crs/{id}/approve"].is_object());
    assert!(doc["paths"]["/admin/crs/{id}"]["get"].is_object());
}

#[tokio::test]
async fn test_teacher_course_catalogue() {
    let app = spawn_router();
    let admin = admin_token(&app).await;

    let (status, courses) = send(&app, get("/courses", Some(&admin))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(courses.as_array().unwrap().len(), 4);

    let (status, course) = send(&app, get("/courses/cse4101", Some(&admin))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(course["code"], "CSE 4101");
    assert_eq!(course["level"], 4);

    let (status, missing) = send(&app, get("/courses/cse9999", Some(&admin))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(missing["error"], "not_found");
}
