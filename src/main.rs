use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use unibee_portal::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    identity::{IdentityState, SupabaseIdentity},
    repository::{PostgresRepository, RepositoryState},
    storage::{S3StorageClient, StorageService, StorageState},
};

/// main
///
/// Loads configuration, sets up logging, connects the backend collaborators
/// (rows, identity, storage) and serves the HTTP API.
#[tokio::main]
async fn main() {
    // 1. Configuration (Fail-Fast)
    // `.env` is optional; real environment variables win over it. AppConfig::load()
    // panics here, before anything binds, if a production secret is missing.
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter
    // RUST_LOG wins; otherwise the portal logs at debug and request spans at info.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "unibee_portal=debug,tower_http=info,axum=trace".into());

    // 3. Subscriber: pretty output for humans locally, one JSON object per line in production.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Row Store (Postgres)
    // One small pool shared by every request through the Repository trait object.
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");
    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    // 5. Identity Service
    // Signup, login and logout are forwarded to the backend's auth API with the anon key.
    let identity =
        Arc::new(SupabaseIdentity::new(&config.supabase_url, &config.supabase_anon_key)) as IdentityState;

    // 6. Storage (S3/MinIO)
    // Presigned PUTs go to the S3 endpoint; stored resource URLs point at the public base.
    let s3_client = S3StorageClient::new(
        &config.s3_endpoint,
        &config.s3_region,
        &config.s3_key,
        &config.s3_secret,
        &config.s3_bucket,
    )
    .with_public_base(&config.s3_public_url);

    // LOCAL-ONLY: create the MinIO bucket on first run. A failure only disables uploads.
    if config.env == Env::Local {
        if let Err(e) = s3_client.ensure_bucket_exists().await {
            tracing::warn!("Local bucket setup failed, uploads will not work: {}", e);
        }
    }
    let storage = Arc::new(s3_client) as StorageState;

    // 7. Unified State Assembly
    // AppState::new compiles the email rules for INSTITUTION_DOMAIN.
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState::new(repo, identity, storage, config)
        .expect("FATAL: INSTITUTION_DOMAIN does not produce valid email rules.");

    // 8. Router and Server Startup
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Could not bind BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", bind_addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
