use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::{PortalError, PortalResult},
    models::{Notice, Resource, Role, User},
    validation::{ValidNotice, ValidResource},
};

/// Repository Trait
///
/// Row access to the managed backend's `users`, `notices` and `resources` tables.
/// Only equality filters and `created_at DESC` ordering are used; no joins, no
/// transactions, no pagination. Every failure is returned so the caller can surface
/// it without touching its own state.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: Uuid) -> PortalResult<Option<User>>;
    async fn create_user(&self, user: User) -> PortalResult<User>;
    /// CR accounts with `is_verified = false`, newest first.
    async fn get_pending_crs(&self) -> PortalResult<Vec<User>>;
    /// Pending -> Verified. Returns false when there was nothing to change.
    async fn mark_cr_verified(&self, id: Uuid) -> PortalResult<bool>;
    /// Pending -> Removed. Returns false when the record was already gone.
    async fn delete_pending_cr(&self, id: Uuid) -> PortalResult<bool>;

    // --- Notices ---
    async fn get_notices(&self, department_id: &str, level: i32, term: i32) -> PortalResult<Vec<Notice>>;
    async fn get_notice(&self, id: Uuid) -> PortalResult<Option<Notice>>;
    async fn create_notice(&self, notice: ValidNotice, uploaded_by: Uuid) -> PortalResult<Notice>;
    async fn delete_notice(&self, id: Uuid) -> PortalResult<bool>;

    // --- Resources ---
    async fn get_resources(
        &self,
        department_id: &str,
        level: i32,
        term: i32,
        folder: Option<&str>,
    ) -> PortalResult<Vec<Resource>>;
    async fn get_resource(&self, id: Uuid) -> PortalResult<Option<Resource>>;
    async fn create_resource(&self, resource: ValidResource, uploaded_by: Uuid) -> PortalResult<Resource>;
    async fn delete_resource(&self, id: Uuid) -> PortalResult<bool>;
}

/// RepositoryState
///
/// The shared handle to the persistence layer held by `AppState`.
pub type RepositoryState = Arc<dyn Repository>;

const USER_COLUMNS: &str =
    "id, email, role::text AS role, department_id, batch, is_verified, created_at";
const NOTICE_COLUMNS: &str =
    "id, title, content, department_id, level, term, uploaded_by, created_at";
const RESOURCE_COLUMNS: &str =
    "id, title, type::text AS type, url, folder, department_id, level, term, uploaded_by, created_at";

/// PostgresRepository
///
/// `Repository` backed by the managed backend's Postgres database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Logs at the call site, then maps to the portal taxonomy.
fn backend_error(op: &'static str) -> impl FnOnce(sqlx::Error) -> PortalError {
    move |e| {
        tracing::error!("{} error: {:?}", op, e);
        PortalError::from(e)
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> PortalResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_error("get_user"))
    }

    /// Mirrors the identity-service account into the `users` table under the same id.
    async fn create_user(&self, user: User) -> PortalResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, email, role, department_id, batch, is_verified, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW()) RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(&user.department_id)
        .bind(&user.batch)
        .bind(user.is_verified)
        .fetch_one(&self.pool)
        .await
        .map_err(backend_error("create_user"))
    }

    async fn get_pending_crs(&self) -> PortalResult<Vec<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = $1 AND is_verified = false \
             ORDER BY created_at DESC"
        ))
        .bind(Role::Cr.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(backend_error("get_pending_crs"))
    }

    async fn mark_cr_verified(&self, id: Uuid) -> PortalResult<bool> {
        sqlx::query("UPDATE users SET is_verified = true WHERE id = $1 AND role = $2 AND is_verified = false")
            .bind(id)
            .bind(Role::Cr.as_str())
            .execute(&self.pool)
            .await
            .map(|res| res.rows_affected() > 0)
            .map_err(backend_error("mark_cr_verified"))
    }

    async fn delete_pending_cr(&self, id: Uuid) -> PortalResult<bool> {
        sqlx::query("DELETE FROM users WHERE id = $1 AND role = $2 AND is_verified = false")
            .bind(id)
            .bind(Role::Cr.as_str())
            .execute(&self.pool)
            .await
            .map(|res| res.rows_affected() > 0)
            .map_err(backend_error("delete_pending_cr"))
    }

    async fn get_notices(&self, department_id: &str, level: i32, term: i32) -> PortalResult<Vec<Notice>> {
        sqlx::query_as::<_, Notice>(&format!(
            "SELECT {NOTICE_COLUMNS} FROM notices \
             WHERE department_id = $1 AND level = $2 AND term = $3 ORDER BY created_at DESC"
        ))
        .bind(department_id)
        .bind(level)
        .bind(term)
        .fetch_all(&self.pool)
        .await
        .map_err(backend_error("get_notices"))
    }

    async fn get_notice(&self, id: Uuid) -> PortalResult<Option<Notice>> {
        sqlx::query_as::<_, Notice>(&format!("SELECT {NOTICE_COLUMNS} FROM notices WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_error("get_notice"))
    }

    async fn create_notice(&self, notice: ValidNotice, uploaded_by: Uuid) -> PortalResult<Notice> {
        sqlx::query_as::<_, Notice>(&format!(
            "INSERT INTO notices (id, title, content, department_id, level, term, uploaded_by, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW()) RETURNING {NOTICE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&notice.title)
        .bind(&notice.content)
        .bind(&notice.cohort.department_id)
        .bind(notice.cohort.level)
        .bind(notice.cohort.term)
        .bind(uploaded_by)
        .fetch_one(&self.pool)
        .await
        .map_err(backend_error("create_notice"))
    }

    async fn delete_notice(&self, id: Uuid) -> PortalResult<bool> {
        sqlx::query("DELETE FROM notices WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map(|res| res.rows_affected() > 0)
            .map_err(backend_error("delete_notice"))
    }

    async fn get_resources(
        &self,
        department_id: &str,
        level: i32,
        term: i32,
        folder: Option<&str>,
    ) -> PortalResult<Vec<Resource>> {
        let mut builder = sqlx::QueryBuilder::<sqlx::Postgres>::new(format!(
            "SELECT {RESOURCE_COLUMNS} FROM resources WHERE department_id = "
        ));
        builder.push_bind(department_id);
        builder.push(" AND level = ");
        builder.push_bind(level);
        builder.push(" AND term = ");
        builder.push_bind(term);
        if let Some(folder) = folder {
            builder.push(" AND folder = ");
            builder.push_bind(folder);
        }
        builder.push(" ORDER BY created_at DESC");

        builder
            .build_query_as::<Resource>()
            .fetch_all(&self.pool)
            .await
            .map_err(backend_error("get_resources"))
    }

    async fn get_resource(&self, id: Uuid) -> PortalResult<Option<Resource>> {
        sqlx::query_as::<_, Resource>(&format!("SELECT {RESOURCE_COLUMNS} FROM resources WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_error("get_resource"))
    }

    async fn create_resource(&self, resource: ValidResource, uploaded_by: Uuid) -> PortalResult<Resource> {
        sqlx::query_as::<_, Resource>(&format!(
            "INSERT INTO resources (id, title, type, url, folder, department_id, level, term, uploaded_by, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW()) RETURNING {RESOURCE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&resource.title)
        .bind(resource.resource_type.as_str())
        .bind(&resource.url)
        .bind(&resource.folder)
        .bind(&resource.cohort.department_id)
        .bind(resource.cohort.level)
        .bind(resource.cohort.term)
        .bind(uploaded_by)
        .fetch_one(&self.pool)
        .await
        .map_err(backend_error("create_resource"))
    }

    async fn delete_resource(&self, id: Uuid) -> PortalResult<bool> {
        sqlx::query("DELETE FROM resources WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map(|res| res.rows_affected() > 0)
            .map_err(backend_error("delete_resource"))
    }
}

/// InMemoryRepository
///
/// A process-local `Repository` for tests and offline demos. `fail_writes` makes every
/// mutating call fail the way an unreachable backend would.
#[derive(Default)]
pub struct InMemoryRepository {
    users: RwLock<Vec<User>>,
    notices: RwLock<Vec<Notice>>,
    resources: RwLock<Vec<Resource>>,
    fail_writes: AtomicBool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<User>) -> Self {
        Self {
            users: RwLock::new(users),
            ..Self::default()
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> PortalResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PortalError::backend("Backend unavailable: simulated write failure"));
        }
        Ok(())
    }
}

// Newest first; among equal timestamps the later insert wins.
fn newest_first<T: Clone>(rows: &[T], created_at: impl Fn(&T) -> chrono::DateTime<Utc>) -> Vec<T> {
    let mut out: Vec<T> = rows.iter().rev().cloned().collect();
    out.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    out
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: Uuid) -> PortalResult<Option<User>> {
        Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn create_user(&self, user: User) -> PortalResult<User> {
        self.check_writable()?;
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.id == user.id || u.email == user.email) {
            return Err(PortalError::backend("User already registered"));
        }
        let user = User {
            created_at: Utc::now(),
            ..user
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn get_pending_crs(&self) -> PortalResult<Vec<User>> {
        let users = self.users.read().await;
        let pending: Vec<User> = users
            .iter()
            .filter(|u| u.role == Role::Cr && !u.is_verified)
            .cloned()
            .collect();
        Ok(newest_first(&pending, |u| u.created_at))
    }

    async fn mark_cr_verified(&self, id: Uuid) -> PortalResult<bool> {
        self.check_writable()?;
        let mut users = self.users.write().await;
        match users
            .iter_mut()
            .find(|u| u.id == id && u.role == Role::Cr && !u.is_verified)
        {
            Some(user) => {
                user.is_verified = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_pending_cr(&self, id: Uuid) -> PortalResult<bool> {
        self.check_writable()?;
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|u| !(u.id == id && u.role == Role::Cr && !u.is_verified));
        Ok(users.len() < before)
    }

    async fn get_notices(&self, department_id: &str, level: i32, term: i32) -> PortalResult<Vec<Notice>> {
        let notices = self.notices.read().await;
        let scoped: Vec<Notice> = notices
            .iter()
            .filter(|n| n.department_id == department_id && n.level == level && n.term == term)
            .cloned()
            .collect();
        Ok(newest_first(&scoped, |n| n.created_at))
    }

    async fn get_notice(&self, id: Uuid) -> PortalResult<Option<Notice>> {
        Ok(self.notices.read().await.iter().find(|n| n.id == id).cloned())
    }

    async fn create_notice(&self, notice: ValidNotice, uploaded_by: Uuid) -> PortalResult<Notice> {
        self.check_writable()?;
        let row = Notice {
            id: Uuid::new_v4(),
            title: notice.title,
            content: notice.content,
            department_id: notice.cohort.department_id,
            level: notice.cohort.level,
            term: notice.cohort.term,
            uploaded_by,
            created_at: Utc::now(),
        };
        self.notices.write().await.push(row.clone());
        Ok(row)
    }

    async fn delete_notice(&self, id: Uuid) -> PortalResult<bool> {
        self.check_writable()?;
        let mut notices = self.notices.write().await;
        let before = notices.len();
        notices.retain(|n| n.id != id);
        Ok(notices.len() < before)
    }

    async fn get_resources(
        &self,
        department_id: &str,
        level: i32,
        term: i32,
        folder: Option<&str>,
    ) -> PortalResult<Vec<Resource>> {
        let resources = self.resources.read().await;
        let scoped: Vec<Resource> = resources
            .iter()
            .filter(|r| r.department_id == department_id && r.level == level && r.term == term)
            .filter(|r| folder.is_none_or(|f| r.folder == f))
            .cloned()
            .collect();
        Ok(newest_first(&scoped, |r| r.created_at))
    }

    async fn get_resource(&self, id: Uuid) -> PortalResult<Option<Resource>> {
        Ok(self.resources.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn create_resource(&self, resource: ValidResource, uploaded_by: Uuid) -> PortalResult<Resource> {
        self.check_writable()?;
        let row = Resource {
            id: Uuid::new_v4(),
            title: resource.title,
            resource_type: resource.resource_type,
            url: resource.url,
            folder: resource.folder,
            department_id: resource.cohort.department_id,
            level: resource.cohort.level,
            term: resource.cohort.term,
            uploaded_by,
            created_at: Utc::now(),
        };
        self.resources.write().await.push(row.clone());
        Ok(row)
    }

    async fn delete_resource(&self, id: Uuid) -> PortalResult<bool> {
        self.check_writable()?;
        let mut resources = self.resources.write().await;
        let before = resources.len();
        resources.retain(|r| r.id != id);
        Ok(resources.len() < before)
    }
}
