use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::navigation::Location;

// --- Enumerations ---

/// Role
///
/// The RBAC field of a user profile. Immutable after signup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    Student,
    Teacher,
    /// Class Representative: a student with write privileges once verified by an admin.
    Cr,
    Admin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Student, Role::Teacher, Role::Cr, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Cr => "cr",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl TryFrom<String> for Role {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == value)
            .ok_or(ParseEnumError { kind: "role", value })
    }
}

/// ResourceType
///
/// What a resource's `url` points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ResourceType {
    #[default]
    Pdf,
    Video,
    Link,
    Document,
}

impl ResourceType {
    pub const ALL: [ResourceType; 4] = [
        ResourceType::Pdf,
        ResourceType::Video,
        ResourceType::Link,
        ResourceType::Document,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Pdf => "pdf",
            ResourceType::Video => "video",
            ResourceType::Link => "link",
            ResourceType::Document => "document",
        }
    }
}

impl TryFrom<String> for ResourceType {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ResourceType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or(ParseEnumError {
                kind: "resource type",
                value,
            })
    }
}

// --- Core Rows (Mapped to the backend's tables) ---

/// User
///
/// A profile row of the `users` table, created at signup. `is_verified` only ever
/// moves false -> true through an admin approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub department_id: String,
    pub batch: Option<String>,
    pub is_verified: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Notice
///
/// A row of the `notices` table, scoped to one department/level/term cohort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Notice {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub department_id: String,
    pub level: i32,
    pub term: i32,
    pub uploaded_by: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Resource
///
/// A row of the `resources` table. `folder` is one of the top-level directory folders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Resource {
    pub id: Uuid,
    pub title: String,
    // `type` is a reserved keyword in Rust.
    #[serde(rename = "type")]
    #[sqlx(rename = "type", try_from = "String")]
    pub resource_type: ResourceType,
    pub url: String,
    pub folder: String,
    pub department_id: String,
    pub level: i32,
    pub term: i32,
    pub uploaded_by: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Request Payloads ---

/// SignupRequest
///
/// Raw signup form. The password is forwarded to the identity service and never stored here.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SignupRequest {
    #[schema(example = "u2204112@student.cuet.ac.bd")]
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub role: Role,
    /// Required for teachers, ignored for students (derived from the email).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// The login tab the user picked: `student` or `teacher`.
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateNoticeRequest {
    pub title: String,
    pub content: String,
    pub department_id: String,
    pub level: i32,
    pub term: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateResourceRequest {
    pub title: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub url: String,
    pub folder: String,
    pub department_id: String,
    pub level: i32,
    pub term: i32,
}

/// UploadUrlRequest
///
/// Asks for a short-lived upload URL for a resource file in the caller's cohort.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UploadUrlRequest {
    #[schema(example = "dbms_lab_manual.pdf")]
    pub filename: String,
    #[schema(example = "application/pdf")]
    pub file_type: String,
    pub department_id: String,
    pub level: i32,
    pub term: i32,
}

// --- Response Payloads ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UploadUrlResponse {
    /// Presigned PUT, valid for ten minutes.
    pub upload_url: String,
    pub resource_key: String,
    /// Where the uploaded file is read from. Submit it as the resource's `url`.
    pub file_url: String,
}

/// AuthResponse
///
/// Result of signup/login: the profile, the bearer token (absent when the identity
/// service requires email confirmation first) and the landing screen.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AuthResponse {
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    pub next: Location,
    pub url: String,
}

/// PendingCr
///
/// A CR account awaiting verification, enriched with the department's display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PendingCr {
    pub id: Uuid,
    pub email: String,
    pub department_id: String,
    pub department_name: String,
    pub batch: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// VerificationResponse
///
/// Outcome of an approve/reject together with the freshly re-fetched pending list.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct VerificationResponse {
    pub message: String,
    pub pending: Vec<PendingCr>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LogoutResponse {
    pub next: Location,
    pub url: String,
}
