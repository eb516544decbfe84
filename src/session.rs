use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Role, User};

/// Session
///
/// The resolved identity of a signed-in user. This is what the role gate, the
/// navigation controller and the workflows receive instead of reading ambient state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Session {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub department_id: String,
    pub batch: Option<String>,
    pub is_verified: bool,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// A CR whose account an admin has not approved yet.
    pub fn is_pending_cr(&self) -> bool {
        self.role == Role::Cr && !self.is_verified
    }

    /// Verified CRs and teachers may create notices and resources.
    pub fn can_publish(&self) -> bool {
        match self.role {
            Role::Cr => self.is_verified,
            Role::Teacher => true,
            Role::Student | Role::Admin => false,
        }
    }
}

impl From<User> for Session {
    fn from(user: User) -> Self {
        Session {
            id: user.id,
            email: user.email,
            role: user.role,
            department_id: user.department_id,
            batch: user.batch,
            is_verified: user.is_verified,
        }
    }
}

/// SessionContext
///
/// Owns the session lifecycle for a client: empty until authentication succeeds,
/// emptied again on logout.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    current: Option<Session>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&mut self, session: Session) {
        tracing::debug!(user_id = %session.id, role = %session.role, "session started");
        self.current = Some(session);
    }

    /// Clears the session and returns the one that was active, if any.
    pub fn sign_out(&mut self) -> Option<Session> {
        let previous = self.current.take();
        if let Some(session) = &previous {
            tracing::debug!(user_id = %session.id, "session cleared");
        }
        previous
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn role(&self) -> Option<Role> {
        self.current.as_ref().map(|s| s.role)
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }
}
