use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    departments,
    error::{PortalError, PortalResult},
    models::{PendingCr, Role, User},
    repository::RepositoryState,
    session::Session,
};

/// VerificationState
///
/// Lifecycle of a CR account: `Pending` at signup, then either `Verified` by an approval
/// or `Removed` by a rejection. Both exits are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum VerificationState {
    Pending,
    Verified,
    Removed,
}

impl VerificationState {
    /// State of a CR record as read from the backend. A missing row counts as removed.
    pub fn of(user: Option<&User>) -> Self {
        match user {
            None => VerificationState::Removed,
            Some(u) if u.is_verified => VerificationState::Verified,
            Some(_) => VerificationState::Pending,
        }
    }
}

/// CrState
///
/// Where one CR account stands, as reported to the admin screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CrState {
    pub id: Uuid,
    pub state: VerificationState,
}

/// Transition
///
/// Whether an approve/reject changed anything. Repeating either on the same record
/// is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    Unchanged,
}

pub const APPROVED_MESSAGE: &str = "CR verified successfully!";
pub const REJECTED_MESSAGE: &str = "CR rejected and removed";
const LOAD_FAILED_MESSAGE: &str = "Failed to load pending CRs";

/// VerificationWorkflow
///
/// Admin-only transitions over pending CR accounts.
#[derive(Clone)]
pub struct VerificationWorkflow {
    repo: RepositoryState,
}

impl VerificationWorkflow {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    fn require_admin(actor: &Session) -> PortalResult<()> {
        if actor.is_admin() {
            Ok(())
        } else {
            tracing::warn!(user_id = %actor.id, role = %actor.role, "non-admin reached CR verification");
            Err(PortalError::admin_required())
        }
    }

    /// Pending CRs, newest first, each labelled with its department's full name.
    pub async fn list_pending(&self, actor: &Session) -> PortalResult<Vec<PendingCr>> {
        Self::require_admin(actor)?;
        let users = self.repo.get_pending_crs().await.map_err(|e| {
            tracing::error!("Failed to load pending CRs: {}", e);
            match e {
                PortalError::Backend(msg) if msg.trim().is_empty() => {
                    PortalError::backend(LOAD_FAILED_MESSAGE)
                }
                other => other,
            }
        })?;

        Ok(users
            .into_iter()
            .map(|u| PendingCr {
                department_name: departments::full_name(&u.department_id),
                id: u.id,
                email: u.email,
                department_id: u.department_id,
                batch: u.batch,
                created_at: u.created_at,
            })
            .collect())
    }

    /// Pending -> Verified.
    pub async fn approve(&self, actor: &Session, cr_id: Uuid) -> PortalResult<Transition> {
        Self::require_admin(actor)?;
        let changed = self.repo.mark_cr_verified(cr_id).await?;
        if changed {
            tracing::info!(admin_id = %actor.id, cr_id = %cr_id, "CR approved");
            Ok(Transition::Applied)
        } else {
            tracing::debug!(cr_id = %cr_id, "approve was a no-op");
            Ok(Transition::Unchanged)
        }
    }

    /// Pending -> Removed. The account row is deleted.
    pub async fn reject(&self, actor: &Session, cr_id: Uuid) -> PortalResult<Transition> {
        Self::require_admin(actor)?;
        let removed = self.repo.delete_pending_cr(cr_id).await?;
        if removed {
            tracing::info!(admin_id = %actor.id, cr_id = %cr_id, "CR rejected");
            Ok(Transition::Applied)
        } else {
            tracing::debug!(cr_id = %cr_id, "reject was a no-op");
            Ok(Transition::Unchanged)
        }
    }

    /// Current state of one account. Ids that are not CR accounts read as removed.
    pub async fn state_of(&self, actor: &Session, cr_id: Uuid) -> PortalResult<CrState> {
        Self::require_admin(actor)?;
        let user = self.repo.get_user(cr_id).await?;
        Ok(CrState {
            id: cr_id,
            state: VerificationState::of(user.as_ref().filter(|u| u.role == Role::Cr)),
        })
    }
}

/// PendingQueue
///
/// The admin screen's view of the pending list. It only changes after the backend
/// confirms a transition, and then it is re-fetched rather than patched locally.
#[derive(Debug, Clone, Default)]
pub struct PendingQueue {
    items: Vec<PendingCr>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[PendingCr] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub async fn refresh(&mut self, workflow: &VerificationWorkflow, actor: &Session) -> PortalResult<()> {
        self.items = workflow.list_pending(actor).await?;
        Ok(())
    }

    /// Approves, then reloads. On failure the list is left exactly as it was.
    pub async fn approve(
        &mut self,
        workflow: &VerificationWorkflow,
        actor: &Session,
        cr_id: Uuid,
    ) -> PortalResult<&'static str> {
        workflow.approve(actor, cr_id).await?;
        self.refresh(workflow, actor).await?;
        Ok(APPROVED_MESSAGE)
    }

    /// Rejects, then reloads. On failure the list is left exactly as it was.
    pub async fn reject(
        &mut self,
        workflow: &VerificationWorkflow,
        actor: &Session,
        cr_id: Uuid,
    ) -> PortalResult<&'static str> {
        workflow.reject(actor, cr_id).await?;
        self.refresh(workflow, actor).await?;
        Ok(REJECTED_MESSAGE)
    }
}
