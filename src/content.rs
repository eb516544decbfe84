use uuid::Uuid;

use crate::{
    error::{PortalError, PortalResult},
    models::{
        CreateNoticeRequest, CreateResourceRequest, Notice, Resource, UploadUrlRequest,
        UploadUrlResponse,
    },
    repository::RepositoryState,
    session::Session,
    storage::{StorageState, resource_key},
    validation::{Cohort, ValidNotice, ValidResource, ValidUpload},
};

const PENDING_MESSAGE: &str =
    "Your CR account is pending verification. You can upload once an admin approves it.";
const PUBLISH_DENIED_MESSAGE: &str = "Only verified CRs and teachers can publish content";

/// ContentService
///
/// Notices and resources of a department/level/term cohort. Reads are open to any
/// signed-in user; writes go through the publish and ownership rules below.
#[derive(Clone)]
pub struct ContentService {
    repo: RepositoryState,
    storage: StorageState,
}

impl ContentService {
    pub fn new(repo: RepositoryState, storage: StorageState) -> Self {
        Self { repo, storage }
    }

    /// Publishing requires a verified CR or a teacher, posting into their own department.
    fn authorize_publish(actor: &Session, cohort: &Cohort) -> PortalResult<()> {
        if actor.is_pending_cr() {
            return Err(PortalError::forbidden(PENDING_MESSAGE));
        }
        if !actor.can_publish() {
            return Err(PortalError::forbidden(PUBLISH_DENIED_MESSAGE));
        }
        if actor.department_id != cohort.department_id {
            tracing::warn!(
                user_id = %actor.id,
                own = %actor.department_id,
                target = %cohort.department_id,
                "cross-department publish refused"
            );
            return Err(PortalError::forbidden(
                "You can only publish to your own department",
            ));
        }
        Ok(())
    }

    fn authorize_delete(actor: &Session, owner: Uuid) -> PortalResult<()> {
        if actor.is_admin() || actor.id == owner {
            Ok(())
        } else {
            Err(PortalError::forbidden("Only the uploader or an admin can delete this"))
        }
    }

    pub async fn list_notices(&self, department_id: String, level: i32, term: i32) -> PortalResult<Vec<Notice>> {
        let cohort = Cohort::new(department_id, level, term)?;
        self.repo
            .get_notices(&cohort.department_id, cohort.level, cohort.term)
            .await
    }

    pub async fn list_resources(
        &self,
        department_id: String,
        level: i32,
        term: i32,
        folder: Option<&str>,
    ) -> PortalResult<Vec<Resource>> {
        let cohort = Cohort::new(department_id, level, term)?;
        self.repo
            .get_resources(&cohort.department_id, cohort.level, cohort.term, folder)
            .await
    }

    pub async fn create_notice(&self, actor: &Session, req: CreateNoticeRequest) -> PortalResult<Notice> {
        let notice = ValidNotice::try_from(req)?;
        Self::authorize_publish(actor, &notice.cohort)?;

        let created = self.repo.create_notice(notice, actor.id).await?;
        tracing::info!(notice_id = %created.id, user_id = %actor.id, "notice published");
        Ok(created)
    }

    pub async fn create_resource(&self, actor: &Session, req: CreateResourceRequest) -> PortalResult<Resource> {
        let resource = ValidResource::try_from(req)?;
        Self::authorize_publish(actor, &resource.cohort)?;

        let created = self.repo.create_resource(resource, actor.id).await?;
        tracing::info!(resource_id = %created.id, user_id = %actor.id, "resource published");
        Ok(created)
    }

    pub async fn delete_notice(&self, actor: &Session, id: Uuid) -> PortalResult<()> {
        let notice = self
            .repo
            .get_notice(id)
            .await?
            .ok_or_else(|| PortalError::NotFound("Notice not found".to_string()))?;
        Self::authorize_delete(actor, notice.uploaded_by)?;

        self.repo.delete_notice(id).await?;
        tracing::info!(notice_id = %id, user_id = %actor.id, "notice deleted");
        Ok(())
    }

    pub async fn delete_resource(&self, actor: &Session, id: Uuid) -> PortalResult<()> {
        let resource = self
            .repo
            .get_resource(id)
            .await?
            .ok_or_else(|| PortalError::NotFound("Resource not found".to_string()))?;
        Self::authorize_delete(actor, resource.uploaded_by)?;

        self.repo.delete_resource(id).await?;
        tracing::info!(resource_id = %id, user_id = %actor.id, "resource deleted");
        Ok(())
    }

    /// A short-lived upload URL for a resource file, plus the permanent `file_url` the
    /// client submits as the resource's `url` once the PUT succeeds.
    pub async fn upload_url(&self, actor: &Session, req: UploadUrlRequest) -> PortalResult<UploadUrlResponse> {
        let upload = ValidUpload::try_from(req)?;
        Self::authorize_publish(actor, &upload.cohort)?;

        let key = resource_key(&upload.cohort, &upload.extension);
        let upload_url = self
            .storage
            .get_presigned_upload_url(&key, &upload.content_type)
            .await?;

        Ok(UploadUrlResponse {
            upload_url,
            file_url: self.storage.public_url(&key),
            resource_key: key,
        })
    }
}
