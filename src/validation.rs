use regex::Regex;

use crate::{
    directory,
    error::{PortalError, PortalResult},
    models::{
        CreateNoticeRequest, CreateResourceRequest, LoginRequest, ResourceType, Role,
        SignupRequest, UploadUrlRequest,
    },
};

const MIN_PASSWORD_LEN: usize = 6;

/// File extensions accepted for uploaded resource files.
pub const UPLOAD_EXTENSIONS: [&str; 6] = ["pdf", "doc", "docx", "ppt", "pptx", "zip"];

/// EmailValidator
///
/// Institution email rules:
/// - students (and CRs): `u<7 digits>@student.<domain>`
/// - teachers: `<lowercase letters>@<domain>`
#[derive(Debug, Clone)]
pub struct EmailValidator {
    domain: String,
    student: Regex,
    teacher: Regex,
}

impl EmailValidator {
    pub fn new(domain: &str) -> Result<Self, regex::Error> {
        let escaped = regex::escape(domain);
        Ok(Self {
            domain: domain.to_string(),
            student: Regex::new(&format!(r"^u\d{{7}}@student\.{escaped}$"))?,
            teacher: Regex::new(&format!(r"^[a-z]+@{escaped}$"))?,
        })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Whether `email` has the shape required for `role`. Admin accounts are never
    /// matched: they are provisioned outside signup.
    pub fn validate(&self, email: &str, role: Role) -> bool {
        match role {
            Role::Student | Role::Cr => self.student.is_match(email),
            Role::Teacher => self.teacher.is_match(email),
            Role::Admin => false,
        }
    }

    /// The message shown when `validate` rejects an email.
    pub fn expected_format(&self, role: Role) -> String {
        match role {
            Role::Student | Role::Cr => format!(
                "Please use valid student email format: u2204112@student.{}",
                self.domain
            ),
            Role::Teacher => format!("Please use valid teacher email format: name@{}", self.domain),
            Role::Admin => "Admin accounts cannot sign up or log in with this form".to_string(),
        }
    }

    /// Validates a signup form into a `ValidSignup`.
    pub fn signup(&self, req: SignupRequest) -> PortalResult<ValidSignup> {
        if req.role == Role::Admin {
            return Err(PortalError::validation(
                "Admin accounts cannot be created through signup",
            ));
        }
        if !self.validate(&req.email, req.role) {
            return Err(PortalError::validation(self.expected_format(req.role)));
        }
        check_password(&req.password)?;
        if req.password != req.confirm_password {
            return Err(PortalError::validation("Passwords do not match"));
        }

        let (department_id, batch) = match req.role {
            Role::Student | Role::Cr => {
                let parsed = StudentEmail::parse(&req.email).ok_or_else(|| {
                    PortalError::validation(self.expected_format(req.role))
                })?;
                (parsed.department_id, Some(parsed.batch))
            }
            _ => {
                let dept = req
                    .department_id
                    .map(|d| d.trim().to_string())
                    .filter(|d| is_department_code(d))
                    .ok_or_else(|| {
                        PortalError::validation("Teachers must select a two-digit department code")
                    })?;
                (dept, None)
            }
        };

        Ok(ValidSignup {
            email: req.email,
            password: req.password,
            role: req.role,
            department_id,
            batch,
        })
    }

    /// Validates a login form. The claimed role is the login tab, not the profile role.
    pub fn login(&self, req: LoginRequest) -> PortalResult<ValidLogin> {
        if !self.validate(&req.email, req.role) {
            return Err(PortalError::validation(
                "Invalid email format for selected user type",
            ));
        }
        if req.password.is_empty() {
            return Err(PortalError::validation("Password is required"));
        }
        Ok(ValidLogin {
            email: req.email,
            password: req.password,
        })
    }
}

/// StudentEmail
///
/// The segments of `u<batch:2><dept:2><roll:3>@student.<domain>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentEmail {
    pub batch: String,
    pub department_id: String,
    pub roll: String,
}

impl StudentEmail {
    pub fn parse(email: &str) -> Option<Self> {
        let local = email.split_once('@')?.0;
        let digits = local.strip_prefix('u')?;
        if digits.len() != 7 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(StudentEmail {
            batch: digits[0..2].to_string(),
            department_id: digits[2..4].to_string(),
            roll: digits[4..7].to_string(),
        })
    }
}

fn is_department_code(code: &str) -> bool {
    code.len() == 2 && code.chars().all(|c| c.is_ascii_digit())
}

fn check_password(password: &str) -> PortalResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PortalError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn required(value: String, field: &str) -> PortalResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PortalError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

// --- Validated inputs ---

#[derive(Debug, Clone, PartialEq)]
pub struct ValidSignup {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub department_id: String,
    pub batch: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidLogin {
    pub email: String,
    pub password: String,
}

/// Cohort
///
/// The department/level/term key a notice or resource belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cohort {
    pub department_id: String,
    pub level: i32,
    pub term: i32,
}

impl Cohort {
    pub fn new(department_id: String, level: i32, term: i32) -> PortalResult<Self> {
        let department_id = required(department_id, "Department")?;
        if !directory::is_valid_cohort(level, term) {
            return Err(PortalError::validation(format!(
                "Level {level} Term {term} does not exist"
            )));
        }
        Ok(Cohort {
            department_id,
            level,
            term,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidNotice {
    pub title: String,
    pub content: String,
    pub cohort: Cohort,
}

impl TryFrom<CreateNoticeRequest> for ValidNotice {
    type Error = PortalError;

    fn try_from(req: CreateNoticeRequest) -> PortalResult<Self> {
        Ok(ValidNotice {
            title: required(req.title, "Title")?,
            content: required(req.content, "Content")?,
            cohort: Cohort::new(req.department_id, req.level, req.term)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidResource {
    pub title: String,
    pub resource_type: ResourceType,
    pub url: String,
    pub folder: String,
    pub cohort: Cohort,
}

impl TryFrom<CreateResourceRequest> for ValidResource {
    type Error = PortalError;

    fn try_from(req: CreateResourceRequest) -> PortalResult<Self> {
        let title = required(req.title, "Title")?;
        let url = required(req.url, "URL")?;
        match url::Url::parse(&url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            _ => return Err(PortalError::validation("Resource URL must be an http(s) link")),
        }
        if !directory::is_content_folder(&req.folder) {
            return Err(PortalError::validation(format!(
                "Unknown folder '{}'",
                req.folder
            )));
        }
        Ok(ValidResource {
            title,
            resource_type: req.resource_type,
            url,
            folder: req.folder,
            cohort: Cohort::new(req.department_id, req.level, req.term)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidUpload {
    pub extension: String,
    pub content_type: String,
    pub cohort: Cohort,
}

impl TryFrom<UploadUrlRequest> for ValidUpload {
    type Error = PortalError;

    fn try_from(req: UploadUrlRequest) -> PortalResult<Self> {
        let extension = std::path::Path::new(&req.filename)
            .extension()
            .and_then(std::ffi::OsStr::to_str)
            .map(str::to_ascii_lowercase)
            .filter(|ext| UPLOAD_EXTENSIONS.contains(&ext.as_str()))
            .ok_or_else(|| {
                PortalError::validation("Supported formats: PDF, DOC, DOCX, PPT, PPTX, ZIP")
            })?;
        Ok(ValidUpload {
            extension,
            content_type: required(req.file_type, "File type")?,
            cohort: Cohort::new(req.department_id, req.level, req.term)?,
        })
    }
}
