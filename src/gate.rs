use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::session::Session;

/// Route
///
/// The declared set of screens. Screens are addressed by a fixed path plus query
/// parameters, never by path segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum Route {
    Welcome,
    Auth,
    DepartmentDashboard,
    LevelSelection,
    MainDashboard,
    FolderView,
    ContentView,
    CrUpload,
    AdminVerification,
    TeacherDashboard,
    TeacherCourse,
    NotFound,
}

impl Route {
    pub const ALL: [Route; 12] = [
        Route::Welcome,
        Route::Auth,
        Route::DepartmentDashboard,
        Route::LevelSelection,
        Route::MainDashboard,
        Route::FolderView,
        Route::ContentView,
        Route::CrUpload,
        Route::AdminVerification,
        Route::TeacherDashboard,
        Route::TeacherCourse,
        Route::NotFound,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Welcome => "/",
            Route::Auth => "/auth",
            Route::DepartmentDashboard => "/dashboard",
            Route::LevelSelection => "/level-selection",
            Route::MainDashboard => "/main-dashboard",
            Route::FolderView => "/folder-view",
            Route::ContentView => "/content-view",
            Route::CrUpload => "/cr-upload",
            Route::AdminVerification => "/admin-verification",
            Route::TeacherDashboard => "/teacher-dashboard",
            Route::TeacherCourse => "/teacher-course",
            Route::NotFound => "/not-found",
        }
    }

    /// Any path outside the declared set resolves to the not-found screen.
    pub fn from_path(path: &str) -> Route {
        Route::ALL
            .into_iter()
            .find(|route| route.path() == path)
            .unwrap_or(Route::NotFound)
    }

    /// Screens that require a signed-in user.
    pub fn is_protected(&self) -> bool {
        !matches!(self, Route::Welcome | Route::Auth | Route::NotFound)
    }
}

/// Access
///
/// The role gate's decision for one (session, route) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(tag = "decision", rename_all = "snake_case")]
#[ts(export)]
pub enum Access {
    Allow,
    /// The screen renders, but in its blocking "pending verification" state with every
    /// write action disabled.
    PendingVerification,
    RedirectTo { route: Route },
    /// Surfaced as an access-denied notice, then redirected.
    Deny { redirect_to: Route },
}

impl Access {
    /// Whether the requested screen itself is rendered.
    pub fn renders(&self) -> bool {
        matches!(self, Access::Allow | Access::PendingVerification)
    }

    pub fn writes_enabled(&self) -> bool {
        matches!(self, Access::Allow)
    }
}

/// can_access
///
/// Pure, total decision over every declared route:
/// - anonymous users are sent to the auth screen from any protected route;
/// - only admins reach admin verification, everyone else is denied and sent home;
/// - an unverified CR reaches the upload screen in its pending state;
/// - everything else is allowed.
pub fn can_access(session: Option<&Session>, route: Route) -> Access {
    let Some(session) = session else {
        return if route.is_protected() {
            Access::RedirectTo { route: Route::Auth }
        } else {
            Access::Allow
        };
    };

    match route {
        Route::AdminVerification if !session.is_admin() => Access::Deny {
            redirect_to: Route::Welcome,
        },
        Route::CrUpload if session.is_pending_cr() => Access::PendingVerification,
        _ => Access::Allow,
    }
}
