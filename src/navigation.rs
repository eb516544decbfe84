use serde::{Deserialize, Serialize};
use ts_rs::TS;
use url::form_urlencoded;
use utoipa::ToSchema;

use crate::{
    directory::{self, UPLOAD_FOLDER_ID},
    gate::{Access, Route},
    models::Role,
    session::Session,
};

/// Location
///
/// A screen plus the query state that addresses it
/// (`dept`, `level`, `term`, `folder`, `subfolder`, `courseId`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Location {
    pub route: Route,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dept: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subfolder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,
}

impl Location {
    pub fn new(route: Route) -> Self {
        Location {
            route,
            dept: None,
            level: None,
            term: None,
            folder: None,
            subfolder: None,
            course_id: None,
        }
    }

    pub fn welcome() -> Self {
        Location::new(Route::Welcome)
    }

    /// The screen path followed by its non-empty query parameters.
    pub fn url(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        if let Some(dept) = &self.dept {
            query.append_pair("dept", dept);
        }
        if let Some(level) = self.level {
            query.append_pair("level", &level.to_string());
        }
        if let Some(term) = self.term {
            query.append_pair("term", &term.to_string());
        }
        if let Some(folder) = &self.folder {
            query.append_pair("folder", folder);
        }
        if let Some(subfolder) = &self.subfolder {
            query.append_pair("subfolder", subfolder);
        }
        if let Some(course_id) = &self.course_id {
            query.append_pair("courseId", course_id);
        }

        let query = query.finish();
        if query.is_empty() {
            self.route.path().to_string()
        } else {
            format!("{}?{}", self.route.path(), query)
        }
    }

    /// Parses a screen URL. Unknown paths give the not-found screen, unparsable numbers
    /// and unknown parameters are dropped.
    pub fn from_url(url: &str) -> Self {
        let (path, query) = url.split_once('?').unwrap_or((url, ""));
        let mut location = Location::new(Route::from_path(path));

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "dept" => location.dept = Some(value.into_owned()),
                "level" => location.level = value.parse().ok(),
                "term" => location.term = value.parse().ok(),
                "folder" => location.folder = Some(value.into_owned()),
                "subfolder" => location.subfolder = Some(value.into_owned()),
                "courseId" => location.course_id = Some(value.into_owned()),
                _ => {}
            }
        }
        location
    }

    fn cohort(&self, route: Route) -> Location {
        Location {
            route,
            dept: self.dept.clone(),
            level: self.level,
            term: self.term,
            ..Location::new(route)
        }
    }
}

/// NavAction
///
/// A user action on the current screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
#[ts(export)]
pub enum NavAction {
    SelectDepartment { dept: String },
    SelectLevelTerm { level: i32, term: i32 },
    /// Opening the `upload` entry leads to the CR upload screen.
    OpenFolder { folder: String },
    OpenSubfolder { subfolder: String },
    OpenCourse { course_id: String },
    Back,
}

/// next_location
///
/// Derives the next screen from the current one and an action. No server trip and no
/// side effects. `Back` is not recomputed here: the `Navigator` resolves it from its
/// stack, so this function returns the current location for it.
pub fn next_location(current: &Location, action: &NavAction) -> Location {
    match action {
        NavAction::SelectDepartment { dept } => Location {
            dept: Some(dept.clone()),
            ..Location::new(Route::LevelSelection)
        },
        NavAction::SelectLevelTerm { level, term } => Location {
            level: Some(*level),
            term: Some(*term),
            ..current.cohort(Route::MainDashboard)
        },
        NavAction::OpenFolder { folder } if folder == UPLOAD_FOLDER_ID => {
            current.cohort(Route::CrUpload)
        }
        NavAction::OpenFolder { folder } => Location {
            folder: Some(folder.clone()),
            ..current.cohort(Route::FolderView)
        },
        NavAction::OpenSubfolder { subfolder } => Location {
            folder: current.folder.clone(),
            subfolder: Some(subfolder.clone()),
            ..current.cohort(Route::ContentView)
        },
        NavAction::OpenCourse { course_id } => {
            let course = directory::course(course_id);
            Location {
                course_id: Some(course_id.clone()),
                level: course.map(|c| c.level),
                term: course.map(|c| c.term),
                ..Location::new(Route::TeacherCourse)
            }
        }
        NavAction::Back => current.clone(),
    }
}

/// landing_for
///
/// Where a user goes right after authenticating. Students and CRs start at level
/// selection for the department embedded in their profile.
pub fn landing_for(session: &Session) -> Location {
    match session.role {
        Role::Student | Role::Cr => Location {
            dept: Some(session.department_id.clone()),
            ..Location::new(Route::LevelSelection)
        },
        Role::Teacher => Location::new(Route::TeacherDashboard),
        Role::Admin => Location::new(Route::AdminVerification),
    }
}

/// Navigator
///
/// Holds the current location and the back stack.
#[derive(Debug, Clone)]
pub struct Navigator {
    current: Location,
    history: Vec<Location>,
}

impl Default for Navigator {
    fn default() -> Self {
        Navigator::new(Location::welcome())
    }
}

impl Navigator {
    pub fn new(start: Location) -> Self {
        Navigator {
            current: start,
            history: Vec::new(),
        }
    }

    pub fn from_parts(current: Location, history: Vec<Location>) -> Self {
        Navigator { current, history }
    }

    pub fn into_parts(self) -> (Location, Vec<Location>) {
        (self.current, self.history)
    }

    pub fn current(&self) -> &Location {
        &self.current
    }

    pub fn history(&self) -> &[Location] {
        &self.history
    }

    /// Applies an action. `Back` pops the previous location; with nothing to pop the
    /// navigator stays where it is.
    pub fn apply(&mut self, action: &NavAction) -> &Location {
        match action {
            NavAction::Back => {
                if let Some(previous) = self.history.pop() {
                    self.current = previous;
                }
            }
            forward => {
                let next = next_location(&self.current, forward);
                let previous = std::mem::replace(&mut self.current, next);
                self.history.push(previous);
            }
        }
        &self.current
    }

    /// Replaces the whole stack, e.g. after login or logout.
    pub fn reset(&mut self, start: Location) {
        self.current = start;
        self.history.clear();
    }
}

// --- HTTP payloads ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NavigationRequest {
    pub current: Location,
    #[serde(default)]
    pub history: Vec<Location>,
    pub action: NavAction,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NavigationResponse {
    pub location: Location,
    pub history: Vec<Location>,
    pub url: String,
    /// The role gate's decision for the caller on the new location.
    pub access: Access,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_dashboard() -> Location {
        Location::from_url("/main-dashboard?dept=04&level=3&term=1")
    }

    #[test]
    fn selecting_department_then_level_term_builds_dashboard_url() {
        let mut nav = Navigator::default();
        nav.apply(&NavAction::SelectDepartment { dept: "04".into() });
        assert_eq!(nav.current().url(), "/level-selection?dept=04");

        nav.apply(&NavAction::SelectLevelTerm { level: 3, term: 1 });
        assert_eq!(nav.current().url(), "/main-dashboard?dept=04&level=3&term=1");
    }

    #[test]
    fn folder_and_subfolder_carry_the_cohort() {
        let folder = next_location(&at_dashboard(), &NavAction::OpenFolder { folder: "resources".into() });
        assert_eq!(folder.url(), "/folder-view?dept=04&level=3&term=1&folder=resources");

        let content = next_location(&folder, &NavAction::OpenSubfolder { subfolder: "past-papers".into() });
        assert_eq!(
            content.url(),
            "/content-view?dept=04&level=3&term=1&folder=resources&subfolder=past-papers"
        );
    }

    #[test]
    fn upload_folder_opens_cr_upload() {
        let next = next_location(&at_dashboard(), &NavAction::OpenFolder { folder: UPLOAD_FOLDER_ID.into() });
        assert_eq!(next.route, Route::CrUpload);
        assert_eq!(next.folder, None);
        assert_eq!(next.url(), "/cr-upload?dept=04&level=3&term=1");
    }

    #[test]
    fn back_pops_the_previous_state() {
        let mut nav = Navigator::new(at_dashboard());
        nav.apply(&NavAction::OpenFolder { folder: "notes".into() });
        nav.apply(&NavAction::OpenSubfolder { subfolder: "dbms-notes".into() });

        assert_eq!(nav.apply(&NavAction::Back).route, Route::FolderView);
        assert_eq!(nav.apply(&NavAction::Back), &at_dashboard());
        // Nothing left to pop.
        assert_eq!(nav.apply(&NavAction::Back), &at_dashboard());
        assert!(nav.history().is_empty());
    }

    #[test]
    fn reset_drops_the_back_stack() {
        let mut nav = Navigator::new(at_dashboard());
        nav.apply(&NavAction::OpenFolder { folder: "notes".into() });

        nav.reset(Location::welcome());
        assert_eq!(nav.current().route, Route::Welcome);
        assert_eq!(nav.apply(&NavAction::Back).route, Route::Welcome);
    }

    #[test]
    fn course_selection_uses_the_course_cohort() {
        let next = next_location(
            &Location::new(Route::TeacherDashboard),
            &NavAction::OpenCourse { course_id: "cse3201".into() },
        );
        assert_eq!(next.url(), "/teacher-course?level=3&term=2&courseId=cse3201");

        let unknown = next_location(
            &Location::new(Route::TeacherDashboard),
            &NavAction::OpenCourse { course_id: "zzz".into() },
        );
        assert_eq!(unknown.level, None);
    }

    #[test]
    fn urls_round_trip_through_the_parser() {
        let location = Location {
            subfolder: Some("a b&c".into()),
            folder: Some("notes".into()),
            ..at_dashboard().cohort(Route::ContentView)
        };
        assert_eq!(Location::from_url(&location.url()), location);
        assert_eq!(Location::from_url("/bogus?dept=04").route, Route::NotFound);
        assert_eq!(Location::from_url("/main-dashboard?level=x").level, None);
    }
}
