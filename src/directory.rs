use serde::Serialize;
use utoipa::ToSchema;

use crate::{models::Role, session::Session};

/// Folder
///
/// A top-level entry of the resource directory shown on the main dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Folder {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

/// Subfolder
///
/// Second level of the directory, opened from a folder view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Subfolder {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

/// Course
///
/// A course in the teacher dashboard. Its level/term select the cohort a teacher posts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Course {
    pub id: &'static str,
    pub code: &'static str,
    pub name: &'static str,
    pub level: i32,
    pub term: i32,
    pub students: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LevelTerms {
    pub level: i32,
    pub terms: Vec<i32>,
}

pub const UPLOAD_FOLDER_ID: &str = "upload";

pub const FOLDERS: [Folder; 4] = [
    Folder { id: "resources", name: "Resources", description: "Past papers, CT questions, and senior notes" },
    Folder { id: "materials", name: "Class Materials", description: "Lecture slides and course materials" },
    Folder { id: "sources", name: "Sources", description: "Journal links, YouTube videos, and demos" },
    Folder { id: "notes", name: "Notes", description: "Student-uploaded notes and study materials" },
];

const UPLOAD_FOLDER: Folder = Folder {
    id: UPLOAD_FOLDER_ID,
    name: "Upload (CR Only)",
    description: "Upload notices and resources",
};

const RESOURCES: [Subfolder; 4] = [
    Subfolder { id: "past-papers", name: "5 Years Term Questions", description: "Past exam papers collection" },
    Subfolder { id: "ct-questions", name: "Last Year CT Questions", description: "Class test questions" },
    Subfolder { id: "last-year-materials", name: "Class Materials of Last Year", description: "Previous year resources" },
    Subfolder { id: "chothas", name: "Chothas (Senior Notes)", description: "Top-rated senior notes" },
];

const MATERIALS: [Subfolder; 5] = [
    Subfolder { id: "dbms", name: "Database Management Systems", description: "DBMS lecture slides" },
    Subfolder { id: "java", name: "JAVA Programming", description: "JAVA course materials" },
    Subfolder { id: "dsp", name: "Digital Signal Processing", description: "DSP slides and notes" },
    Subfolder { id: "machine", name: "Machine Learning", description: "ML course content" },
    Subfolder { id: "math", name: "Mathematics", description: "Math lecture slides" },
];

const SOURCES: [Subfolder; 5] = [
    Subfolder { id: "dbms-sources", name: "DBMS Resources", description: "Journals, videos, demos" },
    Subfolder { id: "java-sources", name: "JAVA Resources", description: "Video tutorials and demos" },
    Subfolder { id: "dsp-sources", name: "DSP Resources", description: "External learning resources" },
    Subfolder { id: "machine-sources", name: "ML Resources", description: "Machine learning tutorials" },
    Subfolder { id: "math-sources", name: "Math Resources", description: "Math video lectures" },
];

const NOTES: [Subfolder; 5] = [
    Subfolder { id: "dbms-notes", name: "DBMS Student Notes", description: "Upload and view notes" },
    Subfolder { id: "java-notes", name: "JAVA Student Notes", description: "Community shared notes" },
    Subfolder { id: "dsp-notes", name: "DSP Student Notes", description: "Student contributions" },
    Subfolder { id: "machine-notes", name: "ML Student Notes", description: "Collaborative notes" },
    Subfolder { id: "math-notes", name: "Math Student Notes", description: "Peer-reviewed notes" },
];

pub const COURSES: [Course; 4] = [
    Course { id: "cse4101", code: "CSE 4101", name: "Database Management Systems", level: 4, term: 1, students: 120 },
    Course { id: "cse3201", code: "CSE 3201", name: "Data Structures and Algorithms", level: 3, term: 2, students: 135 },
    Course { id: "cse4102", code: "CSE 4102", name: "Software Engineering", level: 4, term: 1, students: 118 },
    Course { id: "cse2101", code: "CSE 2101", name: "Object Oriented Programming", level: 2, term: 1, students: 145 },
];

pub const LEVELS: std::ops::RangeInclusive<i32> = 1..=4;
pub const TERMS: std::ops::RangeInclusive<i32> = 1..=2;

/// Folders visible on the main dashboard. Only a CR session sees the upload entry.
pub fn folders_for(session: Option<&Session>) -> Vec<Folder> {
    let mut folders = FOLDERS.to_vec();
    if session.is_some_and(|s| s.role == Role::Cr) {
        folders.push(UPLOAD_FOLDER);
    }
    folders
}

/// Subfolders of a content folder. Unknown folders have no content.
pub fn subfolders(folder_id: &str) -> &'static [Subfolder] {
    match folder_id {
        "resources" => &RESOURCES,
        "materials" => &MATERIALS,
        "sources" => &SOURCES,
        "notes" => &NOTES,
        _ => &[],
    }
}

pub fn is_content_folder(folder_id: &str) -> bool {
    FOLDERS.iter().any(|folder| folder.id == folder_id)
}

pub fn level_terms() -> Vec<LevelTerms> {
    LEVELS
        .map(|level| LevelTerms {
            level,
            terms: TERMS.collect(),
        })
        .collect()
}

pub fn is_valid_cohort(level: i32, term: i32) -> bool {
    LEVELS.contains(&level) && TERMS.contains(&term)
}

pub fn course(id: &str) -> Option<&'static Course> {
    COURSES.iter().find(|course| course.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn session(role: Role) -> Session {
        Session {
            id: Uuid::nil(),
            email: "u2204112@student.cuet.ac.bd".to_string(),
            role,
            department_id: "04".to_string(),
            batch: Some("22".to_string()),
            is_verified: true,
        }
    }

    #[test]
    fn upload_folder_is_cr_only() {
        let cr = session(Role::Cr);
        assert!(folders_for(Some(&cr)).iter().any(|f| f.id == UPLOAD_FOLDER_ID));
        for role in [Role::Student, Role::Teacher, Role::Admin] {
            let s = session(role);
            assert!(folders_for(Some(&s)).iter().all(|f| f.id != UPLOAD_FOLDER_ID));
        }
        assert_eq!(folders_for(None).len(), FOLDERS.len());
    }

    #[test]
    fn unknown_folder_is_empty() {
        assert!(subfolders("nope").is_empty());
        assert!(subfolders(UPLOAD_FOLDER_ID).is_empty());
        assert_eq!(subfolders("resources")[0].id, "past-papers");
    }

    #[test]
    fn level_term_grid_is_four_by_two() {
        let grid = level_terms();
        assert_eq!(grid.len(), 4);
        assert!(grid.iter().all(|row| row.terms == vec![1, 2]));
        assert!(is_valid_cohort(4, 2));
        assert!(!is_valid_cohort(5, 1));
        assert!(!is_valid_cohort(1, 3));
    }

    #[test]
    fn courses_are_looked_up_by_id() {
        assert_eq!(course("cse3201").map(|c| c.level), Some(3));
        assert!(course("cse9999").is_none());
    }
}
