use serde::Serialize;
use ts_rs::TS;
use utoipa::ToSchema;

/// Department
///
/// One entry of the canonical department table. Codes are the two digits embedded in
/// student email addresses (`u22<04>112@...`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Department {
    pub id: &'static str,
    pub short_name: &'static str,
    pub full_name: &'static str,
}

pub const DEPARTMENTS: [Department; 12] = [
    Department { id: "01", short_name: "ME", full_name: "Mechanical Engineering" },
    Department { id: "02", short_name: "EEE", full_name: "Electrical and Electronic Engineering" },
    Department { id: "03", short_name: "CE", full_name: "Civil Engineering" },
    Department { id: "04", short_name: "CSE", full_name: "Computer Science and Engineering" },
    Department { id: "05", short_name: "ETE", full_name: "Electronics and Telecommunication Engineering" },
    Department { id: "06", short_name: "IPE", full_name: "Industrial and Production Engineering" },
    Department { id: "07", short_name: "ChE", full_name: "Chemical Engineering" },
    Department { id: "08", short_name: "Arch", full_name: "Architecture" },
    Department { id: "09", short_name: "URP", full_name: "Urban and Regional Planning" },
    Department { id: "10", short_name: "BECM", full_name: "Building Engineering and Construction Management" },
    Department { id: "11", short_name: "MME", full_name: "Materials and Metallurgical Engineering" },
    Department { id: "12", short_name: "PME", full_name: "Petroleum and Mining Engineering" },
];

/// DepartmentLabel
///
/// Display names for any department id, known or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS, ToSchema)]
#[ts(export)]
pub struct DepartmentLabel {
    pub id: String,
    pub short_name: String,
    pub full_name: String,
    /// False when the labels were synthesized for an id outside the table.
    pub known: bool,
}

pub fn find(id: &str) -> Option<&'static Department> {
    DEPARTMENTS.iter().find(|dept| dept.id == id)
}

/// Short label, e.g. `CSE`. Unknown ids become `Dept {id}`.
pub fn short_name(id: &str) -> String {
    match find(id) {
        Some(dept) => dept.short_name.to_string(),
        None => format!("Dept {}", display_id(id)),
    }
}

/// Full label, e.g. `Computer Science and Engineering`. Unknown ids become `Department {id}`.
pub fn full_name(id: &str) -> String {
    match find(id) {
        Some(dept) => dept.full_name.to_string(),
        None => format!("Department {}", display_id(id)),
    }
}

pub fn label(id: &str) -> DepartmentLabel {
    DepartmentLabel {
        id: id.to_string(),
        short_name: short_name(id),
        full_name: full_name(id),
        known: find(id).is_some(),
    }
}

// Keeps the fallback label non-empty for a blank id.
fn display_id(id: &str) -> &str {
    let trimmed = id.trim();
    if trimmed.is_empty() { "unknown" } else { trimmed }
}
