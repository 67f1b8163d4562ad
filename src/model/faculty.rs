use super::ProjectId;
use serde::Serialize;
use std::fmt;

/// Maximum number of projects a faculty member may guide before being
/// skipped by automatic assignment.
pub const CAPACITY: usize = 5;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct FacultyId(pub i64);

impl fmt::Display for FacultyId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultyMember {
    pub id: FacultyId,
    pub name: String,
    pub department: String,
    /// Guided projects, ordered by project id.
    pub projects: Vec<ProjectId>,
}

impl FacultyMember {
    pub fn new(id: FacultyId, name: String, department: String) -> Self {
        Self {
            id,
            name,
            department,
            projects: Vec::new(),
        }
    }

    pub fn load(&self) -> usize {
        self.projects.len()
    }

    pub fn is_eligible(&self) -> bool {
        self.load() < CAPACITY
    }
}

impl fmt::Display for FacultyMember {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.department)
    }
}
