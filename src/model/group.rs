use serde::Serialize;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct GroupId(pub i64);

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct StudentId(pub i64);

#[derive(Clone, Debug, Serialize)]
pub struct StudentProfile {
    pub id: StudentId,
    pub name: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ProjectGroup {
    pub id: GroupId,
    pub name: String,
    pub members: Vec<StudentProfile>,
}

impl fmt::Display for ProjectGroup {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
