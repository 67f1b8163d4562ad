use crate::model::{FacultyId, ProjectId};
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Action {
    GuideAssigned,
    GuideChanged,
    GuideRemoved,
    GuideDetached,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::GuideAssigned => "guide_assigned",
            Action::GuideChanged => "guide_changed",
            Action::GuideRemoved => "guide_removed",
            Action::GuideDetached => "guide_detached",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Activity log entry attached to a project.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Activity {
    pub project: ProjectId,
    pub action: Action,
    pub actor: String,
    pub detail: String,
}

/// Message left to a faculty member.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notification {
    pub recipient: FacultyId,
    pub message: String,
}
