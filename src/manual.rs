use crate::activity::{Action, Activity, Notification};
use crate::coordinator::Write;
use crate::error::{Error, Result};
use crate::model::{FacultyId, FacultyMember, Project, ProjectId};
use serde::Deserialize;

/// Guide values understood as "remove the guide".
const UNASSIGN: &[&str] = &["", "null", "none", "unassign"];

/// Manual assignment request as received from the outer layer.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualAssignRequest {
    pub project_id: Option<String>,
    pub guide_id: Option<String>,
}

/// A validated manual assignment. No capacity check applies here: an
/// administrator may deliberately give a project to a full member.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ManualOverride {
    pub project: ProjectId,
    pub guide: Option<FacultyId>,
}

fn parse_id(field: &str, value: &str) -> Result<i64> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Validation(format!("{field} must be an integer, got {value:?}")))
}

impl<'a> TryFrom<&'a ManualAssignRequest> for ManualOverride {
    type Error = Error;

    fn try_from(request: &'a ManualAssignRequest) -> Result<Self> {
        let project = match request.project_id.as_deref().map(str::trim) {
            None | Some("") => return Err(Error::MissingProjectId),
            Some(id) => ProjectId(parse_id("projectId", id)?),
        };
        let guide = match request.guide_id.as_deref().map(str::trim) {
            None => None,
            Some(g) if UNASSIGN.contains(&g.to_ascii_lowercase().as_str()) => None,
            Some(g) => Some(FacultyId(parse_id("guideId", g)?)),
        };
        Ok(ManualOverride { project, guide })
    }
}

impl ManualOverride {
    /// Nothing to do when the project already has the requested guide.
    pub fn is_noop(&self, current: &Project) -> bool {
        current.guide == self.guide
    }

    pub fn action(&self, current: &Project) -> Action {
        match (current.guide, self.guide) {
            (_, None) => Action::GuideRemoved,
            (None, Some(_)) => Action::GuideAssigned,
            (Some(_), Some(_)) => Action::GuideChanged,
        }
    }

    /// Writes applying the override, to be committed in one batch.
    pub fn writes(
        &self,
        current: &Project,
        guide: Option<&FacultyMember>,
        actor: &str,
        notify: bool,
    ) -> Vec<Write> {
        let mut writes = vec![Write::SetGuide {
            project: self.project,
            guide: self.guide,
        }];
        let detail = match (current.guide, guide) {
            (Some(old), Some(new)) => format!("guide changed from {old} to {new} manually"),
            (None, Some(new)) => format!("{new} set as guide manually"),
            (Some(old), None) => format!("guide {old} removed manually"),
            (None, None) => "guide removed manually".to_owned(),
        };
        writes.push(Write::LogActivity(Activity {
            project: self.project,
            action: self.action(current),
            actor: actor.to_owned(),
            detail,
        }));
        if let (true, Some(guide)) = (notify, guide) {
            writes.push(Write::Notify(Notification {
                recipient: guide.id,
                message: format!("You have been made guide of project \"{current}\""),
            }));
        }
        writes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GroupId, ProjectStatus};

    fn request(project: Option<&str>, guide: Option<&str>) -> ManualAssignRequest {
        ManualAssignRequest {
            project_id: project.map(String::from),
            guide_id: guide.map(String::from),
        }
    }

    fn project(guide: Option<i64>) -> Project {
        Project {
            id: ProjectId(7),
            title: "Scheduler".into(),
            status: ProjectStatus::Approved,
            guide: guide.map(FacultyId),
            group: GroupId(7),
        }
    }

    #[test]
    fn missing_project_id() {
        for r in [request(None, Some("3")), request(Some("  "), Some("3"))] {
            assert!(matches!(
                ManualOverride::try_from(&r),
                Err(Error::MissingProjectId)
            ));
        }
    }

    #[test]
    fn unassign_sentinels() {
        for guide in [None, Some(""), Some("null"), Some("NONE"), Some("unassign")] {
            let o = ManualOverride::try_from(&request(Some("7"), guide)).unwrap();
            assert_eq!(o.guide, None);
        }
        let o = ManualOverride::try_from(&request(Some("7"), Some(" 12 "))).unwrap();
        assert_eq!(o.guide, Some(FacultyId(12)));
        assert!(matches!(
            ManualOverride::try_from(&request(Some("7"), Some("bob"))),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn request_from_json() {
        let r: ManualAssignRequest =
            serde_json::from_str(r#"{"projectId": "7", "guideId": null}"#).unwrap();
        let o = ManualOverride::try_from(&r).unwrap();
        assert_eq!(
            o,
            ManualOverride {
                project: ProjectId(7),
                guide: None
            }
        );
    }

    #[test]
    fn writes_leave_status_alone() {
        let o = ManualOverride {
            project: ProjectId(7),
            guide: Some(FacultyId(2)),
        };
        let guide = FacultyMember::new(FacultyId(2), "Grace".into(), "CS".into());
        let writes = o.writes(&project(Some(1)), Some(&guide), "admin:1", true);
        assert_eq!(writes.len(), 3);
        assert!(matches!(
            writes[0],
            Write::SetGuide {
                guide: Some(FacultyId(2)),
                ..
            }
        ));
        assert!(matches!(
            &writes[1],
            Write::LogActivity(Activity {
                action: Action::GuideChanged,
                ..
            })
        ));
        assert!(matches!(&writes[2], Write::Notify(n) if n.recipient == FacultyId(2)));
        assert!(!writes.iter().any(|w| matches!(w, Write::AssignGuide { .. })));
    }

    #[test]
    fn noop_detection() {
        let o = ManualOverride {
            project: ProjectId(7),
            guide: None,
        };
        assert!(o.is_noop(&project(None)));
        assert!(!o.is_noop(&project(Some(1))));
        assert_eq!(o.action(&project(Some(1))), Action::GuideRemoved);
    }
}
