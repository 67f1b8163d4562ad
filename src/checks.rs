use crate::model::{
    AcademicYear, AcademicYearId, CAPACITY, FacultyId, FacultyMember, Project, ProjectId,
};
use serde::Serialize;
use tracing::warn;

/// Invariant violations found in the persisted state. Manual overrides
/// and concurrent writers outside of this tool can produce them.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Findings {
    pub over_capacity: Vec<(FacultyId, usize)>,
    pub guideless_not_proposed: Vec<ProjectId>,
    pub current_years: Vec<AcademicYearId>,
}

impl Findings {
    pub fn is_clean(&self) -> bool {
        self.over_capacity.is_empty()
            && self.guideless_not_proposed.is_empty()
            && self.current_years.len() <= 1
    }
}

pub fn inspect(
    faculty: &[FacultyMember],
    projects: &[Project],
    years: &[AcademicYear],
) -> Findings {
    Findings {
        over_capacity: faculty
            .iter()
            .filter(|f| f.load() > CAPACITY)
            .map(|f| (f.id, f.load()))
            .collect(),
        guideless_not_proposed: projects
            .iter()
            .filter(|p| p.guide.is_none() && !p.is_unassigned())
            .map(|p| p.id)
            .collect(),
        current_years: years.iter().filter(|y| y.is_current).map(|y| y.id).collect(),
    }
}

pub fn report(findings: &Findings) {
    for (member, load) in &findings.over_capacity {
        warn!(%member, load, "Faculty member guides more projects than allowed");
    }
    for project in &findings.guideless_not_proposed {
        warn!(%project, "Project has no guide but is no longer proposed");
    }
    if findings.current_years.len() > 1 {
        warn!(
            years = ?findings.current_years,
            "More than one academic year is current"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GroupId, ProjectStatus};
    use chrono::NaiveDate;

    fn year(id: i64, is_current: bool) -> AcademicYear {
        AcademicYear {
            id: AcademicYearId(id),
            name: format!("Y{id}"),
            slug: format!("y{id}"),
            start: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2026, 6, 30).unwrap(),
            is_current,
        }
    }

    #[test]
    fn detects_violations() {
        let mut full = FacultyMember::new(FacultyId(1), "Ada".into(), "CS".into());
        full.projects = (0..6).map(ProjectId).collect();
        let mut at_capacity = FacultyMember::new(FacultyId(2), "Brian".into(), "CS".into());
        at_capacity.projects = (10..15).map(ProjectId).collect();
        let orphan = Project {
            id: ProjectId(20),
            title: "Orphan".into(),
            status: ProjectStatus::InProgress,
            guide: None,
            group: GroupId(1),
        };
        let findings = inspect(
            &[full, at_capacity],
            &[orphan],
            &[year(1, true), year(2, true), year(3, false)],
        );
        assert_eq!(findings.over_capacity, vec![(FacultyId(1), 6)]);
        assert_eq!(findings.guideless_not_proposed, vec![ProjectId(20)]);
        assert_eq!(
            findings.current_years,
            vec![AcademicYearId(1), AcademicYearId(2)]
        );
        assert!(!findings.is_clean());
    }

    #[test]
    fn clean_state() {
        assert!(inspect(&[], &[], &[year(1, true)]).is_clean());
    }
}
