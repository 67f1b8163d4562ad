use crate::load::FacultyLoad;
use crate::model::{CAPACITY, FacultyId, ProjectId};
use serde::Serialize;
use tracing::{debug, instrument, trace};

/// Outcome of one planning call. Nothing is written until the plan is
/// handed to the coordinator.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub assignments: Vec<(ProjectId, FacultyId)>,
    pub unassigned: Vec<ProjectId>,
}

impl Plan {
    pub fn assigned_count(&self) -> usize {
        self.assignments.len()
    }

    pub fn unassigned_count(&self) -> usize {
        self.unassigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn projects_for(&self, guide: FacultyId) -> Vec<ProjectId> {
        self.assignments
            .iter()
            .filter_map(|&(p, f)| if f == guide { Some(p) } else { None })
            .collect()
    }
}

/// Greedy round-robin over the faculty list. Ties are broken by list
/// order; the cursor starts at the first member for every batch.
pub struct RoundRobin {
    faculty: Vec<FacultyId>,
    loads: Vec<usize>,
    cursor: usize,
}

impl RoundRobin {
    /// Takes the eligible members in list order, each seeded with its
    /// persisted load.
    pub fn new(eligible: &[FacultyLoad]) -> Self {
        let (faculty, loads) = eligible.iter().map(|l| (l.member, l.load)).unzip();
        Self {
            faculty,
            loads,
            cursor: 0,
        }
    }

    /// Scan at most one full turn from the cursor for a member still
    /// under capacity, and charge the project to it.
    fn next_guide(&mut self) -> Option<FacultyId> {
        let n = self.faculty.len();
        for step in 0..n {
            let idx = (self.cursor + step) % n;
            if self.loads[idx] < CAPACITY {
                self.loads[idx] += 1;
                self.cursor = (idx + 1) % n;
                return Some(self.faculty[idx]);
            }
        }
        None
    }

    #[instrument(skip_all, fields(projects = projects.len(), faculty = self.faculty.len()))]
    pub fn plan(mut self, projects: &[ProjectId]) -> Plan {
        let mut plan = Plan::default();
        if self.faculty.is_empty() {
            debug!("No eligible faculty member, nothing to plan");
            plan.unassigned = projects.to_vec();
            return plan;
        }
        for &project in projects {
            match self.next_guide() {
                Some(guide) => {
                    trace!(%project, %guide, "Planning guide assignment");
                    plan.assignments.push((project, guide));
                }
                None => {
                    trace!(%project, "Every faculty member is at capacity");
                    plan.unassigned.push(project);
                }
            }
        }
        debug!(
            assigned = plan.assigned_count(),
            unassigned = plan.unassigned_count(),
            "Round-robin plan computed"
        );
        plan
    }
}
