use crate::activity::{Action, Activity, Notification};
use crate::algos::{Plan, RoundRobin};
use crate::checks::{self, Findings};
use crate::coordinator::{self, Write};
use crate::error::{Error, Result};
use crate::load::{self, FacultyLoad};
use crate::manual::{ManualAssignRequest, ManualOverride};
use crate::model::{
    AcademicYear, AcademicYearId, AcademicYearUpdate, FacultyId, FacultyMember, GroupId, Principal,
    Project, ProjectGroup, ProjectId,
};
use crate::singleton::ACADEMIC_YEAR_CURRENT;
use crate::store::Store;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoAssignReport {
    pub assigned_count: usize,
    #[serde(skip)]
    pub plan: Plan,
    #[serde(skip)]
    pub committed: bool,
}

/// Entry point of the three operation surfaces: automatic assignment,
/// manual override and current academic year maintenance.
pub struct Engine<'a> {
    store: &'a mut Store,
    principal: Option<Principal>,
    notify: bool,
}

impl<'a> Engine<'a> {
    pub fn new(store: &'a mut Store, principal: Option<Principal>, notify: bool) -> Engine<'a> {
        Engine {
            store,
            principal,
            notify,
        }
    }

    fn actor(&self) -> String {
        Principal::actor(self.principal.as_ref())
    }

    pub async fn create_schema(&mut self) -> Result<()> {
        self.store.create_schema().await
    }

    pub async fn loads(&mut self) -> Result<(Vec<FacultyMember>, Vec<FacultyLoad>)> {
        let faculty = self.store.load_faculty().await?;
        let loads = load::calculate(&faculty);
        Ok((faculty, loads))
    }

    pub async fn check(&mut self) -> Result<Findings> {
        let faculty = self.store.load_faculty().await?;
        let projects = self.store.load_projects().await?;
        let years = self.store.academic_years().await?;
        Ok(checks::inspect(&faculty, &projects, &years))
    }

    /// Read the current state, plan with the round-robin policy and commit
    /// the whole plan at once. With `dry_run`, the plan is returned without
    /// being written.
    #[instrument(skip(self))]
    pub async fn auto_assign(&mut self, dry_run: bool) -> Result<AutoAssignReport> {
        let (faculty, loads) = self.loads().await?;
        let projects = self.store.load_unassigned_projects().await?;
        let ids = projects.iter().map(|p| p.id).collect::<Vec<_>>();
        let plan = RoundRobin::new(&load::eligible(&loads)).plan(&ids);
        if plan.is_empty() {
            info!(
                unassigned_projects = ids.len(),
                "No project can be assigned automatically"
            );
            return Ok(AutoAssignReport {
                assigned_count: 0,
                plan,
                committed: false,
            });
        }
        if dry_run {
            info!(
                assigned = plan.assigned_count(),
                "Dry run, plan not committed"
            );
            return Ok(AutoAssignReport {
                assigned_count: plan.assigned_count(),
                plan,
                committed: false,
            });
        }
        let groups = self.store.load_groups().await?;
        let writes = self.assignment_writes(&plan, &faculty, &projects, &groups);
        coordinator::commit(self.store.connection(), &writes).await?;
        info!(
            assigned = plan.assigned_count(),
            left_unassigned = plan.unassigned_count(),
            "Guides assigned"
        );
        Ok(AutoAssignReport {
            assigned_count: plan.assigned_count(),
            plan,
            committed: true,
        })
    }

    /// Run the automatic assignment, planning again from scratch when a
    /// batch has been invalidated by a concurrent change.
    pub async fn auto_assign_with_attempts(
        &mut self,
        dry_run: bool,
        attempts: u32,
    ) -> Result<AutoAssignReport> {
        let mut attempt = 1;
        loop {
            match self.auto_assign(dry_run).await {
                Err(e) if e.is_retryable() && attempt < attempts => {
                    warn!(attempt, error = %e, "Stale plan, planning again");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    fn assignment_writes(
        &self,
        plan: &Plan,
        faculty: &[FacultyMember],
        projects: &[Project],
        groups: &HashMap<GroupId, ProjectGroup>,
    ) -> Vec<Write> {
        let faculty = faculty
            .iter()
            .map(|f| (f.id, f))
            .collect::<HashMap<FacultyId, _>>();
        let projects = projects
            .iter()
            .map(|p| (p.id, p))
            .collect::<HashMap<ProjectId, _>>();
        let actor = self.actor();
        let mut writes = Vec::new();
        for &(p, f) in &plan.assignments {
            let (project, guide) = (projects[&p], faculty[&f]);
            writes.push(Write::AssignGuide {
                project: p,
                guide: f,
            });
            writes.push(Write::LogActivity(Activity {
                project: p,
                action: Action::GuideAssigned,
                actor: actor.clone(),
                detail: format!("{guide} assigned as guide automatically"),
            }));
            if self.notify {
                let message = match groups.get(&project.group) {
                    Some(group) => format!(
                        "You have been assigned as guide of project \"{project}\" (group {group}, {} students)",
                        group.members.len()
                    ),
                    None => format!("You have been assigned as guide of project \"{project}\""),
                };
                writes.push(Write::Notify(Notification {
                    recipient: f,
                    message,
                }));
            }
        }
        writes
    }

    /// Set or clear the guide of a project. Capacity is not checked.
    #[instrument(skip_all)]
    pub async fn manual_assign(&mut self, request: &ManualAssignRequest) -> Result<Project> {
        let manual = ManualOverride::try_from(request)?;
        let current = self
            .store
            .project(manual.project)
            .await?
            .ok_or_else(|| Error::not_found("project", manual.project.0))?;
        let guide = match manual.guide {
            Some(id) => Some(
                self.store
                    .faculty_member(id)
                    .await?
                    .ok_or_else(|| Error::not_found("faculty member", id.0))?,
            ),
            None => None,
        };
        if manual.is_noop(&current) {
            debug!(project = %current, "Guide already as requested");
            return Ok(current);
        }
        if let Some(guide) = guide.as_ref().filter(|g| !g.is_eligible()) {
            info!(
                project = %current,
                guide = %guide,
                load = guide.load(),
                "Manual assignment to a faculty member at capacity"
            );
        }
        let writes = manual.writes(&current, guide.as_ref(), &self.actor(), self.notify);
        coordinator::commit(self.store.connection(), &writes).await?;
        info!(
            project = %current,
            action = %manual.action(&current),
            "Guide changed manually"
        );
        self.store
            .project(manual.project)
            .await?
            .ok_or_else(|| Error::not_found("project", manual.project.0))
    }

    /// Update an academic year. When it becomes current, every other year
    /// stops being current within the same transaction.
    #[instrument(skip_all)]
    pub async fn set_academic_year(&mut self, update: &AcademicYearUpdate) -> Result<AcademicYear> {
        let id = update
            .id
            .ok_or_else(|| Error::Validation("missing yearId".into()))?;
        let year = self.fetch_year(id).await?;
        let updated = update.apply_to(&year)?;
        let mut writes = vec![Write::UpdateAcademicYear(updated.clone())];
        writes.extend(ACADEMIC_YEAR_CURRENT.writes(id.0, updated.is_current));
        self.commit_year(&writes, &updated).await?;
        let holders = ACADEMIC_YEAR_CURRENT
            .holders(self.store.connection())
            .await?;
        debug!(?holders, "Current academic years after update");
        if holders.is_empty() {
            warn!(year = %updated, "No academic year is current anymore");
        }
        self.fetch_year(id).await
    }

    #[instrument(skip_all)]
    pub async fn create_academic_year(&mut self, year: &AcademicYear) -> Result<AcademicYear> {
        year.validate()?;
        let mut writes = vec![Write::InsertAcademicYear(year.clone())];
        if year.is_current {
            writes.extend(ACADEMIC_YEAR_CURRENT.claim(year.id.0));
        }
        self.commit_year(&writes, year).await?;
        info!(year = %year, current = year.is_current, "Academic year created");
        self.fetch_year(year.id).await
    }

    /// Deleting the current year leaves no current year behind.
    #[instrument(skip_all)]
    pub async fn delete_academic_year(&mut self, id: AcademicYearId) -> Result<AcademicYear> {
        let year = self.fetch_year(id).await?;
        coordinator::commit(
            self.store.connection(),
            &[Write::DeleteAcademicYear(id)],
        )
        .await?;
        if year.is_current {
            warn!(year = %year, "Current academic year deleted, no year is current anymore");
        } else {
            info!(year = %year, "Academic year deleted");
        }
        Ok(year)
    }

    /// Delete a faculty member. Guided projects are kept and lose their
    /// guide.
    #[instrument(skip_all)]
    pub async fn delete_faculty(&mut self, id: FacultyId) -> Result<Vec<ProjectId>> {
        let member = self
            .store
            .faculty_member(id)
            .await?
            .ok_or_else(|| Error::not_found("faculty member", id.0))?;
        let actor = self.actor();
        let mut writes = vec![Write::DetachGuide(id)];
        writes.extend(member.projects.iter().map(|&project| {
            Write::LogActivity(Activity {
                project,
                action: Action::GuideDetached,
                actor: actor.clone(),
                detail: format!("guide {member} deleted"),
            })
        }));
        writes.push(Write::DeleteFaculty(id));
        coordinator::commit(self.store.connection(), &writes).await?;
        info!(
            member = %member,
            detached_projects = member.projects.len(),
            "Faculty member deleted"
        );
        Ok(member.projects)
    }

    async fn fetch_year(&mut self, id: AcademicYearId) -> Result<AcademicYear> {
        self.store
            .academic_year(id)
            .await?
            .ok_or_else(|| Error::not_found("academic year", id.0))
    }

    async fn commit_year(&mut self, writes: &[Write], year: &AcademicYear) -> Result<()> {
        match coordinator::commit(self.store.connection(), writes).await {
            Err(Error::BatchCommit { source, .. }) if source.is_unique_violation() => {
                Err(Error::Conflict(format!(
                    "academic year {} collides with an existing one (name {:?}, slug {:?})",
                    year.id, year.name, year.slug
                )))
            }
            result => result,
        }
    }
}
