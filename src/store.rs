use crate::error::{Error, Result};
use crate::model::{
    AcademicYear, AcademicYearId, FacultyId, FacultyMember, GroupId, Project, ProjectGroup,
    ProjectId, StudentId, StudentProfile,
};
use chrono::NaiveDate;
use sqlx::any::{AnyConnectOptions, AnyRow};
use sqlx::{AnyConnection, Connection, Row};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, trace};

const DATE_FORMAT: &str = "%Y-%m-%d";

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS faculty (
        id BIGINT NOT NULL PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        department VARCHAR(255) NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS project_groups (
        id BIGINT NOT NULL PRIMARY KEY,
        name VARCHAR(255) NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS students (
        id BIGINT NOT NULL PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        group_id BIGINT REFERENCES project_groups (id)
    )",
    "CREATE TABLE IF NOT EXISTS projects (
        id BIGINT NOT NULL PRIMARY KEY,
        title VARCHAR(255) NOT NULL,
        status VARCHAR(16) NOT NULL DEFAULT 'PROPOSED',
        guide_id BIGINT REFERENCES faculty (id),
        group_id BIGINT NOT NULL UNIQUE REFERENCES project_groups (id)
    )",
    "CREATE TABLE IF NOT EXISTS academic_years (
        id BIGINT NOT NULL PRIMARY KEY,
        name VARCHAR(255) NOT NULL UNIQUE,
        slug VARCHAR(255) NOT NULL UNIQUE,
        start_date VARCHAR(10) NOT NULL,
        end_date VARCHAR(10) NOT NULL,
        is_current BIGINT NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS activity_log (
        project_id BIGINT NOT NULL,
        action VARCHAR(32) NOT NULL,
        actor VARCHAR(255) NOT NULL,
        detail VARCHAR(1024) NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS notifications (
        faculty_id BIGINT NOT NULL,
        message VARCHAR(1024) NOT NULL,
        is_read BIGINT NOT NULL DEFAULT 0
    )",
];

/// Access to the relational store. Every read goes to the database, no
/// state is cached between calls.
pub struct Store {
    conn: AnyConnection,
}

impl Store {
    pub async fn new(url: &str) -> Result<Self> {
        sqlx::any::install_default_drivers();
        Ok(Self {
            conn: AnyConnection::connect_with(&AnyConnectOptions::from_str(url)?).await?,
        })
    }

    pub fn connection(&mut self) -> &mut AnyConnection {
        &mut self.conn
    }

    pub async fn create_schema(&mut self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&mut self.conn).await?;
        }
        debug!(tables = SCHEMA.len(), "Schema is in place");
        Ok(())
    }

    /// Load faculty members ordered by id, each with the ordered list of
    /// projects they currently guide.
    pub async fn load_faculty(&mut self) -> Result<Vec<FacultyMember>> {
        let mut faculty = sqlx::query("SELECT id, name, department FROM faculty ORDER BY id")
            .map(|row: AnyRow| faculty_from_row(&row))
            .fetch_all(&mut self.conn)
            .await?
            .into_iter()
            .collect::<Result<Vec<_>>>()?;
        let guided = self.load_guided().await?;
        for member in &mut faculty {
            member.projects = guided
                .iter()
                .filter_map(|&(p, f)| if f == member.id { Some(p) } else { None })
                .collect();
            trace!(member = %member, load = member.load(), "Faculty member loaded");
        }
        Ok(faculty)
    }

    async fn load_guided(&mut self) -> Result<Vec<(ProjectId, FacultyId)>> {
        sqlx::query("SELECT id, guide_id FROM projects WHERE guide_id IS NOT NULL ORDER BY id")
            .map(|row: AnyRow| -> Result<_> {
                Ok((
                    ProjectId(row.try_get("id")?),
                    FacultyId(row.try_get("guide_id")?),
                ))
            })
            .fetch_all(&mut self.conn)
            .await?
            .into_iter()
            .collect()
    }

    pub async fn faculty_member(&mut self, id: FacultyId) -> Result<Option<FacultyMember>> {
        let member = sqlx::query("SELECT id, name, department FROM faculty WHERE id = ?")
            .bind(id.0)
            .map(|row: AnyRow| faculty_from_row(&row))
            .fetch_optional(&mut self.conn)
            .await?
            .transpose()?;
        let Some(mut member) = member else {
            return Ok(None);
        };
        member.projects = sqlx::query("SELECT id FROM projects WHERE guide_id = ? ORDER BY id")
            .bind(id.0)
            .map(|row: AnyRow| row.try_get("id").map(ProjectId))
            .fetch_all(&mut self.conn)
            .await?
            .into_iter()
            .collect::<Result<_, _>>()?;
        Ok(Some(member))
    }

    pub async fn load_projects(&mut self) -> Result<Vec<Project>> {
        sqlx::query("SELECT id, title, status, guide_id, group_id FROM projects ORDER BY id")
            .map(|row: AnyRow| project_from_row(&row))
            .fetch_all(&mut self.conn)
            .await?
            .into_iter()
            .collect()
    }

    /// Projects waiting for a guide, in id order.
    pub async fn load_unassigned_projects(&mut self) -> Result<Vec<Project>> {
        sqlx::query(
            "SELECT id, title, status, guide_id, group_id FROM projects
             WHERE guide_id IS NULL AND status = 'PROPOSED' ORDER BY id",
        )
        .map(|row: AnyRow| project_from_row(&row))
        .fetch_all(&mut self.conn)
        .await?
        .into_iter()
        .collect()
    }

    pub async fn project(&mut self, id: ProjectId) -> Result<Option<Project>> {
        sqlx::query("SELECT id, title, status, guide_id, group_id FROM projects WHERE id = ?")
            .bind(id.0)
            .map(|row: AnyRow| project_from_row(&row))
            .fetch_optional(&mut self.conn)
            .await?
            .transpose()
    }

    pub async fn load_groups(&mut self) -> Result<HashMap<GroupId, ProjectGroup>> {
        let mut groups = sqlx::query("SELECT id, name FROM project_groups ORDER BY id")
            .map(|row: AnyRow| -> Result<_> {
                let id = GroupId(row.try_get("id")?);
                Ok((
                    id,
                    ProjectGroup {
                        id,
                        name: row.try_get("name")?,
                        members: Vec::new(),
                    },
                ))
            })
            .fetch_all(&mut self.conn)
            .await?
            .into_iter()
            .collect::<Result<HashMap<_, _>>>()?;
        let students = sqlx::query(
            "SELECT id, name, group_id FROM students WHERE group_id IS NOT NULL ORDER BY id",
        )
        .map(|row: AnyRow| -> Result<_> {
            Ok((
                GroupId(row.try_get("group_id")?),
                StudentProfile {
                    id: StudentId(row.try_get("id")?),
                    name: row.try_get("name")?,
                },
            ))
        })
        .fetch_all(&mut self.conn)
        .await?;
        for student in students {
            let (group, student) = student?;
            if let Some(group) = groups.get_mut(&group) {
                group.members.push(student);
            }
        }
        Ok(groups)
    }

    pub async fn academic_years(&mut self) -> Result<Vec<AcademicYear>> {
        sqlx::query(
            "SELECT id, name, slug, start_date, end_date, is_current FROM academic_years ORDER BY id",
        )
        .map(|row: AnyRow| academic_year_from_row(&row))
        .fetch_all(&mut self.conn)
        .await?
        .into_iter()
        .collect()
    }

    pub async fn academic_year(&mut self, id: AcademicYearId) -> Result<Option<AcademicYear>> {
        sqlx::query(
            "SELECT id, name, slug, start_date, end_date, is_current FROM academic_years WHERE id = ?",
        )
        .bind(id.0)
        .map(|row: AnyRow| academic_year_from_row(&row))
        .fetch_optional(&mut self.conn)
        .await?
        .transpose()
    }
}

fn faculty_from_row(row: &AnyRow) -> Result<FacultyMember> {
    Ok(FacultyMember::new(
        FacultyId(row.try_get("id")?),
        row.try_get("name")?,
        row.try_get("department")?,
    ))
}

fn project_from_row(row: &AnyRow) -> Result<Project> {
    Ok(Project {
        id: ProjectId(row.try_get("id")?),
        title: row.try_get("title")?,
        status: row.try_get::<String, _>("status")?.parse()?,
        guide: row.try_get::<Option<i64>, _>("guide_id")?.map(FacultyId),
        group: GroupId(row.try_get("group_id")?),
    })
}

fn academic_year_from_row(row: &AnyRow) -> Result<AcademicYear> {
    Ok(AcademicYear {
        id: AcademicYearId(row.try_get("id")?),
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        start: parse_date(&row.try_get::<String, _>("start_date")?)?,
        end: parse_date(&row.try_get::<String, _>("end_date")?)?,
        is_current: row.try_get::<i64, _>("is_current")? != 0,
    })
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| Error::Storage(sqlx::Error::Decode(Box::new(e))))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use crate::model::ProjectStatus;

    #[tokio::test]
    async fn faculty_comes_with_guided_projects() {
        let mut store = memory().await;
        let a = add_faculty(&mut store, 1, "Ada").await;
        let b = add_faculty(&mut store, 2, "Brian").await;
        add_load(&mut store, b, 10, 2).await;
        add_project(&mut store, 20, ProjectStatus::Proposed, None).await;
        let faculty = store.load_faculty().await.unwrap();
        assert_eq!(
            faculty.iter().map(|f| (f.id, f.load())).collect::<Vec<_>>(),
            vec![(a, 0), (b, 2)]
        );
        let unassigned = store.load_unassigned_projects().await.unwrap();
        assert_eq!(unassigned.len(), 1);
        assert!(unassigned[0].is_unassigned());
    }

    #[tokio::test]
    async fn unassigned_excludes_other_statuses() {
        let mut store = memory().await;
        add_project(&mut store, 1, ProjectStatus::Rejected, None).await;
        add_project(&mut store, 2, ProjectStatus::Proposed, None).await;
        let ids = store
            .load_unassigned_projects()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id.0)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![2]);
    }

    #[tokio::test]
    async fn groups_have_members() {
        let mut store = memory().await;
        add_project(&mut store, 4, ProjectStatus::Proposed, None).await;
        let groups = store.load_groups().await.unwrap();
        let group = &groups[&crate::model::GroupId(4)];
        assert_eq!(group.members.len(), 1);
        assert_eq!(group.members[0].name, "Student 4");
    }

    #[tokio::test]
    async fn years_round_trip_dates() {
        let mut store = memory().await;
        add_year(&mut store, 1, "Y1", true).await;
        let year = store
            .academic_year(crate::model::AcademicYearId(1))
            .await
            .unwrap()
            .unwrap();
        assert!(year.is_current);
        assert_eq!(super::format_date(year.start), "2025-09-01");
        assert_eq!(store.current_academic_years().await.unwrap().len(), 1);
    }
}
