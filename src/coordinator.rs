use crate::activity::{Activity, Notification};
use crate::error::{Error, Result, WriteFailure};
use crate::model::{AcademicYear, AcademicYearId, CAPACITY, FacultyId, ProjectId};
use crate::singleton::SingletonFlag;
use crate::store::format_date;
use sqlx::{AnyConnection, Connection};
use tracing::{debug, instrument, trace, warn};

/// Guarded assignment: the project must still wait for a guide and the
/// member must still be under capacity when the write lands.
const ASSIGN_GUIDE: &str = "UPDATE projects SET guide_id = ?, status = 'APPROVED'
    WHERE id = ? AND guide_id IS NULL AND status = 'PROPOSED'
    AND (SELECT n FROM (SELECT COUNT(*) AS n FROM projects WHERE guide_id = ?) AS guided) < ?";

/// One write of a coordinated batch.
#[derive(Clone, Debug)]
pub enum Write {
    /// Automatic assignment, sets the project as approved.
    AssignGuide {
        project: ProjectId,
        guide: FacultyId,
    },
    /// Manual override. The status is left untouched.
    SetGuide {
        project: ProjectId,
        guide: Option<FacultyId>,
    },
    /// Drop every reference to a faculty member.
    DetachGuide(FacultyId),
    DeleteFaculty(FacultyId),
    InsertAcademicYear(AcademicYear),
    /// Update everything but the current flag.
    UpdateAcademicYear(AcademicYear),
    DeleteAcademicYear(AcademicYearId),
    ClearFlag {
        flag: &'static SingletonFlag,
        keep: i64,
    },
    SetFlag {
        flag: &'static SingletonFlag,
        id: i64,
        value: bool,
    },
    LogActivity(Activity),
    Notify(Notification),
}

impl Write {
    async fn apply(&self, conn: &mut AnyConnection) -> Result<(), WriteFailure> {
        match self {
            Write::AssignGuide { project, guide } => {
                let done = sqlx::query(ASSIGN_GUIDE)
                    .bind(guide.0)
                    .bind(project.0)
                    .bind(guide.0)
                    .bind(CAPACITY as i64)
                    .execute(&mut *conn)
                    .await?;
                if done.rows_affected() == 0 {
                    return Err(WriteFailure::Stale(format!(
                        "project {project} cannot be given to faculty member {guide} anymore"
                    )));
                }
            }
            Write::SetGuide {
                project,
                guide: Some(guide),
            } => {
                sqlx::query("UPDATE projects SET guide_id = ? WHERE id = ?")
                    .bind(guide.0)
                    .bind(project.0)
                    .execute(&mut *conn)
                    .await?;
            }
            Write::SetGuide {
                project,
                guide: None,
            } => {
                sqlx::query("UPDATE projects SET guide_id = NULL WHERE id = ?")
                    .bind(project.0)
                    .execute(&mut *conn)
                    .await?;
            }
            Write::DetachGuide(guide) => {
                sqlx::query("UPDATE projects SET guide_id = NULL WHERE guide_id = ?")
                    .bind(guide.0)
                    .execute(&mut *conn)
                    .await?;
            }
            Write::DeleteFaculty(id) => {
                let done = sqlx::query("DELETE FROM faculty WHERE id = ?")
                    .bind(id.0)
                    .execute(&mut *conn)
                    .await?;
                if done.rows_affected() == 0 {
                    return Err(WriteFailure::Stale(format!(
                        "faculty member {id} does not exist anymore"
                    )));
                }
            }
            Write::InsertAcademicYear(year) => {
                sqlx::query(
                    "INSERT INTO academic_years (id, name, slug, start_date, end_date, is_current)
                     VALUES (?, ?, ?, ?, ?, 0)",
                )
                .bind(year.id.0)
                .bind(year.name.as_str())
                .bind(year.slug.as_str())
                .bind(format_date(year.start))
                .bind(format_date(year.end))
                .execute(&mut *conn)
                .await?;
            }
            Write::UpdateAcademicYear(year) => {
                sqlx::query(
                    "UPDATE academic_years SET name = ?, slug = ?, start_date = ?, end_date = ?
                     WHERE id = ?",
                )
                .bind(year.name.as_str())
                .bind(year.slug.as_str())
                .bind(format_date(year.start))
                .bind(format_date(year.end))
                .bind(year.id.0)
                .execute(&mut *conn)
                .await?;
            }
            Write::DeleteAcademicYear(id) => {
                let done = sqlx::query("DELETE FROM academic_years WHERE id = ?")
                    .bind(id.0)
                    .execute(&mut *conn)
                    .await?;
                if done.rows_affected() == 0 {
                    return Err(WriteFailure::Stale(format!(
                        "academic year {id} does not exist anymore"
                    )));
                }
            }
            Write::ClearFlag { flag, keep } => {
                let done = sqlx::query(&flag.clear_others_sql())
                    .bind(*keep)
                    .execute(&mut *conn)
                    .await?;
                trace!(
                    entity = flag.entity,
                    keep,
                    cleared = done.rows_affected(),
                    "Flag cleared on other records"
                );
            }
            Write::SetFlag { flag, id, value } => {
                sqlx::query(&flag.set_sql())
                    .bind(i64::from(*value))
                    .bind(*id)
                    .execute(&mut *conn)
                    .await?;
            }
            Write::LogActivity(activity) => {
                sqlx::query(
                    "INSERT INTO activity_log (project_id, action, actor, detail) VALUES (?, ?, ?, ?)",
                )
                .bind(activity.project.0)
                .bind(activity.action.as_str())
                .bind(activity.actor.as_str())
                .bind(activity.detail.as_str())
                .execute(&mut *conn)
                .await?;
            }
            Write::Notify(notification) => {
                sqlx::query("INSERT INTO notifications (faculty_id, message) VALUES (?, ?)")
                    .bind(notification.recipient.0)
                    .bind(notification.message.as_str())
                    .execute(&mut *conn)
                    .await?;
            }
        }
        Ok(())
    }
}

/// Apply every write in a single transaction. On the first failing write
/// the transaction is rolled back and nothing is visible to other readers.
#[instrument(skip_all, fields(writes = writes.len()))]
pub async fn commit(conn: &mut AnyConnection, writes: &[Write]) -> Result<()> {
    if writes.is_empty() {
        debug!("Empty batch, nothing to commit");
        return Ok(());
    }
    let mut trans = conn.begin().await?;
    for (index, write) in writes.iter().enumerate() {
        if let Err(source) = write.apply(&mut trans).await {
            warn!(index, error = %source, "Write failed, rolling back batch");
            if let Err(e) = trans.rollback().await {
                warn!(error = %e, "Error when rolling back transaction");
            }
            return Err(Error::BatchCommit {
                index,
                total: writes.len(),
                source,
            });
        }
    }
    trans.commit().await.map_err(|e| {
        warn!(error = %e, "Batch could not be committed");
        commit_failure(writes.len(), e)
    })?;
    debug!("Batch committed");
    Ok(())
}

fn commit_failure(total: usize, e: sqlx::Error) -> Error {
    Error::BatchCommit {
        index: total,
        total,
        source: WriteFailure::Commit(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::Action;
    use crate::model::ProjectStatus;
    use crate::store::fixtures::*;

    #[tokio::test]
    async fn batch_applies_all_writes() {
        let mut store = memory().await;
        let a = add_faculty(&mut store, 1, "Ada").await;
        let p = add_project(&mut store, 10, ProjectStatus::Proposed, None).await;
        let writes = [
            Write::AssignGuide {
                project: p,
                guide: a,
            },
            Write::LogActivity(Activity {
                project: p,
                action: Action::GuideAssigned,
                actor: "system".into(),
                detail: "Ada".into(),
            }),
        ];
        commit(store.connection(), &writes).await.unwrap();
        let project = store.project(p).await.unwrap().unwrap();
        assert_eq!(project.guide, Some(a));
        assert_eq!(project.status, ProjectStatus::Approved);
        assert_eq!(count(&mut store, "activity_log").await, 1);
    }

    #[tokio::test]
    async fn failing_write_rolls_back_previous_ones() {
        let mut store = memory().await;
        let a = add_faculty(&mut store, 1, "Ada").await;
        let b = add_faculty(&mut store, 2, "Brian").await;
        let p1 = add_project(&mut store, 10, ProjectStatus::Proposed, None).await;
        let p2 = add_project(&mut store, 11, ProjectStatus::Proposed, None).await;
        // Already guided, the guarded update cannot match.
        let p3 = add_project(&mut store, 12, ProjectStatus::Approved, Some(a)).await;
        let writes = [
            Write::AssignGuide {
                project: p1,
                guide: a,
            },
            Write::AssignGuide {
                project: p2,
                guide: b,
            },
            Write::AssignGuide {
                project: p3,
                guide: b,
            },
        ];
        let err = commit(store.connection(), &writes).await.unwrap_err();
        assert!(matches!(
            err,
            Error::BatchCommit {
                index: 2,
                total: 3,
                ..
            }
        ));
        assert!(err.is_retryable());
        for p in [p1, p2] {
            let project = store.project(p).await.unwrap().unwrap();
            assert!(project.is_unassigned());
        }
        assert_eq!(store.project(p3).await.unwrap().unwrap().guide, Some(a));
    }

    #[tokio::test]
    async fn guarded_assignment_refuses_full_member() {
        let mut store = memory().await;
        let a = add_faculty(&mut store, 1, "Ada").await;
        add_load(&mut store, a, 100, 4).await;
        let p1 = add_project(&mut store, 1, ProjectStatus::Proposed, None).await;
        let p2 = add_project(&mut store, 2, ProjectStatus::Proposed, None).await;
        // Both were planned against a load of 4; another batch took the last
        // seat first.
        commit(
            store.connection(),
            &[Write::AssignGuide {
                project: p1,
                guide: a,
            }],
        )
        .await
        .unwrap();
        let err = commit(
            store.connection(),
            &[Write::AssignGuide {
                project: p2,
                guide: a,
            }],
        )
        .await
        .unwrap_err();
        assert!(err.is_retryable());
        let member = store.faculty_member(a).await.unwrap().unwrap();
        assert_eq!(member.load(), CAPACITY);
    }

    #[tokio::test]
    async fn storage_failure_aborts_batch() {
        let mut store = memory().await;
        let a = add_faculty(&mut store, 1, "Ada").await;
        let p = add_project(&mut store, 2, ProjectStatus::Proposed, None).await;
        let year = add_year(&mut store, 1, "Y1", false).await;
        let existing = store.academic_year(year).await.unwrap().unwrap();
        let writes = [
            Write::SetGuide {
                project: p,
                guide: Some(a),
            },
            Write::InsertAcademicYear(AcademicYear {
                id: AcademicYearId(2),
                ..existing
            }),
        ];
        let err = commit(store.connection(), &writes).await.unwrap_err();
        match err {
            Error::BatchCommit {
                index: 1, source, ..
            } => assert!(source.is_unique_violation()),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(store.project(p).await.unwrap().unwrap().guide, None);
    }

    #[test]
    fn commit_failure_keeps_batch_taxonomy() {
        let err = commit_failure(3, sqlx::Error::WorkerCrashed);
        assert!(matches!(
            err,
            Error::BatchCommit {
                index: 3,
                total: 3,
                source: WriteFailure::Commit(_),
            }
        ));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let mut store = memory().await;
        commit(store.connection(), &[]).await.unwrap();
    }
}
