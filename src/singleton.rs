use crate::coordinator::Write;
use crate::error::Result;
use sqlx::any::AnyRow;
use sqlx::{AnyConnection, Row};

/// An exclusive boolean column: at most one row of the table may hold it.
#[derive(Debug)]
pub struct SingletonFlag {
    pub entity: &'static str,
    pub table: &'static str,
    pub column: &'static str,
}

pub static ACADEMIC_YEAR_CURRENT: SingletonFlag = SingletonFlag {
    entity: "academic year",
    table: "academic_years",
    column: "is_current",
};

impl SingletonFlag {
    /// Give the flag to `id`. Every other row is cleared first, whatever
    /// its value, then `id` is set. Both writes must travel in the same
    /// batch.
    pub fn claim(&'static self, id: i64) -> [Write; 2] {
        [
            Write::ClearFlag { flag: self, keep: id },
            Write::SetFlag {
                flag: self,
                id,
                value: true,
            },
        ]
    }

    pub fn release(&'static self, id: i64) -> Write {
        Write::SetFlag {
            flag: self,
            id,
            value: false,
        }
    }

    pub fn writes(&'static self, id: i64, value: bool) -> Vec<Write> {
        if value {
            self.claim(id).into()
        } else {
            vec![self.release(id)]
        }
    }

    pub(crate) fn clear_others_sql(&self) -> String {
        format!("UPDATE {} SET {} = 0 WHERE id <> ?", self.table, self.column)
    }

    pub(crate) fn set_sql(&self) -> String {
        format!("UPDATE {} SET {} = ? WHERE id = ?", self.table, self.column)
    }

    /// Ids of the rows currently holding the flag.
    pub async fn holders(&self, conn: &mut AnyConnection) -> Result<Vec<i64>> {
        let sql = format!(
            "SELECT id FROM {} WHERE {} <> 0 ORDER BY id",
            self.table, self.column
        );
        let ids = sqlx::query(&sql)
            .map(|row: AnyRow| row.try_get::<i64, _>("id"))
            .fetch_all(conn)
            .await?
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator;
    use crate::store::fixtures::*;

    #[test]
    fn claim_clears_before_setting() {
        let [clear, set] = ACADEMIC_YEAR_CURRENT.claim(4);
        assert!(matches!(clear, Write::ClearFlag { keep: 4, .. }));
        assert!(matches!(
            set,
            Write::SetFlag {
                id: 4,
                value: true,
                ..
            }
        ));
        assert_eq!(ACADEMIC_YEAR_CURRENT.writes(4, false).len(), 1);
    }

    #[tokio::test]
    async fn claim_repairs_multiple_holders() {
        let mut store = memory().await;
        add_year(&mut store, 1, "Y1", true).await;
        add_year(&mut store, 2, "Y2", true).await;
        add_year(&mut store, 3, "Y3", false).await;
        let holders = ACADEMIC_YEAR_CURRENT.holders(store.connection()).await.unwrap();
        assert_eq!(holders, vec![1, 2]);
        coordinator::commit(store.connection(), &ACADEMIC_YEAR_CURRENT.claim(3))
            .await
            .unwrap();
        let holders = ACADEMIC_YEAR_CURRENT.holders(store.connection()).await.unwrap();
        assert_eq!(holders, vec![3]);
    }

    #[tokio::test]
    async fn sequence_of_claims_keeps_one_holder() {
        let mut store = memory().await;
        for id in 1..=4 {
            add_year(&mut store, id, &format!("Y{id}"), false).await;
        }
        for id in [2, 4, 1, 1, 3] {
            coordinator::commit(store.connection(), &ACADEMIC_YEAR_CURRENT.claim(id))
                .await
                .unwrap();
            let holders = ACADEMIC_YEAR_CURRENT.holders(store.connection()).await.unwrap();
            assert_eq!(holders, vec![id]);
        }
    }
}
