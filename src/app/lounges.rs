use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::lounge::Lounge;
use crate::infra::db::Db;

pub(crate) const LOUNGE_COLUMNS: &str =
    "l.id, l.name, l.description, l.owner_id, l.member_count, l.created_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    Left,
    NotMember,
    Owner,
}

#[derive(Clone)]
pub struct LoungeService {
    db: Db,
}

impl LoungeService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// The creator joins as the first member.
    pub async fn create_lounge(
        &self,
        owner_id: Uuid,
        name: String,
        description: Option<String>,
    ) -> Result<Lounge> {
        let mut tx = self.db.pool().begin().await?;

        let row = sqlx::query(
            "INSERT INTO lounges AS l (name, description, owner_id, member_count) \
             VALUES ($1, $2, $3, 1) \
             RETURNING l.id, l.name, l.description, l.owner_id, l.member_count, l.created_at",
        )
        .bind(name)
        .bind(description)
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await?;
        let lounge = lounge_from_row(&row);

        sqlx::query("INSERT INTO lounge_members (lounge_id, user_id) VALUES ($1, $2)")
            .bind(lounge.id)
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(lounge)
    }

    pub async fn get_lounge(&self, lounge_id: Uuid) -> Result<Option<Lounge>> {
        let sql = format!("SELECT {} FROM lounges l WHERE l.id = $1", LOUNGE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(lounge_id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.as_ref().map(lounge_from_row))
    }

    pub async fn list_popular(&self, limit: i64, offset: i64) -> Result<(Vec<Lounge>, i64)> {
        let sql = format!(
            "SELECT {} FROM lounges l \
             ORDER BY l.member_count DESC, l.created_at DESC, l.id \
             LIMIT $1 OFFSET $2",
            LOUNGE_COLUMNS
        );
        let items = sqlx::query(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.db.pool());
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM lounges")
            .fetch_one(self.db.pool());

        let (rows, total) = futures::try_join!(items, total)?;
        Ok((rows.iter().map(lounge_from_row).collect(), total))
    }

    /// `None` when the lounge does not exist, otherwise whether a new
    /// membership was created.
    pub async fn join(&self, lounge_id: Uuid, user_id: Uuid) -> Result<Option<bool>> {
        let mut tx = self.db.pool().begin().await?;

        let exists = sqlx::query("SELECT id FROM lounges WHERE id = $1 FOR UPDATE")
            .bind(lounge_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        let inserted = sqlx::query(
            "INSERT INTO lounge_members (lounge_id, user_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(lounge_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let joined = inserted.rows_affected() > 0;
        if joined {
            sqlx::query("UPDATE lounges SET member_count = member_count + 1 WHERE id = $1")
                .bind(lounge_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(Some(joined))
    }

    pub async fn leave(&self, lounge_id: Uuid, user_id: Uuid) -> Result<Option<LeaveOutcome>> {
        let mut tx = self.db.pool().begin().await?;

        let owner_id: Option<Uuid> =
            sqlx::query_scalar("SELECT owner_id FROM lounges WHERE id = $1 FOR UPDATE")
                .bind(lounge_id)
                .fetch_optional(&mut *tx)
                .await?;
        let owner_id = match owner_id {
            Some(owner_id) => owner_id,
            None => {
                tx.rollback().await?;
                return Ok(None);
            }
        };
        if owner_id == user_id {
            tx.rollback().await?;
            return Ok(Some(LeaveOutcome::Owner));
        }

        let deleted = sqlx::query("DELETE FROM lounge_members WHERE lounge_id = $1 AND user_id = $2")
            .bind(lounge_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let outcome = if deleted.rows_affected() > 0 {
            sqlx::query(
                "UPDATE lounges SET member_count = GREATEST(member_count - 1, 0) WHERE id = $1",
            )
            .bind(lounge_id)
            .execute(&mut *tx)
            .await?;
            LeaveOutcome::Left
        } else {
            LeaveOutcome::NotMember
        };

        tx.commit().await?;
        Ok(Some(outcome))
    }
}

pub(crate) fn lounge_from_row(row: &PgRow) -> Lounge {
    Lounge {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        owner_id: row.get("owner_id"),
        member_count: row.get("member_count"),
        created_at: row.get("created_at"),
    }
}
