use anyhow::{anyhow, Result};
use sqlx::Row;
use uuid::Uuid;

use crate::domain::vote::{TargetType, VoteAction, VoteTally, VoteTransition, VoteType};
use crate::infra::db::Db;

#[derive(Clone)]
pub struct VoteService {
    db: Db,
}

impl VoteService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Applies one vote intent and returns the authoritative tally, or `None`
    /// when the target is missing or soft-deleted (for comments, also when the
    /// parent post is).
    pub async fn cast_vote(
        &self,
        user_id: Uuid,
        target_type: TargetType,
        target_id: Uuid,
        requested: VoteType,
    ) -> Result<Option<VoteTally>> {
        let table = target_type.table();
        let mut tx = self.db.pool().begin().await?;

        // Row lock on the target serializes every vote on it until commit.
        let lock_sql = format!(
            "SELECT t.id FROM {} t WHERE t.id = $1 AND {} FOR UPDATE OF t",
            table,
            live_target(target_type)
        );
        let target = sqlx::query(&lock_sql)
            .bind(target_id)
            .fetch_optional(&mut *tx)
            .await?;
        if target.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        let current: Option<String> = sqlx::query_scalar(
            "SELECT vote_type::text FROM votes \
             WHERE user_id = $1 AND target_type = $2::vote_target AND target_id = $3",
        )
        .bind(user_id)
        .bind(target_type.as_db())
        .bind(target_id)
        .fetch_optional(&mut *tx)
        .await?;
        let current = match current {
            Some(value) => Some(
                VoteType::from_db(&value).ok_or_else(|| anyhow!("unknown vote type: {}", value))?,
            ),
            None => None,
        };

        let transition = VoteTransition::plan(current, requested);
        match transition.action {
            VoteAction::Create(vote_type) => {
                sqlx::query(
                    "INSERT INTO votes (user_id, target_type, target_id, vote_type) \
                     VALUES ($1, $2::vote_target, $3, $4::vote_type)",
                )
                .bind(user_id)
                .bind(target_type.as_db())
                .bind(target_id)
                .bind(vote_type.as_db())
                .execute(&mut *tx)
                .await?;
            }
            VoteAction::Flip(vote_type) => {
                sqlx::query(
                    "UPDATE votes SET vote_type = $4::vote_type \
                     WHERE user_id = $1 AND target_type = $2::vote_target AND target_id = $3",
                )
                .bind(user_id)
                .bind(target_type.as_db())
                .bind(target_id)
                .bind(vote_type.as_db())
                .execute(&mut *tx)
                .await?;
            }
            VoteAction::Remove => {
                sqlx::query(
                    "DELETE FROM votes \
                     WHERE user_id = $1 AND target_type = $2::vote_target AND target_id = $3",
                )
                .bind(user_id)
                .bind(target_type.as_db())
                .bind(target_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        let update_sql = format!(
            "UPDATE {} \
             SET upvote_count = upvote_count + $2, downvote_count = downvote_count + $3 \
             WHERE id = $1 \
             RETURNING upvote_count, downvote_count",
            table
        );
        let row = sqlx::query(&update_sql)
            .bind(target_id)
            .bind(transition.upvote_delta)
            .bind(transition.downvote_delta)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(
            %user_id,
            %target_id,
            target_type = target_type.as_db(),
            action = ?transition.action,
            "vote applied"
        );

        Ok(Some(VoteTally {
            upvote_count: row.get("upvote_count"),
            downvote_count: row.get("downvote_count"),
            user_vote: transition.resulting,
        }))
    }

    pub async fn get_vote(
        &self,
        user_id: Uuid,
        target_type: TargetType,
        target_id: Uuid,
    ) -> Result<Option<VoteTally>> {
        let sql = format!(
            "SELECT t.upvote_count, t.downvote_count, v.vote_type::text AS user_vote \
             FROM {} t \
             LEFT JOIN votes v \
               ON v.target_id = t.id AND v.target_type = $2::vote_target AND v.user_id = $3 \
             WHERE t.id = $1 AND {}",
            target_type.table(),
            live_target(target_type)
        );
        let row = sqlx::query(&sql)
            .bind(target_id)
            .bind(target_type.as_db())
            .bind(user_id)
            .fetch_optional(self.db.pool())
            .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let user_vote: Option<String> = row.get("user_vote");
        let user_vote = match user_vote {
            Some(value) => Some(
                VoteType::from_db(&value).ok_or_else(|| anyhow!("unknown vote type: {}", value))?,
            ),
            None => None,
        };

        Ok(Some(VoteTally {
            upvote_count: row.get("upvote_count"),
            downvote_count: row.get("downvote_count"),
            user_vote,
        }))
    }
}

/// Visibility filter on a target aliased `t`. A comment under a deleted post
/// is as gone as the post.
fn live_target(target_type: TargetType) -> &'static str {
    match target_type {
        TargetType::Post => "t.deleted_at IS NULL",
        TargetType::Comment => {
            "t.deleted_at IS NULL \
             AND EXISTS (SELECT 1 FROM posts p WHERE p.id = t.post_id AND p.deleted_at IS NULL)"
        }
    }
}
