use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::comment::Comment;
use crate::infra::db::Db;

const COMMENT_COLUMNS: &str =
    "c.id, c.post_id, c.author_id, u.handle AS author_handle, c.content, \
     c.upvote_count, c.downvote_count, c.created_at";

#[derive(Clone)]
pub struct CommentService {
    db: Db,
}

impl CommentService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// `None` when the post is missing or deleted.
    pub async fn create_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        content: String,
    ) -> Result<Option<Comment>> {
        let mut tx = self.db.pool().begin().await?;

        let post = sqlx::query(
            "UPDATE posts SET comment_count = comment_count + 1 \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING id",
        )
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await?;
        if post.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        let row = sqlx::query(
            "WITH inserted_comment AS ( \
                INSERT INTO comments (post_id, author_id, content) \
                VALUES ($1, $2, $3) \
                RETURNING id, post_id, author_id, content, upvote_count, downvote_count, created_at \
             ) \
             SELECT c.*, u.handle AS author_handle \
             FROM inserted_comment c \
             LEFT JOIN users u ON c.author_id = u.id",
        )
        .bind(post_id)
        .bind(author_id)
        .bind(content)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(comment_from_row(&row)))
    }

    pub async fn list_by_post(
        &self,
        post_id: Uuid,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> Result<Vec<Comment>> {
        let rows = match cursor {
            Some((created_at, comment_id)) => {
                let sql = format!(
                    "SELECT {} FROM comments c \
                     LEFT JOIN users u ON c.author_id = u.id \
                     WHERE c.post_id = $1 AND c.deleted_at IS NULL \
                       AND (c.created_at < $2 OR (c.created_at = $2 AND c.id < $3)) \
                     ORDER BY c.created_at DESC, c.id DESC \
                     LIMIT $4",
                    COMMENT_COLUMNS
                );
                sqlx::query(&sql)
                    .bind(post_id)
                    .bind(created_at)
                    .bind(comment_id)
                    .bind(limit)
                    .fetch_all(self.db.pool())
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM comments c \
                     LEFT JOIN users u ON c.author_id = u.id \
                     WHERE c.post_id = $1 AND c.deleted_at IS NULL \
                     ORDER BY c.created_at DESC, c.id DESC \
                     LIMIT $2",
                    COMMENT_COLUMNS
                );
                sqlx::query(&sql)
                    .bind(post_id)
                    .bind(limit)
                    .fetch_all(self.db.pool())
                    .await?
            }
        };

        Ok(rows.iter().map(comment_from_row).collect())
    }

    /// Soft delete by the author; keeps the post's comment counter in step.
    pub async fn delete_comment(&self, comment_id: Uuid, author_id: Uuid) -> Result<bool> {
        let mut tx = self.db.pool().begin().await?;

        let post_id: Option<Uuid> = sqlx::query_scalar(
            "UPDATE comments SET deleted_at = now() \
             WHERE id = $1 AND author_id = $2 AND deleted_at IS NULL \
             RETURNING post_id",
        )
        .bind(comment_id)
        .bind(author_id)
        .fetch_optional(&mut *tx)
        .await?;

        let post_id = match post_id {
            Some(post_id) => post_id,
            None => {
                tx.rollback().await?;
                return Ok(false);
            }
        };

        sqlx::query(
            "UPDATE posts SET comment_count = GREATEST(comment_count - 1, 0) WHERE id = $1",
        )
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}

fn comment_from_row(row: &PgRow) -> Comment {
    Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        author_id: row.get("author_id"),
        author_handle: row.get("author_handle"),
        content: row.get("content"),
        upvote_count: row.get("upvote_count"),
        downvote_count: row.get("downvote_count"),
        created_at: row.get("created_at"),
    }
}
