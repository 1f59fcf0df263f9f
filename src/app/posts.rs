use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::post::Post;
use crate::infra::db::Db;

pub(crate) const POST_COLUMNS: &str =
    "p.id, p.lounge_id, p.author_id, u.handle AS author_handle, p.title, p.content, p.tags, \
     p.upvote_count, p.downvote_count, p.comment_count, p.created_at";

#[derive(Clone)]
pub struct PostService {
    db: Db,
}

impl PostService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// `None` when the lounge does not exist. Tags must already be normalized.
    pub async fn create_post(
        &self,
        lounge_id: Uuid,
        author_id: Uuid,
        title: String,
        content: String,
        tags: Vec<String>,
    ) -> Result<Option<Post>> {
        let row = sqlx::query(
            "WITH inserted_post AS ( \
                INSERT INTO posts (lounge_id, author_id, title, content, tags) \
                SELECT $1, $2, $3, $4, $5 \
                WHERE EXISTS (SELECT 1 FROM lounges WHERE id = $1) \
                RETURNING id, lounge_id, author_id, title, content, tags, \
                          upvote_count, downvote_count, comment_count, created_at \
             ) \
             SELECT p.*, u.handle AS author_handle \
             FROM inserted_post p \
             LEFT JOIN users u ON p.author_id = u.id",
        )
        .bind(lounge_id)
        .bind(author_id)
        .bind(title)
        .bind(content)
        .bind(tags)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(post_from_row))
    }

    pub async fn get_post(&self, post_id: Uuid) -> Result<Option<Post>> {
        let sql = format!(
            "SELECT {} FROM posts p \
             LEFT JOIN users u ON p.author_id = u.id \
             WHERE p.id = $1 AND p.deleted_at IS NULL",
            POST_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(post_id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.as_ref().map(post_from_row))
    }

    /// Soft delete; only the author may remove a post.
    pub async fn delete_post(&self, post_id: Uuid, author_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE posts SET deleted_at = now() \
             WHERE id = $1 AND author_id = $2 AND deleted_at IS NULL",
        )
        .bind(post_id)
        .bind(author_id)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list_by_lounge(
        &self,
        lounge_id: Uuid,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> Result<Vec<Post>> {
        let rows = match cursor {
            Some((created_at, post_id)) => {
                let sql = format!(
                    "SELECT {} FROM posts p \
                     LEFT JOIN users u ON p.author_id = u.id \
                     WHERE p.lounge_id = $1 AND p.deleted_at IS NULL \
                       AND (p.created_at < $2 OR (p.created_at = $2 AND p.id < $3)) \
                     ORDER BY p.created_at DESC, p.id DESC \
                     LIMIT $4",
                    POST_COLUMNS
                );
                sqlx::query(&sql)
                    .bind(lounge_id)
                    .bind(created_at)
                    .bind(post_id)
                    .bind(limit)
                    .fetch_all(self.db.pool())
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM posts p \
                     LEFT JOIN users u ON p.author_id = u.id \
                     WHERE p.lounge_id = $1 AND p.deleted_at IS NULL \
                     ORDER BY p.created_at DESC, p.id DESC \
                     LIMIT $2",
                    POST_COLUMNS
                );
                sqlx::query(&sql)
                    .bind(lounge_id)
                    .bind(limit)
                    .fetch_all(self.db.pool())
                    .await?
            }
        };

        Ok(rows.iter().map(post_from_row).collect())
    }
}

pub(crate) fn post_from_row(row: &PgRow) -> Post {
    Post {
        id: row.get("id"),
        lounge_id: row.get("lounge_id"),
        author_id: row.get("author_id"),
        author_handle: row.get("author_handle"),
        title: row.get("title"),
        content: row.get("content"),
        tags: row.get("tags"),
        upvote_count: row.get("upvote_count"),
        downvote_count: row.get("downvote_count"),
        comment_count: row.get("comment_count"),
        created_at: row.get("created_at"),
    }
}
