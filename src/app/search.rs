use anyhow::Result;
use redis::AsyncCommands;
use sqlx::Row;
use tracing::warn;

use crate::app::lounges::{lounge_from_row, LOUNGE_COLUMNS};
use crate::app::posts::{post_from_row, POST_COLUMNS};
use crate::domain::lounge::Lounge;
use crate::domain::post::{normalize_tag, Post};
use crate::domain::search::{
    ResultSection, SearchPlan, SearchResultSet, SearchScope, SearchTerm, Window,
};
use crate::infra::{cache::RedisCache, db::Db};

/// Sorted set of tag -> live post count, rebuilt by the worker.
pub const POPULAR_TAGS_KEY: &str = "tags:popular";

#[derive(Clone)]
pub struct SearchService {
    db: Db,
    cache: RedisCache,
}

impl SearchService {
    pub fn new(db: Db, cache: RedisCache) -> Self {
        Self { db, cache }
    }

    /// Lounge and post sub-searches run concurrently; both must finish.
    pub async fn search(
        &self,
        term: &SearchTerm,
        scope: SearchScope,
        page: i64,
        limit: i64,
    ) -> Result<SearchResultSet> {
        let plan = SearchPlan::new(term, scope, page, limit);

        let lounges = async {
            match (term, plan.lounges) {
                (SearchTerm::Text(text), Some(window)) => self.search_lounges(text, window).await,
                _ => Ok(ResultSection::empty()),
            }
        };
        let posts = async {
            match plan.posts {
                Some(window) => self.search_posts(term, window).await,
                None => Ok(ResultSection::empty()),
            }
        };

        let (lounges, posts) = futures::try_join!(lounges, posts)?;
        Ok(SearchResultSet { lounges, posts })
    }

    async fn search_lounges(&self, text: &str, window: Window) -> Result<ResultSection<Lounge>> {
        let pattern = format!("%{}%", escape_like_pattern(text));
        let items_sql = format!(
            "SELECT {} FROM lounges l \
             WHERE l.name ILIKE $1 ESCAPE '\\' OR l.description ILIKE $1 ESCAPE '\\' \
             ORDER BY l.member_count DESC, l.created_at DESC, l.id \
             LIMIT $2 OFFSET $3",
            LOUNGE_COLUMNS
        );
        let items = sqlx::query(&items_sql)
            .bind(&pattern)
            .bind(window.limit)
            .bind(window.offset)
            .fetch_all(self.db.pool());
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM lounges l \
             WHERE l.name ILIKE $1 ESCAPE '\\' OR l.description ILIKE $1 ESCAPE '\\'",
        )
        .bind(&pattern)
        .fetch_one(self.db.pool());

        let (rows, total) = futures::try_join!(items, total)?;
        Ok(ResultSection {
            items: rows.iter().map(lounge_from_row).collect(),
            total,
        })
    }

    async fn search_posts(&self, term: &SearchTerm, window: Window) -> Result<ResultSection<Post>> {
        let (filter, value) = match term {
            SearchTerm::Text(text) => (
                "(p.title ILIKE $1 ESCAPE '\\' OR p.content ILIKE $1 ESCAPE '\\')",
                format!("%{}%", escape_like_pattern(text)),
            ),
            SearchTerm::Tag(tag) => ("p.tags @> ARRAY[$1]::text[]", tag.clone()),
        };

        let items_sql = format!(
            "SELECT {} FROM posts p \
             LEFT JOIN users u ON p.author_id = u.id \
             WHERE p.deleted_at IS NULL AND {} \
             ORDER BY p.created_at DESC, p.id DESC \
             LIMIT $2 OFFSET $3",
            POST_COLUMNS, filter
        );
        let count_sql = format!(
            "SELECT COUNT(*) FROM posts p WHERE p.deleted_at IS NULL AND {}",
            filter
        );

        let items = sqlx::query(&items_sql)
            .bind(&value)
            .bind(window.limit)
            .bind(window.offset)
            .fetch_all(self.db.pool());
        let total = sqlx::query_scalar::<_, i64>(&count_sql)
            .bind(&value)
            .fetch_one(self.db.pool());

        let (rows, total) = futures::try_join!(items, total)?;
        Ok(ResultSection {
            items: rows.iter().map(post_from_row).collect(),
            total,
        })
    }

    /// Prefix autocomplete when `prefix` is non-blank, popular tags otherwise.
    pub async fn search_tags(&self, prefix: Option<&str>, limit: i64) -> Result<Vec<String>> {
        let prefix = prefix.map(normalize_tag).filter(|prefix| !prefix.is_empty());
        if let Some(prefix) = prefix {
            let pattern = format!("{}%", escape_like_pattern(&prefix));
            let tags = sqlx::query_scalar::<_, String>(
                "SELECT DISTINCT tag \
                 FROM posts p, unnest(p.tags) AS tag \
                 WHERE p.deleted_at IS NULL AND tag LIKE $1 ESCAPE '\\' \
                 ORDER BY tag \
                 LIMIT $2",
            )
            .bind(pattern)
            .bind(limit)
            .fetch_all(self.db.pool())
            .await?;
            return Ok(tags);
        }

        let cached = self.cached_popular_tags(limit).await;
        if !cached.is_empty() {
            return Ok(cached);
        }

        let counts = self.count_tags(limit).await?;
        Ok(counts.into_iter().map(|(tag, _)| tag).collect())
    }

    /// Live post count for one tag; `None` when no live post carries it.
    pub async fn tag_usage(&self, tag: &str) -> Result<Option<i64>> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM posts WHERE deleted_at IS NULL AND tags @> ARRAY[$1]::text[]",
        )
        .bind(tag)
        .fetch_one(self.db.pool())
        .await?;

        Ok((count > 0).then_some(count))
    }

    /// Replaces the popular-tag set in one MULTI/EXEC. Returns the number of
    /// tags written.
    pub async fn refresh_popular_tags(&self, size: usize) -> Result<usize> {
        let counts = self.count_tags(size as i64).await?;
        let members: Vec<(i64, String)> = counts
            .into_iter()
            .map(|(tag, uses)| (uses, tag))
            .collect();

        let mut conn = self.cache.connection().await?;
        let mut pipe = redis::pipe();
        pipe.atomic().del(POPULAR_TAGS_KEY).ignore();
        if !members.is_empty() {
            pipe.zadd_multiple(POPULAR_TAGS_KEY, &members[..]).ignore();
        }
        pipe.query_async::<_, ()>(&mut conn).await?;

        Ok(members.len())
    }

    async fn cached_popular_tags(&self, limit: i64) -> Vec<String> {
        let mut conn = match self.cache.connection().await {
            Ok(conn) => conn,
            Err(err) => {
                warn!(error = ?err, "tag cache unavailable, aggregating from posts");
                return Vec::new();
            }
        };
        match conn
            .zrevrange::<_, Vec<String>>(POPULAR_TAGS_KEY, 0, (limit - 1) as isize)
            .await
        {
            Ok(tags) => tags,
            Err(err) => {
                warn!(error = ?err, "failed to read tag cache");
                Vec::new()
            }
        }
    }

    async fn count_tags(&self, limit: i64) -> Result<Vec<(String, i64)>> {
        let rows = sqlx::query(
            "SELECT tag, COUNT(*) AS uses \
             FROM posts p, unnest(p.tags) AS tag \
             WHERE p.deleted_at IS NULL \
             GROUP BY tag \
             ORDER BY uses DESC, tag ASC \
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows
            .iter()
            .map(|row| (row.get("tag"), row.get("uses")))
            .collect())
    }
}

fn escape_like_pattern(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '%' | '_' | '\\' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            _ => escaped.push(ch),
        }
    }
    escaped
}
