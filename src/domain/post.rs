use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

pub const MAX_TAGS: usize = 10;
pub const MAX_TAG_LEN: usize = 40;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub lounge_id: Uuid,
    pub author_id: Uuid,
    pub author_handle: Option<String>,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub upvote_count: i64,
    pub downvote_count: i64,
    pub comment_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Canonical stored form of a tag: trimmed, lowercased, without a leading `#`.
pub fn normalize_tag(raw: &str) -> String {
    raw.trim().trim_start_matches('#').trim().to_lowercase()
}

/// Normalizes and deduplicates tags, keeping first-seen order.
pub fn normalize_tags(raw: &[String]) -> Result<Vec<String>, String> {
    let mut tags: Vec<String> = Vec::with_capacity(raw.len());
    for tag in raw {
        let tag = normalize_tag(tag);
        if tag.is_empty() {
            return Err("tags cannot be empty".to_string());
        }
        if tag.chars().count() > MAX_TAG_LEN {
            return Err(format!("tags must be at most {} characters", MAX_TAG_LEN));
        }
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    if tags.len() > MAX_TAGS {
        return Err(format!("at most {} tags are allowed", MAX_TAGS));
    }
    Ok(tags)
}
