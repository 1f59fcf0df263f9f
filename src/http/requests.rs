use serde::Deserialize;
use uuid::Uuid;

use crate::domain::post::normalize_tags;
use crate::domain::search::{SearchScope, SearchTerm};
use crate::domain::vote::{TargetType, VoteType};
use crate::http::validation::{bounded, optional_text, text, FieldErrors};

const MAX_LOUNGE_NAME_LEN: usize = 50;
const MAX_LOUNGE_DESCRIPTION_LEN: usize = 500;
const MAX_TITLE_LEN: usize = 200;
const MAX_POST_CONTENT_LEN: usize = 20_000;
const MAX_COMMENT_LEN: usize = 1000;

fn target(errors: &mut FieldErrors, target_type: &str, target_id: &str) -> Option<(TargetType, Uuid)> {
    let parsed_type = TargetType::parse(target_type);
    if parsed_type.is_none() {
        errors.add(
            "target_type",
            "invalid_target_type",
            "target_type must be POST or COMMENT",
        );
    }
    let parsed_id = Uuid::parse_str(target_id.trim()).ok();
    if parsed_id.is_none() {
        errors.add("target_id", "invalid_id", "target_id must be a UUID");
    }
    Some((parsed_type?, parsed_id?))
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    #[serde(default)]
    pub target_type: String,
    #[serde(default)]
    pub target_id: String,
    #[serde(rename = "type", default)]
    pub vote_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CastVote {
    pub target_type: TargetType,
    pub target_id: Uuid,
    pub vote_type: VoteType,
}

impl VoteRequest {
    pub fn validate(self) -> Result<CastVote, FieldErrors> {
        let mut errors = FieldErrors::new();
        let target = target(&mut errors, &self.target_type, &self.target_id);
        let vote_type = VoteType::parse(&self.vote_type);
        if vote_type.is_none() {
            errors.add("type", "invalid_vote_type", "type must be UPVOTE or DOWNVOTE");
        }
        match (target, vote_type) {
            (Some((target_type, target_id)), Some(vote_type)) => errors.finish(CastVote {
                target_type,
                target_id,
                vote_type,
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VoteQuery {
    #[serde(default)]
    pub target_type: String,
    #[serde(default)]
    pub target_id: String,
}

impl VoteQuery {
    pub fn validate(self) -> Result<(TargetType, Uuid), FieldErrors> {
        let mut errors = FieldErrors::new();
        match target(&mut errors, &self.target_type, &self.target_id) {
            Some(target) => errors.finish(target),
            None => Err(errors),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub scope: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSearch {
    pub query: String,
    pub term: SearchTerm,
    pub scope: SearchScope,
    pub page: i64,
    pub limit: i64,
}

impl SearchQuery {
    pub fn validate(self) -> Result<ValidSearch, FieldErrors> {
        let mut errors = FieldErrors::new();
        let query = self.q.unwrap_or_default().trim().to_string();
        let term = match SearchTerm::parse(&query) {
            Ok(term) => Some(term),
            Err(message) => {
                errors.add("q", "invalid_query", message);
                None
            }
        };
        let scope = match self.scope.as_deref() {
            None => Some(SearchScope::All),
            Some(value) => SearchScope::parse(value),
        };
        if scope.is_none() {
            errors.add("type", "invalid_scope", "type must be all, lounge or post");
        }
        // `all` returns fixed-size previews, so paging input is not consulted.
        let (page, limit) = if scope == Some(SearchScope::All) {
            (1, 20)
        } else {
            (
                bounded(&mut errors, "page", self.page, 1, 1, 10_000),
                bounded(&mut errors, "limit", self.limit, 20, 1, 100),
            )
        };

        match (term, scope) {
            (Some(term), Some(scope)) => errors.finish(ValidSearch {
                query,
                term,
                scope,
                page,
                limit,
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TagSearchQuery {
    pub q: Option<String>,
    pub limit: Option<i64>,
}

impl TagSearchQuery {
    pub fn validate(self) -> Result<(Option<String>, i64), FieldErrors> {
        let mut errors = FieldErrors::new();
        let limit = bounded(&mut errors, "limit", self.limit, 10, 1, 50);
        errors.finish((self.q, limit))
    }
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn validate(self) -> Result<(i64, i64), FieldErrors> {
        let mut errors = FieldErrors::new();
        let page = bounded(&mut errors, "page", self.page, 1, 1, 10_000);
        let limit = bounded(&mut errors, "limit", self.limit, 20, 1, 100);
        errors.finish((page, limit))
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateLoungeRequest {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLounge {
    pub name: String,
    pub description: Option<String>,
}

impl CreateLoungeRequest {
    pub fn validate(self) -> Result<NewLounge, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = text(&mut errors, "name", &self.name, 3, MAX_LOUNGE_NAME_LEN);
        let description = optional_text(
            &mut errors,
            "description",
            self.description.as_deref(),
            MAX_LOUNGE_DESCRIPTION_LEN,
        );
        match name {
            Some(name) => errors.finish(NewLounge { name, description }),
            None => Err(errors),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

impl CreatePostRequest {
    pub fn validate(self) -> Result<NewPost, FieldErrors> {
        let mut errors = FieldErrors::new();
        let title = text(&mut errors, "title", &self.title, 1, MAX_TITLE_LEN);
        let content = text(&mut errors, "content", &self.content, 1, MAX_POST_CONTENT_LEN);
        let tags = match normalize_tags(&self.tags) {
            Ok(tags) => Some(tags),
            Err(message) => {
                errors.add("tags", "invalid_tags", message);
                None
            }
        };
        match (title, content, tags) {
            (Some(title), Some(content), Some(tags)) => errors.finish(NewPost {
                title,
                content,
                tags,
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub content: String,
}

impl CommentRequest {
    pub fn validate(self) -> Result<String, FieldErrors> {
        let mut errors = FieldErrors::new();
        match text(&mut errors, "content", &self.content, 1, MAX_COMMENT_LEN) {
            Some(content) => errors.finish(content),
            None => Err(errors),
        }
    }
}
