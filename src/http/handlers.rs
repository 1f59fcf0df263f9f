use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::comments::CommentService;
use crate::app::lounges::{LeaveOutcome, LoungeService};
use crate::app::posts::PostService;
use crate::app::search::SearchService;
use crate::app::votes::VoteService;
use crate::domain::comment::Comment;
use crate::domain::lounge::Lounge;
use crate::domain::post::{normalize_tag, Post};
use crate::domain::search::{SearchResultSet, SearchScope};
use crate::domain::vote::VoteTally;
use crate::http::requests::{
    CommentRequest, CreateLoungeRequest, CreatePostRequest, PageQuery, SearchQuery,
    TagSearchQuery, VoteQuery, VoteRequest,
};
use crate::http::{AppError, AuthUser};
use crate::infra::db::{is_conflict, is_missing_reference};
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

#[derive(Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

#[derive(Serialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

fn parse_cursor(cursor: Option<String>) -> Result<Option<(OffsetDateTime, Uuid)>, AppError> {
    let Some(cursor) = cursor else {
        return Ok(None);
    };

    let mut parts = cursor.splitn(2, '/');
    let timestamp = parts
        .next()
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;
    let id = parts
        .next()
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;

    let timestamp = OffsetDateTime::parse(timestamp, &Rfc3339)
        .map_err(|_| AppError::bad_request("invalid cursor"))?;
    let id = Uuid::parse_str(id).map_err(|_| AppError::bad_request("invalid cursor"))?;

    Ok(Some((timestamp, id)))
}

fn encode_cursor(cursor: Option<(OffsetDateTime, Uuid)>) -> Option<String> {
    let (timestamp, id) = cursor?;
    let timestamp = timestamp.format(&Rfc3339).ok()?;
    Some(format!("{}/{}", timestamp, id))
}

fn page_limit(limit: Option<i64>) -> Result<i64, AppError> {
    let limit = limit.unwrap_or(30);
    if !(1..=100).contains(&limit) {
        return Err(AppError::bad_request("limit must be between 1 and 100"));
    }
    Ok(limit)
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

fn path_param<T>(path: Result<Path<T>, PathRejection>) -> Result<T, AppError> {
    path.map(|Path(value)| value)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let db = state.db.ping().await.is_ok();
    let redis = state.cache.ping().await.is_ok();
    let status = if db && redis { "ok" } else { "degraded" };

    Json(HealthResponse { status })
}

// Votes

pub async fn cast_vote(
    auth: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> Result<Json<VoteTally>, AppError> {
    let vote = json_body(payload)?.validate()?;

    let service = VoteService::new(state.db.clone());
    let tally = service
        .cast_vote(auth.user_id, vote.target_type, vote.target_id, vote.vote_type)
        .await
        .map_err(|err| {
            if is_missing_reference(&err) {
                return AppError::unauthorized("unknown user");
            }
            if is_conflict(&err) {
                tracing::warn!(error = ?err, user_id = %auth.user_id, target_id = %vote.target_id, "vote conflicted");
                return AppError::conflict("vote conflicted with a concurrent change");
            }
            tracing::error!(error = ?err, user_id = %auth.user_id, target_id = %vote.target_id, "failed to cast vote");
            AppError::internal("failed to cast vote")
        })?;

    match tally {
        Some(tally) => Ok(Json(tally)),
        None => Err(AppError::not_found("target not found")),
    }
}

pub async fn get_vote(
    auth: AuthUser,
    State(state): State<AppState>,
    query: Result<Query<VoteQuery>, QueryRejection>,
) -> Result<Json<VoteTally>, AppError> {
    let (target_type, target_id) = query_params(query)?.validate()?;

    let service = VoteService::new(state.db.clone());
    let tally = service
        .get_vote(auth.user_id, target_type, target_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, target_id = %target_id, "failed to fetch vote");
            AppError::internal("failed to fetch vote")
        })?;

    match tally {
        Some(tally) => Ok(Json(tally)),
        None => Err(AppError::not_found("target not found")),
    }
}

// Search

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    #[serde(rename = "type")]
    pub scope: SearchScope,
    pub results: SearchResultSet,
}

pub async fn search(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<SearchResponse>, AppError> {
    let search = query_params(query)?.validate()?;

    let service = SearchService::new(state.db.clone(), state.cache.clone());
    let results = service
        .search(&search.term, search.scope, search.page, search.limit)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, query = %search.query, "failed to search");
            AppError::internal("failed to search")
        })?;

    Ok(Json(SearchResponse {
        query: search.query,
        scope: search.scope,
        results,
    }))
}

pub async fn search_tags(
    State(state): State<AppState>,
    query: Result<Query<TagSearchQuery>, QueryRejection>,
) -> Result<Json<Vec<String>>, AppError> {
    let (prefix, limit) = query_params(query)?.validate()?;

    let service = SearchService::new(state.db.clone(), state.cache.clone());
    let tags = service
        .search_tags(prefix.as_deref(), limit)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to search tags");
            AppError::internal("failed to search tags")
        })?;

    Ok(Json(tags))
}

#[derive(Serialize)]
pub struct TagResponse {
    pub tag: String,
    pub post_count: i64,
}

pub async fn get_tag(
    path: Result<Path<String>, PathRejection>,
    State(state): State<AppState>,
) -> Result<Json<TagResponse>, AppError> {
    let tag = path_param(path)?;
    let tag = normalize_tag(&tag);
    if tag.is_empty() {
        return Err(AppError::bad_request("tag cannot be empty"));
    }

    let service = SearchService::new(state.db.clone(), state.cache.clone());
    let usage = service.tag_usage(&tag).await.map_err(|err| {
        tracing::error!(error = ?err, tag = %tag, "failed to fetch tag");
        AppError::internal("failed to fetch tag")
    })?;

    match usage {
        Some(post_count) => Ok(Json(TagResponse { tag, post_count })),
        None => Err(AppError::not_found("tag not found")),
    }
}

// Lounges

pub async fn create_lounge(
    auth: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<CreateLoungeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Lounge>), AppError> {
    let lounge = json_body(payload)?.validate()?;

    let service = LoungeService::new(state.db.clone());
    let lounge = service
        .create_lounge(auth.user_id, lounge.name, lounge.description)
        .await
        .map_err(|err| {
            if is_missing_reference(&err) {
                return AppError::unauthorized("unknown user");
            }
            if is_conflict(&err) {
                return AppError::conflict("lounge name already taken");
            }
            tracing::error!(error = ?err, owner_id = %auth.user_id, "failed to create lounge");
            AppError::internal("failed to create lounge")
        })?;

    Ok((StatusCode::CREATED, Json(lounge)))
}

pub async fn list_lounges(
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<PageResponse<Lounge>>, AppError> {
    let (page, limit) = query_params(query)?.validate()?;

    let service = LoungeService::new(state.db.clone());
    let (items, total) = service
        .list_popular(limit, (page - 1) * limit)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to list lounges");
            AppError::internal("failed to list lounges")
        })?;

    Ok(Json(PageResponse {
        items,
        total,
        page,
        limit,
    }))
}

pub async fn get_lounge(
    path: Result<Path<Uuid>, PathRejection>,
    State(state): State<AppState>,
) -> Result<Json<Lounge>, AppError> {
    let id = path_param(path)?;
    let service = LoungeService::new(state.db.clone());
    let lounge = service.get_lounge(id).await.map_err(|err| {
        tracing::error!(error = ?err, lounge_id = %id, "failed to fetch lounge");
        AppError::internal("failed to fetch lounge")
    })?;

    match lounge {
        Some(lounge) => Ok(Json(lounge)),
        None => Err(AppError::not_found("lounge not found")),
    }
}

#[derive(Serialize)]
pub struct JoinResponse {
    pub joined: bool,
}

pub async fn join_lounge(
    path: Result<Path<Uuid>, PathRejection>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<JoinResponse>, AppError> {
    let id = path_param(path)?;
    let service = LoungeService::new(state.db.clone());
    let joined = service.join(id, auth.user_id).await.map_err(|err| {
        if is_missing_reference(&err) {
            return AppError::unauthorized("unknown user");
        }
        tracing::error!(error = ?err, lounge_id = %id, user_id = %auth.user_id, "failed to join lounge");
        AppError::internal("failed to join lounge")
    })?;

    match joined {
        Some(joined) => Ok(Json(JoinResponse { joined })),
        None => Err(AppError::not_found("lounge not found")),
    }
}

#[derive(Serialize)]
pub struct LeaveResponse {
    pub left: bool,
}

pub async fn leave_lounge(
    path: Result<Path<Uuid>, PathRejection>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<LeaveResponse>, AppError> {
    let id = path_param(path)?;
    let service = LoungeService::new(state.db.clone());
    let outcome = service.leave(id, auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, lounge_id = %id, user_id = %auth.user_id, "failed to leave lounge");
        AppError::internal("failed to leave lounge")
    })?;

    match outcome {
        Some(LeaveOutcome::Left) => Ok(Json(LeaveResponse { left: true })),
        Some(LeaveOutcome::NotMember) => Ok(Json(LeaveResponse { left: false })),
        Some(LeaveOutcome::Owner) => Err(AppError::bad_request("lounge owner cannot leave")),
        None => Err(AppError::not_found("lounge not found")),
    }
}

// Posts

pub async fn create_post(
    path: Result<Path<Uuid>, PathRejection>,
    auth: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<CreatePostRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    let lounge_id = path_param(path)?;
    let post = json_body(payload)?.validate()?;

    let service = PostService::new(state.db.clone());
    let post = service
        .create_post(lounge_id, auth.user_id, post.title, post.content, post.tags)
        .await
        .map_err(|err| {
            if is_missing_reference(&err) {
                return AppError::unauthorized("unknown user");
            }
            tracing::error!(error = ?err, lounge_id = %lounge_id, author_id = %auth.user_id, "failed to create post");
            AppError::internal("failed to create post")
        })?;

    match post {
        Some(post) => Ok((StatusCode::CREATED, Json(post))),
        None => Err(AppError::not_found("lounge not found")),
    }
}

pub async fn list_lounge_posts(
    path: Result<Path<Uuid>, PathRejection>,
    State(state): State<AppState>,
    query: Result<Query<PaginationQuery>, QueryRejection>,
) -> Result<Json<ListResponse<Post>>, AppError> {
    let lounge_id = path_param(path)?;
    let query = query_params(query)?;
    let limit = page_limit(query.limit)?;
    let cursor = parse_cursor(query.cursor)?;

    let lounges = LoungeService::new(state.db.clone());
    let lounge = lounges.get_lounge(lounge_id).await.map_err(|err| {
        tracing::error!(error = ?err, lounge_id = %lounge_id, "failed to fetch lounge");
        AppError::internal("failed to fetch lounge")
    })?;
    if lounge.is_none() {
        return Err(AppError::not_found("lounge not found"));
    }

    let service = PostService::new(state.db.clone());
    let mut posts = service
        .list_by_lounge(lounge_id, cursor, limit + 1)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, lounge_id = %lounge_id, "failed to list posts");
            AppError::internal("failed to list posts")
        })?;

    let next_cursor = if posts.len() > limit as usize {
        posts.truncate(limit as usize);
        posts.last().map(|last| (last.created_at, last.id))
    } else {
        None
    };

    Ok(Json(ListResponse {
        items: posts,
        next_cursor: encode_cursor(next_cursor),
    }))
}

pub async fn get_post(
    path: Result<Path<Uuid>, PathRejection>,
    State(state): State<AppState>,
) -> Result<Json<Post>, AppError> {
    let id = path_param(path)?;
    let service = PostService::new(state.db.clone());
    let post = service.get_post(id).await.map_err(|err| {
        tracing::error!(error = ?err, post_id = %id, "failed to fetch post");
        AppError::internal("failed to fetch post")
    })?;

    match post {
        Some(post) => Ok(Json(post)),
        None => Err(AppError::not_found("post not found")),
    }
}

pub async fn delete_post(
    path: Result<Path<Uuid>, PathRejection>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let id = path_param(path)?;
    let service = PostService::new(state.db.clone());
    let deleted = service.delete_post(id, auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, post_id = %id, "failed to delete post");
        AppError::internal("failed to delete post")
    })?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("post not found"))
    }
}

// Comments

pub async fn create_comment(
    path: Result<Path<Uuid>, PathRejection>,
    auth: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<CommentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let post_id = path_param(path)?;
    let content = json_body(payload)?.validate()?;

    let service = CommentService::new(state.db.clone());
    let comment = service
        .create_comment(post_id, auth.user_id, content)
        .await
        .map_err(|err| {
            if is_missing_reference(&err) {
                return AppError::unauthorized("unknown user");
            }
            tracing::error!(error = ?err, user_id = %auth.user_id, post_id = %post_id, "failed to comment");
            AppError::internal("failed to comment")
        })?;

    match comment {
        Some(comment) => Ok((StatusCode::CREATED, Json(comment))),
        None => Err(AppError::not_found("post not found")),
    }
}

pub async fn list_post_comments(
    path: Result<Path<Uuid>, PathRejection>,
    State(state): State<AppState>,
    query: Result<Query<PaginationQuery>, QueryRejection>,
) -> Result<Json<ListResponse<Comment>>, AppError> {
    let post_id = path_param(path)?;
    let query = query_params(query)?;
    let limit = page_limit(query.limit)?;
    let cursor = parse_cursor(query.cursor)?;

    let posts = PostService::new(state.db.clone());
    let post = posts.get_post(post_id).await.map_err(|err| {
        tracing::error!(error = ?err, post_id = %post_id, "failed to fetch post");
        AppError::internal("failed to fetch post")
    })?;
    if post.is_none() {
        return Err(AppError::not_found("post not found"));
    }

    let service = CommentService::new(state.db.clone());
    let mut comments = service
        .list_by_post(post_id, cursor, limit + 1)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %post_id, "failed to list comments");
            AppError::internal("failed to list comments")
        })?;

    let next_cursor = if comments.len() > limit as usize {
        comments.truncate(limit as usize);
        comments.last().map(|last| (last.created_at, last.id))
    } else {
        None
    };

    Ok(Json(ListResponse {
        items: comments,
        next_cursor: encode_cursor(next_cursor),
    }))
}

pub async fn delete_comment(
    path: Result<Path<Uuid>, PathRejection>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let id = path_param(path)?;
    let service = CommentService::new(state.db.clone());
    let deleted = service
        .delete_comment(id, auth.user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, comment_id = %id, user_id = %auth.user_id, "failed to delete comment");
            AppError::internal("failed to delete comment")
        })?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("comment not found"))
    }
}
