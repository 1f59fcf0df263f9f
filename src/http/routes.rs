use axum::{routing::delete, routing::get, routing::post, Router};

use crate::AppState;
use crate::http::handlers;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn votes() -> Router<AppState> {
    Router::new().route("/votes", post(handlers::cast_vote).get(handlers::get_vote))
}

pub fn search() -> Router<AppState> {
    Router::new()
        .route("/search", get(handlers::search))
        .route("/search/tags", get(handlers::search_tags))
        .route("/search/tags/:tag", get(handlers::get_tag))
}

pub fn lounges() -> Router<AppState> {
    Router::new()
        .route("/lounges", post(handlers::create_lounge).get(handlers::list_lounges))
        .route("/lounges/:id", get(handlers::get_lounge))
        .route("/lounges/:id/join", post(handlers::join_lounge))
        .route("/lounges/:id/leave", post(handlers::leave_lounge))
        .route(
            "/lounges/:id/posts",
            post(handlers::create_post).get(handlers::list_lounge_posts),
        )
}

pub fn posts() -> Router<AppState> {
    Router::new()
        .route("/posts/:id", get(handlers::get_post).delete(handlers::delete_post))
        .route(
            "/posts/:id/comments",
            post(handlers::create_comment).get(handlers::list_post_comments),
        )
        .route("/comments/:id", delete(handlers::delete_comment))
}
