pub mod auth;
pub mod comments;
pub mod lounges;
pub mod posts;
pub mod search;
pub mod votes;
