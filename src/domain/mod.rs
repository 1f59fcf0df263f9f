pub mod comment;
pub mod lounge;
pub mod post;
pub mod search;
pub mod vote;
