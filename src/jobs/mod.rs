pub mod tag_popularity;
