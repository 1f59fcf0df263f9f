//! Lounge, Post and Comment Tests
//!
//! Covers lounge creation and membership, posting into lounges, soft
//! deletes and the comment counter.

mod common;

use axum::http::StatusCode;
use common::{app, unique};
use serde_json::json;
use uuid::Uuid;

// ===========================================================================
// Lounges
// ===========================================================================

#[tokio::test]
async fn create_lounge_makes_owner_first_member() {
    let app = app().await;
    let user = app.create_user("lounge_owner").await;
    let name = unique("Seventeen Carats ");

    let resp = app
        .post_json(
            "/lounges",
            json!({ "name": format!("  {}  ", name), "description": "fan lounge" }),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::CREATED);
    let body = resp.json();
    assert_eq!(body["name"], name.as_str());
    assert_eq!(body["description"], "fan lounge");
    assert_eq!(body["owner_id"], user.id.to_string());
    assert_eq!(body["member_count"], 1);

    let id = body["id"].as_str().unwrap();
    let fetched = app.get(&format!("/lounges/{}", id), None).await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.json()["name"], name.as_str());
}

#[tokio::test]
async fn duplicate_lounge_name_conflicts_case_insensitively() {
    let app = app().await;
    let user = app.create_user("lounge_dup").await;
    let name = unique("army ");

    let first = app
        .post_json("/lounges", json!({ "name": name }), Some(&user.access_token))
        .await;
    assert_eq!(first.status, StatusCode::CREATED);

    let second = app
        .post_json(
            "/lounges",
            json!({ "name": name.to_uppercase() }),
            Some(&user.access_token),
        )
        .await;
    assert_eq!(second.status, StatusCode::CONFLICT);
    assert_eq!(second.error_message(), "lounge name already taken");
    assert_eq!(second.error_code(), "conflict");
}

#[tokio::test]
async fn create_lounge_validates_name() {
    let app = app().await;
    let user = app.create_user("lounge_invalid").await;

    let resp = app
        .post_json("/lounges", json!({ "name": "ab" }), Some(&user.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "name must be at least 3 characters");

    let resp = app
        .post_json(
            "/lounges",
            json!({ "name": "n".repeat(51) }),
            Some(&user.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.json()["fields"][0]["code"], "too_long");

    let resp = app.post_json("/lounges", json!({ "name": "nobody" }), None).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn join_and_leave_track_member_count() {
    let app = app().await;
    let owner = app.create_user("join_owner").await;
    let fan = app.create_user("join_fan").await;

    let created = app
        .post_json(
            "/lounges",
            json!({ "name": unique("blink ") }),
            Some(&owner.access_token),
        )
        .await;
    let id = created.json()["id"].as_str().unwrap().to_string();

    let joined = app
        .post_json(&format!("/lounges/{}/join", id), json!({}), Some(&fan.access_token))
        .await;
    assert_eq!(joined.status, StatusCode::OK);
    assert_eq!(joined.json()["joined"], true);

    let again = app
        .post_json(&format!("/lounges/{}/join", id), json!({}), Some(&fan.access_token))
        .await;
    assert_eq!(again.json()["joined"], false);

    let lounge = app.get(&format!("/lounges/{}", id), None).await;
    assert_eq!(lounge.json()["member_count"], 2);

    let left = app
        .post_json(&format!("/lounges/{}/leave", id), json!({}), Some(&fan.access_token))
        .await;
    assert_eq!(left.status, StatusCode::OK);
    assert_eq!(left.json()["left"], true);

    let left_again = app
        .post_json(&format!("/lounges/{}/leave", id), json!({}), Some(&fan.access_token))
        .await;
    assert_eq!(left_again.json()["left"], false);

    let lounge = app.get(&format!("/lounges/{}", id), None).await;
    assert_eq!(lounge.json()["member_count"], 1);
}

#[tokio::test]
async fn owner_cannot_leave() {
    let app = app().await;
    let owner = app.create_user("leave_owner").await;

    let created = app
        .post_json(
            "/lounges",
            json!({ "name": unique("once ") }),
            Some(&owner.access_token),
        )
        .await;
    let id = created.json()["id"].as_str().unwrap().to_string();

    let resp = app
        .post_json(&format!("/lounges/{}/leave", id), json!({}), Some(&owner.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "lounge owner cannot leave");
}

#[tokio::test]
async fn missing_lounge_is_not_found() {
    let app = app().await;
    let user = app.create_user("lounge_missing").await;
    let ghost = Uuid::new_v4();

    let resp = app.get(&format!("/lounges/{}", ghost), None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let resp = app
        .post_json(&format!("/lounges/{}/join", ghost), json!({}), Some(&user.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.error_message(), "lounge not found");
}

#[tokio::test]
async fn lounge_list_is_sorted_by_member_count() {
    let app = app().await;
    let user = app.create_user("lounge_list").await;
    app.create_lounge(user.id, &unique("big "), "", 5_000).await;
    app.create_lounge(user.id, &unique("small "), "", 0).await;

    let resp = app.get("/lounges?page=1&limit=50", None).await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert!(body["total"].as_i64().unwrap() >= 2);
    assert_eq!(body["page"], 1);
    assert_eq!(body["limit"], 50);
    let counts: Vec<i64> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|lounge| lounge["member_count"].as_i64().unwrap())
        .collect();
    assert!(counts.windows(2).all(|pair| pair[0] >= pair[1]));

    let resp = app.get("/lounges?limit=0", None).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

// ===========================================================================
// Posts
// ===========================================================================

#[tokio::test]
async fn create_post_normalizes_tags() {
    let app = app().await;
    let (user, lounge_id) = app.user_with_lounge("post_create").await;

    let resp = app
        .post_json(
            &format!("/lounges/{}/posts", lounge_id),
            json!({
                "title": "Comeback stage",
                "content": "who else cried",
                "tags": ["#KPop", "kpop", " Dance "],
            }),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::CREATED);
    let body = resp.json();
    assert_eq!(body["lounge_id"], lounge_id.to_string());
    assert_eq!(body["author_id"], user.id.to_string());
    assert_eq!(body["author_handle"], user.handle.as_str());
    assert_eq!(body["tags"], json!(["kpop", "dance"]));
    assert_eq!(body["upvote_count"], 0);
    assert_eq!(body["comment_count"], 0);
}

#[tokio::test]
async fn create_post_rejects_bad_input() {
    let app = app().await;
    let (user, lounge_id) = app.user_with_lounge("post_invalid").await;
    let path = format!("/lounges/{}/posts", lounge_id);

    let resp = app
        .post_json(&path, json!({ "title": "", "content": "x" }), Some(&user.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "title cannot be empty");

    let tags: Vec<String> = (0..11).map(|i| format!("tag{}", i)).collect();
    let resp = app
        .post_json(
            &path,
            json!({ "title": "t", "content": "x", "tags": tags }),
            Some(&user.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.json()["fields"][0]["code"], "invalid_tags");
}

#[tokio::test]
async fn create_post_in_missing_lounge_is_not_found() {
    let app = app().await;
    let user = app.create_user("post_nolounge").await;

    let resp = app
        .post_json(
            &format!("/lounges/{}/posts", Uuid::new_v4()),
            json!({ "title": "t", "content": "x" }),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.error_message(), "lounge not found");
}

#[tokio::test]
async fn lounge_posts_page_through_cursor() {
    let app = app().await;
    let (user, lounge_id) = app.user_with_lounge("post_cursor").await;

    let mut created = Vec::new();
    for i in 0..5 {
        created.push(
            app.create_post(lounge_id, user.id, &format!("post {}", i), "x", &[])
                .await,
        );
    }

    let mut seen = Vec::new();
    let mut path = format!("/lounges/{}/posts?limit=2", lounge_id);
    loop {
        let resp = app.get(&path, None).await;
        assert_eq!(resp.status, StatusCode::OK);
        let body = resp.json();
        for item in body["items"].as_array().unwrap() {
            seen.push(Uuid::parse_str(item["id"].as_str().unwrap()).unwrap());
        }
        match body["next_cursor"].as_str() {
            Some(cursor) => {
                path = format!("/lounges/{}/posts?limit=2&cursor={}", lounge_id, cursor)
            }
            None => break,
        }
    }

    created.reverse();
    assert_eq!(seen, created);

    let resp = app
        .get(&format!("/lounges/{}/posts?cursor=garbage", lounge_id), None)
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "invalid cursor");
}

#[tokio::test]
async fn delete_post_is_author_only_and_soft() {
    let app = app().await;
    let (author, lounge_id) = app.user_with_lounge("post_delete").await;
    let stranger = app.create_user("post_stranger").await;
    let post_id = app
        .create_post(lounge_id, author.id, "Leaving soon", "x", &[])
        .await;

    let resp = app
        .delete(&format!("/posts/{}", post_id), Some(&stranger.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let resp = app
        .delete(&format!("/posts/{}", post_id), Some(&author.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let resp = app.get(&format!("/posts/{}", post_id), None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let still_stored: bool =
        sqlx::query_scalar("SELECT deleted_at IS NOT NULL FROM posts WHERE id = $1")
            .bind(post_id)
            .fetch_one(app.pool())
            .await
            .unwrap();
    assert!(still_stored);
}

// ===========================================================================
// Comments
// ===========================================================================

#[tokio::test]
async fn comments_keep_post_counter_in_step() {
    let app = app().await;
    let (author, lounge_id) = app.user_with_lounge("comment_count").await;
    let fan = app.create_user("comment_fan").await;
    let post_id = app
        .create_post(lounge_id, author.id, "Concert day", "who's going", &[])
        .await;

    let created = app
        .post_json(
            &format!("/posts/{}/comments", post_id),
            json!({ "content": "  me!  " }),
            Some(&fan.access_token),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.json()["content"], "me!");
    assert_eq!(created.json()["author_handle"], fan.handle.as_str());
    let comment_id = created.json()["id"].as_str().unwrap().to_string();

    app.post_json(
        &format!("/posts/{}/comments", post_id),
        json!({ "content": "see you there" }),
        Some(&author.access_token),
    )
    .await;

    let post = app.get(&format!("/posts/{}", post_id), None).await;
    assert_eq!(post.json()["comment_count"], 2);

    let list = app.get(&format!("/posts/{}/comments", post_id), None).await;
    assert_eq!(list.status, StatusCode::OK);
    assert_eq!(list.json()["items"].as_array().unwrap().len(), 2);

    // only the author can remove a comment
    let resp = app
        .delete(&format!("/comments/{}", comment_id), Some(&author.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let resp = app
        .delete(&format!("/comments/{}", comment_id), Some(&fan.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let post = app.get(&format!("/posts/{}", post_id), None).await;
    assert_eq!(post.json()["comment_count"], 1);
    let list = app.get(&format!("/posts/{}/comments", post_id), None).await;
    assert_eq!(list.json()["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn comment_on_deleted_post_is_not_found() {
    let app = app().await;
    let (author, lounge_id) = app.user_with_lounge("comment_gone").await;
    let post_id = app
        .create_post(lounge_id, author.id, "Gone", "x", &[])
        .await;
    app.soft_delete_post(post_id).await;

    let resp = app
        .post_json(
            &format!("/posts/{}/comments", post_id),
            json!({ "content": "hello?" }),
            Some(&author.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.error_message(), "post not found");

    let resp = app
        .post_json(
            &format!("/posts/{}/comments", post_id),
            json!({ "content": "" }),
            Some(&author.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

// ===========================================================================
// Malformed paths and queries
// ===========================================================================

#[tokio::test]
async fn malformed_ids_get_json_errors() {
    let app = app().await;

    for path in ["/posts/not-a-uuid", "/lounges/not-a-uuid", "/lounges/123/posts"] {
        let resp = app.get(path, None).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST, "{}", path);
        assert_eq!(resp.error_code(), "validation_error", "{}", path);
        assert!(!resp.error_message().is_empty());
    }

    let user = app.create_user("bad_path").await;
    let resp = app
        .post_json(
            "/posts/not-a-uuid/comments",
            json!({ "content": "hi" }),
            Some(&user.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_code(), "validation_error");
}

#[tokio::test]
async fn malformed_pagination_gets_json_error() {
    let app = app().await;
    let (user, lounge_id) = app.user_with_lounge("bad_page").await;
    let post_id = app.create_post(lounge_id, user.id, "Paged", "x", &[]).await;

    let resp = app
        .get(&format!("/posts/{}/comments?limit=abc", post_id), None)
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_code(), "validation_error");

    let resp = app
        .get(&format!("/lounges/{}/posts?limit=abc", lounge_id), None)
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_code(), "validation_error");
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app().await;
    let resp = app.get("/health", None).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["status"], "ok");
}
