// Integration tests for posts, comments, likes, the feed and notifications.
// Run with: cargo test --test social_test

mod common;

use actix_web::{http::StatusCode, test};
use common::{bearer, create_member, create_test_app};
use serde_json::{json, Value};
use social_library_api::models::{NotificationCount, PostResponse};

#[actix_web::test]
async fn test_posts_require_auth() {
    let (app, _pool, _config) = create_test_app().await;
    let app = test::init_service(app).await;

    for uri in ["/api/posts/posts", "/api/posts/feed", "/api/notifications"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(
            resp.status(),
            StatusCode::UNAUTHORIZED,
            "{uri} without a token should return 401"
        );
    }
}

#[actix_web::test]
async fn test_post_crud_and_ownership() {
    let (app, pool, config) = create_test_app().await;
    let app = test::init_service(app).await;
    let (alice, alice_token) = create_member(&pool, &config, "alice").await;
    let (_, bob_token) = create_member(&pool, &config, "bob").await;

    let req = test::TestRequest::post()
        .uri("/api/posts/posts")
        .insert_header(bearer(&alice_token))
        .set_json(json!({ "title": "Hello", "content": "First post" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(
        resp.status(),
        StatusCode::CREATED,
        "Creating a post should return 201 CREATED"
    );
    let post: PostResponse = test::read_body_json(resp).await;
    assert_eq!(post.author.id, alice.id);
    assert_eq!(post.likes_count, 0);
    assert!(!post.is_liked);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/posts/posts/{}", post.id))
        .insert_header(bearer(&bob_token))
        .set_json(json!({ "title": "Hijacked" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(
        resp.status(),
        StatusCode::FORBIDDEN,
        "Only the author may edit a post"
    );

    let req = test::TestRequest::patch()
        .uri(&format!("/api/posts/posts/{}", post.id))
        .insert_header(bearer(&alice_token))
        .set_json(json!({ "title": "Hello again" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: PostResponse = test::read_body_json(resp).await;
    assert_eq!(updated.title, "Hello again");
    assert_eq!(updated.content, "First post");

    let req = test::TestRequest::post()
        .uri("/api/posts/posts")
        .insert_header(bearer(&alice_token))
        .set_json(json!({ "title": "", "content": "" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/posts/posts/{}", post.id))
        .insert_header(bearer(&bob_token))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );

    let req = test::TestRequest::delete()
        .uri(&format!("/api/posts/posts/{}", post.id))
        .insert_header(bearer(&alice_token))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NO_CONTENT
    );

    let req = test::TestRequest::get()
        .uri(&format!("/api/posts/posts/{}", post.id))
        .insert_header(bearer(&alice_token))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[actix_web::test]
async fn test_like_twice_and_unlike() {
    let (app, pool, config) = create_test_app().await;
    let app = test::init_service(app).await;
    let (_, alice_token) = create_member(&pool, &config, "alice").await;
    let (_, bob_token) = create_member(&pool, &config, "bob").await;

    let req = test::TestRequest::post()
        .uri("/api/posts/posts")
        .insert_header(bearer(&alice_token))
        .set_json(json!({ "title": "Likeable", "content": "Please like" }))
        .to_request();
    let post: PostResponse = test::read_body_json(test::call_service(&app, req).await).await;

    let req = test::TestRequest::post()
        .uri(&format!("/api/posts/posts/{}/like", post.id))
        .insert_header(bearer(&bob_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(
        resp.status(),
        StatusCode::CREATED,
        "First like should return 201 CREATED"
    );

    let req = test::TestRequest::post()
        .uri(&format!("/api/posts/posts/{}/like", post.id))
        .insert_header(bearer(&bob_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(
        resp.status(),
        StatusCode::BAD_REQUEST,
        "Second like should return 400"
    );
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "You have already liked this post.");

    let req = test::TestRequest::get()
        .uri(&format!("/api/posts/posts/{}", post.id))
        .insert_header(bearer(&bob_token))
        .to_request();
    let fetched: PostResponse = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(fetched.likes_count, 1, "Like count should stay at 1");
    assert!(fetched.is_liked);

    let req = test::TestRequest::get()
        .uri(&format!("/api/posts/likes?post={}", post.id))
        .insert_header(bearer(&bob_token))
        .to_request();
    let likes: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(likes.as_array().unwrap().len(), 1);
    assert_eq!(likes[0]["user"]["username"], "bob");

    let req = test::TestRequest::delete()
        .uri(&format!("/api/posts/posts/{}/unlike", post.id))
        .insert_header(bearer(&bob_token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri(&format!("/api/posts/posts/{}/unlike", post.id))
        .insert_header(bearer(&bob_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "You have not liked this post.");

    let req = test::TestRequest::post()
        .uri("/api/posts/posts/9999/like")
        .insert_header(bearer(&bob_token))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[actix_web::test]
async fn test_notifications_fan_out() {
    let (app, pool, config) = create_test_app().await;
    let app = test::init_service(app).await;
    let (_, alice_token) = create_member(&pool, &config, "alice").await;
    let (_, bob_token) = create_member(&pool, &config, "bob").await;

    let req = test::TestRequest::post()
        .uri("/api/posts/posts")
        .insert_header(bearer(&alice_token))
        .set_json(json!({ "title": "News", "content": "Big news" }))
        .to_request();
    let post: PostResponse = test::read_body_json(test::call_service(&app, req).await).await;

    // Acting on your own post produces nothing.
    let req = test::TestRequest::post()
        .uri(&format!("/api/posts/posts/{}/like", post.id))
        .insert_header(bearer(&alice_token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri(&format!("/api/posts/posts/{}/like", post.id))
        .insert_header(bearer(&bob_token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri("/api/posts/comments")
        .insert_header(bearer(&bob_token))
        .set_json(json!({ "post": post.id, "content": "Congrats!" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = test::TestRequest::get()
        .uri("/api/notifications/count")
        .insert_header(bearer(&alice_token))
        .to_request();
    let count: NotificationCount = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(count.unread_count, 2);
    assert_eq!(count.total_count, 2);

    let req = test::TestRequest::get()
        .uri("/api/notifications")
        .insert_header(bearer(&alice_token))
        .to_request();
    let list: Value = test::read_body_json(test::call_service(&app, req).await).await;
    let list = list.as_array().unwrap();
    assert_eq!(list[0]["notification_type"], "comment", "Newest first");
    assert_eq!(list[1]["notification_type"], "like");
    assert_eq!(list[1]["target"], json!({ "type": "post", "id": post.id }));
    assert_eq!(
        list[1]["target_url"],
        format!("/api/posts/posts/{}/", post.id)
    );
    let like_notification = list[1]["id"].as_i64().unwrap();

    // Bob cannot see Alice's notification.
    let req = test::TestRequest::get()
        .uri(&format!("/api/notifications/{}", like_notification))
        .insert_header(bearer(&bob_token))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );

    let req = test::TestRequest::post()
        .uri(&format!("/api/notifications/{}/mark_as_read", like_notification))
        .insert_header(bearer(&alice_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["is_read"], true);

    let req = test::TestRequest::get()
        .uri("/api/notifications/unread")
        .insert_header(bearer(&alice_token))
        .to_request();
    let unread: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(unread.as_array().unwrap().len(), 1);

    let req = test::TestRequest::post()
        .uri("/api/notifications/mark_all_as_read")
        .insert_header(bearer(&alice_token))
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["updated_count"], 1);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/notifications/{}", like_notification))
        .insert_header(bearer(&alice_token))
        .set_json(json!({ "is_read": false }))
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["is_read"], false);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/notifications/{}", like_notification))
        .insert_header(bearer(&alice_token))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NO_CONTENT
    );

    // Bob acted on someone else's content only, so his inbox is empty.
    let req = test::TestRequest::get()
        .uri("/api/notifications/count")
        .insert_header(bearer(&bob_token))
        .to_request();
    let count: NotificationCount = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(count.total_count, 0);
}

#[actix_web::test]
async fn test_comments_are_owned() {
    let (app, pool, config) = create_test_app().await;
    let app = test::init_service(app).await;
    let (_, alice_token) = create_member(&pool, &config, "alice").await;
    let (_, bob_token) = create_member(&pool, &config, "bob").await;

    let req = test::TestRequest::post()
        .uri("/api/posts/posts")
        .insert_header(bearer(&alice_token))
        .set_json(json!({ "title": "Thread", "content": "Discuss" }))
        .to_request();
    let post: PostResponse = test::read_body_json(test::call_service(&app, req).await).await;

    let mut comment_ids = Vec::new();
    for (token, text) in [(&alice_token, "first"), (&bob_token, "second")] {
        let req = test::TestRequest::post()
            .uri("/api/posts/comments")
            .insert_header(bearer(token))
            .set_json(json!({ "post": post.id, "content": text }))
            .to_request();
        let comment: Value = test::read_body_json(test::call_service(&app, req).await).await;
        comment_ids.push(comment["id"].as_i64().unwrap());
    }

    let req = test::TestRequest::get()
        .uri(&format!("/api/posts/posts/{}/comments", post.id))
        .insert_header(bearer(&bob_token))
        .to_request();
    let comments: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(comments[0]["content"], "first", "Oldest comment first");
    assert_eq!(comments[1]["content"], "second");

    let req = test::TestRequest::put()
        .uri(&format!("/api/posts/comments/{}", comment_ids[0]))
        .insert_header(bearer(&bob_token))
        .set_json(json!({ "content": "edited by bob" }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );

    let req = test::TestRequest::put()
        .uri(&format!("/api/posts/comments/{}", comment_ids[1]))
        .insert_header(bearer(&bob_token))
        .set_json(json!({ "content": "second, edited" }))
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["content"], "second, edited");

    let req = test::TestRequest::post()
        .uri("/api/posts/comments")
        .insert_header(bearer(&bob_token))
        .set_json(json!({ "post": 9999, "content": "lost" }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[actix_web::test]
async fn test_feed_shows_followed_users_and_self() {
    let (app, pool, config) = create_test_app().await;
    let app = test::init_service(app).await;
    let (_, alice_token) = create_member(&pool, &config, "alice").await;
    let (bob, bob_token) = create_member(&pool, &config, "bob").await;
    let (_, carol_token) = create_member(&pool, &config, "carol").await;

    for (token, title) in [
        (&alice_token, "alice post"),
        (&bob_token, "bob post"),
        (&carol_token, "carol post"),
    ] {
        let req = test::TestRequest::post()
            .uri("/api/posts/posts")
            .insert_header(bearer(token))
            .set_json(json!({ "title": title, "content": "..." }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
    }

    let req = test::TestRequest::post()
        .uri(&format!("/api/auth/follow/{}", bob.id))
        .insert_header(bearer(&alice_token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/posts/feed")
        .insert_header(bearer(&alice_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let feed: Vec<PostResponse> = test::read_body_json(resp).await;
    let titles: Vec<&str> = feed.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["bob post", "alice post"], "Newest first, no strangers");

    let req = test::TestRequest::get()
        .uri("/api/posts/posts?ordering=created_at&search=post")
        .insert_header(bearer(&alice_token))
        .to_request();
    let all: Vec<PostResponse> = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].title, "alice post");

    let req = test::TestRequest::get()
        .uri(&format!("/api/posts/posts?author={}", bob.id))
        .insert_header(bearer(&alice_token))
        .to_request();
    let by_bob: Vec<PostResponse> = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(by_bob.len(), 1);
}

#[actix_web::test]
async fn test_posts_ordered_by_likes_and_far_pages() {
    let (app, pool, config) = create_test_app().await;
    let app = test::init_service(app).await;
    let (_, alice_token) = create_member(&pool, &config, "alice").await;
    let (_, bob_token) = create_member(&pool, &config, "bob").await;
    let (_, carol_token) = create_member(&pool, &config, "carol").await;

    let mut ids = Vec::new();
    for title in ["quiet", "popular", "liked once"] {
        let req = test::TestRequest::post()
            .uri("/api/posts/posts")
            .insert_header(bearer(&alice_token))
            .set_json(json!({ "title": title, "content": "..." }))
            .to_request();
        let post: PostResponse = test::read_body_json(test::call_service(&app, req).await).await;
        ids.push(post.id);
    }

    for (token, post_id) in [(&bob_token, ids[1]), (&carol_token, ids[1]), (&bob_token, ids[2])] {
        let req = test::TestRequest::post()
            .uri(&format!("/api/posts/posts/{}/like", post_id))
            .insert_header(bearer(token))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
    }

    let req = test::TestRequest::get()
        .uri("/api/posts/posts?ordering=-likes_count")
        .insert_header(bearer(&alice_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let posts: Vec<PostResponse> = test::read_body_json(resp).await;
    let titles: Vec<&str> = posts.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["popular", "liked once", "quiet"]);
    assert_eq!(posts[0].likes_count, 2);

    let req = test::TestRequest::get()
        .uri("/api/posts/posts?ordering=likes_count")
        .insert_header(bearer(&alice_token))
        .to_request();
    let posts: Vec<PostResponse> = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(posts[0].title, "quiet");

    let req = test::TestRequest::get()
        .uri("/api/posts/posts?page=18446744073709551615&limit=100")
        .insert_header(bearer(&alice_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(
        resp.status(),
        StatusCode::OK,
        "A page far past the end should be empty, not an error"
    );
    let posts: Vec<PostResponse> = test::read_body_json(resp).await;
    assert!(posts.is_empty());
}
