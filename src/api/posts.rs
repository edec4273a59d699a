use crate::auth::AuthenticatedUser;
use crate::db::DbPool;
use crate::entities::{comment, like, post};
use crate::error::{is_unique_violation, ApiError, ApiResult, FieldErrors};
use crate::models::{
    page_window, CommentQuery, CommentRequest, CommentResponse, CreatePostRequest,
    DetailResponse, LikeQuery, PageQuery, PostQuery, UpdateCommentRequest, UpdatePostRequest,
};
use crate::services::notification::{notify_comment, notify_like};
use crate::services::posts::{
    comment_responses, find_post, like_responses, post_response, post_responses,
};
use crate::services::users::following_ids;
use crate::validation::{strip_script_tags, TITLE_MAX};
use actix_web::{web, HttpResponse};
use chrono::Utc;
use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, IntoSimpleExpr, ModelTrait,
    Order, QueryFilter, QueryOrder, QuerySelect, Set,
};

const POSTS_PER_PAGE: u64 = 10;
const COMMENTS_PER_PAGE: u64 = 50;

fn clean_title(errors: &mut FieldErrors, title: &str) -> String {
    let title = strip_script_tags(title.trim());
    if title.is_empty() {
        errors.add("title", "This field may not be blank.");
    } else if title.chars().count() > TITLE_MAX {
        errors.add(
            "title",
            format!("Ensure this field has no more than {} characters.", TITLE_MAX),
        );
    }
    title
}

fn clean_content(errors: &mut FieldErrors, content: &str) -> String {
    let content = strip_script_tags(content.trim());
    if content.is_empty() {
        errors.add("content", "This field may not be blank.");
    }
    content
}

fn likes_count() -> SimpleExpr {
    Expr::cust("(SELECT COUNT(*) FROM post_likes WHERE post_likes.post_id = posts.id)")
}

/// Maps an `ordering` query value onto a sort expression and direction.
fn post_ordering(ordering: Option<&str>) -> (SimpleExpr, Order) {
    match ordering {
        Some("created_at") => (post::Column::CreatedAt.into_simple_expr(), Order::Asc),
        Some("updated_at") => (post::Column::UpdatedAt.into_simple_expr(), Order::Asc),
        Some("-updated_at") => (post::Column::UpdatedAt.into_simple_expr(), Order::Desc),
        Some("likes_count") => (likes_count(), Order::Asc),
        Some("-likes_count") => (likes_count(), Order::Desc),
        _ => (post::Column::CreatedAt.into_simple_expr(), Order::Desc),
    }
}

fn ensure_owner(owner_id: i64, user: &AuthenticatedUser) -> ApiResult<()> {
    if owner_id == user.user_id {
        Ok(())
    } else {
        log::warn!("User {} tried to modify content owned by {}", user.user_id, owner_id);
        Err(ApiError::forbidden())
    }
}

async fn find_comment(pool: &DbPool, comment_id: i64) -> ApiResult<comment::Model> {
    comment::Entity::find_by_id(comment_id)
        .one(pool)
        .await?
        .ok_or(ApiError::NotFound("Comment"))
}

#[utoipa::path(
    get,
    path = "/api/posts/posts",
    params(
        ("author" = Option<i64>, Query, description = "Only posts by this user ID"),
        ("search" = Option<String>, Query, description = "Substring of the title or content"),
        ("ordering" = Option<String>, Query, description = "created_at, -created_at (default), updated_at, -updated_at, likes_count or -likes_count"),
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 10)")
    ),
    responses(
        (status = 200, description = "List of posts", body = Vec<PostResponse>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "posts"
)]
pub async fn list_posts(
    query: web::Query<PostQuery>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let (offset, limit) = page_window(query.page, query.limit, POSTS_PER_PAGE);
    let (order_expr, order) = post_ordering(query.ordering.as_deref());

    let mut select = post::Entity::find();
    if let Some(author_id) = query.author {
        select = select.filter(post::Column::AuthorId.eq(author_id));
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        select = select.filter(
            post::Column::Title
                .contains(search)
                .or(post::Column::Content.contains(search)),
        );
    }
    let posts = select
        .order_by(order_expr, order)
        .order_by_desc(post::Column::Id)
        .limit(limit)
        .offset(offset)
        .all(pool.get_ref())
        .await?;
    let response = post_responses(pool.get_ref(), posts, user.user_id).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    post,
    path = "/api/posts/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Post created", body = PostResponse),
        (status = 400, description = "Validation errors keyed by field"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "posts"
)]
pub async fn create_post(
    req: web::Json<CreatePostRequest>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let mut errors = FieldErrors::new();
    let title = clean_title(&mut errors, &req.title);
    let content = clean_content(&mut errors, &req.content);
    errors.into_result()?;

    let now = Utc::now();
    let new_post = post::ActiveModel {
        author_id: Set(user.user_id),
        title: Set(title),
        content: Set(content),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let post = post::Entity::insert(new_post)
        .exec_with_returning(pool.get_ref())
        .await?;

    log::info!("User {} created post {}", user.user_id, post.id);
    let response = post_response(pool.get_ref(), post, user.user_id).await?;
    Ok(HttpResponse::Created().json(response))
}

#[utoipa::path(
    get,
    path = "/api/posts/posts/{post_id}",
    params(("post_id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post with comments and likes", body = PostResponse),
        (status = 404, description = "Post not found")
    ),
    security(("bearer_auth" = [])),
    tag = "posts"
)]
pub async fn get_post(
    path: web::Path<i64>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let post = find_post(pool.get_ref(), path.into_inner()).await?;
    let response = post_response(pool.get_ref(), post, user.user_id).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Serves both PUT and PATCH; absent fields keep their stored value.
#[utoipa::path(
    put,
    path = "/api/posts/posts/{post_id}",
    params(("post_id" = i64, Path, description = "Post ID")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Post updated", body = PostResponse),
        (status = 400, description = "Validation errors keyed by field"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Post not found")
    ),
    security(("bearer_auth" = [])),
    tag = "posts"
)]
pub async fn update_post(
    path: web::Path<i64>,
    req: web::Json<UpdatePostRequest>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let existing = find_post(pool.get_ref(), path.into_inner()).await?;
    ensure_owner(existing.author_id, &user)?;

    let mut errors = FieldErrors::new();
    let title = req.title.as_deref().map(|t| clean_title(&mut errors, t));
    let content = req.content.as_deref().map(|c| clean_content(&mut errors, c));
    errors.into_result()?;

    let mut active = existing.into_active_model();
    if let Some(title) = title {
        active.title = Set(title);
    }
    if let Some(content) = content {
        active.content = Set(content);
    }
    active.updated_at = Set(Utc::now());
    let post = active.update(pool.get_ref()).await?;

    log::info!("User {} updated post {}", user.user_id, post.id);
    let response = post_response(pool.get_ref(), post, user.user_id).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    delete,
    path = "/api/posts/posts/{post_id}",
    params(("post_id" = i64, Path, description = "Post ID")),
    responses(
        (status = 204, description = "Post deleted"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Post not found")
    ),
    security(("bearer_auth" = [])),
    tag = "posts"
)]
pub async fn delete_post(
    path: web::Path<i64>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let post = find_post(pool.get_ref(), path.into_inner()).await?;
    ensure_owner(post.author_id, &user)?;
    let post_id = post.id;
    post.delete(pool.get_ref()).await?;

    log::info!("User {} deleted post {}", user.user_id, post_id);
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    post,
    path = "/api/posts/posts/{post_id}/like",
    params(("post_id" = i64, Path, description = "Post ID")),
    responses(
        (status = 201, description = "Post liked", body = LikeResponse),
        (status = 400, description = "Already liked"),
        (status = 404, description = "Post not found")
    ),
    security(("bearer_auth" = [])),
    tag = "posts"
)]
pub async fn like_post(
    path: web::Path<i64>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let post = find_post(pool.get_ref(), path.into_inner()).await?;
    let already_liked = || ApiError::BadRequest("You have already liked this post.".to_string());

    let existing = like::Entity::find()
        .filter(like::Column::UserId.eq(user.user_id))
        .filter(like::Column::PostId.eq(post.id))
        .one(pool.get_ref())
        .await?;
    if existing.is_some() {
        return Err(already_liked());
    }

    let new_like = like::ActiveModel {
        user_id: Set(user.user_id),
        post_id: Set(post.id),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    let like = match like::Entity::insert(new_like)
        .exec_with_returning(pool.get_ref())
        .await
    {
        Ok(like) => like,
        Err(e) if is_unique_violation(&e) => return Err(already_liked()),
        Err(e) => return Err(e.into()),
    };

    log::info!("User {} liked post {}", user.user_id, post.id);
    notify_like(pool.get_ref(), user.user_id, &post).await;

    let response = like_responses(pool.get_ref(), vec![like])
        .await?
        .pop()
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("like expansion returned nothing")))?;
    Ok(HttpResponse::Created().json(response))
}

#[utoipa::path(
    post,
    path = "/api/posts/posts/{post_id}/unlike",
    params(("post_id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Like removed", body = DetailResponse),
        (status = 400, description = "Post was not liked"),
        (status = 404, description = "Post not found")
    ),
    security(("bearer_auth" = [])),
    tag = "posts"
)]
pub async fn unlike_post(
    path: web::Path<i64>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let post = find_post(pool.get_ref(), path.into_inner()).await?;
    let removed = like::Entity::delete_many()
        .filter(like::Column::UserId.eq(user.user_id))
        .filter(like::Column::PostId.eq(post.id))
        .exec(pool.get_ref())
        .await?;
    if removed.rows_affected == 0 {
        return Err(ApiError::BadRequest(
            "You have not liked this post.".to_string(),
        ));
    }

    log::info!("User {} unliked post {}", user.user_id, post.id);
    Ok(HttpResponse::Ok().json(DetailResponse::new("Post unliked.")))
}

#[utoipa::path(
    get,
    path = "/api/posts/posts/{post_id}/comments",
    params(("post_id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Comments, oldest first", body = Vec<CommentResponse>),
        (status = 404, description = "Post not found")
    ),
    security(("bearer_auth" = [])),
    tag = "posts"
)]
pub async fn post_comments(
    path: web::Path<i64>,
    _user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let post = find_post(pool.get_ref(), path.into_inner()).await?;
    let comments = post
        .find_related(comment::Entity)
        .order_by_asc(comment::Column::CreatedAt)
        .order_by_asc(comment::Column::Id)
        .all(pool.get_ref())
        .await?;
    let response = comment_responses(pool.get_ref(), comments).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    get,
    path = "/api/posts/comments",
    params(
        ("post" = Option<i64>, Query, description = "Only comments on this post"),
        ("author" = Option<i64>, Query, description = "Only comments by this user"),
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 50)")
    ),
    responses((status = 200, description = "Comments, oldest first", body = Vec<CommentResponse>)),
    security(("bearer_auth" = [])),
    tag = "comments"
)]
pub async fn list_comments(
    query: web::Query<CommentQuery>,
    _user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let (offset, limit) = page_window(query.page, query.limit, COMMENTS_PER_PAGE);
    let mut select = comment::Entity::find();
    if let Some(post_id) = query.post {
        select = select.filter(comment::Column::PostId.eq(post_id));
    }
    if let Some(author_id) = query.author {
        select = select.filter(comment::Column::AuthorId.eq(author_id));
    }
    let comments = select
        .order_by_asc(comment::Column::CreatedAt)
        .order_by_asc(comment::Column::Id)
        .limit(limit)
        .offset(offset)
        .all(pool.get_ref())
        .await?;
    let response = comment_responses(pool.get_ref(), comments).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    post,
    path = "/api/posts/comments",
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Comment created", body = CommentResponse),
        (status = 400, description = "Validation errors keyed by field"),
        (status = 404, description = "Post not found")
    ),
    security(("bearer_auth" = [])),
    tag = "comments"
)]
pub async fn create_comment(
    req: web::Json<CommentRequest>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let mut errors = FieldErrors::new();
    let content = clean_content(&mut errors, &req.content);
    errors.into_result()?;
    let post = find_post(pool.get_ref(), req.post).await?;

    let now = Utc::now();
    let new_comment = comment::ActiveModel {
        post_id: Set(post.id),
        author_id: Set(user.user_id),
        content: Set(content),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let comment = comment::Entity::insert(new_comment)
        .exec_with_returning(pool.get_ref())
        .await?;

    log::info!("User {} commented on post {}", user.user_id, post.id);
    notify_comment(pool.get_ref(), user.user_id, &post).await;

    let response = single_comment(pool.get_ref(), comment).await?;
    Ok(HttpResponse::Created().json(response))
}

async fn single_comment(pool: &DbPool, comment: comment::Model) -> ApiResult<CommentResponse> {
    comment_responses(pool, vec![comment])
        .await?
        .pop()
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("comment expansion returned nothing")))
}

#[utoipa::path(
    get,
    path = "/api/posts/comments/{comment_id}",
    params(("comment_id" = i64, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Comment", body = CommentResponse),
        (status = 404, description = "Comment not found")
    ),
    security(("bearer_auth" = [])),
    tag = "comments"
)]
pub async fn get_comment(
    path: web::Path<i64>,
    _user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let comment = find_comment(pool.get_ref(), path.into_inner()).await?;
    let response = single_comment(pool.get_ref(), comment).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    put,
    path = "/api/posts/comments/{comment_id}",
    params(("comment_id" = i64, Path, description = "Comment ID")),
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "Comment updated", body = CommentResponse),
        (status = 400, description = "Validation errors keyed by field"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Comment not found")
    ),
    security(("bearer_auth" = [])),
    tag = "comments"
)]
pub async fn update_comment(
    path: web::Path<i64>,
    req: web::Json<UpdateCommentRequest>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let existing = find_comment(pool.get_ref(), path.into_inner()).await?;
    ensure_owner(existing.author_id, &user)?;

    let mut errors = FieldErrors::new();
    let content = clean_content(&mut errors, &req.content);
    errors.into_result()?;

    let mut active = existing.into_active_model();
    active.content = Set(content);
    active.updated_at = Set(Utc::now());
    let comment = active.update(pool.get_ref()).await?;

    log::info!("User {} updated comment {}", user.user_id, comment.id);
    let response = single_comment(pool.get_ref(), comment).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    delete,
    path = "/api/posts/comments/{comment_id}",
    params(("comment_id" = i64, Path, description = "Comment ID")),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Comment not found")
    ),
    security(("bearer_auth" = [])),
    tag = "comments"
)]
pub async fn delete_comment(
    path: web::Path<i64>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let comment = find_comment(pool.get_ref(), path.into_inner()).await?;
    ensure_owner(comment.author_id, &user)?;
    let comment_id = comment.id;
    comment.delete(pool.get_ref()).await?;

    log::info!("User {} deleted comment {}", user.user_id, comment_id);
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/posts/likes",
    params(
        ("post" = Option<i64>, Query, description = "Only likes on this post"),
        ("user" = Option<i64>, Query, description = "Only likes by this user")
    ),
    responses((status = 200, description = "Likes, newest first", body = Vec<LikeResponse>)),
    security(("bearer_auth" = [])),
    tag = "likes"
)]
pub async fn list_likes(
    query: web::Query<LikeQuery>,
    _user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let mut select = like::Entity::find();
    if let Some(post_id) = query.post {
        select = select.filter(like::Column::PostId.eq(post_id));
    }
    if let Some(user_id) = query.user {
        select = select.filter(like::Column::UserId.eq(user_id));
    }
    let likes = select
        .order_by_desc(like::Column::CreatedAt)
        .order_by_desc(like::Column::Id)
        .all(pool.get_ref())
        .await?;
    let response = like_responses(pool.get_ref(), likes).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    get,
    path = "/api/posts/likes/{like_id}",
    params(("like_id" = i64, Path, description = "Like ID")),
    responses(
        (status = 200, description = "Like", body = LikeResponse),
        (status = 404, description = "Like not found")
    ),
    security(("bearer_auth" = [])),
    tag = "likes"
)]
pub async fn get_like(
    path: web::Path<i64>,
    _user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let like = like::Entity::find_by_id(path.into_inner())
        .one(pool.get_ref())
        .await?
        .ok_or(ApiError::NotFound("Like"))?;
    let response = like_responses(pool.get_ref(), vec![like])
        .await?
        .pop()
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("like expansion returned nothing")))?;
    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    get,
    path = "/api/posts/feed",
    params(("page" = Option<u64>, Query, description = "Page number (default: 1)")),
    responses(
        (status = 200, description = "Posts by followed users and the caller, newest first", body = Vec<PostResponse>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "posts"
)]
pub async fn feed(
    query: web::Query<PageQuery>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let (offset, limit) = page_window(query.page, Some(POSTS_PER_PAGE), POSTS_PER_PAGE);
    let mut authors = following_ids(pool.get_ref(), user.user_id).await?;
    authors.push(user.user_id);

    let posts = post::Entity::find()
        .filter(post::Column::AuthorId.is_in(authors))
        .order_by_desc(post::Column::CreatedAt)
        .order_by_desc(post::Column::Id)
        .limit(limit)
        .offset(offset)
        .all(pool.get_ref())
        .await?;
    let response = post_responses(pool.get_ref(), posts, user.user_id).await?;
    Ok(HttpResponse::Ok().json(response))
}
