use crate::db::DbPool;
use crate::entities::{comment, like, post};
use crate::error::{ApiError, ApiResult};
use crate::models::{CommentResponse, LikeResponse, PostResponse, UserSummary};
use crate::services::users::summaries;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use std::collections::{BTreeSet, HashMap};

pub async fn find_post(pool: &DbPool, post_id: i64) -> ApiResult<post::Model> {
    post::Entity::find_by_id(post_id)
        .one(pool)
        .await?
        .ok_or(ApiError::NotFound("Post"))
}

fn summary_for(users: &HashMap<i64, UserSummary>, user_id: i64) -> ApiResult<UserSummary> {
    users
        .get(&user_id)
        .cloned()
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("user {} vanished", user_id)))
}

pub async fn comment_responses(
    pool: &DbPool,
    comments: Vec<comment::Model>,
) -> ApiResult<Vec<CommentResponse>> {
    let author_ids: Vec<i64> = comments
        .iter()
        .map(|c| c.author_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let authors = summaries(pool, &author_ids).await?;

    comments
        .into_iter()
        .map(|c| {
            Ok(CommentResponse {
                id: c.id,
                post: c.post_id,
                author: summary_for(&authors, c.author_id)?,
                content: c.content,
                created_at: c.created_at,
                updated_at: c.updated_at,
            })
        })
        .collect()
}

pub async fn like_responses(
    pool: &DbPool,
    likes: Vec<like::Model>,
) -> ApiResult<Vec<LikeResponse>> {
    let user_ids: Vec<i64> = likes
        .iter()
        .map(|l| l.user_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let users = summaries(pool, &user_ids).await?;

    likes
        .into_iter()
        .map(|l| {
            Ok(LikeResponse {
                id: l.id,
                post: l.post_id,
                user: summary_for(&users, l.user_id)?,
                created_at: l.created_at,
            })
        })
        .collect()
}

/// Expands posts with their author, comments and likes using one query per
/// relation rather than one per post. Order of `posts` is preserved.
pub async fn post_responses(
    pool: &DbPool,
    posts: Vec<post::Model>,
    viewer_id: i64,
) -> ApiResult<Vec<PostResponse>> {
    if posts.is_empty() {
        return Ok(Vec::new());
    }
    let post_ids: Vec<i64> = posts.iter().map(|p| p.id).collect();

    let comments = comment::Entity::find()
        .filter(comment::Column::PostId.is_in(post_ids.clone()))
        .order_by_asc(comment::Column::CreatedAt)
        .order_by_asc(comment::Column::Id)
        .all(pool)
        .await?;
    let likes = like::Entity::find()
        .filter(like::Column::PostId.is_in(post_ids))
        .order_by_asc(like::Column::Id)
        .all(pool)
        .await?;

    let author_ids: Vec<i64> = posts
        .iter()
        .map(|p| p.author_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let authors = summaries(pool, &author_ids).await?;

    let mut comments_by_post: HashMap<i64, Vec<CommentResponse>> = HashMap::new();
    for c in comment_responses(pool, comments).await? {
        comments_by_post.entry(c.post).or_default().push(c);
    }
    let mut likes_by_post: HashMap<i64, Vec<LikeResponse>> = HashMap::new();
    for l in like_responses(pool, likes).await? {
        likes_by_post.entry(l.post).or_default().push(l);
    }

    posts
        .into_iter()
        .map(|p| {
            let comments = comments_by_post.remove(&p.id).unwrap_or_default();
            let likes = likes_by_post.remove(&p.id).unwrap_or_default();
            Ok(PostResponse {
                id: p.id,
                author: summary_for(&authors, p.author_id)?,
                title: p.title,
                content: p.content,
                created_at: p.created_at,
                updated_at: p.updated_at,
                likes_count: likes.len() as u64,
                comments_count: comments.len() as u64,
                is_liked: likes.iter().any(|l| l.user.id == viewer_id),
                comments,
                likes,
            })
        })
        .collect()
}

pub async fn post_response(
    pool: &DbPool,
    post: post::Model,
    viewer_id: i64,
) -> ApiResult<PostResponse> {
    post_responses(pool, vec![post], viewer_id)
        .await?
        .pop()
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("post expansion returned nothing")))
}
