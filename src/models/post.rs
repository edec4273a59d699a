use crate::models::UserSummary;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PostQuery {
    pub author: Option<i64>,
    pub search: Option<String>,
    /// `created_at`, `updated_at`, optionally prefixed with `-`.
    pub ordering: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PostResponse {
    pub id: i64,
    pub author: UserSummary,
    pub title: String,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub comments: Vec<CommentResponse>,
    pub likes: Vec<LikeResponse>,
    pub likes_count: u64,
    pub comments_count: u64,
    pub is_liked: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CommentRequest {
    pub post: i64,
    pub content: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCommentRequest {
    pub content: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CommentQuery {
    pub post: Option<i64>,
    pub author: Option<i64>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommentResponse {
    pub id: i64,
    pub post: i64,
    pub author: UserSummary,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LikeQuery {
    pub post: Option<i64>,
    pub user: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LikeResponse {
    pub id: i64,
    pub post: i64,
    pub user: UserSummary,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
