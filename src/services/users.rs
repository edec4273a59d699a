use crate::auth::hash_password;
use crate::config::AdminConfig;
use crate::db::DbPool;
use crate::entities::user::{self, Role};
use crate::entities::follow;
use crate::error::{is_unique_violation, ApiError, ApiResult};
use crate::models::{FollowResponse, FollowStatus, UserProfile, UserSummary};
use crate::services::notification::notify_follow;
use chrono::Utc;
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter, Set,
};
use std::collections::HashMap;

pub async fn followers_count(pool: &DbPool, user_id: i64) -> ApiResult<u64> {
    Ok(follow::Entity::find()
        .filter(follow::Column::FollowingId.eq(user_id))
        .count(pool)
        .await?)
}

pub async fn following_count(pool: &DbPool, user_id: i64) -> ApiResult<u64> {
    Ok(follow::Entity::find()
        .filter(follow::Column::FollowerId.eq(user_id))
        .count(pool)
        .await?)
}

pub async fn is_following(pool: &DbPool, follower_id: i64, following_id: i64) -> ApiResult<bool> {
    let edge = follow::Entity::find_by_id((follower_id, following_id))
        .one(pool)
        .await?;
    Ok(edge.is_some())
}

/// Profile as seen by `viewer_id`; the follow flags are false for anonymous viewers.
pub async fn build_profile(
    pool: &DbPool,
    user: &user::Model,
    viewer_id: Option<i64>,
) -> ApiResult<UserProfile> {
    let (is_following, is_followed_by) = match viewer_id {
        Some(viewer) => (
            is_following(pool, viewer, user.id).await?,
            is_following(pool, user.id, viewer).await?,
        ),
        None => (false, false),
    };

    Ok(UserProfile {
        id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        bio: user.bio.clone(),
        profile_picture: user.profile_picture.clone(),
        date_of_birth: user.date_of_birth,
        role: user.role,
        followers_count: followers_count(pool, user.id).await?,
        following_count: following_count(pool, user.id).await?,
        date_joined: user.date_joined,
        is_following,
        is_followed_by,
    })
}

pub async fn build_profiles(
    pool: &DbPool,
    users: &[user::Model],
    viewer_id: Option<i64>,
) -> ApiResult<Vec<UserProfile>> {
    let mut profiles = Vec::with_capacity(users.len());
    for user in users {
        profiles.push(build_profile(pool, user, viewer_id).await?);
    }
    Ok(profiles)
}

/// Batch-loads summaries for the given ids; unknown ids are absent from the map.
pub async fn summaries(pool: &DbPool, ids: &[i64]) -> ApiResult<HashMap<i64, UserSummary>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let users = user::Entity::find()
        .filter(user::Column::Id.is_in(ids.to_vec()))
        .all(pool)
        .await?;
    Ok(users
        .iter()
        .map(|u| (u.id, UserSummary::from(u)))
        .collect())
}

pub async fn find_user(pool: &DbPool, user_id: i64) -> ApiResult<user::Model> {
    user::Entity::find_by_id(user_id)
        .one(pool)
        .await?
        .ok_or(ApiError::NotFound("User"))
}

pub async fn follow_user(
    pool: &DbPool,
    actor: &user::Model,
    target_id: i64,
) -> ApiResult<FollowResponse> {
    let target = find_user(pool, target_id).await?;

    if target.id == actor.id {
        return Err(ApiError::BadRequest("You cannot follow yourself.".to_string()));
    }
    if is_following(pool, actor.id, target.id).await? {
        return Err(ApiError::BadRequest(format!(
            "You are already following {}.",
            target.username
        )));
    }

    let edge = follow::ActiveModel {
        follower_id: Set(actor.id),
        following_id: Set(target.id),
        created_at: Set(Utc::now()),
    };
    match follow::Entity::insert(edge).exec_without_returning(pool).await {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::BadRequest(format!(
                "You are already following {}.",
                target.username
            )));
        }
        Err(e) => return Err(e.into()),
    }

    log::info!("User {} followed user {}", actor.id, target.id);
    notify_follow(pool, actor.id, target.id).await;

    Ok(FollowResponse {
        detail: format!("You are now following {}.", target.username),
        is_following: true,
        followers_count: followers_count(pool, target.id).await?,
        following_count: following_count(pool, actor.id).await?,
    })
}

pub async fn unfollow_user(
    pool: &DbPool,
    actor: &user::Model,
    target_id: i64,
) -> ApiResult<FollowResponse> {
    let target = find_user(pool, target_id).await?;

    let edge = follow::Entity::find_by_id((actor.id, target.id))
        .one(pool)
        .await?;
    let Some(edge) = edge else {
        return Err(ApiError::BadRequest(format!(
            "You are not following {}.",
            target.username
        )));
    };
    edge.delete(pool).await?;

    log::info!("User {} unfollowed user {}", actor.id, target.id);

    Ok(FollowResponse {
        detail: format!("You have unfollowed {}.", target.username),
        is_following: false,
        followers_count: followers_count(pool, target.id).await?,
        following_count: following_count(pool, actor.id).await?,
    })
}

pub async fn follow_status(
    pool: &DbPool,
    viewer_id: i64,
    target_id: i64,
) -> ApiResult<FollowStatus> {
    let target = find_user(pool, target_id).await?;
    Ok(FollowStatus {
        is_following: is_following(pool, viewer_id, target.id).await?,
        is_followed_by: is_following(pool, target.id, viewer_id).await?,
        followers_count: followers_count(pool, target.id).await?,
        following_count: following_count(pool, target.id).await?,
    })
}

/// Ids of everyone `user_id` follows.
pub async fn following_ids(pool: &DbPool, user_id: i64) -> ApiResult<Vec<i64>> {
    Ok(follow::Entity::find()
        .filter(follow::Column::FollowerId.eq(user_id))
        .all(pool)
        .await?
        .into_iter()
        .map(|edge| edge.following_id)
        .collect())
}

/// Ids of everyone following `user_id`.
pub async fn follower_ids(pool: &DbPool, user_id: i64) -> ApiResult<Vec<i64>> {
    Ok(follow::Entity::find()
        .filter(follow::Column::FollowingId.eq(user_id))
        .all(pool)
        .await?
        .into_iter()
        .map(|edge| edge.follower_id)
        .collect())
}

/// Ensures the configured superuser exists.
pub async fn create_superuser(
    pool: &DbPool,
    admin: &AdminConfig,
    bcrypt_cost: u32,
) -> Result<(), anyhow::Error> {
    let existing = user::Entity::find()
        .filter(
            Condition::any()
                .add(user::Column::Email.eq(&admin.email))
                .add(user::Column::Username.eq(&admin.username)),
        )
        .one(pool)
        .await?;

    if existing.is_some() {
        log::info!("Superuser {} already present", admin.username);
        return Ok(());
    }

    let now = Utc::now();
    let superuser = user::ActiveModel {
        username: Set(admin.username.clone()),
        email: Set(admin.email.clone()),
        password_hash: Set(hash_password(&admin.password, bcrypt_cost)?),
        bio: Set(String::new()),
        profile_picture: Set(None),
        date_of_birth: Set(None),
        role: Set(Role::Admin),
        is_staff: Set(true),
        is_active: Set(true),
        date_joined: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    user::Entity::insert(superuser).exec(pool).await?;

    log::info!("Created superuser {}", admin.username);
    Ok(())
}
