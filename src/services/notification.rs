use crate::db::DbPool;
use crate::entities::notification::{self, NotificationType, TargetType};
use crate::entities::post;
use chrono::Utc;
use log::{error, info};
use sea_orm::{ActiveModelTrait, Set};

pub const VERB_FOLLOW: &str = "started following you";
pub const VERB_LIKE: &str = "liked your post";
pub const VERB_COMMENT: &str = "commented on your post";

/// Records one notification. Self-directed actions are skipped, and a failed
/// insert is logged rather than surfaced to the request that triggered it.
async fn notify(
    pool: &DbPool,
    recipient_id: i64,
    actor_id: i64,
    notification_type: NotificationType,
    verb: &str,
    target: Option<(TargetType, i64)>,
) {
    if recipient_id == actor_id {
        return;
    }

    let new_notification = notification::ActiveModel {
        recipient_id: Set(recipient_id),
        actor_id: Set(actor_id),
        verb: Set(verb.to_string()),
        notification_type: Set(notification_type),
        target_type: Set(target.map(|(t, _)| t)),
        target_id: Set(target.map(|(_, id)| id)),
        timestamp: Set(Utc::now()),
        is_read: Set(false),
        ..Default::default()
    };

    match new_notification.insert(pool).await {
        Ok(n) => info!(
            "Created {:?} notification {} for user {} from user {}",
            notification_type, n.id, recipient_id, actor_id
        ),
        Err(e) => error!(
            "Failed to create {:?} notification for user {}: {:?}",
            notification_type, recipient_id, e
        ),
    }
}

pub async fn notify_follow(pool: &DbPool, actor_id: i64, followed_id: i64) {
    notify(
        pool,
        followed_id,
        actor_id,
        NotificationType::Follow,
        VERB_FOLLOW,
        None,
    )
    .await;
}

pub async fn notify_like(pool: &DbPool, actor_id: i64, post: &post::Model) {
    notify(
        pool,
        post.author_id,
        actor_id,
        NotificationType::Like,
        VERB_LIKE,
        Some((TargetType::Post, post.id)),
    )
    .await;
}

pub async fn notify_comment(pool: &DbPool, actor_id: i64, post: &post::Model) {
    notify(
        pool,
        post.author_id,
        actor_id,
        NotificationType::Comment,
        VERB_COMMENT,
        Some((TargetType::Post, post.id)),
    )
    .await;
}
