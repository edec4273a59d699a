use crate::entities::notification::{self, NotificationType, TargetType};
use crate::models::UserSummary;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct TargetRef {
    #[serde(rename = "type")]
    pub target_type: TargetType,
    pub id: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NotificationResponse {
    pub id: i64,
    pub actor: UserSummary,
    pub verb: String,
    pub notification_type: NotificationType,
    pub target: Option<TargetRef>,
    pub target_url: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub is_read: bool,
}

impl NotificationResponse {
    pub fn new(notification: notification::Model, actor: UserSummary) -> Self {
        let target = match (notification.target_type, notification.target_id) {
            (Some(target_type), Some(id)) => Some(TargetRef { target_type, id }),
            _ => None,
        };
        NotificationResponse {
            id: notification.id,
            actor,
            verb: notification.verb,
            notification_type: notification.notification_type,
            target_url: target.map(|t| target_url(&t)),
            target,
            timestamp: notification.timestamp,
            is_read: notification.is_read,
        }
    }
}

pub fn target_url(target: &TargetRef) -> String {
    match target.target_type {
        TargetType::Post => format!("/api/posts/posts/{}/", target.id),
        TargetType::Comment => format!("/api/posts/comments/{}/", target.id),
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NotificationUpdate {
    pub is_read: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NotificationCount {
    pub unread_count: u64,
    pub total_count: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MarkAllReadResponse {
    pub detail: String,
    pub updated_count: u64,
}
