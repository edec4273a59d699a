use crate::auth::AuthenticatedUser;
use crate::db::DbPool;
use crate::entities::notification;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    page_window, MarkAllReadResponse, NotificationCount, NotificationResponse,
    NotificationUpdate, PageQuery,
};
use crate::services::users::summaries;
use actix_web::{web, HttpResponse};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set,
};
use std::collections::BTreeSet;

const NOTIFICATIONS_PER_PAGE: u64 = 20;

fn own(user: &AuthenticatedUser) -> Select<notification::Entity> {
    notification::Entity::find().filter(notification::Column::RecipientId.eq(user.user_id))
}

/// Someone else's notification is reported as missing.
async fn find_own(
    pool: &DbPool,
    user: &AuthenticatedUser,
    notification_id: i64,
) -> ApiResult<notification::Model> {
    own(user)
        .filter(notification::Column::Id.eq(notification_id))
        .one(pool)
        .await?
        .ok_or(ApiError::NotFound("Notification"))
}

async fn responses(
    pool: &DbPool,
    notifications: Vec<notification::Model>,
) -> ApiResult<Vec<NotificationResponse>> {
    let actor_ids: Vec<i64> = notifications
        .iter()
        .map(|n| n.actor_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let actors = summaries(pool, &actor_ids).await?;

    notifications
        .into_iter()
        .map(|n| {
            let actor = actors.get(&n.actor_id).cloned().ok_or_else(|| {
                ApiError::Internal(anyhow::anyhow!("actor {} vanished", n.actor_id))
            })?;
            Ok(NotificationResponse::new(n, actor))
        })
        .collect()
}

async fn single(pool: &DbPool, n: notification::Model) -> ApiResult<NotificationResponse> {
    responses(pool, vec![n])
        .await?
        .pop()
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("notification expansion returned nothing")))
}

async fn set_read(
    pool: &DbPool,
    n: notification::Model,
    is_read: bool,
) -> ApiResult<notification::Model> {
    if n.is_read == is_read {
        return Ok(n);
    }
    let mut active = n.into_active_model();
    active.is_read = Set(is_read);
    Ok(active.update(pool).await?)
}

async fn page_of(
    pool: &DbPool,
    select: Select<notification::Entity>,
    query: &PageQuery,
) -> ApiResult<Vec<NotificationResponse>> {
    let (offset, limit) = page_window(query.page, query.limit, NOTIFICATIONS_PER_PAGE);
    let notifications = select
        .order_by_desc(notification::Column::Timestamp)
        .order_by_desc(notification::Column::Id)
        .limit(limit)
        .offset(offset)
        .all(pool)
        .await?;
    responses(pool, notifications).await
}

#[utoipa::path(
    get,
    path = "/api/notifications",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 20)")
    ),
    responses(
        (status = 200, description = "Own notifications, newest first", body = Vec<NotificationResponse>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "notifications"
)]
pub async fn list_notifications(
    query: web::Query<PageQuery>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let response = page_of(pool.get_ref(), own(&user), &query).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    get,
    path = "/api/notifications/unread",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 20)")
    ),
    responses(
        (status = 200, description = "Unread notifications, newest first", body = Vec<NotificationResponse>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "notifications"
)]
pub async fn unread_notifications(
    query: web::Query<PageQuery>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let select = own(&user).filter(notification::Column::IsRead.eq(false));
    let response = page_of(pool.get_ref(), select, &query).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    get,
    path = "/api/notifications/count",
    responses(
        (status = 200, description = "Unread and total counts", body = NotificationCount),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "notifications"
)]
pub async fn notification_count(
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let total_count = own(&user).count(pool.get_ref()).await?;
    let unread_count = own(&user)
        .filter(notification::Column::IsRead.eq(false))
        .count(pool.get_ref())
        .await?;
    Ok(HttpResponse::Ok().json(NotificationCount {
        unread_count,
        total_count,
    }))
}

#[utoipa::path(
    post,
    path = "/api/notifications/mark_all_as_read",
    responses(
        (status = 200, description = "Every unread notification marked read", body = MarkAllReadResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "notifications"
)]
pub async fn mark_all_as_read(
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let result = notification::Entity::update_many()
        .col_expr(notification::Column::IsRead, Expr::value(true))
        .filter(notification::Column::RecipientId.eq(user.user_id))
        .filter(notification::Column::IsRead.eq(false))
        .exec(pool.get_ref())
        .await?;

    log::info!(
        "User {} marked {} notifications as read",
        user.user_id,
        result.rows_affected
    );
    Ok(HttpResponse::Ok().json(MarkAllReadResponse {
        detail: format!("{} notifications marked as read.", result.rows_affected),
        updated_count: result.rows_affected,
    }))
}

#[utoipa::path(
    get,
    path = "/api/notifications/{notification_id}",
    params(("notification_id" = i64, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification", body = NotificationResponse),
        (status = 404, description = "Notification not found")
    ),
    security(("bearer_auth" = [])),
    tag = "notifications"
)]
pub async fn get_notification(
    path: web::Path<i64>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let n = find_own(pool.get_ref(), &user, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(single(pool.get_ref(), n).await?))
}

#[utoipa::path(
    patch,
    path = "/api/notifications/{notification_id}",
    params(("notification_id" = i64, Path, description = "Notification ID")),
    request_body = NotificationUpdate,
    responses(
        (status = 200, description = "Notification updated", body = NotificationResponse),
        (status = 404, description = "Notification not found")
    ),
    security(("bearer_auth" = [])),
    tag = "notifications"
)]
pub async fn update_notification(
    path: web::Path<i64>,
    req: web::Json<NotificationUpdate>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let n = find_own(pool.get_ref(), &user, path.into_inner()).await?;
    let n = set_read(pool.get_ref(), n, req.is_read).await?;
    Ok(HttpResponse::Ok().json(single(pool.get_ref(), n).await?))
}

#[utoipa::path(
    delete,
    path = "/api/notifications/{notification_id}",
    params(("notification_id" = i64, Path, description = "Notification ID")),
    responses(
        (status = 204, description = "Notification deleted"),
        (status = 404, description = "Notification not found")
    ),
    security(("bearer_auth" = [])),
    tag = "notifications"
)]
pub async fn delete_notification(
    path: web::Path<i64>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let n = find_own(pool.get_ref(), &user, path.into_inner()).await?;
    n.delete(pool.get_ref()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    post,
    path = "/api/notifications/{notification_id}/mark_as_read",
    params(("notification_id" = i64, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification marked read", body = NotificationResponse),
        (status = 404, description = "Notification not found")
    ),
    security(("bearer_auth" = [])),
    tag = "notifications"
)]
pub async fn mark_as_read(
    path: web::Path<i64>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let n = find_own(pool.get_ref(), &user, path.into_inner()).await?;
    let n = set_read(pool.get_ref(), n, true).await?;
    Ok(HttpResponse::Ok().json(single(pool.get_ref(), n).await?))
}

#[utoipa::path(
    post,
    path = "/api/notifications/{notification_id}/mark_as_unread",
    params(("notification_id" = i64, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification marked unread", body = NotificationResponse),
        (status = 404, description = "Notification not found")
    ),
    security(("bearer_auth" = [])),
    tag = "notifications"
)]
pub async fn mark_as_unread(
    path: web::Path<i64>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let n = find_own(pool.get_ref(), &user, path.into_inner()).await?;
    let n = set_read(pool.get_ref(), n, false).await?;
    Ok(HttpResponse::Ok().json(single(pool.get_ref(), n).await?))
}
