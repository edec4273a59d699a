use crate::auth::{require_staff, AuthenticatedUser, Permission};
use crate::db::DbPool;
use crate::entities::user_permission;
use crate::error::ApiResult;
use crate::models::{DetailResponse, PermissionsResponse, RoleRequest};
use crate::services::users;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
};

async fn permissions_of(pool: &DbPool, user_id: i64) -> ApiResult<PermissionsResponse> {
    let target = users::find_user(pool, user_id).await?;
    let permissions = user_permission::Entity::find()
        .filter(user_permission::Column::UserId.eq(target.id))
        .order_by_asc(user_permission::Column::Codename)
        .all(pool)
        .await?
        .into_iter()
        .map(|grant| grant.codename)
        .collect();
    Ok(PermissionsResponse {
        user_id: target.id,
        role: target.role,
        is_staff: target.is_staff,
        permissions,
    })
}

#[utoipa::path(
    get,
    path = "/api/admin/users/{user_id}/permissions",
    params(("user_id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Granted permission codenames", body = PermissionsResponse),
        (status = 403, description = "Caller is not staff"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn list_permissions(
    path: web::Path<i64>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    require_staff(pool.get_ref(), &user).await?;
    let response = permissions_of(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{user_id}/permissions/{codename}",
    params(
        ("user_id" = i64, Path, description = "User ID"),
        ("codename" = String, Path, description = "Permission codename, e.g. can_view")
    ),
    responses(
        (status = 200, description = "Permission granted", body = PermissionsResponse),
        (status = 400, description = "Unknown codename"),
        (status = 403, description = "Caller is not staff"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn grant_permission(
    path: web::Path<(i64, String)>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let admin = require_staff(pool.get_ref(), &user).await?;
    let (user_id, codename) = path.into_inner();
    let permission: Permission = codename.parse()?;
    let target = users::find_user(pool.get_ref(), user_id).await?;

    let existing = user_permission::Entity::find_by_id((target.id, permission.codename().to_string()))
        .one(pool.get_ref())
        .await?;
    if existing.is_none() {
        let grant = user_permission::ActiveModel {
            user_id: Set(target.id),
            codename: Set(permission.codename().to_string()),
        };
        user_permission::Entity::insert(grant)
            .exec_without_returning(pool.get_ref())
            .await?;
        log::info!(
            "User {} granted {} to user {}",
            admin.id,
            permission,
            target.id
        );
    }

    let response = permissions_of(pool.get_ref(), target.id).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{user_id}/permissions/{codename}",
    params(
        ("user_id" = i64, Path, description = "User ID"),
        ("codename" = String, Path, description = "Permission codename")
    ),
    responses(
        (status = 200, description = "Permission revoked", body = PermissionsResponse),
        (status = 400, description = "Unknown codename"),
        (status = 403, description = "Caller is not staff"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn revoke_permission(
    path: web::Path<(i64, String)>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let admin = require_staff(pool.get_ref(), &user).await?;
    let (user_id, codename) = path.into_inner();
    let permission: Permission = codename.parse()?;
    let target = users::find_user(pool.get_ref(), user_id).await?;

    let removed = user_permission::Entity::delete_many()
        .filter(user_permission::Column::UserId.eq(target.id))
        .filter(user_permission::Column::Codename.eq(permission.codename()))
        .exec(pool.get_ref())
        .await?;
    if removed.rows_affected > 0 {
        log::info!(
            "User {} revoked {} from user {}",
            admin.id,
            permission,
            target.id
        );
    }

    let response = permissions_of(pool.get_ref(), target.id).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{user_id}/role",
    params(("user_id" = i64, Path, description = "User ID")),
    request_body = RoleRequest,
    responses(
        (status = 200, description = "Role changed", body = UserProfile),
        (status = 403, description = "Caller is not staff"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn set_role(
    path: web::Path<i64>,
    req: web::Json<RoleRequest>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let admin = require_staff(pool.get_ref(), &user).await?;
    let target = users::find_user(pool.get_ref(), path.into_inner()).await?;

    let mut active = target.into_active_model();
    active.role = Set(req.role);
    active.updated_at = Set(Utc::now());
    let updated = active.update(pool.get_ref()).await?;

    log::info!(
        "User {} set role of user {} to {:?}",
        admin.id,
        updated.id,
        updated.role
    );

    let profile = users::build_profile(pool.get_ref(), &updated, Some(admin.id)).await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[utoipa::path(
    get,
    path = "/api/admin/permissions",
    responses(
        (status = 200, description = "Every grantable codename", body = Vec<String>),
        (status = 403, description = "Caller is not staff")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn available_permissions(
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    require_staff(pool.get_ref(), &user).await?;
    let codenames: Vec<&'static str> = Permission::ALL.iter().map(|p| p.codename()).collect();
    Ok(HttpResponse::Ok().json(codenames))
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{user_id}",
    params(("user_id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Account deactivated", body = DetailResponse),
        (status = 403, description = "Caller is not staff"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn deactivate_user(
    path: web::Path<i64>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let admin = require_staff(pool.get_ref(), &user).await?;
    let target = users::find_user(pool.get_ref(), path.into_inner()).await?;
    let username = target.username.clone();

    let mut active = target.into_active_model();
    active.is_active = Set(false);
    active.updated_at = Set(Utc::now());
    active.update(pool.get_ref()).await?;

    log::info!("User {} deactivated {}", admin.id, username);
    Ok(HttpResponse::Ok().json(DetailResponse::new(format!(
        "User {} deactivated.",
        username
    ))))
}
