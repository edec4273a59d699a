use crate::auth::AuthenticatedUser;
use crate::db::DbPool;
use crate::entities::user::{self, Role};
use crate::entities::user_permission;
use crate::error::{ApiError, ApiResult};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Grantable permission codenames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    // bookshelf
    CanView,
    CanCreate,
    CanEdit,
    CanDelete,
    // relationship catalog
    CanAddBook,
    CanChangeBook,
    CanDeleteBook,
}

impl Permission {
    pub const ALL: [Permission; 7] = [
        Permission::CanView,
        Permission::CanCreate,
        Permission::CanEdit,
        Permission::CanDelete,
        Permission::CanAddBook,
        Permission::CanChangeBook,
        Permission::CanDeleteBook,
    ];

    pub fn codename(&self) -> &'static str {
        match self {
            Permission::CanView => "can_view",
            Permission::CanCreate => "can_create",
            Permission::CanEdit => "can_edit",
            Permission::CanDelete => "can_delete",
            Permission::CanAddBook => "can_add_book",
            Permission::CanChangeBook => "can_change_book",
            Permission::CanDeleteBook => "can_delete_book",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.codename())
    }
}

impl FromStr for Permission {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.codename() == s)
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown permission '{}'.", s)))
    }
}

/// Staff accounts and the admin role bypass per-user grants.
pub fn is_superuser(user: &user::Model) -> bool {
    user.is_staff || user.role == Role::Admin
}

/// A token for a deleted or disabled account is rejected.
pub async fn active_user(pool: &DbPool, user_id: i64) -> ApiResult<user::Model> {
    match user::Entity::find_by_id(user_id).one(pool).await? {
        Some(u) if u.is_active => Ok(u),
        _ => {
            log::warn!("Token presented for missing or inactive user {}", user_id);
            Err(ApiError::Unauthorized(
                "User not found or inactive.".to_string(),
            ))
        }
    }
}

/// Loads the caller's full row.
pub async fn load_user(pool: &DbPool, auth: &AuthenticatedUser) -> ApiResult<user::Model> {
    active_user(pool, auth.user_id).await
}

pub async fn has_permission(
    pool: &DbPool,
    user: &user::Model,
    permission: Permission,
) -> ApiResult<bool> {
    if is_superuser(user) {
        return Ok(true);
    }
    let grant = user_permission::Entity::find()
        .filter(user_permission::Column::UserId.eq(user.id))
        .filter(user_permission::Column::Codename.eq(permission.codename()))
        .one(pool)
        .await?;
    Ok(grant.is_some())
}

pub async fn require_permission(
    pool: &DbPool,
    auth: &AuthenticatedUser,
    permission: Permission,
) -> ApiResult<user::Model> {
    let user = load_user(pool, auth).await?;
    if has_permission(pool, &user, permission).await? {
        Ok(user)
    } else {
        log::warn!("User {} lacks permission {}", user.id, permission);
        Err(ApiError::forbidden())
    }
}

pub async fn require_role(
    pool: &DbPool,
    auth: &AuthenticatedUser,
    role: Role,
) -> ApiResult<user::Model> {
    let user = load_user(pool, auth).await?;
    if user.role == role {
        Ok(user)
    } else {
        Err(ApiError::forbidden())
    }
}

pub async fn require_staff(pool: &DbPool, auth: &AuthenticatedUser) -> ApiResult<user::Model> {
    let user = load_user(pool, auth).await?;
    if is_superuser(&user) {
        Ok(user)
    } else {
        Err(ApiError::forbidden())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codenames_parse_back() {
        for permission in Permission::ALL {
            assert_eq!(permission.codename().parse::<Permission>().unwrap(), permission);
        }
        assert!("can_fly".parse::<Permission>().is_err());
    }

    #[test]
    fn serde_uses_codenames() {
        let json = serde_json::to_string(&Permission::CanChangeBook).unwrap();
        assert_eq!(json, "\"can_change_book\"");
    }
}
