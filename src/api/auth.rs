use crate::auth::{
    active_user, hash_password, issue_access_token, issue_token_pair, load_user,
    verify_password, verify_token, AuthenticatedUser, TokenType,
};
use crate::config::Config;
use crate::db::DbPool;
use crate::entities::user::{self, Role};
use crate::error::{is_unique_violation, ApiError, ApiResult, FieldErrors};
use crate::models::{
    page_window, AccessResponse, AuthResponse, LoginRequest, PageQuery, RefreshRequest,
    RegisterRequest, UpdateProfileRequest, UserProfile,
};
use crate::services::users;
use crate::validation::{is_valid_email, normalize_email, BIO_MAX, PASSWORD_MIN};
use actix_web::{web, HttpResponse};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

const USERNAME_MAX: usize = 150;

fn validate_username(errors: &mut FieldErrors, username: &str) {
    if username.is_empty() {
        errors.add("username", "This field may not be blank.");
    } else if username.chars().count() > USERNAME_MAX {
        errors.add(
            "username",
            format!("Ensure this field has no more than {} characters.", USERNAME_MAX),
        );
    } else if !username
        .chars()
        .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
    {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }
}

fn validate_email(errors: &mut FieldErrors, email: &str) {
    if email.is_empty() {
        errors.add("email", "This field may not be blank.");
    } else if !is_valid_email(email) {
        errors.add("email", "Enter a valid email address.");
    }
}

fn validate_bio(errors: &mut FieldErrors, bio: &str) {
    if bio.chars().count() > BIO_MAX {
        errors.add(
            "bio",
            format!("Ensure this field has no more than {} characters.", BIO_MAX),
        );
    }
}

async fn email_taken(pool: &DbPool, email: &str, except: Option<i64>) -> ApiResult<bool> {
    let mut query = user::Entity::find().filter(user::Column::Email.eq(email));
    if let Some(id) = except {
        query = query.filter(user::Column::Id.ne(id));
    }
    Ok(query.one(pool).await?.is_some())
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = AuthResponse),
        (status = 400, description = "Validation errors keyed by field")
    ),
    tag = "auth"
)]
pub async fn register(
    req: web::Json<RegisterRequest>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
) -> ApiResult<HttpResponse> {
    let req = req.into_inner();
    let username = req.username.trim().to_string();
    let email = normalize_email(&req.email);
    let bio = req.bio.unwrap_or_default();

    let mut errors = FieldErrors::new();
    validate_username(&mut errors, &username);
    validate_email(&mut errors, &email);
    validate_bio(&mut errors, &bio);
    if req.password != req.password2 {
        errors.add("password", "Password fields didn't match.");
    } else if req.password.chars().count() < PASSWORD_MIN {
        errors.add(
            "password",
            format!(
                "This password is too short. It must contain at least {} characters.",
                PASSWORD_MIN
            ),
        );
    }
    errors.into_result()?;

    let mut errors = FieldErrors::new();
    let username_taken = user::Entity::find()
        .filter(user::Column::Username.eq(&username))
        .one(pool.get_ref())
        .await?
        .is_some();
    if username_taken {
        errors.add("username", "A user with that username already exists.");
    }
    if email_taken(pool.get_ref(), &email, None).await? {
        errors.add("email", "A user with that email already exists.");
    }
    errors.into_result()?;

    let password_hash = hash_password(&req.password, config.security.bcrypt_cost)?;
    let now = Utc::now();
    let new_user = user::ActiveModel {
        username: Set(username),
        email: Set(email),
        password_hash: Set(password_hash),
        bio: Set(bio),
        profile_picture: Set(req.profile_picture.filter(|p| !p.trim().is_empty())),
        date_of_birth: Set(req.date_of_birth),
        role: Set(Role::Member),
        is_staff: Set(false),
        is_active: Set(true),
        date_joined: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let user = match user::Entity::insert(new_user)
        .exec_with_returning(pool.get_ref())
        .await
    {
        Ok(user) => user,
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::Validation(FieldErrors::single(
                "username",
                "A user with that username or email already exists.",
            )));
        }
        Err(e) => return Err(e.into()),
    };

    log::info!("Registered user {} ({})", user.id, user.username);

    let tokens = issue_token_pair(user.id, &user.username, &config.jwt)?;
    let profile = users::build_profile(pool.get_ref(), &user, None).await?;

    Ok(HttpResponse::Created().json(AuthResponse {
        message: "User registered successfully".to_string(),
        user: profile,
        tokens,
    }))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login(
    req: web::Json<LoginRequest>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
) -> ApiResult<HttpResponse> {
    let identifier = req.username.trim();
    if identifier.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation(FieldErrors::single(
            "non_field_errors",
            "Must include \"username\" and \"password\".",
        )));
    }

    let column_filter = if identifier.contains('@') {
        user::Column::Email.eq(normalize_email(identifier))
    } else {
        user::Column::Username.eq(identifier)
    };
    let user = user::Entity::find()
        .filter(column_filter)
        .one(pool.get_ref())
        .await?;

    let user = match user {
        Some(u) if u.is_active => Some(u),
        _ => None,
    };
    let valid = match &user {
        Some(u) => verify_password(&req.password, &u.password_hash)?,
        None => false,
    };
    let user = match user {
        Some(u) if valid => u,
        _ => {
            log::warn!("Failed login for {}", identifier);
            return Err(ApiError::Validation(FieldErrors::single(
                "non_field_errors",
                "Invalid credentials",
            )));
        }
    };

    let tokens = issue_token_pair(user.id, &user.username, &config.jwt)?;
    let profile = users::build_profile(pool.get_ref(), &user, None).await?;

    Ok(HttpResponse::Ok().json(AuthResponse {
        message: "Login successful".to_string(),
        user: profile,
        tokens,
    }))
}

#[utoipa::path(
    post,
    path = "/api/auth/token/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = AccessResponse),
        (status = 401, description = "Invalid or expired refresh token")
    ),
    tag = "auth"
)]
pub async fn refresh_token(
    req: web::Json<RefreshRequest>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
) -> ApiResult<HttpResponse> {
    let claims = verify_token(&req.refresh, &config.jwt.secret, TokenType::Refresh)
        .map_err(|_| ApiError::Unauthorized("Token is invalid or expired".to_string()))?;
    let user_id = claims
        .user_id()
        .ok_or_else(|| ApiError::Unauthorized("Token is invalid or expired".to_string()))?;

    let user = active_user(pool.get_ref(), user_id).await?;

    let access = issue_access_token(user.id, &user.username, &config.jwt)?;
    Ok(HttpResponse::Ok().json(AccessResponse { access }))
}

#[utoipa::path(
    get,
    path = "/api/auth/profile",
    responses(
        (status = 200, description = "Own profile", body = UserProfile),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn get_profile(
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let me = load_user(pool.get_ref(), &user).await?;
    let profile = users::build_profile(pool.get_ref(), &me, Some(me.id)).await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[utoipa::path(
    put,
    path = "/api/auth/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserProfile),
        (status = 400, description = "Validation errors"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn update_profile(
    user: AuthenticatedUser,
    req: web::Json<UpdateProfileRequest>,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let me = load_user(pool.get_ref(), &user).await?;
    let req = req.into_inner();

    let mut errors = FieldErrors::new();
    let email = req.email.as_deref().map(normalize_email);
    if let Some(email) = &email {
        validate_email(&mut errors, email);
    }
    if let Some(bio) = &req.bio {
        validate_bio(&mut errors, bio);
    }
    errors.into_result()?;

    if let Some(email) = &email {
        if email_taken(pool.get_ref(), email, Some(me.id)).await? {
            return Err(ApiError::Validation(FieldErrors::single(
                "email",
                "A user with that email already exists.",
            )));
        }
    }

    let mut active = me.into_active_model();
    if let Some(email) = email {
        active.email = Set(email);
    }
    if let Some(bio) = req.bio {
        active.bio = Set(bio);
    }
    if let Some(picture) = req.profile_picture {
        active.profile_picture = Set(Some(picture).filter(|p| !p.trim().is_empty()));
    }
    if let Some(date_of_birth) = req.date_of_birth {
        active.date_of_birth = Set(Some(date_of_birth));
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(pool.get_ref()).await?;
    log::info!("User {} updated their profile", updated.id);

    let profile = users::build_profile(pool.get_ref(), &updated, Some(updated.id)).await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[utoipa::path(
    get,
    path = "/api/auth/users",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 20)")
    ),
    responses(
        (status = 200, description = "Registered users", body = Vec<UserProfile>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn list_users(
    user: AuthenticatedUser,
    query: web::Query<PageQuery>,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let (offset, limit) = page_window(query.page, query.limit, 20);
    let all = user::Entity::find()
        .order_by_asc(user::Column::Id)
        .offset(offset)
        .limit(limit)
        .all(pool.get_ref())
        .await?;
    let profiles = users::build_profiles(pool.get_ref(), &all, Some(user.user_id)).await?;
    Ok(HttpResponse::Ok().json(profiles))
}

#[utoipa::path(
    get,
    path = "/api/auth/users/{user_id}",
    params(("user_id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User profile", body = UserProfile),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn get_user(
    path: web::Path<i64>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let target = users::find_user(pool.get_ref(), path.into_inner()).await?;
    let profile = users::build_profile(pool.get_ref(), &target, Some(user.user_id)).await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[utoipa::path(
    post,
    path = "/api/auth/follow/{user_id}",
    params(("user_id" = i64, Path, description = "User to follow")),
    responses(
        (status = 200, description = "Now following", body = FollowResponse),
        (status = 400, description = "Self-follow or already following"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn follow_user(
    path: web::Path<i64>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let me = load_user(pool.get_ref(), &user).await?;
    let response = users::follow_user(pool.get_ref(), &me, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    post,
    path = "/api/auth/unfollow/{user_id}",
    params(("user_id" = i64, Path, description = "User to unfollow")),
    responses(
        (status = 200, description = "Unfollowed", body = FollowResponse),
        (status = 400, description = "Not following"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn unfollow_user(
    path: web::Path<i64>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let me = load_user(pool.get_ref(), &user).await?;
    let response = users::unfollow_user(pool.get_ref(), &me, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    get,
    path = "/api/auth/users/{user_id}/follow-status",
    params(("user_id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Follow relationship with the caller", body = FollowStatus),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn follow_status(
    path: web::Path<i64>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let status = users::follow_status(pool.get_ref(), user.user_id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(status))
}

async fn profiles_by_ids(
    pool: &DbPool,
    ids: Vec<i64>,
    viewer_id: i64,
) -> ApiResult<Vec<UserProfile>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let found = user::Entity::find()
        .filter(user::Column::Id.is_in(ids))
        .order_by_asc(user::Column::Id)
        .all(pool)
        .await?;
    users::build_profiles(pool, &found, Some(viewer_id)).await
}

#[utoipa::path(
    get,
    path = "/api/auth/users/{user_id}/followers",
    params(("user_id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Users following this user", body = Vec<UserProfile>),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn list_followers(
    path: web::Path<i64>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let target = users::find_user(pool.get_ref(), path.into_inner()).await?;
    let ids = users::follower_ids(pool.get_ref(), target.id).await?;
    let profiles = profiles_by_ids(pool.get_ref(), ids, user.user_id).await?;
    Ok(HttpResponse::Ok().json(profiles))
}

#[utoipa::path(
    get,
    path = "/api/auth/users/{user_id}/following",
    params(("user_id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Users this user follows", body = Vec<UserProfile>),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn list_following(
    path: web::Path<i64>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let target = users::find_user(pool.get_ref(), path.into_inner()).await?;
    let ids = users::following_ids(pool.get_ref(), target.id).await?;
    let profiles = profiles_by_ids(pool.get_ref(), ids, user.user_id).await?;
    Ok(HttpResponse::Ok().json(profiles))
}
