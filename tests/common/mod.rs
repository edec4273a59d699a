// Shared setup for the integration tests. Every call to `create_test_app`
// gets its own in-memory SQLite database, so tests never see each other's rows.
#![allow(dead_code)]

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::middleware::{NormalizePath, TrailingSlash};
use actix_web::{web, App};
use chrono::Utc;
use sea_orm::{EntityTrait, Set};
use social_library_api::{
    api,
    auth::{hash_password, issue_token_pair, Permission},
    config::{Config, DatabaseConfig, JwtConfig, SecurityConfig, ServerConfig},
    db::{self, DbPool},
    entities::{user, user::Role, user_permission},
    middleware::{security_headers, HttpsRedirect},
};

pub const PASSWORD: &str = "password123";

/// Generate unique test identifier using nanoseconds for better uniqueness
pub fn generate_test_id() -> String {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos()
        .to_string()
}

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        jwt: JwtConfig {
            secret: "test-secret".to_string(),
            expiration_hours: 1,
            refresh_expiration_days: 1,
        },
        database: DatabaseConfig {
            url: Some("sqlite::memory:".to_string()),
            host: String::new(),
            port: 0,
            user: String::new(),
            password: String::new(),
            database: String::new(),
            max_connections: 1,
        },
        security: SecurityConfig {
            ssl_redirect: false,
            hsts_seconds: 0,
            bcrypt_cost: 4,
        },
        admin: None,
    }
}

/// Helper function to create a test app wired like the real server.
pub async fn create_test_app() -> (
    App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<impl MessageBody>,
            Error = actix_web::Error,
            InitError = (),
        >,
    >,
    DbPool,
    Config,
) {
    let config = test_config();
    let pool = db::create_pool(&config)
        .await
        .expect("Failed to create test database");

    let app = App::new()
        .wrap(NormalizePath::new(TrailingSlash::Trim))
        .wrap(security_headers(&config.security))
        .wrap(HttpsRedirect::new(config.security.ssl_redirect))
        .app_data(web::Data::new(config.clone()))
        .app_data(web::Data::new(pool.clone()))
        .configure(api::configure);

    (app, pool, config)
}

/// Inserts an active user and returns it with a fresh access token.
pub async fn create_user(
    pool: &DbPool,
    config: &Config,
    username: &str,
    role: Role,
) -> (user::Model, String) {
    let now = Utc::now();
    let new_user = user::ActiveModel {
        username: Set(username.to_string()),
        email: Set(format!("{}@example.com", username)),
        password_hash: Set(hash_password(PASSWORD, config.security.bcrypt_cost).unwrap()),
        bio: Set(String::new()),
        profile_picture: Set(None),
        date_of_birth: Set(None),
        role: Set(role),
        is_staff: Set(false),
        is_active: Set(true),
        date_joined: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let user = user::Entity::insert(new_user)
        .exec_with_returning(pool)
        .await
        .expect("Failed to insert test user");
    let tokens = issue_token_pair(user.id, &user.username, &config.jwt).unwrap();
    (user, tokens.access)
}

pub async fn create_member(pool: &DbPool, config: &Config, username: &str) -> (user::Model, String) {
    create_user(pool, config, username, Role::Member).await
}

pub async fn grant(pool: &DbPool, user_id: i64, permissions: &[Permission]) {
    for permission in permissions {
        user_permission::Entity::insert(user_permission::ActiveModel {
            user_id: Set(user_id),
            codename: Set(permission.codename().to_string()),
        })
        .exec_without_returning(pool)
        .await
        .expect("Failed to grant permission");
    }
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}
