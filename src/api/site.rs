use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

pub const SERVICE_NAME: &str = "social-library-api";

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "site"
)]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Entry point listing the endpoint groups.
#[utoipa::path(
    get,
    path = "/api",
    responses((status = 200, description = "Endpoint groups")),
    tag = "site"
)]
pub async fn api_root() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "message": "Social Library API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "auth": "/api/auth/",
            "admin": "/api/admin/",
            "books": "/api/books/",
            "relationships": "/api/relationships/",
            "posts": "/api/posts/posts/",
            "comments": "/api/posts/comments/",
            "likes": "/api/posts/likes/",
            "feed": "/api/posts/feed/",
            "notifications": "/api/notifications/",
            "docs": "/api/docs/",
        }
    }))
}
