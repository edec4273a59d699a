pub mod admin;
pub mod auth;
pub mod books;
pub mod notifications;
pub mod posts;
pub mod relationships;
pub mod site;

use crate::auth::{Permission, TokenPair};
use crate::entities::notification::{NotificationType, TargetType};
use crate::entities::user::Role;
use crate::models::{
    AccessResponse, AuthResponse, AuthorRequest, AuthorResponse, BookListResponse, BookResponse,
    CatalogBookRequest, CatalogBookResponse, CommentRequest, CommentResponse, CreatePostRequest,
    DetailResponse, FollowResponse, FollowStatus, LibrarianRequest, LibrarianResponse,
    LibraryDetail, LibraryRequest, LibraryResponse, LikeResponse, LoginRequest,
    MarkAllReadResponse, NotificationCount, NotificationResponse, NotificationUpdate,
    PermissionsResponse, PostResponse, RefreshRequest, RegisterRequest, RoleRequest,
    RoleViewResponse, TargetRef, UpdateCommentRequest, UpdatePostRequest, UpdateProfileRequest,
    UserProfile, UserSummary,
};
use crate::validation::BookForm;
use actix_web::web;
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Site
        site::health,
        site::api_root,
        // Accounts
        auth::register,
        auth::login,
        auth::refresh_token,
        auth::get_profile,
        auth::update_profile,
        auth::list_users,
        auth::get_user,
        auth::follow_user,
        auth::unfollow_user,
        auth::follow_status,
        auth::list_followers,
        auth::list_following,
        // Admin
        admin::list_permissions,
        admin::grant_permission,
        admin::revoke_permission,
        admin::set_role,
        admin::available_permissions,
        admin::deactivate_user,
        // Bookshelf
        books::list_books,
        books::create_book,
        books::get_book,
        books::update_book,
        books::delete_book,
        // Relationship demo
        relationships::list_authors,
        relationships::create_author,
        relationships::author_books,
        relationships::list_catalog_books,
        relationships::create_catalog_book,
        relationships::update_catalog_book,
        relationships::delete_catalog_book,
        relationships::list_libraries,
        relationships::create_library,
        relationships::get_library,
        relationships::add_library_book,
        relationships::remove_library_book,
        relationships::assign_librarian,
        relationships::admin_view,
        relationships::librarian_view,
        relationships::member_view,
        // Posts, comments, likes
        posts::list_posts,
        posts::create_post,
        posts::get_post,
        posts::update_post,
        posts::delete_post,
        posts::like_post,
        posts::unlike_post,
        posts::post_comments,
        posts::list_comments,
        posts::create_comment,
        posts::get_comment,
        posts::update_comment,
        posts::delete_comment,
        posts::list_likes,
        posts::get_like,
        posts::feed,
        // Notifications
        notifications::list_notifications,
        notifications::unread_notifications,
        notifications::notification_count,
        notifications::mark_all_as_read,
        notifications::get_notification,
        notifications::update_notification,
        notifications::delete_notification,
        notifications::mark_as_read,
        notifications::mark_as_unread,
    ),
    components(schemas(
        site::HealthResponse,
        DetailResponse,
        // Accounts
        RegisterRequest,
        LoginRequest,
        RefreshRequest,
        AccessResponse,
        AuthResponse,
        TokenPair,
        UserProfile,
        UserSummary,
        UpdateProfileRequest,
        FollowResponse,
        FollowStatus,
        Role,
        // Admin
        RoleRequest,
        PermissionsResponse,
        Permission,
        // Bookshelf
        BookForm,
        BookResponse,
        BookListResponse,
        // Relationship demo
        AuthorRequest,
        AuthorResponse,
        CatalogBookRequest,
        CatalogBookResponse,
        LibraryRequest,
        LibraryResponse,
        LibraryDetail,
        LibrarianRequest,
        LibrarianResponse,
        RoleViewResponse,
        // Posts
        CreatePostRequest,
        UpdatePostRequest,
        PostResponse,
        CommentRequest,
        UpdateCommentRequest,
        CommentResponse,
        LikeResponse,
        // Notifications
        NotificationResponse,
        NotificationUpdate,
        NotificationCount,
        MarkAllReadResponse,
        NotificationType,
        TargetType,
        TargetRef,
    )),
    tags(
        (name = "site", description = "Health and entry point"),
        (name = "auth", description = "Registration, tokens, profiles and follows"),
        (name = "admin", description = "Permission and role management"),
        (name = "books", description = "Bookshelf CRUD"),
        (name = "relationships", description = "Authors, catalog books, libraries and librarians"),
        (name = "posts", description = "Posts, likes and the personal feed"),
        (name = "comments", description = "Comments on posts"),
        (name = "likes", description = "Read-only like listing"),
        (name = "notifications", description = "Notification inbox"),
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

/// Registers every route. Fixed segments such as `/unread` are declared
/// before the `/{id}` routes they would otherwise be captured by.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(site::health))
        .service(
            web::scope("/api")
                .route("", web::get().to(site::api_root))
                .service(
                    web::scope("/auth")
                        .route("/register", web::post().to(auth::register))
                        .route("/login", web::post().to(auth::login))
                        .route("/token/refresh", web::post().to(auth::refresh_token))
                        .route("/profile", web::get().to(auth::get_profile))
                        .route("/profile", web::put().to(auth::update_profile))
                        .route("/profile", web::patch().to(auth::update_profile))
                        .route("/users", web::get().to(auth::list_users))
                        .route("/users/{user_id}", web::get().to(auth::get_user))
                        .route(
                            "/users/{user_id}/follow-status",
                            web::get().to(auth::follow_status),
                        )
                        .route(
                            "/users/{user_id}/followers",
                            web::get().to(auth::list_followers),
                        )
                        .route(
                            "/users/{user_id}/following",
                            web::get().to(auth::list_following),
                        )
                        .route("/follow/{user_id}", web::post().to(auth::follow_user))
                        .route("/follow/{user_id}", web::delete().to(auth::unfollow_user))
                        .route("/unfollow/{user_id}", web::post().to(auth::unfollow_user)),
                )
                .service(
                    web::scope("/admin")
                        .route("/permissions", web::get().to(admin::available_permissions))
                        .route("/users/{user_id}", web::delete().to(admin::deactivate_user))
                        .route(
                            "/users/{user_id}/permissions",
                            web::get().to(admin::list_permissions),
                        )
                        .route(
                            "/users/{user_id}/permissions/{codename}",
                            web::put().to(admin::grant_permission),
                        )
                        .route(
                            "/users/{user_id}/permissions/{codename}",
                            web::delete().to(admin::revoke_permission),
                        )
                        .route("/users/{user_id}/role", web::put().to(admin::set_role)),
                )
                .service(
                    web::scope("/books")
                        .route("", web::get().to(books::list_books))
                        .route("", web::post().to(books::create_book))
                        .route("/{book_id}", web::get().to(books::get_book))
                        .route("/{book_id}", web::put().to(books::update_book))
                        .route("/{book_id}", web::delete().to(books::delete_book)),
                )
                .service(
                    web::scope("/relationships")
                        .route("/authors", web::get().to(relationships::list_authors))
                        .route("/authors", web::post().to(relationships::create_author))
                        .route(
                            "/authors/{author_id}/books",
                            web::get().to(relationships::author_books),
                        )
                        .route("/books", web::get().to(relationships::list_catalog_books))
                        .route("/books", web::post().to(relationships::create_catalog_book))
                        .route(
                            "/books/{book_id}",
                            web::put().to(relationships::update_catalog_book),
                        )
                        .route(
                            "/books/{book_id}",
                            web::delete().to(relationships::delete_catalog_book),
                        )
                        .route("/libraries", web::get().to(relationships::list_libraries))
                        .route("/libraries", web::post().to(relationships::create_library))
                        .route(
                            "/libraries/{library_id}",
                            web::get().to(relationships::get_library),
                        )
                        .route(
                            "/libraries/{library_id}/books/{book_id}",
                            web::post().to(relationships::add_library_book),
                        )
                        .route(
                            "/libraries/{library_id}/books/{book_id}",
                            web::delete().to(relationships::remove_library_book),
                        )
                        .route(
                            "/libraries/{library_id}/librarian",
                            web::put().to(relationships::assign_librarian),
                        )
                        .route("/admin-view", web::get().to(relationships::admin_view))
                        .route("/librarian-view", web::get().to(relationships::librarian_view))
                        .route("/member-view", web::get().to(relationships::member_view)),
                )
                .service(
                    web::scope("/posts")
                        .route("/feed", web::get().to(posts::feed))
                        .route("/posts", web::get().to(posts::list_posts))
                        .route("/posts", web::post().to(posts::create_post))
                        .route("/posts/{post_id}", web::get().to(posts::get_post))
                        .route("/posts/{post_id}", web::put().to(posts::update_post))
                        .route("/posts/{post_id}", web::patch().to(posts::update_post))
                        .route("/posts/{post_id}", web::delete().to(posts::delete_post))
                        .route("/posts/{post_id}/like", web::post().to(posts::like_post))
                        .route("/posts/{post_id}/unlike", web::post().to(posts::unlike_post))
                        .route("/posts/{post_id}/unlike", web::delete().to(posts::unlike_post))
                        .route(
                            "/posts/{post_id}/comments",
                            web::get().to(posts::post_comments),
                        )
                        .route("/comments", web::get().to(posts::list_comments))
                        .route("/comments", web::post().to(posts::create_comment))
                        .route("/comments/{comment_id}", web::get().to(posts::get_comment))
                        .route("/comments/{comment_id}", web::put().to(posts::update_comment))
                        .route(
                            "/comments/{comment_id}",
                            web::patch().to(posts::update_comment),
                        )
                        .route(
                            "/comments/{comment_id}",
                            web::delete().to(posts::delete_comment),
                        )
                        .route("/likes", web::get().to(posts::list_likes))
                        .route("/likes/{like_id}", web::get().to(posts::get_like)),
                )
                .service(
                    web::scope("/notifications")
                        .route("", web::get().to(notifications::list_notifications))
                        .route("/unread", web::get().to(notifications::unread_notifications))
                        .route("/count", web::get().to(notifications::notification_count))
                        .route(
                            "/mark_all_as_read",
                            web::post().to(notifications::mark_all_as_read),
                        )
                        .route(
                            "/{notification_id}",
                            web::get().to(notifications::get_notification),
                        )
                        .route(
                            "/{notification_id}",
                            web::patch().to(notifications::update_notification),
                        )
                        .route(
                            "/{notification_id}",
                            web::delete().to(notifications::delete_notification),
                        )
                        .route(
                            "/{notification_id}/mark_as_read",
                            web::post().to(notifications::mark_as_read),
                        )
                        .route(
                            "/{notification_id}/mark_as_unread",
                            web::post().to(notifications::mark_as_unread),
                        ),
                ),
        );
}
