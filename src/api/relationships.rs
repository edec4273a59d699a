use crate::auth::{require_permission, require_role, require_staff, AuthenticatedUser, Permission};
use crate::db::DbPool;
use crate::entities::user::Role;
use crate::entities::{author, catalog_book, librarian, library, library_book};
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::models::{
    AuthorRequest, AuthorResponse, CatalogBookQuery, CatalogBookRequest, CatalogBookResponse,
    DetailResponse, LibrarianRequest, LibrarianResponse, LibraryDetail, LibraryRequest,
    LibraryResponse, RoleViewResponse,
};
use actix_web::{web, HttpResponse};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, ModelTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set,
};

const NAME_MAX: usize = 100;
const TITLE_MAX: usize = 200;

fn required(errors: &mut FieldErrors, field: &str, value: &str, max: usize) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, "This field may not be blank.");
    } else if value.chars().count() > max {
        errors.add(
            field,
            format!("Ensure this field has no more than {} characters.", max),
        );
    }
    value.to_string()
}

async fn find_author(pool: &DbPool, id: i64) -> ApiResult<author::Model> {
    author::Entity::find_by_id(id)
        .one(pool)
        .await?
        .ok_or(ApiError::NotFound("Author"))
}

async fn find_catalog_book(pool: &DbPool, id: i64) -> ApiResult<catalog_book::Model> {
    catalog_book::Entity::find_by_id(id)
        .one(pool)
        .await?
        .ok_or(ApiError::NotFound("Book"))
}

async fn find_library(pool: &DbPool, id: i64) -> ApiResult<library::Model> {
    library::Entity::find_by_id(id)
        .one(pool)
        .await?
        .ok_or(ApiError::NotFound("Library"))
}

/// Validates a catalog book body; the author must exist.
async fn clean_catalog_book(
    pool: &DbPool,
    req: &CatalogBookRequest,
) -> ApiResult<(String, i64, Option<i32>)> {
    let mut errors = FieldErrors::new();
    let title = required(&mut errors, "title", &req.title, TITLE_MAX);
    if author::Entity::find_by_id(req.author_id)
        .one(pool)
        .await?
        .is_none()
    {
        errors.add(
            "author_id",
            format!("Invalid pk \"{}\" - object does not exist.", req.author_id),
        );
    }
    errors.into_result()?;
    Ok((title, req.author_id, req.publication_year))
}

#[utoipa::path(
    get,
    path = "/api/relationships/authors",
    responses((status = 200, description = "All authors", body = Vec<AuthorResponse>)),
    tag = "relationships"
)]
pub async fn list_authors(pool: web::Data<DbPool>) -> ApiResult<HttpResponse> {
    let authors: Vec<AuthorResponse> = author::Entity::find()
        .order_by_asc(author::Column::Name)
        .all(pool.get_ref())
        .await?
        .into_iter()
        .map(AuthorResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(authors))
}

#[utoipa::path(
    post,
    path = "/api/relationships/authors",
    request_body = AuthorRequest,
    responses(
        (status = 201, description = "Author created", body = AuthorResponse),
        (status = 400, description = "Validation errors keyed by field"),
        (status = 403, description = "Missing can_add_book")
    ),
    security(("bearer_auth" = [])),
    tag = "relationships"
)]
pub async fn create_author(
    req: web::Json<AuthorRequest>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let editor = require_permission(pool.get_ref(), &user, Permission::CanAddBook).await?;
    let mut errors = FieldErrors::new();
    let name = required(&mut errors, "name", &req.name, NAME_MAX);
    errors.into_result()?;

    let author = author::Entity::insert(author::ActiveModel {
        name: Set(name),
        ..Default::default()
    })
    .exec_with_returning(pool.get_ref())
    .await?;

    log::info!("User {} added author {} ({})", editor.id, author.id, author.name);
    Ok(HttpResponse::Created().json(AuthorResponse::from(author)))
}

#[utoipa::path(
    get,
    path = "/api/relationships/authors/{author_id}/books",
    params(("author_id" = i64, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Books written by the author", body = Vec<CatalogBookResponse>),
        (status = 404, description = "Author not found")
    ),
    tag = "relationships"
)]
pub async fn author_books(
    path: web::Path<i64>,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let author = find_author(pool.get_ref(), path.into_inner()).await?;
    let books: Vec<CatalogBookResponse> = author
        .find_related(catalog_book::Entity)
        .order_by_asc(catalog_book::Column::Title)
        .all(pool.get_ref())
        .await?
        .into_iter()
        .map(CatalogBookResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(books))
}

#[utoipa::path(
    get,
    path = "/api/relationships/books",
    params(("author" = Option<String>, Query, description = "Exact author name")),
    responses((status = 200, description = "Catalog books", body = Vec<CatalogBookResponse>)),
    tag = "relationships"
)]
pub async fn list_catalog_books(
    query: web::Query<CatalogBookQuery>,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let mut select = catalog_book::Entity::find();
    if let Some(name) = query.author.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        select = select
            .join(
                sea_orm::JoinType::InnerJoin,
                catalog_book::Relation::Author.def(),
            )
            .filter(author::Column::Name.eq(name));
    }
    let books: Vec<CatalogBookResponse> = select
        .order_by_asc(catalog_book::Column::Title)
        .all(pool.get_ref())
        .await?
        .into_iter()
        .map(CatalogBookResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(books))
}

#[utoipa::path(
    post,
    path = "/api/relationships/books",
    request_body = CatalogBookRequest,
    responses(
        (status = 201, description = "Book added", body = CatalogBookResponse),
        (status = 400, description = "Validation errors keyed by field"),
        (status = 403, description = "Missing can_add_book")
    ),
    security(("bearer_auth" = [])),
    tag = "relationships"
)]
pub async fn create_catalog_book(
    req: web::Json<CatalogBookRequest>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let editor = require_permission(pool.get_ref(), &user, Permission::CanAddBook).await?;
    let (title, author_id, publication_year) = clean_catalog_book(pool.get_ref(), &req).await?;

    let book = catalog_book::Entity::insert(catalog_book::ActiveModel {
        title: Set(title),
        author_id: Set(author_id),
        publication_year: Set(publication_year),
        ..Default::default()
    })
    .exec_with_returning(pool.get_ref())
    .await?;

    log::info!("User {} added catalog book {}", editor.id, book.id);
    Ok(HttpResponse::Created().json(CatalogBookResponse::from(book)))
}

#[utoipa::path(
    put,
    path = "/api/relationships/books/{book_id}",
    params(("book_id" = i64, Path, description = "Catalog book ID")),
    request_body = CatalogBookRequest,
    responses(
        (status = 200, description = "Book changed", body = CatalogBookResponse),
        (status = 400, description = "Validation errors keyed by field"),
        (status = 403, description = "Missing can_change_book"),
        (status = 404, description = "Book not found")
    ),
    security(("bearer_auth" = [])),
    tag = "relationships"
)]
pub async fn update_catalog_book(
    path: web::Path<i64>,
    req: web::Json<CatalogBookRequest>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let editor = require_permission(pool.get_ref(), &user, Permission::CanChangeBook).await?;
    let existing = find_catalog_book(pool.get_ref(), path.into_inner()).await?;
    let (title, author_id, publication_year) = clean_catalog_book(pool.get_ref(), &req).await?;

    let mut active = existing.into_active_model();
    active.title = Set(title);
    active.author_id = Set(author_id);
    active.publication_year = Set(publication_year);
    let book = active.update(pool.get_ref()).await?;

    log::info!("User {} changed catalog book {}", editor.id, book.id);
    Ok(HttpResponse::Ok().json(CatalogBookResponse::from(book)))
}

#[utoipa::path(
    delete,
    path = "/api/relationships/books/{book_id}",
    params(("book_id" = i64, Path, description = "Catalog book ID")),
    responses(
        (status = 200, description = "Book deleted", body = DetailResponse),
        (status = 403, description = "Missing can_delete_book"),
        (status = 404, description = "Book not found")
    ),
    security(("bearer_auth" = [])),
    tag = "relationships"
)]
pub async fn delete_catalog_book(
    path: web::Path<i64>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let editor = require_permission(pool.get_ref(), &user, Permission::CanDeleteBook).await?;
    let book = find_catalog_book(pool.get_ref(), path.into_inner()).await?;
    let id = book.id;
    book.delete(pool.get_ref()).await?;

    log::info!("User {} deleted catalog book {}", editor.id, id);
    Ok(HttpResponse::Ok().json(DetailResponse::new("Book deleted.")))
}

#[utoipa::path(
    get,
    path = "/api/relationships/libraries",
    responses((status = 200, description = "All libraries", body = Vec<LibraryResponse>)),
    tag = "relationships"
)]
pub async fn list_libraries(pool: web::Data<DbPool>) -> ApiResult<HttpResponse> {
    let libraries: Vec<LibraryResponse> = library::Entity::find()
        .order_by_asc(library::Column::Name)
        .all(pool.get_ref())
        .await?
        .into_iter()
        .map(LibraryResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(libraries))
}

#[utoipa::path(
    post,
    path = "/api/relationships/libraries",
    request_body = LibraryRequest,
    responses(
        (status = 201, description = "Library created", body = LibraryResponse),
        (status = 400, description = "Validation errors keyed by field"),
        (status = 403, description = "Caller is not staff")
    ),
    security(("bearer_auth" = [])),
    tag = "relationships"
)]
pub async fn create_library(
    req: web::Json<LibraryRequest>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let admin = require_staff(pool.get_ref(), &user).await?;
    let mut errors = FieldErrors::new();
    let name = required(&mut errors, "name", &req.name, NAME_MAX);
    errors.into_result()?;

    let library = library::Entity::insert(library::ActiveModel {
        name: Set(name),
        ..Default::default()
    })
    .exec_with_returning(pool.get_ref())
    .await?;

    log::info!("User {} created library {}", admin.id, library.id);
    Ok(HttpResponse::Created().json(LibraryResponse::from(library)))
}

async fn library_detail(pool: &DbPool, library: library::Model) -> ApiResult<LibraryDetail> {
    let books = library
        .find_related(catalog_book::Entity)
        .order_by_asc(catalog_book::Column::Title)
        .all(pool)
        .await?
        .into_iter()
        .map(CatalogBookResponse::from)
        .collect();
    let librarian = library
        .find_related(librarian::Entity)
        .one(pool)
        .await?
        .map(LibrarianResponse::from);
    Ok(LibraryDetail {
        id: library.id,
        name: library.name,
        books,
        librarian,
    })
}

#[utoipa::path(
    get,
    path = "/api/relationships/libraries/{library_id}",
    params(("library_id" = i64, Path, description = "Library ID")),
    responses(
        (status = 200, description = "Library with its books and librarian", body = LibraryDetail),
        (status = 404, description = "Library not found")
    ),
    tag = "relationships"
)]
pub async fn get_library(
    path: web::Path<i64>,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let library = find_library(pool.get_ref(), path.into_inner()).await?;
    let detail = library_detail(pool.get_ref(), library).await?;
    Ok(HttpResponse::Ok().json(detail))
}

#[utoipa::path(
    post,
    path = "/api/relationships/libraries/{library_id}/books/{book_id}",
    params(
        ("library_id" = i64, Path, description = "Library ID"),
        ("book_id" = i64, Path, description = "Catalog book ID")
    ),
    responses(
        (status = 200, description = "Book now held by the library", body = LibraryDetail),
        (status = 403, description = "Missing can_change_book"),
        (status = 404, description = "Library or book not found")
    ),
    security(("bearer_auth" = [])),
    tag = "relationships"
)]
pub async fn add_library_book(
    path: web::Path<(i64, i64)>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let editor = require_permission(pool.get_ref(), &user, Permission::CanChangeBook).await?;
    let (library_id, book_id) = path.into_inner();
    let library = find_library(pool.get_ref(), library_id).await?;
    let book = find_catalog_book(pool.get_ref(), book_id).await?;

    let held = library_book::Entity::find_by_id((library.id, book.id))
        .one(pool.get_ref())
        .await?
        .is_some();
    if !held {
        library_book::Entity::insert(library_book::ActiveModel {
            library_id: Set(library.id),
            catalog_book_id: Set(book.id),
        })
        .exec_without_returning(pool.get_ref())
        .await?;
        log::info!(
            "User {} added book {} to library {}",
            editor.id,
            book.id,
            library.id
        );
    }

    let detail = library_detail(pool.get_ref(), library).await?;
    Ok(HttpResponse::Ok().json(detail))
}

#[utoipa::path(
    delete,
    path = "/api/relationships/libraries/{library_id}/books/{book_id}",
    params(
        ("library_id" = i64, Path, description = "Library ID"),
        ("book_id" = i64, Path, description = "Catalog book ID")
    ),
    responses(
        (status = 200, description = "Book removed from the library", body = LibraryDetail),
        (status = 403, description = "Missing can_change_book"),
        (status = 404, description = "Library not found")
    ),
    security(("bearer_auth" = [])),
    tag = "relationships"
)]
pub async fn remove_library_book(
    path: web::Path<(i64, i64)>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let editor = require_permission(pool.get_ref(), &user, Permission::CanChangeBook).await?;
    let (library_id, book_id) = path.into_inner();
    let library = find_library(pool.get_ref(), library_id).await?;

    let removed = library_book::Entity::delete_many()
        .filter(library_book::Column::LibraryId.eq(library.id))
        .filter(library_book::Column::CatalogBookId.eq(book_id))
        .exec(pool.get_ref())
        .await?;
    if removed.rows_affected > 0 {
        log::info!(
            "User {} removed book {} from library {}",
            editor.id,
            book_id,
            library.id
        );
    }

    let detail = library_detail(pool.get_ref(), library).await?;
    Ok(HttpResponse::Ok().json(detail))
}

#[utoipa::path(
    put,
    path = "/api/relationships/libraries/{library_id}/librarian",
    params(("library_id" = i64, Path, description = "Library ID")),
    request_body = LibrarianRequest,
    responses(
        (status = 200, description = "Librarian assigned", body = LibrarianResponse),
        (status = 400, description = "Validation errors keyed by field"),
        (status = 403, description = "Caller is not staff"),
        (status = 404, description = "Library not found")
    ),
    security(("bearer_auth" = [])),
    tag = "relationships"
)]
pub async fn assign_librarian(
    path: web::Path<i64>,
    req: web::Json<LibrarianRequest>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let admin = require_staff(pool.get_ref(), &user).await?;
    let library = find_library(pool.get_ref(), path.into_inner()).await?;
    let mut errors = FieldErrors::new();
    let name = required(&mut errors, "name", &req.name, NAME_MAX);
    errors.into_result()?;

    // One librarian per library: replace the name in place when one exists.
    let current = library
        .find_related(librarian::Entity)
        .one(pool.get_ref())
        .await?;
    let librarian = match current {
        Some(existing) => {
            let mut active = existing.into_active_model();
            active.name = Set(name);
            active.update(pool.get_ref()).await?
        }
        None => {
            librarian::Entity::insert(librarian::ActiveModel {
                name: Set(name),
                library_id: Set(library.id),
                ..Default::default()
            })
            .exec_with_returning(pool.get_ref())
            .await?
        }
    };

    log::info!(
        "User {} assigned librarian {} to library {}",
        admin.id,
        librarian.name,
        library.id
    );
    Ok(HttpResponse::Ok().json(LibrarianResponse::from(librarian)))
}

async fn role_view(
    pool: &DbPool,
    user: &AuthenticatedUser,
    role: Role,
    message: &str,
) -> ApiResult<HttpResponse> {
    let member = require_role(pool, user, role).await?;
    Ok(HttpResponse::Ok().json(RoleViewResponse {
        message: format!("{}, {}", message, member.username),
        role: member.role,
    }))
}

#[utoipa::path(
    get,
    path = "/api/relationships/admin-view",
    responses(
        (status = 200, description = "Admin role only", body = RoleViewResponse),
        (status = 403, description = "Caller does not hold the admin role")
    ),
    security(("bearer_auth" = [])),
    tag = "relationships"
)]
pub async fn admin_view(
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    role_view(pool.get_ref(), &user, Role::Admin, "Welcome to the admin dashboard").await
}

#[utoipa::path(
    get,
    path = "/api/relationships/librarian-view",
    responses(
        (status = 200, description = "Librarian role only", body = RoleViewResponse),
        (status = 403, description = "Caller does not hold the librarian role")
    ),
    security(("bearer_auth" = [])),
    tag = "relationships"
)]
pub async fn librarian_view(
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    role_view(pool.get_ref(), &user, Role::Librarian, "Welcome to the librarian desk").await
}

#[utoipa::path(
    get,
    path = "/api/relationships/member-view",
    responses(
        (status = 200, description = "Member role only", body = RoleViewResponse),
        (status = 403, description = "Caller does not hold the member role")
    ),
    security(("bearer_auth" = [])),
    tag = "relationships"
)]
pub async fn member_view(
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    role_view(pool.get_ref(), &user, Role::Member, "Welcome to the member area").await
}
