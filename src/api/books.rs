use crate::auth::{has_permission, require_permission, AuthenticatedUser, Permission};
use crate::db::DbPool;
use crate::entities::book;
use crate::error::{is_unique_violation, ApiError, ApiResult, FieldErrors};
use crate::models::{BookListResponse, BookQuery, BookResponse, DetailResponse};
use crate::validation::{BookForm, CleanBook};
use actix_web::{web, HttpResponse};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
};

fn duplicate_isbn() -> ApiError {
    ApiError::Validation(FieldErrors::single(
        "isbn",
        "Book with this ISBN already exists.",
    ))
}

async fn find_book(pool: &DbPool, id: i64) -> ApiResult<book::Model> {
    book::Entity::find_by_id(id)
        .one(pool)
        .await?
        .ok_or(ApiError::NotFound("Book"))
}

/// Rejects an ISBN already used by a different book.
async fn ensure_isbn_free(pool: &DbPool, clean: &CleanBook, except: Option<i64>) -> ApiResult<()> {
    let mut query = book::Entity::find().filter(book::Column::Isbn.eq(&clean.isbn));
    if let Some(id) = except {
        query = query.filter(book::Column::Id.ne(id));
    }
    if query.one(pool).await?.is_some() {
        return Err(duplicate_isbn());
    }
    Ok(())
}

fn map_write_error(err: sea_orm::DbErr) -> ApiError {
    if is_unique_violation(&err) {
        duplicate_isbn()
    } else {
        ApiError::Database(err)
    }
}

#[utoipa::path(
    get,
    path = "/api/books",
    params(("search" = Option<String>, Query, description = "Substring of the title")),
    responses(
        (status = 200, description = "Books visible to the caller", body = BookListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Missing can_view")
    ),
    security(("bearer_auth" = [])),
    tag = "books"
)]
pub async fn list_books(
    query: web::Query<BookQuery>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let viewer = require_permission(pool.get_ref(), &user, Permission::CanView).await?;
    let search = query.search.as_deref().unwrap_or("").trim().to_string();

    let mut select = book::Entity::find();
    if !search.is_empty() {
        select = select.filter(book::Column::Title.contains(&search));
    }
    let books = select
        .order_by_asc(book::Column::Title)
        .all(pool.get_ref())
        .await?;

    let response = BookListResponse {
        books: books.into_iter().map(BookResponse::from).collect(),
        search,
        can_create: has_permission(pool.get_ref(), &viewer, Permission::CanCreate).await?,
        can_edit: has_permission(pool.get_ref(), &viewer, Permission::CanEdit).await?,
        can_delete: has_permission(pool.get_ref(), &viewer, Permission::CanDelete).await?,
    };
    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    post,
    path = "/api/books",
    request_body = BookForm,
    responses(
        (status = 201, description = "Book created", body = BookResponse),
        (status = 400, description = "Validation errors keyed by field"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Missing can_create")
    ),
    security(("bearer_auth" = [])),
    tag = "books"
)]
pub async fn create_book(
    form: web::Json<BookForm>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let creator = require_permission(pool.get_ref(), &user, Permission::CanCreate).await?;
    let clean = form.clean()?;
    ensure_isbn_free(pool.get_ref(), &clean, None).await?;

    let now = Utc::now();
    let new_book = book::ActiveModel {
        title: Set(clean.title),
        author: Set(clean.author),
        isbn: Set(clean.isbn),
        publication_date: Set(clean.publication_date),
        description: Set(clean.description),
        created_by: Set(Some(creator.id)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let book = book::Entity::insert(new_book)
        .exec_with_returning(pool.get_ref())
        .await
        .map_err(map_write_error)?;

    log::info!("User {} created book {} ({})", creator.id, book.id, book.title);
    Ok(HttpResponse::Created().json(BookResponse::from(book)))
}

#[utoipa::path(
    get,
    path = "/api/books/{book_id}",
    params(("book_id" = i64, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book", body = BookResponse),
        (status = 403, description = "Missing can_view"),
        (status = 404, description = "Book not found")
    ),
    security(("bearer_auth" = [])),
    tag = "books"
)]
pub async fn get_book(
    path: web::Path<i64>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    require_permission(pool.get_ref(), &user, Permission::CanView).await?;
    let book = find_book(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(BookResponse::from(book)))
}

#[utoipa::path(
    put,
    path = "/api/books/{book_id}",
    params(("book_id" = i64, Path, description = "Book ID")),
    request_body = BookForm,
    responses(
        (status = 200, description = "Book updated", body = BookResponse),
        (status = 400, description = "Validation errors keyed by field"),
        (status = 403, description = "Missing can_edit"),
        (status = 404, description = "Book not found")
    ),
    security(("bearer_auth" = [])),
    tag = "books"
)]
pub async fn update_book(
    path: web::Path<i64>,
    form: web::Json<BookForm>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let editor = require_permission(pool.get_ref(), &user, Permission::CanEdit).await?;
    let existing = find_book(pool.get_ref(), path.into_inner()).await?;
    let clean = form.clean()?;
    ensure_isbn_free(pool.get_ref(), &clean, Some(existing.id)).await?;

    let mut active = existing.into_active_model();
    active.title = Set(clean.title);
    active.author = Set(clean.author);
    active.isbn = Set(clean.isbn);
    active.publication_date = Set(clean.publication_date);
    active.description = Set(clean.description);
    active.updated_at = Set(Utc::now());
    let book = active
        .update(pool.get_ref())
        .await
        .map_err(map_write_error)?;

    log::info!("User {} updated book {}", editor.id, book.id);
    Ok(HttpResponse::Ok().json(BookResponse::from(book)))
}

#[utoipa::path(
    delete,
    path = "/api/books/{book_id}",
    params(("book_id" = i64, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book deleted", body = DetailResponse),
        (status = 403, description = "Missing can_delete"),
        (status = 404, description = "Book not found")
    ),
    security(("bearer_auth" = [])),
    tag = "books"
)]
pub async fn delete_book(
    path: web::Path<i64>,
    user: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let editor = require_permission(pool.get_ref(), &user, Permission::CanDelete).await?;
    let book = find_book(pool.get_ref(), path.into_inner()).await?;
    let title = book.title.clone();
    book::Entity::delete_by_id(book.id)
        .exec(pool.get_ref())
        .await?;

    log::info!("User {} deleted book {} ({})", editor.id, book.id, title);
    Ok(HttpResponse::Ok().json(DetailResponse::new(format!(
        "Book \"{}\" was deleted.",
        title
    ))))
}
