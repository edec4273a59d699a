use crate::entities::{author, catalog_book, librarian, library, user::Role};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AuthorRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthorResponse {
    pub id: i64,
    pub name: String,
}

impl From<author::Model> for AuthorResponse {
    fn from(author: author::Model) -> Self {
        AuthorResponse {
            id: author.id,
            name: author.name,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CatalogBookRequest {
    pub title: String,
    pub author_id: i64,
    pub publication_year: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CatalogBookQuery {
    /// Exact author name.
    pub author: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CatalogBookResponse {
    pub id: i64,
    pub title: String,
    pub author_id: i64,
    pub publication_year: Option<i32>,
}

impl From<catalog_book::Model> for CatalogBookResponse {
    fn from(book: catalog_book::Model) -> Self {
        CatalogBookResponse {
            id: book.id,
            title: book.title,
            author_id: book.author_id,
            publication_year: book.publication_year,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LibraryRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LibraryResponse {
    pub id: i64,
    pub name: String,
}

impl From<library::Model> for LibraryResponse {
    fn from(library: library::Model) -> Self {
        LibraryResponse {
            id: library.id,
            name: library.name,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LibraryDetail {
    pub id: i64,
    pub name: String,
    pub books: Vec<CatalogBookResponse>,
    pub librarian: Option<LibrarianResponse>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LibrarianRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LibrarianResponse {
    pub id: i64,
    pub name: String,
    pub library_id: i64,
}

impl From<librarian::Model> for LibrarianResponse {
    fn from(librarian: librarian::Model) -> Self {
        LibrarianResponse {
            id: librarian.id,
            name: librarian.name,
            library_id: librarian.library_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RoleViewResponse {
    pub message: String,
    pub role: Role,
}
