use crate::entities::book;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BookResponse {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publication_date: Option<NaiveDate>,
    pub description: String,
    pub created_by: Option<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<book::Model> for BookResponse {
    fn from(book: book::Model) -> Self {
        BookResponse {
            id: book.id,
            title: book.title,
            author: book.author,
            isbn: book.isbn,
            publication_date: book.publication_date,
            description: book.description,
            created_by: book.created_by,
            created_at: book.created_at,
            updated_at: book.updated_at,
        }
    }
}

/// Book list plus what the caller may do with it.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BookListResponse {
    pub books: Vec<BookResponse>,
    pub search: String,
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BookQuery {
    pub search: Option<String>,
}
