//! Input cleaning shared by the book and account handlers.

use crate::error::{ApiError, FieldErrors};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;

pub const TITLE_MAX: usize = 200;
pub const AUTHOR_MAX: usize = 100;
pub const PASSWORD_MIN: usize = 8;
pub const BIO_MAX: usize = 500;

/// Removes literal `<script>` tags; everything else is stored as given.
pub fn strip_script_tags(value: &str) -> String {
    value.replace("<script>", "").replace("</script>", "")
}

/// Drops hyphens and spaces, then requires 10 or 13 digits.
pub fn normalize_isbn(raw: &str) -> Result<String, &'static str> {
    let isbn: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '-' && *c != ' ')
        .collect();
    if isbn.is_empty() {
        return Err("ISBN is required.");
    }
    if isbn.chars().count() != 10 && isbn.chars().count() != 13 {
        return Err("ISBN must be 10 or 13 digits long.");
    }
    if !isbn.chars().all(|c| c.is_ascii_digit()) {
        return Err("ISBN must contain only numbers.");
    }
    Ok(isbn)
}

/// Minimal shape check: one `@` with a non-empty local part and a dotted domain.
pub fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// Lowercases the domain part, keeping the local part as typed.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

fn clean_required_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&str>,
    (required_label, length_label): (&str, &str),
    max: usize,
) -> String {
    let value = value.unwrap_or("").trim();
    if value.is_empty() {
        errors.add(field, format!("{} is required.", required_label));
        return String::new();
    }
    let value = strip_script_tags(value);
    if value.chars().count() > max {
        errors.add(
            field,
            format!("{} must be less than {} characters.", length_label, max),
        );
    }
    value
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct BookForm {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanBook {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publication_date: Option<NaiveDate>,
    pub description: String,
}

impl BookForm {
    pub fn clean(&self) -> Result<CleanBook, ApiError> {
        let mut errors = FieldErrors::new();

        let title = clean_required_text(
            &mut errors,
            "title",
            self.title.as_deref(),
            ("Title", "Title"),
            TITLE_MAX,
        );
        let author = clean_required_text(
            &mut errors,
            "author",
            self.author.as_deref(),
            ("Author", "Author name"),
            AUTHOR_MAX,
        );
        let isbn = match normalize_isbn(self.isbn.as_deref().unwrap_or("")) {
            Ok(isbn) => isbn,
            Err(message) => {
                errors.add("isbn", message);
                String::new()
            }
        };
        let description = strip_script_tags(self.description.as_deref().unwrap_or("").trim());

        errors.into_result()?;
        Ok(CleanBook {
            title,
            author,
            isbn,
            publication_date: self.publication_date,
            description,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(title: &str, author: &str, isbn: &str) -> BookForm {
        BookForm {
            title: Some(title.to_string()),
            author: Some(author.to_string()),
            isbn: Some(isbn.to_string()),
            publication_date: None,
            description: Some("  <script>alert(1)</script>A classic  ".to_string()),
        }
    }

    #[test]
    fn isbn_normalisation() {
        assert_eq!(normalize_isbn("978-0-452-28423-4"), Ok("9780452284234".to_string()));
        assert_eq!(normalize_isbn(" 0 452 28423 8 "), Ok("0452284238".to_string()));
        assert_eq!(normalize_isbn(""), Err("ISBN is required."));
        assert_eq!(normalize_isbn("12345"), Err("ISBN must be 10 or 13 digits long."));
        assert_eq!(normalize_isbn("04522842X8"), Err("ISBN must contain only numbers."));
    }

    #[test]
    fn clean_strips_and_trims() {
        let clean = form("  <script>1984</script> ", "George Orwell", "9780452284234")
            .clean()
            .unwrap();
        assert_eq!(clean.title, "1984");
        assert_eq!(clean.author, "George Orwell");
        assert_eq!(clean.description, "alert(1)A classic");
    }

    #[test]
    fn clean_reports_every_bad_field() {
        let err = form("", &"x".repeat(AUTHOR_MAX + 1), "abc").clean().unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                assert_eq!(errors.get("title"), Some(&["Title is required.".to_string()][..]));
                assert_eq!(
                    errors.get("author"),
                    Some(&["Author name must be less than 100 characters.".to_string()][..])
                );
                assert!(errors.get("isbn").is_some());
                assert!(errors.get("description").is_none());
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn missing_author_is_required() {
        let err = form("1984", "   ", "0452284238").clean().unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                assert_eq!(errors.get("author"), Some(&["Author is required.".to_string()][..]));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn title_at_limit_is_accepted() {
        let title = "t".repeat(TITLE_MAX);
        assert!(form(&title, "A", "0452284238").clean().is_ok());
        let title = "t".repeat(TITLE_MAX + 1);
        assert!(form(&title, "A", "0452284238").clean().is_err());
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("reader@example.com"));
        assert!(!is_valid_email("reader"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("reader@localhost"));
        assert!(!is_valid_email("a b@example.com"));
        assert_eq!(normalize_email(" Reader@EXAMPLE.com "), "Reader@example.com");
    }
}
