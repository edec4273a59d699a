pub mod author;
pub mod book;
pub mod catalog_book;
pub mod comment;
pub mod follow;
pub mod librarian;
pub mod library;
pub mod library_book;
pub mod like;
pub mod notification;
pub mod post;
pub mod user;
pub mod user_permission;
