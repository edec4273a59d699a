pub mod book;
pub mod common;
pub mod library;
pub mod notification;
pub mod post;
pub mod user;

pub use book::*;
pub use common::*;
pub use library::*;
pub use notification::*;
pub use post::*;
pub use user::*;
