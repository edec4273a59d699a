pub mod notification;
pub mod posts;
pub mod users;
