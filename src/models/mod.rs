pub mod auth;
pub mod mail_pool;
pub mod menu;
pub mod user;
