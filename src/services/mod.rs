pub mod auth;
pub mod digest;
pub mod digest_scheduler;
pub mod email;
pub mod mail_pool;
pub mod menu;
pub mod positions;
