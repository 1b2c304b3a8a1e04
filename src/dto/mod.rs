pub mod auth;
pub mod orders;
pub mod restaurants;
