pub mod admin_service;
pub mod auth_service;
pub mod catalog;
pub mod order_service;
pub mod owner_service;
