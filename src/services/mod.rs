pub mod auth_service;
pub mod cookie_service;
pub mod jwt_service;
