pub mod auth;
pub mod edge_guard;
