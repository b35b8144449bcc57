//! Request middleware.

pub mod auth;

pub use auth::{AuthCaller, auth_middleware};
