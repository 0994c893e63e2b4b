//! HTTP middleware for caller authentication.
pub mod auth;
