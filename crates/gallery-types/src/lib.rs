//! Shared types for the gallery backend: API payloads, access levels and
//! input validation rules.

pub mod api;
pub mod models;
pub mod validate;
