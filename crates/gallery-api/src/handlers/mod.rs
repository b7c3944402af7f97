pub mod access;
pub mod access_keys;
pub mod auth;
pub mod collections;
pub mod galleries;
pub mod images;
pub mod members;
