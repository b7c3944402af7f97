//! HTTP layer of the gallery backend: axum handlers, session and rate-limit
//! middleware, the error to response mapping and the collaborators shared
//! through [`AppState`].

pub mod cookies;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod mail;
pub mod middleware;
pub mod passwords;
pub mod ratelimit;
pub mod routes;
pub mod state;
mod views;

#[cfg(test)]
pub(crate) mod testing;

pub use error::ApiError;
pub use routes::router;
pub use state::{AppState, AppStateInner};
