//! HTTP surface: axum router, API-key middleware and JSON handlers.

mod handlers;
mod server;

pub use handlers::{health, API_KEY_HEADER};
pub use server::{router, serve, AppState};
