pub mod config;
pub mod error;
pub mod http;
mod routes;

pub use http::{AppState, router};
