#![warn(clippy::unwrap_used)]

pub mod analytics_rest;
pub mod format;
pub mod rest;
pub mod server;
pub mod swagger;

pub use rest::AppState;
pub use server::{build_router, ApiServer};
pub use swagger::ApiDoc;
