//! HTTP status endpoints for a running pipeline

pub mod http;

pub use http::{bind, create_router, spawn_server};
