//! HTTP API module.
//!
//! Exposes the request handlers that forward prompts to the AI backends and
//! relay normalized results to the caller.

mod handlers;
mod server;

pub use server::{create_router, run_server, AppState};
