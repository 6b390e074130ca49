//! reelforge - backend API for an AI short-video generator.
//!
//! This library provides the request handlers that forward prompts to
//! third-party AI and media services (image generation, chat completion,
//! media hosting) and relay normalized results to callers.

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod script;
pub mod upload;

pub use config::Config;
pub use error::{Error, Result};
