//! Clients for the upstream AI backends.
//!
//! Both backends are opaque collaborators reached over HTTP: the image
//! backend returns raw PNG bytes, the chat backend returns text expected to
//! be JSON.

mod chat;
mod image;

pub use chat::{ChatSession, Content, Part};
pub use image::ImageBackend;
