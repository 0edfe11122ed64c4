//! Asset loader for logo and background references
//!
//! A reference is either a `data:` URL, an `http(s)://` URL, or a path
//! relative to the configured assets directory.

mod loader;

pub use loader::{decode_image, AssetLoader};
