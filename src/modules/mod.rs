//! Modules layer - Infrastructure components shared by features
//!
//! Contains the PDF engine and the asset loader used to resolve images.

pub mod assets;
pub mod pdf;
