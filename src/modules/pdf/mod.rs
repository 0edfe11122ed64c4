//! Paginated PDF engine: cursor layout in millimeters plus a printpdf renderer

pub mod config;
pub mod layout;
pub mod render;
pub mod text;

pub use config::PdfConfig;
pub use layout::{fit_within, DocumentLayout, FontWeight, LayoutBuilder};
pub use render::{render_document, PdfFonts};
