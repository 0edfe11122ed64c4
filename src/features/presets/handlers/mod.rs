pub mod preset_handler;

pub use preset_handler::*;
