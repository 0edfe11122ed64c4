pub mod preset_service;

pub use preset_service::PresetService;
