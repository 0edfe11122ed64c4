pub mod companies;
pub mod presets;
pub mod report_builder;
