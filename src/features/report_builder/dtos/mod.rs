pub mod report_session_dto;

pub use report_session_dto::*;
