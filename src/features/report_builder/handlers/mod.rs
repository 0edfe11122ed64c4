pub mod report_session_handler;

pub use report_session_handler::*;
