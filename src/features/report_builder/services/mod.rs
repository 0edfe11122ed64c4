pub mod report_layout;
pub mod report_pdf_service;
pub mod report_session_service;

pub use report_pdf_service::ReportPdfService;
pub use report_session_service::{ReportSessionService, SessionLimits};
