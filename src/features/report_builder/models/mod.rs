pub mod photo;
pub mod report;
pub mod session;

pub use photo::{BatchOutcome, Photo, PhotoManager, PhotoUpload, RejectedUpload};
pub use report::{ReportData, ReportFieldsPatch, ReportForm};
pub use session::{GeneratedReport, ReportSession};
