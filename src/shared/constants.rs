/// Default number of presets returned by the `maisUsados` / `recentes` filters
pub const DEFAULT_PRESET_LIMIT: i64 = 5;

/// Maximum number of presets a single list request may return
pub const MAX_PRESET_LIMIT: i64 = 50;

/// MIME types accepted for report photos
pub const ALLOWED_PHOTO_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Title given to every new report session
pub const DEFAULT_REPORT_TITLE: &str = "Relatório Técnico de Serviço";

/// Background image referenced by the seeded presets
pub const DEFAULT_BACKGROUND_IMAGE: &str = "/relatorio-tecnico/fundo-pdf.jpg";
