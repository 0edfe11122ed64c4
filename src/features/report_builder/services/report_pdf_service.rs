use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use futures::future::join_all;
use image::DynamicImage;

use crate::core::error::{AppError, Result};
use crate::features::companies::CompanyService;
use crate::features::report_builder::models::{GeneratedReport, Photo, ReportData};
use crate::features::report_builder::services::report_layout::{
    compose_document, Decorations, PhotoContent, PhotoFigure,
};
use crate::modules::assets::{decode_image, AssetLoader};
use crate::modules::pdf::{render_document, PdfConfig, PdfFonts};

/// `relatorio-tecnico-<contract>-<yyyy-mm-dd>.pdf`, with the contract reduced
/// to characters that are safe in a Content-Disposition header
pub fn report_file_name(contract: &str, date: &str) -> String {
    let slug = contract
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if slug.is_empty() {
        format!("relatorio-tecnico-{}.pdf", date)
    } else {
        format!("relatorio-tecnico-{}-{}.pdf", slug, date)
    }
}

pub struct ReportPdfService {
    companies: Arc<CompanyService>,
    assets: Arc<AssetLoader>,
    config: PdfConfig,
    fonts: Option<Arc<PdfFonts>>,
}

impl ReportPdfService {
    pub fn new(
        companies: Arc<CompanyService>,
        assets: Arc<AssetLoader>,
        config: PdfConfig,
        fonts: Option<PdfFonts>,
    ) -> Self {
        Self {
            companies,
            assets,
            config,
            fonts: fonts.map(Arc::new),
        }
    }

    /// Load an optional logo or background. Failures are logged and turned
    /// into a warning instead of failing the document.
    async fn load_decoration(
        &self,
        label: &str,
        reference: Option<&str>,
    ) -> (Option<Arc<DynamicImage>>, Option<String>) {
        let Some(reference) = reference.map(str::trim).filter(|r| !r.is_empty()) else {
            return (None, None);
        };

        match self.assets.load_image(reference).await {
            Ok(image) => (Some(Arc::new(image)), None),
            Err(e) => {
                tracing::warn!("Skipping {} '{}': {}", label, reference, e);
                (None, Some(format!("Could not load {}: {}", label, e)))
            }
        }
    }

    async fn decode_photos(photos: &[Photo]) -> (Vec<PhotoFigure>, Vec<String>) {
        let decoded = join_all(photos.iter().map(|photo| async move {
            if photo.data.is_empty() {
                return Err(None);
            }
            decode_image(photo.data.clone())
                .await
                .map(Arc::new)
                .map_err(|e| Some(e.to_string()))
        }))
        .await;

        let mut warnings = Vec::new();
        let figures = photos
            .iter()
            .zip(decoded)
            .map(|(photo, result)| {
                let content = match result {
                    Ok(image) => PhotoContent::Image(image),
                    Err(None) => {
                        tracing::warn!("Photo {} (Fig. {}) has no data", photo.id, photo.figure);
                        warnings.push(format!("Fig. {}: photo has no data", photo.figure));
                        PhotoContent::Missing
                    }
                    Err(Some(reason)) => {
                        tracing::warn!(
                            "Photo {} (Fig. {}) could not be decoded: {}",
                            photo.id,
                            photo.figure,
                            reason
                        );
                        warnings.push(format!("Fig. {}: {}", photo.figure, reason));
                        PhotoContent::Unreadable
                    }
                };
                PhotoFigure {
                    figure: photo.figure,
                    linked_item: photo.linked_item,
                    content,
                }
            })
            .collect();

        (figures, warnings)
    }

    /// Render a report. Fails only when the issuing company is missing or
    /// rendering itself fails; bad photos and decorations become warnings.
    pub async fn generate(&self, data: &ReportData, photos: &[Photo]) -> Result<GeneratedReport> {
        let company = self
            .companies
            .resolve_issuer(data.company_id)
            .await?
            .ok_or_else(|| match data.company_id {
                Some(id) => AppError::Unprocessable(format!("Issuing company {} not found", id)),
                None => AppError::Unprocessable(format!(
                    "Default company (CNPJ {}) not found. Initialize it first.",
                    self.companies.default_tax_id()
                )),
            })?;

        let ((logo, logo_warning), (background, background_warning), (figures, photo_warnings)) = tokio::join!(
            self.load_decoration("logo", company.logo_url.as_deref()),
            self.load_decoration("background image", data.background_image_url.as_deref()),
            Self::decode_photos(photos),
        );

        let mut warnings: Vec<String> = logo_warning
            .into_iter()
            .chain(background_warning)
            .collect();
        warnings.extend(photo_warnings);

        let layout = compose_document(
            &self.config,
            data,
            &company,
            Decorations { logo, background },
            &figures,
        );
        let page_count = layout.page_count();

        let config = self.config.clone();
        let title = data.report_title.clone();
        let fonts = self.fonts.clone();
        let bytes = tokio::task::spawn_blocking(move || {
            render_document(&layout, &config, &title, fonts.as_deref())
        })
        .await
        .map_err(|e| AppError::Internal(format!("PDF rendering task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("PDF rendering failed: {}", e)))?;

        let now = Utc::now();
        let file_name = report_file_name(&data.contract, &now.format("%Y-%m-%d").to_string());
        tracing::info!(
            "Generated {} ({} pages, {} photos, {} warnings)",
            file_name,
            page_count,
            photos.len(),
            warnings.len()
        );

        Ok(GeneratedReport {
            bytes: Bytes::from(bytes),
            page_count,
            file_name,
            warnings,
            generated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::report_builder::models::{PhotoManager, PhotoUpload, ReportForm};
    use crate::shared::test_helpers::{company_service, png_bytes, report_pdf_service};

    #[test]
    fn test_report_file_name() {
        assert_eq!(
            report_file_name("ATLAS BH", "2025-02-01"),
            "relatorio-tecnico-ATLAS-BH-2025-02-01.pdf"
        );
        assert_eq!(
            report_file_name("", "2025-02-01"),
            "relatorio-tecnico-2025-02-01.pdf"
        );
        assert_eq!(
            report_file_name("Nº 12/2024", "2025-02-01"),
            "relatorio-tecnico-N-12-2024-2025-02-01.pdf"
        );
    }

    #[tokio::test]
    async fn test_missing_default_company_is_fatal() {
        let service = report_pdf_service(company_service());
        let form = ReportForm::new("01/02/2025");

        let err = service.generate(form.data(), &[]).await.unwrap_err();
        assert!(matches!(err, AppError::Unprocessable(_)));
    }

    #[tokio::test]
    async fn test_generate_with_missing_assets_and_bad_photo() {
        let companies = company_service();
        companies.ensure_default().await.unwrap();
        let service = report_pdf_service(companies);

        let mut photos = PhotoManager::new(20, 5 * 1024 * 1024);
        photos
            .add_batch(vec![
                PhotoUpload {
                    file_name: "ok.png".to_string(),
                    content_type: "image/png".to_string(),
                    data: Bytes::from(png_bytes(64, 48)),
                },
                PhotoUpload {
                    file_name: "broken.jpg".to_string(),
                    content_type: "image/jpeg".to_string(),
                    data: Bytes::from_static(b"not a jpeg"),
                },
                PhotoUpload {
                    file_name: "empty.png".to_string(),
                    content_type: "image/png".to_string(),
                    data: Bytes::new(),
                },
            ])
            .await
            .unwrap();

        let mut form = ReportForm::new("01/02/2025");
        form.update_fields(crate::features::report_builder::models::ReportFieldsPatch {
            contract: Some("ATLAS BH".to_string()),
            background_image_url: Some("/nao-existe/fundo.jpg".to_string()),
            ..Default::default()
        });

        let report = service
            .generate(form.data(), photos.by_figure())
            .await
            .unwrap();

        assert!(report.bytes.starts_with(b"%PDF"));
        assert!(report.page_count >= 1);
        assert!(report.file_name.starts_with("relatorio-tecnico-ATLAS-BH-"));
        // logo and background are missing from the empty assets dir, plus two bad photos
        assert_eq!(report.warnings.len(), 4);
        assert!(report.warnings.iter().any(|w| w.starts_with("Fig. 2:")));
        assert!(report.warnings.iter().any(|w| w.starts_with("Fig. 3:")));
    }
}
