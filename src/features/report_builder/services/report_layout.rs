//! Turns report data into a paginated layout.
//!
//! Everything here is synchronous and free of I/O; assets and photos arrive
//! already decoded.

use std::sync::Arc;

use image::DynamicImage;
use uuid::Uuid;

use crate::features::companies::models::Company;
use crate::features::report_builder::models::ReportData;
use crate::modules::pdf::text::line_height;
use crate::modules::pdf::{fit_within, DocumentLayout, FontWeight, LayoutBuilder, PdfConfig};

/// Photos are sized as if printed at 96 DPI, then only ever scaled down
const MM_PER_PIXEL: f32 = 25.4 / 96.0;

#[derive(Debug, Clone)]
pub enum PhotoContent {
    Image(Arc<DynamicImage>),
    /// Stored without any bytes
    Missing,
    /// Bytes that do not decode as an image
    Unreadable,
}

#[derive(Debug, Clone)]
pub struct PhotoFigure {
    pub figure: u32,
    pub linked_item: Option<Uuid>,
    pub content: PhotoContent,
}

/// Decorations resolved before layout; either may be absent
#[derive(Debug, Clone, Default)]
pub struct Decorations {
    pub logo: Option<Arc<DynamicImage>>,
    pub background: Option<Arc<DynamicImage>>,
}

fn contract_block(data: &ReportData) -> String {
    format!(
        "Contrato: {}\nValor Inicial: {}\nRQ: {}\nOS: {}\nPedido: {}",
        data.contract, data.initial_value, data.requisition, data.service_order, data.purchase_order
    )
}

fn technical_block(data: &ReportData, photos: &[PhotoFigure]) -> String {
    let mut body = String::new();
    for (index, item) in data.items.iter().enumerate() {
        body.push_str(&format!("{}. {}\n", index + 1, item.description));
        for photo in photos.iter().filter(|p| p.linked_item == Some(item.id)) {
            body.push_str(&format!("   Fig. {}: [Foto vinculada]\n", photo.figure));
        }
        body.push('\n');
    }
    body
}

fn author_block(data: &ReportData) -> String {
    format!(
        "Nome: {}\nCargo 1: {}\nCargo 2: {}\nData: {}",
        data.author_name, data.author_primary_role, data.author_secondary_role, data.prepared_on
    )
}

fn footer_block(data: &ReportData, company: &Company) -> String {
    format!(
        "{}\nCNPJ: {}\nTelefone: {}\nEmail: {}\nInstagram: {}",
        company.legal_name, company.tax_id, data.phone, data.email, data.instagram
    )
}

/// Lay out a technical report. `photos` must be in figure order.
pub fn compose_document(
    config: &PdfConfig,
    data: &ReportData,
    company: &Company,
    decorations: Decorations,
    photos: &[PhotoFigure],
) -> DocumentLayout {
    let sizes = config.font_sizes;
    let mut builder = LayoutBuilder::new(config.clone(), decorations.background);

    // Header
    if let Some(logo) = decorations.logo {
        if logo.width() > 0 {
            let height = config.logo_width * logo.height() as f32 / logo.width() as f32;
            builder.image(logo, config.logo_width, height);
            builder.advance(5.0);
        }
    }
    builder.text(&data.report_title.to_uppercase(), sizes.title, FontWeight::Bold);
    builder.advance(5.0);
    builder.text(&company.legal_name, sizes.subtitle, FontWeight::Bold);
    builder.text(
        &format!("CNPJ: {}", company.tax_id),
        sizes.normal,
        FontWeight::Regular,
    );
    builder.advance(10.0);
    builder.rule();
    builder.advance(5.0);

    builder.section("DADOS DO CONTRATO", &contract_block(data));
    builder.section("ESCOPO", &data.scope_description);
    builder.section("DESCRIÇÃO TÉCNICA", &technical_block(data, photos));

    if !photos.is_empty() {
        builder.section("FOTOS DO SERVIÇO", "");
    }

    let caption_height = line_height(sizes.small);
    for photo in photos {
        match &photo.content {
            PhotoContent::Image(image) => {
                let (width, height) = fit_within(
                    image.width() as f32 * MM_PER_PIXEL,
                    image.height() as f32 * MM_PER_PIXEL,
                    config.content_width(),
                    config.max_photo_height,
                );
                builder.ensure_space(config.min_photo_block.max(caption_height + height));
                builder.text(
                    &format!("Fig. {}", photo.figure),
                    sizes.small,
                    FontWeight::Regular,
                );
                builder.image(Arc::clone(image), width, height);
            }
            PhotoContent::Missing => {
                builder.text(
                    &format!("Fig. {}: [Foto sem dados]", photo.figure),
                    sizes.small,
                    FontWeight::Regular,
                );
            }
            PhotoContent::Unreadable => {
                builder.text(
                    &format!("Fig. {}: [Erro ao carregar imagem]", photo.figure),
                    sizes.small,
                    FontWeight::Regular,
                );
            }
        }
        builder.advance(config.photo_gap);
    }

    builder.ensure_space(config.min_photo_block);
    builder.section("ELABORADO POR", &author_block(data));

    builder.finish(&footer_block(data, company), sizes.small)
}
