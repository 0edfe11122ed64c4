use utoipa::{Modify, OpenApi};

use crate::features::companies::{dtos as companies_dtos, handlers as companies_handlers};
use crate::features::presets::{
    dtos as presets_dtos, handlers as presets_handlers, models as presets_models,
};
use crate::features::report_builder::{
    dtos as report_builder_dtos, handlers as report_builder_handlers,
};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Companies
        companies_handlers::list_companies,
        companies_handlers::create_company,
        companies_handlers::get_company,
        companies_handlers::update_company,
        companies_handlers::delete_company,
        companies_handlers::find_company_by_tax_id,
        companies_handlers::initialize_default_company,
        // Contract and report templates
        presets_handlers::list_presets,
        presets_handlers::create_preset,
        presets_handlers::get_preset,
        presets_handlers::update_preset,
        presets_handlers::delete_preset,
        presets_handlers::record_preset_usage,
        presets_handlers::initialize_presets,
        // Report sessions
        report_builder_handlers::create_session,
        report_builder_handlers::get_session,
        report_builder_handlers::delete_session,
        report_builder_handlers::update_fields,
        report_builder_handlers::add_item,
        report_builder_handlers::update_item,
        report_builder_handlers::remove_item,
        report_builder_handlers::upload_photos,
        report_builder_handlers::remove_photo,
        report_builder_handlers::link_photo,
        report_builder_handlers::unlink_photo,
        report_builder_handlers::apply_preset,
        report_builder_handlers::save_as_preset,
        report_builder_handlers::generate_pdf,
        report_builder_handlers::get_preview,
        report_builder_handlers::release_preview,
    ),
    components(
        schemas(
            Meta,
            // Companies
            companies_dtos::CompanyQueryParams,
            companies_dtos::CreateCompanyDto,
            companies_dtos::UpdateCompanyDto,
            companies_dtos::ReportTemplateSummaryDto,
            companies_dtos::CompanyResponseDto,
            ApiResponse<companies_dtos::CompanyResponseDto>,
            ApiResponse<Vec<companies_dtos::CompanyResponseDto>>,
            // Templates
            presets_models::PresetKind,
            presets_dtos::PresetFilter,
            presets_dtos::PresetQueryParams,
            presets_dtos::PresetItemInput,
            presets_dtos::CreatePresetDto,
            presets_dtos::UpdatePresetDto,
            presets_dtos::PresetItemDto,
            presets_dtos::PresetResponseDto,
            presets_dtos::InitializePresetsDto,
            ApiResponse<presets_dtos::PresetResponseDto>,
            ApiResponse<Vec<presets_dtos::PresetResponseDto>>,
            ApiResponse<presets_dtos::InitializePresetsDto>,
            // Report sessions
            report_builder_dtos::TechnicalItemDto,
            report_builder_dtos::ReportDataDto,
            report_builder_dtos::PhotoDto,
            report_builder_dtos::RejectedPhotoDto,
            report_builder_dtos::PhotoBatchResultDto,
            report_builder_dtos::PreviewDto,
            report_builder_dtos::ReportSessionDto,
            report_builder_dtos::UpdateReportFieldsDto,
            report_builder_dtos::ItemDescriptionDto,
            report_builder_dtos::LinkPhotoDto,
            report_builder_dtos::ApplyPresetDto,
            report_builder_dtos::SaveAsPresetDto,
            report_builder_dtos::PhotoUploadForm,
            ApiResponse<report_builder_dtos::ReportSessionDto>,
            ApiResponse<report_builder_dtos::PhotoBatchResultDto>,
        )
    ),
    tags(
        (name = "companies", description = "Issuing companies (CNPJ, legal name, logo)"),
        (name = "templates", description = "Contract templates (/api/contratos) and report templates (/api/relatorios)"),
        (name = "report-sessions", description = "Technical report editing, photos and PDF generation"),
    ),
    info(
        title = "GM-App API",
        version = "0.1.0",
        description = "API documentation for GM-App",
    )
)]
pub struct ApiDoc;

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_every_feature() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        assert!(paths.iter().any(|p| p.as_str() == "/api/empresas"));
        assert!(paths.iter().any(|p| p.as_str() == "/api/{kind}/{id}"));
        assert!(paths
            .iter()
            .any(|p| p.as_str() == "/api/relatorio-tecnico/sessoes/{id}/pdf"));
    }

    #[test]
    fn test_info_modifier_overrides_title() {
        let mut doc = ApiDoc::openapi();
        SwaggerInfoModifier {
            title: "Custom".to_string(),
            version: "9.9.9".to_string(),
            description: "desc".to_string(),
        }
        .modify(&mut doc);

        assert_eq!(doc.info.title, "Custom");
        assert_eq!(doc.info.version, "9.9.9");
    }
}
