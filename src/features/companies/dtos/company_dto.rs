use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::features::companies::models::{Company, CompanyChanges, NewCompany};
use crate::features::presets::models::Preset;
use crate::shared::validation::CNPJ_REGEX;

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct CompanyQueryParams {
    /// CNPJ, with or without punctuation
    pub cnpj: Option<String>,
}

// Create request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCompanyDto {
    #[validate(length(min = 1, max = 255, message = "legal name is required"))]
    pub legal_name: String,

    #[validate(regex(path = *CNPJ_REGEX, message = "tax id must be a valid CNPJ (e.g. 37.097.718/0001-58)"))]
    pub tax_id: String,

    pub logo_url: Option<String>,
}

impl From<CreateCompanyDto> for NewCompany {
    fn from(dto: CreateCompanyDto) -> Self {
        Self {
            legal_name: dto.legal_name.trim().to_string(),
            tax_id: dto.tax_id.trim().to_string(),
            logo_url: dto.logo_url.filter(|url| !url.trim().is_empty()),
        }
    }
}

// Update request
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCompanyDto {
    #[validate(length(min = 1, max = 255))]
    pub legal_name: Option<String>,

    #[validate(regex(path = *CNPJ_REGEX, message = "tax id must be a valid CNPJ (e.g. 37.097.718/0001-58)"))]
    pub tax_id: Option<String>,

    pub logo_url: Option<String>,
}

impl From<UpdateCompanyDto> for CompanyChanges {
    fn from(dto: UpdateCompanyDto) -> Self {
        Self {
            legal_name: dto.legal_name.map(|name| name.trim().to_string()),
            tax_id: dto.tax_id.map(|tax_id| tax_id.trim().to_string()),
            logo_url: dto.logo_url,
        }
    }
}

/// Report template as listed under its company
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportTemplateSummaryDto {
    pub id: Uuid,
    pub name: String,
    pub contract: String,
    pub initial_value: String,
    pub requisition: String,
    pub service_order: String,
    pub purchase_order: String,
    pub scope_description: String,
    pub background_image_url: Option<String>,
    pub usage_count: i32,
    pub last_used_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<Preset> for ReportTemplateSummaryDto {
    fn from(p: Preset) -> Self {
        Self {
            id: p.id,
            name: p.name,
            contract: p.contract,
            initial_value: p.initial_value,
            requisition: p.requisition,
            service_order: p.service_order,
            purchase_order: p.purchase_order,
            scope_description: p.scope_description,
            background_image_url: p.background_image_url,
            usage_count: p.usage_count,
            last_used_at: p.last_used_at,
            created_at: p.created_at,
        }
    }
}

// Response DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CompanyResponseDto {
    pub id: Uuid,
    pub legal_name: String,
    pub tax_id: String,
    pub logo_url: Option<String>,
    /// Report templates owned by this company, most recently used first
    pub report_templates: Vec<ReportTemplateSummaryDto>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CompanyResponseDto {
    pub fn new(company: Company, templates: Vec<Preset>) -> Self {
        Self {
            id: company.id,
            legal_name: company.legal_name,
            tax_id: company.tax_id,
            logo_url: company.logo_url,
            report_templates: templates.into_iter().map(Into::into).collect(),
            created_at: company.created_at,
            updated_at: company.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_dto_validates_cnpj() {
        let dto = CreateCompanyDto {
            legal_name: "GM MANUTENÇÕES LTDA".to_string(),
            tax_id: "37.097.718/0001-58".to_string(),
            logo_url: None,
        };
        assert!(dto.validate().is_ok());

        let dto = CreateCompanyDto {
            tax_id: "123".to_string(),
            ..dto
        };
        assert!(dto.validate().unwrap_err().errors().contains_key("tax_id"));
    }

    #[test]
    fn test_blank_logo_dropped() {
        let company: NewCompany = CreateCompanyDto {
            legal_name: " ACME ".to_string(),
            tax_id: "37097718000158".to_string(),
            logo_url: Some("  ".to_string()),
        }
        .into();
        assert_eq!(company.legal_name, "ACME");
        assert!(company.logo_url.is_none());
    }
}
