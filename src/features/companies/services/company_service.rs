use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::companies::dtos::{CompanyResponseDto, CreateCompanyDto, UpdateCompanyDto};
use crate::features::companies::models::{Company, NewCompany};
use crate::features::companies::repositories::CompanyRepository;
use crate::features::presets::models::Preset;
use crate::features::presets::repositories::PresetRepository;
use crate::shared::validation::normalize_cnpj;

/// Company used when a report does not name one
#[derive(Debug, Clone)]
pub struct DefaultCompany {
    pub legal_name: String,
    pub tax_id: String,
    pub logo_url: Option<String>,
}

pub struct CompanyService {
    repository: Arc<dyn CompanyRepository>,
    presets: Arc<dyn PresetRepository>,
    default_company: DefaultCompany,
}

impl CompanyService {
    pub fn new(
        repository: Arc<dyn CompanyRepository>,
        presets: Arc<dyn PresetRepository>,
        default_company: DefaultCompany,
    ) -> Self {
        Self {
            repository,
            presets,
            default_company,
        }
    }

    pub fn default_tax_id(&self) -> &str {
        &self.default_company.tax_id
    }

    async fn with_templates(&self, company: Company) -> Result<CompanyResponseDto> {
        let templates = self.presets.list_for_companies(&[company.id]).await?;
        Ok(CompanyResponseDto::new(company, templates))
    }

    /// Create a company; CNPJ must be unique ignoring punctuation
    pub async fn create(&self, dto: CreateCompanyDto) -> Result<CompanyResponseDto> {
        if self.repository.find_by_tax_id(&dto.tax_id).await?.is_some() {
            return Err(AppError::Conflict(
                "A company with this CNPJ already exists.".to_string(),
            ));
        }

        let company = self.repository.create(NewCompany::from(dto)).await?;
        tracing::info!("Company {} created ({})", company.id, company.tax_id);
        Ok(CompanyResponseDto::new(company, Vec::new()))
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<CompanyResponseDto> {
        let company = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Company not found".to_string()))?;

        self.with_templates(company).await
    }

    pub async fn get_by_tax_id(&self, tax_id: &str) -> Result<CompanyResponseDto> {
        if normalize_cnpj(tax_id).is_empty() {
            return Err(AppError::BadRequest("CNPJ is required".to_string()));
        }

        let company = self
            .repository
            .find_by_tax_id(tax_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Company not found".to_string()))?;

        self.with_templates(company).await
    }

    /// All companies, or only the one matching `tax_id` when given
    pub async fn list(&self, tax_id: Option<&str>) -> Result<Vec<CompanyResponseDto>> {
        let companies = match tax_id.filter(|t| !normalize_cnpj(t).is_empty()) {
            Some(tax_id) => self
                .repository
                .find_by_tax_id(tax_id)
                .await?
                .into_iter()
                .collect(),
            None => self.repository.list().await?,
        };

        let ids: Vec<Uuid> = companies.iter().map(|c| c.id).collect();
        let mut templates: HashMap<Uuid, Vec<Preset>> = HashMap::new();
        for preset in self.presets.list_for_companies(&ids).await? {
            if let Some(company_id) = preset.company_id {
                templates.entry(company_id).or_default().push(preset);
            }
        }

        Ok(companies
            .into_iter()
            .map(|company| {
                let owned = templates.remove(&company.id).unwrap_or_default();
                CompanyResponseDto::new(company, owned)
            })
            .collect())
    }

    pub async fn update(&self, id: Uuid, dto: UpdateCompanyDto) -> Result<CompanyResponseDto> {
        if let Some(tax_id) = &dto.tax_id {
            if let Some(existing) = self.repository.find_by_tax_id(tax_id).await? {
                if existing.id != id {
                    return Err(AppError::Conflict(
                        "A company with this CNPJ already exists.".to_string(),
                    ));
                }
            }
        }

        let company = self
            .repository
            .update(id, dto.into())
            .await?
            .ok_or_else(|| AppError::NotFound("Company not found".to_string()))?;

        self.with_templates(company).await
    }

    /// Delete a company; rejected while it still owns report templates
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        if self.repository.find_by_id(id).await?.is_none() {
            return Err(AppError::NotFound("Company not found".to_string()));
        }

        if !self.presets.list_for_companies(&[id]).await?.is_empty() {
            return Err(AppError::Conflict(
                "Company still has report templates. Remove them first.".to_string(),
            ));
        }

        if !self.repository.delete(id).await? {
            return Err(AppError::NotFound("Company not found".to_string()));
        }

        tracing::info!("Company {} deleted", id);
        Ok(())
    }

    /// Return the default company, creating it on first use
    pub async fn ensure_default(&self) -> Result<Company> {
        if let Some(company) = self
            .repository
            .find_by_tax_id(&self.default_company.tax_id)
            .await?
        {
            return Ok(company);
        }

        let company = self
            .repository
            .create(NewCompany {
                legal_name: self.default_company.legal_name.clone(),
                tax_id: self.default_company.tax_id.clone(),
                logo_url: self.default_company.logo_url.clone(),
            })
            .await?;

        tracing::info!(
            "Default company {} seeded ({})",
            company.id,
            company.tax_id
        );
        Ok(company)
    }

    pub async fn initialize_default(&self) -> Result<CompanyResponseDto> {
        let company = self.ensure_default().await?;
        self.with_templates(company).await
    }

    /// Issuer for a report: the explicit company, or the default one
    pub async fn resolve_issuer(&self, company_id: Option<Uuid>) -> Result<Option<Company>> {
        match company_id {
            Some(id) => self.repository.find_by_id(id).await,
            None => {
                self.repository
                    .find_by_tax_id(&self.default_company.tax_id)
                    .await
            }
        }
    }

    pub async fn exists(&self, id: Uuid) -> Result<bool> {
        Ok(self.repository.find_by_id(id).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::presets::models::{NewPreset, PresetKind};
    use crate::shared::test_helpers::{
        default_company, InMemoryCompanyRepository, InMemoryPresetRepository,
    };

    fn service() -> (CompanyService, Arc<InMemoryPresetRepository>) {
        let presets = Arc::new(InMemoryPresetRepository::default());
        let service = CompanyService::new(
            Arc::new(InMemoryCompanyRepository::default()),
            presets.clone(),
            default_company(),
        );
        (service, presets)
    }

    fn create_dto(tax_id: &str) -> CreateCompanyDto {
        CreateCompanyDto {
            legal_name: "ACME SERVIÇOS".to_string(),
            tax_id: tax_id.to_string(),
            logo_url: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_cnpj_conflicts_ignoring_punctuation() {
        let (service, _) = service();
        service.create(create_dto("12.345.678/0001-90")).await.unwrap();

        let err = service.create(create_dto("12345678000190")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_lookup_by_tax_id() {
        let (service, _) = service();
        let created = service.create(create_dto("12.345.678/0001-90")).await.unwrap();

        let found = service.get_by_tax_id("12345678000190").await.unwrap();
        assert_eq!(found.id, created.id);

        assert!(matches!(
            service.get_by_tax_id("99.999.999/9999-99").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.get_by_tax_id("   ").await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_ensure_default_is_idempotent() {
        let (service, _) = service();
        let first = service.ensure_default().await.unwrap();
        let second = service.ensure_default().await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.tax_id, "37.097.718/0001-58");
        assert_eq!(service.list(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_blocked_by_templates() {
        let (service, presets) = service();
        let company = service.ensure_default().await.unwrap();
        presets
            .create(
                PresetKind::Report,
                NewPreset {
                    name: "Modelo".to_string(),
                    company_id: Some(company.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let detail = service.get_by_id(company.id).await.unwrap();
        assert_eq!(detail.report_templates.len(), 1);

        let err = service.delete(company.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_resolve_issuer_falls_back_to_default() {
        let (service, _) = service();
        assert!(service.resolve_issuer(None).await.unwrap().is_none());

        let company = service.ensure_default().await.unwrap();
        assert_eq!(service.resolve_issuer(None).await.unwrap(), Some(company));
        assert!(service
            .resolve_issuer(Some(Uuid::new_v4()))
            .await
            .unwrap()
            .is_none());
    }
}
