use std::sync::Arc;

use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::companies::CompanyService;
use crate::features::presets::dtos::{
    CreatePresetDto, InitializePresetsDto, PresetQueryParams, PresetResponseDto, UpdatePresetDto,
};
use crate::features::presets::models::{default_presets, NewPreset, Preset, PresetKind};
use crate::features::presets::repositories::PresetRepository;

/// Contract and report template operations, parameterized by kind
pub struct PresetService {
    repository: Arc<dyn PresetRepository>,
    companies: Arc<CompanyService>,
}

impl PresetService {
    pub fn new(repository: Arc<dyn PresetRepository>, companies: Arc<CompanyService>) -> Self {
        Self {
            repository,
            companies,
        }
    }

    fn not_found(kind: PresetKind) -> AppError {
        AppError::NotFound(format!("{} not found", kind.label()))
    }

    /// Report presets belong to a company (the default one unless given);
    /// contract presets never do.
    async fn resolve_owner(&self, kind: PresetKind, company_id: Option<Uuid>) -> Result<Option<Uuid>> {
        match (kind, company_id) {
            (PresetKind::Contract, None) => Ok(None),
            (PresetKind::Contract, Some(_)) => Err(AppError::BadRequest(
                "Contract templates cannot belong to a company".to_string(),
            )),
            (PresetKind::Report, Some(id)) => {
                if !self.companies.exists(id).await? {
                    return Err(AppError::BadRequest("Company not found".to_string()));
                }
                Ok(Some(id))
            }
            (PresetKind::Report, None) => Ok(Some(self.companies.ensure_default().await?.id)),
        }
    }

    pub async fn create(&self, kind: PresetKind, dto: CreatePresetDto) -> Result<PresetResponseDto> {
        let mut preset = dto.into_new_preset();
        preset.company_id = self.resolve_owner(kind, preset.company_id).await?;

        let created = self.repository.create(kind, preset).await?;
        tracing::info!("{} {} created", kind.label(), created.id);
        Ok(created.into())
    }

    /// Domain lookup used when applying a preset to a report
    pub async fn find(&self, kind: PresetKind, id: Uuid) -> Result<Preset> {
        self.repository
            .find_by_id(kind, id)
            .await?
            .ok_or_else(|| Self::not_found(kind))
    }

    pub async fn get_by_id(&self, kind: PresetKind, id: Uuid) -> Result<PresetResponseDto> {
        Ok(self.find(kind, id).await?.into())
    }

    pub async fn list(
        &self,
        kind: PresetKind,
        params: &PresetQueryParams,
    ) -> Result<Vec<PresetResponseDto>> {
        let presets = self.repository.list(&params.to_query(kind)).await?;
        Ok(presets.into_iter().map(Into::into).collect())
    }

    pub async fn update(
        &self,
        kind: PresetKind,
        id: Uuid,
        dto: UpdatePresetDto,
    ) -> Result<PresetResponseDto> {
        let mut changes = dto.into_changes();
        if changes.company_id.is_some() {
            changes.company_id = self.resolve_owner(kind, changes.company_id).await?;
        }

        self.repository
            .update(kind, id, changes)
            .await?
            .map(Into::into)
            .ok_or_else(|| Self::not_found(kind))
    }

    pub async fn delete(&self, kind: PresetKind, id: Uuid) -> Result<()> {
        if !self.repository.delete(kind, id).await? {
            return Err(Self::not_found(kind));
        }
        tracing::info!("{} {} deleted", kind.label(), id);
        Ok(())
    }

    pub async fn record_usage(&self, kind: PresetKind, id: Uuid) -> Result<Preset> {
        self.repository
            .record_usage(kind, id)
            .await?
            .ok_or_else(|| Self::not_found(kind))
    }

    /// Save an already validated preset (used by report sessions)
    pub async fn save(&self, kind: PresetKind, mut preset: NewPreset) -> Result<PresetResponseDto> {
        preset.company_id = self.resolve_owner(kind, preset.company_id).await?;
        let created = self.repository.create(kind, preset).await?;
        tracing::info!("{} {} saved from report session", kind.label(), created.id);
        Ok(created.into())
    }

    /// Seed the default presets when the store of this kind is empty
    pub async fn initialize(&self, kind: PresetKind) -> Result<InitializePresetsDto> {
        let existing = self.repository.count(kind).await?;
        if existing > 0 {
            return Ok(InitializePresetsDto {
                created: 0,
                total: existing,
            });
        }

        let owner = match kind {
            PresetKind::Report => Some(self.companies.ensure_default().await?.id),
            PresetKind::Contract => None,
        };

        let defaults = default_presets();
        let created = defaults.len();
        for mut preset in defaults {
            preset.company_id = owner;
            self.repository.create(kind, preset).await?;
        }

        tracing::info!("Seeded {} default {}s", created, kind.label().to_lowercase());
        Ok(InitializePresetsDto {
            created,
            total: self.repository.count(kind).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::presets::dtos::PresetFilter;
    use crate::shared::test_helpers::preset_service;

    #[tokio::test]
    async fn test_initialize_seeds_once() {
        let service = preset_service();

        let first = service.initialize(PresetKind::Contract).await.unwrap();
        assert_eq!(first.created, 3);
        assert_eq!(first.total, 3);

        let second = service.initialize(PresetKind::Contract).await.unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.total, 3);

        // Stores are independent
        let reports = service.initialize(PresetKind::Report).await.unwrap();
        assert_eq!(reports.created, 3);
    }

    #[tokio::test]
    async fn test_report_presets_attach_default_company() {
        let service = preset_service();
        service.initialize(PresetKind::Report).await.unwrap();

        let presets = service
            .list(PresetKind::Report, &PresetQueryParams::default())
            .await
            .unwrap();
        assert!(presets.iter().all(|p| p.company_id.is_some()));

        let contracts = {
            service.initialize(PresetKind::Contract).await.unwrap();
            service
                .list(PresetKind::Contract, &PresetQueryParams::default())
                .await
                .unwrap()
        };
        assert!(contracts.iter().all(|p| p.company_id.is_none()));
    }

    #[tokio::test]
    async fn test_search_atlas_is_case_insensitive() {
        let service = preset_service();
        service.initialize(PresetKind::Contract).await.unwrap();

        let params = PresetQueryParams {
            termo: Some("atlas".to_string()),
            ..Default::default()
        };
        let names: Vec<String> = service
            .list(PresetKind::Contract, &params)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();

        assert_eq!(names.len(), 2);
        assert!(names.contains(&"ATLAS BH - Instalação Tomadas".to_string()));
        assert!(names.contains(&"ATLAS BH - Manutenção Elétrica".to_string()));
    }

    #[tokio::test]
    async fn test_most_used_ordering() {
        let service = preset_service();
        service.initialize(PresetKind::Contract).await.unwrap();

        let all = service
            .list(PresetKind::Contract, &PresetQueryParams::default())
            .await
            .unwrap();
        let abc = all.iter().find(|p| p.name.starts_with("Empresa ABC")).unwrap().id;
        let tomadas = all.iter().find(|p| p.name.ends_with("Tomadas")).unwrap().id;

        for _ in 0..3 {
            service.record_usage(PresetKind::Contract, abc).await.unwrap();
        }
        service.record_usage(PresetKind::Contract, tomadas).await.unwrap();

        let params = PresetQueryParams {
            filtro: Some(PresetFilter::MostUsed),
            limite: Some(2),
            ..Default::default()
        };
        let top = service.list(PresetKind::Contract, &params).await.unwrap();

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].id, abc);
        assert_eq!(top[0].usage_count, 3);
        assert_eq!(top[1].id, tomadas);
    }

    #[tokio::test]
    async fn test_kinds_do_not_leak() {
        let service = preset_service();
        service.initialize(PresetKind::Contract).await.unwrap();
        let contract = service
            .list(PresetKind::Contract, &PresetQueryParams::default())
            .await
            .unwrap()
            .remove(0);

        let err = service
            .get_by_id(PresetKind::Report, contract.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_replaces_items() {
        let service = preset_service();
        service.initialize(PresetKind::Contract).await.unwrap();
        let preset = service
            .list(PresetKind::Contract, &PresetQueryParams::default())
            .await
            .unwrap()
            .remove(0);

        let updated = service
            .update(
                PresetKind::Contract,
                preset.id,
                UpdatePresetDto {
                    name: Some("Renomeado".to_string()),
                    items: Some(vec![crate::features::presets::dtos::PresetItemInput {
                        description: "Único item".to_string(),
                        position: None,
                    }]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Renomeado");
        assert_eq!(updated.contract, preset.contract);
        assert_eq!(updated.items.len(), 1);
        assert_eq!(updated.items[0].description, "Único item");
    }

    #[tokio::test]
    async fn test_contract_preset_rejects_company() {
        let service = preset_service();
        let err = service
            .save(
                PresetKind::Contract,
                NewPreset {
                    name: "x".to_string(),
                    company_id: Some(Uuid::new_v4()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
