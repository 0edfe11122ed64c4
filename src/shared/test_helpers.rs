//! In-memory repositories and service builders for unit and router tests.

#![cfg(test)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::companies::models::{Company, CompanyChanges, NewCompany};
use crate::features::companies::repositories::CompanyRepository;
use crate::features::companies::{CompanyService, DefaultCompany};
use crate::features::presets::models::{
    NewPreset, Preset, PresetChanges, PresetKind, PresetListQuery, PresetOrder,
};
use crate::features::presets::repositories::PresetRepository;
use crate::features::presets::PresetService;
use crate::features::report_builder::services::{
    ReportPdfService, ReportSessionService, SessionLimits,
};
use crate::modules::assets::AssetLoader;
use crate::modules::pdf::PdfConfig;
use crate::shared::validation::normalize_cnpj;

pub fn default_company() -> DefaultCompany {
    DefaultCompany {
        legal_name: "GM MANUTENÇÕES LTDA".to_string(),
        tax_id: "37.097.718/0001-58".to_string(),
        logo_url: Some("/relatorio-tecnico/logo.png".to_string()),
    }
}

#[derive(Default)]
pub struct InMemoryCompanyRepository {
    companies: Mutex<Vec<Company>>,
}

#[async_trait]
impl CompanyRepository for InMemoryCompanyRepository {
    async fn create(&self, company: NewCompany) -> Result<Company> {
        let mut companies = self.companies.lock().unwrap();
        let normalized = normalize_cnpj(&company.tax_id);
        if companies
            .iter()
            .any(|c| normalize_cnpj(&c.tax_id) == normalized)
        {
            return Err(AppError::Conflict(
                "A company with this CNPJ already exists.".to_string(),
            ));
        }

        let now = Utc::now();
        let created = Company {
            id: Uuid::new_v4(),
            legal_name: company.legal_name,
            tax_id: company.tax_id,
            logo_url: company.logo_url,
            created_at: now,
            updated_at: now,
        };
        companies.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Company>> {
        let companies = self.companies.lock().unwrap();
        Ok(companies.iter().find(|c| c.id == id).cloned())
    }

    async fn find_by_tax_id(&self, tax_id: &str) -> Result<Option<Company>> {
        let normalized = normalize_cnpj(tax_id);
        let companies = self.companies.lock().unwrap();
        Ok(companies
            .iter()
            .find(|c| normalize_cnpj(&c.tax_id) == normalized)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Company>> {
        let mut companies = self.companies.lock().unwrap().clone();
        companies.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(companies)
    }

    async fn update(&self, id: Uuid, changes: CompanyChanges) -> Result<Option<Company>> {
        let mut companies = self.companies.lock().unwrap();
        let Some(company) = companies.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };

        if let Some(legal_name) = changes.legal_name {
            company.legal_name = legal_name;
        }
        if let Some(tax_id) = changes.tax_id {
            company.tax_id = tax_id;
        }
        if let Some(logo_url) = changes.logo_url {
            company.logo_url = Some(logo_url);
        }
        company.updated_at = Utc::now();
        Ok(Some(company.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut companies = self.companies.lock().unwrap();
        let before = companies.len();
        companies.retain(|c| c.id != id);
        Ok(companies.len() != before)
    }
}

/// Presets kept in insertion order; the index breaks timestamp ties
#[derive(Default)]
pub struct InMemoryPresetRepository {
    presets: Mutex<Vec<Preset>>,
}

impl InMemoryPresetRepository {
    fn sorted(presets: &[Preset], order: PresetOrder) -> Vec<Preset> {
        let mut indexed: Vec<(usize, &Preset)> = presets.iter().enumerate().collect();
        indexed.sort_by(|(ia, a), (ib, b)| {
            let primary = match order {
                PresetOrder::LastUsed => b.last_used_at.cmp(&a.last_used_at),
                PresetOrder::MostUsed => b
                    .usage_count
                    .cmp(&a.usage_count)
                    .then(b.last_used_at.cmp(&a.last_used_at)),
            };
            primary.then(ia.cmp(ib))
        });
        indexed.into_iter().map(|(_, p)| p.clone()).collect()
    }
}

#[async_trait]
impl PresetRepository for InMemoryPresetRepository {
    async fn create(&self, kind: PresetKind, preset: NewPreset) -> Result<Preset> {
        if kind == PresetKind::Contract && preset.company_id.is_some() {
            return Err(AppError::BadRequest(
                "Only report templates can belong to a company.".to_string(),
            ));
        }

        let now = Utc::now();
        let created = Preset {
            id: Uuid::new_v4(),
            kind,
            name: preset.name,
            contract: preset.contract,
            initial_value: preset.initial_value,
            requisition: preset.requisition,
            service_order: preset.service_order,
            purchase_order: preset.purchase_order,
            scope_description: preset.scope_description,
            background_image_url: preset.background_image_url,
            company_id: preset.company_id,
            items: preset.items,
            usage_count: 0,
            last_used_at: now,
            created_at: now,
            updated_at: now,
        };
        self.presets.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, kind: PresetKind, id: Uuid) -> Result<Option<Preset>> {
        let presets = self.presets.lock().unwrap();
        Ok(presets
            .iter()
            .find(|p| p.kind == kind && p.id == id)
            .cloned())
    }

    async fn list(&self, query: &PresetListQuery) -> Result<Vec<Preset>> {
        let presets = self.presets.lock().unwrap();
        let term = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());

        let filtered: Vec<Preset> = presets
            .iter()
            .filter(|p| p.kind == query.kind)
            .filter(|p| query.company_id.is_none() || p.company_id == query.company_id)
            .filter(|p| term.map_or(true, |t| p.matches(t)))
            .cloned()
            .collect();

        let mut sorted = Self::sorted(&filtered, query.order);
        if let Some(limit) = query.limit {
            sorted.truncate(limit.max(0) as usize);
        }
        Ok(sorted)
    }

    async fn update(
        &self,
        kind: PresetKind,
        id: Uuid,
        changes: PresetChanges,
    ) -> Result<Option<Preset>> {
        let mut presets = self.presets.lock().unwrap();
        let Some(preset) = presets.iter_mut().find(|p| p.kind == kind && p.id == id) else {
            return Ok(None);
        };

        let PresetChanges {
            name,
            contract,
            initial_value,
            requisition,
            service_order,
            purchase_order,
            scope_description,
            background_image_url,
            company_id,
            items,
        } = changes;

        if let Some(v) = name {
            preset.name = v;
        }
        if let Some(v) = contract {
            preset.contract = v;
        }
        if let Some(v) = initial_value {
            preset.initial_value = v;
        }
        if let Some(v) = requisition {
            preset.requisition = v;
        }
        if let Some(v) = service_order {
            preset.service_order = v;
        }
        if let Some(v) = purchase_order {
            preset.purchase_order = v;
        }
        if let Some(v) = scope_description {
            preset.scope_description = v;
        }
        if let Some(v) = background_image_url {
            preset.background_image_url = Some(v);
        }
        if let Some(v) = company_id {
            preset.company_id = Some(v);
        }
        if let Some(v) = items {
            preset.items = v;
        }
        preset.updated_at = Utc::now();
        Ok(Some(preset.clone()))
    }

    async fn delete(&self, kind: PresetKind, id: Uuid) -> Result<bool> {
        let mut presets = self.presets.lock().unwrap();
        let before = presets.len();
        presets.retain(|p| !(p.kind == kind && p.id == id));
        Ok(presets.len() != before)
    }

    async fn record_usage(&self, kind: PresetKind, id: Uuid) -> Result<Option<Preset>> {
        let mut presets = self.presets.lock().unwrap();
        let Some(preset) = presets.iter_mut().find(|p| p.kind == kind && p.id == id) else {
            return Ok(None);
        };
        preset.usage_count += 1;
        preset.last_used_at = Utc::now();
        Ok(Some(preset.clone()))
    }

    async fn count(&self, kind: PresetKind) -> Result<i64> {
        let presets = self.presets.lock().unwrap();
        Ok(presets.iter().filter(|p| p.kind == kind).count() as i64)
    }

    async fn list_for_companies(&self, company_ids: &[Uuid]) -> Result<Vec<Preset>> {
        let presets = self.presets.lock().unwrap();
        let owned: Vec<Preset> = presets
            .iter()
            .filter(|p| p.kind == PresetKind::Report)
            .filter(|p| p.company_id.is_some_and(|id| company_ids.contains(&id)))
            .cloned()
            .collect();
        Ok(Self::sorted(&owned, PresetOrder::LastUsed))
    }
}

/// Company and preset services sharing one in-memory preset store
pub fn services() -> (Arc<CompanyService>, Arc<PresetService>) {
    let presets: Arc<dyn PresetRepository> = Arc::new(InMemoryPresetRepository::default());
    let companies = Arc::new(CompanyService::new(
        Arc::new(InMemoryCompanyRepository::default()),
        presets.clone(),
        default_company(),
    ));
    let preset_service = Arc::new(PresetService::new(presets, companies.clone()));
    (companies, preset_service)
}

pub fn company_service() -> Arc<CompanyService> {
    services().0
}

pub fn preset_service() -> Arc<PresetService> {
    services().1
}

/// PDF service reading assets from an empty, nonexistent directory
pub fn report_pdf_service(companies: Arc<CompanyService>) -> ReportPdfService {
    let assets_dir = std::env::temp_dir().join(format!("gm-app-assets-{}", Uuid::new_v4()));
    let assets = AssetLoader::new(assets_dir, std::time::Duration::from_secs(1)).unwrap();
    ReportPdfService::new(companies, Arc::new(assets), PdfConfig::default(), None)
}

pub struct SessionFixture {
    pub sessions: Arc<ReportSessionService>,
    pub presets: Arc<PresetService>,
    pub companies: Arc<CompanyService>,
}

pub fn session_service_with(limits: SessionLimits) -> SessionFixture {
    let (companies, presets) = services();
    let pdf = Arc::new(report_pdf_service(companies.clone()));
    SessionFixture {
        sessions: Arc::new(ReportSessionService::new(presets.clone(), pdf, limits)),
        presets,
        companies,
    }
}

/// Encoded PNG of the given size
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        width,
        height,
        image::Rgb([200, 30, 30]),
    ));
    let mut bytes = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, image::ImageFormat::Png)
        .unwrap();
    bytes.into_inner()
}
