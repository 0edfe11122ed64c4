use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::features::presets::models::{
    NewPreset, Preset, PresetChanges, PresetKind, PresetListQuery, PresetOrder,
};
use crate::shared::constants::{DEFAULT_PRESET_LIMIT, MAX_PRESET_LIMIT};

/// Listing shortcut filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
pub enum PresetFilter {
    /// Highest usage count first
    #[serde(rename = "maisUsados")]
    MostUsed,
    /// Most recently used first
    #[serde(rename = "recentes")]
    Recent,
}

// Query params for listing presets
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct PresetQueryParams {
    /// Case-insensitive search in name, contract, RQ, OS and purchase order (takes precedence over `filtro`)
    pub termo: Option<String>,

    /// `maisUsados` or `recentes`
    pub filtro: Option<PresetFilter>,

    /// Result limit for `filtro` listings (default 5, max 50)
    #[param(minimum = 1, maximum = 50)]
    pub limite: Option<i64>,

    /// Only report templates of this company
    pub empresa_id: Option<Uuid>,
}

impl PresetQueryParams {
    pub fn to_query(&self, kind: PresetKind) -> PresetListQuery {
        let limit = self.limite.map(|l| l.clamp(1, MAX_PRESET_LIMIT));
        let company_id = match kind {
            PresetKind::Report => self.empresa_id,
            PresetKind::Contract => None,
        };

        if let Some(term) = self.termo.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            return PresetListQuery {
                kind,
                search: Some(term.to_string()),
                order: PresetOrder::LastUsed,
                limit,
                company_id,
            };
        }

        let (order, limit) = match self.filtro {
            Some(PresetFilter::MostUsed) => (
                PresetOrder::MostUsed,
                Some(limit.unwrap_or(DEFAULT_PRESET_LIMIT)),
            ),
            Some(PresetFilter::Recent) => (
                PresetOrder::LastUsed,
                Some(limit.unwrap_or(DEFAULT_PRESET_LIMIT)),
            ),
            None => (PresetOrder::LastUsed, limit),
        };

        PresetListQuery {
            kind,
            search: None,
            order,
            limit,
            company_id,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct PresetItemInput {
    #[validate(length(min = 1, message = "item description is required"))]
    pub description: String,

    /// Optional explicit ordering; input order is used otherwise
    pub position: Option<i32>,
}

fn ordered_items(mut items: Vec<PresetItemInput>) -> Vec<String> {
    // Stable sort keeps input order for equal or missing positions
    items.sort_by_key(|item| item.position.unwrap_or(i32::MAX));
    items.into_iter().map(|item| item.description).collect()
}

// Create request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreatePresetDto {
    #[validate(length(min = 1, max = 255, message = "name is required"))]
    pub name: String,

    #[validate(length(min = 1, max = 255, message = "contract is required"))]
    pub contract: String,

    #[validate(length(min = 1, max = 100, message = "initial value is required"))]
    pub initial_value: String,

    #[validate(length(min = 1, max = 100, message = "RQ is required"))]
    pub requisition: String,

    #[validate(length(min = 1, max = 100, message = "OS is required"))]
    pub service_order: String,

    #[validate(length(min = 1, max = 100, message = "purchase order is required"))]
    pub purchase_order: String,

    #[validate(length(min = 1, message = "scope description is required"))]
    pub scope_description: String,

    pub background_image_url: Option<String>,

    /// Owning company (report templates only; defaults to the configured company)
    pub company_id: Option<Uuid>,

    #[validate(nested)]
    #[serde(default)]
    pub items: Vec<PresetItemInput>,
}

impl CreatePresetDto {
    pub fn into_new_preset(self) -> NewPreset {
        NewPreset {
            name: self.name,
            contract: self.contract,
            initial_value: self.initial_value,
            requisition: self.requisition,
            service_order: self.service_order,
            purchase_order: self.purchase_order,
            scope_description: self.scope_description,
            background_image_url: self.background_image_url.filter(|url| !url.is_empty()),
            company_id: self.company_id,
            items: ordered_items(self.items),
        }
    }
}

// Update request
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdatePresetDto {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 255))]
    pub contract: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub initial_value: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub requisition: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub service_order: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub purchase_order: Option<String>,

    #[validate(length(min = 1))]
    pub scope_description: Option<String>,

    pub background_image_url: Option<String>,

    pub company_id: Option<Uuid>,

    /// Replaces the whole item list when present
    #[validate(nested)]
    pub items: Option<Vec<PresetItemInput>>,
}

impl UpdatePresetDto {
    pub fn into_changes(self) -> PresetChanges {
        PresetChanges {
            name: self.name,
            contract: self.contract,
            initial_value: self.initial_value,
            requisition: self.requisition,
            service_order: self.service_order,
            purchase_order: self.purchase_order,
            scope_description: self.scope_description,
            background_image_url: self.background_image_url,
            company_id: self.company_id,
            items: self.items.map(ordered_items),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PresetItemDto {
    pub position: i32,
    pub description: String,
}

// Response DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PresetResponseDto {
    pub id: Uuid,
    pub kind: PresetKind,
    pub name: String,
    pub contract: String,
    pub initial_value: String,
    pub requisition: String,
    pub service_order: String,
    pub purchase_order: String,
    pub scope_description: String,
    pub background_image_url: Option<String>,
    pub company_id: Option<Uuid>,
    pub items: Vec<PresetItemDto>,
    pub usage_count: i32,
    pub last_used_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Preset> for PresetResponseDto {
    fn from(p: Preset) -> Self {
        Self {
            id: p.id,
            kind: p.kind,
            name: p.name,
            contract: p.contract,
            initial_value: p.initial_value,
            requisition: p.requisition,
            service_order: p.service_order,
            purchase_order: p.purchase_order,
            scope_description: p.scope_description,
            background_image_url: p.background_image_url,
            company_id: p.company_id,
            items: p
                .items
                .into_iter()
                .enumerate()
                .map(|(position, description)| PresetItemDto {
                    position: position as i32,
                    description,
                })
                .collect(),
            usage_count: p.usage_count,
            last_used_at: p.last_used_at,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// Result of seeding a preset store
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InitializePresetsDto {
    /// Number of presets inserted (0 when the store already had data)
    pub created: usize,
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(description: &str, position: Option<i32>) -> PresetItemInput {
        PresetItemInput {
            description: description.to_string(),
            position,
        }
    }

    #[test]
    fn test_termo_takes_precedence_over_filtro() {
        let params = PresetQueryParams {
            termo: Some(" atlas ".to_string()),
            filtro: Some(PresetFilter::MostUsed),
            ..Default::default()
        };

        let query = params.to_query(PresetKind::Contract);
        assert_eq!(query.search.as_deref(), Some("atlas"));
        assert_eq!(query.order, PresetOrder::LastUsed);
        assert_eq!(query.limit, None);
    }

    #[test]
    fn test_filtro_defaults_and_clamps_limit() {
        let params = PresetQueryParams {
            filtro: Some(PresetFilter::MostUsed),
            ..Default::default()
        };
        let query = params.to_query(PresetKind::Report);
        assert_eq!(query.order, PresetOrder::MostUsed);
        assert_eq!(query.limit, Some(DEFAULT_PRESET_LIMIT));

        let params = PresetQueryParams {
            filtro: Some(PresetFilter::Recent),
            limite: Some(500),
            ..Default::default()
        };
        assert_eq!(params.to_query(PresetKind::Report).limit, Some(MAX_PRESET_LIMIT));
    }

    #[test]
    fn test_company_filter_ignored_for_contracts() {
        let params = PresetQueryParams {
            empresa_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        assert!(params.to_query(PresetKind::Contract).company_id.is_none());
        assert!(params.to_query(PresetKind::Report).company_id.is_some());
    }

    #[test]
    fn test_filter_deserializes_portuguese_names() {
        let filter: PresetFilter = serde_json::from_str("\"maisUsados\"").unwrap();
        assert_eq!(filter, PresetFilter::MostUsed);
        let filter: PresetFilter = serde_json::from_str("\"recentes\"").unwrap();
        assert_eq!(filter, PresetFilter::Recent);
    }

    #[test]
    fn test_items_ordered_by_position() {
        let items = ordered_items(vec![
            item("c", Some(2)),
            item("a", Some(0)),
            item("b", Some(1)),
            item("d", None),
        ]);
        assert_eq!(items, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_create_dto_requires_fields() {
        let dto = CreatePresetDto {
            name: String::new(),
            contract: "ATLAS BH".to_string(),
            initial_value: "R$ 850,00".to_string(),
            requisition: "RQ1".to_string(),
            service_order: "1".to_string(),
            purchase_order: "OC1".to_string(),
            scope_description: "Escopo".to_string(),
            background_image_url: None,
            company_id: None,
            items: vec![item("", None)],
        };

        let errors = dto.validate().unwrap_err();
        let fields = errors.errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("items"));
    }
}
