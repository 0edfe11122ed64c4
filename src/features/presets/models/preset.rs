use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Which template store a preset belongs to
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "preset_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PresetKind {
    /// Contract template (`/api/contratos`)
    Contract,
    /// Report template owned by a company (`/api/relatorios`)
    Report,
}

impl PresetKind {
    pub fn label(&self) -> &'static str {
        match self {
            PresetKind::Contract => "Contract template",
            PresetKind::Report => "Report template",
        }
    }
}

/// Database row of the `presets` table
#[derive(Debug, Clone, FromRow)]
pub struct PresetRow {
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
    pub usage_count: i32,
    pub last_used_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database row of the `preset_items` table
#[derive(Debug, Clone, FromRow)]
pub struct PresetItemRow {
    pub preset_id: Uuid,
    pub description: String,
}

/// A named, reusable set of report defaults
#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
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
    /// Technical item descriptions in order
    pub items: Vec<String>,
    pub usage_count: i32,
    pub last_used_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Preset {
    pub fn from_row(row: PresetRow, items: Vec<String>) -> Self {
        Self {
            id: row.id,
            kind: row.kind,
            name: row.name,
            contract: row.contract,
            initial_value: row.initial_value,
            requisition: row.requisition,
            service_order: row.service_order,
            purchase_order: row.purchase_order,
            scope_description: row.scope_description,
            background_image_url: row.background_image_url,
            company_id: row.company_id,
            items,
            usage_count: row.usage_count,
            last_used_at: row.last_used_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }

    /// In-memory counterpart of the repository's ILIKE search
    #[cfg(test)]
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        [
            &self.name,
            &self.contract,
            &self.requisition,
            &self.service_order,
            &self.purchase_order,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&term))
    }
}

/// Input for creating a preset
#[derive(Debug, Clone, Default)]
pub struct NewPreset {
    pub name: String,
    pub contract: String,
    pub initial_value: String,
    pub requisition: String,
    pub service_order: String,
    pub purchase_order: String,
    pub scope_description: String,
    pub background_image_url: Option<String>,
    pub company_id: Option<Uuid>,
    pub items: Vec<String>,
}

/// Partial update; `None` leaves a field untouched, `items: Some(_)` replaces the list
#[derive(Debug, Clone, Default)]
pub struct PresetChanges {
    pub name: Option<String>,
    pub contract: Option<String>,
    pub initial_value: Option<String>,
    pub requisition: Option<String>,
    pub service_order: Option<String>,
    pub purchase_order: Option<String>,
    pub scope_description: Option<String>,
    pub background_image_url: Option<String>,
    pub company_id: Option<Uuid>,
    pub items: Option<Vec<String>>,
}

/// Sort order for preset listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PresetOrder {
    /// Most recently used first
    #[default]
    LastUsed,
    /// Highest usage count first
    MostUsed,
}

#[derive(Debug, Clone)]
pub struct PresetListQuery {
    pub kind: PresetKind,
    pub search: Option<String>,
    pub order: PresetOrder,
    pub limit: Option<i64>,
    pub company_id: Option<Uuid>,
}

impl PresetListQuery {
    pub fn all(kind: PresetKind) -> Self {
        Self {
            kind,
            search: None,
            order: PresetOrder::LastUsed,
            limit: None,
            company_id: None,
        }
    }
}
