use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Company {
    pub id: Uuid,
    pub legal_name: String,
    /// CNPJ as entered (punctuation preserved)
    pub tax_id: String,
    pub logo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCompany {
    pub legal_name: String,
    pub tax_id: String,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CompanyChanges {
    pub legal_name: Option<String>,
    pub tax_id: Option<String>,
    pub logo_url: Option<String>,
}
