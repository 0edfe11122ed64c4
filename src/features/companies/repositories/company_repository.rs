use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::companies::models::{Company, CompanyChanges, NewCompany};
use crate::shared::validation::normalize_cnpj;

#[async_trait]
pub trait CompanyRepository: Send + Sync {
    async fn create(&self, company: NewCompany) -> Result<Company>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Company>>;

    /// Lookup ignoring CNPJ punctuation
    async fn find_by_tax_id(&self, tax_id: &str) -> Result<Option<Company>>;

    /// All companies, most recently updated first
    async fn list(&self) -> Result<Vec<Company>>;

    async fn update(&self, id: Uuid, changes: CompanyChanges) -> Result<Option<Company>>;

    async fn delete(&self, id: Uuid) -> Result<bool>;
}

/// Convert database error to more specific AppError with user-friendly messages
fn handle_db_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        // Unique constraint violation (PostgreSQL error code 23505)
        if db_err.code() == Some(std::borrow::Cow::Borrowed("23505")) {
            return AppError::Conflict("A company with this CNPJ already exists.".to_string());
        }

        // Foreign key violation (PostgreSQL error code 23503)
        if db_err.code() == Some(std::borrow::Cow::Borrowed("23503")) {
            return AppError::Conflict(
                "Company still has report templates. Remove them first.".to_string(),
            );
        }
    }

    AppError::Database(e)
}

const COMPANY_COLUMNS: &str = "id, legal_name, tax_id, logo_url, created_at, updated_at";

pub struct PgCompanyRepository {
    pool: PgPool,
}

impl PgCompanyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CompanyRepository for PgCompanyRepository {
    async fn create(&self, company: NewCompany) -> Result<Company> {
        sqlx::query_as::<_, Company>(&format!(
            "INSERT INTO companies (legal_name, tax_id, logo_url) VALUES ($1, $2, $3) RETURNING {}",
            COMPANY_COLUMNS
        ))
        .bind(&company.legal_name)
        .bind(&company.tax_id)
        .bind(&company.logo_url)
        .fetch_one(&self.pool)
        .await
        .map_err(handle_db_error)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Company>> {
        let company = sqlx::query_as::<_, Company>(&format!(
            "SELECT {} FROM companies WHERE id = $1",
            COMPANY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(company)
    }

    async fn find_by_tax_id(&self, tax_id: &str) -> Result<Option<Company>> {
        let company = sqlx::query_as::<_, Company>(&format!(
            "SELECT {} FROM companies WHERE regexp_replace(tax_id, '\\D', '', 'g') = $1",
            COMPANY_COLUMNS
        ))
        .bind(normalize_cnpj(tax_id))
        .fetch_optional(&self.pool)
        .await?;

        Ok(company)
    }

    async fn list(&self) -> Result<Vec<Company>> {
        let companies = sqlx::query_as::<_, Company>(&format!(
            "SELECT {} FROM companies ORDER BY updated_at DESC, id ASC",
            COMPANY_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(companies)
    }

    async fn update(&self, id: Uuid, changes: CompanyChanges) -> Result<Option<Company>> {
        sqlx::query_as::<_, Company>(&format!(
            "UPDATE companies SET \
                legal_name = COALESCE($2, legal_name), \
                tax_id = COALESCE($3, tax_id), \
                logo_url = COALESCE($4, logo_url), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            COMPANY_COLUMNS
        ))
        .bind(id)
        .bind(&changes.legal_name)
        .bind(&changes.tax_id)
        .bind(&changes.logo_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(handle_db_error)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM companies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(handle_db_error)?;

        Ok(result.rows_affected() > 0)
    }
}
