use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::presets::models::{
    NewPreset, Preset, PresetChanges, PresetItemRow, PresetKind, PresetListQuery, PresetOrder,
    PresetRow,
};

/// Storage for contract and report presets, discriminated by kind
#[async_trait]
pub trait PresetRepository: Send + Sync {
    async fn create(&self, kind: PresetKind, preset: NewPreset) -> Result<Preset>;

    async fn find_by_id(&self, kind: PresetKind, id: Uuid) -> Result<Option<Preset>>;

    async fn list(&self, query: &PresetListQuery) -> Result<Vec<Preset>>;

    /// Returns `None` when no preset of this kind has the id
    async fn update(
        &self,
        kind: PresetKind,
        id: Uuid,
        changes: PresetChanges,
    ) -> Result<Option<Preset>>;

    async fn delete(&self, kind: PresetKind, id: Uuid) -> Result<bool>;

    /// Increment the usage counter and stamp the last-used time
    async fn record_usage(&self, kind: PresetKind, id: Uuid) -> Result<Option<Preset>>;

    async fn count(&self, kind: PresetKind) -> Result<i64>;

    /// Report presets owned by any of the given companies, most recently used first
    async fn list_for_companies(&self, company_ids: &[Uuid]) -> Result<Vec<Preset>>;
}

/// Escape LIKE wildcards so user input is matched literally
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Convert database error to more specific AppError with user-friendly messages
fn handle_db_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        // Foreign key violation (PostgreSQL error code 23503)
        if db_err.code() == Some(std::borrow::Cow::Borrowed("23503")) {
            return AppError::BadRequest("Referenced company does not exist.".to_string());
        }

        // Check constraint violation (PostgreSQL error code 23514)
        if db_err.code() == Some(std::borrow::Cow::Borrowed("23514")) {
            return AppError::BadRequest(
                "Only report templates can belong to a company.".to_string(),
            );
        }
    }

    AppError::Database(e)
}

const PRESET_COLUMNS: &str = "id, kind, name, contract, initial_value, requisition, \
     service_order, purchase_order, scope_description, background_image_url, company_id, \
     usage_count, last_used_at, created_at, updated_at";

/// Columns a listing search term is matched against
const SEARCH_COLUMNS: [&str; 5] = [
    "name",
    "contract",
    "requisition",
    "service_order",
    "purchase_order",
];

/// Filtered, ordered preset listing; the search term is matched with ILIKE
fn list_query<'a>(query: &PresetListQuery) -> QueryBuilder<'a, Postgres> {
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {} FROM presets WHERE kind = ", PRESET_COLUMNS));
    builder.push_bind(query.kind);

    if let Some(company_id) = query.company_id {
        builder.push(" AND company_id = ").push_bind(company_id);
    }

    if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = like_pattern(term);
        builder.push(" AND (");
        let mut separated = builder.separated(" OR ");
        for column in SEARCH_COLUMNS {
            separated
                .push(format!("{} ILIKE ", column))
                .push_bind_unseparated(pattern.clone());
        }
        builder.push(")");
    }

    builder.push(match query.order {
        PresetOrder::LastUsed => " ORDER BY last_used_at DESC, created_at ASC, id ASC",
        PresetOrder::MostUsed => {
            " ORDER BY usage_count DESC, last_used_at DESC, created_at ASC, id ASC"
        }
    });

    if let Some(limit) = query.limit {
        builder.push(" LIMIT ").push_bind(limit);
    }

    builder
}

pub struct PgPresetRepository {
    pool: PgPool,
}

impl PgPresetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_items(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<String>>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, PresetItemRow>(
            "SELECT preset_id, description FROM preset_items \
             WHERE preset_id = ANY($1) ORDER BY preset_id, position",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut items: HashMap<Uuid, Vec<String>> = HashMap::new();
        for row in rows {
            items.entry(row.preset_id).or_default().push(row.description);
        }
        Ok(items)
    }

    async fn attach_items(&self, rows: Vec<PresetRow>) -> Result<Vec<Preset>> {
        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let mut items = self.load_items(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let row_items = items.remove(&row.id).unwrap_or_default();
                Preset::from_row(row, row_items)
            })
            .collect())
    }

    async fn insert_items(
        tx: &mut Transaction<'_, Postgres>,
        preset_id: Uuid,
        items: &[String],
    ) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO preset_items (preset_id, position, description) ");
        builder.push_values(items.iter().enumerate(), |mut b, (position, description)| {
            b.push_bind(preset_id)
                .push_bind(position as i32)
                .push_bind(description);
        });
        builder.build().execute(&mut **tx).await?;
        Ok(())
    }
}

#[async_trait]
impl PresetRepository for PgPresetRepository {
    async fn create(&self, kind: PresetKind, preset: NewPreset) -> Result<Preset> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, PresetRow>(&format!(
            "INSERT INTO presets (kind, name, contract, initial_value, requisition, \
             service_order, purchase_order, scope_description, background_image_url, company_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {}",
            PRESET_COLUMNS
        ))
        .bind(kind)
        .bind(&preset.name)
        .bind(&preset.contract)
        .bind(&preset.initial_value)
        .bind(&preset.requisition)
        .bind(&preset.service_order)
        .bind(&preset.purchase_order)
        .bind(&preset.scope_description)
        .bind(&preset.background_image_url)
        .bind(preset.company_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(handle_db_error)?;

        Self::insert_items(&mut tx, row.id, &preset.items).await?;
        tx.commit().await?;

        Ok(Preset::from_row(row, preset.items))
    }

    async fn find_by_id(&self, kind: PresetKind, id: Uuid) -> Result<Option<Preset>> {
        let row = sqlx::query_as::<_, PresetRow>(&format!(
            "SELECT {} FROM presets WHERE id = $1 AND kind = $2",
            PRESET_COLUMNS
        ))
        .bind(id)
        .bind(kind)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.attach_items(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list(&self, query: &PresetListQuery) -> Result<Vec<Preset>> {
        let mut builder = list_query(query);
        let rows = builder
            .build_query_as::<PresetRow>()
            .fetch_all(&self.pool)
            .await?;

        self.attach_items(rows).await
    }

    async fn update(
        &self,
        kind: PresetKind,
        id: Uuid,
        changes: PresetChanges,
    ) -> Result<Option<Preset>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, PresetRow>(&format!(
            "UPDATE presets SET \
                name = COALESCE($3, name), \
                contract = COALESCE($4, contract), \
                initial_value = COALESCE($5, initial_value), \
                requisition = COALESCE($6, requisition), \
                service_order = COALESCE($7, service_order), \
                purchase_order = COALESCE($8, purchase_order), \
                scope_description = COALESCE($9, scope_description), \
                background_image_url = COALESCE($10, background_image_url), \
                company_id = COALESCE($11, company_id), \
                updated_at = NOW() \
             WHERE id = $1 AND kind = $2 RETURNING {}",
            PRESET_COLUMNS
        ))
        .bind(id)
        .bind(kind)
        .bind(&changes.name)
        .bind(&changes.contract)
        .bind(&changes.initial_value)
        .bind(&changes.requisition)
        .bind(&changes.service_order)
        .bind(&changes.purchase_order)
        .bind(&changes.scope_description)
        .bind(&changes.background_image_url)
        .bind(changes.company_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(handle_db_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        if let Some(items) = &changes.items {
            sqlx::query("DELETE FROM preset_items WHERE preset_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            Self::insert_items(&mut tx, id, items).await?;
        }

        tx.commit().await?;
        Ok(self.attach_items(vec![row]).await?.pop())
    }

    async fn delete(&self, kind: PresetKind, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM presets WHERE id = $1 AND kind = $2")
            .bind(id)
            .bind(kind)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_usage(&self, kind: PresetKind, id: Uuid) -> Result<Option<Preset>> {
        let row = sqlx::query_as::<_, PresetRow>(&format!(
            "UPDATE presets SET usage_count = usage_count + 1, last_used_at = NOW() \
             WHERE id = $1 AND kind = $2 RETURNING {}",
            PRESET_COLUMNS
        ))
        .bind(id)
        .bind(kind)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.attach_items(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn count(&self, kind: PresetKind) -> Result<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM presets WHERE kind = $1")
            .bind(kind)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn list_for_companies(&self, company_ids: &[Uuid]) -> Result<Vec<Preset>> {
        if company_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, PresetRow>(&format!(
            "SELECT {} FROM presets WHERE kind = 'report' AND company_id = ANY($1) \
             ORDER BY last_used_at DESC, created_at ASC, id ASC",
            PRESET_COLUMNS
        ))
        .bind(company_ids)
        .fetch_all(&self.pool)
        .await?;

        self.attach_items(rows).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("atlas"), "%atlas%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_list_query_plain() {
        let builder = list_query(&PresetListQuery::all(PresetKind::Contract));
        let sql = builder.sql();

        assert!(sql.contains("FROM presets WHERE kind = $1"));
        assert!(!sql.contains("ILIKE"));
        assert!(!sql.contains("LIMIT"));
        assert!(sql.ends_with(" ORDER BY last_used_at DESC, created_at ASC, id ASC"));
    }

    #[test]
    fn test_list_query_with_every_filter() {
        let query = PresetListQuery {
            kind: PresetKind::Report,
            search: Some("  atlas ".to_string()),
            order: PresetOrder::MostUsed,
            limit: Some(5),
            company_id: Some(Uuid::new_v4()),
        };
        let builder = list_query(&query);
        let sql = builder.sql();

        assert!(sql.contains(" AND company_id = $2"));
        assert!(sql.contains(
            " AND (name ILIKE $3 OR contract ILIKE $4 OR requisition ILIKE $5 \
             OR service_order ILIKE $6 OR purchase_order ILIKE $7)"
        ));
        assert!(sql.contains(" ORDER BY usage_count DESC, last_used_at DESC"));
        assert!(sql.ends_with(" LIMIT $8"));
    }

    #[test]
    fn test_list_query_ignores_blank_search() {
        let mut query = PresetListQuery::all(PresetKind::Contract);
        query.search = Some("   ".to_string());
        assert!(!list_query(&query).sql().contains("ILIKE"));
    }
}
