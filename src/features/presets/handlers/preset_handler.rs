//! Handlers shared by `/api/contratos` and `/api/relatorios`.
//!
//! Both stores are served by the same functions; the router decides the kind
//! through [`PresetState`]. The OpenAPI document describes them once under
//! `/api/{kind}`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::presets::dtos::{
    CreatePresetDto, InitializePresetsDto, PresetQueryParams, PresetResponseDto, UpdatePresetDto,
};
use crate::features::presets::models::PresetKind;
use crate::features::presets::services::PresetService;
use crate::shared::types::{ApiResponse, Meta};

#[derive(Clone)]
pub struct PresetState {
    pub service: Arc<PresetService>,
    pub kind: PresetKind,
}

/// List templates (search with `termo`, or `filtro=maisUsados|recentes`)
#[utoipa::path(
    get,
    path = "/api/{kind}",
    params(
        ("kind" = String, Path, description = "`contratos` or `relatorios`"),
        PresetQueryParams
    ),
    responses(
        (status = 200, description = "Templates retrieved successfully", body = ApiResponse<Vec<PresetResponseDto>>),
        (status = 400, description = "Invalid filter")
    ),
    tag = "templates"
)]
pub async fn list_presets(
    State(state): State<PresetState>,
    Query(params): Query<PresetQueryParams>,
) -> Result<Json<ApiResponse<Vec<PresetResponseDto>>>> {
    let presets = state.service.list(state.kind, &params).await?;
    let total = presets.len() as i64;
    Ok(Json(ApiResponse::success(
        Some(presets),
        None,
        Some(Meta { total }),
    )))
}

/// Create a template
#[utoipa::path(
    post,
    path = "/api/{kind}",
    params(
        ("kind" = String, Path, description = "`contratos` or `relatorios`")
    ),
    request_body = CreatePresetDto,
    responses(
        (status = 201, description = "Template created successfully", body = ApiResponse<PresetResponseDto>),
        (status = 400, description = "Validation error")
    ),
    tag = "templates"
)]
pub async fn create_preset(
    State(state): State<PresetState>,
    AppJson(dto): AppJson<CreatePresetDto>,
) -> Result<(StatusCode, Json<ApiResponse<PresetResponseDto>>)> {
    dto.validate().map_err(AppError::from_validation)?;

    let preset = state.service.create(state.kind, dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(preset), None, None)),
    ))
}

/// Get a template by ID
#[utoipa::path(
    get,
    path = "/api/{kind}/{id}",
    params(
        ("kind" = String, Path, description = "`contratos` or `relatorios`"),
        ("id" = Uuid, Path, description = "Template ID")
    ),
    responses(
        (status = 200, description = "Template retrieved successfully", body = ApiResponse<PresetResponseDto>),
        (status = 404, description = "Template not found")
    ),
    tag = "templates"
)]
pub async fn get_preset(
    State(state): State<PresetState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<PresetResponseDto>>> {
    let preset = state.service.get_by_id(state.kind, id).await?;
    Ok(Json(ApiResponse::success(Some(preset), None, None)))
}

/// Update a template; `items` replaces the whole list when present
#[utoipa::path(
    put,
    path = "/api/{kind}/{id}",
    params(
        ("kind" = String, Path, description = "`contratos` or `relatorios`"),
        ("id" = Uuid, Path, description = "Template ID")
    ),
    request_body = UpdatePresetDto,
    responses(
        (status = 200, description = "Template updated successfully", body = ApiResponse<PresetResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Template not found")
    ),
    tag = "templates"
)]
pub async fn update_preset(
    State(state): State<PresetState>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<UpdatePresetDto>,
) -> Result<Json<ApiResponse<PresetResponseDto>>> {
    dto.validate().map_err(AppError::from_validation)?;

    let preset = state.service.update(state.kind, id, dto).await?;
    Ok(Json(ApiResponse::success(Some(preset), None, None)))
}

/// Delete a template
#[utoipa::path(
    delete,
    path = "/api/{kind}/{id}",
    params(
        ("kind" = String, Path, description = "`contratos` or `relatorios`"),
        ("id" = Uuid, Path, description = "Template ID")
    ),
    responses(
        (status = 200, description = "Template deleted successfully"),
        (status = 404, description = "Template not found")
    ),
    tag = "templates"
)]
pub async fn delete_preset(
    State(state): State<PresetState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    state.service.delete(state.kind, id).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Template deleted successfully".to_string()),
        None,
    )))
}

/// Record one use of a template
#[utoipa::path(
    post,
    path = "/api/{kind}/{id}/uso",
    params(
        ("kind" = String, Path, description = "`contratos` or `relatorios`"),
        ("id" = Uuid, Path, description = "Template ID")
    ),
    responses(
        (status = 200, description = "Usage recorded", body = ApiResponse<PresetResponseDto>),
        (status = 404, description = "Template not found")
    ),
    tag = "templates"
)]
pub async fn record_preset_usage(
    State(state): State<PresetState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<PresetResponseDto>>> {
    let preset = state.service.record_usage(state.kind, id).await?;
    Ok(Json(ApiResponse::success(Some(preset.into()), None, None)))
}

/// Seed the default templates when the store is empty
#[utoipa::path(
    post,
    path = "/api/{kind}/inicializar",
    params(
        ("kind" = String, Path, description = "`contratos` or `relatorios`")
    ),
    responses(
        (status = 200, description = "Default templates initialized", body = ApiResponse<InitializePresetsDto>)
    ),
    tag = "templates"
)]
pub async fn initialize_presets(
    State(state): State<PresetState>,
) -> Result<Json<ApiResponse<InitializePresetsDto>>> {
    let result = state.service.initialize(state.kind).await?;
    Ok(Json(ApiResponse::success(
        Some(result),
        Some("Default templates initialized".to_string()),
        None,
    )))
}
