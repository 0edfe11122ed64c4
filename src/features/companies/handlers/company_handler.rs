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
use crate::features::companies::dtos::{
    CompanyQueryParams, CompanyResponseDto, CreateCompanyDto, UpdateCompanyDto,
};
use crate::features::companies::services::CompanyService;
use crate::shared::types::{ApiResponse, Meta};

/// List companies, optionally filtered by CNPJ
#[utoipa::path(
    get,
    path = "/api/empresas",
    params(CompanyQueryParams),
    responses(
        (status = 200, description = "Companies retrieved successfully", body = ApiResponse<Vec<CompanyResponseDto>>)
    ),
    tag = "companies"
)]
pub async fn list_companies(
    State(service): State<Arc<CompanyService>>,
    Query(params): Query<CompanyQueryParams>,
) -> Result<Json<ApiResponse<Vec<CompanyResponseDto>>>> {
    let companies = service.list(params.cnpj.as_deref()).await?;
    let total = companies.len() as i64;
    Ok(Json(ApiResponse::success(
        Some(companies),
        None,
        Some(Meta { total }),
    )))
}

/// Create a company
#[utoipa::path(
    post,
    path = "/api/empresas",
    request_body = CreateCompanyDto,
    responses(
        (status = 201, description = "Company created successfully", body = ApiResponse<CompanyResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 409, description = "CNPJ already registered")
    ),
    tag = "companies"
)]
pub async fn create_company(
    State(service): State<Arc<CompanyService>>,
    AppJson(dto): AppJson<CreateCompanyDto>,
) -> Result<(StatusCode, Json<ApiResponse<CompanyResponseDto>>)> {
    dto.validate().map_err(AppError::from_validation)?;

    let company = service.create(dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(company), None, None)),
    ))
}

/// Get a company with its report templates
#[utoipa::path(
    get,
    path = "/api/empresas/{id}",
    params(
        ("id" = Uuid, Path, description = "Company ID")
    ),
    responses(
        (status = 200, description = "Company retrieved successfully", body = ApiResponse<CompanyResponseDto>),
        (status = 404, description = "Company not found")
    ),
    tag = "companies"
)]
pub async fn get_company(
    State(service): State<Arc<CompanyService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CompanyResponseDto>>> {
    let company = service.get_by_id(id).await?;
    Ok(Json(ApiResponse::success(Some(company), None, None)))
}

/// Update a company
#[utoipa::path(
    put,
    path = "/api/empresas/{id}",
    params(
        ("id" = Uuid, Path, description = "Company ID")
    ),
    request_body = UpdateCompanyDto,
    responses(
        (status = 200, description = "Company updated successfully", body = ApiResponse<CompanyResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Company not found"),
        (status = 409, description = "CNPJ already registered")
    ),
    tag = "companies"
)]
pub async fn update_company(
    State(service): State<Arc<CompanyService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<UpdateCompanyDto>,
) -> Result<Json<ApiResponse<CompanyResponseDto>>> {
    dto.validate().map_err(AppError::from_validation)?;

    let company = service.update(id, dto).await?;
    Ok(Json(ApiResponse::success(Some(company), None, None)))
}

/// Delete a company without report templates
#[utoipa::path(
    delete,
    path = "/api/empresas/{id}",
    params(
        ("id" = Uuid, Path, description = "Company ID")
    ),
    responses(
        (status = 200, description = "Company deleted successfully"),
        (status = 404, description = "Company not found"),
        (status = 409, description = "Company still has report templates")
    ),
    tag = "companies"
)]
pub async fn delete_company(
    State(service): State<Arc<CompanyService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    service.delete(id).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Company deleted successfully".to_string()),
        None,
    )))
}

/// Find a company by CNPJ
#[utoipa::path(
    get,
    path = "/api/empresas/buscar",
    params(CompanyQueryParams),
    responses(
        (status = 200, description = "Company found", body = ApiResponse<CompanyResponseDto>),
        (status = 400, description = "CNPJ is required"),
        (status = 404, description = "Company not found")
    ),
    tag = "companies"
)]
pub async fn find_company_by_tax_id(
    State(service): State<Arc<CompanyService>>,
    Query(params): Query<CompanyQueryParams>,
) -> Result<Json<ApiResponse<CompanyResponseDto>>> {
    let tax_id = params
        .cnpj
        .ok_or_else(|| AppError::BadRequest("CNPJ is required".to_string()))?;

    let company = service.get_by_tax_id(&tax_id).await?;
    Ok(Json(ApiResponse::success(Some(company), None, None)))
}

/// Seed the default issuing company if it does not exist yet
#[utoipa::path(
    post,
    path = "/api/empresas/inicializar",
    responses(
        (status = 200, description = "Default company initialized", body = ApiResponse<CompanyResponseDto>)
    ),
    tag = "companies"
)]
pub async fn initialize_default_company(
    State(service): State<Arc<CompanyService>>,
) -> Result<Json<ApiResponse<CompanyResponseDto>>> {
    let company = service.initialize_default().await?;
    Ok(Json(ApiResponse::success(
        Some(company),
        Some("Default company initialized".to_string()),
        None,
    )))
}
