use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::presets::dtos::PresetResponseDto;
use crate::features::report_builder::dtos::{
    ApplyPresetDto, ItemDescriptionDto, LinkPhotoDto, PhotoBatchResultDto, PhotoUploadForm,
    ReportSessionDto, SaveAsPresetDto, UpdateReportFieldsDto,
};
use crate::features::report_builder::models::{GeneratedReport, PhotoUpload};
use crate::features::report_builder::services::ReportSessionService;
use crate::shared::types::ApiResponse;

pub const PAGE_COUNT_HEADER: &str = "x-page-count";
pub const WARNING_COUNT_HEADER: &str = "x-report-warning-count";

fn pdf_response(report: GeneratedReport, disposition: &str) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
    if let Ok(value) = HeaderValue::from_str(&format!(
        "{}; filename=\"{}\"",
        disposition, report.file_name
    )) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    headers.insert(
        HeaderName::from_static(PAGE_COUNT_HEADER),
        HeaderValue::from(report.page_count),
    );
    headers.insert(
        HeaderName::from_static(WARNING_COUNT_HEADER),
        HeaderValue::from(report.warnings.len()),
    );

    (StatusCode::OK, headers, report.bytes).into_response()
}

/// Start a new report session
#[utoipa::path(
    post,
    path = "/api/relatorio-tecnico/sessoes",
    responses(
        (status = 201, description = "Session created", body = ApiResponse<ReportSessionDto>)
    ),
    tag = "report-sessions"
)]
pub async fn create_session(
    State(service): State<Arc<ReportSessionService>>,
) -> (StatusCode, Json<ApiResponse<ReportSessionDto>>) {
    let session = service.create().await;
    (
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(session), None, None)),
    )
}

/// Get the current state of a report session
#[utoipa::path(
    get,
    path = "/api/relatorio-tecnico/sessoes/{id}",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session retrieved", body = ApiResponse<ReportSessionDto>),
        (status = 404, description = "Session not found")
    ),
    tag = "report-sessions"
)]
pub async fn get_session(
    State(service): State<Arc<ReportSessionService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ReportSessionDto>>> {
    let session = service.get(id).await?;
    Ok(Json(ApiResponse::success(Some(session), None, None)))
}

/// Discard a report session, its photos and its preview
#[utoipa::path(
    delete,
    path = "/api/relatorio-tecnico/sessoes/{id}",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session deleted"),
        (status = 404, description = "Session not found")
    ),
    tag = "report-sessions"
)]
pub async fn delete_session(
    State(service): State<Arc<ReportSessionService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    service.delete(id).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Report session deleted".to_string()),
        None,
    )))
}

/// Update report fields
#[utoipa::path(
    patch,
    path = "/api/relatorio-tecnico/sessoes/{id}/campos",
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = UpdateReportFieldsDto,
    responses(
        (status = 200, description = "Fields updated", body = ApiResponse<ReportSessionDto>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Session not found")
    ),
    tag = "report-sessions"
)]
pub async fn update_fields(
    State(service): State<Arc<ReportSessionService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<UpdateReportFieldsDto>,
) -> Result<Json<ApiResponse<ReportSessionDto>>> {
    dto.validate().map_err(AppError::from_validation)?;

    let session = service.update_fields(id, dto).await?;
    Ok(Json(ApiResponse::success(Some(session), None, None)))
}

/// Append a technical item
#[utoipa::path(
    post,
    path = "/api/relatorio-tecnico/sessoes/{id}/itens",
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = ItemDescriptionDto,
    responses(
        (status = 201, description = "Item added", body = ApiResponse<ReportSessionDto>),
        (status = 404, description = "Session not found")
    ),
    tag = "report-sessions"
)]
pub async fn add_item(
    State(service): State<Arc<ReportSessionService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<ItemDescriptionDto>,
) -> Result<(StatusCode, Json<ApiResponse<ReportSessionDto>>)> {
    dto.validate().map_err(AppError::from_validation)?;

    let session = service.add_item(id, dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(session), None, None)),
    ))
}

/// Change a technical item's description
#[utoipa::path(
    put,
    path = "/api/relatorio-tecnico/sessoes/{id}/itens/{item_id}",
    params(
        ("id" = Uuid, Path, description = "Session ID"),
        ("item_id" = Uuid, Path, description = "Technical item ID")
    ),
    request_body = ItemDescriptionDto,
    responses(
        (status = 200, description = "Item updated", body = ApiResponse<ReportSessionDto>),
        (status = 404, description = "Session or item not found")
    ),
    tag = "report-sessions"
)]
pub async fn update_item(
    State(service): State<Arc<ReportSessionService>>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    AppJson(dto): AppJson<ItemDescriptionDto>,
) -> Result<Json<ApiResponse<ReportSessionDto>>> {
    dto.validate().map_err(AppError::from_validation)?;

    let session = service.update_item(id, item_id, dto).await?;
    Ok(Json(ApiResponse::success(Some(session), None, None)))
}

/// Remove a technical item and unlink its photos
#[utoipa::path(
    delete,
    path = "/api/relatorio-tecnico/sessoes/{id}/itens/{item_id}",
    params(
        ("id" = Uuid, Path, description = "Session ID"),
        ("item_id" = Uuid, Path, description = "Technical item ID")
    ),
    responses(
        (status = 200, description = "Item removed", body = ApiResponse<ReportSessionDto>),
        (status = 400, description = "The last item cannot be removed"),
        (status = 404, description = "Session or item not found")
    ),
    tag = "report-sessions"
)]
pub async fn remove_item(
    State(service): State<Arc<ReportSessionService>>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<ReportSessionDto>>> {
    let session = service.remove_item(id, item_id).await?;
    Ok(Json(ApiResponse::success(Some(session), None, None)))
}

/// Upload photos
///
/// Accepts multipart/form-data with one or more `file` fields (JPEG, PNG or
/// WebP). Invalid files are reported in `rejected` while the rest are stored.
#[utoipa::path(
    post,
    path = "/api/relatorio-tecnico/sessoes/{id}/fotos",
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body(
        content = PhotoUploadForm,
        content_type = "multipart/form-data",
        description = "Repeat the `file` field once per photo",
    ),
    responses(
        (status = 201, description = "Batch processed", body = ApiResponse<PhotoBatchResultDto>),
        (status = 400, description = "No files, or the photo limit would be exceeded"),
        (status = 404, description = "Session not found"),
        (status = 413, description = "Request too large")
    ),
    tag = "report-sessions"
)]
pub async fn upload_photos(
    State(service): State<Arc<ReportSessionService>>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<PhotoBatchResultDto>>)> {
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();
        if field_name != "file" {
            debug!("Ignoring unknown field: {}", field_name);
            continue;
        }

        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let file_name = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unnamed".to_string());
        let data = field.bytes().await.map_err(|e| {
            debug!("Failed to read file bytes: {}", e);
            AppError::BadRequest(format!("Failed to read file data: {}", e))
        })?;

        uploads.push(PhotoUpload {
            file_name,
            content_type,
            data,
        });
    }

    let result = service.add_photos(id, uploads).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(result), None, None)),
    ))
}

/// Remove a photo; drops the current preview
#[utoipa::path(
    delete,
    path = "/api/relatorio-tecnico/sessoes/{id}/fotos/{photo_id}",
    params(
        ("id" = Uuid, Path, description = "Session ID"),
        ("photo_id" = Uuid, Path, description = "Photo ID")
    ),
    responses(
        (status = 200, description = "Photo removed", body = ApiResponse<ReportSessionDto>),
        (status = 404, description = "Session or photo not found")
    ),
    tag = "report-sessions"
)]
pub async fn remove_photo(
    State(service): State<Arc<ReportSessionService>>,
    Path((id, photo_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<ReportSessionDto>>> {
    let session = service.remove_photo(id, photo_id).await?;
    Ok(Json(ApiResponse::success(Some(session), None, None)))
}

/// Link a photo to a technical item, replacing any previous link
#[utoipa::path(
    put,
    path = "/api/relatorio-tecnico/sessoes/{id}/fotos/{photo_id}/vinculo",
    params(
        ("id" = Uuid, Path, description = "Session ID"),
        ("photo_id" = Uuid, Path, description = "Photo ID")
    ),
    request_body = LinkPhotoDto,
    responses(
        (status = 200, description = "Photo linked", body = ApiResponse<ReportSessionDto>),
        (status = 404, description = "Session, photo or item not found")
    ),
    tag = "report-sessions"
)]
pub async fn link_photo(
    State(service): State<Arc<ReportSessionService>>,
    Path((id, photo_id)): Path<(Uuid, Uuid)>,
    AppJson(dto): AppJson<LinkPhotoDto>,
) -> Result<Json<ApiResponse<ReportSessionDto>>> {
    let session = service.link_photo(id, photo_id, dto.item_id).await?;
    Ok(Json(ApiResponse::success(Some(session), None, None)))
}

/// Unlink a photo from its technical item
#[utoipa::path(
    delete,
    path = "/api/relatorio-tecnico/sessoes/{id}/fotos/{photo_id}/vinculo",
    params(
        ("id" = Uuid, Path, description = "Session ID"),
        ("photo_id" = Uuid, Path, description = "Photo ID")
    ),
    responses(
        (status = 200, description = "Photo unlinked", body = ApiResponse<ReportSessionDto>),
        (status = 404, description = "Session or photo not found")
    ),
    tag = "report-sessions"
)]
pub async fn unlink_photo(
    State(service): State<Arc<ReportSessionService>>,
    Path((id, photo_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<ReportSessionDto>>> {
    let session = service.unlink_photo(id, photo_id).await?;
    Ok(Json(ApiResponse::success(Some(session), None, None)))
}

/// Fill the report from a contract or report template
#[utoipa::path(
    post,
    path = "/api/relatorio-tecnico/sessoes/{id}/modelos/aplicar",
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = ApplyPresetDto,
    responses(
        (status = 200, description = "Template applied", body = ApiResponse<ReportSessionDto>),
        (status = 404, description = "Session or template not found")
    ),
    tag = "report-sessions"
)]
pub async fn apply_preset(
    State(service): State<Arc<ReportSessionService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<ApplyPresetDto>,
) -> Result<Json<ApiResponse<ReportSessionDto>>> {
    let session = service.apply_preset(id, dto).await?;
    Ok(Json(ApiResponse::success(
        Some(session),
        Some("Template applied".to_string()),
        None,
    )))
}

/// Save the current report as a new template
#[utoipa::path(
    post,
    path = "/api/relatorio-tecnico/sessoes/{id}/modelos",
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = SaveAsPresetDto,
    responses(
        (status = 201, description = "Template saved", body = ApiResponse<PresetResponseDto>),
        (status = 400, description = "Report is incomplete"),
        (status = 404, description = "Session not found")
    ),
    tag = "report-sessions"
)]
pub async fn save_as_preset(
    State(service): State<Arc<ReportSessionService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<SaveAsPresetDto>,
) -> Result<(StatusCode, Json<ApiResponse<PresetResponseDto>>)> {
    dto.validate().map_err(AppError::from_validation)?;

    let preset = service.save_as_preset(id, dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(preset), None, None)),
    ))
}

/// Generate the PDF and keep it as the session preview
#[utoipa::path(
    post,
    path = "/api/relatorio-tecnico/sessoes/{id}/pdf",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "PDF document", content_type = "application/pdf", body = Vec<u8>),
        (status = 404, description = "Session not found"),
        (status = 409, description = "A generation is already running"),
        (status = 422, description = "Issuing company not found")
    ),
    tag = "report-sessions"
)]
pub async fn generate_pdf(
    State(service): State<Arc<ReportSessionService>>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let report = service.generate(id).await?;
    Ok(pdf_response(report, "attachment"))
}

/// Download the last generated PDF
#[utoipa::path(
    get,
    path = "/api/relatorio-tecnico/sessoes/{id}/pdf",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "PDF document", content_type = "application/pdf", body = Vec<u8>),
        (status = 404, description = "Session or preview not found")
    ),
    tag = "report-sessions"
)]
pub async fn get_preview(
    State(service): State<Arc<ReportSessionService>>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let report = service.preview(id).await?;
    Ok(pdf_response(report, "inline"))
}

/// Release the stored preview
#[utoipa::path(
    delete,
    path = "/api/relatorio-tecnico/sessoes/{id}/pdf",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Preview released"),
        (status = 404, description = "Session or preview not found")
    ),
    tag = "report-sessions"
)]
pub async fn release_preview(
    State(service): State<Arc<ReportSessionService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    service.release_preview(id).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Preview released".to_string()),
        None,
    )))
}
