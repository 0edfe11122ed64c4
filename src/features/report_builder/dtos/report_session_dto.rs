use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::presets::models::PresetKind;
use crate::features::report_builder::models::{
    BatchOutcome, GeneratedReport, Photo, RejectedUpload, ReportFieldsPatch, ReportSession,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct TechnicalItemDto {
    pub id: Uuid,
    pub description: String,
    /// Photos linked to this item, in figure order
    pub linked_photo_ids: Vec<Uuid>,
    pub linked_figures: Vec<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReportDataDto {
    pub report_title: String,
    pub company_id: Option<Uuid>,
    pub contract: String,
    pub initial_value: String,
    pub requisition: String,
    pub service_order: String,
    pub purchase_order: String,
    pub scope_description: String,
    pub items: Vec<TechnicalItemDto>,
    pub author_name: String,
    pub author_primary_role: String,
    pub author_secondary_role: String,
    pub prepared_on: String,
    pub phone: String,
    pub email: String,
    pub instagram: String,
    pub background_image_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PhotoDto {
    pub id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
    pub figure: u32,
    pub linked_item_id: Option<Uuid>,
    /// Base64 `data:` URL
    pub data_url: String,
}

impl From<&Photo> for PhotoDto {
    fn from(photo: &Photo) -> Self {
        Self {
            id: photo.id,
            file_name: photo.file_name.clone(),
            content_type: photo.content_type.clone(),
            size: photo.size,
            figure: photo.figure,
            linked_item_id: photo.linked_item,
            data_url: photo.data_url.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RejectedPhotoDto {
    pub file_name: String,
    pub reason: String,
}

impl From<RejectedUpload> for RejectedPhotoDto {
    fn from(rejected: RejectedUpload) -> Self {
        Self {
            file_name: rejected.file_name,
            reason: rejected.reason,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PhotoBatchResultDto {
    pub accepted: Vec<PhotoDto>,
    pub rejected: Vec<RejectedPhotoDto>,
}

impl From<BatchOutcome> for PhotoBatchResultDto {
    fn from(outcome: BatchOutcome) -> Self {
        Self {
            accepted: outcome.accepted.iter().map(PhotoDto::from).collect(),
            rejected: outcome.rejected.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PreviewDto {
    pub file_name: String,
    pub page_count: usize,
    pub size: usize,
    pub warnings: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl From<&GeneratedReport> for PreviewDto {
    fn from(report: &GeneratedReport) -> Self {
        Self {
            file_name: report.file_name.clone(),
            page_count: report.page_count,
            size: report.bytes.len(),
            warnings: report.warnings.clone(),
            generated_at: report.generated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReportSessionDto {
    pub id: Uuid,
    pub data: ReportDataDto,
    pub photos: Vec<PhotoDto>,
    pub preview: Option<PreviewDto>,
    pub generating: bool,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

fn items_dto(session: &ReportSession) -> Vec<TechnicalItemDto> {
    session
        .form
        .data()
        .items
        .iter()
        .map(|item| {
            let linked = session.photos.linked_to(item.id);
            TechnicalItemDto {
                id: item.id,
                description: item.description.clone(),
                linked_photo_ids: linked.iter().map(|p| p.id).collect(),
                linked_figures: linked.iter().map(|p| p.figure).collect(),
            }
        })
        .collect()
}

impl From<&ReportSession> for ReportSessionDto {
    fn from(session: &ReportSession) -> Self {
        let data = session.form.data();
        Self {
            id: session.id,
            data: ReportDataDto {
                report_title: data.report_title.clone(),
                company_id: data.company_id,
                contract: data.contract.clone(),
                initial_value: data.initial_value.clone(),
                requisition: data.requisition.clone(),
                service_order: data.service_order.clone(),
                purchase_order: data.purchase_order.clone(),
                scope_description: data.scope_description.clone(),
                items: items_dto(session),
                author_name: data.author_name.clone(),
                author_primary_role: data.author_primary_role.clone(),
                author_secondary_role: data.author_secondary_role.clone(),
                prepared_on: data.prepared_on.clone(),
                phone: data.phone.clone(),
                email: data.email.clone(),
                instagram: data.instagram.clone(),
                background_image_url: data.background_image_url.clone(),
            },
            photos: session.photos.by_figure().iter().map(PhotoDto::from).collect(),
            preview: session.preview().map(PreviewDto::from),
            generating: session.is_generating(),
            created_at: session.created_at,
            last_activity: session.last_activity,
        }
    }
}

/// Partial update of report fields; omitted fields are left untouched
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateReportFieldsDto {
    #[validate(length(max = 255, message = "Report title must be at most 255 characters"))]
    pub report_title: Option<String>,
    pub company_id: Option<Uuid>,
    #[validate(length(max = 255, message = "Contract must be at most 255 characters"))]
    pub contract: Option<String>,
    #[validate(length(max = 100, message = "Initial value must be at most 100 characters"))]
    pub initial_value: Option<String>,
    #[validate(length(max = 100, message = "Requisition must be at most 100 characters"))]
    pub requisition: Option<String>,
    #[validate(length(max = 100, message = "Service order must be at most 100 characters"))]
    pub service_order: Option<String>,
    #[validate(length(max = 100, message = "Purchase order must be at most 100 characters"))]
    pub purchase_order: Option<String>,
    pub scope_description: Option<String>,
    pub author_name: Option<String>,
    pub author_primary_role: Option<String>,
    pub author_secondary_role: Option<String>,
    pub prepared_on: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub instagram: Option<String>,
    /// Empty string removes the background
    pub background_image_url: Option<String>,
}

impl From<UpdateReportFieldsDto> for ReportFieldsPatch {
    fn from(dto: UpdateReportFieldsDto) -> Self {
        Self {
            report_title: dto.report_title,
            company_id: dto.company_id,
            contract: dto.contract,
            initial_value: dto.initial_value,
            requisition: dto.requisition,
            service_order: dto.service_order,
            purchase_order: dto.purchase_order,
            scope_description: dto.scope_description,
            author_name: dto.author_name,
            author_primary_role: dto.author_primary_role,
            author_secondary_role: dto.author_secondary_role,
            prepared_on: dto.prepared_on,
            phone: dto.phone,
            email: dto.email,
            instagram: dto.instagram,
            background_image_url: dto.background_image_url,
        }
    }
}

/// Item description; may be blank while the report is being filled in
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct ItemDescriptionDto {
    #[serde(default)]
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LinkPhotoDto {
    pub item_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ApplyPresetDto {
    pub kind: PresetKind,
    pub preset_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SaveAsPresetDto {
    pub kind: PresetKind,
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,
}

/// Photo upload form for OpenAPI documentation.
/// The handler reads the multipart stream directly; repeat `file` once per photo.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct PhotoUploadForm {
    /// Image file (JPEG, PNG or WebP)
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
}
