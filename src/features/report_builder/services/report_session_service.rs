use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, Utc};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::presets::dtos::PresetResponseDto;
use crate::features::presets::PresetService;
use crate::features::report_builder::dtos::{
    ApplyPresetDto, ItemDescriptionDto, PhotoBatchResultDto, ReportSessionDto, SaveAsPresetDto,
    UpdateReportFieldsDto,
};
use crate::features::report_builder::models::{
    GeneratedReport, PhotoManager, PhotoUpload, ReportForm, ReportSession,
};
use crate::features::report_builder::services::ReportPdfService;

/// Per-session photo limits and idle expiry
#[derive(Debug, Clone, Copy)]
pub struct SessionLimits {
    pub max_photos: usize,
    pub max_photo_size: usize,
    pub idle_timeout: Duration,
}

type SharedSession = Arc<Mutex<ReportSession>>;

/// In-memory report sessions addressed by id
pub struct ReportSessionService {
    sessions: RwLock<HashMap<Uuid, SharedSession>>,
    presets: Arc<PresetService>,
    pdf: Arc<ReportPdfService>,
    limits: SessionLimits,
}

impl ReportSessionService {
    pub fn new(presets: Arc<PresetService>, pdf: Arc<ReportPdfService>, limits: SessionLimits) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            presets,
            pdf,
            limits,
        }
    }

    async fn session(&self, id: Uuid) -> Result<SharedSession> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Report session not found".to_string()))
    }

    /// Run `f` on a locked session, bump its activity time, and return its new state
    async fn mutate<F>(&self, id: Uuid, f: F) -> Result<ReportSessionDto>
    where
        F: FnOnce(&mut ReportSession) -> Result<()>,
    {
        let session = self.session(id).await?;
        let mut session = session.lock().await;
        session.touch();
        f(&mut *session)?;
        Ok(ReportSessionDto::from(&*session))
    }

    pub async fn create(&self) -> ReportSessionDto {
        let today = Local::now().format("%d/%m/%Y").to_string();
        let session = ReportSession::new(
            ReportForm::new(today),
            PhotoManager::new(self.limits.max_photos, self.limits.max_photo_size),
        );
        let dto = ReportSessionDto::from(&session);

        self.sessions
            .write()
            .await
            .insert(session.id, Arc::new(Mutex::new(session)));
        tracing::info!("Report session {} created", dto.id);
        dto
    }

    pub async fn get(&self, id: Uuid) -> Result<ReportSessionDto> {
        self.mutate(id, |_| Ok(())).await
    }

    /// Drop a session together with its photos and preview
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let session = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| AppError::NotFound("Report session not found".to_string()))?;

        session.lock().await.release();
        tracing::info!("Report session {} deleted", id);
        Ok(())
    }

    pub async fn update_fields(&self, id: Uuid, dto: UpdateReportFieldsDto) -> Result<ReportSessionDto> {
        self.mutate(id, |session| {
            session.form.update_fields(dto.into());
            Ok(())
        })
        .await
    }

    pub async fn add_item(&self, id: Uuid, dto: ItemDescriptionDto) -> Result<ReportSessionDto> {
        self.mutate(id, |session| {
            session.form.add_item(dto.description);
            Ok(())
        })
        .await
    }

    pub async fn update_item(
        &self,
        id: Uuid,
        item_id: Uuid,
        dto: ItemDescriptionDto,
    ) -> Result<ReportSessionDto> {
        self.mutate(id, |session| {
            session.form.update_item(item_id, dto.description)?;
            Ok(())
        })
        .await
    }

    pub async fn remove_item(&self, id: Uuid, item_id: Uuid) -> Result<ReportSessionDto> {
        self.mutate(id, |session| {
            session.remove_item(item_id)?;
            Ok(())
        })
        .await
    }

    pub async fn add_photos(&self, id: Uuid, uploads: Vec<PhotoUpload>) -> Result<PhotoBatchResultDto> {
        if uploads.is_empty() {
            return Err(AppError::BadRequest("At least one file is required".to_string()));
        }

        let session = self.session(id).await?;
        let mut session = session.lock().await;
        session.touch();

        let outcome = session.photos.add_batch(uploads).await?;
        tracing::info!(
            "Session {}: {} photos added, {} rejected",
            id,
            outcome.accepted.len(),
            outcome.rejected.len()
        );
        Ok(outcome.into())
    }

    pub async fn remove_photo(&self, id: Uuid, photo_id: Uuid) -> Result<ReportSessionDto> {
        self.mutate(id, |session| {
            session.remove_photo(photo_id)?;
            Ok(())
        })
        .await
    }

    pub async fn link_photo(&self, id: Uuid, photo_id: Uuid, item_id: Uuid) -> Result<ReportSessionDto> {
        self.mutate(id, |session| session.link_photo(photo_id, item_id))
            .await
    }

    pub async fn unlink_photo(&self, id: Uuid, photo_id: Uuid) -> Result<ReportSessionDto> {
        self.mutate(id, |session| {
            session.photos.unlink(photo_id)?;
            Ok(())
        })
        .await
    }

    /// Apply a preset to the form and count it as used
    pub async fn apply_preset(&self, id: Uuid, dto: ApplyPresetDto) -> Result<ReportSessionDto> {
        // Check the session first so a bad id does not count as a use
        let session = self.session(id).await?;
        let preset = self.presets.record_usage(dto.kind, dto.preset_id).await?;

        let mut session = session.lock().await;
        session.touch();
        session.apply_preset(&preset);
        tracing::info!(
            "Session {}: applied {} {}",
            id,
            preset.kind.label().to_lowercase(),
            preset.id
        );
        Ok(ReportSessionDto::from(&*session))
    }

    /// Save the current form as a new preset; the form must be complete
    pub async fn save_as_preset(&self, id: Uuid, dto: SaveAsPresetDto) -> Result<PresetResponseDto> {
        let preset = {
            let session = self.session(id).await?;
            let mut session = session.lock().await;
            session.touch();
            session.form.validate().map_err(AppError::from_validation)?;
            session.form.to_new_preset(dto.kind, dto.name.trim())
        };

        self.presets.save(dto.kind, preset).await
    }

    /// Render the report and keep it as the session preview.
    ///
    /// Only one generation may run per session. The session lock is not held
    /// while rendering. Rendering runs in its own task, so a caller that goes
    /// away does not leave the session marked as generating.
    pub async fn generate(&self, id: Uuid) -> Result<GeneratedReport> {
        let session = self.session(id).await?;
        let snapshot = {
            let mut session = session.lock().await;
            session.touch();
            session.begin_generation()?
        };

        let pdf = Arc::clone(&self.pdf);
        let task = tokio::spawn(async move {
            let result = pdf.generate(&snapshot.data, &snapshot.photos).await;

            let mut session = session.lock().await;
            match result {
                Ok(report) => {
                    if !session.finish_generation(snapshot.photo_revision, Some(&report)) {
                        tracing::info!(
                            "Session {}: photos changed during generation, preview not stored",
                            id
                        );
                    }
                    Ok(report)
                }
                Err(e) => {
                    session.finish_generation(snapshot.photo_revision, None);
                    Err(e)
                }
            }
        });

        task.await
            .map_err(|e| AppError::Internal(format!("PDF generation task failed: {}", e)))?
    }

    pub async fn preview(&self, id: Uuid) -> Result<GeneratedReport> {
        let session = self.session(id).await?;
        let mut session = session.lock().await;
        session.touch();
        session
            .preview()
            .cloned()
            .ok_or_else(|| AppError::NotFound("No PDF has been generated for this report".to_string()))
    }

    pub async fn release_preview(&self, id: Uuid) -> Result<()> {
        let session = self.session(id).await?;
        let mut session = session.lock().await;
        session.touch();
        if !session.clear_preview() {
            return Err(AppError::NotFound(
                "No PDF has been generated for this report".to_string(),
            ));
        }
        Ok(())
    }

    /// Drop sessions idle for longer than the configured timeout.
    /// Sessions that are locked or generating are left for the next sweep.
    pub async fn sweep_idle(&self) -> usize {
        let now = Utc::now();
        let timeout = self.limits.idle_timeout;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|id, session| {
            let Ok(mut session) = session.try_lock() else {
                return true;
            };
            let idle = (now - session.last_activity).to_std().unwrap_or_default();
            if idle <= timeout || session.is_generating() {
                return true;
            }
            session.release();
            tracing::info!("Report session {} expired after {:?} idle", id, idle);
            false
        });

        before - sessions.len()
    }

    /// Sweep idle sessions every `every` until the runtime shuts down
    pub fn spawn_idle_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let removed = service.sweep_idle().await;
                if removed > 0 {
                    tracing::info!("Swept {} idle report sessions", removed);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::presets::models::PresetKind;
    use crate::shared::test_helpers::{png_bytes, session_service_with, SessionFixture};
    use bytes::Bytes;

    fn png(name: &str) -> PhotoUpload {
        PhotoUpload {
            file_name: name.to_string(),
            content_type: "image/png".to_string(),
            data: Bytes::from(png_bytes(32, 24)),
        }
    }

    fn fixture() -> SessionFixture {
        session_service_with(SessionLimits {
            max_photos: 20,
            max_photo_size: 5 * 1024 * 1024,
            idle_timeout: Duration::from_secs(3600),
        })
    }

    fn fill(name: &str) -> UpdateReportFieldsDto {
        UpdateReportFieldsDto {
            contract: Some("ATLAS BH".to_string()),
            initial_value: Some("R$ 850,00".to_string()),
            requisition: Some("RQ13853907".to_string()),
            service_order: Some("50007".to_string()),
            purchase_order: Some("OC10845507".to_string()),
            scope_description: Some("Instalação de tomadas".to_string()),
            author_name: Some(name.to_string()),
            author_primary_role: Some("Eletricista".to_string()),
            author_secondary_role: Some("Supervisor".to_string()),
            phone: Some("(31) 99999-0000".to_string()),
            email: Some("contato@gm.com.br".to_string()),
            instagram: Some("@gm".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_get_delete() {
        let fx = fixture();
        let created = fx.sessions.create().await;
        assert_eq!(created.data.items.len(), 1);
        assert_eq!(created.data.report_title, "Relatório Técnico de Serviço");
        assert_eq!(created.data.prepared_on.len(), 10);

        let fetched = fx.sessions.get(created.id).await.unwrap();
        assert_eq!(fetched.id, created.id);

        fx.sessions.delete(created.id).await.unwrap();
        assert!(matches!(
            fx.sessions.get(created.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_apply_preset_clears_links_and_counts_usage() {
        let fx = fixture();
        fx.presets.initialize(PresetKind::Contract).await.unwrap();
        let preset = fx
            .presets
            .list(PresetKind::Contract, &Default::default())
            .await
            .unwrap()
            .into_iter()
            .find(|p| p.items.len() == 7)
            .unwrap();

        let session = fx.sessions.create().await;
        let photos = fx
            .sessions
            .add_photos(session.id, vec![png("a.png")])
            .await
            .unwrap();
        let item = session.data.items[0].id;
        fx.sessions
            .link_photo(session.id, photos.accepted[0].id, item)
            .await
            .unwrap();

        let applied = fx
            .sessions
            .apply_preset(
                session.id,
                ApplyPresetDto {
                    kind: PresetKind::Contract,
                    preset_id: preset.id,
                },
            )
            .await
            .unwrap();

        assert_eq!(applied.data.items.len(), 7);
        assert!(applied.data.items.iter().all(|i| i.linked_photo_ids.is_empty()));
        assert!(applied.photos.iter().all(|p| p.linked_item_id.is_none()));
        assert_eq!(applied.data.contract, preset.contract);

        let used = fx
            .presets
            .get_by_id(PresetKind::Contract, preset.id)
            .await
            .unwrap();
        assert_eq!(used.usage_count, 1);
    }

    #[tokio::test]
    async fn test_save_as_preset_requires_complete_form() {
        let fx = fixture();
        let session = fx.sessions.create().await;

        let err = fx
            .sessions
            .save_as_preset(
                session.id,
                SaveAsPresetDto {
                    kind: PresetKind::Report,
                    name: "Novo".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationFields { .. }));

        fx.sessions.update_fields(session.id, fill("Maria")).await.unwrap();
        let item = session.data.items[0].id;
        fx.sessions
            .update_item(
                session.id,
                item,
                ItemDescriptionDto {
                    description: "Troca de disjuntor".to_string(),
                },
            )
            .await
            .unwrap();

        let saved = fx
            .sessions
            .save_as_preset(
                session.id,
                SaveAsPresetDto {
                    kind: PresetKind::Report,
                    name: "Novo".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(saved.items.len(), 1);
        assert_eq!(saved.items[0].description, "Troca de disjuntor");
        // Report presets fall back to the default company
        assert!(saved.company_id.is_some());

        // Values that would not fit the preset columns are rejected before saving
        fx.sessions
            .update_fields(
                session.id,
                UpdateReportFieldsDto {
                    requisition: Some("R".repeat(101)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let err = fx
            .sessions
            .save_as_preset(
                session.id,
                SaveAsPresetDto {
                    kind: PresetKind::Contract,
                    name: "Longo".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationFields { .. }));
    }

    #[tokio::test]
    async fn test_generate_stores_preview_and_photo_removal_drops_it() {
        let fx = fixture();
        fx.companies.ensure_default().await.unwrap();

        let session = fx.sessions.create().await;
        fx.sessions.update_fields(session.id, fill("João")).await.unwrap();
        let photos = fx
            .sessions
            .add_photos(session.id, vec![png("a.png"), png("b.png")])
            .await
            .unwrap();
        assert_eq!(
            photos.accepted.iter().map(|p| p.figure).collect::<Vec<_>>(),
            vec![1, 2]
        );

        let report = fx.sessions.generate(session.id).await.unwrap();
        assert!(report.bytes.starts_with(b"%PDF"));

        let preview = fx.sessions.preview(session.id).await.unwrap();
        assert_eq!(preview.bytes, report.bytes);

        fx.sessions
            .remove_photo(session.id, photos.accepted[0].id)
            .await
            .unwrap();
        assert!(matches!(
            fx.sessions.preview(session.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_generation_without_company_keeps_session_usable() {
        let fx = fixture();
        let session = fx.sessions.create().await;

        let err = fx.sessions.generate(session.id).await.unwrap_err();
        assert!(matches!(err, AppError::Unprocessable(_)));

        let state = fx.sessions.get(session.id).await.unwrap();
        assert!(!state.generating);
        assert!(state.preview.is_none());
    }

    #[tokio::test]
    async fn test_link_and_unlink() {
        let fx = fixture();
        let session = fx.sessions.create().await;
        let photos = fx
            .sessions
            .add_photos(session.id, vec![png("a.png")])
            .await
            .unwrap();
        let photo = photos.accepted[0].id;
        let item_id = session.data.items[0].id;

        let linked = fx.sessions.link_photo(session.id, photo, item_id).await.unwrap();
        assert_eq!(linked.data.items[0].linked_figures, vec![1]);

        let unlinked = fx.sessions.unlink_photo(session.id, photo).await.unwrap();
        assert!(unlinked.data.items[0].linked_figures.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_generation_does_not_block_the_session() {
        let fx = fixture();
        fx.companies.ensure_default().await.unwrap();
        let session = fx.sessions.create().await;
        fx.sessions
            .add_photos(session.id, vec![png("a.png")])
            .await
            .unwrap();

        // The caller gives up almost immediately, dropping its future
        let _ = tokio::time::timeout(Duration::from_micros(1), fx.sessions.generate(session.id))
            .await;

        // The detached render finishes on its own and clears the flag
        let mut generating = true;
        for _ in 0..500 {
            generating = fx.sessions.get(session.id).await.unwrap().generating;
            if !generating {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!generating);

        let report = fx.sessions.generate(session.id).await.unwrap();
        assert!(report.bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_sweep_idle() {
        let fx = session_service_with(SessionLimits {
            max_photos: 20,
            max_photo_size: 1024,
            idle_timeout: Duration::ZERO,
        });
        let session = fx.sessions.create().await;
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert_eq!(fx.sessions.sweep_idle().await, 1);
        assert!(fx.sessions.get(session.id).await.is_err());
    }
}
