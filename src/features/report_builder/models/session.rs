use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::photo::{Photo, PhotoError, PhotoManager};
use super::report::{FormError, ReportData, ReportForm};
use crate::core::error::AppError;
use crate::features::presets::models::Preset;

/// A rendered report document
#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub bytes: Bytes,
    pub page_count: usize,
    pub file_name: String,
    /// Decorations that could not be applied (logo, background, photos)
    pub warnings: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Everything a generation needs, copied out of the session
#[derive(Debug, Clone)]
pub struct GenerationSnapshot {
    pub data: ReportData,
    pub photos: Vec<Photo>,
    pub photo_revision: u64,
}

/// Server-side working copy of a report
#[derive(Debug)]
pub struct ReportSession {
    pub id: Uuid,
    pub form: ReportForm,
    pub photos: PhotoManager,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    preview: Option<GeneratedReport>,
    generating: bool,
    // Bumped on photo removal so stale generations are not kept as preview
    photo_revision: u64,
}

impl ReportSession {
    pub fn new(form: ReportForm, photos: PhotoManager) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            form,
            photos,
            created_at: now,
            last_activity: now,
            preview: None,
            generating: false,
            photo_revision: 0,
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn preview(&self) -> Option<&GeneratedReport> {
        self.preview.as_ref()
    }

    pub fn clear_preview(&mut self) -> bool {
        self.preview.take().is_some()
    }

    pub fn remove_item(&mut self, item_id: Uuid) -> Result<(), FormError> {
        self.form.remove_item(item_id)?;
        self.photos.unlink_item(item_id);
        Ok(())
    }

    pub fn apply_preset(&mut self, preset: &Preset) {
        self.form.apply_preset(preset);
        self.photos.clear_links();
    }

    pub fn link_photo(&mut self, photo_id: Uuid, item_id: Uuid) -> Result<(), AppError> {
        if !self.form.has_item(item_id) {
            return Err(FormError::ItemNotFound(item_id).into());
        }
        self.photos.link(photo_id, item_id)?;
        Ok(())
    }

    /// Remove a photo and drop the preview that may show it
    pub fn remove_photo(&mut self, photo_id: Uuid) -> Result<Photo, PhotoError> {
        let photo = self.photos.remove(photo_id)?;
        self.preview = None;
        self.photo_revision += 1;
        Ok(photo)
    }

    /// Mark a generation as running and copy out its inputs
    pub fn begin_generation(&mut self) -> Result<GenerationSnapshot, AppError> {
        if self.generating {
            return Err(AppError::Conflict(
                "A PDF is already being generated for this report".to_string(),
            ));
        }
        self.generating = true;

        Ok(GenerationSnapshot {
            data: self.form.data().clone(),
            photos: self.photos.by_figure().to_vec(),
            photo_revision: self.photo_revision,
        })
    }

    /// Finish a generation. The result becomes the preview unless a photo was
    /// removed while it was running. Returns whether it was stored.
    pub fn finish_generation(&mut self, revision: u64, report: Option<&GeneratedReport>) -> bool {
        self.generating = false;
        match report {
            Some(report) if revision == self.photo_revision => {
                self.preview = Some(report.clone());
                true
            }
            _ => false,
        }
    }

    /// Release photos and preview
    pub fn release(&mut self) {
        self.photos.clear();
        self.preview = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::report_builder::models::PhotoUpload;

    fn session() -> ReportSession {
        ReportSession::new(ReportForm::new("01/02/2025"), PhotoManager::new(20, 1024))
    }

    fn report() -> GeneratedReport {
        GeneratedReport {
            bytes: Bytes::from_static(b"%PDF-1.3"),
            page_count: 1,
            file_name: "relatorio-tecnico-x-2025-02-01.pdf".to_string(),
            warnings: vec![],
            generated_at: Utc::now(),
        }
    }

    async fn with_photo(session: &mut ReportSession) -> Uuid {
        let outcome = session
            .photos
            .add_batch(vec![PhotoUpload {
                file_name: "a.png".to_string(),
                content_type: "image/png".to_string(),
                data: Bytes::from_static(b"png"),
            }])
            .await
            .unwrap();
        outcome.accepted[0].id
    }

    #[test]
    fn test_concurrent_generation_conflicts() {
        let mut session = session();
        let snapshot = session.begin_generation().unwrap();
        assert!(matches!(
            session.begin_generation(),
            Err(AppError::Conflict(_))
        ));

        assert!(session.finish_generation(snapshot.photo_revision, Some(&report())));
        assert!(session.preview().is_some());
        assert!(session.begin_generation().is_ok());
    }

    #[test]
    fn test_failed_generation_releases_flag() {
        let mut session = session();
        let snapshot = session.begin_generation().unwrap();
        assert!(!session.finish_generation(snapshot.photo_revision, None));
        assert!(!session.is_generating());
        assert!(session.preview().is_none());
    }

    #[tokio::test]
    async fn test_photo_removal_invalidates_preview() {
        let mut session = session();
        let photo = with_photo(&mut session).await;

        let snapshot = session.begin_generation().unwrap();
        session.finish_generation(snapshot.photo_revision, Some(&report()));
        assert!(session.preview().is_some());

        session.remove_photo(photo).unwrap();
        assert!(session.preview().is_none());
    }

    #[tokio::test]
    async fn test_stale_generation_not_stored() {
        let mut session = session();
        let photo = with_photo(&mut session).await;

        let snapshot = session.begin_generation().unwrap();
        assert_eq!(snapshot.photos.len(), 1);
        session.remove_photo(photo).unwrap();

        assert!(!session.finish_generation(snapshot.photo_revision, Some(&report())));
        assert!(session.preview().is_none());
        assert!(!session.is_generating());
    }

    #[tokio::test]
    async fn test_removing_item_unlinks_photos() {
        let mut session = session();
        let photo = with_photo(&mut session).await;
        let item = session.form.add_item("Segundo").id;

        session.link_photo(photo, item).unwrap();
        assert_eq!(session.photos.linked_to(item).len(), 1);

        session.remove_item(item).unwrap();
        assert!(session.photos.get(photo).unwrap().linked_item.is_none());

        // Linking to an unknown item is a 404
        assert!(matches!(
            session.link_photo(photo, item),
            Err(AppError::NotFound(_))
        ));
    }
}
