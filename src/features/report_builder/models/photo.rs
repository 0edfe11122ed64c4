use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use futures::future::join_all;
use thiserror::Error;
use uuid::Uuid;

use crate::core::error::AppError;
use crate::shared::constants::ALLOWED_PHOTO_MIME_TYPES;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PhotoError {
    #[error("Photo limit reached: {existing} stored plus {incoming} uploaded exceeds the maximum of {max}")]
    Capacity {
        max: usize,
        existing: usize,
        incoming: usize,
    },

    #[error("Unsupported file type '{0}'. Use JPG, PNG or WebP.")]
    UnsupportedType(String),

    #[error("File too large ({size} bytes). Maximum size: {max} bytes.")]
    TooLarge { size: usize, max: usize },

    #[error("Failed to encode photo: {0}")]
    Encoding(String),

    #[error("Photo {0} not found")]
    NotFound(Uuid),
}

impl From<PhotoError> for AppError {
    fn from(err: PhotoError) -> Self {
        match err {
            PhotoError::NotFound(_) => AppError::NotFound(err.to_string()),
            PhotoError::Encoding(_) => AppError::Internal(err.to_string()),
            _ => AppError::BadRequest(err.to_string()),
        }
    }
}

/// A file received for a report, before validation
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// A stored report photo
#[derive(Debug, Clone)]
pub struct Photo {
    pub id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
    pub data: Bytes,
    /// `data:<mime>;base64,...` rendition used by clients for previews
    pub data_url: Arc<str>,
    /// Sequential, 1-based, never reused within a report
    pub figure: u32,
    pub linked_item: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedUpload {
    pub file_name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub accepted: Vec<Photo>,
    pub rejected: Vec<RejectedUpload>,
}

/// Photos attached to one report, in figure order
#[derive(Debug, Clone)]
pub struct PhotoManager {
    photos: Vec<Photo>,
    last_figure: u32,
    max_photos: usize,
    max_size: usize,
}

impl PhotoManager {
    pub fn new(max_photos: usize, max_size: usize) -> Self {
        Self {
            photos: Vec::new(),
            last_figure: 0,
            max_photos,
            max_size,
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.photos.len()
    }

    #[cfg(test)]
    pub fn get(&self, id: Uuid) -> Option<&Photo> {
        self.photos.iter().find(|photo| photo.id == id)
    }

    fn get_mut(&mut self, id: Uuid) -> Result<&mut Photo, PhotoError> {
        self.photos
            .iter_mut()
            .find(|photo| photo.id == id)
            .ok_or(PhotoError::NotFound(id))
    }

    pub fn validate_upload(&self, upload: &PhotoUpload) -> Result<(), PhotoError> {
        if !ALLOWED_PHOTO_MIME_TYPES.contains(&upload.content_type.as_str()) {
            return Err(PhotoError::UnsupportedType(upload.content_type.clone()));
        }
        if upload.data.len() > self.max_size {
            return Err(PhotoError::TooLarge {
                size: upload.data.len(),
                max: self.max_size,
            });
        }
        Ok(())
    }

    /// Validate and encode a batch of uploads.
    ///
    /// The whole batch fails when it would push the total past the photo limit.
    /// Otherwise invalid files are reported individually and the rest are stored
    /// with figure numbers continuing from the last one ever assigned.
    pub async fn add_batch(&mut self, uploads: Vec<PhotoUpload>) -> Result<BatchOutcome, PhotoError> {
        if self.photos.len() + uploads.len() > self.max_photos {
            return Err(PhotoError::Capacity {
                max: self.max_photos,
                existing: self.photos.len(),
                incoming: uploads.len(),
            });
        }

        let mut outcome = BatchOutcome::default();
        let mut valid = Vec::with_capacity(uploads.len());
        for upload in uploads {
            match self.validate_upload(&upload) {
                Ok(()) => valid.push(upload),
                Err(err) => {
                    tracing::warn!("Rejected photo '{}': {}", upload.file_name, err);
                    outcome.rejected.push(RejectedUpload {
                        file_name: upload.file_name,
                        reason: err.to_string(),
                    });
                }
            }
        }

        // join_all yields results in input order
        let encoded = join_all(valid.into_iter().map(|upload| async move {
            let data = upload.data.clone();
            let mime = upload.content_type.clone();
            let result = tokio::task::spawn_blocking(move || encode_data_url(&mime, &data))
                .await
                .map_err(|e| PhotoError::Encoding(e.to_string()));
            (upload, result)
        }))
        .await;

        for (upload, result) in encoded {
            match result {
                Ok(data_url) => {
                    self.last_figure += 1;
                    let photo = Photo {
                        id: Uuid::new_v4(),
                        size: upload.data.len(),
                        file_name: upload.file_name,
                        content_type: upload.content_type,
                        data: upload.data,
                        data_url: Arc::from(data_url),
                        figure: self.last_figure,
                        linked_item: None,
                    };
                    self.photos.push(photo.clone());
                    outcome.accepted.push(photo);
                }
                Err(err) => {
                    tracing::warn!("Failed to encode photo '{}': {}", upload.file_name, err);
                    outcome.rejected.push(RejectedUpload {
                        file_name: upload.file_name,
                        reason: err.to_string(),
                    });
                }
            }
        }

        Ok(outcome)
    }

    /// Link a photo to an item, replacing any previous link
    pub fn link(&mut self, photo_id: Uuid, item_id: Uuid) -> Result<(), PhotoError> {
        self.get_mut(photo_id)?.linked_item = Some(item_id);
        Ok(())
    }

    pub fn unlink(&mut self, photo_id: Uuid) -> Result<(), PhotoError> {
        self.get_mut(photo_id)?.linked_item = None;
        Ok(())
    }

    pub fn remove(&mut self, photo_id: Uuid) -> Result<Photo, PhotoError> {
        let index = self
            .photos
            .iter()
            .position(|photo| photo.id == photo_id)
            .ok_or(PhotoError::NotFound(photo_id))?;
        Ok(self.photos.remove(index))
    }

    /// Drop every link to `item_id`
    pub fn unlink_item(&mut self, item_id: Uuid) {
        for photo in &mut self.photos {
            if photo.linked_item == Some(item_id) {
                photo.linked_item = None;
            }
        }
    }

    pub fn clear_links(&mut self) {
        for photo in &mut self.photos {
            photo.linked_item = None;
        }
    }

    pub fn clear(&mut self) {
        self.photos.clear();
    }

    /// Photos linked to `item_id`, in figure order
    pub fn linked_to(&self, item_id: Uuid) -> Vec<&Photo> {
        self.photos
            .iter()
            .filter(|photo| photo.linked_item == Some(item_id))
            .collect()
    }

    /// All photos in figure order
    pub fn by_figure(&self) -> &[Photo] {
        &self.photos
    }
}

fn encode_data_url(mime: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, mime: &str, size: usize) -> PhotoUpload {
        PhotoUpload {
            file_name: name.to_string(),
            content_type: mime.to_string(),
            data: Bytes::from(vec![7u8; size]),
        }
    }

    fn manager() -> PhotoManager {
        PhotoManager::new(20, 5 * 1024 * 1024)
    }

    #[tokio::test]
    async fn test_figures_are_sequential_in_input_order() {
        let mut photos = manager();
        let outcome = photos
            .add_batch(vec![
                upload("a.jpg", "image/jpeg", 10),
                upload("b.png", "image/png", 2000),
                upload("c.webp", "image/webp", 5),
            ])
            .await
            .unwrap();

        let figures: Vec<(String, u32)> = outcome
            .accepted
            .iter()
            .map(|p| (p.file_name.clone(), p.figure))
            .collect();
        assert_eq!(
            figures,
            vec![
                ("a.jpg".to_string(), 1),
                ("b.png".to_string(), 2),
                ("c.webp".to_string(), 3)
            ]
        );
        assert!(outcome.accepted[0].data_url.starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn test_figures_are_never_reused() {
        let mut photos = manager();
        let first = photos
            .add_batch(vec![upload("a.jpg", "image/jpeg", 1), upload("b.jpg", "image/jpeg", 1)])
            .await
            .unwrap();
        photos.remove(first.accepted[1].id).unwrap();

        let second = photos
            .add_batch(vec![upload("c.jpg", "image/jpeg", 1)])
            .await
            .unwrap();
        assert_eq!(second.accepted[0].figure, 3);

        let figures: Vec<u32> = photos.by_figure().iter().map(|p| p.figure).collect();
        assert_eq!(figures, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_invalid_files_do_not_stop_the_batch() {
        let mut photos = PhotoManager::new(20, 100);
        let outcome = photos
            .add_batch(vec![
                upload("doc.pdf", "application/pdf", 10),
                upload("big.jpg", "image/jpeg", 101),
                upload("ok.png", "image/png", 100),
            ])
            .await
            .unwrap();

        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.accepted[0].figure, 1);
        assert_eq!(outcome.rejected.len(), 2);
        assert_eq!(outcome.rejected[0].file_name, "doc.pdf");
        assert!(outcome.rejected[0].reason.contains("Unsupported file type"));
        assert!(outcome.rejected[1].reason.contains("too large"));
    }

    #[tokio::test]
    async fn test_capacity_rejects_whole_batch() {
        let mut photos = PhotoManager::new(3, 1024);
        photos
            .add_batch(vec![upload("a.jpg", "image/jpeg", 1), upload("b.jpg", "image/jpeg", 1)])
            .await
            .unwrap();

        let err = photos
            .add_batch(vec![upload("c.jpg", "image/jpeg", 1), upload("d.jpg", "image/jpeg", 1)])
            .await
            .unwrap_err();
        assert_eq!(
            err,
            PhotoError::Capacity {
                max: 3,
                existing: 2,
                incoming: 2
            }
        );
        assert_eq!(photos.len(), 2);
    }

    #[tokio::test]
    async fn test_links() {
        let mut photos = manager();
        let outcome = photos
            .add_batch(vec![
                upload("a.jpg", "image/jpeg", 1),
                upload("b.jpg", "image/jpeg", 1),
                upload("c.jpg", "image/jpeg", 1),
            ])
            .await
            .unwrap();
        let ids: Vec<Uuid> = outcome.accepted.iter().map(|p| p.id).collect();
        let (item_a, item_b) = (Uuid::new_v4(), Uuid::new_v4());

        photos.link(ids[2], item_a).unwrap();
        photos.link(ids[0], item_a).unwrap();
        photos.link(ids[1], item_a).unwrap();
        // Relinking moves the photo
        photos.link(ids[1], item_b).unwrap();

        let linked: Vec<u32> = photos.linked_to(item_a).iter().map(|p| p.figure).collect();
        assert_eq!(linked, vec![1, 3]);

        photos.unlink_item(item_a);
        assert!(photos.linked_to(item_a).is_empty());
        assert_eq!(photos.linked_to(item_b).len(), 1);

        photos.clear_links();
        assert!(photos.by_figure().iter().all(|p| p.linked_item.is_none()));

        let missing = Uuid::new_v4();
        assert_eq!(photos.link(missing, item_a), Err(PhotoError::NotFound(missing)));
    }
}
