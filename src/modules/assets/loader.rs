use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use base64::prelude::*;
use bytes::Bytes;
use image::DynamicImage;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Invalid data URL")]
    InvalidDataUrl,

    #[error("Asset path escapes the assets directory: {0}")]
    UnsafePath(String),

    #[error("Asset not found: {0}")]
    NotFound(String),

    #[error("Failed to fetch asset: {0}")]
    Fetch(String),

    #[error("Failed to read asset: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode image: {0}")]
    Decode(String),
}

/// Split a `data:<mime>;base64,<payload>` URL into its MIME type and bytes
pub fn decode_data_url(url: &str) -> Result<(String, Vec<u8>), AssetError> {
    let rest = url.strip_prefix("data:").ok_or(AssetError::InvalidDataUrl)?;
    let (header, payload) = rest.split_once(',').ok_or(AssetError::InvalidDataUrl)?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or(AssetError::InvalidDataUrl)?;

    let data = BASE64_STANDARD
        .decode(payload.trim())
        .map_err(|_| AssetError::InvalidDataUrl)?;

    Ok((mime.to_string(), data))
}

/// Resolves asset references to bytes or decoded images
pub struct AssetLoader {
    http_client: reqwest::Client,
    assets_dir: PathBuf,
}

impl AssetLoader {
    pub fn new(assets_dir: impl Into<PathBuf>, fetch_timeout: Duration) -> Result<Self, AssetError> {
        let http_client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .user_agent("GM-App/1.0 (report-generator)")
            .build()
            .map_err(|e| AssetError::Fetch(e.to_string()))?;

        Ok(Self {
            http_client,
            assets_dir: assets_dir.into(),
        })
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    /// Load the raw bytes behind a reference
    pub async fn load_bytes(&self, reference: &str) -> Result<Bytes, AssetError> {
        let reference = reference.trim();

        if reference.starts_with("data:") {
            let (_, data) = decode_data_url(reference)?;
            return Ok(Bytes::from(data));
        }

        if reference.starts_with("http://") || reference.starts_with("https://") {
            debug!("Fetching remote asset {}", reference);
            let response = self
                .http_client
                .get(reference)
                .send()
                .await
                .map_err(|e| AssetError::Fetch(e.to_string()))?;

            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Err(AssetError::NotFound(reference.to_string()));
            }
            if !response.status().is_success() {
                return Err(AssetError::Fetch(format!(
                    "{} returned status {}",
                    reference,
                    response.status()
                )));
            }

            return response
                .bytes()
                .await
                .map_err(|e| AssetError::Fetch(e.to_string()));
        }

        let path = self.resolve_path(reference)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AssetError::NotFound(reference.to_string()))
            }
            Err(e) => Err(AssetError::Io(e)),
        }
    }

    /// Load and decode an image; decoding runs on the blocking pool
    pub async fn load_image(&self, reference: &str) -> Result<DynamicImage, AssetError> {
        let data = self.load_bytes(reference).await?;
        decode_image(data).await
    }

    /// Map a relative reference such as `/relatorio-tecnico/logo.png` into the assets directory
    fn resolve_path(&self, reference: &str) -> Result<PathBuf, AssetError> {
        let relative = Path::new(reference.trim_start_matches('/'));
        if relative.as_os_str().is_empty() {
            return Err(AssetError::NotFound(reference.to_string()));
        }

        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => return Err(AssetError::UnsafePath(reference.to_string())),
            }
        }

        Ok(self.assets_dir.join(relative))
    }
}

/// Decode image bytes off the async runtime
pub async fn decode_image(data: Bytes) -> Result<DynamicImage, AssetError> {
    tokio::task::spawn_blocking(move || image::load_from_memory(&data))
        .await
        .map_err(|e| AssetError::Decode(e.to_string()))?
        .map_err(|e| AssetError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;
    use uuid::Uuid;

    fn png_bytes() -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::new(3, 2))
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn temp_assets_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gm-app-assets-{}", Uuid::new_v4()));
        std::fs::create_dir_all(dir.join("relatorio-tecnico")).unwrap();
        dir
    }

    fn loader(dir: &Path) -> AssetLoader {
        AssetLoader::new(dir, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_decode_data_url() {
        let url = format!("data:image/png;base64,{}", BASE64_STANDARD.encode(b"abc"));
        let (mime, data) = decode_data_url(&url).unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(data, b"abc");
    }

    #[test]
    fn test_decode_data_url_rejects_garbage() {
        assert!(matches!(
            decode_data_url("data:image/png,plain"),
            Err(AssetError::InvalidDataUrl)
        ));
        assert!(matches!(
            decode_data_url("image/png;base64,abc"),
            Err(AssetError::InvalidDataUrl)
        ));
        assert!(matches!(
            decode_data_url("data:image/png;base64,***"),
            Err(AssetError::InvalidDataUrl)
        ));
    }

    #[tokio::test]
    async fn test_load_image_from_data_url() {
        let dir = std::env::temp_dir();
        let url = format!("data:image/png;base64,{}", BASE64_STANDARD.encode(png_bytes()));

        let image = loader(&dir).load_image(&url).await.unwrap();
        assert_eq!((image.width(), image.height()), (3, 2));
    }

    #[tokio::test]
    async fn test_load_from_assets_dir() {
        let dir = temp_assets_dir();
        std::fs::write(dir.join("relatorio-tecnico/logo.png"), png_bytes()).unwrap();

        let image = loader(&dir)
            .load_image("/relatorio-tecnico/logo.png")
            .await
            .unwrap();
        assert_eq!(image.width(), 3);

        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = temp_assets_dir();
        let result = loader(&dir).load_bytes("/relatorio-tecnico/fundo-pdf.jpg").await;
        assert!(matches!(result, Err(AssetError::NotFound(_))));
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn test_parent_traversal_rejected() {
        let dir = temp_assets_dir();
        let result = loader(&dir).load_bytes("../etc/passwd").await;
        assert!(matches!(result, Err(AssetError::UnsafePath(_))));
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn test_undecodable_bytes() {
        let dir = temp_assets_dir();
        std::fs::write(dir.join("relatorio-tecnico/logo.png"), b"not an image").unwrap();

        let result = loader(&dir).load_image("relatorio-tecnico/logo.png").await;
        assert!(matches!(result, Err(AssetError::Decode(_))));
        std::fs::remove_dir_all(dir).ok();
    }
}
