use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::content::{get_path, set_path, ContentError, ContentPath, Section, SiteContent};
use crate::repository::{ContentRepository, ObjectStore, StoredObject};
use crate::{CoreError, CoreResult};

/// An image as received from an upload form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Path-addressed reads and writes over the per-section documents
#[derive(Clone)]
pub struct ContentService {
    repo: Arc<dyn ContentRepository>,
    objects: Arc<dyn ObjectStore>,
    max_upload_bytes: usize,
}

impl ContentService {
    pub fn new(
        repo: Arc<dyn ContentRepository>,
        objects: Arc<dyn ObjectStore>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            repo,
            objects,
            max_upload_bytes,
        }
    }

    /// The stored document, or the section's built-in copy if none is saved.
    pub async fn document(&self, section: &str) -> CoreResult<Value> {
        let section: Section = section.parse()?;
        let stored = self.repo.get_section(section.as_str()).await?;
        Ok(stored
            .map(|s| s.content)
            .unwrap_or_else(|| section.default_document()))
    }

    pub async fn value_at(&self, section: &str, path: &str) -> CoreResult<Value> {
        let path: ContentPath = path.parse()?;
        let doc = self.document(section).await?;
        get_path(&doc, &path)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("{}.{}", section, path)))
    }

    pub async fn replace(&self, section: &str, doc: Value, user: Uuid) -> CoreResult<SiteContent> {
        let section: Section = section.parse()?;
        section.validate(&doc)?;
        let saved = self.repo.put_section(section.as_str(), &doc, user).await?;
        info!(%section, %user, "Content replaced");
        Ok(saved)
    }

    pub async fn set_value(
        &self,
        section: &str,
        path: &str,
        value: Value,
        user: Uuid,
    ) -> CoreResult<SiteContent> {
        let path: ContentPath = path.parse()?;
        let section: Section = section.parse()?;
        let doc = self.with_value(section, &path, value).await?;
        let saved = self.repo.put_section(section.as_str(), &doc, user).await?;
        info!(%section, %path, %user, "Content field updated");
        Ok(saved)
    }

    /// Store an image and write its public URL at `path`.
    ///
    /// The stored object is removed again if the document cannot be saved.
    pub async fn upload_image(
        &self,
        section: &str,
        path: &str,
        upload: ImageUpload,
        user: Uuid,
    ) -> CoreResult<(StoredObject, SiteContent)> {
        let path: ContentPath = path.parse()?;
        let section: Section = section.parse()?;

        if !path.is_image_slot() {
            return Err(ContentError::InvalidUpload(format!(
                "'{}' is not an image field",
                path
            ))
            .into());
        }
        if !upload.content_type.starts_with("image/") {
            return Err(ContentError::InvalidUpload(format!(
                "expected an image, got {}",
                upload.content_type
            ))
            .into());
        }
        if upload.bytes.is_empty() {
            return Err(ContentError::InvalidUpload("file is empty".to_string()).into());
        }
        if upload.bytes.len() > self.max_upload_bytes {
            return Err(ContentError::UploadTooLarge(self.max_upload_bytes).into());
        }

        // Make sure the URL can land before storing anything.
        self.with_value(section, &path, Value::String(String::new()))
            .await?;

        let extension = image_extension(upload.file_name.as_deref(), &upload.content_type);
        let stored = self
            .objects
            .put_object(&extension, &upload.content_type, upload.bytes)
            .await?;

        let saved = match self.save_url(section, &path, &stored, user).await {
            Ok(saved) => saved,
            Err(e) => {
                if let Err(cleanup) = self.objects.delete_object(&stored.key).await {
                    warn!(key = %stored.key, "Failed to remove orphaned upload: {}", cleanup);
                }
                return Err(e);
            }
        };
        info!(%section, %path, key = %stored.key, "Image uploaded");
        Ok((stored, saved))
    }

    async fn save_url(
        &self,
        section: Section,
        path: &ContentPath,
        stored: &StoredObject,
        user: Uuid,
    ) -> CoreResult<SiteContent> {
        let doc = self
            .with_value(section, path, Value::String(stored.public_url.clone()))
            .await?;
        self.repo.put_section(section.as_str(), &doc, user).await
    }

    async fn with_value(&self, section: Section, path: &ContentPath, value: Value) -> CoreResult<Value> {
        let mut doc = self.document(section.as_str()).await?;
        set_path(&mut doc, path, value)?;
        section.validate(&doc)?;
        Ok(doc)
    }
}

/// File extension for a stored image: the uploaded name's, if sane, else
/// one derived from the content type.
pub fn image_extension(file_name: Option<&str>, content_type: &str) -> String {
    let from_name = file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    from_name.unwrap_or_else(|| {
        match content_type {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/webp" => "webp",
            "image/gif" => "gif",
            "image/svg+xml" => "svg",
            _ => "bin",
        }
        .to_string()
    })
}
