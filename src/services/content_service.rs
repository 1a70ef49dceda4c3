use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

use crate::content::{
    create_slug, embed_code, main_library_version, normalize_with_depth, resolve_user,
    ContentManifest, ContentParams, ContentParamsMetadata, ContentSummary, H5PUser,
    NormalizeError, SaveResult, DEFAULT_MAX_PARAMS_DEPTH,
};
use crate::storage::{ContentStorage, StorageError};

#[derive(Debug, Error)]
pub enum ContentError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A content file ready to be served
#[derive(Debug, Clone)]
pub struct ContentFile {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// Save and read-back operations on H5P content
#[derive(Clone)]
pub struct ContentService {
    storage: Arc<dyn ContentStorage>,
    max_params_depth: usize,
    public_url: String,
}

impl ContentService {
    pub fn new(storage: Arc<dyn ContentStorage>) -> Self {
        Self {
            storage,
            max_params_depth: DEFAULT_MAX_PARAMS_DEPTH,
            public_url: String::new(),
        }
    }

    pub fn with_max_params_depth(mut self, max_params_depth: usize) -> Self {
        self.max_params_depth = max_params_depth;
        self
    }

    /// Base URL used in embed snippets
    pub fn with_public_url(mut self, public_url: impl Into<String>) -> Self {
        self.public_url = public_url.into();
        self
    }

    /// Normalize a raw save payload and hand it to storage.
    ///
    /// Nothing is written when no library can be resolved.
    pub async fn save_content(
        &self,
        raw: &Value,
        user: Option<H5PUser>,
    ) -> Result<SaveResult, ContentError> {
        let request = normalize_with_depth(raw, self.max_params_depth).map_err(|e| {
            error!(keys = ?payload_keys(raw), "Failed to save content: missing library");
            e
        })?;
        let user = resolve_user(user);

        let id = self
            .storage
            .store_or_update(
                request.content_id.as_deref(),
                &request.params,
                &request.metadata,
                &request.library,
                &user,
            )
            .await
            .map_err(|e| {
                error!("Failed to save content: {}", e);
                e
            })?;

        info!(
            content_id = %id,
            library = %request.library,
            updated = request.content_id.is_some(),
            user = %user.id,
            "Saved content"
        );
        Ok(SaveResult { id })
    }

    /// Parameters and metadata the editor needs to reopen content
    pub async fn get_content_params(&self, id: &str) -> Result<ContentParams, ContentError> {
        let manifest = self.storage.get_manifest(id).await?;
        let params = self.storage.get_parameters(id).await?;

        Ok(ContentParams {
            library: main_library_version(&manifest),
            params,
            metadata: ContentParamsMetadata {
                title: manifest.title,
                license: Some(manifest.license),
            },
        })
    }

    pub async fn list_contents(&self) -> Result<Vec<ContentSummary>, ContentError> {
        let contents = self.storage.list().await?;
        Ok(contents
            .into_iter()
            .map(|(id, manifest)| self.summarize(id, &manifest))
            .collect())
    }

    pub async fn get_content(&self, id: &str) -> Result<ContentSummary, ContentError> {
        let manifest = self.storage.get_manifest(id).await?;
        Ok(self.summarize(id.to_string(), &manifest))
    }

    pub async fn delete_content(&self, id: &str) -> Result<(), ContentError> {
        self.storage.delete(id).await?;
        info!(content_id = %id, "Deleted content");
        Ok(())
    }

    pub async fn get_content_file(&self, id: &str, file: &str) -> Result<ContentFile, ContentError> {
        let file = resolve_content_file_path(file);
        let data = self.storage.read_file(id, file).await?;
        let mime_type = mime_guess::from_path(file)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(ContentFile { data, mime_type })
    }

    /// Storage is reachable and readable
    pub async fn health_check(&self) -> Result<(), ContentError> {
        self.storage.list().await?;
        Ok(())
    }

    fn summarize(&self, id: String, manifest: &ContentManifest) -> ContentSummary {
        let slug = create_slug(&manifest.title);
        ContentSummary {
            embed_code: embed_code(&self.public_url, &slug),
            library: main_library_version(manifest),
            title: manifest.title.clone(),
            slug,
            id,
        }
    }
}

/// The player requests `content/<file>`; files live next to `content.json`
pub fn resolve_content_file_path(file: &str) -> &str {
    if file == "content/content.json" {
        "content.json"
    } else {
        file.strip_prefix("content/").unwrap_or(file)
    }
}

fn payload_keys(raw: &Value) -> Vec<&str> {
    raw.as_object()
        .map(|fields| fields.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryContentStorage;
    use serde_json::json;

    fn service() -> (ContentService, Arc<MemoryContentStorage>) {
        let storage = Arc::new(MemoryContentStorage::new());
        let service = ContentService::new(storage.clone()).with_public_url("http://cms.local");
        (service, storage)
    }

    #[tokio::test]
    async fn test_save_then_get_params() {
        let (service, _) = service();
        let raw = json!({
            "library": "H5P.Blanks-1.14",
            "params": "{\"params\":{\"text\":\"*a*\"},\"metadata\":{\"title\":\"Blanks\"}}"
        });

        let saved = service.save_content(&raw, None).await.unwrap();
        let params = service.get_content_params(&saved.id).await.unwrap();

        assert_eq!(params.library.as_deref(), Some("H5P.Blanks 1.14"));
        assert_eq!(params.params, json!({"text": "*a*"}));
        assert_eq!(params.metadata.title, "Blanks");
        assert_eq!(params.metadata.license.as_deref(), Some("U"));
    }

    #[tokio::test]
    async fn test_missing_library_writes_nothing() {
        let (service, storage) = service();
        let result = service
            .save_content(&json!({"params": {"text": "x"}, "title": "No type"}), None)
            .await;

        assert!(matches!(result, Err(ContentError::Normalize(NormalizeError::MissingLibrary))));
        assert!(storage.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_through_content_id() {
        let (service, _) = service();
        let first = service
            .save_content(&json!({"library": "H5P.Blanks 1.14", "title": "One"}), None)
            .await
            .unwrap();
        let second = service
            .save_content(
                &json!({"data": {"library": "H5P.Blanks 1.14", "title": "Two", "contentId": first.id.clone()}}),
                None,
            )
            .await
            .unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(service.get_content(&first.id).await.unwrap().title, "Two");
        assert_eq!(service.list_contents().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_summary_and_delete() {
        let (service, _) = service();
        let saved = service
            .save_content(&json!({"library": "H5P.Blanks 1.14", "title": "My Quiz!"}), None)
            .await
            .unwrap();

        let summary = service.get_content(&saved.id).await.unwrap();
        assert_eq!(summary.slug, "my-quiz");
        assert_eq!(summary.library.as_deref(), Some("H5P.Blanks 1.14"));
        assert!(summary.embed_code.contains("http://cms.local/api/h5p/content/my-quiz/embed"));

        service.delete_content(&saved.id).await.unwrap();
        assert!(matches!(
            service.get_content(&saved.id).await,
            Err(ContentError::Storage(StorageError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_content_file_paths_and_mime() {
        let (service, storage) = service();
        let saved = service
            .save_content(&json!({"library": "H5P.Blanks 1.14", "params": {"a": 1}}), None)
            .await
            .unwrap();
        storage.put_file(&saved.id, "images/cat.png", vec![1]).await.unwrap();

        let image = service.get_content_file(&saved.id, "content/images/cat.png").await.unwrap();
        assert_eq!(image.data, vec![1]);
        assert_eq!(image.mime_type, "image/png");

        let params = service.get_content_file(&saved.id, "content/content.json").await.unwrap();
        assert_eq!(params.mime_type, "application/json");
        assert_eq!(params.data, br#"{"a":1}"#.to_vec());
    }

    #[test]
    fn test_resolve_content_file_path() {
        assert_eq!(resolve_content_file_path("content/content.json"), "content.json");
        assert_eq!(resolve_content_file_path("content/images/a.png"), "images/a.png");
        assert_eq!(resolve_content_file_path("images/a.png"), "images/a.png");
    }
}
