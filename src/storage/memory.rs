use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::{build_manifest, new_content_id, validate_file_path, ContentStorage, StorageError};
use crate::content::{CanonicalLibrary, ContentManifest, ContentMetadata, H5PUser};

#[derive(Debug, Clone)]
struct StoredContent {
    manifest: ContentManifest,
    params: Value,
    files: HashMap<String, Vec<u8>>,
}

/// Process-local content storage, used for tests and throwaway instances
#[derive(Debug, Default)]
pub struct MemoryContentStorage {
    contents: RwLock<BTreeMap<String, StoredContent>>,
}

impl MemoryContentStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a media file to existing content
    pub async fn put_file(&self, id: &str, file: &str, data: Vec<u8>) -> Result<(), StorageError> {
        validate_file_path(file)?;
        let mut contents = self.contents.write().await;
        let stored = contents
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        stored.files.insert(file.to_string(), data);
        Ok(())
    }
}

#[async_trait]
impl ContentStorage for MemoryContentStorage {
    async fn store_or_update(
        &self,
        existing_id: Option<&str>,
        params: &Value,
        metadata: &ContentMetadata,
        library: &CanonicalLibrary,
        user: &H5PUser,
    ) -> Result<String, StorageError> {
        let mut contents = self.contents.write().await;

        match existing_id {
            Some(id) => {
                let stored = contents
                    .get_mut(id)
                    .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
                stored.manifest = build_manifest(metadata, library, user, Some(&stored.manifest))?;
                stored.params = params.clone();
                Ok(id.to_string())
            }
            None => {
                let manifest = build_manifest(metadata, library, user, None)?;
                let id = new_content_id();
                contents.insert(
                    id.clone(),
                    StoredContent {
                        manifest,
                        params: params.clone(),
                        files: HashMap::new(),
                    },
                );
                Ok(id)
            }
        }
    }

    async fn get_manifest(&self, id: &str) -> Result<ContentManifest, StorageError> {
        self.contents
            .read()
            .await
            .get(id)
            .map(|stored| stored.manifest.clone())
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    async fn get_parameters(&self, id: &str) -> Result<Value, StorageError> {
        self.contents
            .read()
            .await
            .get(id)
            .map(|stored| stored.params.clone())
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    async fn list(&self) -> Result<Vec<(String, ContentManifest)>, StorageError> {
        Ok(self
            .contents
            .read()
            .await
            .iter()
            .map(|(id, stored)| (id.clone(), stored.manifest.clone()))
            .collect())
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        self.contents
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    async fn read_file(&self, id: &str, file: &str) -> Result<Vec<u8>, StorageError> {
        validate_file_path(file)?;
        let contents = self.contents.read().await;
        let stored = contents
            .get(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;

        let corrupt = |source| StorageError::Corrupt {
            id: id.to_string(),
            source,
        };
        match file {
            "content.json" => return serde_json::to_vec(&stored.params).map_err(corrupt),
            "h5p.json" => return serde_json::to_vec_pretty(&stored.manifest).map_err(corrupt),
            _ => {}
        }

        stored
            .files
            .get(file)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("{}/{}", id, file)))
    }
}
