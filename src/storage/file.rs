use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

use super::{
    build_manifest, new_content_id, validate_content_id, validate_file_path, ContentStorage,
    StorageError,
};
use crate::content::{CanonicalLibrary, ContentManifest, ContentMetadata, H5PUser};

const MANIFEST_FILE: &str = "h5p.json";
const PARAMS_FILE: &str = "content.json";

/// Stores each content item as a directory `<root>/<id>/` holding `h5p.json`,
/// `content.json` and any media files
#[derive(Debug, Clone)]
pub struct FileContentStorage {
    root: PathBuf,
}

impl FileContentStorage {
    /// Open (and create if needed) the content directory
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        info!("Content storage at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn content_dir(&self, id: &str) -> Result<PathBuf, StorageError> {
        validate_content_id(id)?;
        Ok(self.root.join(id))
    }

    async fn read_json<T: DeserializeOwned>(&self, id: &str, file: &str) -> Result<T, StorageError> {
        let path = self.content_dir(id)?.join(file);
        let bytes = fs::read(&path).await.map_err(|e| not_found_or_io(e, id))?;
        serde_json::from_slice(&bytes).map_err(|source| StorageError::Corrupt {
            id: id.to_string(),
            source,
        })
    }

    async fn write_content(
        &self,
        dir: &Path,
        id: &str,
        manifest: &ContentManifest,
        params: &Value,
    ) -> Result<(), StorageError> {
        let corrupt = |source| StorageError::Corrupt {
            id: id.to_string(),
            source,
        };
        let manifest = serde_json::to_vec_pretty(manifest).map_err(corrupt)?;
        let params = serde_json::to_vec(params).map_err(corrupt)?;

        // Params first so a failed save never pairs a new manifest with old params
        write_replace(&dir.join(PARAMS_FILE), &params).await?;
        write_replace(&dir.join(MANIFEST_FILE), &manifest).await?;
        Ok(())
    }
}

/// Write through a sibling temp file and rename it over the target
async fn write_replace(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

fn not_found_or_io(err: std::io::Error, what: &str) -> StorageError {
    if err.kind() == ErrorKind::NotFound {
        StorageError::NotFound(what.to_string())
    } else {
        StorageError::Io(err)
    }
}

#[async_trait]
impl ContentStorage for FileContentStorage {
    async fn store_or_update(
        &self,
        existing_id: Option<&str>,
        params: &Value,
        metadata: &ContentMetadata,
        library: &CanonicalLibrary,
        user: &H5PUser,
    ) -> Result<String, StorageError> {
        match existing_id {
            Some(id) => {
                let dir = self.content_dir(id)?;
                let previous: ContentManifest = self.read_json(id, MANIFEST_FILE).await?;
                let manifest = build_manifest(metadata, library, user, Some(&previous))?;
                self.write_content(&dir, id, &manifest, params).await?;
                Ok(id.to_string())
            }
            None => {
                let manifest = build_manifest(metadata, library, user, None)?;
                let id = new_content_id();
                let dir = self.content_dir(&id)?;
                fs::create_dir_all(&dir).await?;
                self.write_content(&dir, &id, &manifest, params).await?;
                Ok(id)
            }
        }
    }

    async fn get_manifest(&self, id: &str) -> Result<ContentManifest, StorageError> {
        self.read_json(id, MANIFEST_FILE).await
    }

    async fn get_parameters(&self, id: &str) -> Result<Value, StorageError> {
        self.read_json(id, PARAMS_FILE).await
    }

    async fn list(&self) -> Result<Vec<(String, ContentManifest)>, StorageError> {
        let mut entries = fs::read_dir(&self.root).await?;
        let mut contents = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let Some(id) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if validate_content_id(&id).is_err() {
                continue;
            }
            match self.get_manifest(&id).await {
                Ok(manifest) => contents.push((id, manifest)),
                // Directories without a manifest are not content
                Err(StorageError::NotFound(_)) => {}
                Err(e) => warn!("Skipping unreadable content {}: {}", id, e),
            }
        }

        contents.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(contents)
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        let dir = self.content_dir(id)?;
        fs::remove_dir_all(&dir)
            .await
            .map_err(|e| not_found_or_io(e, id))
    }

    async fn read_file(&self, id: &str, file: &str) -> Result<Vec<u8>, StorageError> {
        validate_file_path(file)?;
        let path = self.content_dir(id)?.join(file);
        fs::read(&path)
            .await
            .map_err(|e| not_found_or_io(e, &format!("{}/{}", id, file)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn blanks() -> CanonicalLibrary {
        CanonicalLibrary::normalize("H5P.Blanks-1.14")
    }

    #[tokio::test]
    async fn test_writes_h5p_layout() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileContentStorage::new(dir.path()).await.unwrap();

        let params = json!({"text": "*blank*"});
        let metadata = ContentMetadata {
            title: "Quiz".to_string(),
            language: Some("en".to_string()),
        };
        let id = storage
            .store_or_update(None, &params, &metadata, &blanks(), &H5PUser::anonymous())
            .await
            .unwrap();

        let manifest: Value =
            serde_json::from_slice(&std::fs::read(dir.path().join(&id).join("h5p.json")).unwrap()).unwrap();
        assert_eq!(manifest["title"], "Quiz");
        assert_eq!(manifest["mainLibrary"], "H5P.Blanks");
        assert_eq!(manifest["language"], "en");
        assert_eq!(
            manifest["preloadedDependencies"],
            json!([{"machineName": "H5P.Blanks", "majorVersion": 1, "minorVersion": 14}])
        );

        assert_eq!(storage.get_parameters(&id).await.unwrap(), params);
        assert_eq!(storage.read_file(&id, "content.json").await.unwrap(), br#"{"text":"*blank*"}"#.to_vec());
        assert!(storage.read_file(&id, "h5p.json").await.is_ok());
    }

    #[tokio::test]
    async fn test_update_keeps_media_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileContentStorage::new(dir.path()).await.unwrap();
        let user = H5PUser::anonymous();

        let id = storage
            .store_or_update(None, &json!({}), &ContentMetadata::titled("v1"), &blanks(), &user)
            .await
            .unwrap();
        std::fs::create_dir_all(dir.path().join(&id).join("images")).unwrap();
        std::fs::write(dir.path().join(&id).join("images/cat.png"), [7u8, 8, 9]).unwrap();

        storage
            .store_or_update(Some(&id), &json!({"v": 2}), &ContentMetadata::titled("v2"), &blanks(), &user)
            .await
            .unwrap();

        assert_eq!(storage.get_manifest(&id).await.unwrap().title, "v2");
        assert_eq!(storage.read_file(&id, "images/cat.png").await.unwrap(), vec![7, 8, 9]);
    }

    #[tokio::test]
    async fn test_failed_params_write_keeps_previous_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileContentStorage::new(dir.path()).await.unwrap();
        let user = H5PUser::anonymous();

        let id = storage
            .store_or_update(None, &json!({"v": 1}), &ContentMetadata::titled("v1"), &blanks(), &user)
            .await
            .unwrap();

        // A directory in place of content.json makes the params rename fail
        let params_path = dir.path().join(&id).join("content.json");
        std::fs::remove_file(&params_path).unwrap();
        std::fs::create_dir(&params_path).unwrap();

        let result = storage
            .store_or_update(Some(&id), &json!({"v": 2}), &ContentMetadata::titled("v2"), &blanks(), &user)
            .await;
        assert!(matches!(result, Err(StorageError::Io(_))));
        assert_eq!(storage.get_manifest(&id).await.unwrap().title, "v1");
        assert!(!dir.path().join(&id).join("content.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_unknown_and_invalid_ids() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileContentStorage::new(dir.path()).await.unwrap();
        let user = H5PUser::anonymous();

        let missing = storage
            .store_or_update(Some("missing"), &json!({}), &ContentMetadata::titled("x"), &blanks(), &user)
            .await;
        assert!(matches!(missing, Err(StorageError::NotFound(_))));

        let traversal = storage.get_manifest("../outside").await;
        assert!(matches!(traversal, Err(StorageError::Forbidden(_))));
        assert!(matches!(storage.delete("missing").await, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_skips_foreign_directories() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileContentStorage::new(dir.path()).await.unwrap();
        let user = H5PUser::anonymous();

        let a = storage
            .store_or_update(None, &json!({}), &ContentMetadata::titled("A"), &blanks(), &user)
            .await
            .unwrap();
        let b = storage
            .store_or_update(None, &json!({}), &ContentMetadata::titled("B"), &blanks(), &user)
            .await
            .unwrap();
        std::fs::create_dir_all(dir.path().join("not-content")).unwrap();
        std::fs::write(dir.path().join("stray.txt"), "x").unwrap();

        let listed = storage.list().await.unwrap();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(listed.into_iter().map(|(id, _)| id).collect::<Vec<_>>(), expected);

        storage.delete(&expected[0]).await.unwrap();
        assert_eq!(storage.list().await.unwrap().len(), 1);
    }
}
