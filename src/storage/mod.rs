// Content storage: persistence of saved content behind a trait so the service
// can run against the H5P on-disk layout or a process-local map.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Component, Path};
use thiserror::Error;
use uuid::Uuid;

use crate::content::{
    CanonicalLibrary, ContentManifest, ContentMetadata, H5PUser, LibraryError, LibraryName,
};

pub mod file;
pub mod memory;

pub use file::FileContentStorage;
pub use memory::MemoryContentStorage;

/// Errors from content storage backends
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Content not found: {0}")]
    NotFound(String),

    #[error("Forbidden path: {0}")]
    Forbidden(String),

    #[error(transparent)]
    InvalidLibrary(#[from] LibraryError),

    #[error("Corrupt content {id}: {source}")]
    Corrupt {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait ContentStorage: Send + Sync {
    /// Create content (no id) or overwrite existing content, returning its id
    async fn store_or_update(
        &self,
        existing_id: Option<&str>,
        params: &Value,
        metadata: &ContentMetadata,
        library: &CanonicalLibrary,
        user: &H5PUser,
    ) -> Result<String, StorageError>;

    async fn get_manifest(&self, id: &str) -> Result<ContentManifest, StorageError>;

    async fn get_parameters(&self, id: &str) -> Result<Value, StorageError>;

    /// All stored content, ordered by id
    async fn list(&self) -> Result<Vec<(String, ContentManifest)>, StorageError>;

    async fn delete(&self, id: &str) -> Result<(), StorageError>;

    /// Read a file stored alongside the content (images, audio, ...)
    async fn read_file(&self, id: &str, file: &str) -> Result<Vec<u8>, StorageError>;
}

pub fn new_content_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Content ids double as directory names
pub fn validate_content_id(id: &str) -> Result<(), StorageError> {
    let valid = !id.is_empty()
        && id.len() <= 64
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::Forbidden(id.to_string()))
    }
}

/// Relative file paths made of plain segments only
pub fn validate_file_path(file: &str) -> Result<(), StorageError> {
    let invalid = file.is_empty()
        || file.contains('\0')
        || file.contains('\\')
        || file.contains(':')
        || !Path::new(file)
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if invalid {
        Err(StorageError::Forbidden(file.to_string()))
    } else {
        Ok(())
    }
}

/// Manifest written on save. Authors of earlier versions are kept when the
/// current caller is anonymous.
pub fn build_manifest(
    metadata: &ContentMetadata,
    library: &CanonicalLibrary,
    user: &H5PUser,
    previous: Option<&ContentManifest>,
) -> Result<ContentManifest, StorageError> {
    let library = LibraryName::parse(library.as_str())?;
    let mut manifest = ContentManifest::for_save(metadata, &library, user);
    if manifest.authors.is_empty() {
        if let Some(previous) = previous {
            manifest.authors = previous.authors.clone();
        }
    }
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_content_id() {
        assert!(validate_content_id("abc123").is_ok());
        assert!(validate_content_id(&new_content_id()).is_ok());
        assert!(validate_content_id("a-b_c").is_ok());
        assert!(matches!(validate_content_id(""), Err(StorageError::Forbidden(_))));
        assert!(matches!(validate_content_id("../etc"), Err(StorageError::Forbidden(_))));
        assert!(matches!(validate_content_id("a/b"), Err(StorageError::Forbidden(_))));
    }

    #[test]
    fn test_validate_file_path() {
        assert!(validate_file_path("images/cat.png").is_ok());
        assert!(validate_file_path("content.json").is_ok());
        assert!(validate_file_path("a..b.png").is_ok());
        assert!(validate_file_path("images/my..photo.png").is_ok());
        assert!(validate_file_path("a/../b").is_err());
        assert!(validate_file_path("./content.json").is_err());
        assert!(validate_file_path("../h5p.json").is_err());
        assert!(validate_file_path("images/../../secret").is_err());
        assert!(validate_file_path("/etc/passwd").is_err());
        assert!(validate_file_path("C:\\Windows").is_err());
        assert!(validate_file_path("").is_err());
    }

    #[test]
    fn test_build_manifest() {
        let metadata = ContentMetadata {
            title: "Quiz".to_string(),
            language: Some("de".to_string()),
        };
        let library = CanonicalLibrary::normalize("H5P.Blanks 1.14");
        let user = H5PUser {
            id: "7".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            user_type: "local".to_string(),
        };

        let manifest = build_manifest(&metadata, &library, &user, None).unwrap();
        assert_eq!(manifest.title, "Quiz");
        assert_eq!(manifest.main_library, "H5P.Blanks");
        assert_eq!(manifest.language, "de");
        assert_eq!(manifest.preloaded_dependencies, vec![LibraryName::new("H5P.Blanks", 1, 14)]);
        assert_eq!(manifest.authors.len(), 1);

        let updated = build_manifest(&metadata, &library, &H5PUser::anonymous(), Some(&manifest)).unwrap();
        assert_eq!(updated.authors, manifest.authors);
    }

    #[test]
    fn test_build_manifest_rejects_opaque_library() {
        let metadata = ContentMetadata::titled("Quiz");
        let library = CanonicalLibrary::normalize("not-a-library");
        let result = build_manifest(&metadata, &library, &H5PUser::anonymous(), None);
        assert!(matches!(result, Err(StorageError::InvalidLibrary(_))));
    }
}
