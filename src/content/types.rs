//! Content types shared by the normalizer, the storage layer and the HTTP handlers

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::library::{CanonicalLibrary, LibraryName};

pub const DEFAULT_TITLE: &str = "Untitled";
pub const DEFAULT_LANGUAGE: &str = "und";
pub const DEFAULT_LICENSE: &str = "U";

/// Metadata handed to storage on save. `language` is only present when it
/// passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentMetadata {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl ContentMetadata {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            language: None,
        }
    }
}

/// Result of normalizing a raw save payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalSaveRequest {
    /// Present when the caller is updating existing content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
    pub library: CanonicalLibrary,
    pub params: Value,
    pub metadata: ContentMetadata,
}

/// Identity of the caller performing a content operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct H5PUser {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(rename = "type")]
    pub user_type: String,
}

impl H5PUser {
    pub fn anonymous() -> Self {
        Self {
            id: "anonymous".to_string(),
            name: "Anonymous".to_string(),
            email: "anonymous@example.com".to_string(),
            user_type: "local".to_string(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.id == "anonymous"
    }
}

/// Fall back to the anonymous user when no caller was identified
pub fn resolve_user(user: Option<H5PUser>) -> H5PUser {
    user.unwrap_or_else(H5PUser::anonymous)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentAuthor {
    pub name: String,
    pub role: String,
}

/// Stored content metadata (the `h5p.json` of a content directory)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentManifest {
    pub title: String,
    #[serde(default)]
    pub main_library: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_license")]
    pub license: String,
    #[serde(default = "default_embed_types")]
    pub embed_types: Vec<String>,
    #[serde(default)]
    pub preloaded_dependencies: Vec<LibraryName>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<ContentAuthor>,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

fn default_license() -> String {
    DEFAULT_LICENSE.to_string()
}

fn default_embed_types() -> Vec<String> {
    vec!["iframe".to_string()]
}

impl ContentManifest {
    pub fn new(title: impl Into<String>, main_library: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            main_library: main_library.into(),
            language: default_language(),
            license: default_license(),
            embed_types: default_embed_types(),
            preloaded_dependencies: Vec::new(),
            authors: Vec::new(),
        }
    }

    /// Manifest for a save: the main library is also the single preloaded dependency
    pub fn for_save(metadata: &ContentMetadata, library: &LibraryName, user: &H5PUser) -> Self {
        let mut manifest = Self::new(metadata.title.clone(), library.machine_name.clone());
        if let Some(language) = &metadata.language {
            manifest.language = language.clone();
        }
        manifest.preloaded_dependencies = vec![library.clone()];
        if !user.is_anonymous() {
            manifest.authors = vec![ContentAuthor {
                name: user.name.clone(),
                role: "Author".to_string(),
            }];
        }
        manifest
    }
}

/// Parameters and metadata returned to the editor when it reopens content
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library: Option<String>,
    pub params: Value,
    pub metadata: ContentParamsMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentParamsMetadata {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
}

/// Listing entry for stored content
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSummary {
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library: Option<String>,
    pub embed_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveResult {
    pub id: String,
}
