use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;
use std::str::FromStr;

use super::types::ContentManifest;

/// `H5P.Blanks-1.14` style identifiers (ASCII word characters and dots, then a version)
static HYPHEN_VERSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9_.]+)-([0-9]+\.[0-9]+)$").expect("hyphen version pattern")
});

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LibraryError {
    #[error("Invalid library identifier: '{0}'")]
    Invalid(String),
}

/// Library identifier in canonical `"<machineName> <major>.<minor>"` form.
///
/// Strings that do not look like either known shape are kept as-is, so this
/// may also carry an opaque identifier the storage layer has to judge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CanonicalLibrary(String);

impl CanonicalLibrary {
    /// Rewrite `name-major.minor` to `name major.minor`, pass anything else through
    pub fn normalize(value: &str) -> Self {
        match HYPHEN_VERSION.captures(value) {
            Some(caps) => Self(format!("{} {}", &caps[1], &caps[2])),
            None => Self(value.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A library name split into its parts, as found in `preloadedDependencies`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryName {
    pub machine_name: String,
    pub major_version: u32,
    pub minor_version: u32,
}

impl LibraryName {
    pub fn new(machine_name: impl Into<String>, major_version: u32, minor_version: u32) -> Self {
        Self {
            machine_name: machine_name.into(),
            major_version,
            minor_version,
        }
    }

    /// Parse a canonical library string. Hyphenated forms are accepted too.
    pub fn parse(value: &str) -> Result<Self, LibraryError> {
        let canonical = CanonicalLibrary::normalize(value.trim());
        let invalid = || LibraryError::Invalid(value.to_string());

        let (name, version) = canonical.as_str().split_once(' ').ok_or_else(invalid)?;
        let (major, minor) = version.split_once('.').ok_or_else(invalid)?;

        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(invalid());
        }

        Ok(Self {
            machine_name: name.to_string(),
            major_version: major.parse().map_err(|_| invalid())?,
            minor_version: minor.parse().map_err(|_| invalid())?,
        })
    }
}

impl FromStr for LibraryName {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for LibraryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}.{}", self.machine_name, self.major_version, self.minor_version)
    }
}

/// Build `"<machineName> <major>.<minor>"` from the object form
/// `{machineName, majorVersion, minorVersion}`.
///
/// Returns `None` unless the machine name is a non-empty string and both
/// versions are JSON numbers.
pub fn build_library(value: &Value) -> Option<String> {
    let machine_name = value.get("machineName")?.as_str().filter(|s| !s.is_empty())?;
    let major = value.get("majorVersion")?.as_number()?;
    let minor = value.get("minorVersion")?.as_number()?;

    Some(format!(
        "{} {}.{}",
        machine_name,
        format_number(major),
        format_number(minor)
    ))
}

// Integral floats print without a fraction (1.0 -> "1")
pub(crate) fn format_number(n: &Number) -> String {
    if let Some(v) = n.as_u64() {
        return v.to_string();
    }
    if let Some(v) = n.as_i64() {
        return v.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// Reconstruct the versioned main library of stored content.
///
/// The version comes from the matching `preloadedDependencies` entry and
/// defaults to 1.0 when the manifest does not list one.
pub fn main_library_version(manifest: &ContentManifest) -> Option<String> {
    if manifest.main_library.is_empty() {
        return None;
    }

    let dependency = manifest
        .preloaded_dependencies
        .iter()
        .find(|d| d.machine_name == manifest.main_library);

    let major = dependency.map(|d| d.major_version).unwrap_or(1);
    let minor = dependency.map(|d| d.minor_version).unwrap_or(0);

    Some(format!("{} {}.{}", manifest.main_library, major, minor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_rewrites_hyphen_version() {
        assert_eq!(CanonicalLibrary::normalize("H5P.Blanks-1.14").as_str(), "H5P.Blanks 1.14");
        assert_eq!(
            CanonicalLibrary::normalize("H5P.Multi_Choice-10.2").as_str(),
            "H5P.Multi_Choice 10.2"
        );
    }

    #[test]
    fn test_normalize_passes_other_strings_through() {
        assert_eq!(CanonicalLibrary::normalize("H5P.Blanks 1.14").as_str(), "H5P.Blanks 1.14");
        assert_eq!(CanonicalLibrary::normalize("H5P.Blanks-1").as_str(), "H5P.Blanks-1");
        assert_eq!(CanonicalLibrary::normalize("H5P.Blanks-1.14.3").as_str(), "H5P.Blanks-1.14.3");
        assert_eq!(CanonicalLibrary::normalize("some opaque id").as_str(), "some opaque id");
    }

    #[test]
    fn test_build_library_from_object() {
        let value = json!({"machineName": "H5P.Blanks", "majorVersion": 1, "minorVersion": 14});
        assert_eq!(build_library(&value).as_deref(), Some("H5P.Blanks 1.14"));

        let floats = json!({"machineName": "H5P.Blanks", "majorVersion": 1.0, "minorVersion": 2.0});
        assert_eq!(build_library(&floats).as_deref(), Some("H5P.Blanks 1.2"));
    }

    #[test]
    fn test_build_library_requires_numeric_versions() {
        assert_eq!(build_library(&json!({"machineName": "H5P.Blanks"})), None);
        assert_eq!(
            build_library(&json!({"machineName": "H5P.Blanks", "majorVersion": "1", "minorVersion": 14})),
            None
        );
        assert_eq!(
            build_library(&json!({"machineName": "", "majorVersion": 1, "minorVersion": 14})),
            None
        );
        assert_eq!(build_library(&json!("H5P.Blanks 1.14")), None);
    }

    #[test]
    fn test_library_name_parse() {
        let name: LibraryName = "H5P.Blanks 1.14".parse().unwrap();
        assert_eq!(name, LibraryName::new("H5P.Blanks", 1, 14));
        assert_eq!(name.to_string(), "H5P.Blanks 1.14");

        assert_eq!(LibraryName::parse("H5P.Blanks-1.14").unwrap(), LibraryName::new("H5P.Blanks", 1, 14));
        assert!(LibraryName::parse("H5P.Blanks").is_err());
        assert!(LibraryName::parse("H5P.Blanks 1").is_err());
        assert!(LibraryName::parse("H5P Blanks 1.14").is_err());
        assert!(LibraryName::parse(" 1.14").is_err());
    }

    #[test]
    fn test_main_library_version() {
        let mut manifest = ContentManifest::new("Quiz", "H5P.Blanks");
        assert_eq!(main_library_version(&manifest).as_deref(), Some("H5P.Blanks 1.0"));

        manifest.preloaded_dependencies = vec![
            LibraryName::new("H5P.Question", 1, 5),
            LibraryName::new("H5P.Blanks", 1, 14),
        ];
        assert_eq!(main_library_version(&manifest).as_deref(), Some("H5P.Blanks 1.14"));

        manifest.main_library = String::new();
        assert_eq!(main_library_version(&manifest), None);
    }
}
