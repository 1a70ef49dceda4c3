//! Save payload normalization.
//!
//! The editor, hand-written API clients and older integrations all post
//! content in slightly different shapes: the body may be JSON-encoded twice,
//! wrapped in a `{data: ...}` envelope, name the library through one of
//! several fields, or nest `params`/`metadata` inside `params`. This module
//! reduces all of them to a [`CanonicalSaveRequest`].
//!
//! The only hard failure is a payload without any usable library. Everything
//! else falls back to defaults.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::borrow::Cow;

use super::library::{build_library, format_number, CanonicalLibrary};
use super::types::{CanonicalSaveRequest, ContentMetadata, DEFAULT_TITLE};

/// Maximum number of nested `params` levels searched for a library
pub const DEFAULT_MAX_PARAMS_DEPTH: usize = 10;

static LANGUAGE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-a-zA-Z]{1,10}$").expect("language code pattern"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("Missing library: unable to determine content type")]
    MissingLibrary,
}

struct Payload<'a> {
    fields: &'a Map<String, Value>,
    max_depth: usize,
}

type LibraryResolver = fn(&Payload<'_>) -> Option<String>;

/// Tried in order, first hit wins
const LIBRARY_RESOLVERS: &[(&str, LibraryResolver)] = &[
    ("library", library_string),
    ("mainLibrary", main_library_string),
    ("library object", library_object),
    ("mainLibrary object", main_library_object),
    ("ubername", ubername),
    ("libraryName", library_name),
    ("nested params", nested_params_library),
];

/// Normalize a raw save payload with the default nesting cap
pub fn normalize(raw: &Value) -> Result<CanonicalSaveRequest, NormalizeError> {
    normalize_with_depth(raw, DEFAULT_MAX_PARAMS_DEPTH)
}

/// Normalize a raw save payload, searching at most `max_depth` nested
/// `params` levels for the library.
pub fn normalize_with_depth(
    raw: &Value,
    max_depth: usize,
) -> Result<CanonicalSaveRequest, NormalizeError> {
    let decoded = decode_lenient(raw);
    let Some(fields) = unwrap_envelope(&decoded).as_object() else {
        return Err(NormalizeError::MissingLibrary);
    };
    let payload = Payload { fields, max_depth };

    let library = resolve_library(&payload)
        .map(|library| CanonicalLibrary::normalize(&library))
        .ok_or(NormalizeError::MissingLibrary)?;

    let parsed_params = fields.get("params").map(decode_lenient);
    let parsed_params = parsed_params.as_deref();
    let container = parsed_params.filter(|p| is_container(p));

    let params = match container {
        Some(container) => container.get("params").cloned().unwrap_or(Value::Null),
        None => parsed_params.cloned().unwrap_or(Value::Null),
    };

    let container_metadata = container
        .and_then(|c| c.get("metadata"))
        .filter(|m| !m.is_null());
    let parsed_metadata = fields
        .get("metadata")
        .map(decode_lenient)
        .filter(|m| !m.is_null());
    let metadata_source = parsed_metadata.as_deref().or(container_metadata);

    let title = [
        metadata_source.and_then(|m| str_field(m, "title")),
        container_metadata.and_then(|m| str_field(m, "title")),
        parsed_params
            .and_then(|p| p.get("metadata"))
            .and_then(|m| str_field(m, "title")),
        parsed_params.and_then(|p| str_field(p, "title")),
        fields.get("title").and_then(Value::as_str),
    ]
    .into_iter()
    .flatten()
    .next()
    .unwrap_or(DEFAULT_TITLE)
    .to_string();

    let language = metadata_source
        .and_then(|m| str_field(m, "language"))
        .and_then(valid_language);

    Ok(CanonicalSaveRequest {
        content_id: content_id(fields),
        library,
        params,
        metadata: ContentMetadata { title, language },
    })
}

fn resolve_library(payload: &Payload<'_>) -> Option<String> {
    LIBRARY_RESOLVERS.iter().find_map(|(source, resolve)| {
        let library = resolve(payload)?;
        tracing::debug!(source = *source, library = %library, "resolved content library");
        Some(library)
    })
}

fn library_string(p: &Payload<'_>) -> Option<String> {
    non_empty_string(p.fields.get("library"))
}

fn main_library_string(p: &Payload<'_>) -> Option<String> {
    non_empty_string(p.fields.get("mainLibrary"))
}

fn library_object(p: &Payload<'_>) -> Option<String> {
    p.fields.get("library").and_then(build_library)
}

fn main_library_object(p: &Payload<'_>) -> Option<String> {
    p.fields.get("mainLibrary").and_then(build_library)
}

fn ubername(p: &Payload<'_>) -> Option<String> {
    non_empty_string(p.fields.get("ubername"))
}

fn library_name(p: &Payload<'_>) -> Option<String> {
    non_empty_string(p.fields.get("libraryName"))
}

fn nested_params_library(p: &Payload<'_>) -> Option<String> {
    let params = decode_lenient(p.fields.get("params")?);
    nested_library(&params, 1, p.max_depth)
}

// Only string forms count below the top level
fn nested_library(value: &Value, depth: usize, max_depth: usize) -> Option<String> {
    if depth > max_depth {
        return None;
    }
    let fields = value.as_object()?;

    non_empty_string(fields.get("library"))
        .or_else(|| non_empty_string(fields.get("mainLibrary")))
        .or_else(|| nested_library(fields.get("params")?, depth + 1, max_depth))
}

/// Parse a JSON-encoded string, keeping the original value when it is not one
fn decode_lenient(value: &Value) -> Cow<'_, Value> {
    if let Value::String(s) = value {
        if let Ok(parsed) = serde_json::from_str::<Value>(s) {
            return Cow::Owned(parsed);
        }
    }
    Cow::Borrowed(value)
}

fn unwrap_envelope(value: &Value) -> &Value {
    value.get("data").unwrap_or(value)
}

/// A decoded `params` that wraps its own `params`/`metadata` pair
fn is_container(value: &Value) -> bool {
    value.get("params").is_some_and(is_truthy)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

fn valid_language(language: &str) -> Option<String> {
    if LANGUAGE_CODE.is_match(language) {
        Some(language.to_string())
    } else {
        tracing::debug!(language, "dropping invalid content language");
        None
    }
}

fn content_id(fields: &Map<String, Value>) -> Option<String> {
    match fields.get("contentId") {
        Some(Value::String(id)) if !id.is_empty() => Some(id.clone()),
        Some(Value::Number(id)) => Some(format_number(id)),
        _ => None,
    }
}
