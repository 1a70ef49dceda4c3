use once_cell::sync::Lazy;
use regex::Regex;

static NON_SLUG_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern"));

/// URL slug for a content title: lowercase, non-alphanumeric runs collapsed to `-`
pub fn create_slug(title: &str) -> String {
    let lowered = title.to_lowercase();
    NON_SLUG_CHARS
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// Iframe snippet for embedding content by slug
pub fn embed_code(public_url: &str, slug: &str) -> String {
    format!(
        "<iframe src=\"{}/api/h5p/content/{}/embed\" width=\"100%\" height=\"600\" frameborder=\"0\" allowfullscreen></iframe>",
        public_url.trim_end_matches('/'),
        slug
    )
}
