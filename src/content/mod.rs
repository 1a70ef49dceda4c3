pub mod library;
pub mod normalize;
pub mod slug;
pub mod types;

pub use library::{build_library, main_library_version, CanonicalLibrary, LibraryError, LibraryName};
pub use normalize::{normalize, normalize_with_depth, NormalizeError, DEFAULT_MAX_PARAMS_DEPTH};
pub use slug::{create_slug, embed_code};
pub use types::*;
