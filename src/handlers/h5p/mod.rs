pub mod contents;
pub mod files;
pub mod params;
pub mod save;

// Re-export handler functions for use in routing
pub use contents::delete as contents_delete;
pub use contents::get as contents_get;
pub use contents::list as contents_list;
pub use files::get as content_file_get;
pub use params::get as params_get;
pub use save::post as save_post;
