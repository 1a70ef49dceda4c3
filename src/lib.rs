pub mod app;
pub mod config;
pub mod content;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod storage;

pub use app::{app, build_state, AppState};
