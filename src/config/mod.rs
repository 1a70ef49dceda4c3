use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::content::DEFAULT_MAX_PARAMS_DEPTH;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub content: ContentConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Externally visible base URL, used in embed snippets
    pub public_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageBackend {
    File,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" | "fs" => Ok(StorageBackend::File),
            "memory" | "mem" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    pub storage: StorageBackend,
    pub content_path: PathBuf,
    pub max_params_depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    /// Empty means any origin
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(port) = env::var("H5P_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|v| v.parse().ok())
        {
            self.server.port = port;
        }
        if let Ok(v) = env::var("H5P_PUBLIC_URL") {
            self.server.public_url = v;
        }

        // Content overrides
        if let Ok(v) = env::var("H5P_STORAGE") {
            self.content.storage = v.parse().unwrap_or(self.content.storage);
        }
        if let Ok(v) = env::var("H5P_CONTENT_PATH") {
            self.content.content_path = PathBuf::from(v);
        }
        if let Ok(v) = env::var("H5P_MAX_PARAMS_DEPTH") {
            self.content.max_params_depth = v.parse().unwrap_or(self.content.max_params_depth);
        }

        // API overrides
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 3000,
                public_url: "http://localhost:3000".to_string(),
            },
            content: ContentConfig {
                storage: StorageBackend::File,
                content_path: PathBuf::from("public/h5p/content"),
                max_params_depth: DEFAULT_MAX_PARAMS_DEPTH,
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: Vec::new(),
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 3000,
                public_url: "https://staging.example.com".to_string(),
            },
            content: ContentConfig {
                storage: StorageBackend::File,
                content_path: PathBuf::from("public/h5p/content"),
                max_params_depth: DEFAULT_MAX_PARAMS_DEPTH,
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 3000,
                public_url: "https://app.example.com".to_string(),
            },
            content: ContentConfig {
                storage: StorageBackend::File,
                content_path: PathBuf::from("public/h5p/content"),
                max_params_depth: DEFAULT_MAX_PARAMS_DEPTH,
            },
            api: ApiConfig {
                enable_request_logging: false,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::development()
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
