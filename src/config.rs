//! Config model and persistence helpers.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

/// Top-level configuration stored in `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// REST API location and endpoint paths.
    pub server: ServerCfg,
    /// Bulk-import behaviour.
    pub import: ImportCfg,
    /// Catalog listing options.
    pub catalog: CatalogCfg,
}

/// Where the catalog API lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCfg {
    /// Scheme + host (+ port), without a trailing slash.
    pub base_url: String,
    /// Multipart upload endpoint.
    pub upload_path: String,
    /// Progress stream prefix; the task id is appended as a path segment.
    pub progress_path: String,
    /// Product listing endpoint.
    pub products_path: String,
    /// TCP connect timeout. The progress stream itself has no read timeout.
    pub connect_timeout_secs: u64,
}

/// Upload form and post-terminal display delays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportCfg {
    /// Multipart field name the server expects the file under.
    pub file_field: String,
    /// How long a completed import stays on screen before reset.
    pub success_reset_ms: u64,
    /// How long a failed import stays on screen before reset.
    pub failure_reset_ms: u64,
}

/// Catalog listing options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogCfg {
    pub per_page: u32,
}

impl ServerCfg {
    /// Join the base url with an endpoint path.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl ImportCfg {
    pub fn success_reset(&self) -> Duration {
        Duration::from_millis(self.success_reset_ms)
    }

    pub fn failure_reset(&self) -> Duration {
        Duration::from_millis(self.failure_reset_ms)
    }
}

impl Config {
    /// Load from disk or create defaults when missing.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let s = fs::read_to_string(path)?;
            Ok(toml::from_str(&s)?)
        } else {
            let cfg = Self::default();
            cfg.save(path)?;
            Ok(cfg)
        }
    }

    /// Persist the config as pretty TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        let s = toml::to_string_pretty(self)?;
        fs::write(path, s)?;
        Ok(())
    }
}

impl Default for Config {
    /// Defaults match the API served by a local development backend.
    fn default() -> Self {
        Self {
            server: ServerCfg {
                base_url: "http://localhost:8000".into(),
                upload_path: "/api/upload".into(),
                progress_path: "/api/progress".into(),
                products_path: "/api/products".into(),
                connect_timeout_secs: 10,
            },
            import: ImportCfg {
                file_field: "file".into(),
                success_reset_ms: 2000,
                failure_reset_ms: 3000,
            },
            catalog: CatalogCfg { per_page: 20 },
        }
    }
}
