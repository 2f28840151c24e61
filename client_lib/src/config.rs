//! Client configuration, loaded from `sentinel.yaml` with environment overrides.
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use anyhow::{bail, Context, Result};
use sentinel_client_server_lib::auth::{parse_api_credentials, ApiCredentials};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "sentinel.yaml";
pub const DEFAULT_UPLOAD_PRESET: &str = "security_footage";
pub const DEFAULT_FOLDER: &str = "sentinel-videos";
pub const DEFAULT_STATE_DIR: &str = "state";

pub const ENV_CLOUD_NAME: &str = "SENTINEL_CLOUD_NAME";
pub const ENV_API_KEY: &str = "SENTINEL_API_KEY";
pub const ENV_API_SECRET: &str = "SENTINEL_API_SECRET";
pub const ENV_ANALYSIS_URL: &str = "SENTINEL_ANALYSIS_URL";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cloud_name: String,
    pub upload_preset: String,
    pub folder: String,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    /// File holding `API_KEY:API_SECRET`, read when the two fields above are unset.
    pub credentials_file: Option<PathBuf>,
    /// Base URL of the analysis backend. Unset means the bundled sample data is used.
    pub analysis_base_url: Option<String>,
    pub state_dir: PathBuf,
    pub http_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cloud_name: String::new(),
            upload_preset: DEFAULT_UPLOAD_PRESET.to_string(),
            folder: DEFAULT_FOLDER.to_string(),
            api_key: None,
            api_secret: None,
            credentials_file: None,
            analysis_base_url: None,
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            http_timeout_secs: None,
        }
    }
}

impl Config {
    /// Reads the YAML config. A missing file yields the defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed reading {}", path.display()));
            }
        };

        let mut config = Self::from_yaml(&content)
            .with_context(|| format!("Failed parsing {}", path.display()))?;
        config.read_credentials_file()?;
        Ok(config)
    }

    fn read_credentials_file(&mut self) -> Result<()> {
        let Some(file) = &self.credentials_file else {
            return Ok(());
        };
        if self.api_key.is_some() && self.api_secret.is_some() {
            return Ok(());
        }
        let bytes =
            fs::read(file).with_context(|| format!("Failed reading {}", file.display()))?;
        let creds = parse_api_credentials(bytes)
            .with_context(|| format!("Invalid credentials in {}", file.display()))?;
        self.api_key = Some(creds.api_key);
        self.api_secret = Some(creds.api_secret);
        Ok(())
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml2::from_str(content).map_err(|e| anyhow::anyhow!("{}", e))
    }

    /// Applies `SENTINEL_*` overrides. `lookup` is `std::env::var(..).ok()` outside of tests.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let present = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = present(ENV_CLOUD_NAME) {
            self.cloud_name = v;
        }
        if let Some(v) = present(ENV_API_KEY) {
            self.api_key = Some(v);
        }
        if let Some(v) = present(ENV_API_SECRET) {
            self.api_secret = Some(v);
        }
        if let Some(v) = present(ENV_ANALYSIS_URL) {
            self.analysis_base_url = Some(v);
        }
    }

    /// Signing credentials for remote deletion, present only when both halves are set.
    pub fn credentials(&self) -> Option<ApiCredentials> {
        match (&self.api_key, &self.api_secret) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => {
                Some(ApiCredentials {
                    api_key: key.clone(),
                    api_secret: secret.clone(),
                })
            }
            _ => None,
        }
    }

    pub fn require_cloud_name(&self) -> Result<&str> {
        if self.cloud_name.trim().is_empty() {
            bail!(
                "No media host cloud name configured. Set cloud_name in {} or {}.",
                DEFAULT_CONFIG_FILE,
                ENV_CLOUD_NAME
            );
        }
        Ok(&self.cloud_name)
    }
}
