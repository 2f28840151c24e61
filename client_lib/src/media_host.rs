//! Seam to the third-party media host that stores uploaded videos.
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::config::Config;
use crate::environment::{slugify, Environment};
use crate::upload::UploadError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use std::path::Path;

/// Form fields sent alongside the file on an unsigned upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadForm {
    pub upload_preset: String,
    pub folder: String,
    pub tags: String,
    pub context: String,
}

impl UploadForm {
    pub fn new(config: &Config, environment: Environment, upload_date: DateTime<Utc>) -> Self {
        Self {
            upload_preset: config.upload_preset.clone(),
            folder: config.folder.clone(),
            tags: format!("sentinel,{}", slugify(environment.name())),
            context: format!(
                "environment={}|uploadDate={}",
                environment.name(),
                upload_date.to_rfc3339_opts(SecondsFormat::Millis, true)
            ),
        }
    }

    pub fn fields(&self) -> [(&'static str, String); 4] {
        [
            ("upload_preset", self.upload_preset.clone()),
            ("folder", self.folder.clone()),
            ("tags", self.tags.clone()),
            ("context", self.context.clone()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadedMedia {
    pub public_id: String,
    pub secure_url: String,
}

/// Optional display metadata. Any field may be missing.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct MediaMetadata {
    #[serde(default)]
    pub bytes: Option<u64>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The host did not delete the asset; local removal may still proceed.
    NotDeletedRemotely(String),
}

pub trait MediaHost {
    /// Uploads one file. `progress` receives the sent percentage in `[0, 100]`.
    fn upload(
        &self,
        file: &Path,
        form: &UploadForm,
        progress: &mut dyn FnMut(f64),
    ) -> Result<UploadedMedia, UploadError>;

    fn fetch_metadata(&self, public_id: &str) -> anyhow::Result<MediaMetadata>;

    fn destroy(&self, public_id: &str) -> anyhow::Result<DeleteOutcome>;
}
