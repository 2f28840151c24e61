//! Durable list of uploaded video references, most recent first.
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::model::VideoReference;
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Key under which the list is persisted; the file is `<state_dir>/<key>.json`.
pub const STORAGE_KEY: &str = "sentinel_uploaded_videos";

pub struct VideoStore {
    path: PathBuf,
}

impl VideoStore {
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        Self {
            path: state_dir.as_ref().join(format!("{}.json", STORAGE_KEY)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored list. A missing file is an empty list; an unreadable one
    /// is logged and also treated as empty.
    pub fn load(&self) -> Vec<VideoReference> {
        match self.try_load() {
            Ok(videos) => videos,
            Err(e) => {
                error!("Failed to load {}: {:?}", self.path.display(), e);
                vec![]
            }
        }
    }

    pub fn try_load(&self) -> Result<Vec<VideoReference>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed reading {}", self.path.display()))
            }
        };
        if content.trim().is_empty() {
            return Ok(vec![]);
        }
        serde_json::from_str(&content)
            .with_context(|| format!("Failed parsing {}", self.path.display()))
    }

    /// Adds `video` at the front. A corrupt list is replaced rather than kept.
    pub fn prepend(&self, video: VideoReference) -> Result<()> {
        let mut videos = self.load();
        videos.retain(|v| v.id != video.id);
        videos.insert(0, video);
        self.save(&videos)
    }

    /// Removes the reference with `id`. Returns whether anything was removed.
    pub fn remove(&self, id: &str) -> Result<bool> {
        let mut videos = self.load();
        let before = videos.len();
        videos.retain(|v| v.id != id);
        if videos.len() == before {
            return Ok(false);
        }
        self.save(&videos)?;
        Ok(true)
    }

    fn save(&self, videos: &[VideoReference]) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed creating {}", dir.display()))?;
        }
        let data = serde_json::to_vec_pretty(videos)?;

        // Temp file first, then rename over the previous list.
        let path_tmp = self.path.with_extension("json_tmp");
        let mut file = File::create(&path_tmp)?;
        file.write_all(&data)?;
        file.sync_all()?;
        fs::rename(&path_tmp, &self.path)?;
        Ok(())
    }
}
