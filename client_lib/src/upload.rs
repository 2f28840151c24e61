//! Upload session: file selection, environment tagging, and the upload itself.
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::config::Config;
use crate::environment::Environment;
use crate::media_host::{MediaHost, UploadForm, UploadedMedia};
use crate::model::VideoReference;
use crate::store::VideoStore;
use chrono::Utc;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Please select video files only.")]
    NotAVideo,
    #[error("A file is already selected. Reset before choosing another.")]
    FileAlreadySelected,
    #[error("Please select a video file first.")]
    NoFile,
    #[error("Please select an environment before uploading.")]
    NoEnvironment,
    #[error("An upload is already in progress.")]
    InProgress,
    #[error("Network error. Please check your connection.")]
    Network(String),
    #[error("Upload failed. Please try again.")]
    Status(u16),
    #[error("Upload was cancelled.")]
    Cancelled,
    #[error("Upload failed. Please try again.")]
    InvalidResponse(String),
    #[error("Failed to read the selected file: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub filename: String,
    pub mime: String,
    pub size: u64,
}

impl SelectedFile {
    /// Media type is derived from the file name; only `video/*` is accepted.
    pub fn inspect(path: &Path) -> Result<Self, UploadError> {
        let mime = mime_guess::from_path(path)
            .first_raw()
            .filter(|m| m.starts_with("video/"))
            .ok_or(UploadError::NotAVideo)?;
        let size = fs::metadata(path)?.len();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            path: path.to_path_buf(),
            filename,
            mime: mime.to_string(),
            size,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadState {
    Empty,
    FileSelected,
    Ready,
    Uploading { progress: f64 },
    Succeeded(UploadedMedia),
    Failed(String),
}

pub struct UploadSession {
    config: Config,
    file: Option<SelectedFile>,
    environment: Option<Environment>,
    state: UploadState,
}

impl UploadSession {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            file: None,
            environment: None,
            state: UploadState::Empty,
        }
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    pub fn environment(&self) -> Option<Environment> {
        self.environment
    }

    fn settle(&mut self) {
        self.state = match (&self.file, self.environment) {
            (None, _) => UploadState::Empty,
            (Some(_), None) => UploadState::FileSelected,
            (Some(_), Some(_)) => UploadState::Ready,
        };
    }

    /// Takes the first video from a multi-file selection.
    pub fn select_files(&mut self, paths: &[PathBuf]) -> Result<&SelectedFile, UploadError> {
        if matches!(self.state, UploadState::Uploading { .. }) {
            return Err(UploadError::InProgress);
        }
        if self.file.is_some() {
            return Err(UploadError::FileAlreadySelected);
        }

        let mut first_error = None;
        for path in paths {
            match SelectedFile::inspect(path) {
                Ok(file) => {
                    debug!("selected {} ({})", file.filename, file.mime);
                    self.settle_with(file);
                    return self.file.as_ref().ok_or(UploadError::NoFile);
                }
                Err(UploadError::NotAVideo) => {
                    debug!("skipping non-video {}", path.display());
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        Err(first_error.unwrap_or(UploadError::NotAVideo))
    }

    fn settle_with(&mut self, file: SelectedFile) {
        self.file = Some(file);
        self.settle();
    }

    pub fn select_environment(&mut self, environment: Environment) -> Result<(), UploadError> {
        if matches!(self.state, UploadState::Uploading { .. }) {
            return Err(UploadError::InProgress);
        }
        self.environment = Some(environment);
        if !matches!(self.state, UploadState::Succeeded(_) | UploadState::Failed(_)) {
            self.settle();
        }
        Ok(())
    }

    /// Uploads the selected file and records it in `store`.
    ///
    /// Missing input is rejected before the host is contacted. Progress handed to
    /// `progress` is clamped to `[0, 100]`, never decreases, and ends at 100 on success.
    pub fn upload(
        &mut self,
        host: &dyn MediaHost,
        store: &VideoStore,
        progress: &mut dyn FnMut(f64),
    ) -> Result<VideoReference, UploadError> {
        if matches!(self.state, UploadState::Uploading { .. }) {
            return Err(UploadError::InProgress);
        }
        let file = self.file.clone().ok_or(UploadError::NoFile)?;
        let environment = self.environment.ok_or(UploadError::NoEnvironment)?;

        let upload_date = Utc::now();
        let form = UploadForm::new(&self.config, environment, upload_date);
        info!(
            "uploading {} ({} bytes) for {}",
            file.filename, file.size, environment
        );
        self.state = UploadState::Uploading { progress: 0.0 };

        let mut last = 0.0_f64;
        let result = host.upload(&file.path, &form, &mut |p: f64| {
            let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 100.0) };
            if p > last {
                last = p;
                self.state = UploadState::Uploading { progress: p };
                progress(p);
            }
        });

        match result {
            Ok(media) => {
                if last < 100.0 {
                    progress(100.0);
                }
                let reference = VideoReference {
                    id: media.public_id.clone(),
                    url: media.secure_url.clone(),
                    filename: file.filename.clone(),
                    environment: environment.name().to_string(),
                    upload_date,
                };
                if let Err(e) = store.prepend(reference.clone()) {
                    error!("Failed to record upload of {}: {:?}", reference.id, e);
                }
                info!("uploaded {} as {}", file.filename, media.public_id);
                self.state = UploadState::Succeeded(media);
                Ok(reference)
            }
            Err(e) => {
                warn!("upload of {} failed: {:?}", file.filename, e);
                self.state = UploadState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Back to the initial empty state. Also used to retry after a failure.
    pub fn reset(&mut self) {
        self.file = None;
        self.environment = None;
        self.state = UploadState::Empty;
    }
}
