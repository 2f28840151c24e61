//! Blocking HTTP implementations of the media host and analysis transport.
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::analysis::{AnalysisError, Transport};
use crate::config::Config;
use crate::media_host::{DeleteOutcome, MediaHost, MediaMetadata, UploadForm, UploadedMedia};
use crate::upload::UploadError;
use anyhow::{bail, Context, Result};
use chrono::Utc;
use crossbeam_channel::{unbounded, RecvTimeoutError, Sender};
use reqwest::blocking::{multipart, Client, Response};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use sentinel_client_server_lib::auth::{signed_destroy_params, ApiCredentials};
use serde::Deserialize;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use url::Url;

const MEDIA_API_BASE: &str = "https://api.cloudinary.com/v1_1";
const MEDIA_DELIVERY_BASE: &str = "https://res.cloudinary.com";
const PROGRESS_POLL: Duration = Duration::from_millis(100);

pub fn build_client(timeout_secs: Option<u64>) -> Result<Client> {
    Client::builder()
        .user_agent(concat!("sentinel/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout_secs.map(Duration::from_secs))
        .build()
        .context("building HTTP client")
}

/// Counts bytes as the request body is read and stops early once cancelled.
struct ProgressReader<R> {
    inner: R,
    sent: Sender<u64>,
    cancelled: Arc<AtomicBool>,
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Err(io::Error::other("upload cancelled"));
        }
        let n = self.inner.read(buf)?;
        if n > 0 {
            // The receiver may already be gone if the caller stopped listening.
            let _ = self.sent.send(n as u64);
        }
        Ok(n)
    }
}

#[derive(Deserialize)]
struct DestroyResponse {
    result: String,
}

pub struct HttpMediaHost {
    client: Client,
    cloud_name: String,
    credentials: Option<ApiCredentials>,
    cancelled: Arc<AtomicBool>,
}

impl HttpMediaHost {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: build_client(config.http_timeout_secs)?,
            cloud_name: config.require_cloud_name()?.to_string(),
            credentials: config.credentials(),
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Setting the returned flag aborts the upload in flight.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    fn upload_url(&self) -> String {
        format!("{}/{}/video/upload", MEDIA_API_BASE, self.cloud_name)
    }

    fn metadata_url(&self, public_id: &str) -> String {
        format!(
            "{}/{}/video/upload/{}.json",
            MEDIA_DELIVERY_BASE, self.cloud_name, public_id
        )
    }

    fn destroy_url(&self) -> String {
        format!("{}/{}/video/destroy", MEDIA_API_BASE, self.cloud_name)
    }
}

impl MediaHost for HttpMediaHost {
    fn upload(
        &self,
        file: &Path,
        form: &UploadForm,
        progress: &mut dyn FnMut(f64),
    ) -> Result<UploadedMedia, UploadError> {
        self.cancelled.store(false, Ordering::Relaxed);

        let handle = File::open(file)?;
        let total = handle.metadata()?.len();
        let filename = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime = mime_guess::from_path(file)
            .first_raw()
            .unwrap_or("application/octet-stream");

        let (tx, rx) = unbounded();
        let reader = ProgressReader {
            inner: handle,
            sent: tx,
            cancelled: Arc::clone(&self.cancelled),
        };
        let part = multipart::Part::reader_with_length(reader, total)
            .file_name(filename)
            .mime_str(mime)
            .map_err(|e| UploadError::InvalidResponse(e.to_string()))?;

        let mut body = multipart::Form::new();
        for (name, value) in form.fields() {
            body = body.text(name, value);
        }
        let request = self.client.post(self.upload_url()).multipart(body.part("file", part));

        // The request runs on a scoped worker; this thread turns byte counts into percentages.
        let outcome = thread::scope(|s| {
            let worker = s.spawn(move || request.send());
            let mut sent = 0u64;
            loop {
                match rx.recv_timeout(PROGRESS_POLL) {
                    Ok(n) => {
                        sent += n;
                        if total > 0 {
                            progress(sent as f64 * 100.0 / total as f64);
                        }
                    }
                    Err(RecvTimeoutError::Timeout) if !worker.is_finished() => {}
                    Err(_) => break,
                }
            }
            worker.join()
        });

        let response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(_)) if self.cancelled.load(Ordering::Relaxed) => {
                return Err(UploadError::Cancelled)
            }
            Ok(Err(e)) => return Err(UploadError::Network(e.to_string())),
            Err(_) => return Err(UploadError::Network("upload worker panicked".to_string())),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Status(status.as_u16()));
        }
        response
            .json::<UploadedMedia>()
            .map_err(|e| UploadError::InvalidResponse(e.to_string()))
    }

    fn fetch_metadata(&self, public_id: &str) -> Result<MediaMetadata> {
        let resp = self
            .client
            .get(self.metadata_url(public_id))
            .send()?
            .error_for_status()?;
        Ok(resp.json::<MediaMetadata>()?)
    }

    fn destroy(&self, public_id: &str) -> Result<DeleteOutcome> {
        let Some(credentials) = &self.credentials else {
            return Ok(DeleteOutcome::NotDeletedRemotely(
                "no API credentials configured".to_string(),
            ));
        };

        let params = signed_destroy_params(public_id, Utc::now().timestamp(), credentials);
        let resp = self
            .client
            .post(self.destroy_url())
            .form(&params)
            .send()?
            .error_for_status()?;
        let body: DestroyResponse = resp.json()?;

        match body.result.as_str() {
            "ok" => Ok(DeleteOutcome::Deleted),
            "not found" => Ok(DeleteOutcome::NotDeletedRemotely(
                "not found on the media host".to_string(),
            )),
            other => bail!("Media host refused to delete {}: {}", public_id, other),
        }
    }
}

pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout_secs: Option<u64>) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .with_context(|| format!("Invalid analysis base URL {}", base_url))?;
        Ok(Self {
            client: build_client(timeout_secs)?,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn read(response: reqwest::Result<Response>) -> Result<Vec<u8>, AnalysisError> {
        let response = response.map_err(|e| AnalysisError::Transport(e.to_string()))?;
        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Err(AnalysisError::NoContent);
        }
        if !status.is_success() {
            return Err(AnalysisError::Status(status.as_u16()));
        }
        let bytes = response
            .bytes()
            .map_err(|e| AnalysisError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

impl Transport for HttpTransport {
    fn get(&self, path: &str) -> Result<Vec<u8>, AnalysisError> {
        Self::read(self.client.get(self.url(path)).send())
    }

    fn post(&self, path: &str, body: Vec<u8>) -> Result<Vec<u8>, AnalysisError> {
        Self::read(
            self.client
                .post(self.url(path))
                .header(CONTENT_TYPE, "application/json")
                .body(body)
                .send(),
        )
    }
}
