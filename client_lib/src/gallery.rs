//! Gallery of uploaded videos: enrichment, filtering, and deletion.
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::environment::slugify;
use crate::media_host::{DeleteOutcome, MediaHost, MediaMetadata};
use crate::model::VideoReference;
use crate::store::VideoStore;
use crate::timecode::format_duration;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};

const THUMBNAIL_TRANSFORM: &str = "w_400,h_300,c_fill,q_auto,f_jpg/";
const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "mov", "avi", "mkv"];

pub const NO_VIDEOS_FOUND: &str = "No Videos Found";
pub const NO_VIDEOS_UPLOADED: &str = "No videos uploaded yet";

#[derive(Debug, Clone, PartialEq)]
pub struct GalleryEntry {
    pub reference: VideoReference,
    /// Remote metadata, absent when enrichment failed or was skipped.
    pub metadata: Option<MediaMetadata>,
}

impl GalleryEntry {
    pub fn thumbnail_url(&self) -> Option<String> {
        thumbnail_url(&self.reference.url)
    }

    pub fn formatted_date(&self, now: DateTime<Utc>) -> String {
        format_relative_date(self.reference.upload_date, now)
    }

    pub fn formatted_size(&self) -> String {
        format_file_size(self.metadata.as_ref().and_then(|m| m.bytes).unwrap_or(0))
    }

    pub fn formatted_duration(&self) -> String {
        format_duration(self.metadata.as_ref().and_then(|m| m.duration).unwrap_or(0.0))
    }

    pub fn environment_tag(&self) -> &str {
        if self.reference.environment.is_empty() {
            "Unknown"
        } else {
            &self.reference.environment
        }
    }

    fn matches_query(&self, query: &str) -> bool {
        query.is_empty()
            || self.reference.filename.to_lowercase().contains(query)
            || self.reference.environment.to_lowercase().contains(query)
    }

    fn matches_environment(&self, slug: Option<&str>) -> bool {
        slug.map_or(true, |slug| slugify(&self.reference.environment) == slug)
    }
}

#[derive(Debug, PartialEq)]
pub enum GalleryView<'a> {
    Loading,
    Grid(Vec<&'a GalleryEntry>),
    /// `filtered` is set when videos exist but none pass the filters.
    Empty { filtered: bool },
}

impl GalleryView<'_> {
    pub fn message(&self) -> Option<&str> {
        match self {
            GalleryView::Empty { filtered: true } => Some(NO_VIDEOS_FOUND),
            GalleryView::Empty { filtered: false } => Some(NO_VIDEOS_UPLOADED),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteReport {
    Deleted,
    /// Removed locally; the media host kept its copy.
    LocalOnly(String),
}

#[derive(Default)]
pub struct Gallery {
    entries: Option<Vec<GalleryEntry>>,
    query: String,
    environment: Option<String>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the stored list and enriches each entry from `host` when given.
    pub fn load(&mut self, store: &VideoStore, host: Option<&dyn MediaHost>) {
        let references = store.load();

        let entries = references
            .into_iter()
            .map(|reference| {
                let metadata = host.and_then(|h| match h.fetch_metadata(&reference.id) {
                    Ok(m) => Some(m),
                    Err(e) => {
                        warn!(
                            "Failed to fetch metadata for {}, using stored data: {:?}",
                            reference.id, e
                        );
                        None
                    }
                });
                GalleryEntry {
                    reference,
                    metadata,
                }
            })
            .collect::<Vec<_>>();

        info!("loaded {} videos", entries.len());
        self.entries = Some(entries);
    }

    pub fn entries(&self) -> &[GalleryEntry] {
        self.entries.as_deref().unwrap_or(&[])
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = query.trim().to_lowercase();
    }

    /// `"all"` (or empty) clears the environment filter.
    pub fn set_environment(&mut self, environment: &str) {
        let slug = slugify(environment);
        self.environment = if slug.is_empty() || slug == "all" {
            None
        } else {
            Some(slug)
        };
    }

    pub fn filtered(&self) -> Vec<&GalleryEntry> {
        self.entries()
            .iter()
            .filter(|e| e.matches_query(&self.query))
            .filter(|e| e.matches_environment(self.environment.as_deref()))
            .collect()
    }

    pub fn view(&self) -> GalleryView<'_> {
        let Some(entries) = &self.entries else {
            return GalleryView::Loading;
        };
        if entries.is_empty() {
            return GalleryView::Empty { filtered: false };
        }
        let visible = self.filtered();
        if visible.is_empty() {
            GalleryView::Empty { filtered: true }
        } else {
            GalleryView::Grid(visible)
        }
    }

    /// Asks the host to delete the video, then drops it from the gallery and the store.
    ///
    /// A host that declines (or has no credentials) still gets the local reference
    /// removed. A hard remote failure restores the entry and leaves the store untouched.
    pub fn delete(
        &mut self,
        id: &str,
        store: &VideoStore,
        host: Option<&dyn MediaHost>,
    ) -> Result<DeleteReport> {
        let Some(entries) = self.entries.as_mut() else {
            bail!("Videos are not loaded yet");
        };
        let Some(index) = entries.iter().position(|e| e.reference.id == id) else {
            bail!("Video {} not found", id);
        };
        let entry = entries.remove(index);

        let report = match host.map(|h| h.destroy(id)) {
            None => DeleteReport::LocalOnly("remote deletion is not configured".to_string()),
            Some(Ok(DeleteOutcome::Deleted)) => DeleteReport::Deleted,
            Some(Ok(DeleteOutcome::NotDeletedRemotely(reason))) => DeleteReport::LocalOnly(reason),
            Some(Err(e)) => {
                entries.insert(index, entry);
                return Err(e).with_context(|| format!("Failed to delete video {}", id));
            }
        };

        if let Err(e) = store.remove(id) {
            entries.insert(index, entry);
            return Err(e).with_context(|| format!("Failed to remove {} from the store", id));
        }

        if let DeleteReport::LocalOnly(reason) = &report {
            warn!("{} removed locally but not from the media host: {}", id, reason);
        } else {
            info!("deleted {}", id);
        }
        Ok(report)
    }
}

/// Inserts the thumbnail transform after `/upload/` and swaps a video extension for `.jpg`.
pub fn thumbnail_url(video_url: &str) -> Option<String> {
    if video_url.is_empty() {
        return None;
    }
    let mut url = video_url.replacen("/upload/", &format!("/upload/{}", THUMBNAIL_TRANSFORM), 1);
    if let Some((stem, ext)) = url.rsplit_once('.') {
        if VIDEO_EXTENSIONS.iter().any(|v| ext.eq_ignore_ascii_case(v)) {
            url = format!("{}.jpg", stem);
        }
    }
    Some(url)
}

pub fn format_relative_date(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(date);
    let mins = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();
    let plural = |n: i64| if n > 1 { "s" } else { "" };

    if mins < 1 {
        "Just now".to_string()
    } else if mins < 60 {
        format!("{} min{} ago", mins, plural(mins))
    } else if hours < 24 {
        format!("{} hour{} ago", hours, plural(hours))
    } else if days < 7 {
        format!("{} day{} ago", days, plural(days))
    } else {
        date.format("%b %-d, %Y").to_string()
    }
}

pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return String::new();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media_host::{UploadForm, UploadedMedia};
    use crate::upload::UploadError;
    use chrono::{Duration, TimeZone};
    use std::cell::RefCell;
    use std::fs;
    use std::path::Path;

    #[derive(Default)]
    struct FakeHost {
        metadata_fails: bool,
        destroy: RefCell<Vec<String>>,
        destroy_outcome: Option<DeleteOutcome>,
    }

    impl MediaHost for FakeHost {
        fn upload(
            &self,
            _file: &Path,
            _form: &UploadForm,
            _progress: &mut dyn FnMut(f64),
        ) -> Result<UploadedMedia, UploadError> {
            Err(UploadError::Cancelled)
        }

        fn fetch_metadata(&self, public_id: &str) -> Result<MediaMetadata> {
            if self.metadata_fails {
                bail!("metadata for {} unavailable", public_id);
            }
            Ok(MediaMetadata {
                bytes: Some(1_572_864),
                duration: Some(75.0),
                ..Default::default()
            })
        }

        fn destroy(&self, public_id: &str) -> Result<DeleteOutcome> {
            self.destroy.borrow_mut().push(public_id.to_string());
            match &self.destroy_outcome {
                Some(outcome) => Ok(outcome.clone()),
                None => bail!("host returned 500"),
            }
        }
    }

    fn reference(id: &str, filename: &str, environment: &str) -> VideoReference {
        VideoReference {
            id: id.to_string(),
            url: format!("https://res.cloudinary.com/demo/video/upload/v1/{}.mp4", id),
            filename: filename.to_string(),
            environment: environment.to_string(),
            upload_date: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        }
    }

    fn seeded_store(dir: &Path) -> VideoStore {
        let store = VideoStore::new(dir);
        store
            .prepend(reference("a", "petrol_morning.mp4", "Petrol Pump"))
            .unwrap();
        store
            .prepend(reference("b", "checkout.mov", "Billing Counter"))
            .unwrap();
        store
            .prepend(reference("c", "Petrol_evening.mp4", "Petrol Pump"))
            .unwrap();
        store
    }

    fn ids(gallery: &Gallery) -> Vec<&str> {
        gallery
            .filtered()
            .iter()
            .map(|e| e.reference.id.as_str())
            .collect()
    }

    #[test]
    fn filters_compose_with_and() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(dir.path());
        let mut gallery = Gallery::new();
        assert_eq!(gallery.view(), GalleryView::Loading);
        gallery.load(&store, None);

        gallery.set_query("PETROL");
        assert_eq!(ids(&gallery), ["c", "a"]);

        gallery.set_environment("billing-counter");
        let view = gallery.view();
        assert_eq!(view, GalleryView::Empty { filtered: true });
        assert_eq!(view.message(), Some("No Videos Found"));

        gallery.set_environment("all");
        gallery.set_query("");
        assert_eq!(ids(&gallery), ["c", "b", "a"]);

        gallery.set_environment("Petrol Pump");
        assert_eq!(ids(&gallery), ["c", "a"]);
    }

    #[test]
    fn enrichment_failure_falls_back_to_stored_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(dir.path());
        let host = FakeHost {
            metadata_fails: true,
            ..Default::default()
        };
        let mut gallery = Gallery::new();
        gallery.load(&store, Some(&host));

        let entry = &gallery.entries()[0];
        assert!(entry.metadata.is_none());
        assert_eq!(entry.formatted_size(), "");
        assert_eq!(entry.formatted_duration(), "");
        assert_eq!(gallery.entries().len(), 3);
    }

    #[test]
    fn enriched_entries_format_size_and_duration() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(dir.path());
        let host = FakeHost::default();
        let mut gallery = Gallery::new();
        gallery.load(&store, Some(&host));

        let entry = &gallery.entries()[0];
        assert_eq!(entry.formatted_size(), "1.50 MB");
        assert_eq!(entry.formatted_duration(), "1:15");
        assert_eq!(entry.environment_tag(), "Petrol Pump");
    }

    #[test]
    fn hard_remote_failure_restores_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(dir.path());
        let host = FakeHost::default();
        let mut gallery = Gallery::new();
        gallery.load(&store, None);

        assert!(gallery.delete("b", &store, Some(&host)).is_err());
        assert_eq!(ids(&gallery), ["c", "b", "a"]);
        assert_eq!(store.load().len(), 3);
        assert_eq!(*host.destroy.borrow(), vec!["b".to_string()]);
    }

    #[test]
    fn declined_remote_delete_still_removes_locally() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(dir.path());
        let host = FakeHost {
            destroy_outcome: Some(DeleteOutcome::NotDeletedRemotely("no credentials".into())),
            ..Default::default()
        };
        let mut gallery = Gallery::new();
        gallery.load(&store, None);

        let report = gallery.delete("b", &store, Some(&host)).unwrap();
        assert_eq!(report, DeleteReport::LocalOnly("no credentials".to_string()));
        assert_eq!(ids(&gallery), ["c", "a"]);
        assert_eq!(store.load().len(), 2);

        let report = gallery.delete("a", &store, None).unwrap();
        assert!(matches!(report, DeleteReport::LocalOnly(_)));
        assert!(gallery.delete("zzz", &store, None).is_err());
    }

    #[test]
    fn empty_store_reports_nothing_uploaded() {
        let dir = tempfile::tempdir().unwrap();
        let mut gallery = Gallery::new();
        gallery.load(&VideoStore::new(dir.path()), None);
        assert_eq!(gallery.view(), GalleryView::Empty { filtered: false });
    }

    #[test]
    fn corrupt_store_lists_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = VideoStore::new(dir.path());
        fs::write(store.path(), "{not json").unwrap();
        let mut gallery = Gallery::new();
        gallery.load(&store, None);

        let view = gallery.view();
        assert_eq!(view, GalleryView::Empty { filtered: false });
        assert_eq!(view.message(), Some("No videos uploaded yet"));
    }

    #[test]
    fn thumbnail_rewrites_transform_and_extension() {
        assert_eq!(
            thumbnail_url("https://res.cloudinary.com/demo/video/upload/v1/clip.MOV").unwrap(),
            "https://res.cloudinary.com/demo/video/upload/w_400,h_300,c_fill,q_auto,f_jpg/v1/clip.jpg"
        );
        assert_eq!(thumbnail_url(""), None);
    }

    #[test]
    fn relative_dates() {
        let date = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let at = |d: Duration| format_relative_date(date, date + d);
        assert_eq!(at(Duration::seconds(30)), "Just now");
        assert_eq!(at(Duration::minutes(1)), "1 min ago");
        assert_eq!(at(Duration::minutes(5)), "5 mins ago");
        assert_eq!(at(Duration::hours(3)), "3 hours ago");
        assert_eq!(at(Duration::days(2)), "2 days ago");
        assert_eq!(at(Duration::days(10)), "Jun 1, 2025");
    }

    #[test]
    fn file_sizes() {
        assert_eq!(format_file_size(0), "");
        assert_eq!(format_file_size(512), "512.00 Bytes");
        assert_eq!(format_file_size(1536), "1.50 KB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3.00 GB");
    }
}
