//! Client for the video analysis backend.
//!
//! The transport is a seam: the HTTP implementation lives behind the
//! `http_client` feature, and [`SampleTransport`] serves a bundled analysis
//! for demos and tests.
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::environment::Environment;
use crate::model::{
    AlertEvent, AlertLevel, AnalysisBundle, BundleError, Person, SopStep, VideoMetadata,
    VideoReference,
};
use crate::timecode::parse_timecode;
use sentinel_server_backbone::routes::{
    fill, with_query, QUERY_VIDEO_PUBLIC_ID, ROUTE_ANALYSIS_ALERTS, ROUTE_ANALYSIS_PERSONS,
    ROUTE_ANALYSIS_SOP, ROUTE_REGISTER_VIDEO, ROUTE_VIDEO_ANALYSIS,
};
use sentinel_server_backbone::types::{
    HuidPersonActionsMap, HuidSopResultsMap, RegisterVideoRequest, RegisterVideoResponse, SopResult,
    VideoAnalysisAlertResponse, VideoAnalysisPersonsResponse, VideoAnalysisSopResponse,
};
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use thiserror::Error;

const SAMPLE_ANALYSIS: &str = include_str!("../data/sample_analysis.json");

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis request failed: {0}")]
    Transport(String),
    #[error("analysis backend returned status {0}")]
    Status(u16),
    #[error("no analysis results yet")]
    NoContent,
    #[error("malformed analysis payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid analysis bundle: {0}")]
    Invalid(#[from] BundleError),
}

pub trait Transport {
    fn get(&self, path: &str) -> Result<Vec<u8>, AnalysisError>;
    fn post(&self, path: &str, body: Vec<u8>) -> Result<Vec<u8>, AnalysisError>;
}

pub struct AnalysisClient<T: Transport> {
    transport: T,
}

impl<T: Transport> AnalysisClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, AnalysisError> {
        let bytes = self.transport.get(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Fetches and validates the full bundle the viewer plays against.
    pub fn fetch_bundle(&self, video_id: &str) -> Result<AnalysisBundle, AnalysisError> {
        let path = fill(ROUTE_VIDEO_ANALYSIS, &[("video_id", video_id)]);
        let bundle: AnalysisBundle = self.get_json(&path)?;
        bundle.validate()?;
        debug!(
            "fetched analysis for {}: {} steps, {} alerts",
            video_id,
            bundle.event_sequence.len(),
            bundle.events.len()
        );
        Ok(bundle)
    }

    /// Asks the backend to download and analyse an uploaded video.
    pub fn register_video(
        &self,
        public_id: &str,
        video_url: &str,
        environment: Environment,
    ) -> Result<bool, AnalysisError> {
        let request = RegisterVideoRequest {
            video_public_id: public_id.to_string(),
            video_url: video_url.to_string(),
            env_id: environment.env_id(),
        };
        let body = serde_json::to_vec(&request)?;
        let bytes = self.transport.post(ROUTE_REGISTER_VIDEO, body)?;
        let response: RegisterVideoResponse = serde_json::from_slice(&bytes)?;
        Ok(response.reg_status)
    }

    fn query_path(route: &str, public_id: &str) -> String {
        with_query(route, &[(QUERY_VIDEO_PUBLIC_ID, public_id)])
    }

    /// Alert results of the v1 API as viewer alerts. Empty while analysis is pending.
    pub fn fetch_alerts(&self, public_id: &str) -> Result<Vec<AlertEvent>, AnalysisError> {
        let response: VideoAnalysisAlertResponse =
            match self.get_json(&Self::query_path(ROUTE_ANALYSIS_ALERTS, public_id)) {
                Err(AnalysisError::NoContent) => return Ok(vec![]),
                other => other?,
            };

        Ok(response
            .alert_results
            .into_iter()
            .enumerate()
            .map(|(i, result)| {
                let alert_level = result.alert_level.parse().unwrap_or_else(|e| {
                    warn!("{}; treating alert {} as a warning", e, i + 1);
                    AlertLevel::Warning
                });
                AlertEvent {
                    event_id: format!("evt_{:03}", i + 1),
                    description: result.description,
                    timestamp: result.start,
                    persons_involved: BTreeSet::new(),
                    alert_level,
                }
            })
            .collect())
    }

    pub fn fetch_sop_results(
        &self,
        public_id: &str,
    ) -> Result<Vec<HuidSopResultsMap>, AnalysisError> {
        let path = Self::query_path(ROUTE_ANALYSIS_SOP, public_id);
        match self.get_json::<VideoAnalysisSopResponse>(&path) {
            Ok(r) => Ok(r.sop_results),
            Err(AnalysisError::NoContent) => Ok(vec![]),
            Err(e) => Err(e),
        }
    }

    pub fn fetch_person_actions(
        &self,
        public_id: &str,
    ) -> Result<Vec<HuidPersonActionsMap>, AnalysisError> {
        let path = Self::query_path(ROUTE_ANALYSIS_PERSONS, public_id);
        match self.get_json::<VideoAnalysisPersonsResponse>(&path) {
            Ok(r) => Ok(r.person_video_results),
            Err(AnalysisError::NoContent) => Ok(vec![]),
            Err(e) => Err(e),
        }
    }

    /// Assembles a bundle from the per-result v1 endpoints, for backends that
    /// do not serve the single-bundle route.
    ///
    /// SOP results of every person are merged into one sequence ordered by start
    /// time. Returns [`AnalysisError::NoContent`] while nothing has been analysed.
    pub fn fetch_results_bundle(
        &self,
        video: &VideoReference,
    ) -> Result<AnalysisBundle, AnalysisError> {
        let events = self.fetch_alerts(&video.id)?;
        let mut sop: Vec<SopResult> = self
            .fetch_sop_results(&video.id)?
            .into_iter()
            .flat_map(|m| m.sop_results)
            .collect();
        let persons = self.fetch_person_actions(&video.id)?;

        if events.is_empty() && sop.is_empty() && persons.is_empty() {
            return Err(AnalysisError::NoContent);
        }

        // Untimed results go last.
        sop.sort_by_key(|r| parse_timecode(&r.start).unwrap_or(u32::MAX));
        let event_sequence = sop
            .into_iter()
            .enumerate()
            .map(|(i, result)| {
                let order = i as u32 + 1;
                SopStep {
                    expected_order: order,
                    actual_order: result.done.then_some(order),
                    status: result.done,
                    description: result.sop_event,
                    timestamp: result.done.then_some(result.start),
                    confidence: 1.0,
                }
            })
            .collect();

        let persons_data = persons
            .into_iter()
            .enumerate()
            .map(|(i, person)| Person {
                huid: person.huid,
                name: format!("Person {}", i + 1),
                role: String::new(),
                picture_url: String::new(),
                actions: person.person_actions,
            })
            .collect();

        let bundle = AnalysisBundle {
            video_metadata: VideoMetadata {
                video_id: video.id.clone(),
                video_url: video.url.clone(),
                environment: video.environment.clone(),
                recorded_at: Some(video.upload_date.to_rfc3339()),
            },
            participants: vec![],
            event_sequence,
            events,
            persons_data,
        };
        bundle.validate()?;
        Ok(bundle)
    }
}

/// The bundled demo analysis, re-labelled for the given video.
pub fn sample_bundle(
    video_id: &str,
    video_url: &str,
    environment: &str,
) -> Result<AnalysisBundle, AnalysisError> {
    let mut bundle: AnalysisBundle = serde_json::from_str(SAMPLE_ANALYSIS)?;
    bundle.video_metadata = VideoMetadata {
        video_id: video_id.to_string(),
        video_url: video_url.to_string(),
        environment: environment.to_string(),
        recorded_at: None,
    };
    Ok(bundle)
}

/// Serves the bundled analysis for one video and 404 for everything else.
pub struct SampleTransport {
    video: VideoReference,
}

impl SampleTransport {
    pub fn for_video(video: &VideoReference) -> Self {
        Self {
            video: video.clone(),
        }
    }
}

impl Transport for SampleTransport {
    fn get(&self, path: &str) -> Result<Vec<u8>, AnalysisError> {
        if path != fill(ROUTE_VIDEO_ANALYSIS, &[("video_id", self.video.id.as_str())]) {
            return Err(AnalysisError::Status(404));
        }
        let environment = if self.video.environment.is_empty() {
            Environment::BillingCounter.name()
        } else {
            self.video.environment.as_str()
        };
        let mut bundle = sample_bundle(&self.video.id, &self.video.url, environment)?;
        bundle.video_metadata.recorded_at = Some(self.video.upload_date.to_rfc3339());
        Ok(serde_json::to_vec(&bundle)?)
    }

    fn post(&self, _path: &str, _body: Vec<u8>) -> Result<Vec<u8>, AnalysisError> {
        Err(AnalysisError::Status(404))
    }
}
