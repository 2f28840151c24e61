//! Routes and wire types of the Sentinel analysis API.
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

pub mod routes {
    /// Single-bundle endpoint consumed by the playback viewer.
    pub const ROUTE_VIDEO_ANALYSIS: &str = "/api/video-analysis/<video_id>";

    pub const ROUTE_REGISTER_VIDEO: &str = "/api/v1/register_video";
    pub const ROUTE_ANALYSIS_ALERTS: &str = "/api/v1/video_analysis/alerts";
    pub const ROUTE_ANALYSIS_SOP: &str = "/api/v1/video_analysis/sop";
    pub const ROUTE_ANALYSIS_PERSONS: &str = "/api/v1/video_analysis/persons";

    /// Query parameter naming the video on the v1 endpoints.
    pub const QUERY_VIDEO_PUBLIC_ID: &str = "video_public_id";

    /// Substitutes `<name>` placeholders with percent-encoded values.
    pub fn fill(path: &str, params: &[(&str, &str)]) -> String {
        let mut out = path.to_string();
        for (name, value) in params {
            let encoded: String = url::form_urlencoded::byte_serialize(value.as_bytes()).collect();
            out = out.replace(&format!("<{}>", name), &encoded);
        }
        out
    }

    /// Appends an encoded query string to a route.
    pub fn with_query(path: &str, query: &[(&str, &str)]) -> String {
        if query.is_empty() {
            return path.to_string();
        }
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(query.iter())
            .finish();
        format!("{}?{}", path, encoded)
    }
}

pub mod types {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct RegisterVideoRequest {
        pub video_public_id: String,
        pub video_url: String,
        pub env_id: u32,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct RegisterVideoResponse {
        pub reg_status: bool,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct AlertResult {
        pub start: String,
        pub end: String,
        pub alert_level: String,
        pub description: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct SopResult {
        pub start: String,
        pub end: String,
        pub sop_event: String,
        pub done: bool,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct HuidSopResultsMap {
        pub huid: String,
        pub sop_results: Vec<SopResult>,
    }

    /// One observed action of a person, bounded by `HH:MM:SS` time codes.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct PersonAction {
        pub start: String,
        pub end: String,
        pub action: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct HuidPersonActionsMap {
        pub huid: String,
        pub person_actions: Vec<PersonAction>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct VideoAnalysisAlertResponse {
        pub alert_results: Vec<AlertResult>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct VideoAnalysisSopResponse {
        pub sop_results: Vec<HuidSopResultsMap>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct VideoAnalysisPersonsResponse {
        pub person_video_results: Vec<HuidPersonActionsMap>,
    }
}
