//! Data model shared by the uploader, the gallery, and the playback viewer.
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use crate::timecode::{parse_opt, parse_timecode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use sentinel_server_backbone::types::PersonAction;

/// One expected step of a standard operating procedure, as detected in a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SopStep {
    pub expected_order: u32,
    #[serde(default)]
    pub actual_order: Option<u32>,
    /// Whether the step was observed at all.
    pub status: bool,
    pub description: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub confidence: f64,
}

impl SopStep {
    pub fn seconds(&self) -> Option<u32> {
        parse_opt(self.timestamp.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AlertLevel {
    Normal,
    Medium,
    High,
    Warning,
}

impl AlertLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertLevel::Normal => "normal",
            AlertLevel::Medium => "medium",
            AlertLevel::High => "high",
            AlertLevel::Warning => "warning",
        }
    }
}

impl FromStr for AlertLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(AlertLevel::Normal),
            "medium" => Ok(AlertLevel::Medium),
            "high" => Ok(AlertLevel::High),
            "warning" => Ok(AlertLevel::Warning),
            other => Err(format!("unknown alert level {:?}", other)),
        }
    }
}

impl TryFrom<String> for AlertLevel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<AlertLevel> for String {
    fn from(level: AlertLevel) -> Self {
        level.as_str().to_string()
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            AlertLevel::Normal => "Normal",
            AlertLevel::Medium => "Medium",
            AlertLevel::High => "High",
            AlertLevel::Warning => "Warning",
        })
    }
}

/// Point-in-time anomaly notification, unrelated to SOP ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    pub event_id: String,
    pub description: String,
    pub timestamp: String,
    #[serde(default)]
    pub persons_involved: BTreeSet<String>,
    pub alert_level: AlertLevel,
}

impl AlertEvent {
    pub fn seconds(&self) -> Option<u32> {
        parse_timecode(&self.timestamp)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub huid: String,
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub picture_url: String,
    #[serde(rename = "person_actions", alias = "actions", default)]
    pub actions: Vec<PersonAction>,
}

/// The only entity kept in durable storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoReference {
    pub id: String,
    pub url: String,
    pub filename: String,
    pub environment: String,
    pub upload_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub video_id: String,
    pub video_url: String,
    pub environment: String,
    #[serde(default)]
    pub recorded_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub role: String,
    pub confidence: f64,
}

/// Everything the viewer needs for one video, delivered as a single payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisBundle {
    pub video_metadata: VideoMetadata,
    #[serde(default)]
    pub participants: Vec<Participant>,
    pub event_sequence: Vec<SopStep>,
    #[serde(default)]
    pub events: Vec<AlertEvent>,
    #[serde(default)]
    pub persons_data: Vec<Person>,
}

#[derive(Debug, Error, PartialEq)]
pub enum BundleError {
    #[error("step {index} has expectedOrder {order}; orders start at 1")]
    ZeroOrder { index: usize, order: u32 },
    #[error("step {index} has expectedOrder {order}, not above the previous step's {previous}")]
    OutOfOrder {
        index: usize,
        order: u32,
        previous: u32,
    },
    #[error("step {index} has confidence {confidence} outside [0, 1]")]
    Confidence { index: usize, confidence: f64 },
    #[error("duplicate alert event id {0}")]
    DuplicateEvent(String),
    #[error("duplicate person huid {0}")]
    DuplicatePerson(String),
}

impl AnalysisBundle {
    /// Checks the invariants the viewer relies on.
    pub fn validate(&self) -> Result<(), BundleError> {
        let mut previous = 0;
        for (index, step) in self.event_sequence.iter().enumerate() {
            if step.expected_order == 0 {
                return Err(BundleError::ZeroOrder {
                    index,
                    order: step.expected_order,
                });
            }
            if step.expected_order <= previous {
                return Err(BundleError::OutOfOrder {
                    index,
                    order: step.expected_order,
                    previous,
                });
            }
            if !(0.0..=1.0).contains(&step.confidence) {
                return Err(BundleError::Confidence {
                    index,
                    confidence: step.confidence,
                });
            }
            previous = step.expected_order;
        }

        let mut ids = HashSet::new();
        for event in &self.events {
            if !ids.insert(event.event_id.as_str()) {
                return Err(BundleError::DuplicateEvent(event.event_id.clone()));
            }
        }

        let mut huids = HashSet::new();
        for person in &self.persons_data {
            if !huids.insert(person.huid.as_str()) {
                return Err(BundleError::DuplicatePerson(person.huid.clone()));
            }
        }

        Ok(())
    }
}
