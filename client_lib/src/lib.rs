//! Sentinel client library: upload, gallery, and SOP compliance playback.
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

#[macro_use]
extern crate log;

pub mod alerts;
pub mod analysis;
pub mod config;
pub mod environment;
pub mod gallery;
pub mod media_host;
pub mod model;
pub mod persons;
pub mod store;
pub mod timecode;
pub mod timeline;
pub mod upload;
pub mod viewer;

#[cfg(feature = "http_client")]
pub mod http_client;
