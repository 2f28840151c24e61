//! Code shared by the Sentinel clients and any trusted server component.
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

pub mod auth;
