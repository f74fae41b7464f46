// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Tracing subscriber setup.
//!
//! `RUST_LOG` selects the filter (default `info`); `LOG_FORMAT=json` switches
//! to one JSON object per line, anything else keeps human-readable output.

use tracing_subscriber::EnvFilter;

pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init() {
    let format = LogFormat::parse(std::env::var(LOG_FORMAT_ENV).ok().as_deref());
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };

    if installed.is_ok() {
        tracing::debug!(format = ?format, "Logging initialised");
    }
}
