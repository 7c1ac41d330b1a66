// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Application configuration.
//!
//! Settings are read from a YAML (or JSON) file. Every field has a default,
//! so a partial file or no file at all is fine.

use crate::session::controller::SessionTimings;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "segview.yaml";

/// Environment variable overriding `server_url`.
pub const SERVER_URL_ENV: &str = "SEGVIEW_SERVER_URL";

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the segmentation service
    pub server_url: String,
    /// Path prefix of every API route
    pub api_prefix: String,
    /// Interval between job status queries
    pub poll_interval_ms: u64,
    /// Delay between job completion and showing results
    pub redirect_delay_ms: u64,
    /// Lifetime of a notification
    pub notification_ttl_ms: u64,
    /// Per-request timeout; unset keeps the transport default
    pub request_timeout_secs: Option<u64>,
    pub log_level: LogLevel,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:5000".to_string(),
            api_prefix: "/api".to_string(),
            poll_interval_ms: 2000,
            redirect_delay_ms: 2000,
            notification_ttl_ms: 5000,
            request_timeout_secs: None,
            log_level: LogLevel::Info,
        }
    }
}

impl AppConfig {
    /// Load from `path`, or from [`DEFAULT_CONFIG_FILE`] if it exists,
    /// else defaults. Applies the environment override afterwards.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let candidate = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.exists()),
        };
        let mut config = match candidate {
            Some(p) => crate::io::serialization::import(&p)?,
            None => AppConfig::default(),
        };
        if let Ok(url) = std::env::var(SERVER_URL_ENV) {
            config.server_url = url;
        }
        Ok(config)
    }

    pub fn timings(&self) -> SessionTimings {
        SessionTimings {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            redirect_delay: Duration::from_millis(self.redirect_delay_ms),
            notification_ttl: Duration::from_millis(self.notification_ttl_ms),
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: AppConfig =
            serde_yaml::from_str("server_url: http://gpu-box:8000\nlog_level: debug\n").unwrap();
        assert_eq!(config.server_url, "http://gpu-box:8000");
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.api_prefix, "/api");
        assert_eq!(config.poll_interval_ms, 2000);
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn test_timings() {
        let config = AppConfig {
            poll_interval_ms: 500,
            ..AppConfig::default()
        };
        let timings = config.timings();
        assert_eq!(timings.poll_interval, Duration::from_millis(500));
        assert_eq!(timings.redirect_delay, Duration::from_millis(2000));
        assert_eq!(timings.notification_ttl, Duration::from_millis(5000));
    }

    #[test]
    fn test_level_filter() {
        assert_eq!(LogLevel::Warn.to_level_filter(), log::LevelFilter::Warn);
    }
}
