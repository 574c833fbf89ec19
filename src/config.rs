// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Application configuration.
//!
//! Settings come from a YAML file (`ZONEWATCH_CONFIG`, or `zonewatch.yaml`
//! in the working directory). A missing file means defaults. The service
//! URL can also be overridden with `ZONEWATCH_SERVER_URL`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_ENV: &str = "ZONEWATCH_CONFIG";
const SERVER_URL_ENV: &str = "ZONEWATCH_SERVER_URL";
const DEFAULT_CONFIG_FILE: &str = "zonewatch.yaml";

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
    /// Filter string understood by `env_logger`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Runtime settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the zone/tracking service
    pub server_url: String,
    /// Widest the video box is rendered, in display points
    pub max_display_width: f32,
    /// Source id sent for zones drawn on the live camera
    pub camera_source_id: String,
    /// Timeout for regular service calls
    pub request_timeout_secs: u64,
    pub username: Option<String>,
    pub password: Option<String>,
    pub log_level: LogLevel,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".to_string(),
            max_display_width: 860.0,
            camera_source_id: "webcam_feed".to_string(),
            request_timeout_secs: 10,
            username: None,
            password: None,
            log_level: LogLevel::Info,
        }
    }
}

impl AppConfig {
    /// Load from the configured path, falling back to defaults.
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        if let Ok(url) = std::env::var(SERVER_URL_ENV) {
            config.server_url = url;
        }
        Ok(config)
    }

    /// Load from a specific YAML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_display_width <= 0.0 {
            anyhow::bail!("max_display_width must be positive");
        }
        if self.camera_source_id.is_empty() || self.camera_source_id.starts_with('/') {
            anyhow::bail!("camera_source_id must be a non-path identifier");
        }
        Ok(())
    }

    /// Login credentials, when both are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.username.as_deref()?, self.password.as_deref()?))
    }
}
