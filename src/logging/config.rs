//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of multiplug.
//! The multiplug project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{MpError, Result};

/// Configuration of the [`MpLogger`](super::MpLogger).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MpLogConfig {
    /// One of `error`, `warn`, `info`, `debug`, `trace`.
    pub level: String,
    pub console_enabled: bool,
    /// Whether console lines are JSON objects instead of text.
    pub json_format_console: bool,
    pub file_enabled: bool,
    pub file_path: Option<String>,
    pub json_format_file: bool,
    /// Size above which the log file is rotated; no rotation when unset.
    pub max_bytes: Option<u64>,
    pub backup_count: u32,
}

impl Default for MpLogConfig {
    fn default() -> Self {
        MpLogConfig {
            level: "info".to_string(),
            console_enabled: true,
            json_format_console: false,
            file_enabled: false,
            file_path: None,
            json_format_file: true,
            max_bytes: None,
            backup_count: 7,
        }
    }
}

impl MpLogConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_yaml_str(&text),
        }
    }

    /// A config whose level follows the verbosity switch of the caller.
    pub fn verbose(verbose: bool) -> Self {
        MpLogConfig {
            level: if verbose { "debug" } else { "info" }.to_string(),
            ..Self::default()
        }
    }

    pub fn level_filter(&self) -> Result<::log::LevelFilter> {
        match self.level.to_ascii_lowercase().as_str() {
            "off" => Ok(::log::LevelFilter::Off),
            "error" => Ok(::log::LevelFilter::Error),
            "warn" | "warning" => Ok(::log::LevelFilter::Warn),
            "info" => Ok(::log::LevelFilter::Info),
            "debug" => Ok(::log::LevelFilter::Debug),
            "trace" => Ok(::log::LevelFilter::Trace),
            other => Err(MpError::config(format!("unknown log level '{}'", other))),
        }
    }
}
