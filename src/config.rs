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

//! # Configuration
//!
//! Options passed explicitly to the importer and to the batch driver.
//! Every field has a default, so partial YAML or JSON documents are accepted.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Options of the per-language loaders.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MpLanguageOptions {
    /// Name prefix of the zero-argument exports holding Nim constants.
    /// Empty disables constant import for Nim plugins.
    pub nim_const_prefix: String,
    /// Name of the export returning the constants of a Rust plugin.
    /// Empty disables constant import for Rust plugins.
    pub rust_const_container: String,
    /// Refuse to load shell plugins.
    pub disable_bash: bool,
    /// Forward build tool output to the terminal.
    pub verbose: bool,
    pub nim_command: String,
    pub cargo_command: String,
    pub bash_command: String,
}

impl Default for MpLanguageOptions {
    fn default() -> Self {
        MpLanguageOptions {
            nim_const_prefix: "const_".to_string(),
            rust_const_container: "Constants".to_string(),
            disable_bash: false,
            verbose: false,
            nim_command: "nim".to_string(),
            cargo_command: "cargo".to_string(),
            bash_command: "bash".to_string(),
        }
    }
}

impl MpLanguageOptions {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_yaml_str(&text),
        }
    }
}

/// Options of a batch computation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MpBatchConfig {
    /// Compute the units on a thread pool (feature `parallel`).
    pub parallel: bool,
    /// Log progress while computing.
    pub progress: bool,
    /// Number of units between two progress lines.
    pub progress_interval: usize,
    /// Maximum width of the description shown in progress lines.
    pub description_width: usize,
    /// Kind of entity a unit stands for, recorded in the report.
    pub unit: String,
}

impl Default for MpBatchConfig {
    fn default() -> Self {
        MpBatchConfig {
            parallel: false,
            progress: false,
            progress_interval: 100,
            description_width: 15,
            unit: "assembly".to_string(),
        }
    }
}

impl MpBatchConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }
}
