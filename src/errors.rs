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

//! # multiplug Error Module
//!
//! This module defines the error types used throughout multiplug.
//!
//! ## Error Categories
//!
//! - **InterfaceRequirement**: a plugin misses a member its contract requires
//! - **UnsupportedLanguage**: unknown file suffix, or a language disabled by
//!   configuration or by the enabled cargo features
//! - **Build**: an external compiler or build tool failed
//! - **Plugin**: executing or calling into a plugin failed
//! - **Compute**: a unit of a batch computation failed
//! - **Config**: inconsistent configuration supplied by the caller
//! - **Validation**: invalid input data (files, reports, parameters)
//! - **Io / Serde**: filesystem and serialization failures
//! - **Internal**: unexpected situations
//!
//! ## Usage
//!
//! ```rust
//! use multiplug::errors::{MpError, Result};
//!
//! fn column(idscol: usize) -> Result<usize> {
//!     if idscol < 1 {
//!         return Err(MpError::validation("idscol must be a positive integer"));
//!     }
//!     Ok(idscol - 1)
//! }
//! ```

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience result type used throughout multiplug.
pub type Result<T> = std::result::Result<T, MpError>;

/// Canonical error enumeration for multiplug.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum MpError {
    /// A member required by the contract is not defined by the plugin.
    ///
    /// `findings` holds the compliance lines collected before the failure.
    #[error("plugin module '{module}' does not define the required {kind} '{member}'")]
    InterfaceRequirement {
        module: String,
        kind: String,
        member: String,
        findings: Vec<String>,
    },

    /// The plugin language is not recognized or not enabled.
    #[error("unsupported language ({suffix}): {reason}")]
    UnsupportedLanguage { suffix: String, reason: String },

    /// An external build tool failed.
    #[error("building plugin '{module}' with {tool} failed: {message}")]
    Build {
        module: String,
        tool: String,
        message: String,
    },

    /// Loading or calling into a plugin failed.
    #[error("plugin '{module}' failed: {message}")]
    Plugin { module: String, message: String },

    /// A single unit of a batch computation failed.
    #[error("computation failed for unit '{unit}': {message}")]
    Compute { unit: String, message: String },

    /// Inconsistent configuration supplied by the caller.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Validation errors triggered by invalid parameters or inputs.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Errors originating from filesystem or process IO.
    #[error("io error: {0}")]
    Io(String),

    /// Wrapper for serialization issues.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Catch-all variant for unexpected situations.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<io::Error> for MpError {
    fn from(err: io::Error) -> Self {
        MpError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for MpError {
    fn from(err: serde_json::Error) -> Self {
        MpError::Serde(err.to_string())
    }
}

impl From<serde_yaml::Error> for MpError {
    fn from(err: serde_yaml::Error) -> Self {
        MpError::Serde(err.to_string())
    }
}

impl From<csv::Error> for MpError {
    fn from(err: csv::Error) -> Self {
        MpError::Io(err.to_string())
    }
}

impl MpError {
    /// Helper to construct simple validation errors.
    pub fn validation<T: Into<String>>(message: T) -> Self {
        MpError::Validation {
            message: message.into(),
        }
    }

    /// Helper to construct configuration errors.
    pub fn config<T: Into<String>>(message: T) -> Self {
        MpError::Config {
            message: message.into(),
        }
    }

    /// Helper to construct plugin errors.
    pub fn plugin(module: impl Into<String>, message: impl Into<String>) -> Self {
        MpError::Plugin {
            module: module.into(),
            message: message.into(),
        }
    }

    /// Helper to construct build errors.
    pub fn build(
        module: impl Into<String>,
        tool: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        MpError::Build {
            module: module.into(),
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn unsupported(suffix: impl Into<String>, reason: impl Into<String>) -> Self {
        MpError::UnsupportedLanguage {
            suffix: suffix.into(),
            reason: reason.into(),
        }
    }

    /// Helper to construct internal errors.
    pub fn internal<T: Into<String>>(message: T) -> Self {
        MpError::Internal(message.into())
    }

    /// Short class name of the error, as recorded in computation reports.
    pub fn class_name(&self) -> &'static str {
        match self {
            MpError::InterfaceRequirement { .. } => "InterfaceRequirementError",
            MpError::UnsupportedLanguage { .. } => "UnsupportedLanguageError",
            MpError::Build { .. } => "BuildError",
            MpError::Plugin { .. } => "PluginError",
            MpError::Compute { .. } => "ComputeError",
            MpError::Config { .. } => "ConfigError",
            MpError::Validation { .. } => "ValidationError",
            MpError::Io(_) => "IoError",
            MpError::Serde(_) => "SerdeError",
            MpError::Internal(_) => "InternalError",
        }
    }
}
