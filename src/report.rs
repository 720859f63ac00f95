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

//! # Computation Reports
//!
//! Provenance record of one batch computation, written as a YAML document
//! when the computation ends, successfully or not.

use std::collections::BTreeMap;
use std::ffi::CStr;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::{MpError, Result};
use crate::module::MpModule;
use crate::sink::MpSink;
use crate::value::MpKwargs;

/// Why a computation was run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MpReason {
    NewEntities,
    NewAttributes,
    Recompute,
}

impl MpReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MpReason::NewEntities => "new_entities",
            MpReason::NewAttributes => "new_attributes",
            MpReason::Recompute => "recompute",
        }
    }
}

impl FromStr for MpReason {
    type Err = MpError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "new_entities" => Ok(MpReason::NewEntities),
            "new_attributes" => Ok(MpReason::NewAttributes),
            "recompute" => Ok(MpReason::Recompute),
            other => Err(MpError::validation(format!(
                "invalid computation reason '{}'; it must be one of: new_entities, new_attributes, recompute",
                other
            ))),
        }
    }
}

impl fmt::Display for MpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MpCompStatus {
    Running,
    Completed,
    /// Failed after at least one unit was computed.
    Partial,
    /// Failed before any unit was computed.
    Aborted,
}

/// Content of a computation report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MpReportData {
    pub uuid: Uuid,
    pub plugin_id: String,
    pub plugin_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<String>,
    pub unit: String,
    pub n_units: usize,
    #[serde(default)]
    pub reason: Option<MpReason>,
    pub comp_status: MpCompStatus,
    pub system_id: String,
    pub user_id: String,
    pub time_start: String,
    #[serde(default)]
    pub time_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

impl MpReportData {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_yaml_str(&fs::read_to_string(path)?)
    }
}

fn now() -> String {
    chrono::Local::now()
        .format("%Y-%m-%d %H:%M:%S%.6f")
        .to_string()
}

/// Name of the host, as reported by the system.
pub fn host_name() -> String {
    let mut buf = [0u8; 256];
    // SAFETY: the buffer is valid for its full length.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
    if rc != 0 {
        return "unknown".to_string();
    }
    match CStr::from_bytes_until_nul(&buf) {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(_) => String::from_utf8_lossy(&buf).into_owned(),
    }
}

/// Name of the user running the process.
pub fn user_name() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

/// YAML text of the parameters of a computation; opaque objects are
/// recorded by placeholder.
fn parameters_yaml(params: &MpKwargs) -> Result<Option<String>> {
    if params.is_empty() {
        return Ok(None);
    }
    let data: BTreeMap<&str, Value> = params
        .iter()
        .map(|(k, v)| {
            let value = v
                .as_data()
                .cloned()
                .unwrap_or_else(|| Value::String(v.to_text()));
            (k.as_str(), value)
        })
        .collect();
    Ok(Some(serde_yaml::to_string(&data)?))
}

/// Report of a running computation.
#[derive(Debug)]
pub struct MpReport {
    data: MpReportData,
    sink: MpSink,
}

impl MpReport {
    /// Starts the report of a computation with `plugin`; the plugin must
    /// define `ID` and `VERSION`. Without a sink the report goes to stderr.
    pub fn new(
        plugin: &MpModule,
        sink: Option<MpSink>,
        user: Option<String>,
        system: Option<String>,
        reason: Option<MpReason>,
        params: &MpKwargs,
        unit: &str,
    ) -> Result<Self> {
        let key = |name: &str| {
            plugin.constant_str(name).map(str::to_string).ok_or_else(|| {
                MpError::validation(format!(
                    "the plugin module must have a string {} constant",
                    name
                ))
            })
        };
        let data = MpReportData {
            uuid: Uuid::new_v4(),
            plugin_id: key("ID")?,
            plugin_version: key("VERSION")?,
            parameters: parameters_yaml(params)?,
            unit: unit.to_string(),
            n_units: 0,
            reason,
            comp_status: MpCompStatus::Running,
            system_id: system.unwrap_or_else(host_name),
            user_id: user.unwrap_or_else(user_name),
            time_start: now(),
            time_end: None,
            remarks: None,
        };
        Ok(MpReport {
            data,
            sink: sink.unwrap_or(MpSink::Stderr),
        })
    }

    pub fn data(&self) -> &MpReportData {
        &self.data
    }

    pub fn uuid(&self) -> Uuid {
        self.data.uuid
    }

    /// Counts one computed unit.
    pub fn step(&mut self) {
        self.data.n_units += 1;
    }

    pub fn n_units(&self) -> usize {
        self.data.n_units
    }

    /// Ends the report of a successful computation.
    pub fn finalize(&mut self) -> Result<()> {
        self.data.time_end = Some(now());
        self.data.comp_status = MpCompStatus::Completed;
        self.write()
    }

    /// Ends the report of a computation which failed on `unit`.
    pub fn error(&mut self, err: &MpError, unit: &str) -> Result<()> {
        self.data.time_end = Some(now());
        self.data.comp_status = if self.data.n_units == 0 {
            MpCompStatus::Aborted
        } else {
            MpCompStatus::Partial
        };
        let mut remarks = BTreeMap::new();
        remarks.insert("error_input_unit", unit.to_string());
        remarks.insert("error_class", err.class_name().to_string());
        remarks.insert("error_message", err.to_string());
        self.data.remarks = Some(serde_yaml::to_string(&remarks)?);
        self.write()
    }

    pub fn sink(&self) -> &MpSink {
        &self.sink
    }

    fn write(&mut self) -> Result<()> {
        let text = serde_yaml::to_string(&self.data)?;
        self.sink.write_all(text.as_bytes())?;
        self.sink.flush()?;
        Ok(())
    }
}
