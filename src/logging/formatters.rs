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

use chrono::{DateTime, Local};

use super::core::MpLogRecord;

pub struct MpJsonFormatter;

impl MpJsonFormatter {
    pub fn format(record: &MpLogRecord) -> String {
        record.to_json().to_string()
    }
}

pub struct MpTextFormatter;

impl MpTextFormatter {
    /// `time level [target] message`
    pub fn format(record: &MpLogRecord) -> String {
        let time: DateTime<Local> = record.timestamp.into();
        format!(
            "{} {:<5} [{}] {}",
            time.format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level,
            record.target,
            record.message
        )
    }
}
