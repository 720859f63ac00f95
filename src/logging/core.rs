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

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Map, Value};

/// A log event as seen by the handlers.
#[derive(Clone, Debug)]
pub struct MpLogRecord {
    pub level: ::log::Level,
    pub target: String,
    pub message: String,
    pub timestamp: SystemTime,
}

impl MpLogRecord {
    pub fn from_log(record: &::log::Record<'_>) -> Self {
        MpLogRecord {
            level: record.level(),
            target: record.target().to_string(),
            message: record.args().to_string(),
            timestamp: SystemTime::now(),
        }
    }

    pub fn timestamp_ms(&self) -> u128 {
        self.timestamp
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis()
    }

    pub fn to_json(&self) -> Value {
        let mut data = Map::new();
        data.insert("level".into(), json!(self.level.as_str()));
        data.insert("target".into(), json!(self.target));
        data.insert("message".into(), json!(self.message));
        data.insert("timestamp_ms".into(), json!(self.timestamp_ms()));
        Value::Object(data)
    }
}
