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

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::core::MpLogRecord;
use super::formatters::{MpJsonFormatter, MpTextFormatter};

pub trait MpLogHandler: Send + Sync {
    fn handle(&self, record: &MpLogRecord);

    fn flush(&self) {}
}

fn format(record: &MpLogRecord, json: bool) -> String {
    if json {
        MpJsonFormatter::format(record)
    } else {
        MpTextFormatter::format(record)
    }
}

/// Writes to stderr; stdout is left to computation results.
pub struct MpConsoleHandler {
    json: bool,
}

impl MpConsoleHandler {
    pub fn new(json: bool) -> Self {
        MpConsoleHandler { json }
    }
}

impl MpLogHandler for MpConsoleHandler {
    fn handle(&self, record: &MpLogRecord) {
        let _ = writeln!(io::stderr().lock(), "{}", format(record, self.json));
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

/// Appends to a file, rotating it by size when `max_bytes` is set.
pub struct MpFileHandler {
    path: PathBuf,
    json: bool,
    max_bytes: Option<u64>,
    backup_count: u32,
    lock: Mutex<()>,
}

fn backup_path(path: &Path, index: u32) -> PathBuf {
    PathBuf::from(format!("{}.{}", path.display(), index))
}

impl MpFileHandler {
    pub fn new(path: impl Into<PathBuf>, json: bool, max_bytes: Option<u64>, backup_count: u32) -> Self {
        MpFileHandler {
            path: path.into(),
            json,
            max_bytes,
            backup_count,
            lock: Mutex::new(()),
        }
    }

    /// `path` becomes `path.1`, `path.1` becomes `path.2`, and so on up to
    /// `backup_count`.
    fn rotate_if_needed(&self) -> io::Result<()> {
        let Some(max_bytes) = self.max_bytes else {
            return Ok(());
        };
        match fs::metadata(&self.path) {
            Ok(meta) if meta.len() > max_bytes => {}
            _ => return Ok(()),
        }
        if self.backup_count == 0 {
            return fs::remove_file(&self.path);
        }
        let oldest = backup_path(&self.path, self.backup_count);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (1..self.backup_count).rev() {
            let from = backup_path(&self.path, index);
            if from.exists() {
                fs::rename(&from, backup_path(&self.path, index + 1))?;
            }
        }
        fs::rename(&self.path, backup_path(&self.path, 1))
    }
}

impl MpLogHandler for MpFileHandler {
    fn handle(&self, record: &MpLogRecord) {
        let _guard = match self.lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(err) = self.rotate_if_needed() {
            let _ = writeln!(io::stderr(), "cannot rotate {}: {}", self.path.display(), err);
        }
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(file, "{}", format(record, self.json));
        }
    }
}
