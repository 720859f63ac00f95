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

//! # Logging
//!
//! multiplug logs through the `log` facade. [`MpLogger`] is a ready-made
//! backend for applications embedding multiplug: console lines on stderr
//! (stdout carries computation results) and an optional rotating log file,
//! each as text or JSON.
//!
//! ```rust,no_run
//! use multiplug::logging::{MpLogConfig, MpLogger};
//!
//! MpLogger::init(MpLogConfig::verbose(true)).unwrap();
//! log::debug!("plugin loaded");
//! ```

pub mod config;
pub mod core;
pub mod formatters;
pub mod handlers;

pub use config::MpLogConfig;
pub use self::core::MpLogRecord;
pub use handlers::{MpConsoleHandler, MpFileHandler, MpLogHandler};

use crate::errors::{MpError, Result};

pub struct MpLogger {
    level: ::log::LevelFilter,
    handlers: Vec<Box<dyn MpLogHandler>>,
}

impl MpLogger {
    pub fn new(config: &MpLogConfig) -> Result<Self> {
        let mut handlers: Vec<Box<dyn MpLogHandler>> = Vec::new();
        if config.console_enabled {
            handlers.push(Box::new(MpConsoleHandler::new(config.json_format_console)));
        }
        if config.file_enabled {
            let path = config
                .file_path
                .as_ref()
                .ok_or_else(|| MpError::config("file logging enabled without a file_path"))?;
            handlers.push(Box::new(MpFileHandler::new(
                path,
                config.json_format_file,
                config.max_bytes,
                config.backup_count,
            )));
        }
        Ok(MpLogger {
            level: config.level_filter()?,
            handlers,
        })
    }

    /// Installs the logger for the process. Only the first logger of a
    /// process can be installed.
    pub fn init(config: MpLogConfig) -> Result<()> {
        let logger = Self::new(&config)?;
        let level = logger.level;
        ::log::set_boxed_logger(Box::new(logger))
            .map_err(|err| MpError::config(format!("cannot install the logger: {}", err)))?;
        ::log::set_max_level(level);
        Ok(())
    }
}

impl ::log::Log for MpLogger {
    fn enabled(&self, metadata: &::log::Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &::log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let record = MpLogRecord::from_log(record);
        for handler in &self.handlers {
            handler.handle(&record);
        }
    }

    fn flush(&self) {
        for handler in &self.handlers {
            handler.flush();
        }
    }
}
