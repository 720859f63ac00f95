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

//! # multiplug Core Library
//!
//! multiplug loads compute plugins written in Python, Nim, Rust or Bash
//! behind one interface, enforces an API contract on them and drives batch
//! computations with provenance reports.
//!
//! ## Module Overview
//!
//! - **value**: values exchanged with plugins
//! - **module**: the loaded plugin handle and its callable functions
//! - **contract**: required and optional functions and constants
//! - **loader**: one materializer per language
//! - **enforce**: contract enforcement and compliance findings
//! - **importer**: extension dispatch, the single entry point for loading
//! - **analyser**: extended checks of compute plugins
//! - **batch**: batch computation driver
//! - **report**: computation reports
//! - **store**: attribute stores and the results loader
//! - **catalog**: attribute definitions
//! - **logging**: a `log` backend for applications
//!
//! ## Feature Flags
//!
//! - `parallel`: parallel batch computation (default)
//! - `python`: Python plugins through an embedded interpreter
//! - `full`: all of the above
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use multiplug::{MpContract, MpImporter, MpKwargs, MpLanguageOptions, MpValue};
//!
//! let importer = MpImporter::new(MpLanguageOptions::default());
//! let plugin = importer.import("plugins/fas_stats.sh", &MpContract::compute_plugin())?;
//! let row = plugin.call("compute", &[MpValue::str("genome.fas")], &MpKwargs::new())?;
//! println!("{}", row.to_text());
//! # Ok::<(), multiplug::MpError>(())
//! ```
//!
//! ## Error Handling
//!
//! All operations return `Result<T, MpError>`.

pub mod errors;
pub mod value;
pub mod config;
pub mod contract;
pub mod module;
pub mod loader;
pub mod enforce;
pub mod importer;
pub mod catalog;
pub mod analyser;
pub mod sink;
pub mod report;
pub mod batch;
pub mod store;
pub mod logging;

pub use errors::{MpError, Result};
pub use value::{MpKwargs, MpObject, MpShape, MpValue};
pub use config::{MpBatchConfig, MpLanguageOptions};
pub use contract::{MpConstantSet, MpContract, MpMemberSet};
pub use module::{MpFunction, MpLanguage, MpMaterialized, MpModule, MpSignature};
pub use loader::MpLoader;
pub use enforce::{enforce, MpCompliance, MpFinding, MpSeverity};
pub use importer::MpImporter;
pub use catalog::{MpAttributeCatalog, MpAttributeDefinition};
pub use analyser::{MpAnalysis, MpInterfaceAnalyser};
pub use sink::MpSink;
pub use report::{MpCompStatus, MpReason, MpReport, MpReportData};
pub use batch::{MpBatchComputation, MpComputeOutput, MpInputSource, MpUnit};
pub use store::{MpAttributeStore, MpMemoryStore, MpPluginDescription, MpResultsLoader, MpStoredValue};
pub use logging::{MpLogConfig, MpLogger};
