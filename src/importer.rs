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

//! # Unified Importer
//!
//! Entry point for loading plugins: dispatches on the file suffix, runs the
//! language loader and enforces the contract.
//!
//! ```rust,no_run
//! use multiplug::{MpContract, MpImporter, MpKwargs, MpValue};
//!
//! let importer = MpImporter::default();
//! let plugin = importer.import("plugins/fas_stats.sh", &MpContract::compute_plugin())?;
//! let row = plugin.call("compute", &[MpValue::str("data/example.fas")], &MpKwargs::new())?;
//! # Ok::<(), multiplug::MpError>(())
//! ```

use std::path::Path;

use crate::config::MpLanguageOptions;
use crate::contract::MpContract;
use crate::enforce::{enforce, MpCompliance};
use crate::errors::{MpError, Result};
use crate::loader::bash::MpBashLoader;
use crate::loader::nim::MpNimLoader;
use crate::loader::rust::MpRustLoader;
use crate::loader::MpLoader;
use crate::module::{MpLanguage, MpModule};

/// Loads plugin files of any supported language.
#[derive(Clone, Debug, Default)]
pub struct MpImporter {
    options: MpLanguageOptions,
}

impl MpImporter {
    pub fn new(options: MpLanguageOptions) -> Self {
        MpImporter { options }
    }

    pub fn options(&self) -> &MpLanguageOptions {
        &self.options
    }

    /// Language of a plugin file, from its suffix only.
    pub fn language_of(&self, path: &Path) -> Result<MpLanguage> {
        let suffix = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_default();
        let language = MpLanguage::from_suffix(&suffix).ok_or_else(|| {
            MpError::unsupported(
                suffix.clone(),
                format!("no loader for plugin file '{}'", path.display()),
            )
        })?;
        if language == MpLanguage::Bash && self.options.disable_bash {
            return Err(MpError::unsupported(
                suffix,
                "shell plugins are disabled by configuration",
            ));
        }
        Ok(language)
    }

    fn loader(&self, language: MpLanguage) -> Result<Box<dyn MpLoader>> {
        let loader: Box<dyn MpLoader> = match language {
            #[cfg(feature = "python")]
            MpLanguage::Python => Box::new(crate::loader::python::MpPythonLoader),
            #[cfg(not(feature = "python"))]
            MpLanguage::Python => {
                return Err(MpError::unsupported(
                    ".py",
                    "python plugins need the 'python' feature of multiplug",
                ))
            }
            MpLanguage::Nim => Box::new(MpNimLoader::new(self.options.clone())),
            MpLanguage::Rust => Box::new(MpRustLoader::new(self.options.clone())),
            MpLanguage::Bash => Box::new(MpBashLoader::new(self.options.clone())),
        };
        Ok(loader)
    }

    /// Loads a plugin and checks it against `contract`.
    pub fn import(&self, path: impl AsRef<Path>, contract: &MpContract) -> Result<MpModule> {
        self.import_with_report(path, contract).map(|(module, _)| module)
    }

    /// Like [`MpImporter::import`], also returning the compliance report.
    pub fn import_with_report(
        &self,
        path: impl AsRef<Path>,
        contract: &MpContract,
    ) -> Result<(MpModule, MpCompliance)> {
        let path = path.as_ref();
        contract.validate()?;
        let language = self.language_of(path)?;
        log::info!("importing {} plugin {}", language, path.display());
        let materialized = self.loader(language)?.materialize(path, contract)?;
        let (report, module) = enforce(materialized, contract)?;
        Ok((module, report))
    }
}
