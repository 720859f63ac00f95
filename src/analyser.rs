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

//! # Interface Analyser
//!
//! Verbose compliance check of a compute plugin. Unlike the importer, the
//! analyser does not stop at the first problem: the plugin is loaded with
//! every member optional and each check adds its findings to the report.
//!
//! Function signatures are only checked when the runtime exposes them,
//! which is the case for Python plugins.

use std::path::Path;

use serde_json::Value;

use crate::catalog::MpAttributeCatalog;
use crate::contract::MpContract;
use crate::enforce::{MpCompliance, MpFinding};
use crate::errors::Result;
use crate::importer::MpImporter;
use crate::module::{MpLanguage, MpModule};

/// Maximum length of the string constants of a compute plugin.
pub const STRING_CONSTANTS: &[(&str, usize)] = &[
    ("ID", 256),
    ("VERSION", 64),
    ("INPUT", 512),
    ("METHOD", 4096),
    ("IMPLEMENTATION", 4096),
    ("REQ_SOFTWARE", 4096),
    ("REQ_HARDWARE", 4096),
    ("ADVICE", 4096),
];

/// Constants every compute plugin defines.
pub const MANDATORY_CONSTANTS: &[&str] = &["ID", "VERSION", "INPUT", "OUTPUT"];

/// Verdict of an analysis.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MpAnalysis {
    report: MpCompliance,
}

impl MpAnalysis {
    pub fn passed(&self) -> bool {
        self.report.passed()
    }

    pub fn findings(&self) -> &[MpFinding] {
        self.report.findings()
    }

    /// Process exit code of a check command: 0 when passed, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.passed() {
            0
        } else {
            1
        }
    }
}

#[derive(Debug)]
pub struct MpInterfaceAnalyser {
    module: MpModule,
}

impl MpInterfaceAnalyser {
    /// Loads the plugin with the compute plugin contract made optional.
    pub fn load(importer: &MpImporter, path: impl AsRef<Path>) -> Result<Self> {
        let module = importer.import(path, &MpContract::compute_plugin().relaxed())?;
        Ok(Self::from_module(module))
    }

    pub fn from_module(module: MpModule) -> Self {
        MpInterfaceAnalyser { module }
    }

    pub fn module(&self) -> &MpModule {
        &self.module
    }

    /// Runs every check; `catalog` enables the check of `OUTPUT` names.
    pub fn run(&self, catalog: Option<&MpAttributeCatalog>) -> MpAnalysis {
        let mut report = MpCompliance::new();
        if self.module.language() != MpLanguage::Python {
            report.info(format!(
                "signature of plugin functions not analysed, since it is a {} plugin",
                self.module.language()
            ));
        }
        self.check_compute(&mut report);
        self.check_initialize(&mut report);
        self.check_finalize(&mut report);
        self.check_mandatory_constants(&mut report);
        self.check_string_constants(&mut report);
        self.check_output(&mut report, catalog);
        self.check_parameters(&mut report);
        for finding in report.findings() {
            log::info!("{}", finding);
        }
        MpAnalysis { report }
    }

    fn check_compute(&self, report: &mut MpCompliance) {
        if self.module.has_function("compute") {
            report.success("plugin provides a compute function");
        } else {
            report.error("plugin does not provide a compute function");
        }
        let Some(sig) = self.module.signature_of("compute") else {
            return;
        };
        if sig.accepts_extra_positional {
            report.error("plugin.compute() accepts variable positional arguments");
        }
        if self.module.has_function("initialize") {
            if sig.fixed_params.len() != 2 || sig.fixed_params[1] != "state" {
                report.error(
                    "plugin.compute() in plugin with initialize function \
                     does not accept a state keyword argument",
                );
            }
        } else if sig.fixed_params.len() != 1 {
            report.error("plugin.compute() does not accept a single positional argument");
        }
        if !sig.accepts_extra_keyword {
            report.error("plugin.compute() does not accept variable keywords arguments");
        }
    }

    fn check_initialize(&self, report: &mut MpCompliance) {
        if !self.module.has_function("initialize") {
            report.info("plugin does not provide an initialize function");
            return;
        }
        report.success("plugin provides an initialize function");
        let Some(sig) = self.module.signature_of("initialize") else {
            return;
        };
        if sig.accepts_extra_positional || !sig.fixed_params.is_empty() {
            report.error("plugin.initialize() accepts positional arguments");
        }
        if !sig.accepts_extra_keyword {
            report.error("plugin.initialize() does not accept variable keywords arguments");
        }
    }

    fn check_finalize(&self, report: &mut MpCompliance) {
        if !self.module.has_function("finalize") {
            report.info("plugin does not provide a finalize function");
            return;
        }
        report.success("plugin provides a finalize function");
        if !self.module.has_function("initialize") {
            report.error("plugin.finalize() defined in plugin without plugin.initialize()");
        }
        let Some(sig) = self.module.signature_of("finalize") else {
            return;
        };
        if sig.accepts_extra_positional {
            report.error("plugin.finalize() accepts variable positional arguments");
        }
        if sig.fixed_params.len() != 1 {
            report.error("plugin.finalize() does not accept a single positional argument");
        }
        if sig.accepts_extra_keyword {
            report.error("plugin.finalize() accepts variable keywords arguments");
        }
    }

    fn check_mandatory_constants(&self, report: &mut MpCompliance) {
        for name in MANDATORY_CONSTANTS {
            if self.module.has_constant(name) {
                report.success(format!("plugin defines a constant named '{}'", name));
            } else {
                report.error(format!("plugin does not define a constant named '{}'", name));
            }
        }
    }

    fn check_string_constants(&self, report: &mut MpCompliance) {
        for (name, max_len) in STRING_CONSTANTS {
            let Some(value) = self.module.constant(name) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            match value.as_str() {
                None => report.error(format!("plugin.{} must be a string", name)),
                Some(s) if s.chars().count() > *max_len => {
                    report.error(format!("plugin.{} length must be <= {}", name, max_len))
                }
                Some(_) => report.success(format!("plugin.{} type and format is valid", name)),
            }
        }
    }

    fn check_output(&self, report: &mut MpCompliance, catalog: Option<&MpAttributeCatalog>) {
        let Some(output) = self.module.constant("OUTPUT") else {
            return;
        };
        let Some(items) = output.as_data().and_then(Value::as_array) else {
            report.error("plugin.OUTPUT is not a list");
            return;
        };
        let not_strings: Vec<String> = items
            .iter()
            .filter(|v| !v.is_string())
            .map(Value::to_string)
            .collect();
        if not_strings.is_empty() {
            report.success("all plugin.OUTPUT elements are strings");
        } else {
            report.error(format!(
                "plugin.OUTPUT non-string elements found: [{}]",
                not_strings.join(", ")
            ));
        }
        match catalog {
            Some(catalog) => {
                let missing: Vec<&str> = items
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|name| !catalog.contains(name))
                    .collect();
                if missing.is_empty() {
                    report.success(
                        "all plugin.OUTPUT elements are present in the attributes definitions file",
                    );
                } else {
                    report.error(format!(
                        "plugin.OUTPUT elements not found in the attributes definitions file: [{}]",
                        missing.join(", ")
                    ));
                }
            }
            None => report.info("no attributes definitions file provided"),
        }
    }

    fn check_parameters(&self, report: &mut MpCompliance) {
        let Some(parameters) = self.module.constant("PARAMETERS") else {
            return;
        };
        if parameters.is_null() {
            return;
        }
        let Some(elements) = parameters.as_data().and_then(Value::as_array) else {
            report.error("plugin.PARAMETERS is not a list");
            return;
        };
        for element in elements {
            let Some(fields) = element.as_array() else {
                report.error(format!("plugin.PARAMETERS element is not a tuple: {}", element));
                continue;
            };
            if fields.len() != 4 {
                report.error(format!(
                    "plugin.PARAMETERS element tuple length is not 4: {}",
                    element
                ));
                continue;
            }
            for field in fields.iter().filter(|f| !f.is_string()) {
                report.error(format!(
                    "plugin.PARAMETERS tuple element is not a string: {} of {}",
                    field, element
                ));
            }
        }
    }
}
