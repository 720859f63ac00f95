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

//! # Contract Enforcement
//!
//! Checks a materialized plugin against an [`MpContract`] and produces the
//! immutable [`MpModule`] handle together with a compliance report.
//!
//! Categories are processed in a fixed order: required constants, optional
//! constants, required functions, optional functions. A missing required
//! member stops the enforcement; the findings collected up to that point are
//! carried by the returned [`MpError::InterfaceRequirement`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::contract::MpContract;
use crate::errors::{MpError, Result};
use crate::module::{MpMaterialized, MpModule};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MpSeverity {
    Info,
    Success,
    Error,
}

impl MpSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            MpSeverity::Info => "info",
            MpSeverity::Success => "success",
            MpSeverity::Error => "error",
        }
    }
}

/// One line of a compliance report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MpFinding {
    pub severity: MpSeverity,
    pub message: String,
}

impl fmt::Display for MpFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity.as_str(), self.message)
    }
}

/// Ordered findings of checking one plugin against one contract.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MpCompliance {
    findings: Vec<MpFinding>,
}

impl MpCompliance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, severity: MpSeverity, message: impl Into<String>) {
        self.findings.push(MpFinding {
            severity,
            message: message.into(),
        });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(MpSeverity::Info, message);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(MpSeverity::Success, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(MpSeverity::Error, message);
    }

    pub fn findings(&self) -> &[MpFinding] {
        &self.findings
    }

    /// False iff any finding has error severity.
    pub fn passed(&self) -> bool {
        !self
            .findings
            .iter()
            .any(|f| f.severity == MpSeverity::Error)
    }

    pub fn messages(&self) -> Vec<String> {
        self.findings.iter().map(|f| f.message.clone()).collect()
    }

    fn log(&self) {
        for finding in &self.findings {
            match finding.severity {
                MpSeverity::Error => log::error!("{}", finding.message),
                _ => log::info!("{}", finding.message),
            }
        }
    }
}

/// Outcome of checking one category of declared names.
struct MpCategoryCheck<'a> {
    found: Vec<&'a str>,
    absent: Vec<&'a str>,
}

/// Checks the names of one category in declaration order.
///
/// For a required category the first missing name is returned as `Err`,
/// after the names found before it have been recorded.
fn check_category<'a, F>(
    report: &mut MpCompliance,
    qualifier: &str,
    kind: &str,
    names: impl IntoIterator<Item = &'a str>,
    required: bool,
    is_present: F,
) -> std::result::Result<MpCategoryCheck<'a>, &'a str>
where
    F: Fn(&str) -> bool,
{
    let mut check = MpCategoryCheck {
        found: Vec::new(),
        absent: Vec::new(),
    };
    for name in names {
        if is_present(name) {
            check.found.push(name);
        } else if required {
            summarize(report, qualifier, kind, &check);
            return Err(name);
        } else {
            check.absent.push(name);
        }
    }
    summarize(report, qualifier, kind, &check);
    Ok(check)
}

fn summarize(report: &mut MpCompliance, qualifier: &str, kind: &str, check: &MpCategoryCheck<'_>) {
    if !check.found.is_empty() {
        report.success(format!(
            "imported {} {}: {}",
            qualifier,
            kind,
            check.found.join(", ")
        ));
    }
    if !check.absent.is_empty() {
        report.info(format!(
            "non defined {} {} (set to absent): {}",
            qualifier,
            kind,
            check.absent.join(", ")
        ));
    }
}

fn requirement_error(
    mut report: MpCompliance,
    module: &str,
    kind: &str,
    member: &str,
) -> MpError {
    report.error(format!(
        "plugin module '{}' does not define the required {} '{}'",
        module, kind, member
    ));
    report.log();
    MpError::InterfaceRequirement {
        module: module.to_string(),
        kind: kind.to_string(),
        member: member.to_string(),
        findings: report.messages(),
    }
}

/// Checks `materialized` against `contract` and freezes it into a handle.
///
/// Members the plugin defines without the contract declaring them are kept
/// on the handle unchanged.
pub fn enforce(materialized: MpMaterialized, contract: &MpContract) -> Result<(MpCompliance, MpModule)> {
    let MpMaterialized {
        name,
        path,
        language,
        constants,
        functions,
        notes,
        constants_disabled,
    } = materialized;

    let mut report = MpCompliance::new();
    for note in notes {
        report.info(note);
    }

    if constants_disabled && contract.has_required_constants() {
        return Err(MpError::config(format!(
            "constants cannot be imported from the {} plugin '{}', \
             but the API contract requires some",
            language, name
        )));
    }

    let required_constants = contract.required.constants.entries();
    let optional_constants = contract.optional.constants.entries();

    let mut module_constants: BTreeMap<String, Option<_>> = BTreeMap::new();
    let mut module_functions: BTreeMap<String, Option<_>> = BTreeMap::new();

    let has_constant = |n: &str| !constants_disabled && constants.contains_key(n);
    let has_function = |n: &str| functions.contains_key(n);

    if let Err(missing) = check_category(
        &mut report,
        "required",
        "constants",
        required_constants.iter().map(|(n, _)| *n),
        true,
        has_constant,
    ) {
        return Err(requirement_error(report, &name, "constant", missing));
    }

    let optional_check = check_category(
        &mut report,
        "optional",
        "constants",
        optional_constants.iter().map(|(n, _)| *n),
        false,
        has_constant,
    )
    .map_err(|n| MpError::internal(format!("optional constant '{}' raised", n)))?;
    for absent in optional_check.absent {
        module_constants.insert(absent.to_string(), None);
    }

    if let Err(missing) = check_category(
        &mut report,
        "required",
        "functions",
        contract.required.functions.iter().map(String::as_str),
        true,
        has_function,
    ) {
        return Err(requirement_error(report, &name, "function", missing));
    }

    let optional_check = check_category(
        &mut report,
        "optional",
        "functions",
        contract.optional.functions.iter().map(String::as_str),
        false,
        has_function,
    )
    .map_err(|n| MpError::internal(format!("optional function '{}' raised", n)))?;
    for absent in optional_check.absent {
        module_functions.insert(absent.to_string(), None);
    }

    if !constants_disabled {
        for (key, value) in constants {
            module_constants.insert(key, Some(value));
        }
    }
    for (key, function) in functions {
        module_functions.insert(key, Some(function));
    }

    report.log();
    let module = MpModule::from_parts(name, path, language, module_constants, module_functions);
    Ok((report, module))
}
