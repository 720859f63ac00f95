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

//! # API Contracts
//!
//! A contract declares which functions and constants a plugin must or may
//! define. Constants are partitioned by shape; the shape is what the shell
//! loader uses to read a variable, the other loaders take values as they are.
//!
//! Contracts can be written in YAML:
//!
//! ```yaml
//! required:
//!   functions: [compute]
//!   constants:
//!     scalar: [ID, VERSION, INPUT]
//!     list: [OUTPUT]
//! optional:
//!   functions: [initialize, finalize]
//!   constants:
//!     nested: [PARAMETERS]
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::{MpError, Result};
use crate::value::MpShape;

/// Constants of one contract section, partitioned by shape.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MpConstantSet {
    pub scalar: Vec<String>,
    pub list: Vec<String>,
    pub nested: Vec<String>,
}

impl MpConstantSet {
    /// Declared names with their shape: scalars, then lists, then nested,
    /// each in declaration order.
    pub fn entries(&self) -> Vec<(&str, MpShape)> {
        self.scalar
            .iter()
            .map(|n| (n.as_str(), MpShape::Scalar))
            .chain(self.list.iter().map(|n| (n.as_str(), MpShape::List)))
            .chain(self.nested.iter().map(|n| (n.as_str(), MpShape::Nested)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.scalar.is_empty() && self.list.is_empty() && self.nested.is_empty()
    }

    pub fn shape_of(&self, name: &str) -> Option<MpShape> {
        self.entries()
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, shape)| shape)
    }

    fn push(&mut self, name: String, shape: MpShape) {
        match shape {
            MpShape::Scalar => self.scalar.push(name),
            MpShape::List => self.list.push(name),
            MpShape::Nested => self.nested.push(name),
        }
    }

    fn append(&mut self, other: MpConstantSet) {
        self.scalar.extend(other.scalar);
        self.list.extend(other.list);
        self.nested.extend(other.nested);
    }
}

/// Functions and constants of one contract section.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MpMemberSet {
    pub functions: Vec<String>,
    pub constants: MpConstantSet,
}

/// Declarative description of what a plugin must and may expose.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MpContract {
    pub required: MpMemberSet,
    pub optional: MpMemberSet,
}

impl MpContract {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require_function(mut self, name: impl Into<String>) -> Self {
        self.required.functions.push(name.into());
        self
    }

    pub fn optional_function(mut self, name: impl Into<String>) -> Self {
        self.optional.functions.push(name.into());
        self
    }

    pub fn require_constant(mut self, name: impl Into<String>, shape: MpShape) -> Self {
        self.required.constants.push(name.into(), shape);
        self
    }

    pub fn optional_constant(mut self, name: impl Into<String>, shape: MpShape) -> Self {
        self.optional.constants.push(name.into(), shape);
        self
    }

    /// Contract of a compute plugin run by the batch driver.
    pub fn compute_plugin() -> Self {
        Self::new()
            .require_function("compute")
            .optional_function("initialize")
            .optional_function("finalize")
            .require_constant("ID", MpShape::Scalar)
            .require_constant("VERSION", MpShape::Scalar)
            .require_constant("INPUT", MpShape::Scalar)
            .require_constant("OUTPUT", MpShape::List)
            .optional_constant("PARAMETERS", MpShape::Nested)
            .optional_constant("METHOD", MpShape::Scalar)
            .optional_constant("IMPLEMENTATION", MpShape::Scalar)
            .optional_constant("ADVICE", MpShape::Scalar)
            .optional_constant("REQ_SOFTWARE", MpShape::Scalar)
            .optional_constant("REQ_HARDWARE", MpShape::Scalar)
    }

    /// Contract of a plugin computing output ids from input ids.
    pub fn id_processor() -> Self {
        Self::new().require_function("compute_id")
    }

    /// The same contract with every required member turned optional.
    pub fn relaxed(&self) -> Self {
        let mut optional = self.required.clone();
        optional.functions.extend(self.optional.functions.iter().cloned());
        optional.constants.append(self.optional.constants.clone());
        MpContract {
            required: MpMemberSet::default(),
            optional,
        }
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let contract: MpContract = serde_yaml::from_str(text)?;
        contract.validate()?;
        Ok(contract)
    }

    /// Declared shape of a constant, looking at both sections.
    pub fn shape_of(&self, name: &str) -> Option<MpShape> {
        self.required
            .constants
            .shape_of(name)
            .or_else(|| self.optional.constants.shape_of(name))
    }

    pub fn has_required_constants(&self) -> bool {
        !self.required.constants.is_empty()
    }

    /// Checks that no name is declared twice in the same category.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for name in self.required.functions.iter().chain(&self.optional.functions) {
            if !seen.insert(name.as_str()) {
                return Err(MpError::config(format!(
                    "function '{}' is declared more than once in the API contract",
                    name
                )));
            }
        }
        let mut seen = HashSet::new();
        for (name, _) in self
            .required
            .constants
            .entries()
            .into_iter()
            .chain(self.optional.constants.entries())
        {
            if !seen.insert(name) {
                return Err(MpError::config(format!(
                    "constant '{}' is declared more than once in the API contract",
                    name
                )));
            }
        }
        Ok(())
    }
}
