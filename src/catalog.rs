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

//! # Attribute Catalog
//!
//! Definitions of the attributes a computation may produce, read from a
//! YAML file mapping attribute names to their definition:
//!
//! ```yaml
//! genome_size:
//!   datatype: Integer
//!   computation_group: fas_stats
//!   remark: total length of the sequences
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::Result;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MpAttributeDefinition {
    pub datatype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computation_group: Option<String>,
    /// Any further column of the definition.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl MpAttributeDefinition {
    pub fn new(datatype: impl Into<String>) -> Self {
        MpAttributeDefinition {
            datatype: datatype.into(),
            computation_group: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.computation_group = Some(group.into());
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MpAttributeCatalog {
    definitions: BTreeMap<String, MpAttributeDefinition>,
}

impl MpAttributeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_yaml_str(&fs::read_to_string(path)?)
    }

    pub fn insert(&mut self, name: impl Into<String>, definition: MpAttributeDefinition) {
        self.definitions.insert(name.into(), definition);
    }

    pub fn remove(&mut self, name: &str) -> Option<MpAttributeDefinition> {
        self.definitions.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&MpAttributeDefinition> {
        self.definitions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
