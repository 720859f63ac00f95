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

//! # Attribute Store
//!
//! Destination of the results of batch computations. [`MpAttributeStore`]
//! is the seam to a concrete storage backend; [`MpMemoryStore`] keeps
//! everything in memory. [`MpResultsLoader`] checks a results file and its
//! computation report against the plugin that produced them and loads
//! them into a store.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::catalog::{MpAttributeCatalog, MpAttributeDefinition};
use crate::contract::MpContract;
use crate::errors::{MpError, Result};
use crate::importer::MpImporter;
use crate::module::MpModule;
use crate::report::MpReportData;
use crate::sink::tsv_reader;
use crate::value::MpValue;

/// Plugin metadata as stored next to its computations.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MpPluginDescription {
    pub id: String,
    pub version: String,
    pub input: String,
    /// Output attribute names, joined by `,`.
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation: Option<String>,
    /// Parameter tuples, fields joined by `,` and tuples by `;`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub req_software: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub req_hardware: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advice: Option<String>,
}

fn cells(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| MpValue::Data(item.clone()).to_text())
            .collect(),
        Value::Null => Vec::new(),
        other => vec![MpValue::Data(other.clone()).to_text()],
    }
}

impl MpPluginDescription {
    pub fn from_module(plugin: &MpModule) -> Result<Self> {
        let required = |name: &str| {
            plugin.constant_str(name).map(str::to_string).ok_or_else(|| {
                MpError::validation(format!(
                    "plugin '{}' has no string constant {}",
                    plugin.name(),
                    name
                ))
            })
        };
        let optional = |name: &str| {
            plugin
                .constant(name)
                .filter(|value| !value.is_null())
                .map(MpValue::to_text)
        };
        let output = plugin
            .constant("OUTPUT")
            .and_then(MpValue::as_data)
            .map(|value| cells(value).join(","))
            .ok_or_else(|| {
                MpError::validation(format!("plugin '{}' has no OUTPUT constant", plugin.name()))
            })?;
        let parameters = plugin
            .constant("PARAMETERS")
            .and_then(MpValue::as_data)
            .filter(|value| !value.is_null())
            .map(|value| match value {
                Value::Array(rows) => rows
                    .iter()
                    .map(|row| cells(row).join(","))
                    .collect::<Vec<_>>()
                    .join(";"),
                other => MpValue::Data(other.clone()).to_text(),
            });
        Ok(MpPluginDescription {
            id: required("ID")?,
            version: required("VERSION")?,
            input: required("INPUT")?,
            output,
            method: optional("METHOD"),
            implementation: optional("IMPLEMENTATION"),
            parameters,
            req_software: optional("REQ_SOFTWARE"),
            req_hardware: optional("REQ_HARDWARE"),
            advice: optional("ADVICE"),
        })
    }

    /// Output attribute names.
    pub fn output_names(&self) -> Vec<String> {
        self.output
            .split(',')
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Storage backend for attribute values.
pub trait MpAttributeStore {
    fn create_attribute(&mut self, name: &str, definition: &MpAttributeDefinition) -> Result<()>;

    fn destroy_attribute(&mut self, name: &str) -> Result<()>;

    /// Fails if the stored definitions and values disagree.
    fn check_consistency(&self) -> Result<()>;

    /// Loads a TSV results file: the unit id, then one column per name in
    /// `attributes`.
    fn load_computation(&mut self, run_id: &Uuid, attributes: &[String], results: &Path) -> Result<()>;

    /// Stores the description of a plugin. Without `replace`, a different
    /// description under the same id and version is an error.
    fn register_plugin(&mut self, _description: &MpPluginDescription, _replace: bool) -> Result<()> {
        Ok(())
    }

    /// Stores a computation report. Without `replace`, a different report
    /// with the same uuid is an error.
    fn register_report(&mut self, _report: &MpReportData, _replace: bool) -> Result<()> {
        Ok(())
    }
}

/// A stored attribute value and the computation that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MpStoredValue {
    pub value: String,
    pub computation: Uuid,
}

/// In-memory attribute store.
#[derive(Clone, Debug, Default)]
pub struct MpMemoryStore {
    catalog: MpAttributeCatalog,
    values: BTreeMap<String, BTreeMap<String, MpStoredValue>>,
    plugins: BTreeMap<(String, String), MpPluginDescription>,
    reports: BTreeMap<Uuid, MpReportData>,
}

fn check_datatype(datatype: &str, attribute: &str, unit: &str, value: &str) -> Result<()> {
    let valid = match datatype {
        "Integer" | "integer" | "int" => value.parse::<i64>().is_ok(),
        "Float" | "float" => value.parse::<f64>().is_ok(),
        "Boolean" | "boolean" | "bool" => {
            matches!(value, "true" | "false" | "True" | "False" | "0" | "1")
        }
        _ => true,
    };
    if valid {
        Ok(())
    } else {
        Err(MpError::validation(format!(
            "value '{}' of attribute {} for unit {} is not a valid {}",
            value, attribute, unit, datatype
        )))
    }
}

impl MpMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store with the attributes of `catalog` already created.
    pub fn with_catalog(catalog: MpAttributeCatalog) -> Self {
        let values = catalog
            .names()
            .map(|name| (name.to_string(), BTreeMap::new()))
            .collect();
        MpMemoryStore {
            catalog,
            values,
            ..Self::default()
        }
    }

    pub fn catalog(&self) -> &MpAttributeCatalog {
        &self.catalog
    }

    pub fn value(&self, attribute: &str, unit: &str) -> Option<&MpStoredValue> {
        self.values.get(attribute)?.get(unit)
    }

    /// Number of units with a value for `attribute`.
    pub fn count(&self, attribute: &str) -> usize {
        self.values.get(attribute).map_or(0, BTreeMap::len)
    }

    pub fn plugin(&self, id: &str, version: &str) -> Option<&MpPluginDescription> {
        self.plugins.get(&(id.to_string(), version.to_string()))
    }

    pub fn report(&self, uuid: &Uuid) -> Option<&MpReportData> {
        self.reports.get(uuid)
    }
}

impl MpAttributeStore for MpMemoryStore {
    fn create_attribute(&mut self, name: &str, definition: &MpAttributeDefinition) -> Result<()> {
        if self.catalog.contains(name) {
            return Err(MpError::validation(format!("attribute {} already exists", name)));
        }
        self.catalog.insert(name, definition.clone());
        self.values.insert(name.to_string(), BTreeMap::new());
        log::info!("created attribute {} ({})", name, definition.datatype);
        Ok(())
    }

    fn destroy_attribute(&mut self, name: &str) -> Result<()> {
        if self.catalog.remove(name).is_none() {
            return Err(MpError::validation(format!("attribute {} does not exist", name)));
        }
        self.values.remove(name);
        log::info!("destroyed attribute {}", name);
        Ok(())
    }

    fn check_consistency(&self) -> Result<()> {
        let mut problems = Vec::new();
        for name in self.catalog.names() {
            if !self.values.contains_key(name) {
                problems.push(format!("attribute {} has no value table", name));
            }
        }
        for name in self.values.keys() {
            if !self.catalog.contains(name) {
                problems.push(format!("value table {} has no attribute definition", name));
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(MpError::validation(problems.join("; ")))
        }
    }

    fn load_computation(&mut self, run_id: &Uuid, attributes: &[String], results: &Path) -> Result<()> {
        let mut datatypes = Vec::with_capacity(attributes.len());
        for name in attributes {
            let definition = self.catalog.get(name).ok_or_else(|| {
                MpError::validation(format!("attribute {} is not defined in the store", name))
            })?;
            datatypes.push(definition.datatype.clone());
        }

        let mut reader = tsv_reader(results)?;
        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            if record.len() != attributes.len() + 1 {
                return Err(MpError::validation(format!(
                    "{}:{}: expected {} columns, found {}",
                    results.display(),
                    line + 1,
                    attributes.len() + 1,
                    record.len()
                )));
            }
            let unit = record.get(0).unwrap_or_default().to_string();
            for (index, ((name, datatype), value)) in attributes
                .iter()
                .zip(&datatypes)
                .zip(record.iter().skip(1))
                .enumerate()
            {
                check_datatype(datatype, name, &unit, value)?;
                rows.push((index, unit.clone(), value.to_string()));
            }
        }

        let loaded = rows.len();
        for (index, unit, value) in rows {
            let table = self.values.entry(attributes[index].clone()).or_default();
            table.insert(
                unit,
                MpStoredValue {
                    value,
                    computation: *run_id,
                },
            );
        }
        log::info!("computation {}: {} attribute values loaded", run_id, loaded);
        Ok(())
    }

    fn register_plugin(&mut self, description: &MpPluginDescription, replace: bool) -> Result<()> {
        let key = (description.id.clone(), description.version.clone());
        match self.plugins.get(&key) {
            Some(previous) if previous != description && !replace => Err(MpError::validation(format!(
                "plugin {} {}: metadata changed without a version change; \
                 replace the plugin record or increase the plugin version",
                description.id, description.version
            ))),
            _ => {
                self.plugins.insert(key, description.clone());
                Ok(())
            }
        }
    }

    fn register_report(&mut self, report: &MpReportData, replace: bool) -> Result<()> {
        match self.reports.get(&report.uuid) {
            Some(previous) if previous != report && !replace => Err(MpError::validation(format!(
                "a different computation report with the id {} is already stored; \
                 replace the report record or use a different report id",
                report.uuid
            ))),
            _ => {
                self.reports.insert(report.uuid, report.clone());
                Ok(())
            }
        }
    }
}

/// Loads batch computation results into an attribute store.
pub struct MpResultsLoader<'a, S: MpAttributeStore> {
    store: &'a mut S,
    plugin: MpModule,
    description: MpPluginDescription,
}

impl<'a, S: MpAttributeStore> MpResultsLoader<'a, S> {
    /// Loads the plugin with the compute plugin contract and registers its
    /// description.
    pub fn new(
        store: &'a mut S,
        importer: &MpImporter,
        plugin: impl AsRef<Path>,
        replace_plugin_record: bool,
    ) -> Result<Self> {
        let plugin = importer.import(plugin, &MpContract::compute_plugin())?;
        Self::from_module(store, plugin, replace_plugin_record)
    }

    pub fn from_module(store: &'a mut S, plugin: MpModule, replace_plugin_record: bool) -> Result<Self> {
        let description = MpPluginDescription::from_module(&plugin)?;
        store.register_plugin(&description, replace_plugin_record)?;
        Ok(MpResultsLoader {
            store,
            plugin,
            description,
        })
    }

    pub fn plugin(&self) -> &MpModule {
        &self.plugin
    }

    pub fn description(&self) -> &MpPluginDescription {
        &self.description
    }

    fn check_plugin_key(&self, report: &MpReportData) -> Result<()> {
        for (key, expected, found) in [
            ("ID", &self.description.id, &report.plugin_id),
            ("VERSION", &self.description.version, &report.plugin_version),
        ] {
            if expected != found {
                return Err(MpError::validation(format!(
                    "plugin {} mismatch: '{}' in the plugin module, '{}' in the computation report",
                    key, expected, found
                )));
            }
        }
        Ok(())
    }

    /// Loads a results file described by a computation report. Returns the
    /// computation id, or `None` when the results file is empty.
    pub fn run(
        &mut self,
        results: impl AsRef<Path>,
        report: impl AsRef<Path>,
        replace_report_record: bool,
    ) -> Result<Option<Uuid>> {
        let results = results.as_ref();
        if fs::metadata(results)?.len() == 0 {
            log::warn!("{}: results file is empty, nothing to load", results.display());
            return Ok(None);
        }
        let report = MpReportData::from_file(report)?;
        self.check_plugin_key(&report)?;
        self.store.register_report(&report, replace_report_record)?;
        let attributes = self.description.output_names();
        self.store.load_computation(&report.uuid, &attributes, results)?;
        Ok(Some(report.uuid))
    }
}
