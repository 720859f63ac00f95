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

//! # Batch Computation
//!
//! Runs the `compute` function of a plugin over many input units and
//! writes one TSV row per unit, the log messages of the plugin and a
//! computation report.
//!
//! ## Lifecycle
//!
//! 1. select the input (glob pattern or ids file, optional id processor,
//!    optional skip list);
//! 2. optionally redirect results and logs to files;
//! 3. set up the computation (parameters, report, `initialize`);
//! 4. run, serially or on a thread pool;
//! 5. finalize (report, `finalize`, flush).
//!
//! The first failing unit stops the run: it is written to the log, the
//! report is closed as `partial` or `aborted` and the error is returned.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::MpBatchConfig;
use crate::contract::MpContract;
use crate::errors::{MpError, Result};
use crate::importer::MpImporter;
use crate::loader::module_name;
use crate::module::MpModule;
use crate::report::{MpReason, MpReport};
use crate::sink::{tsv_reader, MpSink};
use crate::value::{MpKwargs, MpValue};

/// Name of the parameter carrying the plugin state.
pub const STATE: &str = "state";

/// One unit of work: the id passed to `compute` and the id written to the
/// results.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MpUnit {
    pub input_id: String,
    pub output_id: String,
}

/// Where the input units come from.
#[derive(Clone, Debug)]
pub enum MpInputSource {
    /// Files matching a glob pattern; the path is the input id.
    Glob(String),
    /// One column (1-based) of a TSV file.
    IdsFile { path: PathBuf, column: usize },
}

/// Interpreted return value of `compute`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MpComputeOutput {
    pub results: Vec<Value>,
    pub logs: Vec<String>,
}

impl MpComputeOutput {
    /// `[results, logs...]` when the first element is a list, a results
    /// row when the value is a list of scalars, a single cell otherwise.
    pub fn from_value(value: &MpValue) -> Result<Self> {
        let data = value
            .as_data()
            .ok_or_else(|| MpError::validation("compute returned an opaque object"))?;
        let Value::Array(items) = data else {
            return Ok(MpComputeOutput {
                results: vec![data.clone()],
                logs: Vec::new(),
            });
        };
        match items.split_first() {
            Some((Value::Array(results), rest)) => {
                let mut logs = Vec::new();
                for entry in rest {
                    match entry {
                        Value::Array(messages) => logs.extend(messages.iter().filter_map(log_text)),
                        other => logs.extend(log_text(other)),
                    }
                }
                Ok(MpComputeOutput {
                    results: results.clone(),
                    logs,
                })
            }
            _ => Ok(MpComputeOutput {
                results: items.clone(),
                logs: Vec::new(),
            }),
        }
    }

    /// Fields of the results row of a unit.
    pub fn row(&self, output_id: &str) -> Vec<String> {
        let mut row = Vec::with_capacity(self.results.len() + 1);
        row.push(output_id.to_string());
        row.extend(self.results.iter().map(|cell| MpValue::Data(cell.clone()).to_text()));
        row
    }
}

fn log_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        other => Some(MpValue::Data(other.clone()).to_text()),
    }
}

/// Shortens a description to at most `width` characters.
pub fn shorten(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width <= 3 {
        return text.chars().take(width).collect();
    }
    let mut short: String = text.chars().take(width - 3).collect();
    short.push_str("...");
    short
}

/// Ids listed in the first column of a skip-list file.
pub fn read_skip_list(path: &Path) -> Result<HashSet<String>> {
    let mut skip = HashSet::new();
    for record in tsv_reader(path)?.records() {
        let record = record?;
        if let Some(id) = record.get(0) {
            skip.insert(id.trim_end().to_string());
        }
    }
    log::info!("skipping computation for up to {} units", skip.len());
    Ok(skip)
}

/// Ids in one column (1-based) of a TSV file.
pub fn read_ids_column(path: &Path, column: usize) -> Result<Vec<String>> {
    if column < 1 {
        return Err(MpError::validation("idscol must be a positive integer"));
    }
    let mut ids = Vec::new();
    for (line, record) in tsv_reader(path)?.records().enumerate() {
        let record = record?;
        let id = record.get(column - 1).ok_or_else(|| {
            MpError::validation(format!(
                "{}:{}: no column {} in the ids file",
                path.display(),
                line + 1,
                column
            ))
        })?;
        ids.push(id.trim_end().to_string());
    }
    Ok(ids)
}

fn glob_units(pattern: &str) -> Result<Vec<String>> {
    let paths = glob::glob(pattern)
        .map_err(|err| MpError::validation(format!("invalid glob pattern '{}': {}", pattern, err)))?;
    let mut units = Vec::new();
    for entry in paths {
        let path = entry.map_err(|err| MpError::Io(err.to_string()))?;
        units.push(path.to_string_lossy().into_owned());
    }
    Ok(units)
}

/// A batch computation with one compute plugin.
#[derive(Debug)]
pub struct MpBatchComputation {
    plugin: MpModule,
    importer: MpImporter,
    config: MpBatchConfig,
    description: String,
    units: Option<Vec<MpUnit>>,
    output: MpSink,
    log: MpSink,
    params: MpKwargs,
    report: Option<MpReport>,
    computed: bool,
}

impl MpBatchComputation {
    /// Loads `plugin` with the compute plugin contract.
    pub fn new(importer: MpImporter, plugin: impl AsRef<Path>, config: MpBatchConfig) -> Result<Self> {
        let plugin = plugin.as_ref();
        let module = importer.import(plugin, &MpContract::compute_plugin())?;
        Ok(Self::from_module(importer, module, config))
    }

    /// Uses an already loaded plugin.
    pub fn from_module(importer: MpImporter, plugin: MpModule, config: MpBatchConfig) -> Self {
        let stem = module_name(plugin.path()).unwrap_or_else(|_| plugin.name().to_string());
        MpBatchComputation {
            description: shorten(&stem, config.description_width),
            plugin,
            importer,
            config,
            units: None,
            output: MpSink::Stdout,
            log: MpSink::Stderr,
            params: MpKwargs::new(),
            report: None,
            computed: false,
        }
    }

    pub fn plugin(&self) -> &MpModule {
        &self.plugin
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Units selected for computation, once input is selected.
    pub fn units(&self) -> Option<&[MpUnit]> {
        self.units.as_deref()
    }

    pub fn report(&self) -> Option<&MpReport> {
        self.report.as_ref()
    }

    /// Selects the input units.
    ///
    /// The output id of a unit is computed by the `compute_id` function of
    /// `idsproc`, if given. Units whose output id is in the skip list are
    /// left out; every skip entry matches at most once.
    pub fn select_input(
        &mut self,
        source: MpInputSource,
        idsproc: Option<&Path>,
        skip: Option<&Path>,
    ) -> Result<()> {
        let idsproc = match idsproc {
            Some(path) => Some(self.importer.import(path, &MpContract::id_processor())?),
            None => None,
        };
        let mut skip = match skip {
            Some(path) => read_skip_list(path)?,
            None => {
                log::info!("no skip list, all input units will be processed");
                HashSet::new()
            }
        };
        let (names, is_filename) = match &source {
            MpInputSource::Glob(pattern) => (glob_units(pattern)?, true),
            MpInputSource::IdsFile { path, column } => (read_ids_column(path, *column)?, false),
        };

        let mut units = Vec::with_capacity(names.len());
        for name in names {
            let output_id = match &idsproc {
                Some(module) => {
                    let id = module.call("compute_id", &[MpValue::str(name.as_str())], &MpKwargs::new())?;
                    id.as_str().map(str::to_string).unwrap_or_else(|| id.to_text())
                }
                None => name.clone(),
            };
            if skip.remove(&output_id) {
                continue;
            }
            let input_id = if is_filename { name } else { output_id.clone() };
            units.push(MpUnit { input_id, output_id });
        }
        log::info!("{} input units selected", units.len());
        self.units = Some(units);
        Ok(())
    }

    pub fn input_from_globpattern(
        &mut self,
        pattern: &str,
        idsproc: Option<&Path>,
        skip: Option<&Path>,
    ) -> Result<()> {
        self.select_input(MpInputSource::Glob(pattern.to_string()), idsproc, skip)
    }

    pub fn input_from_idsfile(
        &mut self,
        path: impl Into<PathBuf>,
        column: usize,
        idsproc: Option<&Path>,
        skip: Option<&Path>,
    ) -> Result<()> {
        self.select_input(
            MpInputSource::IdsFile {
                path: path.into(),
                column,
            },
            idsproc,
            skip,
        )
    }

    /// Appends results and logs to files instead of stdout and stderr.
    pub fn set_output(&mut self, output: Option<&Path>, log: Option<&Path>) -> Result<()> {
        self.output = match output {
            Some(path) => MpSink::append(path)?,
            None => MpSink::Stdout,
        };
        self.log = match log {
            Some(path) => MpSink::append(path)?,
            None => MpSink::Stderr,
        };
        Ok(())
    }

    /// Prepares the computation: starts the report and calls `initialize`
    /// with the entries of the `state` parameter, replacing it with the
    /// returned state.
    pub fn setup_computation(
        &mut self,
        mut params: MpKwargs,
        report: Option<MpSink>,
        user: Option<String>,
        system: Option<String>,
        reason: Option<MpReason>,
    ) -> Result<()> {
        if self.report.is_some() {
            return Err(MpError::config("computation already set up"));
        }
        let report = MpReport::new(
            &self.plugin,
            report,
            user,
            system,
            reason,
            &params,
            &self.config.unit,
        )?;
        if self.plugin.has_function("initialize") {
            let state_kwargs = match params.get(STATE) {
                None => MpKwargs::new(),
                Some(value) => match value.as_data() {
                    Some(Value::Null) => MpKwargs::new(),
                    Some(Value::Object(map)) => map
                        .iter()
                        .map(|(k, v)| (k.clone(), MpValue::Data(v.clone())))
                        .collect(),
                    _ => {
                        return Err(MpError::validation(
                            "the state parameter must be a mapping of initialize arguments",
                        ))
                    }
                },
            };
            let state = self.plugin.call("initialize", &[], &state_kwargs)?;
            params.insert(STATE.to_string(), state);
        }
        self.params = params;
        self.report = Some(report);
        Ok(())
    }

    fn compute_one(&self, unit: &MpUnit) -> Result<MpComputeOutput> {
        let value = self
            .plugin
            .call("compute", &[MpValue::str(unit.input_id.as_str())], &self.params)?;
        MpComputeOutput::from_value(&value)
    }

    /// Computes every selected unit.
    pub fn run(&mut self) -> Result<()> {
        let units = self
            .units
            .take()
            .ok_or_else(|| MpError::config("input was not selected"))?;
        let result = self.run_units(&units);
        self.units = Some(units);
        result
    }

    fn run_units(&mut self, units: &[MpUnit]) -> Result<()> {
        if self.report.is_none() {
            self.setup_computation(MpKwargs::new(), None, None, None, None)?;
        }
        if units.is_empty() {
            log::warn!("{}: no input units to compute", self.description);
            self.computed = true;
            return Ok(());
        }

        let total = units.len();
        if self.config.parallel && cfg!(feature = "parallel") {
            log::info!("{}: computing {} units in parallel", self.description, total);
            let outputs = self.compute_parallel(units);
            for (index, (unit, output)) in units.iter().zip(outputs).enumerate() {
                self.handle(unit, output)?;
                self.progress(index + 1, total);
            }
        } else {
            log::info!("{}: computing {} units serially", self.description, total);
            for (index, unit) in units.iter().enumerate() {
                let output = self.compute_one(unit);
                self.handle(unit, output)?;
                self.progress(index + 1, total);
            }
        }
        self.output.flush()?;
        self.log.flush()?;
        self.computed = true;
        Ok(())
    }

    #[cfg(feature = "parallel")]
    fn compute_parallel(&self, units: &[MpUnit]) -> Vec<Result<MpComputeOutput>> {
        use rayon::prelude::*;
        units.par_iter().map(|unit| self.compute_one(unit)).collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn compute_parallel(&self, units: &[MpUnit]) -> Vec<Result<MpComputeOutput>> {
        units.iter().map(|unit| self.compute_one(unit)).collect()
    }

    fn progress(&self, done: usize, total: usize) {
        if !self.config.progress {
            return;
        }
        let interval = self.config.progress_interval.max(1);
        if done % interval == 0 || done == total {
            log::info!("{}: {}/{} units", self.description, done, total);
        }
    }

    fn handle(&mut self, unit: &MpUnit, output: Result<MpComputeOutput>) -> Result<()> {
        match output {
            Ok(output) => {
                if !output.results.is_empty() {
                    self.output.write_record(output.row(&unit.output_id))?;
                }
                for message in &output.logs {
                    self.log.write_record([unit.output_id.as_str(), message.as_str()])?;
                }
                if let Some(report) = self.report.as_mut() {
                    report.step();
                }
                Ok(())
            }
            Err(err) => Err(self.fail(unit, err)),
        }
    }

    fn fail(&mut self, unit: &MpUnit, err: MpError) -> MpError {
        let failure = MpError::Compute {
            unit: unit.output_id.clone(),
            message: err.to_string(),
        };
        log::error!("{}", failure);
        let line = [unit.output_id.clone(), failure.to_string()];
        if let Err(write_err) = self.log.write_record(line) {
            log::warn!("cannot write the log line of {}: {}", unit.output_id, write_err);
        }
        if let Err(flush_err) = self.log.flush().and_then(|_| self.output.flush()) {
            log::warn!("cannot flush the batch outputs: {}", flush_err);
        }
        if let Some(report) = self.report.as_mut() {
            if let Err(report_err) = report.error(&err, &unit.output_id) {
                log::warn!("cannot write the computation report: {}", report_err);
            }
        }
        failure
    }

    /// Closes the report, calls `finalize` with the state and flushes the
    /// outputs.
    pub fn finalize(&mut self) -> Result<()> {
        if !self.computed {
            return Err(MpError::config("computation not run"));
        }
        if let Some(report) = self.report.as_mut() {
            report.finalize()?;
        }
        if self.plugin.has_function("finalize") {
            let state = self.params.get(STATE).cloned().unwrap_or_else(MpValue::null);
            self.plugin.call("finalize", &[state], &MpKwargs::new())?;
        }
        self.output.flush()?;
        self.log.flush()?;
        Ok(())
    }
}
