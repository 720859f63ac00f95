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

//! # Shell Plugins
//!
//! Shell scripts are never kept in memory: every probe and every call runs
//! `bash -c` with a snippet that sources the script first. Members are found
//! two ways:
//!
//! - declared members are probed one by one (`${NAME+x}`, `declare -p`,
//!   `type -t`);
//! - undeclared members are discovered by diffing the output of `set`
//!   before and after sourcing the script.
//!
//! Constants declared by the contract are read in their declared shape.
//! Function output and undeclared constants go through
//! [`MpShellOutput::unflatten`].

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::Arc;

use regex::Regex;
use tempfile::NamedTempFile;

use crate::config::MpLanguageOptions;
use crate::contract::MpContract;
use crate::errors::{MpError, Result};
use crate::loader::{module_name, MpLoader};
use crate::module::{MpFunction, MpLanguage, MpMaterialized};
use crate::value::{MpKwargs, MpShape, MpValue};

/// Variables bash sets by itself while sourcing a script.
const NOISE_NAMES: &[&str] = &[
    "PIPESTATUS",
    "COMP_WORDBREAKS",
    "LINENO",
    "FUNCNAME",
    "OLDPWD",
    "SECONDS",
    "RANDOM",
];

/// Caller environment variables visible to a shell plugin.
const PASSED_ENV: &[&str] = &["PATH", "HOME"];

const VARIABLE_LINE: &str = r"^([A-Za-z][A-Za-z0-9_]*)=";
const FUNCTION_LINE: &str = r"^([A-Za-z][A-Za-z0-9_]*) \(\)";

/// Output of a shell function, classified by its separators.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MpShellOutput {
    /// Neither newlines nor tabs.
    Scalar(String),
    /// Newlines only: one element per line.
    List(Vec<String>),
    /// Tabs only: one element per field.
    Tuple(Vec<String>),
    /// Newlines and tabs: rows of fields.
    Table(Vec<Vec<String>>),
}

impl MpShellOutput {
    /// Classifies captured output after stripping one trailing newline.
    pub fn unflatten(text: &str) -> Self {
        let text = text.strip_suffix('\n').unwrap_or(text);
        let split_fields = |line: &str| line.split('\t').map(str::to_string).collect::<Vec<_>>();
        match (text.contains('\n'), text.contains('\t')) {
            (true, true) => MpShellOutput::Table(text.split('\n').map(split_fields).collect()),
            (true, false) => MpShellOutput::List(text.split('\n').map(str::to_string).collect()),
            (false, true) => MpShellOutput::Tuple(split_fields(text)),
            (false, false) => MpShellOutput::Scalar(text.to_string()),
        }
    }

    pub fn into_value(self) -> MpValue {
        match self {
            MpShellOutput::Scalar(s) => MpValue::str(s),
            MpShellOutput::List(items) | MpShellOutput::Tuple(items) => MpValue::string_list(items),
            MpShellOutput::Table(rows) => MpValue::table(rows),
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_noise(name: &str) -> bool {
    name.starts_with('_') || name.starts_with("BASH") || NOISE_NAMES.contains(&name)
}

/// Lines of a captured output; empty output has no lines.
fn output_lines(text: &str) -> Vec<String> {
    let text = text.strip_suffix('\n').unwrap_or(text);
    if text.is_empty() {
        Vec::new()
    } else {
        text.split('\n').map(str::to_string).collect()
    }
}

/// Names of the variables and functions in the output of `set`.
pub fn parse_set_output(text: &str) -> Result<(BTreeSet<String>, BTreeSet<String>)> {
    let variable = Regex::new(VARIABLE_LINE).map_err(|err| MpError::internal(err.to_string()))?;
    let function = Regex::new(FUNCTION_LINE).map_err(|err| MpError::internal(err.to_string()))?;
    let mut variables = BTreeSet::new();
    let mut functions = BTreeSet::new();
    for line in text.lines() {
        if let Some(capture) = variable.captures(line) {
            variables.insert(capture[1].to_string());
        } else if let Some(capture) = function.captures(line) {
            functions.insert(capture[1].to_string());
        }
    }
    Ok((variables, functions))
}

/// A shell script run through `bash -c`.
#[derive(Debug)]
pub struct MpBashScript {
    module: String,
    path: PathBuf,
    bash: String,
}

impl MpBashScript {
    pub fn new(module: impl Into<String>, path: impl Into<PathBuf>, bash: impl Into<String>) -> Self {
        MpBashScript {
            module: module.into(),
            path: path.into(),
            bash: bash.into(),
        }
    }

    /// A `bash -c` command with an environment reduced to
    /// [`PASSED_ENV`], so that only the script can define members.
    fn command(&self) -> Command {
        let mut command = Command::new(&self.bash);
        command.env_clear();
        for name in PASSED_ENV {
            if let Some(value) = env::var_os(name) {
                command.env(name, value);
            }
        }
        command.stdin(Stdio::null());
        command
    }

    /// Runs `snippet` with the script path as `$0` and `args` as `$1...`.
    fn spawn(&self, snippet: &str, args: &[String]) -> Result<Output> {
        log::debug!("{} -c '{}' {}", self.bash, snippet, self.path.display());
        self.command()
            .arg("-c")
            .arg(snippet)
            .arg(&self.path)
            .args(args)
            .stderr(Stdio::inherit())
            .output()
            .map_err(|err| MpError::plugin(&self.module, format!("cannot run {}: {}", self.bash, err)))
    }

    /// Runs `snippet` and returns its standard output; a non-zero exit is a
    /// plugin error.
    pub fn run(&self, snippet: &str, args: &[String]) -> Result<String> {
        let output = self.spawn(snippet, args)?;
        if !output.status.success() {
            return Err(MpError::plugin(
                &self.module,
                format!("'{}' exited with {}", snippet, output.status),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn succeeds(&self, snippet: &str) -> Result<bool> {
        Ok(self.spawn(snippet, &[])?.status.success())
    }

    pub fn has_variable(&self, name: &str) -> Result<bool> {
        self.succeeds(&format!(". \"$0\" >/dev/null; [ -n \"${{{}+x}}\" ]", name))
    }

    pub fn is_array(&self, name: &str) -> Result<bool> {
        let declaration = self.run(
            &format!(". \"$0\" >/dev/null; declare -p {} 2>/dev/null || true", name),
            &[],
        )?;
        Ok(declaration.starts_with("declare -a"))
    }

    pub fn has_function(&self, name: &str) -> Result<bool> {
        let kind = self.run(
            &format!(". \"$0\" >/dev/null; type -t {} || true", name),
            &[],
        )?;
        Ok(kind.trim() == "function")
    }

    fn read_scalar(&self, name: &str) -> Result<String> {
        let text = self.run(&format!(". \"$0\" >/dev/null; echo -e \"${}\"", name), &[])?;
        Ok(text.strip_suffix('\n').unwrap_or(&text).to_string())
    }

    fn read_elements(&self, name: &str) -> Result<Vec<String>> {
        let text = self.run(
            &format!(
                ". \"$0\" >/dev/null; for e in \"${{{}[@]}}\"; do echo -e \"$e\"; done",
                name
            ),
            &[],
        )?;
        Ok(output_lines(&text))
    }

    /// Reads a constant in the given shape.
    pub fn read_constant(&self, name: &str, shape: MpShape) -> Result<MpValue> {
        Ok(match shape {
            MpShape::Scalar => MpValue::str(self.read_scalar(name)?),
            MpShape::List => MpValue::string_list(self.read_elements(name)?),
            MpShape::Nested => MpValue::table(
                self.read_elements(name)?
                    .iter()
                    .map(|e| e.split('\t').map(str::to_string).collect::<Vec<_>>()),
            ),
        })
    }

    /// Reads a constant whose shape is not declared: arrays are lists, or
    /// tables when an element contains a tab; everything else is a scalar.
    pub fn read_undeclared(&self, name: &str) -> Result<MpValue> {
        if !self.is_array(name)? {
            return self.read_constant(name, MpShape::Scalar);
        }
        let elements = self.read_elements(name)?;
        if elements.iter().any(|e| e.contains('\t')) {
            self.read_constant(name, MpShape::Nested)
        } else {
            Ok(MpValue::string_list(elements))
        }
    }

    /// Variables and functions defined by sourcing the script.
    pub fn discover(&self) -> Result<(BTreeSet<String>, BTreeSet<String>)> {
        let before = NamedTempFile::new()?;
        let after = NamedTempFile::new()?;
        let before_path = before.path().to_string_lossy().into_owned();
        let after_path = after.path().to_string_lossy().into_owned();

        let output = self
            .command()
            .arg("-c")
            .arg("set > \"$0\"")
            .arg(&before_path)
            .output()
            .map_err(|err| MpError::plugin(&self.module, format!("cannot run {}: {}", self.bash, err)))?;
        if !output.status.success() {
            return Err(MpError::plugin(&self.module, "cannot snapshot the shell environment"));
        }
        self.run(". \"$0\" >/dev/null; set > \"$1\"", &[after_path])?;

        let (vars_before, funcs_before) = parse_set_output(&fs::read_to_string(before.path())?)?;
        let (vars_after, funcs_after) = parse_set_output(&fs::read_to_string(after.path())?)?;
        let fresh = |after: BTreeSet<String>, before: &BTreeSet<String>| {
            after
                .into_iter()
                .filter(|name| !before.contains(name) && !is_noise(name))
                .collect::<BTreeSet<_>>()
        };
        Ok((fresh(vars_after, &vars_before), fresh(funcs_after, &funcs_before)))
    }
}

/// A function of a shell plugin.
#[derive(Debug)]
pub struct MpShellFunction {
    script: Arc<MpBashScript>,
    name: String,
}

impl MpFunction for MpShellFunction {
    /// Positional arguments are passed as they are, keyword arguments as
    /// `key=value`; the captured output is unflattened.
    fn call(&self, args: &[MpValue], kwargs: &MpKwargs) -> Result<MpValue> {
        let mut argv = Vec::with_capacity(args.len() + kwargs.len());
        for value in args.iter().chain(kwargs.values()) {
            if let MpValue::Object(_) = value {
                return Err(MpError::plugin(
                    &self.script.module,
                    "opaque objects cannot be passed to a shell plugin",
                ));
            }
        }
        argv.extend(args.iter().map(MpValue::to_text));
        argv.extend(kwargs.iter().map(|(k, v)| format!("{}={}", k, v.to_text())));
        let output = self
            .script
            .run(&format!(". \"$0\" >/dev/null; {} \"$@\"", self.name), &argv)?;
        Ok(MpShellOutput::unflatten(&output).into_value())
    }
}

#[derive(Clone, Debug, Default)]
pub struct MpBashLoader {
    options: MpLanguageOptions,
}

impl MpBashLoader {
    pub fn new(options: MpLanguageOptions) -> Self {
        MpBashLoader { options }
    }
}

impl MpLoader for MpBashLoader {
    fn language(&self) -> MpLanguage {
        MpLanguage::Bash
    }

    fn materialize(&self, path: &Path, contract: &MpContract) -> Result<MpMaterialized> {
        let module = module_name(path)?;
        let script = Arc::new(MpBashScript::new(
            module.clone(),
            path,
            self.options.bash_command.clone(),
        ));
        let (variables, functions) = script.discover()?;
        let mut materialized = MpMaterialized::new(module.clone(), path, MpLanguage::Bash);

        let declared_constants = contract
            .required
            .constants
            .entries()
            .into_iter()
            .chain(contract.optional.constants.entries());
        for (name, shape) in declared_constants {
            if !is_identifier(name) {
                return Err(MpError::config(format!("invalid shell constant name '{}'", name)));
            }
            if script.has_variable(name)? {
                let value = script.read_constant(name, shape)?;
                materialized.constants.insert(name.to_string(), value);
            }
        }
        for name in &variables {
            if contract.shape_of(name).is_none() {
                let value = script.read_undeclared(name)?;
                materialized.constants.insert(name.clone(), value);
            }
        }

        let declared_functions = contract
            .required
            .functions
            .iter()
            .chain(&contract.optional.functions);
        let mut names = BTreeSet::new();
        for name in declared_functions {
            if !is_identifier(name) {
                return Err(MpError::config(format!("invalid shell function name '{}'", name)));
            }
            if script.has_function(name)? {
                names.insert(name.clone());
            }
        }
        names.extend(functions);
        for name in names {
            let function = MpShellFunction {
                script: Arc::clone(&script),
                name: name.clone(),
            };
            materialized.functions.insert(name, Arc::new(function));
        }
        log::debug!(
            "loaded bash plugin '{}': {} functions, {} constants",
            module,
            materialized.functions.len(),
            materialized.constants.len()
        );
        Ok(materialized)
    }
}
