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

//! # Plugin Modules
//!
//! A loader turns a plugin file into an [`MpMaterialized`] record holding
//! every member it could find. The enforcer then checks the record against
//! a contract and freezes it into an [`MpModule`], the language-independent
//! handle used by callers.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::{MpError, Result};
use crate::value::{MpKwargs, MpValue};

/// Language a plugin was written in, which is also the loading path used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MpLanguage {
    /// Executed in-process by an embedded interpreter.
    Python,
    /// Compiled ahead of time into a shared library; constants are
    /// zero-argument functions with a name prefix.
    Nim,
    /// Compiled ahead of time into a shared library; constants are members
    /// of a container export.
    Rust,
    /// Shell script, introspected and called through subprocesses.
    Bash,
}

impl MpLanguage {
    pub fn as_str(&self) -> &'static str {
        match self {
            MpLanguage::Python => "python",
            MpLanguage::Nim => "nim",
            MpLanguage::Rust => "rust",
            MpLanguage::Bash => "bash",
        }
    }

    /// Language of a file suffix (including the dot), if recognized.
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            ".py" => Some(MpLanguage::Python),
            ".nim" => Some(MpLanguage::Nim),
            ".rs" => Some(MpLanguage::Rust),
            ".sh" => Some(MpLanguage::Bash),
            _ => None,
        }
    }
}

impl fmt::Display for MpLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameter list of a function, where the host runtime exposes it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MpSignature {
    pub fixed_params: Vec<String>,
    pub accepts_extra_positional: bool,
    pub accepts_extra_keyword: bool,
}

/// A function exported by a plugin.
pub trait MpFunction: Send + Sync + fmt::Debug {
    fn call(&self, args: &[MpValue], kwargs: &MpKwargs) -> Result<MpValue>;

    /// Signature of the function; only runtimes with reflection provide it.
    fn signature(&self) -> Option<MpSignature> {
        None
    }
}

/// Everything a loader found in a plugin file, before contract checks.
#[derive(Debug)]
pub struct MpMaterialized {
    pub name: String,
    pub path: PathBuf,
    pub language: MpLanguage,
    pub constants: BTreeMap<String, MpValue>,
    pub functions: BTreeMap<String, Arc<dyn MpFunction>>,
    /// Informational lines produced while loading.
    pub notes: Vec<String>,
    /// Set when the loader cannot import constants at all.
    pub constants_disabled: bool,
}

impl MpMaterialized {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, language: MpLanguage) -> Self {
        MpMaterialized {
            name: name.into(),
            path: path.into(),
            language,
            constants: BTreeMap::new(),
            functions: BTreeMap::new(),
            notes: Vec::new(),
            constants_disabled: false,
        }
    }
}

/// Normalized handle of a loaded plugin.
///
/// Members declared optional by the contract but not defined by the plugin
/// are present with an explicit absent value (`None`).
#[derive(Clone)]
pub struct MpModule {
    name: String,
    path: PathBuf,
    language: MpLanguage,
    constants: BTreeMap<String, Option<MpValue>>,
    functions: BTreeMap<String, Option<Arc<dyn MpFunction>>>,
}

impl MpModule {
    pub(crate) fn from_parts(
        name: String,
        path: PathBuf,
        language: MpLanguage,
        constants: BTreeMap<String, Option<MpValue>>,
        functions: BTreeMap<String, Option<Arc<dyn MpFunction>>>,
    ) -> Self {
        MpModule {
            name,
            path,
            language,
            constants,
            functions,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn language(&self) -> MpLanguage {
        self.language
    }

    /// Value of a constant; `None` when absent or unknown.
    pub fn constant(&self, name: &str) -> Option<&MpValue> {
        self.constants.get(name).and_then(Option::as_ref)
    }

    pub fn function(&self, name: &str) -> Option<&Arc<dyn MpFunction>> {
        self.functions.get(name).and_then(Option::as_ref)
    }

    pub fn has_constant(&self, name: &str) -> bool {
        self.constant(name).is_some()
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.function(name).is_some()
    }

    /// True if the name is known to the handle, defined or marked absent.
    pub fn is_known(&self, name: &str) -> bool {
        self.constants.contains_key(name) || self.functions.contains_key(name)
    }

    pub fn constant_names(&self) -> impl Iterator<Item = &str> {
        self.constants.keys().map(String::as_str)
    }

    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    /// Constant as a string, if it is defined and is one.
    pub fn constant_str(&self, name: &str) -> Option<&str> {
        self.constant(name).and_then(MpValue::as_str)
    }

    pub fn signature_of(&self, name: &str) -> Option<MpSignature> {
        self.function(name).and_then(|f| f.signature())
    }

    /// Calls a function of the plugin.
    pub fn call(&self, name: &str, args: &[MpValue], kwargs: &MpKwargs) -> Result<MpValue> {
        let function = self.function(name).ok_or_else(|| {
            MpError::plugin(&self.name, format!("function '{}' is not defined", name))
        })?;
        function.call(args, kwargs)
    }
}

impl fmt::Debug for MpModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MpModule")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("language", &self.language)
            .field("constants", &self.constants)
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}
