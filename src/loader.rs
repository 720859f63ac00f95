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

//! # Language Loaders
//!
//! One loader per plugin language. A loader turns a source file into an
//! [`MpMaterialized`] record; it never checks the contract itself, except
//! for reading shell constants in their declared shape.
//!
//! - [`python`]: embedded interpreter (feature `python`)
//! - [`nim`]: `nim c --app:lib` and dynamic linking
//! - [`rust`]: `cargo build` of a `cdylib` and dynamic linking
//! - [`bash`]: subprocess introspection
//! - [`native`]: the JSON calling convention shared by compiled plugins

use std::path::Path;
use std::process::{Command, Stdio};

use crate::contract::MpContract;
use crate::errors::{MpError, Result};
use crate::module::{MpLanguage, MpMaterialized};

pub mod bash;
pub mod native;
pub mod nim;
#[cfg(feature = "python")]
pub mod python;
pub mod rust;

/// Materializes plugin files of one language.
pub trait MpLoader {
    fn language(&self) -> MpLanguage;

    fn materialize(&self, path: &Path, contract: &MpContract) -> Result<MpMaterialized>;
}

/// Module name of a plugin file: its stem.
pub fn module_name(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| MpError::validation(format!("invalid plugin path '{}'", path.display())))
}

/// Runs an external build tool; a non-zero exit is a build error.
pub(crate) fn run_build(module: &str, tool: &str, mut command: Command, verbose: bool) -> Result<()> {
    log::debug!("building plugin '{}': {:?}", module, command);
    let output = if verbose {
        command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        command.output()
    } else {
        command.stdin(Stdio::null()).output()
    }
    .map_err(|err| MpError::build(module, tool, format!("cannot run {}: {}", tool, err)))?;

    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let message = match stderr.trim() {
        "" => format!("{} exited with {}", tool, output.status),
        text => format!("{} exited with {}: {}", tool, output.status, text),
    };
    Err(MpError::build(module, tool, message))
}
