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

//! # Nim Plugins
//!
//! The source is compiled into a shared library next to it with
//! `nim c --app:lib -d:release`. A stamp file holding the BLAKE3 digest of
//! the source decides whether the library is stale. Constants are exports
//! named `<prefix><NAME>`, called once without arguments.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::MpLanguageOptions;
use crate::contract::MpContract;
use crate::errors::Result;
use crate::loader::native::{materialize_library, MpConstantLayout};
use crate::loader::{module_name, run_build, MpLoader};
use crate::module::{MpLanguage, MpMaterialized};

#[derive(Clone, Debug, Default)]
pub struct MpNimLoader {
    options: MpLanguageOptions,
}

impl MpNimLoader {
    pub fn new(options: MpLanguageOptions) -> Self {
        MpNimLoader { options }
    }

    /// Builds the library of `source` unless it is up to date, and returns
    /// its path.
    pub fn build(&self, source: &Path) -> Result<PathBuf> {
        let module = module_name(source)?;
        let artifact = artifact_path(source, &module);
        let stamp = stamp_path(&artifact);
        let digest = source_digest(source)?;

        let fresh = artifact.exists()
            && fs::read_to_string(&stamp)
                .map(|s| s.trim() == digest)
                .unwrap_or(false);
        if fresh {
            log::debug!("nim plugin '{}' is up to date", module);
            return Ok(artifact);
        }

        let mut out = OsString::from("--out:");
        out.push(artifact.as_os_str());
        let mut command = Command::new(&self.options.nim_command);
        command
            .arg("c")
            .arg("--app:lib")
            .arg("-d:release")
            .arg(out)
            .arg(source);
        run_build(&module, "nim", command, self.options.verbose)?;
        fs::write(&stamp, &digest)?;
        Ok(artifact)
    }
}

impl MpLoader for MpNimLoader {
    fn language(&self) -> MpLanguage {
        MpLanguage::Nim
    }

    fn materialize(&self, path: &Path, _contract: &MpContract) -> Result<MpMaterialized> {
        let module = module_name(path)?;
        let artifact = self.build(path)?;
        materialize_library(
            &module,
            path,
            &artifact,
            MpLanguage::Nim,
            MpConstantLayout::Prefix(&self.options.nim_const_prefix),
        )
    }
}

/// Platform library file of a module, next to its source.
pub fn artifact_path(source: &Path, module: &str) -> PathBuf {
    let dir = source.parent().unwrap_or_else(|| Path::new("."));
    dir.join(libloading::library_filename(module))
}

fn stamp_path(artifact: &Path) -> PathBuf {
    let mut path = artifact.as_os_str().to_owned();
    path.push(".blake3");
    PathBuf::from(path)
}

/// Hex BLAKE3 digest of a source file.
pub fn source_digest(source: &Path) -> Result<String> {
    let content = fs::read(source)?;
    Ok(hex::encode(blake3::hash(&content).as_bytes()))
}
