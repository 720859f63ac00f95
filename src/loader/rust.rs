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

//! # Rust Plugins
//!
//! A plugin is a single `.rs` file built as a `cdylib` with cargo. When the
//! directory has no `Cargo.toml`, a minimal manifest is generated for the
//! duration of the build and removed afterwards, together with its lock
//! file. Dependencies are declared in the source with comments such as
//!
//! ```text
//! // [dependencies] serde_json = "1"
//! ```
//!
//! The built library is linked next to the source and loaded from there.
//! Constants are the members of the object returned by one container export.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use regex::Regex;

use crate::config::MpLanguageOptions;
use crate::contract::MpContract;
use crate::errors::{MpError, Result};
use crate::loader::native::{materialize_library, MpConstantLayout};
use crate::loader::{module_name, run_build, MpLoader};
use crate::module::{MpLanguage, MpMaterialized};

const MANIFEST: &str = "Cargo.toml";
const LOCK_FILE: &str = "Cargo.lock";

const DEPENDENCY_MARKER: &str = r"(?m)^[ \t]*//[ \t]*\[dependencies\][ \t]*(\S.*?)[ \t]*$";

/// Library name of a plugin: the stem with dashes replaced.
pub fn library_name(module: &str) -> String {
    module.replace('-', "_")
}

/// Manifest used to build a plugin without a `Cargo.toml` of its own.
pub fn generate_manifest(module: &str, source_text: &str) -> Result<String> {
    let marker = Regex::new(DEPENDENCY_MARKER).map_err(|err| MpError::internal(err.to_string()))?;
    let mut manifest = format!(
        "[package]\nname = \"{module}\"\nversion = \"0.1.0\"\nedition = \"2021\"\n\n\
         [workspace]\n\n\
         [lib]\nname = \"{lib}\"\npath = \"{module}.rs\"\ncrate-type = [\"cdylib\"]\n\n\
         [dependencies]\n",
        module = module,
        lib = library_name(module),
    );
    for capture in marker.captures_iter(source_text) {
        manifest.push_str(&capture[1]);
        manifest.push('\n');
    }
    Ok(manifest)
}

/// Temporary manifest of a plugin build.
///
/// A manifest written by the guard is removed with its lock file when the
/// guard is dropped. A manifest that already existed is left alone.
#[derive(Debug)]
pub struct MpManifestGuard {
    manifest: PathBuf,
    generated: bool,
}

impl MpManifestGuard {
    pub fn ensure(source: &Path, module: &str) -> Result<Self> {
        let dir = source.parent().unwrap_or_else(|| Path::new("."));
        let manifest = dir.join(MANIFEST);
        if manifest.exists() {
            return Ok(MpManifestGuard {
                manifest,
                generated: false,
            });
        }
        let source_text = fs::read_to_string(source)?;
        fs::write(&manifest, generate_manifest(module, &source_text)?)?;
        log::debug!("generated temporary manifest {}", manifest.display());
        Ok(MpManifestGuard {
            manifest,
            generated: true,
        })
    }

    pub fn path(&self) -> &Path {
        &self.manifest
    }

    pub fn is_generated(&self) -> bool {
        self.generated
    }
}

impl Drop for MpManifestGuard {
    fn drop(&mut self) {
        if !self.generated {
            return;
        }
        let lock = self.manifest.with_file_name(LOCK_FILE);
        for path in [&self.manifest, &lock] {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => log::warn!("cannot remove {}: {}", path.display(), err),
            }
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MpRustLoader {
    options: MpLanguageOptions,
}

impl MpRustLoader {
    pub fn new(options: MpLanguageOptions) -> Self {
        MpRustLoader { options }
    }

    /// Builds the plugin and links the library next to the source.
    pub fn build(&self, source: &Path) -> Result<PathBuf> {
        let module = module_name(source)?;
        let dir = source.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
        let file_name = libloading::library_filename(library_name(&module));

        {
            let guard = MpManifestGuard::ensure(source, &module)?;
            let mut command = Command::new(&self.options.cargo_command);
            command
                .arg("build")
                .arg("--release")
                .arg("--manifest-path")
                .arg(guard.path())
                .arg("--target-dir")
                .arg(dir.join("target"));
            run_build(&module, "cargo", command, self.options.verbose)?;
        }

        let built = dir.join("target").join("release").join(&file_name);
        if !built.exists() {
            return Err(MpError::build(
                &module,
                "cargo",
                format!("expected library {} was not produced", built.display()),
            ));
        }
        let link = dir.join(&file_name);
        link_library(&built, &link, &file_name)?;
        Ok(link)
    }
}

#[cfg(unix)]
fn link_library(_built: &Path, link: &Path, file_name: &std::ffi::OsStr) -> Result<()> {
    if fs::symlink_metadata(link).is_ok() {
        fs::remove_file(link)?;
    }
    let target = Path::new("target").join("release").join(file_name);
    std::os::unix::fs::symlink(target, link)?;
    Ok(())
}

#[cfg(not(unix))]
fn link_library(built: &Path, link: &Path, _file_name: &std::ffi::OsStr) -> Result<()> {
    fs::copy(built, link)?;
    Ok(())
}

impl MpLoader for MpRustLoader {
    fn language(&self) -> MpLanguage {
        MpLanguage::Rust
    }

    fn materialize(&self, path: &Path, _contract: &MpContract) -> Result<MpMaterialized> {
        let module = module_name(path)?;
        let artifact = self.build(path)?;
        materialize_library(
            &module,
            path,
            &artifact,
            MpLanguage::Rust,
            MpConstantLayout::Container(&self.options.rust_const_container),
        )
    }
}
