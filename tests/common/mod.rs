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

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tempfile::TempDir;

pub fn fixture(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(relative)
}

/// True if `tool --version` runs successfully.
pub fn has_tool(tool: &str) -> bool {
    Command::new(tool)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Copies a fixture into a fresh directory, so that builds never write
/// into the source tree and concurrent tests do not share a directory.
pub fn scratch_copy(relative: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create scratch dir");
    let source = fixture(relative);
    let file_name = source.file_name().expect("fixture file name");
    let target = dir.path().join(file_name);
    fs::copy(&source, &target).expect("copy fixture");
    (dir, target)
}

pub fn example_fas() -> String {
    fixture("example.fas").to_string_lossy().into_owned()
}
