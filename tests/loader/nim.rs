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

use std::fs;

use serde_json::json;

use multiplug::loader::nim::{artifact_path, MpNimLoader};
use multiplug::{MpContract, MpError, MpImporter, MpKwargs, MpLanguageOptions, MpValue};

#[path = "../common/mod.rs"]
mod common;

use common::{example_fas, has_tool, scratch_copy};

#[test]
fn fas_stats_is_compiled_and_called() {
    if !has_tool("nim") {
        return;
    }
    let (_dir, source) = scratch_copy("nim/fas_stats_nim.nim");
    let plugin = MpImporter::default()
        .import(&source, &MpContract::compute_plugin())
        .expect("compile and load fas_stats_nim.nim");
    assert_eq!(plugin.constant_str("ID"), Some("fas_stats_nim"));
    assert_eq!(
        plugin.constant("OUTPUT"),
        Some(&MpValue::string_list(["genome_size", "GC_content"]))
    );
    assert!(!plugin.has_function("const_ID"));
    let result = plugin
        .call("compute", &[MpValue::str(example_fas())], &MpKwargs::new())
        .unwrap();
    assert_eq!(result, MpValue::from(json!([["800", "0.41"], []])));
}

#[test]
fn fresh_library_is_not_rebuilt() {
    if !has_tool("nim") {
        return;
    }
    let (_dir, source) = scratch_copy("nim/fas_stats_nim.nim");
    let loader = MpNimLoader::new(MpLanguageOptions::default());
    let artifact = loader.build(&source).unwrap();
    assert_eq!(artifact, artifact_path(&source, "fas_stats_nim"));
    let built = fs::metadata(&artifact).unwrap().modified().unwrap();
    loader.build(&source).unwrap();
    assert_eq!(fs::metadata(&artifact).unwrap().modified().unwrap(), built);
}

#[test]
fn custom_prefix_hides_the_constants() {
    if !has_tool("nim") {
        return;
    }
    let (_dir, source) = scratch_copy("nim/fas_stats_nim.nim");
    let importer = MpImporter::new(MpLanguageOptions {
        nim_const_prefix: "meta_".to_string(),
        ..MpLanguageOptions::default()
    });
    let err = importer
        .import(&source, &MpContract::compute_plugin())
        .unwrap_err();
    assert!(matches!(err, MpError::InterfaceRequirement { .. }));
    let plugin = importer
        .import(&source, &MpContract::new().require_function("compute"))
        .unwrap();
    assert!(plugin.has_function("const_ID"));
}

#[test]
fn build_failures_name_the_tool() {
    let (_dir, source) = scratch_copy("nim/fas_stats_nim.nim");
    let importer = MpImporter::new(MpLanguageOptions {
        nim_command: "multiplug-no-such-nim".to_string(),
        ..MpLanguageOptions::default()
    });
    let err = importer
        .import(&source, &MpContract::compute_plugin())
        .unwrap_err();
    assert!(matches!(err, MpError::Build { .. }), "{err}");
}
