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

use multiplug::{
    MpContract, MpError, MpImporter, MpKwargs, MpLanguage, MpLanguageOptions, MpShape, MpValue,
};

#[path = "../common/mod.rs"]
mod common;

use common::{fixture, has_tool};

#[test]
fn unknown_suffix_is_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plugin.txt");
    fs::write(&path, "ID = 1\n").unwrap();
    let err = MpImporter::default()
        .import(&path, &MpContract::new())
        .unwrap_err();
    match err {
        MpError::UnsupportedLanguage { suffix, .. } => assert_eq!(suffix, ".txt"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn suffixes_map_to_languages() {
    let importer = MpImporter::default();
    for (file, language) in [
        ("a.py", MpLanguage::Python),
        ("a.nim", MpLanguage::Nim),
        ("a.rs", MpLanguage::Rust),
        ("a.sh", MpLanguage::Bash),
    ] {
        assert_eq!(importer.language_of(file.as_ref()).unwrap(), language);
    }
    assert!(importer.language_of("Makefile".as_ref()).is_err());
}

#[test]
fn disabled_bash_is_unsupported() {
    let options = MpLanguageOptions {
        disable_bash: true,
        ..MpLanguageOptions::default()
    };
    let err = MpImporter::new(options)
        .import(fixture("bash/fas_stats.sh"), &MpContract::compute_plugin())
        .unwrap_err();
    assert!(matches!(err, MpError::UnsupportedLanguage { .. }));
    assert!(err.to_string().contains("disabled"));
}

#[cfg(not(feature = "python"))]
#[test]
fn python_needs_its_feature() {
    let err = MpImporter::default()
        .import(fixture("python/fas_stats_py.py"), &MpContract::compute_plugin())
        .unwrap_err();
    assert!(matches!(err, MpError::UnsupportedLanguage { .. }));
}

#[test]
fn overlapping_contract_is_a_config_error() {
    let contract = MpContract::new()
        .require_function("compute")
        .optional_function("compute");
    let err = MpImporter::default()
        .import(fixture("bash/fas_stats.sh"), &contract)
        .unwrap_err();
    assert!(matches!(err, MpError::Config { .. }));
}

#[test]
fn missing_required_function_reports_partial_findings() {
    if !has_tool("bash") {
        return;
    }
    let err = MpImporter::default()
        .import(fixture("bash/missing_compute.sh"), &MpContract::compute_plugin())
        .unwrap_err();
    match err {
        MpError::InterfaceRequirement {
            module,
            kind,
            member,
            findings,
        } => {
            assert_eq!(module, "missing_compute");
            assert_eq!(kind, "function");
            assert_eq!(member, "compute");
            assert_eq!(findings[0], "imported required constants: ID, VERSION, INPUT, OUTPUT");
            assert!(findings[1].starts_with("non defined optional constants (set to absent): METHOD"));
            assert!(findings.last().unwrap().contains("'compute'"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn absent_optional_members_are_marked() {
    if !has_tool("bash") {
        return;
    }
    let (module, report) = MpImporter::default()
        .import_with_report(fixture("bash/fas_stats.sh"), &MpContract::compute_plugin())
        .unwrap();
    assert!(report.passed());
    for name in ["ADVICE", "REQ_HARDWARE", "initialize", "finalize"] {
        assert!(module.is_known(name), "{name} should be known");
        assert!(module.constant(name).is_none());
        assert!(!module.has_function(name));
    }
    assert!(!module.is_known("NOT_DECLARED"));
}

#[test]
fn findings_are_deterministic() {
    if !has_tool("bash") {
        return;
    }
    let importer = MpImporter::default();
    let contract = MpContract::compute_plugin();
    let (_, first) = importer
        .import_with_report(fixture("bash/fas_stats.sh"), &contract)
        .unwrap();
    let (_, second) = importer
        .import_with_report(fixture("bash/fas_stats.sh"), &contract)
        .unwrap();
    assert_eq!(first.messages(), second.messages());
    assert_eq!(
        first.messages(),
        vec![
            "imported required constants: ID, VERSION, INPUT, OUTPUT".to_string(),
            "imported optional constants: METHOD, IMPLEMENTATION, REQ_SOFTWARE, PARAMETERS".to_string(),
            "non defined optional constants (set to absent): ADVICE, REQ_HARDWARE".to_string(),
            "imported required functions: compute".to_string(),
            "non defined optional functions (set to absent): initialize, finalize".to_string(),
        ]
    );
}

#[test]
fn contracts_load_from_yaml() {
    if !has_tool("bash") {
        return;
    }
    let contract = MpContract::from_yaml_str(
        "required:\n  functions: [compute]\n  constants:\n    list: [OUTPUT]\n",
    )
    .unwrap();
    assert_eq!(contract.shape_of("OUTPUT"), Some(MpShape::List));
    let module = MpImporter::default()
        .import(fixture("bash/fas_stats.sh"), &contract)
        .unwrap();
    assert_eq!(
        module.constant("OUTPUT"),
        Some(&MpValue::string_list(["genome_size", "GC_content"]))
    );
    let row = module
        .call("compute", &[MpValue::str(common::example_fas())], &MpKwargs::new())
        .unwrap();
    assert_eq!(row, MpValue::string_list(["800", "0.41"]));
}
