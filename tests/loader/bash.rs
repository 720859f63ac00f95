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

use proptest::prelude::*;
use serde_json::json;

use multiplug::loader::bash::MpShellOutput;
use multiplug::{MpContract, MpError, MpImporter, MpKwargs, MpShape, MpValue};

#[path = "../common/mod.rs"]
mod common;

use common::{example_fas, fixture, has_tool};

#[test]
fn fas_stats_computes_size_and_gc() {
    if !has_tool("bash") {
        return;
    }
    let plugin = MpImporter::default()
        .import(fixture("bash/fas_stats.sh"), &MpContract::compute_plugin())
        .expect("load fas_stats.sh");
    assert_eq!(plugin.constant_str("ID"), Some("fas_stats_sh"));
    assert_eq!(
        plugin.constant("OUTPUT"),
        Some(&MpValue::string_list(["genome_size", "GC_content"]))
    );
    assert_eq!(
        plugin.constant("PARAMETERS"),
        Some(&MpValue::table([["uncompressed", "bool", "false", "input is not gzipped"]]))
    );
    let row = plugin
        .call("compute", &[MpValue::str(example_fas())], &MpKwargs::new())
        .expect("compute");
    assert_eq!(row, MpValue::string_list(["800", "0.41"]));
}

#[test]
fn undeclared_functions_are_kept() {
    if !has_tool("bash") {
        return;
    }
    let plugin = MpImporter::default()
        .import(fixture("bash/fas_stats.sh"), &MpContract::compute_plugin())
        .unwrap();
    let helper = plugin
        .call("helper_not_in_contract", &[], &MpKwargs::new())
        .unwrap();
    assert_eq!(helper, MpValue::str("helper"));
}

#[test]
fn failing_compute_is_a_plugin_error() {
    if !has_tool("bash") {
        return;
    }
    let plugin = MpImporter::default()
        .import(fixture("bash/fas_stats.sh"), &MpContract::compute_plugin())
        .unwrap();
    let err = plugin
        .call("compute", &[MpValue::str("/nonexistent/missing.fas")], &MpKwargs::new())
        .unwrap_err();
    assert!(matches!(err, MpError::Plugin { .. }));
}

#[test]
fn caller_environment_does_not_define_constants() {
    if !has_tool("bash") {
        return;
    }
    std::env::set_var("ADVICE", "set by the calling process");
    std::env::set_var("MULTIPLUG_CALLER_ONLY", "1");
    let (plugin, report) = MpImporter::default()
        .import_with_report(fixture("bash/fas_stats.sh"), &MpContract::compute_plugin())
        .unwrap();
    assert!(plugin.constant("ADVICE").is_none());
    assert!(!report
        .messages()
        .iter()
        .any(|line| line.starts_with("imported optional constants") && line.contains("ADVICE")));

    let contract = MpContract::compute_plugin().require_constant("MULTIPLUG_CALLER_ONLY", MpShape::Scalar);
    match MpImporter::default().import(fixture("bash/fas_stats.sh"), &contract) {
        Err(MpError::InterfaceRequirement { member, .. }) => assert_eq!(member, "MULTIPLUG_CALLER_ONLY"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn constants_follow_the_declared_shape() {
    if !has_tool("bash") {
        return;
    }
    let contract = MpContract::new()
        .require_constant("SCALAR", MpShape::List)
        .optional_constant("LIST", MpShape::Scalar);
    let plugin = MpImporter::default()
        .import(fixture("bash/shapes.sh"), &contract)
        .unwrap();
    assert_eq!(plugin.constant("SCALAR"), Some(&MpValue::string_list(["one value"])));
    // A scalar read of an array is its first element.
    assert_eq!(plugin.constant("LIST"), Some(&MpValue::str("a")));
}

#[test]
fn undeclared_constants_use_the_heuristic() {
    if !has_tool("bash") {
        return;
    }
    let plugin = MpImporter::default()
        .import(fixture("bash/shapes.sh"), &MpContract::new())
        .unwrap();
    assert_eq!(plugin.constant("SCALAR"), Some(&MpValue::str("one value")));
    assert_eq!(plugin.constant("LIST"), Some(&MpValue::string_list(["a", "b", "c"])));
    assert_eq!(
        plugin.constant("TABLE"),
        Some(&MpValue::table([["x", "1"], ["y", "2"]]))
    );
}

#[test]
fn function_output_is_unflattened() {
    if !has_tool("bash") {
        return;
    }
    let plugin = MpImporter::default()
        .import(fixture("bash/shapes.sh"), &MpContract::new())
        .unwrap();
    let none = MpKwargs::new();
    let args = [MpValue::str("a"), MpValue::str("b")];
    assert_eq!(plugin.call("scalar", &args, &none).unwrap(), MpValue::str("a"));
    assert_eq!(
        plugin.call("list", &args, &none).unwrap(),
        MpValue::string_list(["a", "b"])
    );
    assert_eq!(
        plugin.call("tuple", &args, &none).unwrap(),
        MpValue::string_list(["a", "b"])
    );
    assert_eq!(
        plugin.call("table", &[], &none).unwrap(),
        MpValue::from(json!([["a", "1"], ["b", "2"]]))
    );
    assert!(plugin.call("failing", &[], &none).is_err());
}

#[test]
fn keyword_arguments_are_passed_as_assignments() {
    if !has_tool("bash") {
        return;
    }
    let plugin = MpImporter::default()
        .import(fixture("bash/with_state.sh"), &MpContract::compute_plugin())
        .unwrap();
    let mut kwargs = MpKwargs::new();
    kwargs.insert("state".into(), MpValue::str("ready"));
    let row = plugin
        .call("compute", &[MpValue::str("unit1")], &kwargs)
        .unwrap();
    assert_eq!(row, MpValue::string_list(["unit1", "ready"]));
}

proptest! {
    #[test]
    fn unflatten_keeps_every_field(rows in prop::collection::vec(
        prop::collection::vec("[a-z0-9.]{1,6}", 2..4), 2..5)) {
        let text = rows
            .iter()
            .map(|row| row.join("\t"))
            .collect::<Vec<_>>()
            .join("\n") + "\n";
        prop_assert_eq!(MpShellOutput::unflatten(&text), MpShellOutput::Table(rows));
    }

    #[test]
    fn unflatten_lines_without_tabs_is_a_list(lines in prop::collection::vec("[a-z0-9 ]{1,8}", 2..6)) {
        let text = lines.join("\n");
        prop_assert_eq!(MpShellOutput::unflatten(&text), MpShellOutput::List(lines));
    }
}
