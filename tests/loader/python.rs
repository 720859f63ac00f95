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

use serde_json::json;

use multiplug::{
    MpContract, MpError, MpImporter, MpInterfaceAnalyser, MpKwargs, MpLanguage, MpValue,
};

#[path = "../common/mod.rs"]
mod common;

use common::{example_fas, fixture};

#[test]
fn fas_stats_is_executed_and_called() {
    let plugin = MpImporter::default()
        .import(fixture("python/fas_stats_py.py"), &MpContract::compute_plugin())
        .expect("load fas_stats_py.py");
    assert_eq!(plugin.language(), MpLanguage::Python);
    assert_eq!(plugin.constant_str("ID"), Some("fas_stats_py"));
    assert_eq!(
        plugin.constant("PARAMETERS"),
        Some(&MpValue::table([["uncompressed", "bool", "False", "input is not gzipped"]]))
    );
    assert!(!plugin.is_known("_GC"));
    let result = plugin
        .call("compute", &[MpValue::str(example_fas())], &MpKwargs::new())
        .unwrap();
    assert_eq!(result, MpValue::from(json!([[800, 0.41], []])));
}

#[test]
fn state_objects_round_trip() {
    let plugin = MpImporter::default()
        .import(fixture("python/py_w_state.py"), &MpContract::compute_plugin())
        .unwrap();
    assert!(!plugin.has_function("EchoState"));

    let mut init = MpKwargs::new();
    init.insert("start".into(), MpValue::from(json!(10)));
    let state = plugin.call("initialize", &[], &init).unwrap();
    assert!(matches!(state, MpValue::Object(_)));

    let mut kwargs = MpKwargs::new();
    kwargs.insert("state".into(), state.clone());
    let first = plugin.call("compute", &[MpValue::str("a")], &kwargs).unwrap();
    let second = plugin.call("compute", &[MpValue::str("b")], &kwargs).unwrap();
    assert_eq!(first, MpValue::from(json!(["a", 11])));
    assert_eq!(second, MpValue::from(json!(["b", 12])));

    plugin.call("finalize", &[state], &MpKwargs::new()).unwrap();
    assert_eq!(
        plugin.call("finalized_counts", &[], &MpKwargs::new()).unwrap(),
        MpValue::from(json!([12]))
    );
}

#[test]
fn python_exceptions_are_plugin_errors() {
    let plugin = MpImporter::default()
        .import(fixture("python/fas_stats_py.py"), &MpContract::compute_plugin())
        .unwrap();
    let err = plugin
        .call("compute", &[MpValue::str("/nonexistent/missing.fas")], &MpKwargs::new())
        .unwrap_err();
    assert!(matches!(err, MpError::Plugin { .. }));
    assert!(err.to_string().contains("missing.fas"));
}

#[test]
fn missing_compute_function() {
    let err = MpImporter::default()
        .import(fixture("python/missing_compute.py"), &MpContract::compute_plugin())
        .unwrap_err();
    match err {
        MpError::InterfaceRequirement { member, .. } => assert_eq!(member, "compute"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn analyser_checks_signatures() {
    let analyser = MpInterfaceAnalyser::load(&MpImporter::default(), fixture("python/fas_stats_py.py"))
        .unwrap();
    let analysis = analyser.run(None);
    assert!(analysis.passed(), "{:?}", analysis.findings());
    assert_eq!(analysis.exit_code(), 0);
    assert_eq!(
        analyser.module().signature_of("compute").unwrap().fixed_params,
        vec!["filename".to_string()]
    );
}
