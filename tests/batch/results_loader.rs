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
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use multiplug::{
    MpAttributeCatalog, MpAttributeDefinition, MpAttributeStore, MpBatchComputation,
    MpBatchConfig, MpCompStatus, MpError, MpImporter, MpKwargs, MpMemoryStore, MpReportData,
    MpResultsLoader, MpSink,
};

#[path = "../common/mod.rs"]
mod common;

use common::{fixture, has_tool};

const PLUGIN: &str = "bash/fas_stats.sh";

struct Computation {
    _dir: TempDir,
    results: PathBuf,
    report: PathBuf,
}

/// Runs the size and GC plugin over two copies of the example sequence.
fn compute() -> Computation {
    let dir = tempfile::tempdir().unwrap();
    for name in ["a", "b"] {
        fs::copy(fixture("example.fas"), dir.path().join(format!("{name}.fas"))).unwrap();
    }
    let results = dir.path().join("results.tsv");
    let report = dir.path().join("report.yaml");

    let mut batch =
        MpBatchComputation::new(MpImporter::default(), fixture(PLUGIN), MpBatchConfig::default())
            .unwrap();
    batch
        .input_from_globpattern(
            &format!("{}/*.fas", dir.path().display()),
            Some(&fixture("bash/basename_id.sh")),
            None,
        )
        .unwrap();
    batch.set_output(Some(&results), None).unwrap();
    batch
        .setup_computation(MpKwargs::new(), Some(MpSink::create(&report).unwrap()), None, None, None)
        .unwrap();
    batch.run().unwrap();
    batch.finalize().unwrap();

    Computation {
        _dir: dir,
        results,
        report,
    }
}

fn store() -> MpMemoryStore {
    let mut catalog = MpAttributeCatalog::new();
    catalog.insert("genome_size", MpAttributeDefinition::new("Integer"));
    catalog.insert("GC_content", MpAttributeDefinition::new("Float"));
    MpMemoryStore::with_catalog(catalog)
}

fn rewrite_report(path: &Path, edit: impl FnOnce(&mut MpReportData)) -> PathBuf {
    let mut data = MpReportData::from_file(path).unwrap();
    edit(&mut data);
    let edited = path.with_file_name("edited_report.yaml");
    fs::write(&edited, serde_yaml::to_string(&data).unwrap()).unwrap();
    edited
}

#[test]
fn results_are_loaded_into_the_store() {
    if !has_tool("bash") {
        return;
    }
    let computation = compute();
    let mut store = store();
    let uuid = {
        let mut loader =
            MpResultsLoader::new(&mut store, &MpImporter::default(), fixture(PLUGIN), false)
                .unwrap();
        assert_eq!(loader.description().output_names(), vec!["genome_size", "GC_content"]);
        loader
            .run(&computation.results, &computation.report, false)
            .unwrap()
            .expect("non-empty results")
    };

    assert_eq!(store.count("genome_size"), 2);
    assert_eq!(store.count("GC_content"), 2);
    let size = store.value("genome_size", "a").unwrap();
    assert_eq!(size.value, "800");
    assert_eq!(size.computation, uuid);
    assert_eq!(store.value("GC_content", "b").unwrap().value, "0.41");

    let report = store.report(&uuid).unwrap();
    assert_eq!(report.comp_status, MpCompStatus::Completed);
    assert_eq!(report.n_units, 2);

    let description = store.plugin("fas_stats_sh", "0.1.0").unwrap();
    assert_eq!(description.output, "genome_size,GC_content");
    assert_eq!(description.method.as_deref(), Some("count bases"));
    assert_eq!(
        description.parameters.as_deref(),
        Some("uncompressed,bool,false,input is not gzipped")
    );
    store.check_consistency().unwrap();
}

#[test]
fn loading_the_same_report_twice_is_accepted() {
    if !has_tool("bash") {
        return;
    }
    let computation = compute();
    let mut store = store();
    let mut loader =
        MpResultsLoader::new(&mut store, &MpImporter::default(), fixture(PLUGIN), false).unwrap();
    let first = loader.run(&computation.results, &computation.report, false).unwrap();
    let second = loader.run(&computation.results, &computation.report, false).unwrap();
    assert_eq!(first, second);
}

#[test]
fn changed_report_with_the_same_id_needs_replace() {
    if !has_tool("bash") {
        return;
    }
    let computation = compute();
    let edited = rewrite_report(&computation.report, |data| data.user_id = "someone else".into());
    let mut store = store();
    let mut loader =
        MpResultsLoader::new(&mut store, &MpImporter::default(), fixture(PLUGIN), false).unwrap();
    loader.run(&computation.results, &computation.report, false).unwrap();
    assert!(matches!(
        loader.run(&computation.results, &edited, false),
        Err(MpError::Validation { .. })
    ));
    loader.run(&computation.results, &edited, true).unwrap();
}

#[test]
fn plugin_version_must_match_the_report() {
    if !has_tool("bash") {
        return;
    }
    let computation = compute();
    let edited = rewrite_report(&computation.report, |data| data.plugin_version = "9.9".into());
    let mut store = store();
    let err = MpResultsLoader::new(&mut store, &MpImporter::default(), fixture(PLUGIN), false)
        .unwrap()
        .run(&computation.results, &edited, false)
        .unwrap_err();
    assert!(err.to_string().contains("VERSION"), "{err}");
    assert_eq!(store.count("genome_size"), 0);
}

#[test]
fn empty_results_load_nothing() {
    if !has_tool("bash") {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let results = dir.path().join("results.tsv");
    fs::write(&results, "").unwrap();
    let mut store = store();
    let loaded = MpResultsLoader::new(&mut store, &MpImporter::default(), fixture(PLUGIN), false)
        .unwrap()
        .run(&results, dir.path().join("no_report.yaml"), false)
        .unwrap();
    assert_eq!(loaded, None);
    assert_eq!(store.count("genome_size"), 0);
}

#[test]
fn invalid_values_leave_the_store_unchanged() {
    if !has_tool("bash") {
        return;
    }
    let computation = compute();
    fs::write(&computation.results, "a\t800\t0.41\nb\tmany\t0.41\n").unwrap();
    let mut store = store();
    let err = MpResultsLoader::new(&mut store, &MpImporter::default(), fixture(PLUGIN), false)
        .unwrap()
        .run(&computation.results, &computation.report, false)
        .unwrap_err();
    assert!(err.to_string().contains("many"), "{err}");
    assert_eq!(store.count("genome_size"), 0);
}

#[test]
fn missing_attribute_definitions_are_rejected() {
    if !has_tool("bash") {
        return;
    }
    let computation = compute();
    let mut store = store();
    store.destroy_attribute("GC_content").unwrap();
    let err = MpResultsLoader::new(&mut store, &MpImporter::default(), fixture(PLUGIN), false)
        .unwrap()
        .run(&computation.results, &computation.report, false)
        .unwrap_err();
    assert!(err.to_string().contains("GC_content"), "{err}");
}
