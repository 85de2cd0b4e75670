use bipo_core::common::AnalysisConfig;
use bipo_core::domain::{BipoError, BipoErrorCategory, BipoResult, Event, EventBatch, Position};
use bipo_core::io::{EventSource, JsonColumnSource, load_processed, write_json_columns};
use bipo_core::pipelines::{
    EvolutionConfig, FileStatus, render_human_summary, run_evolution, write_report,
};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const FIRST: &str = "OSIRISData_hybrid_20240801_092026_run-5_rs_processed.json";
const SECOND: &str = "OSIRISData_hybrid_20240802_101500_run-6_rs_processed.json";
const UNDATED: &str = "OSIRISData_hybrid_nodate_rs_processed.json";

fn coincidence_batch(pairs: i64, live_time_seconds: f64) -> EventBatch {
    let mut events = Vec::new();
    for pair in 0..pairs {
        let start = pair * 50_000_000;
        events.push(Event::new(2.0, Position::new(10.0, 0.0, 0.0), start));
        events.push(Event::new(0.9, Position::new(20.0, 0.0, 0.0), start + 200_000));
    }
    EventBatch::new(events, live_time_seconds)
}

fn evolution_dirs(temp: &TempDir) -> EvolutionConfig {
    let input = temp.path().join("processed");
    fs::create_dir_all(&input).expect("input dir should be created");
    EvolutionConfig::new(
        input,
        temp.path().join("ana/processed_files.csv"),
        temp.path().join("ana/error_log.txt"),
    )
}

/// Fails for the names it holds, otherwise reads the JSON columns.
struct FlakySource {
    failing: RefCell<BTreeSet<String>>,
}

impl FlakySource {
    fn failing_on(name: &str) -> Self {
        Self {
            failing: RefCell::new(BTreeSet::from([name.to_string()])),
        }
    }

    fn heal(&self) {
        self.failing.borrow_mut().clear();
    }
}

impl EventSource for FlakySource {
    fn read_batch(&self, path: &Path) -> BipoResult<EventBatch> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        if self.failing.borrow().contains(name) {
            return Err(BipoError::io_system(
                "IO.EVENT_SOURCE",
                format!("simulated read failure for '{}'", name),
            ));
        }
        JsonColumnSource.read_batch(path)
    }
}

#[test]
fn second_run_skips_everything_already_in_the_ledger() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = evolution_dirs(&temp);
    write_json_columns(&config.input_dir.join(FIRST), &coincidence_batch(2, 86_400.0))
        .expect("first file should be written");
    write_json_columns(&config.input_dir.join(SECOND), &coincidence_batch(4, 86_400.0))
        .expect("second file should be written");
    fs::write(config.input_dir.join("README.txt"), "not data").expect("readme should be written");

    let analysis = AnalysisConfig::default();
    let first = run_evolution(&config, &analysis, &JsonColumnSource).expect("run should succeed");
    assert_eq!(first.candidate_count, 2);
    assert_eq!(first.succeeded_count, 2);
    assert_eq!(first.failed_count, 0);

    let series = first.time_series();
    assert_eq!(series.len(), 2);
    assert_eq!(series[0].filename, FIRST);
    assert_eq!(series[0].count, 2);
    assert_eq!(series[1].count, 4);
    assert!(series[1].concentration > series[0].concentration);

    let ledger = fs::read_to_string(&config.ledger_path).expect("ledger should exist");
    let rows: Vec<&str> = ledger.lines().collect();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].starts_with(&format!("{},2024-08-01 09:20:26,", FIRST)));
    assert!(rows[1].starts_with(&format!("{},2024-08-02 10:15:00,", SECOND)));

    let second = run_evolution(&config, &analysis, &JsonColumnSource).expect("rerun should succeed");
    assert_eq!(second.skipped_count, 2);
    assert_eq!(second.succeeded_count, 0);
    assert!(second.time_series().is_empty());
    assert_eq!(
        fs::read_to_string(&config.ledger_path).expect("ledger should exist"),
        ledger,
        "a rerun must not append to the ledger"
    );
}

#[test]
fn failed_file_is_logged_and_retried_on_the_next_run() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = evolution_dirs(&temp);
    write_json_columns(&config.input_dir.join(FIRST), &coincidence_batch(1, 3_600.0))
        .expect("first file should be written");
    write_json_columns(&config.input_dir.join(SECOND), &coincidence_batch(1, 3_600.0))
        .expect("second file should be written");

    let source = FlakySource::failing_on(SECOND);
    let analysis = AnalysisConfig::default();
    let first = run_evolution(&config, &analysis, &source).expect("run should continue past failures");
    assert_eq!(first.succeeded_count, 1);
    assert_eq!(first.failed_count, 1);
    let failed = first
        .files
        .iter()
        .find(|outcome| outcome.status == FileStatus::Failed)
        .expect("one file should fail");
    assert_eq!(failed.filename, SECOND);

    let log = fs::read_to_string(&config.error_log_path).expect("error log should exist");
    assert!(log.starts_with(&format!("Error processing file: {}\nError message: ", SECOND)));
    assert!(log.contains("simulated read failure"));
    let processed = load_processed(&config.ledger_path).expect("ledger should load");
    assert!(!processed.contains(SECOND));

    source.heal();
    let second = run_evolution(&config, &analysis, &source).expect("rerun should succeed");
    assert_eq!(second.skipped_count, 1);
    assert_eq!(second.succeeded_count, 1);
    assert_eq!(second.time_series()[0].filename, SECOND);
    assert_eq!(
        load_processed(&config.ledger_path).expect("ledger should load").len(),
        2
    );
}

#[test]
fn undated_and_malformed_files_fail_without_stopping_the_run() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = evolution_dirs(&temp);
    write_json_columns(&config.input_dir.join(UNDATED), &coincidence_batch(1, 10.0))
        .expect("undated file should be written");
    fs::write(config.input_dir.join(SECOND), r#"{ "Evis": [1.0] }"#)
        .expect("malformed file should be written");
    write_json_columns(&config.input_dir.join(FIRST), &coincidence_batch(1, 10.0))
        .expect("first file should be written");

    let report = run_evolution(&config, &AnalysisConfig::default(), &JsonColumnSource)
        .expect("run should succeed");
    assert_eq!(report.succeeded_count, 1);
    assert_eq!(report.failed_count, 2);

    let log = fs::read_to_string(&config.error_log_path).expect("error log should exist");
    assert!(log.contains(UNDATED));
    assert!(log.contains("INPUT.FILE_TIMESTAMP"));
    assert!(log.contains("'recX' in"));

    let summary = render_human_summary(&report);
    assert!(summary.contains("1 processed, 2 failed"));
    assert!(summary.contains(&format!("FAILED {}", UNDATED)));

    let report_path = temp.path().join("reports/evolution.json");
    write_report(&report_path, &report).expect("report should be written");
    let parsed: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).expect("report should exist"))
            .expect("report should be JSON");
    assert_eq!(parsed["succeeded_count"], 1);
    assert_eq!(parsed["files"][0]["status"], "succeeded");
    assert_eq!(parsed["files"][1]["status"], "failed");
}

#[test]
fn missing_input_directory_aborts_the_run() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = EvolutionConfig::new(
        temp.path().join("absent"),
        temp.path().join("processed_files.csv"),
        temp.path().join("error_log.txt"),
    );
    let error = run_evolution(&config, &AnalysisConfig::default(), &JsonColumnSource)
        .expect_err("missing directory should abort");
    assert_eq!(error.category(), BipoErrorCategory::IoSystemError);
    assert_eq!(error.placeholder(), "IO.INPUT_DIRECTORY");
    assert!(!config.ledger_path.exists());
}
