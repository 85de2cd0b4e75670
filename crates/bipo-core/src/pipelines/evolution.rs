//! Batch evolution run: one concentration estimate per data file.
//!
//! Each candidate file moves `Pending -> Processing -> {Succeeded, Failed}`.
//! Successes are appended to the ledger and skipped by later runs; failures go
//! to the error log only, so the next run retries them.

use super::analysis::{AnalysisPipeline, RunAnalysis};
use crate::common::AnalysisConfig;
use crate::domain::{BipoError, PipelineResult};
use crate::io::{EventSource, LedgerRow, append_error, append_summary, load_processed};
use chrono::NaiveDateTime;
use globset::{Glob, GlobMatcher};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
const LEDGER_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvolutionConfig {
    pub input_dir: PathBuf,
    pub ledger_path: PathBuf,
    pub error_log_path: PathBuf,
}

impl EvolutionConfig {
    pub fn new(
        input_dir: impl Into<PathBuf>,
        ledger_path: impl Into<PathBuf>,
        error_log_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            input_dir: input_dir.into(),
            ledger_path: ledger_path.into(),
            error_log_path: error_log_path.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Skipped,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub filename: String,
    pub file_timestamp: NaiveDateTime,
    pub count: usize,
    pub live_time_seconds: f64,
    pub rate: f64,
    pub rate_uncertainty: f64,
    pub concentration: f64,
    pub concentration_uncertainty: f64,
}

impl RunSummary {
    fn from_analysis(filename: &str, file_timestamp: NaiveDateTime, analysis: &RunAnalysis) -> Self {
        let concentration = analysis.concentration.mbq_per_volume;
        Self {
            filename: filename.to_string(),
            file_timestamp,
            count: analysis.count(),
            live_time_seconds: analysis.rate.live_time_seconds,
            rate: analysis.rate.rate,
            rate_uncertainty: analysis.rate.uncertainty,
            concentration: concentration.value,
            concentration_uncertainty: concentration.uncertainty,
        }
    }

    pub fn ledger_row(&self) -> LedgerRow {
        LedgerRow {
            filename: self.filename.clone(),
            file_timestamp: self.file_timestamp.format(LEDGER_TIMESTAMP_FORMAT).to_string(),
            concentration: self.concentration,
            uncertainty: self.concentration_uncertainty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileOutcome {
    pub filename: String,
    pub status: FileStatus,
    pub summary: Option<RunSummary>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvolutionReport {
    pub input_dir: String,
    pub candidate_count: usize,
    pub skipped_count: usize,
    pub succeeded_count: usize,
    pub failed_count: usize,
    pub files: Vec<FileOutcome>,
}

impl EvolutionReport {
    /// Successful summaries of this run ordered by file timestamp.
    pub fn time_series(&self) -> Vec<&RunSummary> {
        let mut series: Vec<&RunSummary> = self
            .files
            .iter()
            .filter_map(|outcome| outcome.summary.as_ref())
            .collect();
        series.sort_by_key(|summary| summary.file_timestamp);
        series
    }
}

/// `<prefix>_<prefix>_<YYYYmmdd>_<HHMMSS>_...`: fields 2 and 3 joined.
pub fn parse_file_timestamp(filename: &str) -> PipelineResult<NaiveDateTime> {
    let fields: Vec<&str> = filename.split('_').collect();
    let (Some(date), Some(time)) = (fields.get(2), fields.get(3)) else {
        return Err(BipoError::input_validation(
            "INPUT.FILE_TIMESTAMP",
            format!(
                "file name '{}' has no date and time fields after the second '_'",
                filename
            ),
        ));
    };
    NaiveDateTime::parse_from_str(&format!("{}{}", date, time), FILE_TIMESTAMP_FORMAT).map_err(
        |error| {
            BipoError::input_validation(
                "INPUT.FILE_TIMESTAMP",
                format!(
                    "file name '{}' carries invalid timestamp '{}{}': {}",
                    filename, date, time, error
                ),
            )
        },
    )
}

pub fn file_matcher(pattern: &str) -> PipelineResult<GlobMatcher> {
    Glob::new(pattern)
        .map(|glob| glob.compile_matcher())
        .map_err(|error| {
            BipoError::input_validation(
                "INPUT.FILE_GLOB",
                format!("invalid input file pattern '{}': {}", pattern, error),
            )
        })
}

/// File names in `dir` matching `matcher`, sorted.
pub fn list_candidate_files(dir: &Path, matcher: &GlobMatcher) -> PipelineResult<Vec<String>> {
    let entries = fs::read_dir(dir).map_err(|error| input_directory_error(dir, error))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|error| input_directory_error(dir, error))?;
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            warn!(path = %entry.path().display(), "skipping non UTF-8 file name");
            continue;
        };
        if matcher.is_match(&name) && entry.path().is_file() {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

pub fn run_evolution<S: EventSource>(
    config: &EvolutionConfig,
    analysis: &AnalysisConfig,
    source: &S,
) -> PipelineResult<EvolutionReport> {
    let pipeline = AnalysisPipeline::new(analysis)?;
    let matcher = file_matcher(&analysis.input.file_glob)?;
    let candidates = list_candidate_files(&config.input_dir, &matcher)?;
    let processed = load_processed(&config.ledger_path)?;

    info!(
        input_dir = %config.input_dir.display(),
        candidates = candidates.len(),
        already_processed = processed.len(),
        "starting evolution run"
    );

    let mut files = Vec::with_capacity(candidates.len());
    for filename in candidates {
        if processed.contains(&filename) {
            info!(file = %filename, "skipping already processed file");
            files.push(FileOutcome {
                filename,
                status: FileStatus::Skipped,
                summary: None,
                error: None,
            });
            continue;
        }

        info!(file = %filename, "processing file");
        let path = config.input_dir.join(&filename);
        match process_file(&pipeline, source, &path, &filename) {
            Ok(summary) => {
                append_summary(&config.ledger_path, &summary.ledger_row())?;
                info!(
                    file = %filename,
                    count = summary.count,
                    concentration = summary.concentration,
                    uncertainty = summary.concentration_uncertainty,
                    "file processed"
                );
                files.push(FileOutcome {
                    filename,
                    status: FileStatus::Succeeded,
                    summary: Some(summary),
                    error: None,
                });
            }
            Err(error) => {
                let message = error.to_string();
                warn!(file = %filename, error = %message, "file failed");
                append_error(&config.error_log_path, &filename, &message)?;
                files.push(FileOutcome {
                    filename,
                    status: FileStatus::Failed,
                    summary: None,
                    error: Some(message),
                });
            }
        }
    }

    let count_status = |status: FileStatus| {
        files
            .iter()
            .filter(|outcome| outcome.status == status)
            .count()
    };
    let report = EvolutionReport {
        input_dir: config.input_dir.display().to_string(),
        candidate_count: files.len(),
        skipped_count: count_status(FileStatus::Skipped),
        succeeded_count: count_status(FileStatus::Succeeded),
        failed_count: count_status(FileStatus::Failed),
        files,
    };
    info!(
        succeeded = report.succeeded_count,
        failed = report.failed_count,
        skipped = report.skipped_count,
        "evolution run complete"
    );
    Ok(report)
}

fn process_file<S: EventSource>(
    pipeline: &AnalysisPipeline,
    source: &S,
    path: &Path,
    filename: &str,
) -> PipelineResult<RunSummary> {
    let batch = source.read_batch(path)?;
    let file_timestamp = parse_file_timestamp(filename)?;
    let analysis = pipeline.analyze(&batch)?;
    Ok(RunSummary::from_analysis(filename, file_timestamp, &analysis))
}

pub fn render_human_summary(report: &EvolutionReport) -> String {
    let mut lines = vec![
        format!("Input directory: {}", report.input_dir),
        format!(
            "Files: {} candidates, {} processed, {} failed, {} skipped",
            report.candidate_count,
            report.succeeded_count,
            report.failed_count,
            report.skipped_count
        ),
    ];
    for summary in report.time_series() {
        lines.push(format!(
            "  {}  {:>6}  {:.6} +/- {:.6}  {}",
            summary.file_timestamp.format(LEDGER_TIMESTAMP_FORMAT),
            summary.count,
            summary.concentration,
            summary.concentration_uncertainty,
            summary.filename
        ));
    }
    for outcome in report
        .files
        .iter()
        .filter(|outcome| outcome.status == FileStatus::Failed)
    {
        lines.push(format!(
            "  FAILED {}: {}",
            outcome.filename,
            outcome.error.as_deref().unwrap_or("unknown error")
        ));
    }
    lines.join("\n")
}

pub fn write_report(path: &Path, report: &EvolutionReport) -> PipelineResult<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|error| {
            BipoError::io_system(
                "IO.REPORT_DIRECTORY",
                format!("failed to create report directory '{}': {}", parent.display(), error),
            )
        })?;
    }
    let rendered = serde_json::to_string_pretty(report).map_err(|error| {
        BipoError::internal(
            "SYS.REPORT_SERIALIZE",
            format!("failed to serialize evolution report: {}", error),
        )
    })?;
    fs::write(path, rendered).map_err(|error| {
        BipoError::io_system(
            "IO.REPORT_WRITE",
            format!("failed to write report '{}': {}", path.display(), error),
        )
    })
}

fn input_directory_error(dir: &Path, error: std::io::Error) -> BipoError {
    BipoError::io_system(
        "IO.INPUT_DIRECTORY",
        format!("failed to list input directory '{}': {}", dir.display(), error),
    )
}
