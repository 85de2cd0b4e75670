use super::CliError;
use anyhow::Context;
use bipo_core::common::AnalysisConfig;
use bipo_core::domain::BipoError;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Loads `--config` when given, otherwise the built-in defaults. Both paths are
/// validated before any data is touched.
pub(super) fn load_analysis_config(path: Option<&Path>) -> Result<AnalysisConfig, CliError> {
    let config = match path {
        Some(path) => {
            debug!(config = %path.display(), "loading analysis configuration");
            AnalysisConfig::load(path)?
        }
        None => AnalysisConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

pub(super) fn write_text_output(path: &Path, content: &str) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| {
            format!("failed to create output directory '{}'", parent.display())
        })?;
    }
    fs::write(path, content)
        .with_context(|| format!("failed to write output file '{}'", path.display()))?;
    Ok(())
}

pub(super) fn render_json<T: Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value).map_err(|error| {
        CliError::Compute(BipoError::internal(
            "SYS.JSON_OUTPUT",
            format!("failed to serialize JSON output: {}", error),
        ))
    })
}

pub(super) fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
