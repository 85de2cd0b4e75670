use super::CliError;
use super::helpers::*;
use bipo_core::domain::Range;
use bipo_core::io::{EventSource, JsonColumnSource};
use bipo_core::pipelines::{
    AnalysisPipeline, EvolutionConfig, RunAnalysis, render_analysis_summary, render_human_summary,
    run_evolution, write_report,
};
use bipo_core::reco::{flatten_triggers, read_triggers, write_flattened_columns};
use bipo_core::spectrum::EnergySpectrum;
use bipo_core::units::UnitConverter;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(clap::Args)]
pub(super) struct EvolutionArgs {
    /// Directory holding the processed event files
    input_dir: PathBuf,

    /// Processed-files ledger (CSV, appended)
    ledger: PathBuf,

    /// Error log (appended)
    error_log: PathBuf,

    /// Analysis configuration JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON report output path
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct AnalyzeArgs {
    /// Processed event file
    file: PathBuf,

    /// Analysis configuration JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the full analysis, including accepted pairs, as JSON
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
pub(super) struct SpectrumArgs {
    /// Processed event file
    file: PathBuf,

    /// Number of equal-width bins
    #[arg(long, default_value_t = 500)]
    bins: usize,

    /// Lower edge in MeV
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    min: f64,

    /// Upper edge in MeV
    #[arg(long, default_value_t = 3.0)]
    max: f64,

    /// TSV output path; printed to stdout when omitted
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct ConvertArgs {
    /// U-238 mass fraction in g/g
    #[arg(long, allow_hyphen_values = true)]
    gg: f64,

    /// Analysis configuration JSON (physics constants)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct FlattenArgs {
    /// Trigger records JSON
    triggers: PathBuf,

    /// Event-column JSON output path
    output: PathBuf,

    /// Analysis configuration JSON (veto and energy scale)
    #[arg(long)]
    config: Option<PathBuf>,
}

pub(super) fn run_evolution_command(args: EvolutionArgs) -> Result<i32, CliError> {
    let analysis = load_analysis_config(args.config.as_deref())?;
    let config = EvolutionConfig::new(args.input_dir, args.ledger, args.error_log);
    let report = run_evolution(&config, &analysis, &JsonColumnSource)?;

    println!("{}", render_human_summary(&report));
    if let Some(report_path) = args.report {
        write_report(&report_path, &report)?;
        println!("JSON report: {}", report_path.display());
    }
    Ok(0)
}

#[derive(Serialize)]
struct AnalyzeOutput<'a> {
    file: String,
    volume_m3: f64,
    analysis: &'a RunAnalysis,
}

pub(super) fn run_analyze_command(args: AnalyzeArgs) -> Result<i32, CliError> {
    let config = load_analysis_config(args.config.as_deref())?;
    let pipeline = AnalysisPipeline::new(&config)?;
    let batch = JsonColumnSource.read_batch(&args.file)?;
    let analysis = pipeline.analyze(&batch)?;
    info!(
        file = %args.file.display(),
        count = analysis.count(),
        "analysis complete"
    );

    if args.json {
        let output = AnalyzeOutput {
            file: file_label(&args.file),
            volume_m3: config.physics.volume_m3,
            analysis: &analysis,
        };
        println!("{}", render_json(&output)?);
    } else {
        println!("File: {}", file_label(&args.file));
        println!(
            "{}",
            render_analysis_summary(&analysis, config.physics.volume_m3)
        );
    }
    Ok(0)
}

pub(super) fn run_spectrum_command(args: SpectrumArgs) -> Result<i32, CliError> {
    let batch = JsonColumnSource.read_batch(&args.file)?;
    let spectrum = EnergySpectrum::fill(
        batch.events.iter().map(|event| event.energy),
        args.bins,
        Range::new(args.min, args.max),
    )?;
    let rendered = spectrum.to_tsv();

    match args.output {
        Some(path) => {
            write_text_output(&path, &rendered)?;
            println!(
                "Spectrum: {} entries in {} bins ({} below, {} above) -> {}",
                spectrum.entries(),
                spectrum.counts.len(),
                spectrum.underflow,
                spectrum.overflow,
                path.display()
            );
        }
        None => print!("{}", rendered),
    }
    Ok(0)
}

pub(super) fn run_convert_command(args: ConvertArgs) -> Result<i32, CliError> {
    let config = load_analysis_config(args.config.as_deref())?;
    let converter = UnitConverter::new(config.physics);

    println!("g/g: {:e}", args.gg);
    println!("cpd: {}", converter.gg_to_cpd(args.gg));
    println!("mBq/kg: {:e}", converter.gg_to_mbq_per_kg(args.gg));
    println!(
        "mBq/{}m3: {}",
        config.physics.volume_m3,
        converter.gg_to_mbq_per_volume(args.gg)
    );
    Ok(0)
}

pub(super) fn run_flatten_command(args: FlattenArgs) -> Result<i32, CliError> {
    let config = load_analysis_config(args.config.as_deref())?;
    let triggers = read_triggers(&args.triggers)?;
    let run = flatten_triggers(&triggers, &config.flatten);
    write_flattened_columns(&args.output, &run)?;

    println!(
        "Triggers: {} ({} vetoed), events: {}, live time: {} s -> {}",
        run.triggers,
        run.vetoed_triggers,
        run.events.len(),
        run.live_time_seconds,
        args.output.display()
    );
    Ok(0)
}
