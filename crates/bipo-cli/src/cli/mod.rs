mod commands;
mod helpers;

use bipo_core::domain::BipoError;
use clap::Parser;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().collect();

    match parse_and_dispatch(args) {
        Ok(code) => code,
        Err(error) => {
            let diagnostic = error.as_bipo_error();
            eprintln!("{}", diagnostic.diagnostic_line());
            if let Some(summary_line) = diagnostic.fatal_exit_line() {
                eprintln!("{}", summary_line);
            }
            diagnostic.exit_code()
        }
    }
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => dispatch_parsed(cli.command),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(
    name = "bipo214",
    version,
    about = "BiPo-214 coincidence analysis and U-238 concentration tracking"
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Process every new file in a directory and append to the ledger
    Evolution(commands::EvolutionArgs),
    /// Run the full analysis chain on one processed file
    Analyze(commands::AnalyzeArgs),
    /// Histogram the visible energy of one processed file
    Spectrum(commands::SpectrumArgs),
    /// Convert a g/g concentration to counts per day and activities
    Convert(commands::ConvertArgs),
    /// Flatten trigger records into the per-cluster event columns
    Flatten(commands::FlattenArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Evolution(args) => commands::run_evolution_command(args),
        CliCommand::Analyze(args) => commands::run_analyze_command(args),
        CliCommand::Spectrum(args) => commands::run_spectrum_command(args),
        CliCommand::Convert(args) => commands::run_convert_command(args),
        CliCommand::Flatten(args) => commands::run_flatten_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(BipoError),
    /// Failure writing a command's output file.
    #[error(transparent)]
    Output(#[from] anyhow::Error),
}

impl From<BipoError> for CliError {
    fn from(error: BipoError) -> Self {
        Self::Compute(error)
    }
}

impl CliError {
    fn as_bipo_error(&self) -> BipoError {
        match self {
            Self::Usage(message) => BipoError::input_validation("INPUT.CLI_USAGE", message.clone()),
            Self::Compute(error) => error.clone(),
            Self::Output(error) => BipoError::io_system("IO.CLI_OUTPUT", format!("{error:#}")),
        }
    }
}
