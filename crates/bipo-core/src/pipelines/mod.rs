pub mod analysis;
pub mod evolution;

pub use analysis::{AnalysisPipeline, RunAnalysis, render_analysis_summary};
pub use evolution::{
    EvolutionConfig, EvolutionReport, FileOutcome, FileStatus, RunSummary, parse_file_timestamp,
    render_human_summary, run_evolution, write_report,
};
