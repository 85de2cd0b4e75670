use crate::common::AnalysisConfig;
use crate::domain::{BipoError, EventBatch, PipelineResult};
use crate::rate::{RateEstimate, estimate_rate};
use crate::selection::{CoincidenceSelector, Selection};
use crate::units::{Concentration, UnitConverter};
use serde::Serialize;

/// Selector, estimator and converter bound to one validated configuration.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisPipeline {
    selector: CoincidenceSelector,
    converter: UnitConverter,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunAnalysis {
    pub events: usize,
    pub selection: Selection,
    pub rate: RateEstimate,
    pub concentration: Concentration,
}

impl RunAnalysis {
    pub fn count(&self) -> usize {
        self.selection.count()
    }
}

impl AnalysisPipeline {
    pub fn new(config: &AnalysisConfig) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Self {
            selector: CoincidenceSelector::new(config.cuts)?,
            converter: UnitConverter::new(config.physics),
        })
    }

    pub const fn selector(&self) -> &CoincidenceSelector {
        &self.selector
    }

    pub const fn converter(&self) -> &UnitConverter {
        &self.converter
    }

    /// Fails when the chain produces a non-finite concentration, which only
    /// happens for a live time so small that the rate overflows.
    pub fn analyze(&self, batch: &EventBatch) -> PipelineResult<RunAnalysis> {
        let selection = self.selector.select(&batch.events);
        let rate = estimate_rate(selection.count(), batch.live_time_seconds);
        let concentration = self.converter.concentration(rate.per_day());
        let result = concentration.mbq_per_volume;
        if !(result.value.is_finite() && result.uncertainty.is_finite()) {
            return Err(BipoError::computation(
                "COMPUTE.NON_FINITE_CONCENTRATION",
                format!(
                    "{} coincidences over {} s live time give a non-finite concentration",
                    selection.count(),
                    batch.live_time_seconds
                ),
            ));
        }

        Ok(RunAnalysis {
            events: batch.len(),
            selection,
            rate,
            concentration,
        })
    }
}

pub fn render_analysis_summary(analysis: &RunAnalysis, volume_m3: f64) -> String {
    let concentration = &analysis.concentration;
    [
        format!("Events: {}", analysis.events),
        format!(
            "Candidates: {} prompt, {} delayed",
            analysis.selection.prompt_candidates, analysis.selection.delayed_candidates
        ),
        format!("Coincidences: {}", analysis.count()),
        format!("Live time: {} s", analysis.rate.live_time_seconds),
        format!(
            "Rate: {:.6e} +/- {:.6e} /s",
            analysis.rate.rate, analysis.rate.uncertainty
        ),
        format!(
            "Rate: {:.6} +/- {:.6} cpd",
            concentration.cpd.value, concentration.cpd.uncertainty
        ),
        format!(
            "U-238: {:.6e} +/- {:.6e} g/g",
            concentration.gg.value, concentration.gg.uncertainty
        ),
        format!(
            "U-238: {:.6e} +/- {:.6e} mBq/kg",
            concentration.mbq_per_kg.value, concentration.mbq_per_kg.uncertainty
        ),
        format!(
            "U-238: {:.6} +/- {:.6} mBq/{}m3",
            concentration.mbq_per_volume.value, concentration.mbq_per_volume.uncertainty, volume_m3
        ),
    ]
    .join("\n")
}
