//! Prompt/delayed coincidence selection.
//!
//! Events are split into two candidate populations by energy window and the
//! fiducial cylinder, then every prompt x delayed combination whose signed
//! time difference falls in the `dt` window and whose separation is at most
//! `max_dr` is accepted. A delayed event may be accepted with several prompt
//! events unless [`PairingPolicy::FirstMatch`] is selected.
//!
//! [`CoincidenceSelector::select`] sorts the delayed population by time once
//! and visits only the candidates inside each prompt's window;
//! [`select_exhaustive`] walks the full cross-product. Both return the same
//! pairs in the same order.

mod population;

pub use population::{Population, PopulationKind};

use crate::common::{CutConfig, PairingPolicy};
use crate::domain::{Event, SelectionResult, TimeWindow};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoincidencePair {
    pub prompt_index: usize,
    pub delayed_index: usize,
    pub prompt: Event,
    pub delayed: Event,
    /// Delayed minus prompt timestamp, saturated to the `i64` range.
    pub dt_ns: i64,
    pub dr: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Selection {
    pub prompt_candidates: usize,
    pub delayed_candidates: usize,
    pub pairs: Vec<CoincidencePair>,
}

impl Selection {
    pub fn count(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Validated cut set ready to be applied to event batches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoincidenceSelector {
    cuts: CutConfig,
}

impl CoincidenceSelector {
    pub fn new(cuts: CutConfig) -> SelectionResult<Self> {
        cuts.validate()?;
        Ok(Self { cuts })
    }

    pub const fn cuts(&self) -> &CutConfig {
        &self.cuts
    }

    pub fn populations(&self, events: &[Event]) -> (Population, Population) {
        let radii: Vec<f64> = events.iter().map(|event| event.position.radius()).collect();
        let prompt = Population::build(events, &radii, PopulationKind::Prompt, &self.cuts);
        let delayed = Population::build(events, &radii, PopulationKind::Delayed, &self.cuts);
        for population in [&prompt, &delayed] {
            debug!(
                population = population.kind().as_str(),
                candidates = population.len(),
                "candidate population built"
            );
        }
        (prompt, delayed)
    }

    pub fn select(&self, events: &[Event]) -> Selection {
        let (prompt, delayed) = self.populations(events);

        let mut delayed_by_time = delayed.indices().to_vec();
        delayed_by_time.sort_by_key(|&index| events[index].timestamp_ns);
        let delayed_times: Vec<i128> = delayed_by_time
            .iter()
            .map(|&index| i128::from(events[index].timestamp_ns))
            .collect();

        let window = self.cuts.dt;
        let mut pairs = Vec::new();
        for &prompt_index in prompt.indices() {
            let prompt_time = i128::from(events[prompt_index].timestamp_ns);
            let earliest = prompt_time + i128::from(window.min_ns);
            let latest = prompt_time + i128::from(window.max_ns);
            let start = delayed_times.partition_point(|&time| time < earliest);
            let end = delayed_times.partition_point(|&time| time <= latest);

            for &delayed_index in &delayed_by_time[start..end] {
                if let Some(pair) = self.accept(events, prompt_index, delayed_index) {
                    pairs.push(pair);
                    if self.cuts.pairing == PairingPolicy::FirstMatch {
                        break;
                    }
                }
            }
        }

        debug!(
            events = events.len(),
            accepted = pairs.len(),
            "coincidence selection complete"
        );

        Selection {
            prompt_candidates: prompt.len(),
            delayed_candidates: delayed.len(),
            pairs,
        }
    }

    fn accept(
        &self,
        events: &[Event],
        prompt_index: usize,
        delayed_index: usize,
    ) -> Option<CoincidencePair> {
        let prompt = events[prompt_index];
        let delayed = events[delayed_index];
        let dt = signed_dt(&prompt, &delayed);
        if !window_contains(self.cuts.dt, dt) {
            return None;
        }
        let dr = prompt.position.distance_to(&delayed.position);
        if !(dr <= self.cuts.max_dr) {
            return None;
        }
        Some(CoincidencePair {
            prompt_index,
            delayed_index,
            prompt,
            delayed,
            dt_ns: saturate_i64(dt),
            dr,
        })
    }
}

/// Validates the cuts and runs the windowed selection.
pub fn select(events: &[Event], cuts: &CutConfig) -> SelectionResult<Selection> {
    Ok(CoincidenceSelector::new(*cuts)?.select(events))
}

/// Reference selection over the full prompt x delayed cross-product.
pub fn select_exhaustive(events: &[Event], cuts: &CutConfig) -> SelectionResult<Selection> {
    let selector = CoincidenceSelector::new(*cuts)?;
    let (prompt, delayed) = selector.populations(events);

    let mut pairs = Vec::new();
    for &prompt_index in prompt.indices() {
        let mut matches: Vec<CoincidencePair> = delayed
            .indices()
            .iter()
            .filter_map(|&delayed_index| selector.accept(events, prompt_index, delayed_index))
            .collect();
        matches.sort_by_key(|pair| (pair.delayed.timestamp_ns, pair.delayed_index));
        if cuts.pairing == PairingPolicy::FirstMatch {
            matches.truncate(1);
        }
        pairs.extend(matches);
    }

    Ok(Selection {
        prompt_candidates: prompt.len(),
        delayed_candidates: delayed.len(),
        pairs,
    })
}

fn signed_dt(prompt: &Event, delayed: &Event) -> i128 {
    i128::from(delayed.timestamp_ns) - i128::from(prompt.timestamp_ns)
}

fn window_contains(window: TimeWindow, dt: i128) -> bool {
    i128::from(window.min_ns) <= dt && dt <= i128::from(window.max_ns)
}

fn saturate_i64(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
}
