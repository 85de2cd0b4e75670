//! Flattening of trigger-level reconstruction output into per-cluster events.
//!
//! A trigger may carry several reconstructed clusters. After the muon veto,
//! each cluster becomes one [`Event`] that inherits the trigger's visible
//! energy and keeps its own time and vertex.

use crate::common::FlattenConfig;
use crate::common::constants::NANOSECONDS_PER_SECOND;
use crate::domain::{BipoError, BipoResult, Event, EventBatch, Position};
use crate::io::{event_columns, write_columns};
use crate::numerics::stable_sum;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

pub const MULTI_CLUSTER_COLUMN: &str = "Multi_cluster_check";
pub const FIRED_PMT_COLUMN: &str = "FiredPMT";
pub const WEIGHT_COLUMN: &str = "weight";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub charge: f64,
    pub time_ns: i64,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerRecord {
    pub sec: i64,
    pub nsec: i64,
    #[serde(default)]
    pub muon_tag: bool,
    /// Time since the last liquid-scintillator muon, in nanoseconds.
    pub dt_ls_muon_ns: f64,
    /// Time since the last muon of any kind, in nanoseconds.
    pub dt_muon_ns: f64,
    #[serde(default)]
    pub clusters: Vec<Cluster>,
    #[serde(default)]
    pub fired_pmt_ids: Vec<u32>,
}

impl TriggerRecord {
    pub fn timestamp_ns(&self) -> i128 {
        i128::from(self.sec) * 1_000_000_000 + i128::from(self.nsec)
    }

    fn passes_veto(&self, config: &FlattenConfig) -> bool {
        !self.muon_tag
            && self.dt_ls_muon_ns > config.muon_veto_ns
            && self.dt_muon_ns > config.muon_veto_ns
            && !self.clusters.is_empty()
    }

    fn visible_energy(&self, config: &FlattenConfig) -> f64 {
        let charges: Vec<f64> = self.clusters.iter().map(|cluster| cluster.charge).collect();
        stable_sum(&charges) / config.charge_per_mev
    }

    fn fired_pmt_count(&self) -> usize {
        self.fired_pmt_ids.iter().collect::<BTreeSet<_>>().len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FlatEvent {
    pub event: Event,
    pub multi_cluster: bool,
    pub fired_pmts: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FlattenedRun {
    pub triggers: usize,
    pub vetoed_triggers: usize,
    pub live_time_seconds: f64,
    pub events: Vec<FlatEvent>,
}

impl FlattenedRun {
    pub fn batch(&self) -> EventBatch {
        EventBatch::new(
            self.events.iter().map(|flat| flat.event).collect(),
            self.live_time_seconds,
        )
    }

    /// Per-event exposure weight `1 / live time`; zero without live time.
    pub fn weight(&self) -> f64 {
        if self.live_time_seconds > 0.0 {
            1.0 / self.live_time_seconds
        } else {
            0.0
        }
    }
}

/// Writes the event columns plus `Multi_cluster_check`, `FiredPMT` and
/// `weight`. The result reads back through the standard event source.
pub fn write_flattened_columns(path: &Path, run: &FlattenedRun) -> BipoResult<()> {
    let mut columns = event_columns(&run.batch());
    let weight = run.weight();
    columns.insert(
        MULTI_CLUSTER_COLUMN,
        run.events.iter().map(|flat| Value::from(flat.multi_cluster)).collect(),
    );
    columns.insert(
        FIRED_PMT_COLUMN,
        run.events.iter().map(|flat| Value::from(flat.fired_pmts)).collect(),
    );
    columns.insert(
        WEIGHT_COLUMN,
        run.events.iter().map(|_| Value::from(weight)).collect(),
    );
    write_columns(path, &columns)
}

pub fn flatten_triggers(triggers: &[TriggerRecord], config: &FlattenConfig) -> FlattenedRun {
    let live_time_seconds = span_seconds(triggers.iter().map(TriggerRecord::timestamp_ns));

    let kept: Vec<&TriggerRecord> = triggers
        .iter()
        .filter(|trigger| trigger.passes_veto(config))
        .collect();

    let events: Vec<FlatEvent> = kept
        .iter()
        .copied()
        .flat_map(|trigger| {
            let energy = trigger.visible_energy(config);
            let multi_cluster = trigger.clusters.len() > 1;
            let fired_pmts = trigger.fired_pmt_count();
            trigger.clusters.iter().map(move |cluster| FlatEvent {
                event: Event::new(energy, cluster.position, cluster.time_ns),
                multi_cluster,
                fired_pmts,
            })
        })
        .collect();

    let event_span = span_seconds(events.iter().map(|flat| i128::from(flat.event.timestamp_ns)));
    if !events.is_empty() && (event_span - live_time_seconds).abs() >= 1.0 {
        warn!(
            event_span_seconds = event_span,
            live_time_seconds, "cluster time span disagrees with trigger live time"
        );
    }
    debug!(
        triggers = triggers.len(),
        kept = kept.len(),
        events = events.len(),
        "flattened trigger records"
    );

    FlattenedRun {
        triggers: triggers.len(),
        vetoed_triggers: triggers.len() - kept.len(),
        live_time_seconds,
        events,
    }
}

pub fn read_triggers(path: &Path) -> BipoResult<Vec<TriggerRecord>> {
    let source = fs::read_to_string(path).map_err(|error| {
        BipoError::io_system(
            "IO.TRIGGER_READ",
            format!("failed to read trigger file '{}': {}", path.display(), error),
        )
    })?;
    serde_json::from_str(&source).map_err(|error| {
        BipoError::input_validation(
            "INPUT.TRIGGER_PARSE",
            format!("failed to parse trigger file '{}': {}", path.display(), error),
        )
    })
}

fn span_seconds(timestamps: impl Iterator<Item = i128>) -> f64 {
    let (min, max) = timestamps.fold((None, None), |(min, max), value| {
        (
            Some(min.map_or(value, |current: i128| current.min(value))),
            Some(max.map_or(value, |current: i128| current.max(value))),
        )
    });
    match (min, max) {
        (Some(min), Some(max)) => (max - min) as f64 / NANOSECONDS_PER_SECOND,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::{Cluster, TriggerRecord, flatten_triggers, read_triggers, write_flattened_columns};
    use crate::common::FlattenConfig;
    use crate::domain::{BipoErrorCategory, Position};
    use crate::io::{EventSource, JsonColumnSource};
    use tempfile::TempDir;

    fn cluster(charge: f64, time_ns: i64, x: f64) -> Cluster {
        Cluster {
            charge,
            time_ns,
            position: Position::new(x, 0.0, 0.0),
        }
    }

    fn trigger(sec: i64, clusters: Vec<Cluster>) -> TriggerRecord {
        TriggerRecord {
            sec,
            nsec: 0,
            muon_tag: false,
            dt_ls_muon_ns: 5.0e6,
            dt_muon_ns: 5.0e6,
            clusters,
            fired_pmt_ids: vec![3, 7, 7, 12],
        }
    }

    #[test]
    fn every_cluster_of_a_kept_trigger_becomes_an_event() {
        let triggers = vec![
            trigger(100, vec![cluster(436.0, 100_000_000_000, 1.0)]),
            trigger(
                101,
                vec![cluster(218.0, 101_000_000_000, 2.0), cluster(218.0, 101_000_000_500, 3.0)],
            ),
            trigger(102, vec![cluster(872.0, 102_000_000_000, 4.0)]),
        ];

        let run = flatten_triggers(&triggers, &FlattenConfig::default());
        assert_eq!(run.triggers, 3);
        assert_eq!(run.vetoed_triggers, 0);
        assert_eq!(run.events.len(), 4);
        assert_eq!(run.live_time_seconds, 2.0);

        let energies: Vec<f64> = run.events.iter().map(|flat| flat.event.energy).collect();
        assert_eq!(energies, vec![1.0, 1.0, 1.0, 2.0]);
        let multi: Vec<bool> = run.events.iter().map(|flat| flat.multi_cluster).collect();
        assert_eq!(multi, vec![false, true, true, false]);
        assert!(run.events.iter().all(|flat| flat.fired_pmts == 3));
        assert_eq!(run.events[2].event.position.x, 3.0);
        assert_eq!(run.events[2].event.timestamp_ns, 101_000_000_500);
    }

    #[test]
    fn muon_veto_and_empty_triggers_are_dropped_but_count_toward_live_time() {
        let mut tagged = trigger(10, vec![cluster(436.0, 10_000_000_000, 0.0)]);
        tagged.muon_tag = true;
        let mut recent_muon = trigger(11, vec![cluster(436.0, 11_000_000_000, 0.0)]);
        recent_muon.dt_muon_ns = 1.0e6;
        let mut recent_ls_muon = trigger(12, vec![cluster(436.0, 12_000_000_000, 0.0)]);
        recent_ls_muon.dt_ls_muon_ns = 2.0e5;
        let empty = trigger(13, Vec::new());
        let clean = trigger(14, vec![cluster(436.0, 14_000_000_000, 0.0)]);

        let run = flatten_triggers(
            &[tagged, recent_muon, recent_ls_muon, empty, clean],
            &FlattenConfig::default(),
        );
        assert_eq!(run.vetoed_triggers, 4);
        assert_eq!(run.events.len(), 1);
        assert_eq!(run.live_time_seconds, 4.0);

        let batch = run.batch();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.live_time_seconds, 4.0);
        assert_eq!(run.weight(), 0.25);
    }

    #[test]
    fn no_triggers_means_no_live_time() {
        let run = flatten_triggers(&[], &FlattenConfig::default());
        assert_eq!(run.live_time_seconds, 0.0);
        assert_eq!(run.weight(), 0.0);
        assert!(run.events.is_empty());
    }

    #[test]
    fn flattened_columns_keep_cluster_and_pmt_flags() {
        let mut split = trigger(
            200,
            vec![cluster(218.0, 200_000_000_000, 1.0), cluster(218.0, 200_000_000_400, 2.0)],
        );
        split.fired_pmt_ids = vec![1, 2, 2];
        let single = trigger(202, vec![cluster(436.0, 202_000_000_000, 3.0)]);
        let run = flatten_triggers(&[split, single], &FlattenConfig::default());

        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("flat_rs_processed.json");
        write_flattened_columns(&path, &run).expect("write should succeed");

        let parsed: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(&path).expect("file should be readable"),
        )
        .expect("file should be JSON");
        assert_eq!(parsed["Multi_cluster_check"], serde_json::json!([true, true, false]));
        assert_eq!(parsed["FiredPMT"], serde_json::json!([2, 2, 3]));
        assert_eq!(parsed["weight"], serde_json::json!([0.5, 0.5, 0.5]));

        let batch = JsonColumnSource.read_batch(&path).expect("read should succeed");
        assert_eq!(batch, run.batch());
    }

    #[test]
    fn trigger_files_parse_from_json() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("triggers.json");
        std::fs::write(
            &path,
            r#"[{
                "sec": 1722475226, "nsec": 15, "dt_ls_muon_ns": 2e6, "dt_muon_ns": 3e6,
                "clusters": [{ "charge": 400.0, "time_ns": 1722475226000000015,
                               "position": { "x": 1.0, "y": 2.0, "z": 3.0 } }]
            }]"#,
        )
        .expect("file should be written");

        let triggers = read_triggers(&path).expect("triggers should parse");
        assert_eq!(triggers.len(), 1);
        assert!(!triggers[0].muon_tag);
        assert_eq!(triggers[0].timestamp_ns(), 1_722_475_226_000_000_015);

        std::fs::write(&path, "{}").expect("file should be written");
        let error = read_triggers(&path).expect_err("object is not a trigger list");
        assert_eq!(error.category(), BipoErrorCategory::InputValidationError);
    }
}
